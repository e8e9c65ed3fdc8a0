/*!
 * Cue list validation.
 *
 * Checks that a timeline is fit for serialization:
 * - every cue has a positive time range
 * - cues are in order and do not overlap
 * - spoken cues last long enough and are readable
 */

use std::fmt;

use log::debug;

use crate::timing::{TimingCue, TIME_EPSILON};

/// Characters per second above which a caption is hard to read
const DEFAULT_MAX_CPS: f64 = 25.0;

/// Shortest reasonable spoken cue in seconds
const DEFAULT_MIN_DURATION: f64 = 0.2;

/// Longest reasonable spoken cue in seconds
const DEFAULT_MAX_DURATION: f64 = 30.0;

/// Result of validating one cue
#[derive(Debug, Clone)]
pub struct CueResult {
    /// Position in the timeline
    pub index: usize,
    /// Whether the cue has no blocking issue
    pub passed: bool,
    pub issues: Vec<CueIssue>,
}

/// Problems a cue can have
#[derive(Debug, Clone, PartialEq)]
pub enum CueIssue {
    /// End is not after start, or a time is not finite or negative
    InvalidTimeRange { start: f64, end: f64 },
    /// Starts before the previous cue starts
    OutOfOrder { previous_index: usize },
    /// Starts before the previous cue ends
    Overlap { previous_index: usize, overlap: f64 },
    /// Spoken cue shorter than the minimum
    TooShort { duration: f64, min_duration: f64 },
    /// Spoken cue longer than the maximum
    TooLong { duration: f64, max_duration: f64 },
    /// Too many characters per second
    ReadingSpeedTooHigh { cps: f64, max_cps: f64 },
}

impl CueIssue {
    /// Issues that make a timeline unusable, as opposed to quality warnings
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            CueIssue::InvalidTimeRange { .. } | CueIssue::OutOfOrder { .. } | CueIssue::Overlap { .. }
        )
    }
}

impl fmt::Display for CueIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CueIssue::InvalidTimeRange { start, end } => {
                write!(f, "Invalid time range: {:.3}s -> {:.3}s", start, end)
            }
            CueIssue::OutOfOrder { previous_index } => {
                write!(f, "Starts before cue {}", previous_index)
            }
            CueIssue::Overlap { previous_index, overlap } => {
                write!(f, "Overlaps cue {} by {:.3}s", previous_index, overlap)
            }
            CueIssue::TooShort { duration, min_duration } => {
                write!(f, "Duration too short: {:.3}s (min: {:.3}s)", duration, min_duration)
            }
            CueIssue::TooLong { duration, max_duration } => {
                write!(f, "Duration too long: {:.3}s (max: {:.3}s)", duration, max_duration)
            }
            CueIssue::ReadingSpeedTooHigh { cps, max_cps } => {
                write!(f, "Reading speed too high: {:.1} CPS (max: {:.1})", cps, max_cps)
            }
        }
    }
}

/// Result of validating a whole timeline
#[derive(Debug, Clone)]
pub struct TimelineValidation {
    /// No blocking issue anywhere
    pub passed: bool,
    pub cue_results: Vec<CueResult>,
    pub total_issues: usize,
    pub overlap_count: usize,
}

impl TimelineValidation {
    pub fn failed_cues(&self) -> Vec<&CueResult> {
        self.cue_results.iter().filter(|r| !r.passed).collect()
    }

    /// First blocking issue, for error messages
    pub fn first_blocking(&self) -> Option<(usize, &CueIssue)> {
        self.cue_results
            .iter()
            .flat_map(|r| r.issues.iter().map(move |i| (r.index, i)))
            .find(|(_, issue)| issue.is_blocking())
    }
}

#[derive(Debug, Clone)]
pub struct CueValidatorConfig {
    pub max_cps: f64,
    pub min_duration: f64,
    pub max_duration: f64,
}

impl Default for CueValidatorConfig {
    fn default() -> Self {
        Self {
            max_cps: DEFAULT_MAX_CPS,
            min_duration: DEFAULT_MIN_DURATION,
            max_duration: DEFAULT_MAX_DURATION,
        }
    }
}

/// Validator for timing cues
#[derive(Debug, Clone, Default)]
pub struct CueValidator {
    config: CueValidatorConfig,
}

impl CueValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CueValidatorConfig) -> Self {
        Self { config }
    }

    /// Validate a single cue in isolation
    pub fn validate_cue(&self, index: usize, cue: &TimingCue) -> CueResult {
        let mut issues = Vec::new();

        if !cue.is_well_formed() {
            issues.push(CueIssue::InvalidTimeRange {
                start: cue.start_time,
                end: cue.end_time,
            });
            return CueResult {
                index,
                passed: false,
                issues,
            };
        }

        if cue.is_spoken() {
            let duration = cue.duration();
            if duration < self.config.min_duration {
                issues.push(CueIssue::TooShort {
                    duration,
                    min_duration: self.config.min_duration,
                });
            }
            if duration > self.config.max_duration {
                issues.push(CueIssue::TooLong {
                    duration,
                    max_duration: self.config.max_duration,
                });
            }

            let cps = Self::calculate_cps(cue);
            if cps > self.config.max_cps {
                issues.push(CueIssue::ReadingSpeedTooHigh {
                    cps,
                    max_cps: self.config.max_cps,
                });
            }
        }

        CueResult {
            index,
            passed: !issues.iter().any(CueIssue::is_blocking),
            issues,
        }
    }

    /// Validate order and overlap across the timeline
    pub fn validate(&self, cues: &[TimingCue]) -> TimelineValidation {
        let mut cue_results: Vec<CueResult> = cues
            .iter()
            .enumerate()
            .map(|(i, c)| self.validate_cue(i, c))
            .collect();

        let mut overlap_count = 0;
        for i in 1..cues.len() {
            let previous = &cues[i - 1];
            let current = &cues[i];
            let result = &mut cue_results[i];

            if current.start_time < previous.start_time {
                result.issues.push(CueIssue::OutOfOrder { previous_index: i - 1 });
                result.passed = false;
            } else if previous.end_time > current.start_time + TIME_EPSILON {
                overlap_count += 1;
                result.issues.push(CueIssue::Overlap {
                    previous_index: i - 1,
                    overlap: previous.end_time - current.start_time,
                });
                result.passed = false;
            }
        }

        let total_issues = cue_results.iter().map(|r| r.issues.len()).sum();
        let passed = cue_results.iter().all(|r| r.passed);

        debug!(
            "Cue validation: {} cues, {} issues, {} overlaps",
            cues.len(),
            total_issues,
            overlap_count
        );

        TimelineValidation {
            passed,
            cue_results,
            total_issues,
            overlap_count,
        }
    }

    /// Characters per second of a cue
    pub fn calculate_cps(cue: &TimingCue) -> f64 {
        let duration = cue.duration();
        if duration <= 0.0 {
            return f64::INFINITY;
        }
        cue.text.chars().count() as f64 / duration
    }
}
