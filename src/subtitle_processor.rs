use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::app_config::{SubtitleStyle, VideoConfig};
use crate::timing::{CueKind, CueValidator, TimingCue};

// @module: Subtitle track serialization (ASS writer and parser, SRT export)

// @const: ASS override block
static OVERRIDE_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^}]*\}").unwrap());

// @const: ASS timestamp H:MM:SS.cc
static ASS_TIME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+):(\d{2}):(\d{2})\.(\d{2})$").unwrap());

/// Audio left uncovered after the last cue before a trailing blank cue is added
const TRAILING_GAP_THRESHOLD: f64 = 0.5;

const STYLE_FORMAT: &str = "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding";
const EVENT_FORMAT: &str = "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text";

// @struct: Single subtitle entry read back from a track
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEntry {
    // @field: Sequence number
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: ASS style name
    pub style: String,

    // @field: Text with override tags removed
    pub text: String,
}

impl SubtitleEntry {
    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_srt_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_time_ms.saturating_sub(self.start_time_ms)
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(
            f,
            "{} --> {}",
            Self::format_srt_timestamp(self.start_time_ms),
            Self::format_srt_timestamp(self.end_time_ms)
        )?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Format seconds as an ASS timestamp (H:MM:SS.cc)
pub fn format_ass_time(seconds: f64) -> String {
    let centis = (seconds.max(0.0) * 100.0).round() as u64;
    let hours = centis / 360_000;
    let minutes = (centis % 360_000) / 6_000;
    let secs = (centis % 6_000) / 100;
    let cs = centis % 100;
    format!("{}:{:02}:{:02}.{:02}", hours, minutes, secs, cs)
}

/// Parse an ASS timestamp into milliseconds
pub fn parse_ass_time(timestamp: &str) -> Result<u64> {
    let caps = ASS_TIME_REGEX
        .captures(timestamp.trim())
        .ok_or_else(|| anyhow!("Invalid ASS timestamp: '{}'", timestamp))?;
    let field = |i: usize| -> u64 { caps.get(i).map_or(0, |m| m.as_str().parse().unwrap_or(0)) };

    Ok((field(1) * 3600 + field(2) * 60 + field(3)) * 1000 + field(4) * 10)
}

/// Remove `{...}` override blocks and turn hard breaks back into newlines
pub fn strip_override_tags(text: &str) -> String {
    OVERRIDE_TAG_REGEX.replace_all(text, "").replace("\\N", "\n")
}

/// Writes timing cues as an Advanced SubStation Alpha track
#[derive(Debug, Clone)]
pub struct SubtitleFileWriter {
    style: SubtitleStyle,
    play_res_x: u32,
    play_res_y: u32,
}

impl SubtitleFileWriter {
    pub fn new(style: &SubtitleStyle, video: &VideoConfig) -> Self {
        Self {
            style: style.clone(),
            play_res_x: video.width,
            play_res_y: video.height,
        }
    }

    /// Render the full ASS document.
    ///
    /// Refuses cue lists that are unordered or overlapping.
    pub fn render(&self, title: &str, cues: &[TimingCue], audio_duration: f64) -> Result<String> {
        let validation = CueValidator::new().validate(cues);
        if let Some((index, issue)) = validation.first_blocking() {
            return Err(anyhow!("Refusing to write subtitles: cue {} {}", index, issue));
        }
        for result in validation.cue_results.iter().filter(|r| !r.issues.is_empty()) {
            for issue in &result.issues {
                debug!("Subtitle cue {}: {}", result.index, issue);
            }
        }

        let mut out = String::new();
        self.write_header(&mut out, title);

        out.push_str("[Events]\n");
        out.push_str(EVENT_FORMAT);
        out.push('\n');

        for cue in cues {
            out.push_str(&self.dialogue_line(cue));
            out.push('\n');
        }

        let covered = cues.last().map_or(0.0, |c| c.end_time);
        if audio_duration - covered > TRAILING_GAP_THRESHOLD {
            debug!("Covering {:.2}s of trailing audio with an empty cue", audio_duration - covered);
            out.push_str(&format!(
                "Dialogue: 0,{},{},Default,,0,0,0,,\n",
                format_ass_time(covered),
                format_ass_time(audio_duration)
            ));
        }

        Ok(out)
    }

    /// Render and write the track to `path`
    pub fn write_ass<P: AsRef<Path>>(&self, path: P, cues: &[TimingCue], audio_duration: f64) -> Result<()> {
        let path = path.as_ref();
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| String::from("subtitles"));
        let content = self.render(&title, cues, audio_duration)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(path, content).with_context(|| format!("Failed to write subtitle file: {}", path.display()))?;
        debug!("Wrote {} cues to {}", cues.len(), path.display());
        Ok(())
    }

    fn write_header(&self, out: &mut String, title: &str) {
        out.push_str("[Script Info]\n");
        out.push_str(&format!("Title: {}\n", title));
        out.push_str("ScriptType: v4.00+\n");
        out.push_str("WrapStyle: 0\n");
        out.push_str(&format!("PlayResX: {}\n", self.play_res_x));
        out.push_str(&format!("PlayResY: {}\n", self.play_res_y));
        out.push_str("ScaledBorderAndShadow: yes\n\n");

        out.push_str("[V4+ Styles]\n");
        out.push_str(STYLE_FORMAT);
        out.push('\n');
        out.push_str(&self.style_line("Default", self.style.outline, self.style.shadow));
        out.push_str(&self.style_line("Effects", 0.0, 0.0));
        out.push('\n');
    }

    fn style_line(&self, name: &str, outline: f64, shadow: f64) -> String {
        let s = &self.style;
        format!(
            "Style: {},{},{},{},{},{},{},{},0,0,0,100,100,0,0,{},{},{},{},{},{},{},1\n",
            name,
            s.font_name,
            s.font_size,
            s.primary_color,
            s.secondary_color,
            s.outline_color,
            s.back_color,
            if s.bold { -1 } else { 0 },
            s.border_style,
            outline,
            shadow,
            s.alignment,
            s.margin_l,
            s.margin_r,
            s.margin_v
        )
    }

    fn dialogue_line(&self, cue: &TimingCue) -> String {
        let start = format_ass_time(cue.start_time);
        let end = format_ass_time(cue.end_time);

        let (style, text) = match cue.kind {
            CueKind::Spoken => ("Default", self.spoken_text(cue)),
            CueKind::Marker => ("Effects", format!("{{\\alpha&HFF&}}{}", escape_text(&cue.text))),
            CueKind::Blank => ("Default", String::new()),
        };

        format!("Dialogue: 0,{},{},{},,0,0,0,,{}", start, end, style, text)
    }

    fn spoken_text(&self, cue: &TimingCue) -> String {
        let mut text = escape_text(&cue.text);
        if cue.is_sentence_start {
            text = capitalize_first(&text);
        }

        let alpha = (self.style.bg_opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        let italic = if cue.is_question { "{\\i1}" } else { "" };
        format!("{{\\blur{}}}{{\\1a&H{:02X}&}}{}{}", self.style.blur, alpha, italic, text)
    }
}

/// Keep literal braces from being read as override blocks
fn escape_text(text: &str) -> String {
    text.replace('{', "(").replace('}', ")").replace('\n', "\\N")
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Parse the Dialogue lines of an ASS document
pub fn parse_ass_string(content: &str) -> Result<Vec<SubtitleEntry>> {
    let mut entries = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        let Some(body) = line.trim_start().strip_prefix("Dialogue:") else {
            continue;
        };

        // Text is the tenth field and may itself contain commas
        let fields: Vec<&str> = body.trim_start().splitn(10, ',').collect();
        if fields.len() < 10 {
            warn!("Skipping malformed Dialogue at line {}: {}", line_no + 1, line);
            continue;
        }

        let start_time_ms = parse_ass_time(fields[1]).with_context(|| format!("line {}", line_no + 1))?;
        let end_time_ms = parse_ass_time(fields[2]).with_context(|| format!("line {}", line_no + 1))?;

        entries.push(SubtitleEntry {
            seq_num: entries.len() + 1,
            start_time_ms,
            end_time_ms,
            style: fields[3].trim().to_string(),
            text: strip_override_tags(fields[9]),
        });
    }

    Ok(entries)
}

/// Read and parse an ASS file
pub fn parse_ass_file<P: AsRef<Path>>(path: P) -> Result<Vec<SubtitleEntry>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read subtitle file: {}", path.display()))?;
    parse_ass_string(&content)
}

/// Write the spoken cues as SRT
pub fn write_srt<P: AsRef<Path>>(path: P, cues: &[TimingCue]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let mut file = File::create(path).with_context(|| format!("Failed to create subtitle file: {}", path.display()))?;

    for entry in srt_entries(cues) {
        write!(file, "{}", entry)?;
    }
    Ok(())
}

/// Spoken cues as numbered SRT entries
pub fn srt_entries(cues: &[TimingCue]) -> Vec<SubtitleEntry> {
    cues.iter()
        .filter(|c| c.is_spoken())
        .enumerate()
        .map(|(i, cue)| SubtitleEntry {
            seq_num: i + 1,
            start_time_ms: (cue.start_time.max(0.0) * 1000.0).round() as u64,
            end_time_ms: (cue.end_time.max(0.0) * 1000.0).round() as u64,
            style: String::from("Default"),
            text: cue.text.clone(),
        })
        .collect()
}
