/*!
 * Voice profiles and the read-only registry they are looked up from.
 *
 * The registry is built once from configuration when the process starts and
 * shared behind an `Arc`; lookups for unknown voices resolve to the default
 * profile instead of inserting anything.
 */

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Timing and synthesis characteristics of one TTS voice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    /// Reference id of the voice model at the TTS provider
    #[serde(default)]
    pub reference_id: String,

    /// Speaking rate in words per second
    #[serde(default = "default_speaking_rate")]
    pub speaking_rate: f64,

    /// Caption offset relative to audio onset, negative shows captions earlier
    #[serde(default = "default_lead_time")]
    pub lead_time: f64,

    /// Absolute floor for a spoken cue's duration
    #[serde(default = "default_min_cue_duration")]
    pub min_cue_duration: f64,

    /// Gap between the last cue and the closing breath marker
    #[serde(default = "default_breath_gap")]
    pub breath_gap: f64,

    /// Length of the closing breath marker
    #[serde(default = "default_breath_duration")]
    pub breath_duration: f64,

    /// Base length of the trailing blank pause
    #[serde(default = "default_end_pause")]
    pub end_pause: f64,

    /// Prosody speed requested from the TTS engine
    #[serde(default = "default_tts_speed")]
    pub tts_speed: f64,

    /// Short persona description handed to the text generator
    #[serde(default)]
    pub persona: String,
}

impl Default for VoiceProfile {
    fn default() -> Self {
        Self {
            reference_id: String::new(),
            speaking_rate: default_speaking_rate(),
            lead_time: default_lead_time(),
            min_cue_duration: default_min_cue_duration(),
            breath_gap: default_breath_gap(),
            breath_duration: default_breath_duration(),
            end_pause: default_end_pause(),
            tts_speed: default_tts_speed(),
            persona: String::new(),
        }
    }
}

impl VoiceProfile {
    /// Profile with a given speaking rate and otherwise default values
    pub fn with_rate(speaking_rate: f64) -> Self {
        Self {
            speaking_rate,
            ..Self::default()
        }
    }
}

fn default_speaking_rate() -> f64 {
    2.0
}

fn default_lead_time() -> f64 {
    -0.3
}

fn default_min_cue_duration() -> f64 {
    1.0
}

fn default_breath_gap() -> f64 {
    0.3
}

fn default_breath_duration() -> f64 {
    0.5
}

fn default_end_pause() -> f64 {
    1.0
}

fn default_tts_speed() -> f64 {
    0.9
}

/// Voices that ship with the tool
pub fn builtin_voices() -> BTreeMap<String, VoiceProfile> {
    let mut voices = BTreeMap::new();

    voices.insert(
        "donald_trump".to_string(),
        VoiceProfile {
            reference_id: "5196af35f6ff4a0dbf541793fc9f2157".to_string(),
            speaking_rate: 1.8,
            lead_time: -0.35,
            breath_gap: 0.3,
            breath_duration: 0.5,
            end_pause: 1.5,
            tts_speed: 1.0,
            persona: "a bombastic, confident rally speaker who uses simple words, repetition and superlatives".to_string(),
            ..VoiceProfile::default()
        },
    );
    voices.insert(
        "walter_cronkite".to_string(),
        VoiceProfile {
            reference_id: "d204ec5aad8d4ee080c6a5341e84bdbf".to_string(),
            speaking_rate: 2.2,
            breath_gap: 0.2,
            breath_duration: 0.4,
            tts_speed: 1.25,
            persona: "a calm, trusted evening news anchor".to_string(),
            ..VoiceProfile::default()
        },
    );
    voices.insert(
        "southpark_eric_cartman".to_string(),
        VoiceProfile {
            reference_id: "b4f55643a15944e499defe42964d2ebf".to_string(),
            speaking_rate: 2.5,
            breath_gap: 0.2,
            breath_duration: 0.4,
            tts_speed: 1.25,
            persona: "a bossy kid who demands respect and authority".to_string(),
            ..VoiceProfile::default()
        },
    );
    voices.insert(
        "keanu_reeves".to_string(),
        VoiceProfile {
            reference_id: "c69fea85f15f4c809be8f52ddbb09709".to_string(),
            speaking_rate: 1.7,
            breath_gap: 0.2,
            breath_duration: 0.4,
            tts_speed: 1.25,
            persona: "a laid-back, kind person who finds everything breathtaking".to_string(),
            ..VoiceProfile::default()
        },
    );
    voices.insert(
        "fireship".to_string(),
        VoiceProfile {
            reference_id: "4dbf597a6a134c94b53d2830d67aabd8".to_string(),
            speaking_rate: 3.0,
            breath_gap: 0.2,
            breath_duration: 0.4,
            tts_speed: 1.3,
            persona: "a fast-paced tech educator with quick explanations and programming jokes".to_string(),
            ..VoiceProfile::default()
        },
    );

    voices
}

/// Immutable voice lookup table
#[derive(Debug, Clone)]
pub struct VoiceRegistry {
    profiles: Arc<HashMap<String, VoiceProfile>>,
    default_profile: Arc<VoiceProfile>,
}

impl VoiceRegistry {
    /// Build the registry from configured profiles and a default
    pub fn new(profiles: &BTreeMap<String, VoiceProfile>, default_profile: VoiceProfile) -> Self {
        let profiles = profiles
            .iter()
            .map(|(name, profile)| (name.to_lowercase(), profile.clone()))
            .collect();

        Self {
            profiles: Arc::new(profiles),
            default_profile: Arc::new(default_profile),
        }
    }

    /// Profile for `voice`, or the default profile when it is unknown
    pub fn resolve(&self, voice: &str) -> &VoiceProfile {
        self.profiles
            .get(&voice.to_lowercase())
            .unwrap_or(&self.default_profile)
    }

    /// Whether `voice` has its own profile
    pub fn contains(&self, voice: &str) -> bool {
        self.profiles.contains_key(&voice.to_lowercase())
    }

    /// Known voice names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.profiles.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn default_profile(&self) -> &VoiceProfile {
        &self.default_profile
    }
}

impl Default for VoiceRegistry {
    fn default() -> Self {
        Self::new(&builtin_voices(), VoiceProfile::default())
    }
}
