/*!
 * Tests for application configuration functionality
 */

use reelsync::app_config::{AlignerBackend, Config, GeneratorProvider, LogLevel};

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.timing.initial_silence, 0.7);
    assert_eq!(config.timing.standard_padding, 0.25);
    assert_eq!(config.timing.max_words_per_chunk, 3);
    assert_eq!(config.timing.long_word_penalty, 0.18);
    assert_eq!(config.timing.question_factor, 1.25);
    assert_eq!(config.timing.end_sentence_factor, 1.2);
    assert_eq!(config.timing.min_duration_per_word, 0.35);

    assert_eq!(config.normalizer.min_gap, 0.05);
    assert_eq!(config.normalizer.max_gap, 0.15);
    assert_eq!(config.silence.min_silence, 0.3);
    assert_eq!(config.aligner.backend, AlignerBackend::Disabled);
    assert_eq!(config.video.duration_tolerance_secs, 3.0);
    assert_eq!(config.generator.provider, GeneratorProvider::OpenAI);
    assert_eq!(config.tts.model, "speech-1.6");
    assert_eq!(config.log_level, LogLevel::Info);

    assert!(config.validate().is_ok());
}

/// Test that a partial JSON file is completed with defaults
#[test]
fn test_config_fromPartialJson_shouldFillDefaults() {
    let json = r#"{
        "timing": { "max_words_per_chunk": 4 },
        "aligner": { "backend": "service", "endpoint": "http://localhost:8000/align" },
        "log_level": "debug"
    }"#;

    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.timing.max_words_per_chunk, 4);
    assert_eq!(config.timing.initial_silence, 0.7);
    assert_eq!(config.aligner.backend, AlignerBackend::Service);
    assert_eq!(config.aligner.timeout_secs, 120);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert!(config.voices.contains_key("fireship"));
    assert!(config.validate().is_ok());
}

/// Test that a written default config reads back unchanged
#[test]
fn test_config_serialization_withDefaults_shouldRoundTrip() {
    let config = Config::default();
    let json = serde_json::to_string_pretty(&config).unwrap();
    let parsed: Config = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.voices, config.voices);
    assert_eq!(parsed.timing.directive_pauses, config.timing.directive_pauses);
    assert_eq!(parsed.generator.system_prompt, config.generator.system_prompt);
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    config.normalizer.min_gap = 0.2;
    config.normalizer.max_gap = 0.1;
    assert!(config.validate().is_err(), "inverted gap range must be rejected");

    let mut config = Config::default();
    config.timing.question_factor = 0.8;
    assert!(config.validate().is_err(), "shrinking question factor must be rejected");

    let mut config = Config::default();
    config.voices.get_mut("fireship").unwrap().speaking_rate = 0.0;
    assert!(config.validate().is_err(), "zero speaking rate must be rejected");

    let mut config = Config::default();
    config.aligner.backend = AlignerBackend::Command;
    config.aligner.command = String::new();
    assert!(config.validate().is_err(), "command backend needs a command");

    let mut config = Config::default();
    config.aligner.backend = AlignerBackend::Service;
    config.aligner.endpoint = "not a url".to_string();
    assert!(config.validate().is_err(), "service backend needs a valid URL");

    let mut config = Config::default();
    config.tts.endpoint = "::".to_string();
    assert!(config.validate().is_err());
}

/// Test credential validation, which only the remote stages need
#[test]
fn test_config_credentials_withExplicitKeys_shouldValidate() {
    let mut config = Config::default();
    config.generator.provider = GeneratorProvider::Anthropic;
    config.generator.api_key = "sk-ant-test".to_string();
    config.tts.api_key = "fish-test".to_string();
    assert!(config.validate_credentials().is_ok());

    if std::env::var("FISH_API_KEY").is_err() {
        config.tts.api_key = String::new();
        let err = config.validate_credentials().unwrap_err();
        assert!(err.to_string().contains("FISH_API_KEY"));
    }
}

/// Test provider-specific defaults
#[test]
fn test_generator_config_withoutOverrides_shouldUseProviderDefaults() {
    let mut config = Config::default();
    assert!(config.generator.get_endpoint().starts_with("https://"));

    config.generator.provider = GeneratorProvider::Anthropic;
    assert_ne!(config.generator.get_model(), "");
    assert!(config.generator.get_endpoint().contains("anthropic"));

    config.generator.model = "custom-model".to_string();
    assert_eq!(config.generator.get_model(), "custom-model");
}

/// Test directive pause lookup
#[test]
fn test_directive_pause_withUnknownDirective_shouldUseDefault() {
    let config = Config::default();
    assert_eq!(config.timing.directive_pause("break"), 0.5);
    assert_eq!(config.timing.directive_pause("long-break"), 1.0);
    assert_eq!(config.timing.directive_pause("applause"), 0.25);
}
