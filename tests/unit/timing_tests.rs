/*!
 * Property tests for the timing core, run over generated transcripts
 */

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use reelsync::app_config::Config;
use reelsync::timing::{
    is_sequential, CueKind, HeuristicTimeline, SequentialNormalizer, SilenceInterval, SilenceRefiner, TextChunker,
    TimingCue,
};
use reelsync::voices::VoiceProfile;

const WORDS: [&str; 16] = [
    "cats", "quantum", "breaking", "news", "the", "extraordinary", "rust", "compiler", "is", "a", "borrow",
    "checker", "today", "scientists", "announced", "subscribe",
];
const TERMINATORS: [&str; 5] = [".", "!", "?", "...", "?!"];
const DIRECTIVES: [&str; 3] = ["(break)", "(breath)", "[laugh]"];

/// A random transcript of a few sentences, sometimes with directives
fn random_transcript(rng: &mut StdRng) -> String {
    let sentences = rng.random_range(1..6);
    let mut text = String::new();
    for _ in 0..sentences {
        let words = rng.random_range(1..12);
        for w in 0..words {
            if w > 0 && rng.random_bool(0.1) {
                text.push_str(DIRECTIVES.choose(rng).unwrap());
                text.push(' ');
            }
            text.push_str(WORDS.choose(rng).unwrap());
            if w + 1 < words {
                text.push(' ');
            }
        }
        text.push_str(TERMINATORS.choose(rng).unwrap());
        text.push(' ');
    }
    text
}

fn random_voice(rng: &mut StdRng) -> VoiceProfile {
    VoiceProfile {
        speaking_rate: rng.random_range(1.5..3.5),
        lead_time: rng.random_range(-0.5..0.1),
        ..VoiceProfile::default()
    }
}

/// Test heuristic coverage over generated transcripts
#[test]
fn test_heuristicTimeline_withRandomTranscripts_shouldEndAtAudioDuration() {
    let config = Config::default();
    let chunker = TextChunker::new(&config.timing);
    let heuristic = HeuristicTimeline::new(&config.timing);
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..200 {
        let transcript = random_transcript(&mut rng);
        let voice = random_voice(&mut rng);
        let audio = rng.random_range(2.0..60.0);

        let units = chunker.chunk(&transcript);
        let cues = heuristic.build(&units, &voice, audio);

        assert_eq!(cues.len(), units.len(), "one cue per unit for {:?}", transcript);
        let last = cues.last().unwrap();
        assert!((last.end_time - audio).abs() < 1e-3, "last cue ends at {} not {}", last.end_time, audio);
        assert!(cues.windows(2).all(|p| p[0].start_time <= p[1].start_time));
        assert!(cues.iter().all(|c| c.end_time > c.start_time));
    }
}

/// Test that rescaling keeps the relative durations
#[test]
fn test_heuristicTimeline_rescale_shouldPreserveDurationRatios() {
    let config = Config::default();
    let chunker = TextChunker::new(&config.timing);
    let heuristic = HeuristicTimeline::new(&config.timing);
    let voice = VoiceProfile::with_rate(2.0);
    let units = chunker.chunk("Scientists announced extraordinary news today. Is the compiler a cat? Subscribe.");

    let provisional = heuristic.provisional(&units, &voice);
    let total_estimated = provisional.last().unwrap().end_time - config.timing.initial_silence;

    for audio in [4.0, 9.5, 30.0] {
        let scaled = heuristic.build(&units, &voice, audio);
        let k = (audio - config.timing.initial_silence) / total_estimated;

        let recovered = (scaled.last().unwrap().end_time - config.timing.initial_silence) / total_estimated;
        assert!((recovered - k).abs() < 1e-9);
        for (original, rescaled) in provisional.iter().zip(&scaled) {
            assert!((rescaled.duration() - original.duration() * k).abs() < 1e-9);
        }
    }
}

/// Test the ordering and minimum duration guarantees of the normalizer
#[test]
fn test_normalizer_withRandomTimelines_shouldBeSequentialWithFloors() {
    let config = Config::default();
    let chunker = TextChunker::new(&config.timing);
    let heuristic = HeuristicTimeline::new(&config.timing);
    let normalizer = SequentialNormalizer::new(&config.normalizer, &config.timing);
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..200 {
        let transcript = random_transcript(&mut rng);
        let voice = random_voice(&mut rng);
        // Short audio squeezes the heuristic cues so the normalizer has overlaps to resolve
        let audio = rng.random_range(1.0..20.0);

        let cues = heuristic.build(&chunker.chunk(&transcript), &voice, audio);
        let normalized = normalizer.normalize(&cues, &voice);

        assert!(is_sequential(&normalized), "not sequential for {:?}", transcript);
        for cue in normalized.iter().filter(|c| c.is_spoken()) {
            assert!(cue.duration() + 1e-9 >= normalizer.min_duration(cue, &voice));
            assert!(cue.duration() + 1e-9 >= voice.min_cue_duration);
        }

        let tail: Vec<CueKind> = normalized.iter().rev().take(2).map(|c| c.kind).collect();
        assert_eq!(tail, vec![CueKind::Blank, CueKind::Marker]);
    }
}

/// Test that silence refinement never reintroduces overlaps
#[test]
fn test_silenceRefiner_withRandomSilences_shouldKeepOrdering() {
    let config = Config::default();
    let chunker = TextChunker::new(&config.timing);
    let heuristic = HeuristicTimeline::new(&config.timing);
    let normalizer = SequentialNormalizer::new(&config.normalizer, &config.timing);
    let refiner = SilenceRefiner::new(&config.silence);
    let mut rng = StdRng::seed_from_u64(99);

    for _ in 0..200 {
        let transcript = random_transcript(&mut rng);
        let voice = random_voice(&mut rng);
        let audio = rng.random_range(3.0..30.0);

        let normalized = normalizer.normalize(&heuristic.build(&chunker.chunk(&transcript), &voice, audio), &voice);

        let mut silences = Vec::new();
        let mut t = 0.0;
        while t < audio {
            t += rng.random_range(0.2..3.0);
            let length = rng.random_range(0.05..1.2);
            silences.push(SilenceInterval::new(t, t + length));
            t += length;
        }

        let refined = refiner.refine(&normalized, &silences, audio);
        assert_eq!(refined.len(), normalized.len());
        assert!(is_sequential(&refined), "refinement broke ordering for {:?}", transcript);
        for (before, after) in normalized.iter().zip(&refined) {
            assert!(after.start_time + 1e-9 >= before.start_time, "starts only move later");
            assert!(after.end_time <= before.end_time + 1e-9, "ends only move earlier");
        }
    }
}

/// Test chunker purity
#[test]
fn test_chunker_withSameInput_shouldBeIdempotent() {
    let config = Config::default();
    let chunker = TextChunker::new(&config.timing);
    let mut rng = StdRng::seed_from_u64(3);

    for _ in 0..50 {
        let transcript = random_transcript(&mut rng);
        assert_eq!(chunker.chunk(&transcript), chunker.chunk(&transcript));
    }
}

/// Test that directives never leak into caption text
#[test]
fn test_chunker_withDirectives_shouldNeverRenderThem() {
    let config = Config::default();
    let chunker = TextChunker::new(&config.timing);
    let mut rng = StdRng::seed_from_u64(11);

    for _ in 0..100 {
        let transcript = random_transcript(&mut rng);
        for unit in chunker.chunk(&transcript) {
            assert!(!unit.text.contains('(') && !unit.text.contains('['), "directive in {:?}", unit.text);
            assert!(unit.word_count() >= 1 && unit.word_count() <= config.timing.max_words_per_chunk);
        }
    }
}

/// Test the overlap scenario from two hand-written cues
#[test]
fn test_normalizer_withOverlappingPair_shouldPushSecondCue() {
    let config = Config::default();
    let normalizer = SequentialNormalizer::new(&config.normalizer, &config.timing);
    let voice = VoiceProfile {
        lead_time: 0.0,
        ..VoiceProfile::default()
    };

    let first = TimingCue {
        is_sentence_end: true,
        ..TimingCue::spoken("Hello there.", 1.0, 3.0)
    };
    let second = TimingCue::spoken("General Kenobi", 2.8, 4.5);

    let normalized = normalizer.normalize(&[first, second], &voice);
    let (a, b) = (&normalized[0], &normalized[1]);

    assert!(b.start_time >= a.end_time + config.normalizer.min_gap - 1e-9);
    assert!(b.duration() + 1e-9 >= normalizer.min_duration(b, &voice));
}
