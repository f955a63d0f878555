//! End-to-end pipeline runs with scripted recognition, mock translation and
//! a recording synthesizer.

use interpsh::error::Result;
use interpsh::pipeline::{Pipeline, PipelineConfig, PipelineReport, StopReason};
use interpsh::recognition::ScriptedRecognizer;
use interpsh::synthesis::MockSynthesizer;
use interpsh::translation::{Completion, MockEngine, MockReply, TranslationEngine};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Engine that upper-cases text after a per-text delay, and panics on texts
/// containing "crash" to simulate a lost translation.
struct SlowEngine {
    delays: Vec<(&'static str, Duration)>,
}

impl TranslationEngine for SlowEngine {
    fn complete(&self, _system_prompt: &str, user_text: &str, _max: u32) -> Result<Completion> {
        if user_text.contains("crash") {
            panic!("engine crashed on {user_text}");
        }
        if let Some((_, delay)) = self.delays.iter().find(|(t, _)| *t == user_text) {
            thread::sleep(*delay);
        }
        Ok(Completion::Content(user_text.to_uppercase()))
    }

    fn name(&self) -> &str {
        "slow"
    }
}

fn run(
    config: PipelineConfig,
    texts: &[&str],
    engine: Arc<dyn TranslationEngine>,
) -> (PipelineReport, Vec<String>) {
    let synth = MockSynthesizer::new();
    let spoken = synth.spoken();
    let recognizer = ScriptedRecognizer::session(texts.iter().map(|t| t.to_string()));

    let handle = Pipeline::new(config)
        .start(Box::new(recognizer), engine, Box::new(synth))
        .unwrap();
    let report = handle.wait();
    let spoken = spoken.lock().unwrap().clone();
    (report, spoken)
}

#[test]
fn utterances_are_spoken_in_capture_order() {
    let engine = MockEngine::new()
        .with_translation("Hello, how are you?", "你好,你好吗?")
        .with_translation("I am fine", "我很好")
        .with_translation("See you tomorrow", "明天见");

    let (report, spoken) = run(
        PipelineConfig::default(),
        &["Hello, how are you?", "I am fine", "See you tomorrow"],
        Arc::new(engine),
    );

    assert_eq!(spoken, vec!["你好,你好吗?", "我很好", "明天见"]);
    assert_eq!(report.stop_reason, Some(StopReason::SessionStopped));
    let summary = report.synthesis.unwrap();
    assert_eq!(summary.spoken, 3);
    assert_eq!(summary.skipped, 0);
}

#[test]
fn generated_whitespace_is_normalized_before_speaking() {
    let engine = MockEngine::new().with_translation("Good night", "  晚安 \n 朋友 .  ");
    let (_, spoken) = run(PipelineConfig::default(), &["Good night"], Arc::new(engine));
    assert_eq!(spoken, vec!["晚安 朋友."]);
}

#[test]
fn declined_translation_does_not_stall_later_ones() {
    let engine = MockEngine::new()
        .with_reply("something rude", MockReply::Declined("content_filter".to_string()))
        .with_translation("thank you", "谢谢");

    let start = Instant::now();
    let (report, spoken) = run(
        PipelineConfig::default(),
        &["something rude", "thank you"],
        Arc::new(engine),
    );

    assert_eq!(spoken, vec!["谢谢"]);
    let summary = report.synthesis.unwrap();
    assert_eq!(summary.untranslated, 1);
    assert_eq!(summary.skipped, 0);
    // Well under the default gap timeout
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[test]
fn permanent_engine_errors_yield_failed_results() {
    let engine = MockEngine::new().with_reply(
        "bad request",
        MockReply::Rejected("unsupported".to_string()),
    );
    let (report, spoken) = run(
        PipelineConfig::default(),
        &["bad request", "fine request"],
        Arc::new(engine),
    );

    assert_eq!(spoken, vec!["fine request"]);
    assert_eq!(report.synthesis.unwrap().untranslated, 1);
}

#[test]
fn transient_errors_are_retried_without_reordering() {
    let engine = Arc::new(
        MockEngine::new()
            .with_queued(MockReply::Unavailable)
            .with_queued(MockReply::Content("第一".to_string()))
            .with_translation("second one", "第二"),
    );
    let mut config = PipelineConfig::default();
    config.translation.retry_backoff = Duration::from_millis(5);

    let (report, spoken) = run(config, &["first one", "second one"], engine.clone());

    assert_eq!(spoken, vec!["第一", "第二"]);
    assert_eq!(report.synthesis.unwrap().spoken, 2);
    let first_attempts = engine
        .calls()
        .iter()
        .filter(|(_, text, _)| text == "first one")
        .count();
    assert_eq!(first_attempts, 2);
}

#[test]
fn rejected_credentials_end_translation_instead_of_failing_each_utterance() {
    let engine = Arc::new(
        MockEngine::new()
            .with_reply("good morning", MockReply::Unauthorized)
            .with_reply("good evening", MockReply::Unauthorized)
            .with_reply("good night", MockReply::Unauthorized),
    );
    let config = PipelineConfig {
        workers: 2,
        ..Default::default()
    };

    let (report, spoken) = run(
        config,
        &["good morning", "good evening", "good night"],
        engine.clone(),
    );

    assert!(spoken.is_empty());
    assert_eq!(report.synthesis.unwrap().spoken, 0);
    // One refusal per worker, then both exit
    assert!(engine.calls().len() <= 2);
}

#[test]
fn short_and_keyword_utterances_are_not_translated() {
    let engine = Arc::new(MockEngine::new());
    let (report, spoken) = run(
        PipelineConfig::default(),
        &["a", "ok then", "Stop.", "never heard"],
        engine.clone(),
    );

    assert_eq!(spoken, vec!["ok then"]);
    assert_eq!(report.stop_reason, Some(StopReason::StopWord));
    let translated: Vec<String> = engine.calls().into_iter().map(|(_, text, _)| text).collect();
    assert_eq!(translated, vec!["ok then"]);
}

#[test]
fn parallel_workers_still_speak_in_order() {
    let engine = SlowEngine {
        delays: vec![
            ("first", Duration::from_millis(200)),
            ("second", Duration::from_millis(100)),
            ("third", Duration::ZERO),
        ],
    };
    let config = PipelineConfig {
        workers: 3,
        ..Default::default()
    };

    let (report, spoken) = run(config, &["first", "second", "third"], Arc::new(engine));

    assert_eq!(spoken, vec!["FIRST", "SECOND", "THIRD"]);
    assert_eq!(report.synthesis.unwrap().spoken, 3);
}

#[test]
fn lost_translation_is_skipped() {
    let engine = SlowEngine { delays: vec![] };
    let config = PipelineConfig {
        workers: 2,
        gap_timeout: Duration::from_millis(200),
        ..Default::default()
    };

    let (report, spoken) = run(
        config,
        &["one", "crash here", "three", "four"],
        Arc::new(engine),
    );

    assert_eq!(spoken, vec!["ONE", "THREE", "FOUR"]);
    let summary = report.synthesis.unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.spoken, 3);
}

#[test]
fn session_stop_drains_in_flight_translations() {
    let engine = SlowEngine {
        delays: vec![
            ("slow one", Duration::from_millis(150)),
            ("slow two", Duration::from_millis(150)),
        ],
    };
    let (report, spoken) = run(
        PipelineConfig::default(),
        &["slow one", "slow two"],
        Arc::new(engine),
    );

    assert_eq!(report.stop_reason, Some(StopReason::SessionStopped));
    assert_eq!(spoken, vec!["SLOW ONE", "SLOW TWO"]);
}

#[test]
fn operator_stop_still_speaks_captured_utterances() {
    let synth = MockSynthesizer::new().with_delay(Duration::from_millis(20));
    let spoken = synth.spoken();
    let recognizer = ScriptedRecognizer::session(["early words", "late words"])
        .with_delay(Duration::from_millis(200));

    let mut config = PipelineConfig::default();
    config.capture.poll_interval = Duration::from_millis(10);
    let handle = Pipeline::new(config)
        .start(Box::new(recognizer), Arc::new(MockEngine::new()), Box::new(synth))
        .unwrap();

    // "early words" arrives at ~400ms, "late words" at ~600ms
    thread::sleep(Duration::from_millis(500));
    let report = handle.stop();

    assert_eq!(report.stop_reason, Some(StopReason::Operator));
    assert_eq!(*spoken.lock().unwrap(), vec!["early words"]);
}

#[test]
fn synthesis_failure_does_not_stop_the_session() {
    let synth = MockSynthesizer::new().with_failure_on("broken");
    let spoken: Arc<Mutex<Vec<String>>> = synth.spoken();
    let recognizer = ScriptedRecognizer::session(["broken", "working"]);

    let handle = Pipeline::new(PipelineConfig::default())
        .start(Box::new(recognizer), Arc::new(MockEngine::new()), Box::new(synth))
        .unwrap();
    let report = handle.wait();

    let summary = report.synthesis.unwrap();
    assert_eq!(summary.canceled, 1);
    assert_eq!(summary.spoken, 1);
    assert_eq!(*spoken.lock().unwrap(), vec!["broken", "working"]);
}

/// Writer shared with the test after the synthesizer has been moved away.
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn line_input_to_console_output() {
    use interpsh::recognition::LineRecognizer;
    use interpsh::synthesis::ConsoleSynthesizer;

    let input = "Good morning\n\nx\nHow are you?\n";
    let recognizer = LineRecognizer::new(Box::new(std::io::Cursor::new(input.as_bytes().to_vec())));
    let engine = MockEngine::new()
        .with_translation("Good morning", "早上好")
        .with_translation("How are you?", "你好吗?");
    let out = SharedBuffer::default();

    let handle = Pipeline::new(PipelineConfig::default())
        .start(
            Box::new(recognizer),
            Arc::new(engine),
            Box::new(ConsoleSynthesizer::new(out.clone())),
        )
        .unwrap();
    let report = handle.wait();

    assert_eq!(report.stop_reason, Some(StopReason::SessionStopped));
    let printed = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
    assert_eq!(printed, "早上好\n你好吗?\n");
}
