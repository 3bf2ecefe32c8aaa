use porter_core::mocks::{MockSynthesizer, RecordingSink};
use porter_core::{Language, SpeechState};
use porter_speech::{SentenceSegmenter, SpeechQueue, SpeechQueueConfig};
use std::sync::Arc;
use std::time::Duration;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn spawn(synth: &Arc<MockSynthesizer>, sink: &Arc<RecordingSink>) -> SpeechQueue {
    SpeechQueue::spawn(synth.clone(), sink.clone(), SpeechQueueConfig::default())
}

#[tokio::test(start_paused = true)]
async fn test_playback_follows_enqueue_order_not_completion_order() {
    let synth = Arc::new(
        MockSynthesizer::new(ms(10))
            .with_delay("First.", ms(300))
            .with_delay("Second.", ms(50)),
    );
    let sink = Arc::new(RecordingSink::new(ms(20)));
    let queue = spawn(&synth, &sink);

    for sentence in ["First.", "Second.", "Third."] {
        queue.enqueue(sentence, Language::English).unwrap();
    }
    queue.finish().await;

    assert_eq!(synth.completed(), vec!["Third.", "Second.", "First."]);
    assert_eq!(sink.played_texts(), vec!["First.", "Second.", "Third."]);
    let seqs: Vec<u64> = sink.played().iter().map(|u| u.seq).collect();
    assert_eq!(seqs, vec![0, 1, 2]);
    assert_eq!(sink.overlaps(), 0);
    assert_eq!(queue.state(), SpeechState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_at_most_three_syntheses_in_flight() {
    let synth = Arc::new(MockSynthesizer::new(ms(100)));
    let sink = Arc::new(RecordingSink::new(ms(5)));
    let queue = spawn(&synth, &sink);

    let sentences: Vec<String> = (0..10).map(|i| format!("Sentence {i}.")).collect();
    for sentence in &sentences {
        queue.enqueue(sentence.clone(), Language::English).unwrap();
    }
    queue.finish().await;

    assert_eq!(synth.max_in_flight(), 3);
    assert_eq!(sink.played_texts(), sentences);
    assert_eq!(sink.overlaps(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_synthesis_is_skipped() {
    let synth = Arc::new(MockSynthesizer::new(ms(10)).failing_on("Broken."));
    let sink = Arc::new(RecordingSink::new(ms(10)));
    let queue = spawn(&synth, &sink);

    for sentence in ["Before.", "Broken.", "After."] {
        queue.enqueue(sentence, Language::English).unwrap();
    }
    queue.finish().await;

    assert_eq!(sink.played_texts(), vec!["Before.", "After."]);
}

#[tokio::test(start_paused = true)]
async fn test_stop_clears_queues_and_interrupts_playback() {
    let synth = Arc::new(MockSynthesizer::new(ms(100)));
    let sink = Arc::new(RecordingSink::new(ms(1000)));
    let queue = spawn(&synth, &sink);

    for i in 0..5 {
        queue.enqueue(format!("Sentence {i}."), Language::English).unwrap();
    }
    // First three synthesized at 100ms; sentence 0 is now playing.
    tokio::time::sleep(ms(150)).await;
    assert_eq!(queue.state(), SpeechState::Playing);

    queue.stop();
    assert_eq!(queue.state(), SpeechState::Stopped);
    assert!(queue.enqueue("Too early.", Language::English).is_err());

    tokio::time::sleep(ms(50)).await;
    assert_eq!(sink.interrupted(), vec![0]);
    assert!(sink.played().is_empty());

    // Guard delay over: ready again.
    tokio::time::sleep(ms(200)).await;
    assert_eq!(queue.state(), SpeechState::Idle);

    // In-flight synthesis of sentences 3 and 4 was abandoned.
    assert_eq!(synth.completed().len(), 3);

    queue.enqueue("After stop.", Language::English).unwrap();
    queue.finish().await;
    assert_eq!(sink.played_texts(), vec!["After stop."]);
    assert_eq!(sink.played()[0].seq, 5);
}

#[tokio::test(start_paused = true)]
async fn test_result_landing_after_stop_is_discarded() {
    let synth = Arc::new(MockSynthesizer::new(ms(200)));
    let sink = Arc::new(RecordingSink::new(ms(10)));
    let queue = spawn(&synth, &sink);

    queue.enqueue("Slow sentence.", Language::English).unwrap();
    tokio::time::sleep(ms(50)).await;
    queue.stop();

    tokio::time::sleep(ms(500)).await;
    assert!(sink.played().is_empty());
    assert!(sink.interrupted().is_empty());
    assert_eq!(queue.state(), SpeechState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent_and_safe_when_idle() {
    let synth = Arc::new(MockSynthesizer::new(ms(10)));
    let sink = Arc::new(RecordingSink::new(ms(10)));
    let queue = spawn(&synth, &sink);

    queue.stop();
    queue.stop();
    assert_eq!(queue.state(), SpeechState::Stopped);

    tokio::time::sleep(ms(150)).await;
    assert_eq!(queue.state(), SpeechState::Idle);

    queue.enqueue("Hello.", Language::English).unwrap();
    queue.finish().await;
    assert_eq!(sink.played_texts(), vec!["Hello."]);

    // After the scheduler has exited, stop is still harmless.
    queue.stop();
    assert_eq!(queue.state(), SpeechState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_segmented_stream_is_spoken_in_order() {
    let synth = Arc::new(MockSynthesizer::new(ms(30)).with_delay("Berth 7 is busy.", ms(120)));
    let sink = Arc::new(RecordingSink::new(ms(15)));
    let queue = spawn(&synth, &sink);

    let mut segmenter = SentenceSegmenter::new();
    for fragment in ["Berth 7 ", "is busy. Queue ", "is short. ", "港口很忙。 ", "Done"] {
        for sentence in segmenter.push(fragment) {
            queue.enqueue(sentence, Language::English).unwrap();
        }
    }
    if let Some(rest) = segmenter.finish() {
        queue.enqueue(rest, Language::English).unwrap();
    }
    queue.finish().await;

    assert_eq!(
        sink.played_texts(),
        vec!["Berth 7 is busy.", "Queue is short.", "港口很忙。", "Done"]
    );
}
