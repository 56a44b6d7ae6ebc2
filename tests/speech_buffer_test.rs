use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use slidepipe::{SpeechBuffer, SPEECH_BUFFER_CAPACITY};

#[test]
fn retains_exactly_the_most_recent_utterances_in_order() {
    let buffer = SpeechBuffer::default();
    for i in 1..=15 {
        buffer.push(format!("utterance {}", i));
    }

    assert_eq!(buffer.len(), SPEECH_BUFFER_CAPACITY);

    let joined = buffer.snapshot_and_clear();
    let expected = (6..=15)
        .map(|i| format!("utterance {}", i))
        .collect::<Vec<_>>()
        .join(" ");
    assert_eq!(joined, expected);
}

#[test]
fn snapshot_clears_the_buffer() {
    let buffer = SpeechBuffer::default();
    buffer.push("first");
    buffer.push("second");

    assert_eq!(buffer.snapshot_and_clear(), "first second");
    assert!(buffer.is_empty());
    assert_eq!(buffer.snapshot_and_clear(), "");
}

#[test]
fn underfilled_buffer_keeps_everything() {
    let buffer = SpeechBuffer::new(5);
    buffer.push("a");
    buffer.push("b");
    assert_eq!(buffer.len(), 2);
    assert_eq!(buffer.snapshot_and_clear(), "a b");
}

#[test]
fn clear_empties_without_returning() {
    let buffer = SpeechBuffer::default();
    buffer.push("something");
    buffer.clear();
    assert!(buffer.is_empty());
}

// Concurrent pushes racing a draining reader: every utterance must end up in
// exactly one snapshot, none lost, none duplicated. Capacity is sized so
// eviction never kicks in and the count is exact.
#[test]
fn concurrent_pushes_and_drains_neither_lose_nor_duplicate() {
    const WRITERS: usize = 4;
    const PER_WRITER: usize = 250;

    let buffer = Arc::new(SpeechBuffer::new(WRITERS * PER_WRITER));
    let mut handles = Vec::new();

    for writer in 0..WRITERS {
        let buffer = Arc::clone(&buffer);
        handles.push(thread::spawn(move || {
            for i in 0..PER_WRITER {
                buffer.push(format!("w{}u{}", writer, i));
            }
        }));
    }

    let reader = {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || {
            let mut seen = Vec::new();
            for _ in 0..100 {
                let snapshot = buffer.snapshot_and_clear();
                seen.extend(
                    snapshot
                        .split_whitespace()
                        .map(str::to_string)
                        .collect::<Vec<_>>(),
                );
                thread::yield_now();
            }
            seen
        })
    };

    for handle in handles {
        handle.join().unwrap();
    }
    let mut seen = reader.join().unwrap();
    seen.extend(
        buffer
            .snapshot_and_clear()
            .split_whitespace()
            .map(str::to_string),
    );

    assert_eq!(seen.len(), WRITERS * PER_WRITER);
    let unique: HashSet<&String> = seen.iter().collect();
    assert_eq!(unique.len(), WRITERS * PER_WRITER);
}
