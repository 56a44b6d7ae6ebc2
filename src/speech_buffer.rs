use std::collections::VecDeque;
use std::sync::Mutex;

pub const SPEECH_BUFFER_CAPACITY: usize = 10;

/// Sliding window of recent transcribed utterances.
/// The transcript producer pushes, the deviation checker drains — one lock
/// covers both so no utterance is ever both snapshotted and retained.
pub struct SpeechBuffer {
    inner: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl SpeechBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append an utterance. Oldest entries are dropped once the buffer
    /// exceeds capacity; pushing to a full buffer is normal operation.
    pub fn push(&self, utterance: impl Into<String>) {
        let mut buf = self.inner.lock().unwrap();
        buf.push_back(utterance.into());
        while buf.len() > self.capacity {
            buf.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Join everything buffered so far in arrival order, then empty the
    /// buffer. A second call without intervening pushes returns "".
    pub fn snapshot_and_clear(&self) -> String {
        let mut buf = self.inner.lock().unwrap();
        let joined = buf.iter().map(String::as_str).collect::<Vec<_>>().join(" ");
        buf.clear();
        joined
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().clear();
    }
}

impl Default for SpeechBuffer {
    fn default() -> Self {
        Self::new(SPEECH_BUFFER_CAPACITY)
    }
}
