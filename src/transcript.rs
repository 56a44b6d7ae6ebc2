use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// A transcription producer: once started it delivers text chunks into the
/// channel until stopped. Silence is allowed to produce nothing at all.
pub trait TranscriptSource: Send + Sync {
    fn start(&self, tx: mpsc::UnboundedSender<String>) -> Result<()>;
    fn stop(&self);
}

/// Reads transcript lines from stdin. Stands in for a real speech-to-text
/// engine during demos and manual testing; each line is one utterance.
pub struct StdinSource {
    running: Arc<AtomicBool>,
}

impl StdinSource {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptSource for StdinSource {
    fn start(&self, tx: mpsc::UnboundedSender<String>) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let running = Arc::clone(&self.running);
        // blocking reader thread; it notices a stop on the next line
        std::thread::spawn(move || {
            info!("stdin transcript source started, type utterances and press enter");
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                match line {
                    Ok(text) => {
                        if text.trim().is_empty() {
                            continue;
                        }
                        if tx.send(text).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
            running.store(false, Ordering::SeqCst);
            debug!("stdin transcript source stopped");
        });

        Ok(())
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}
