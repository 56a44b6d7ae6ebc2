use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::content::StyleGuide;
use crate::coordinator::{ApplyOutcome, UpdateCoordinator};
use crate::deck::DeckMutator;
use crate::deviation::DeviationDetector;
use crate::generator::ContentGenerator;
use crate::speech_buffer::SpeechBuffer;
use crate::transcript::TranscriptSource;
use crate::visuals::VisualResolver;

pub const CHECK_INTERVAL: Duration = Duration::from_secs(8);
pub const MIN_UTTERANCES_FOR_CHECK: usize = 3;

// how long a transient failure stays visible before the loop settles back
const ERROR_DISPLAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnhancerStatus {
    Idle,
    Listening,
    Analyzing,
    Updating,
    Error,
}

impl fmt::Display for EnhancerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnhancerStatus::Idle => write!(f, "idle"),
            EnhancerStatus::Listening => write!(f, "listening"),
            EnhancerStatus::Analyzing => write!(f, "analyzing"),
            EnhancerStatus::Updating => write!(f, "updating"),
            EnhancerStatus::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub status: EnhancerStatus,
    pub message: String,
}

pub struct EnhancerConfig {
    pub check_interval: Duration,
    pub dedupe_topics: bool,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            check_interval: CHECK_INTERVAL,
            dedupe_topics: true,
        }
    }
}

/// One selected deck: the mutation handle, its extracted style, and the
/// coordinator whose tracked-slide set lives and dies with it.
struct Session {
    deck: Arc<dyn DeckMutator>,
    style: StyleGuide,
    coordinator: UpdateCoordinator,
    label: String,
}

/// Orchestrates the whole pipeline: drains the transcript stream into the
/// speech buffer, runs a deviation check on a timer (never more than one in
/// flight), and hands detected topics to the update coordinator. Cheap to
/// clone; all clones share the same engine.
#[derive(Clone)]
pub struct Enhancer {
    inner: Arc<Inner>,
}

struct Inner {
    generator: Arc<dyn ContentGenerator>,
    visuals: Arc<dyn VisualResolver>,
    source: Option<Arc<dyn TranscriptSource>>,
    buffer: Arc<SpeechBuffer>,
    detector: DeviationDetector,
    session: Mutex<Option<Arc<Session>>>,
    status: Mutex<StatusSnapshot>,
    is_running: Arc<AtomicBool>,
    check_in_flight: Arc<AtomicBool>,
    check_loop: Mutex<Option<tokio::task::JoinHandle<()>>>,
    check_interval: Duration,
    transcript_tx: mpsc::UnboundedSender<String>,
}

impl Enhancer {
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        visuals: Arc<dyn VisualResolver>,
        source: Option<Arc<dyn TranscriptSource>>,
        config: EnhancerConfig,
    ) -> Self {
        let (transcript_tx, transcript_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(Inner {
            detector: DeviationDetector::new(Arc::clone(&generator), config.dedupe_topics),
            generator,
            visuals,
            source,
            buffer: Arc::new(SpeechBuffer::default()),
            session: Mutex::new(None),
            status: Mutex::new(StatusSnapshot {
                status: EnhancerStatus::Idle,
                message: "no deck selected".to_string(),
            }),
            is_running: Arc::new(AtomicBool::new(false)),
            check_in_flight: Arc::new(AtomicBool::new(false)),
            check_loop: Mutex::new(None),
            check_interval: config.check_interval,
            transcript_tx,
        });

        inner.spawn_transcript_pump(transcript_rx);
        Self { inner }
    }

    /// Sender any transcription producer can feed utterances into.
    pub fn transcript_sender(&self) -> mpsc::UnboundedSender<String> {
        self.inner.transcript_tx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    pub fn status(&self) -> StatusSnapshot {
        self.inner.status.lock().unwrap().clone()
    }

    pub fn buffered_utterances(&self) -> usize {
        self.inner.buffer.len()
    }

    pub fn deck_selected(&self) -> bool {
        self.inner.session.lock().unwrap().is_some()
    }

    pub fn deck_label(&self) -> Option<String> {
        self.inner
            .session
            .lock()
            .unwrap()
            .as_ref()
            .map(|session| session.label.clone())
    }

    /// Select a deck for this session. Clears the tracked-slide set and the
    /// speech buffer. Not allowed while the enhancer is running.
    pub fn attach_deck(
        &self,
        deck: Arc<dyn DeckMutator>,
        style: StyleGuide,
        label: impl Into<String>,
    ) -> Result<()> {
        if self.is_running() {
            bail!("stop the enhancer before switching decks");
        }

        let label = label.into();
        let coordinator = UpdateCoordinator::new(
            Arc::clone(&self.inner.generator),
            Arc::clone(&self.inner.visuals),
            Arc::clone(&deck),
        );

        *self.inner.session.lock().unwrap() = Some(Arc::new(Session {
            deck,
            style,
            coordinator,
            label: label.clone(),
        }));
        self.inner.buffer.clear();
        self.inner
            .set_status(EnhancerStatus::Idle, format!("deck ready: {}", label));
        info!("deck selected: {}", label);
        Ok(())
    }

    /// Idle -> Listening: start the transcript producer and the periodic
    /// deviation check loop. No-op when already running.
    pub fn start(&self) -> Result<()> {
        let session = self
            .inner
            .current_session()
            .ok_or_else(|| anyhow!("no deck selected"))?;

        if self.inner.is_running.swap(true, Ordering::SeqCst) {
            debug!("enhancer already running");
            return Ok(());
        }

        if let Some(source) = &self.inner.source {
            source.start(self.inner.transcript_tx.clone())?;
        }

        self.inner
            .set_status(EnhancerStatus::Listening, "listening for speech");
        info!("auto enhancer started");

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            inner.run_check_loop(session).await;
        });
        *self.inner.check_loop.lock().unwrap() = Some(handle);
        Ok(())
    }

    /// Any state -> Idle: cancel the pending timer immediately, stop the
    /// producer, and wait for an in-flight check to finish before declaring
    /// stopped. The check itself is not killed; its result gets discarded.
    pub async fn stop(&self) {
        if !self.inner.is_running.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Some(handle) = self.inner.check_loop.lock().unwrap().take() {
            handle.abort();
        }

        if let Some(source) = &self.inner.source {
            source.stop();
        }

        while self.inner.check_in_flight.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        self.inner.set_status(EnhancerStatus::Idle, "stopped");
        info!("auto enhancer stopped");
    }

    /// Manually generate a slide for `topic`. Always inserts, never updates,
    /// but still goes through the coordinator's single-apply discipline.
    /// Unlike the automatic path, failures here are reported to the caller.
    pub async fn generate_manual(&self, topic: &str) -> Result<ApplyOutcome> {
        let topic = topic.trim();
        if topic.is_empty() {
            bail!("topic must not be empty");
        }
        let session = self
            .inner
            .current_session()
            .ok_or_else(|| anyhow!("no deck selected"))?;
        let index = session
            .deck
            .current_slide_index()
            .await
            .ok_or_else(|| anyhow!("no active slide to insert after"))?;

        self.inner.set_status(
            EnhancerStatus::Updating,
            format!("new topic '{}', inserting slide", topic),
        );

        let result = session
            .coordinator
            .apply(topic, index, &session.style, false)
            .await;

        match &result {
            Ok(ApplyOutcome::GenerationFailed) => {
                self.inner
                    .set_status(EnhancerStatus::Error, "failed to generate content");
            }
            Ok(_) => self.inner.settle(),
            Err(e) => {
                error!("manual generation failed: {:#}", e);
                self.inner.set_status(
                    EnhancerStatus::Error,
                    format!("manual generation failed: {}", e),
                );
            }
        }
        result
    }
}

impl Inner {
    fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    fn current_session(&self) -> Option<Arc<Session>> {
        self.session.lock().unwrap().clone()
    }

    fn set_status(&self, status: EnhancerStatus, message: impl Into<String>) {
        let mut snapshot = self.status.lock().unwrap();
        snapshot.status = status;
        snapshot.message = message.into();
    }

    /// Return to the resting state for the current run mode.
    fn settle(&self) {
        if self.is_running() {
            self.set_status(EnhancerStatus::Listening, "listening for speech");
        } else {
            self.set_status(EnhancerStatus::Idle, "ready");
        }
    }

    /// Surface a failure, keep it visible briefly, then settle. Runs inside
    /// the detection task, so the in-flight flag stays held while the error
    /// is showing.
    async fn report_failure(&self, message: impl Into<String>) {
        self.set_status(EnhancerStatus::Error, message);
        tokio::time::sleep(ERROR_DISPLAY).await;
        self.settle();
    }

    fn spawn_transcript_pump(&self, mut rx: mpsc::UnboundedReceiver<String>) {
        let buffer = Arc::clone(&self.buffer);
        let is_running = Arc::clone(&self.is_running);
        tokio::spawn(async move {
            while let Some(text) = rx.recv().await {
                if !is_running.load(Ordering::SeqCst) || text.trim().is_empty() {
                    continue;
                }
                debug!("buffered utterance: {}", text.trim());
                buffer.push(text);
            }
            debug!("transcript pump stopped");
        });
    }

    async fn run_check_loop(self: Arc<Self>, session: Arc<Session>) {
        let mut interval = tokio::time::interval(self.check_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await; // first tick completes immediately

        while self.is_running() {
            interval.tick().await;
            if !self.is_running() {
                break;
            }
            // never two checks in flight; the timer just skips this cycle
            if self.check_in_flight.swap(true, Ordering::SeqCst) {
                continue;
            }

            let me = Arc::clone(&self);
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                me.run_deviation_cycle(&session).await;
                me.check_in_flight.store(false, Ordering::SeqCst);
            });
        }
        debug!("periodic check loop exited");
    }

    async fn run_deviation_cycle(&self, session: &Session) {
        if self.buffer.len() < MIN_UTTERANCES_FOR_CHECK {
            return;
        }

        let Some(index) = session.deck.current_slide_index().await else {
            debug!("no active slide, skipping deviation check");
            return;
        };
        let slide_text = match session.deck.slide_text(index).await {
            Ok(text) => text,
            Err(e) => {
                debug!("could not read slide {}: {:#}", index, e);
                return;
            }
        };
        let slide_text = if slide_text.trim().is_empty() {
            "An empty slide.".to_string()
        } else {
            slide_text
        };

        let recent_speech = self.buffer.snapshot_and_clear();
        if recent_speech.trim().is_empty() {
            return;
        }

        self.set_status(EnhancerStatus::Analyzing, "analyzing speech vs. slide");

        let Some(topic) = self.detector.detect(&slide_text, &recent_speech).await else {
            self.settle();
            return;
        };

        // the system may have been stopped while the check was running;
        // a stale result must not touch the deck
        if !self.is_running() {
            debug!("stopped during detection, discarding topic '{}'", topic);
            return;
        }

        let is_update = session.coordinator.is_tracked(index);
        self.set_status(
            EnhancerStatus::Updating,
            format!(
                "new topic '{}', {} slide",
                topic,
                if is_update { "updating" } else { "inserting" }
            ),
        );

        match session
            .coordinator
            .apply(&topic, index, &session.style, is_update)
            .await
        {
            Ok(ApplyOutcome::GenerationFailed) => {
                self.report_failure("failed to generate content").await;
            }
            Ok(outcome) => {
                debug!("apply finished: {:?}", outcome);
                self.settle();
            }
            Err(e) => {
                error!("slide update failed: {:#}", e);
                self.report_failure(format!("slide update failed: {}", e))
                    .await;
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::SeqCst);
        if let Some(source) = &self.source {
            source.stop();
        }
    }
}
