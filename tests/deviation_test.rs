use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use slidepipe::{
    ApplyMode, ChartSpec, ContentGenerator, DeckMutator, Enhancer, EnhancerConfig,
    EnhancerStatus, SlideContent, SlideLayout, StyleGuide, VisualResolver,
};

struct ScriptedGenerator {
    deviations: Mutex<VecDeque<Option<String>>>,
    check_calls: AtomicUsize,
    generate_calls: AtomicUsize,
    check_delay: Duration,
}

impl ScriptedGenerator {
    fn new(script: Vec<Option<&str>>) -> Arc<Self> {
        Self::with_delay(script, Duration::ZERO)
    }

    fn with_delay(script: Vec<Option<&str>>, check_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            deviations: Mutex::new(
                script
                    .into_iter()
                    .map(|entry| entry.map(str::to_string))
                    .collect(),
            ),
            check_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
            check_delay,
        })
    }
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    async fn check_deviation(&self, _: &str, _: &str) -> Result<Option<String>> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        if !self.check_delay.is_zero() {
            tokio::time::sleep(self.check_delay).await;
        }
        Ok(self.deviations.lock().unwrap().pop_front().flatten())
    }

    async fn generate(&self, topic: &str, _: &StyleGuide) -> Result<Option<SlideContent>> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(
            SlideContent {
                title: topic.to_string(),
                points: vec!["generated point".to_string()],
                chart: None,
                image_query: None,
                layout: SlideLayout::TextOnly,
            }
            .normalize(),
        ))
    }
}

struct NoVisuals;

#[async_trait]
impl VisualResolver for NoVisuals {
    fn create_chart(&self, _: &ChartSpec) -> Option<PathBuf> {
        None
    }

    async fn get_icon(&self, _: &str) -> Option<PathBuf> {
        None
    }

    async fn get_image(&self, _: &str) -> Option<PathBuf> {
        None
    }
}

struct MemoryDeck {
    texts: Mutex<Vec<String>>,
    position: Mutex<usize>,
    applied: Mutex<Vec<(usize, ApplyMode)>>,
}

impl MemoryDeck {
    fn new(texts: Vec<&str>) -> Arc<Self> {
        Arc::new(Self {
            texts: Mutex::new(texts.into_iter().map(str::to_string).collect()),
            position: Mutex::new(1),
            applied: Mutex::new(Vec::new()),
        })
    }

    fn applied(&self) -> Vec<(usize, ApplyMode)> {
        self.applied.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeckMutator for MemoryDeck {
    async fn current_slide_index(&self) -> Option<usize> {
        Some(*self.position.lock().unwrap())
    }

    async fn slide_text(&self, index: usize) -> Result<String> {
        self.texts
            .lock()
            .unwrap()
            .get(index - 1)
            .cloned()
            .ok_or_else(|| anyhow!("slide {} out of range", index))
    }

    async fn apply_content(
        &self,
        index: usize,
        content: &SlideContent,
        _: &StyleGuide,
        _: Option<&Path>,
        mode: ApplyMode,
    ) -> Result<usize> {
        let written = match mode {
            ApplyMode::Insert => {
                self.texts.lock().unwrap().insert(index, content.title.clone());
                let written = index + 1;
                *self.position.lock().unwrap() = written;
                written
            }
            ApplyMode::Update => {
                self.texts.lock().unwrap()[index - 1] = content.title.clone();
                *self.position.lock().unwrap() = index;
                index
            }
        };
        self.applied.lock().unwrap().push((index, mode));
        Ok(written)
    }
}

fn test_enhancer(
    generator: Arc<ScriptedGenerator>,
    deck: Arc<MemoryDeck>,
) -> Enhancer {
    let enhancer = Enhancer::new(
        generator,
        Arc::new(NoVisuals),
        None,
        EnhancerConfig {
            check_interval: Duration::from_millis(50),
            dedupe_topics: true,
        },
    );
    enhancer
        .attach_deck(deck, StyleGuide::default(), "test deck")
        .unwrap();
    enhancer
}

fn feed(enhancer: &Enhancer, utterances: &[&str]) {
    let tx = enhancer.transcript_sender();
    for utterance in utterances {
        tx.send(utterance.to_string()).unwrap();
    }
}

#[tokio::test]
async fn no_check_fires_below_three_utterances() {
    let generator = ScriptedGenerator::new(vec![]);
    let deck = MemoryDeck::new(vec!["Q2 Revenue"]);
    let enhancer = test_enhancer(generator.clone(), deck.clone());

    enhancer.start().unwrap();
    feed(&enhancer, &["so as you can see", "revenue went up"]);
    tokio::time::sleep(Duration::from_millis(300)).await;
    enhancer.stop().await;

    assert_eq!(generator.check_calls.load(Ordering::SeqCst), 0);
    assert!(deck.applied().is_empty());
}

#[tokio::test]
async fn on_topic_speech_stays_listening_and_drains_the_buffer() {
    let generator = ScriptedGenerator::new(vec![None]);
    let deck = MemoryDeck::new(vec!["Q2 Revenue"]);
    let enhancer = test_enhancer(generator.clone(), deck.clone());

    enhancer.start().unwrap();
    feed(
        &enhancer,
        &[
            "q2 revenue came in strong",
            "revenue was up twelve percent",
            "that beat the revenue forecast",
        ],
    );
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(generator.check_calls.load(Ordering::SeqCst) >= 1);
    assert_eq!(generator.generate_calls.load(Ordering::SeqCst), 0);
    assert_eq!(enhancer.status().status, EnhancerStatus::Listening);
    assert_eq!(enhancer.buffered_utterances(), 0);
    assert!(deck.applied().is_empty());

    enhancer.stop().await;
    assert_eq!(enhancer.status().status, EnhancerStatus::Idle);
}

#[tokio::test]
async fn deviation_inserts_then_later_updates_the_tracked_slide() {
    let generator = ScriptedGenerator::new(vec![
        Some("electric vehicle adoption"),
        Some("ev battery supply chain"),
    ]);
    let deck = MemoryDeck::new(vec!["Q2 Revenue"]);
    let enhancer = test_enhancer(generator.clone(), deck.clone());

    enhancer.start().unwrap();
    feed(
        &enhancer,
        &[
            "let me take a detour here",
            "electric vehicle adoption is exploding",
            "fourteen million EVs sold last year",
        ],
    );
    tokio::time::sleep(Duration::from_millis(300)).await;

    // first deviation: insert after slide 1 and navigate there
    assert_eq!(deck.applied(), vec![(1, ApplyMode::Insert)]);
    assert_eq!(*deck.position.lock().unwrap(), 2);

    feed(
        &enhancer,
        &[
            "staying on EVs a bit longer",
            "battery supply chains are the bottleneck",
            "lithium prices tripled since 2021",
        ],
    );
    tokio::time::sleep(Duration::from_millis(300)).await;
    enhancer.stop().await;

    // second deviation lands on the slide we created, so it updates in place
    assert_eq!(
        deck.applied(),
        vec![(1, ApplyMode::Insert), (2, ApplyMode::Update)]
    );
    assert_eq!(generator.generate_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn stop_waits_for_the_inflight_check_and_discards_its_result() {
    let generator = ScriptedGenerator::with_delay(
        vec![Some("a topic that arrived too late")],
        Duration::from_millis(200),
    );
    let deck = MemoryDeck::new(vec!["Q2 Revenue"]);
    let enhancer = test_enhancer(generator.clone(), deck.clone());

    enhancer.start().unwrap();
    feed(
        &enhancer,
        &["first utterance", "second utterance", "third utterance"],
    );
    // let the cycle start, then stop while the check is still in flight
    tokio::time::sleep(Duration::from_millis(80)).await;
    enhancer.stop().await;

    assert_eq!(generator.check_calls.load(Ordering::SeqCst), 1);
    assert_eq!(generator.generate_calls.load(Ordering::SeqCst), 0);
    assert!(deck.applied().is_empty());
    assert_eq!(enhancer.status().status, EnhancerStatus::Idle);
}

#[tokio::test]
async fn manual_generation_always_inserts_even_on_tracked_slides() {
    let generator = ScriptedGenerator::new(vec![]);
    let deck = MemoryDeck::new(vec!["Q2 Revenue"]);
    let enhancer = test_enhancer(generator.clone(), deck.clone());

    enhancer.generate_manual("hydrogen aviation").await.unwrap();
    assert_eq!(deck.applied(), vec![(1, ApplyMode::Insert)]);

    // current slide is now the generated one; manual generation must still insert
    enhancer.generate_manual("fusion startups").await.unwrap();
    assert_eq!(
        deck.applied(),
        vec![(1, ApplyMode::Insert), (2, ApplyMode::Insert)]
    );
}

#[tokio::test]
async fn manual_generation_requires_a_topic_and_a_deck() {
    let generator = ScriptedGenerator::new(vec![]);
    let deck = MemoryDeck::new(vec!["Q2 Revenue"]);
    let enhancer = test_enhancer(generator, deck);

    assert!(enhancer.generate_manual("   ").await.is_err());

    let bare = Enhancer::new(
        ScriptedGenerator::new(vec![]),
        Arc::new(NoVisuals),
        None,
        EnhancerConfig::default(),
    );
    assert!(bare.generate_manual("anything").await.is_err());
}
