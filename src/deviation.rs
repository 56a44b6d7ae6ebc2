use std::sync::Arc;

use tracing::{debug, warn};

use crate::generator::ContentGenerator;

const MAX_TOPIC_WORDS: usize = 10;

/// Decides whether the presenter has drifted away from the displayed slide.
/// Any fault in the underlying judgment is treated as "still on topic" so a
/// bad cycle never takes the scheduler down.
pub struct DeviationDetector {
    generator: Arc<dyn ContentGenerator>,
    dedupe_against_slide: bool,
}

impl DeviationDetector {
    pub fn new(generator: Arc<dyn ContentGenerator>, dedupe_against_slide: bool) -> Self {
        Self {
            generator,
            dedupe_against_slide,
        }
    }

    pub async fn detect(&self, slide_text: &str, recent_speech: &str) -> Option<String> {
        let label = match self
            .generator
            .check_deviation(slide_text, recent_speech)
            .await
        {
            Ok(Some(label)) => label,
            Ok(None) => return None,
            Err(e) => {
                warn!("deviation check failed, treating as on-topic: {:#}", e);
                return None;
            }
        };

        let label = clamp_topic(&label);
        if label.is_empty() {
            return None;
        }

        if self.dedupe_against_slide
            && slide_text.to_lowercase().contains(&label.to_lowercase())
        {
            debug!("topic '{}' is already covered by the slide, ignoring", label);
            return None;
        }

        Some(label)
    }
}

fn clamp_topic(label: &str) -> String {
    label
        .split_whitespace()
        .take(MAX_TOPIC_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}
