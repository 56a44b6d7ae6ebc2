use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::content::{SlideContent, StyleGuide};
use crate::deck::{ApplyMode, DeckMutator};
use crate::generator::ContentGenerator;
use crate::visuals::VisualResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Inserted(usize),
    Updated(usize),
    /// The generator produced nothing usable. The deck was not touched.
    GenerationFailed,
}

/// Turns a topic into an applied slide mutation: generate content, resolve
/// the visual, then insert or update. Applies are strictly serialized — the
/// deck is not safe for concurrent structural edits — and slides created
/// here are tracked so later deviations on them update in place.
pub struct UpdateCoordinator {
    generator: Arc<dyn ContentGenerator>,
    visuals: Arc<dyn VisualResolver>,
    deck: Arc<dyn DeckMutator>,
    tracked: Mutex<HashSet<usize>>,
    update_lock: tokio::sync::Mutex<()>,
}

impl UpdateCoordinator {
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        visuals: Arc<dyn VisualResolver>,
        deck: Arc<dyn DeckMutator>,
    ) -> Self {
        Self {
            generator,
            visuals,
            deck,
            tracked: Mutex::new(HashSet::new()),
            update_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Whether `index` was created by this coordinator during the current
    /// deck session.
    pub fn is_tracked(&self, index: usize) -> bool {
        self.tracked.lock().unwrap().contains(&index)
    }

    pub fn tracked_slides(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.tracked.lock().unwrap().iter().copied().collect();
        indices.sort_unstable();
        indices
    }

    /// Run the full generate -> resolve-visual -> mutate sequence. With
    /// `is_update` the slide at `slide_index` is rebuilt in place, otherwise
    /// a new slide is inserted right after it. Concurrent callers queue.
    pub async fn apply(
        &self,
        topic: &str,
        slide_index: usize,
        style: &StyleGuide,
        is_update: bool,
    ) -> Result<ApplyOutcome> {
        let _guard = self.update_lock.lock().await;

        let content = match self
            .generator
            .generate(topic, style)
            .await
            .context("content generation failed")?
        {
            Some(content) => content,
            None => {
                warn!("generator returned no usable content for '{}'", topic);
                return Ok(ApplyOutcome::GenerationFailed);
            }
        };

        let visual = self.resolve_visual(&content).await;
        let mode = if is_update {
            ApplyMode::Update
        } else {
            ApplyMode::Insert
        };

        let written = self
            .deck
            .apply_content(slide_index, &content, style, visual.as_deref(), mode)
            .await?;

        if !is_update {
            self.tracked.lock().unwrap().insert(written);
            info!("new slide at index {} is now being tracked", written);
        }

        Ok(if is_update {
            ApplyOutcome::Updated(written)
        } else {
            ApplyOutcome::Inserted(written)
        })
    }

    /// Chart first when the content asks for one, then icon, then photo.
    /// Nothing resolving is fine — the slide goes text-only.
    async fn resolve_visual(&self, content: &SlideContent) -> Option<PathBuf> {
        if let Some(spec) = &content.chart {
            return self.visuals.create_chart(spec);
        }
        let query = content.image_query.as_deref()?;
        if let Some(icon) = self.visuals.get_icon(query).await {
            return Some(icon);
        }
        self.visuals.get_image(query).await
    }
}
