use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::content::{SlideContent, StyleGuide};

pub const WATERMARK_TEXT: &str = "updated live by slidepipe";

const WATERMARK_COLOR: &str = "A0A0A0";
const WATERMARK_FONT_SIZE: f32 = 10.0;

fn inches(value: f32) -> f32 {
    value * 72.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    TextBox {
        text: String,
        font_name: String,
        font_size: f32,
        color: String,
        bold: bool,
        bullet: bool,
        align: Align,
        frame: Frame,
    },
    Picture {
        path: PathBuf,
        frame: Frame,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    #[serde(default)]
    pub shapes: Vec<Shape>,
}

impl Slide {
    /// All text on the slide, one line per text box.
    pub fn text(&self) -> String {
        self.shapes
            .iter()
            .filter_map(|shape| match shape {
                Shape::TextBox { text, .. } if !text.is_empty() => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The deck document. `show_position` is the 1-based slide the live show is
/// currently displaying.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    #[serde(default)]
    pub slides: Vec<Slide>,
    #[serde(default)]
    pub show_position: Option<usize>,
}

impl Deck {
    pub fn slide(&self, index: usize) -> Result<&Slide> {
        self.check_index(index)?;
        Ok(&self.slides[index - 1])
    }

    fn slide_mut(&mut self, index: usize) -> Result<&mut Slide> {
        self.check_index(index)?;
        Ok(&mut self.slides[index - 1])
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index == 0 || index > self.slides.len() {
            return Err(anyhow!(
                "slide index {} out of range (deck has {} slides)",
                index,
                self.slides.len()
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    Insert,
    Update,
}

/// Mutation boundary to the live deck. Indices are 1-based, matching what a
/// running slideshow reports as its current position.
#[async_trait]
pub trait DeckMutator: Send + Sync {
    /// Slide the show is currently on, if a show is active.
    async fn current_slide_index(&self) -> Option<usize>;

    async fn slide_text(&self, index: usize) -> Result<String>;

    /// Lay `content` out on the deck. `Update` clears the slide at `index`
    /// and rebuilds it in place; `Insert` creates a new slide right after
    /// `index` and navigates the show there. Returns the index written.
    async fn apply_content(
        &self,
        index: usize,
        content: &SlideContent,
        style: &StyleGuide,
        visual: Option<&Path>,
        mode: ApplyMode,
    ) -> Result<usize>;
}

/// Build the full shape set for one generated slide. With a visual the text
/// keeps to the left 5.5in and the visual sits on the right; without one the
/// text spans the full width and the title is centered.
pub fn compose_slide(
    content: &SlideContent,
    style: &StyleGuide,
    visual: Option<&Path>,
) -> Vec<Shape> {
    let text_width = if visual.is_some() {
        inches(5.5)
    } else {
        inches(9.0)
    };

    let mut shapes = vec![
        Shape::TextBox {
            text: content.title.clone(),
            font_name: style.title_font_name.clone(),
            font_size: style.title_font_size,
            color: style.primary_color.clone(),
            bold: true,
            bullet: false,
            align: if visual.is_some() {
                Align::Left
            } else {
                Align::Center
            },
            frame: Frame {
                left: inches(0.5),
                top: inches(0.2),
                width: text_width,
                height: inches(1.5),
            },
        },
        Shape::TextBox {
            text: content.points.join("\n"),
            font_name: style.body_font_name.clone(),
            font_size: style.body_font_size,
            color: style.accent_color.clone(),
            bold: false,
            bullet: true,
            align: Align::Left,
            frame: Frame {
                left: inches(0.5),
                top: inches(1.8),
                width: text_width,
                height: inches(5.0),
            },
        },
        Shape::TextBox {
            text: WATERMARK_TEXT.to_string(),
            font_name: style.body_font_name.clone(),
            font_size: WATERMARK_FONT_SIZE,
            color: WATERMARK_COLOR.to_string(),
            bold: false,
            bullet: false,
            align: Align::Left,
            frame: Frame {
                left: inches(0.2),
                top: inches(7.2),
                width: inches(2.0),
                height: inches(0.5),
            },
        },
    ];

    if let Some(path) = visual {
        shapes.push(Shape::Picture {
            path: path.to_path_buf(),
            frame: Frame {
                left: inches(6.0),
                top: inches(2.5),
                width: inches(3.5),
                height: inches(3.5),
            },
        });
    }

    shapes
}

/// Deck document persisted as JSON on disk, saved after every successful
/// mutation.
pub struct FileDeck {
    path: PathBuf,
    deck: Mutex<Deck>,
}

impl FileDeck {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let raw = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to open deck at {}", path.display()))?;
        let deck: Deck = serde_json::from_str(&raw)
            .with_context(|| format!("{} is not a valid deck document", path.display()))?;
        info!("opened deck with {} slides from {}", deck.slides.len(), path.display());
        Ok(Self {
            path,
            deck: Mutex::new(deck),
        })
    }

    /// Write a fresh deck with `slides` blank slides, showing slide 1.
    pub async fn create(path: impl Into<PathBuf>, slides: usize) -> Result<Self> {
        let path = path.into();
        let deck = Deck {
            slides: vec![Slide::default(); slides.max(1)],
            show_position: Some(1),
        };
        let file_deck = Self {
            path,
            deck: Mutex::new(deck),
        };
        file_deck.persist().await?;
        Ok(file_deck)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Deck {
        self.deck.lock().unwrap().clone()
    }

    async fn persist(&self) -> Result<()> {
        let json = {
            let deck = self.deck.lock().unwrap();
            serde_json::to_string_pretty(&*deck)?
        };
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("failed to save deck to {}", self.path.display()))
    }
}

#[async_trait]
impl DeckMutator for FileDeck {
    async fn current_slide_index(&self) -> Option<usize> {
        let deck = self.deck.lock().unwrap();
        match deck.show_position {
            Some(position) if position >= 1 && position <= deck.slides.len() => Some(position),
            Some(_) => None,
            None if !deck.slides.is_empty() => Some(1),
            None => None,
        }
    }

    async fn slide_text(&self, index: usize) -> Result<String> {
        let deck = self.deck.lock().unwrap();
        Ok(deck.slide(index)?.text())
    }

    async fn apply_content(
        &self,
        index: usize,
        content: &SlideContent,
        style: &StyleGuide,
        visual: Option<&Path>,
        mode: ApplyMode,
    ) -> Result<usize> {
        let target = {
            let mut deck = self.deck.lock().unwrap();
            match mode {
                ApplyMode::Update => {
                    let slide = deck.slide_mut(index)?;
                    slide.shapes = compose_slide(content, style, visual);
                    deck.show_position = Some(index);
                    index
                }
                ApplyMode::Insert => {
                    deck.check_index(index)?;
                    let new_index = index + 1;
                    deck.slides.insert(
                        index,
                        Slide {
                            shapes: compose_slide(content, style, visual),
                        },
                    );
                    deck.show_position = Some(new_index);
                    new_index
                }
            }
        };

        self.persist().await?;
        debug!(
            "applied '{}' to slide {} ({})",
            content.title,
            target,
            match mode {
                ApplyMode::Insert => "insert",
                ApplyMode::Update => "update",
            }
        );
        Ok(target)
    }
}
