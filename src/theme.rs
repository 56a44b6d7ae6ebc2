use std::collections::HashMap;
use std::hash::Hash;

use crate::content::StyleGuide;
use crate::deck::{Deck, Shape};

/// Derive a style guide from an existing deck: the most common title and
/// body font, size, and color win. The first text box on a slide is treated
/// as its title, everything after it as body. Empty decks get the defaults.
pub fn analyze_theme(deck: &Deck) -> StyleGuide {
    let mut title_fonts = Vec::new();
    let mut title_sizes = Vec::new();
    let mut title_colors = Vec::new();
    let mut body_fonts = Vec::new();
    let mut body_sizes = Vec::new();
    let mut body_colors = Vec::new();

    for slide in &deck.slides {
        let mut text_boxes = slide.shapes.iter().filter_map(|shape| match shape {
            Shape::TextBox {
                font_name,
                font_size,
                color,
                ..
            } => Some((font_name, font_size, color)),
            _ => None,
        });

        if let Some((font, size, color)) = text_boxes.next() {
            title_fonts.push(font.clone());
            title_sizes.push(size.round() as i32);
            title_colors.push(color.clone());
        }
        for (font, size, color) in text_boxes {
            body_fonts.push(font.clone());
            body_sizes.push(size.round() as i32);
            body_colors.push(color.clone());
        }
    }

    let defaults = StyleGuide::default();
    StyleGuide {
        title_font_name: most_common(title_fonts).unwrap_or(defaults.title_font_name),
        title_font_size: most_common(title_sizes)
            .map(|size| size as f32)
            .unwrap_or(defaults.title_font_size),
        body_font_name: most_common(body_fonts).unwrap_or(defaults.body_font_name),
        body_font_size: most_common(body_sizes)
            .map(|size| size as f32)
            .unwrap_or(defaults.body_font_size),
        primary_color: most_common(title_colors).unwrap_or(defaults.primary_color),
        accent_color: most_common(body_colors).unwrap_or(defaults.accent_color),
    }
}

fn most_common<T: Eq + Hash>(items: Vec<T>) -> Option<T> {
    let mut counts: HashMap<T, usize> = HashMap::new();
    for item in items {
        *counts.entry(item).or_default() += 1;
    }
    counts.into_iter().max_by_key(|(_, count)| *count).map(|(item, _)| item)
}
