use serde::{Deserialize, Serialize};

/// Font and color conventions extracted from a deck, applied to every
/// generated slide for visual consistency. Colors are 6-digit hex strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleGuide {
    pub title_font_name: String,
    pub title_font_size: f32,
    pub body_font_name: String,
    pub body_font_size: f32,
    pub primary_color: String,
    pub accent_color: String,
}

impl Default for StyleGuide {
    fn default() -> Self {
        Self {
            title_font_name: "Calibri".to_string(),
            title_font_size: 32.0,
            body_font_name: "Calibri".to_string(),
            body_font_size: 18.0,
            primary_color: "000000".to_string(),
            accent_color: "595959".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Bar,
    Pie,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDataset {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub data: Vec<f64>,
}

/// Chart requested by the content generator. Simple charts carry `values`;
/// multi-series bar charts carry `datasets` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(rename = "type", default)]
    pub kind: ChartKind,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub values: Vec<f64>,
    #[serde(default)]
    pub datasets: Vec<ChartDataset>,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideLayout {
    TextOnly,
    #[default]
    TextLeftVisualRight,
}

/// Structured slide content as returned by the generator. Field names match
/// the JSON contract the model is prompted to produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideContent {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub points: Vec<String>,
    #[serde(rename = "chart_data", default)]
    pub chart: Option<ChartSpec>,
    #[serde(rename = "image_suggestion", default)]
    pub image_query: Option<String>,
    #[serde(default)]
    pub layout: SlideLayout,
}

fn default_title() -> String {
    "New Topic".to_string()
}

impl SlideContent {
    /// Enforce the content invariants after deserialization: a chart and an
    /// image suggestion are mutually exclusive (the chart wins), and a chart
    /// always implies a visual layout.
    pub fn normalize(mut self) -> Self {
        if self.chart.is_some() {
            self.image_query = None;
            self.layout = SlideLayout::TextLeftVisualRight;
        }
        if let Some(query) = &self.image_query {
            if query.trim().is_empty() {
                self.image_query = None;
            }
        }
        if self.title.trim().is_empty() {
            self.title = default_title();
        }
        self
    }

    pub fn wants_visual(&self) -> bool {
        self.chart.is_some() || self.image_query.is_some()
    }
}
