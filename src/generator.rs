use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::content::{SlideContent, StyleGuide};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-latest";

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Remote judgment and generation boundary. Both calls are blocking network
/// operations; an absent or malformed structured response is `Ok(None)`,
/// never an error.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Decide whether the recent speech has left the slide's topic. Returns
    /// a short topic label when it has, `None` when it hasn't.
    async fn check_deviation(
        &self,
        slide_text: &str,
        speech_text: &str,
    ) -> Result<Option<String>>;

    /// Generate structured slide content for a topic.
    async fn generate(&self, topic: &str, style: &StyleGuide) -> Result<Option<SlideContent>>;
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(client: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }

    async fn prompt(&self, prompt: String, max_output_tokens: Option<u32>) -> Result<String> {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: Some(GenerationConfig {
                temperature: 0.2,
                max_output_tokens,
            }),
        };

        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_BASE_URL, self.model, self.api_key
        );

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "gemini request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let parsed: GeminiResponse = response.json().await?;

        if let Some(feedback) = parsed.prompt_feedback {
            if let Some(reason) = feedback.block_reason {
                return Err(anyhow!("gemini blocked the request: {}", reason));
            }
        }

        let text = parsed
            .candidates
            .and_then(|candidates| candidates.into_iter().next())
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| anyhow!("no text in gemini response"))?;

        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl ContentGenerator for GeminiGenerator {
    async fn check_deviation(
        &self,
        slide_text: &str,
        speech_text: &str,
    ) -> Result<Option<String>> {
        let prompt = format!(
            "Analyze the following. Has the presenter's speech moved to a new topic not covered by the slide?\n\
             Current Slide Content: \"{slide_text}\"\n\
             Presenter's Speech: \"{speech_text}\"\n\
             Task: If the speech has clearly shifted to a new topic, respond ONLY with the new topic in up to 10 words. \
             Otherwise, respond with the single word: None.\n\
             Response:"
        );

        let answer = self.prompt(prompt, Some(64)).await?;
        let label = answer
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or("")
            .trim();

        if label.is_empty() || label.eq_ignore_ascii_case("none") {
            return Ok(None);
        }

        info!("deviation detected, new topic: {}", label);
        Ok(Some(label.to_string()))
    }

    async fn generate(&self, topic: &str, _style: &StyleGuide) -> Result<Option<SlideContent>> {
        let prompt = format!(
            "You are a factual research assistant creating a presentation slide. Your goal is to be informative and data-driven.\n\
             The presentation topic is: \"{topic}\".\n\n\
             Instructions:\n\
             1. \"title\": a clear, factual title directly related to the topic.\n\
             2. \"points\": 4-5 bullet points. Include real, quantifiable data (financial figures, percentages, statistics) relevant to the topic.\n\
             3. \"layout\": if you generate chart_data the layout MUST be \"text_left_visual_right\"; otherwise it can be \"text_only\" or \"text_left_visual_right\".\n\
             4. \"chart_data\": if the topic is about finances, statistics, market share, or any quantifiable data, generate a chart object summarizing the key data points \
             (\"type\" is \"pie\" for breakdowns or \"bar\" for comparisons; for a bar chart use a simple \"values\" array, not a \"datasets\" structure). \
             If the topic is purely qualitative this value MUST be null.\n\
             5. \"image_suggestion\": if you generated chart_data this MUST be null; if chart_data is null, suggest a simple, direct search query for a relevant icon or image.\n\n\
             Format the entire response as a single JSON object with the keys: \"title\", \"points\", \"image_suggestion\", \"layout\", and \"chart_data\"."
        );

        debug!("generating slide content for topic: {}", topic);
        let raw = self.prompt(prompt, Some(2048)).await?;

        let Some(json) = extract_json(&raw) else {
            warn!("no JSON object in generation response, dropping it");
            return Ok(None);
        };

        match serde_json::from_str::<SlideContent>(json) {
            Ok(content) => Ok(Some(content.normalize())),
            Err(e) => {
                warn!("could not parse generated slide content: {}", e);
                Ok(None)
            }
        }
    }
}

/// Pull the outermost `{ ... }` span out of a model response that may be
/// wrapped in prose or markdown fences.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_strips_markdown_fences() {
        let raw = "```json\n{\"title\": \"x\"}\n```";
        assert_eq!(extract_json(raw), Some("{\"title\": \"x\"}"));
    }

    #[test]
    fn extract_json_handles_missing_object() {
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn extract_json_keeps_nested_objects() {
        let raw = "text before {\"a\": {\"b\": 1}} text after";
        assert_eq!(extract_json(raw), Some("{\"a\": {\"b\": 1}}"));
    }
}
