use std::path::PathBuf;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::chart::render_chart;
use crate::content::ChartSpec;

const ICONIFY_BASE_URL: &str = "https://api.iconify.design";
const PEXELS_SEARCH_URL: &str = "https://api.pexels.com/v1/search";

/// Visual acquisition boundary. Every lookup may come back empty: `None`
/// means "no visual", and the slide goes text-only. Failures never escape
/// this boundary.
#[async_trait]
pub trait VisualResolver: Send + Sync {
    /// Rasterize a chart. Synchronous and deterministic for a given spec.
    fn create_chart(&self, spec: &ChartSpec) -> Option<PathBuf>;

    async fn get_icon(&self, query: &str) -> Option<PathBuf>;

    async fn get_image(&self, query: &str) -> Option<PathBuf>;
}

#[derive(Debug, Deserialize)]
struct IconSearchResponse {
    #[serde(default)]
    icons: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PexelsResponse {
    #[serde(default)]
    photos: Vec<PexelsPhoto>,
}

#[derive(Debug, Deserialize)]
struct PexelsPhoto {
    src: PexelsSrc,
}

#[derive(Debug, Deserialize)]
struct PexelsSrc {
    large: String,
}

/// Charts rendered locally, icons from the Iconify search API (no key
/// needed), photos from Pexels when a key is configured.
pub struct StockVisualResolver {
    client: reqwest::Client,
    pexels_api_key: Option<String>,
    visuals_dir: PathBuf,
}

impl StockVisualResolver {
    pub fn new(
        client: reqwest::Client,
        pexels_api_key: Option<String>,
        visuals_dir: PathBuf,
    ) -> Self {
        Self {
            client,
            pexels_api_key,
            visuals_dir,
        }
    }

    fn temp_path(&self, prefix: &str, extension: &str) -> PathBuf {
        self.visuals_dir
            .join(format!("{}_{}.{}", prefix, Uuid::new_v4(), extension))
    }

    async fn fetch_icon(&self, query: &str) -> Result<Option<PathBuf>> {
        let response = self
            .client
            .get(format!("{}/search", ICONIFY_BASE_URL))
            .query(&[("query", query), ("limit", "1")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!("icon search failed with status {}", response.status()));
        }

        let parsed: IconSearchResponse = response.json().await?;
        let Some(icon_id) = parsed.icons.into_iter().next() else {
            debug!("no icon found for '{}'", query);
            return Ok(None);
        };

        let Some((prefix, name)) = icon_id.split_once(':') else {
            return Err(anyhow!("unexpected icon id format: {}", icon_id));
        };

        let svg_url = format!("{}/{}/{}.svg", ICONIFY_BASE_URL, prefix, name);
        let bytes = self.client.get(&svg_url).send().await?.bytes().await?;

        let path = self.temp_path("icon", "svg");
        tokio::fs::write(&path, &bytes).await?;
        debug!("saved icon for '{}' to {}", query, path.display());
        Ok(Some(path))
    }

    async fn fetch_image(&self, query: &str) -> Result<Option<PathBuf>> {
        let Some(api_key) = &self.pexels_api_key else {
            debug!("no pexels api key configured, skipping photo lookup");
            return Ok(None);
        };

        let response = self
            .client
            .get(PEXELS_SEARCH_URL)
            .query(&[("query", query), ("per_page", "1")])
            .header("Authorization", api_key)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!("photo search failed with status {}", response.status()));
        }

        let parsed: PexelsResponse = response.json().await?;
        let Some(photo) = parsed.photos.into_iter().next() else {
            debug!("no photo found for '{}'", query);
            return Ok(None);
        };

        let bytes = self
            .client
            .get(&photo.src.large)
            .send()
            .await?
            .bytes()
            .await?;

        let path = self.temp_path("photo", "jpg");
        tokio::fs::write(&path, &bytes).await?;
        debug!("saved photo for '{}' to {}", query, path.display());
        Ok(Some(path))
    }
}

#[async_trait]
impl VisualResolver for StockVisualResolver {
    fn create_chart(&self, spec: &ChartSpec) -> Option<PathBuf> {
        let path = self.temp_path("chart", "png");
        match render_chart(spec, &path) {
            Ok(()) => Some(path),
            Err(e) => {
                warn!("chart rendering failed: {:#}", e);
                None
            }
        }
    }

    async fn get_icon(&self, query: &str) -> Option<PathBuf> {
        match self.fetch_icon(query).await {
            Ok(path) => path,
            Err(e) => {
                warn!("icon lookup failed for '{}': {:#}", query, e);
                None
            }
        }
    }

    async fn get_image(&self, query: &str) -> Option<PathBuf> {
        match self.fetch_image(query).await {
            Ok(path) => path,
            Err(e) => {
                warn!("photo lookup failed for '{}': {:#}", query, e);
                None
            }
        }
    }
}
