use std::time::Duration;

use async_trait::async_trait;
use bookstacks_core::CoversConfig;
use serde_json::Value;

use crate::error::Result;
use crate::http::CatalogHttp;
use crate::sources::TitleSearchSource;
use crate::types::CatalogResult;

const MAX_RESULTS: &str = "5";

/// Largest first.
const IMAGE_LINK_KEYS: [&str; 5] = ["extraLarge", "large", "medium", "small", "thumbnail"];

pub struct GoogleBooksSource {
    http: CatalogHttp,
    base_url: String,
}

impl GoogleBooksSource {
    pub fn from_config(config: &CoversConfig) -> Result<Self> {
        Self::with_config(
            config.secondary_base_url.clone(),
            Duration::from_secs(config.timeout_secs),
            &config.user_agent,
        )
    }

    pub fn with_config(base_url: String, timeout: Duration, user_agent: &str) -> Result<Self> {
        Ok(Self {
            http: CatalogHttp::new("google_books", timeout, user_agent)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn fetch_cover(&self, title: &str, author: Option<&str>) -> Result<Option<String>> {
        let url = format!("{}/volumes", self.base_url);
        let params = [
            ("q", volume_query(title, author)),
            ("maxResults", MAX_RESULTS.to_string()),
        ];
        let json = self.http.get_json_with_query(&url, &params).await?;

        let items = json
            .get("items")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        Ok(items.iter().find_map(best_image_link))
    }

    pub async fn search_secondary(&self, title: &str, author: Option<&str>) -> Option<String> {
        match self.fetch_cover(title, author).await {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(
                    title,
                    timeout = err.is_timeout(),
                    error = %err,
                    "google books search failed"
                );
                None
            }
        }
    }
}

#[async_trait]
impl TitleSearchSource for GoogleBooksSource {
    fn name(&self) -> &'static str {
        self.http.source_name()
    }

    async fn find_cover(&self, title: &str, author: Option<&str>) -> CatalogResult {
        self.search_secondary(title, author)
            .await
            .map(CatalogResult::cover)
            .unwrap_or_default()
    }
}

fn volume_query(title: &str, author: Option<&str>) -> String {
    let mut q = format!("intitle:\"{}\"", title.trim());
    if let Some(author) = author.map(str::trim).filter(|a| !a.is_empty()) {
        q.push_str(&format!("+inauthor:\"{author}\""));
    }
    q
}

fn best_image_link(item: &Value) -> Option<String> {
    let links = item.get("volumeInfo")?.get("imageLinks")?;
    IMAGE_LINK_KEYS
        .iter()
        .filter_map(|key| links.get(*key).and_then(Value::as_str))
        .find(|link| !link.trim().is_empty())
        .map(ToOwned::to_owned)
}
