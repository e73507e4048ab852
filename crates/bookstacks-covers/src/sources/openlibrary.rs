use std::time::Duration;

use async_trait::async_trait;
use bookstacks_core::CoversConfig;
use serde_json::Value;

use crate::error::{FetchError, Result};
use crate::http::CatalogHttp;
use crate::sources::{IsbnCoverSource, TitleSearchSource};
use crate::types::CatalogResult;

const BASE_URL: &str = "https://openlibrary.org";
const MAX_SUBJECTS: usize = 5;

pub struct OpenLibrarySource {
    http: CatalogHttp,
    base_url: String,
    covers_url: String,
}

impl OpenLibrarySource {
    pub fn from_config(config: &CoversConfig) -> Result<Self> {
        Self::with_config(
            config.catalog_base_url.clone(),
            config.covers_base_url.clone(),
            Duration::from_secs(config.timeout_secs),
            &config.user_agent,
        )
    }

    pub fn with_config(
        base_url: String,
        covers_url: String,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        Ok(Self {
            http: CatalogHttp::new("openlibrary", timeout, user_agent)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            covers_url: covers_url.trim_end_matches('/').to_string(),
        })
    }

    /// `GET {base}/isbn/{isbn}.json` and pick the first cover id.
    pub async fn fetch_isbn_cover(&self, isbn: &str) -> Result<Option<String>> {
        let url = format!(
            "{}/isbn/{}.json",
            self.base_url,
            urlencoding::encode(isbn.trim())
        );
        let json = self.http.get_json(&url).await?;
        if !json.is_object() {
            return Err(FetchError::Parse(format!(
                "openlibrary: expected an edition object for ISBN {isbn}"
            )));
        }

        Ok(json
            .get("covers")
            .and_then(Value::as_array)
            .and_then(|covers| covers.first())
            .and_then(Value::as_i64)
            .map(|id| self.cover_by_id_url(id)))
    }

    /// Cover URL for an ISBN: the catalog's cover when it has one, otherwise
    /// the by-ISBN image URL. `None` only for a blank ISBN.
    pub async fn lookup_by_isbn(&self, isbn: &str) -> Option<String> {
        let isbn = isbn.trim();
        if isbn.is_empty() {
            return None;
        }
        match self.fetch_isbn_cover(isbn).await {
            Ok(Some(url)) => Some(url),
            Ok(None) => {
                tracing::debug!(isbn, "openlibrary edition has no cover id, using ISBN cover URL");
                Some(self.isbn_cover_url(isbn))
            }
            Err(err) => {
                tracing::warn!(
                    isbn,
                    timeout = err.is_timeout(),
                    error = %err,
                    "openlibrary ISBN lookup failed, using ISBN cover URL"
                );
                Some(self.isbn_cover_url(isbn))
            }
        }
    }

    /// Runs the attempts in order. Errors only when every attempt failed and
    /// none came back as an empty page.
    pub async fn search(&self, title: &str, author: Option<&str>) -> Result<CatalogResult> {
        let url = format!("{}/search.json", self.base_url);
        let mut last_error = None;
        let mut answered = false;

        for params in search_attempts(title, author) {
            match self.http.get_json_with_query(&url, &params).await {
                Ok(json) => {
                    answered = true;
                    let first = json
                        .get("docs")
                        .and_then(Value::as_array)
                        .and_then(|docs| docs.first());
                    if let Some(doc) = first {
                        return Ok(self.doc_to_result(doc));
                    }
                }
                Err(err) => {
                    tracing::debug!(
                        ?params,
                        timeout = err.is_timeout(),
                        error = %err,
                        "openlibrary search attempt failed"
                    );
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) if !answered => Err(err),
            _ => Ok(CatalogResult::default()),
        }
    }

    /// Title/author search: first attempt with any docs wins, its first doc
    /// is taken as-is.
    pub async fn search_primary(&self, title: &str, author: Option<&str>) -> CatalogResult {
        match self.search(title, author).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(title, error = %err, "openlibrary search failed");
                CatalogResult::default()
            }
        }
    }

    /// Same as [`openlibrary_link`] against this source's catalog.
    pub fn book_link(&self, title: &str, author: Option<&str>, isbn: Option<&str>) -> String {
        book_link(&self.base_url, title, author, isbn)
    }

    pub fn cover_by_id_url(&self, cover_id: i64) -> String {
        format!("{}/b/id/{cover_id}-L.jpg", self.covers_url)
    }

    pub fn isbn_cover_url(&self, isbn: &str) -> String {
        format!(
            "{}/b/isbn/{}-L.jpg",
            self.covers_url,
            urlencoding::encode(isbn.trim())
        )
    }

    fn doc_to_result(&self, doc: &Value) -> CatalogResult {
        let cover_url = doc
            .get("cover_i")
            .and_then(Value::as_i64)
            .map(|id| self.cover_by_id_url(id));

        let isbn = doc
            .get("isbn")
            .and_then(Value::as_array)
            .and_then(|arr| arr.first())
            .and_then(Value::as_str)
            .map(ToOwned::to_owned);

        let subjects = doc
            .get("subject")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .take(MAX_SUBJECTS)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .filter(|joined| !joined.is_empty());

        CatalogResult {
            cover_url,
            isbn,
            subjects,
        }
    }
}

#[async_trait]
impl IsbnCoverSource for OpenLibrarySource {
    fn name(&self) -> &'static str {
        self.http.source_name()
    }

    async fn lookup_cover(&self, isbn: &str) -> Option<String> {
        self.lookup_by_isbn(isbn).await
    }
}

#[async_trait]
impl TitleSearchSource for OpenLibrarySource {
    fn name(&self) -> &'static str {
        self.http.source_name()
    }

    async fn find_cover(&self, title: &str, author: Option<&str>) -> CatalogResult {
        self.search_primary(title, author).await
    }
}

/// Query attempts from most to least precise.
fn search_attempts(title: &str, author: Option<&str>) -> Vec<Vec<(&'static str, String)>> {
    let title = title.trim();
    let author = author.map(str::trim).filter(|a| !a.is_empty());

    let mut attempts = Vec::with_capacity(3);
    if let Some(author) = author {
        attempts.push(vec![("title", title.to_string()), ("author", author.to_string())]);
    }
    attempts.push(vec![("title", title.to_string())]);
    attempts.push(vec![(
        "q",
        format!("{title} {}", author.unwrap_or_default()).trim().to_string(),
    )]);
    attempts
}

/// Link to the book's page on Open Library: the ISBN page when known,
/// otherwise a search for title and author.
pub fn openlibrary_link(title: &str, author: Option<&str>, isbn: Option<&str>) -> String {
    book_link(BASE_URL, title, author, isbn)
}

fn book_link(base_url: &str, title: &str, author: Option<&str>, isbn: Option<&str>) -> String {
    if let Some(isbn) = isbn.map(str::trim).filter(|i| !i.is_empty()) {
        return format!("{base_url}/isbn/{isbn}");
    }
    let query = [title.trim(), author.unwrap_or_default().trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    format!("{base_url}/search?q={}", urlencoding::encode(&query))
}
