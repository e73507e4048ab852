use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::error::{FetchError, Result};

// ─── CatalogHttp ──────────────────────────────────────────────────────────────

/// Bounded-timeout GET client shared by the catalog sources. One request per
/// call: no retries, no backoff.
#[derive(Debug, Clone)]
pub struct CatalogHttp {
    client: reqwest::Client,
    source_name: &'static str,
}

impl CatalogHttp {
    pub fn new(source_name: &'static str, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .gzip(true)
            .build()?;
        Ok(Self {
            client,
            source_name,
        })
    }

    pub fn source_name(&self) -> &'static str {
        self.source_name
    }

    pub async fn get_json(&self, url: &str) -> Result<Value> {
        self.get_json_with_query(url, &[] as &[(&str, &str)]).await
    }

    pub async fn get_json_with_query<Q: Serialize + ?Sized>(
        &self,
        url: &str,
        query: &Q,
    ) -> Result<Value> {
        let parsed =
            reqwest::Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        tracing::debug!(source = self.source_name, url, "catalog request");
        let resp = self.client.get(parsed).query(query).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                source_name: self.source_name.to_string(),
                status: status.as_u16(),
            });
        }

        let text = resp.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| FetchError::Parse(format!("{}: {e}", self.source_name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn client() -> CatalogHttp {
        CatalogHttp::new("test", Duration::from_secs(5), "bookstacks-test").unwrap()
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/missing.json")
            .with_status(404)
            .create_async()
            .await;

        let err = client()
            .get_json(&format!("{}/missing.json", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn malformed_body_is_a_parse_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/broken.json")
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let err = client()
            .get_json(&format!("{}/broken.json", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[tokio::test]
    async fn relative_url_is_rejected_before_sending() {
        let err = client().get_json("isbn/123.json").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_an_http_error() {
        let err = client()
            .get_json("http://127.0.0.1:9/nothing.json")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Http(_)));
        assert!(!err.is_timeout());
    }

    #[tokio::test]
    async fn silent_server_is_a_timeout() {
        // Accepts the connection but never answers.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/slow.json", listener.local_addr().unwrap());
        let client =
            CatalogHttp::new("test", Duration::from_millis(200), "bookstacks-test").unwrap();

        let err = client.get_json(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Http(_)));
        assert!(err.is_timeout());
        drop(listener);
    }
}
