//! HTTP manifest source
//!
//! Fetches release manifests over HTTP(S), e.g. cert-manager GitHub releases.

use async_trait::async_trait;
use certkeeper_core::ManifestSource;

use crate::error::{REQUEST_TIMEOUT_SECS, RepoError, Result};
use crate::location::resolve_url;

/// Manifest source backed by an HTTP URL template
pub struct HttpManifestSource {
    template: String,
    client: reqwest::Client,
}

impl HttpManifestSource {
    /// Create a source for a URL template
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("certkeeper/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| RepoError::NetworkError {
                message: e.to_string(),
            })?;

        Ok(Self {
            template: template.into(),
            client,
        })
    }

    /// URL a version resolves to
    pub fn url_for(&self, version: &str) -> String {
        resolve_url(&self.template, version)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!(url, "Fetching manifest");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RepoError::HttpError {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| RepoError::NetworkError {
            message: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ManifestSource for HttpManifestSource {
    fn location(&self) -> &str {
        &self.template
    }

    async fn fetch(&self, version: &str) -> certkeeper_core::Result<Vec<u8>> {
        let url = self.url_for(version);
        self.get_bytes(&url).await.map_err(|e| e.into_core(&url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certkeeper_core::CoreError;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MANIFEST: &str = "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: cert-manager\n";

    #[tokio::test]
    async fn test_fetch_resolves_latest_release() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jetstack/releases/download/v1.16.3/cert-manager.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(MANIFEST))
            .expect(1)
            .mount(&server)
            .await;

        let source = HttpManifestSource::new(format!(
            "{}/jetstack/releases/latest/cert-manager.yaml",
            server.uri()
        ))
        .unwrap();

        let data = source.fetch("v1.16.3").await.unwrap();
        assert_eq!(data, MANIFEST.as_bytes());
    }

    #[tokio::test]
    async fn test_fetch_substitutes_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mirror/v1.15.0/cert-manager.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(MANIFEST))
            .mount(&server)
            .await;

        let source =
            HttpManifestSource::new(format!("{}/mirror/{{version}}/cert-manager.yaml", server.uri()))
                .unwrap();
        assert!(source.fetch("v1.15.0").await.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source =
            HttpManifestSource::new(format!("{}/{{version}}/cert-manager.yaml", server.uri()))
                .unwrap();
        let err = source.fetch("v9.9.9").await.unwrap_err();
        match err {
            CoreError::Fetch { location, message } => {
                assert!(location.ends_with("/v9.9.9/cert-manager.yaml"));
                assert!(message.contains("404"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
