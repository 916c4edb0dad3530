//! Authenticated HTTP client for the document API.
//!
//! Every call is bounded by the configured timeout. Failures are classified
//! into `ApiError::Transport` and `ApiError::Status` and returned as-is; retry
//! policy belongs to the callers.

use std::time::Duration;

use reqwest::RequestBuilder;
use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::error::{ApiError, TransportKind};

/// Thin wrapper over `reqwest::Client` bound to one API base URL.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<SecretString>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl ApiClient {
    /// Create an unauthenticated client. `base_url` must include the scheme.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(request_timeout)
            .build()
            .map_err(|e| ApiError::from_reqwest(base_url, e))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Same client, attaching `token` to every subsequent call.
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Resolve `path` against the base URL. Absolute URLs pass through untouched.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    /// `GET path?query` and decode the JSON body.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let request = self.http.get(&url).query(query);
        self.send(&url, request).await
    }

    /// `POST path` with a form-encoded body and decode the JSON response.
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let request = self.http.post(&url).form(form);
        self.send(&url, request).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        url: &str,
        mut request: RequestBuilder,
    ) -> Result<T, ApiError> {
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("token {}", token.expose_secret()));
        }

        let resp = request
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                url: url.to_string(),
                status_code: status.as_u16(),
                body,
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ApiError::from_reqwest(url, e))?;

        serde_json::from_slice(&bytes).map_err(|e| ApiError::Transport {
            url: url.to_string(),
            kind: TransportKind::Malformed,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        ApiClient::new("https://api.example.com/", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn relative_paths_join_base_url() {
        let c = client();
        assert_eq!(c.base_url(), "https://api.example.com");
        assert_eq!(c.url("/v1/documents"), "https://api.example.com/v1/documents");
        assert_eq!(c.url("v1/documents"), "https://api.example.com/v1/documents");
    }

    #[test]
    fn absolute_links_pass_through() {
        let link = "https://elis.example.com/api/v1/annotations/42";
        assert_eq!(client().url(link), link);
    }

    #[test]
    fn debug_output_hides_token() {
        let c = client().with_token(SecretString::from("super-secret-token"));
        let debug = format!("{c:?}");
        assert!(c.is_authenticated());
        assert!(debug.contains("authenticated: true"));
        assert!(!debug.contains("super-secret-token"));
    }
}
