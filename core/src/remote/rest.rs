//! PostgREST-style HTTP client for the profile table.
//!
//!   fetch       GET   /rest/v1/{table}?username=eq.{id}&select=*
//!   insert      POST  /rest/v1/{table}
//!   update      PATCH /rest/v1/{table}?username=eq.{id}
//!   top_scores  GET   /rest/v1/{table}?select=*&order=score.desc&limit={n}

use super::{RemoteRow, RemoteStore};
use crate::{
    config::RemoteConfig,
    error::{CoreResult, RemoteError, RemoteResult},
    profile::{Profile, ProfilePatch},
};
use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;

const MAX_LOG_BODY_CHARS: usize = 512;

#[derive(Debug, Clone)]
pub struct RestRemoteStore {
    client:   reqwest::Client,
    rows_url: String,
}

impl RestRemoteStore {
    pub fn new(config: &RemoteConfig) -> CoreResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| anyhow::anyhow!("API key is not a valid header value"))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| anyhow::anyhow!("API key is not a valid header value"))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| anyhow::anyhow!("Cannot build HTTP client: {e}"))?;

        Ok(Self {
            client,
            rows_url: format!(
                "{}/rest/v1/{}",
                config.base_url.trim_end_matches('/'),
                config.table
            ),
        })
    }

    fn transport_error(err: reqwest::Error) -> RemoteError {
        RemoteError::connection(err.to_string())
    }

    /// Read the body of `response`, turning non-success statuses into
    /// the remote error taxonomy.
    async fn body(response: reqwest::Response) -> RemoteResult<String> {
        let status = response.status();
        let body = response.text().await.map_err(Self::transport_error)?;
        if status.is_success() {
            debug!("Remote response status: {status}");
            return Ok(body);
        }
        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("Remote response error ({status}): {preview}");
        Err(RemoteError::from_status(status.as_u16(), preview))
    }

    fn decode_rows(body: &str) -> RemoteResult<Vec<RemoteRow>> {
        serde_json::from_str(body).map_err(|e| RemoteError::Decode(e.to_string()))
    }

    /// Judge a `return=representation` PATCH body. A PATCH against no
    /// matching row succeeds with an empty set, which means `NotFound`.
    fn patched_rows(identity: &str, body: &str) -> RemoteResult<()> {
        if Self::decode_rows(body)?.is_empty() {
            return Err(RemoteError::not_found(identity));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for RestRemoteStore {
    async fn fetch(&self, identity: &str) -> RemoteResult<Profile> {
        let response = self
            .client
            .get(&self.rows_url)
            .query(&[("username", format!("eq.{identity}")), ("select", "*".into())])
            .send()
            .await
            .map_err(Self::transport_error)?;
        let body = Self::body(response).await?;
        Self::decode_rows(&body)?
            .into_iter()
            .next()
            .map(RemoteRow::into_profile)
            .ok_or_else(|| RemoteError::not_found(identity))
    }

    async fn insert(&self, identity: &str, profile: &Profile) -> RemoteResult<()> {
        let row = RemoteRow::from_profile(identity, profile);
        let response = self
            .client
            .post(&self.rows_url)
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await
            .map_err(Self::transport_error)?;
        Self::body(response).await?;
        Ok(())
    }

    async fn update(&self, identity: &str, patch: &ProfilePatch) -> RemoteResult<()> {
        let response = self
            .client
            .patch(&self.rows_url)
            .query(&[("username", format!("eq.{identity}"))])
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await
            .map_err(Self::transport_error)?;
        let body = Self::body(response).await?;
        Self::patched_rows(identity, &body)
    }

    async fn top_scores(&self, limit: usize) -> RemoteResult<Vec<Profile>> {
        let response = self
            .client
            .get(&self.rows_url)
            .query(&[
                ("select", "*".to_string()),
                ("order", "score.desc".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await
            .map_err(Self::transport_error)?;
        let body = Self::body(response).await?;
        Ok(Self::decode_rows(&body)?
            .into_iter()
            .map(RemoteRow::into_profile)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_patch_result_means_no_row() {
        let err = RestRemoteStore::patched_rows("zed", "[]").unwrap_err();
        assert!(err.is_not_found());

        let body = r#"[{"username":"zed","score":5,"energy":100.0,"last_updated":1}]"#;
        assert!(RestRemoteStore::patched_rows("zed", body).is_ok());

        let err = RestRemoteStore::patched_rows("zed", "<html>").unwrap_err();
        assert!(matches!(err, RemoteError::Decode(_)));
    }
}
