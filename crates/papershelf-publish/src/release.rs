//! Hosted-release API client and the sequential asset uploader.

use std::time::Duration;

use serde::Deserialize;

use crate::bundle::ReleaseAsset;
use crate::error::PublishError;

/// Fixed inter-upload delay. The release upload endpoint rate-limits, so
/// assets go up one at a time; this is a deliberate throughput ceiling.
pub const UPLOAD_DELAY: Duration = Duration::from_millis(1500);

/// A created release.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Release {
    pub id: u64,
    pub tag: String,
    pub html_url: String,
}

/// Per-asset upload outcome. A failed asset never aborts the batch.
#[derive(Clone, Debug)]
pub struct UploadOutcome {
    pub name: String,
    pub download_url: Option<String>,
    pub error: Option<String>,
}

impl UploadOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// The two calls this system issues against the hosted-release API.
#[allow(async_fn_in_trait)]
pub trait ReleaseApi {
    async fn create_release(
        &self,
        tag: &str,
        title: &str,
        body: &str,
    ) -> Result<Release, PublishError>;

    /// Upload one asset; returns its download URL.
    async fn upload_asset(
        &self,
        release_id: u64,
        name: &str,
        data: &[u8],
    ) -> Result<String, PublishError>;
}

/// Upload assets strictly sequentially: asset i+1 begins only after i
/// completes, with a fixed delay in between. Outcomes are itemized; a
/// failure is recorded and the loop continues.
pub async fn upload_assets<A: ReleaseApi>(
    api: &A,
    release_id: u64,
    assets: &[ReleaseAsset],
    delay: Duration,
    mut progress: impl FnMut(usize, usize, &UploadOutcome),
) -> Vec<UploadOutcome> {
    let mut outcomes = Vec::with_capacity(assets.len());
    for (i, asset) in assets.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let outcome = match api.upload_asset(release_id, &asset.name, &asset.data).await {
            Ok(url) => UploadOutcome {
                name: asset.name.clone(),
                download_url: Some(url),
                error: None,
            },
            Err(e) => {
                tracing::warn!(asset = %asset.name, error = %e, "asset upload failed");
                UploadOutcome {
                    name: asset.name.clone(),
                    download_url: None,
                    error: Some(e.to_string()),
                }
            }
        };
        progress(i + 1, assets.len(), &outcome);
        outcomes.push(outcome);
    }
    outcomes
}

/// Reqwest-backed client for the hosted-release REST API.
#[derive(Debug)]
pub struct ReleaseClient {
    client: reqwest::Client,
    owner: String,
    repo: String,
    token: String,
}

#[derive(Deserialize)]
struct ReleaseResponse {
    id: u64,
    tag_name: String,
    html_url: String,
}

#[derive(Deserialize)]
struct AssetResponse {
    browser_download_url: String,
}

impl ReleaseClient {
    /// A missing token is a precondition failure, not a retryable error.
    pub fn new(owner: &str, repo: &str, token: &str) -> Result<Self, PublishError> {
        if token.trim().is_empty() {
            return Err(PublishError::Precondition(
                "credential token is required for release operations".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| PublishError::Network(e.to_string()))?;
        Ok(Self {
            client,
            owner: owner.to_string(),
            repo: repo.to_string(),
            token: token.to_string(),
        })
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, PublishError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(PublishError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

impl ReleaseApi for ReleaseClient {
    async fn create_release(
        &self,
        tag: &str,
        title: &str,
        body: &str,
    ) -> Result<Release, PublishError> {
        let url = format!(
            "https://api.github.com/repos/{}/{}/releases",
            self.owner, self.repo
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("User-Agent", "papershelf/0.1")
            .header("Accept", "application/vnd.github+json")
            .json(&serde_json::json!({
                "tag_name": tag,
                "name": title,
                "body": body,
            }))
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        let parsed: ReleaseResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;
        Ok(Release {
            id: parsed.id,
            tag: parsed.tag_name,
            html_url: parsed.html_url,
        })
    }

    async fn upload_asset(
        &self,
        release_id: u64,
        name: &str,
        data: &[u8],
    ) -> Result<String, PublishError> {
        let mut url = url::Url::parse(&format!(
            "https://uploads.github.com/repos/{}/{}/releases/{}/assets",
            self.owner, self.repo, release_id
        ))
        .map_err(|e| PublishError::Network(e.to_string()))?;
        url.query_pairs_mut().append_pair("name", name);
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .header("User-Agent", "papershelf/0.1")
            .header("Content-Type", "application/octet-stream")
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        let parsed: AssetResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;
        Ok(parsed.browser_download_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Scripted stand-in for the hosted API: fails the named assets.
    pub(crate) struct ScriptedApi {
        pub fail: Vec<String>,
        pub calls: Mutex<Vec<String>>,
    }

    impl ScriptedApi {
        pub(crate) fn failing(names: &[&str]) -> Self {
            Self {
                fail: names.iter().map(|s| s.to_string()).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl ReleaseApi for ScriptedApi {
        async fn create_release(
            &self,
            tag: &str,
            _title: &str,
            _body: &str,
        ) -> Result<Release, PublishError> {
            Ok(Release {
                id: 7,
                tag: tag.to_string(),
                html_url: format!("https://example.com/releases/{}", tag),
            })
        }

        async fn upload_asset(
            &self,
            _release_id: u64,
            name: &str,
            _data: &[u8],
        ) -> Result<String, PublishError> {
            self.calls.lock().unwrap().push(name.to_string());
            if self.fail.iter().any(|f| f == name) {
                return Err(PublishError::Network("connection reset".to_string()));
            }
            Ok(format!("https://example.com/assets/{}", name))
        }
    }

    fn assets(names: &[&str]) -> Vec<ReleaseAsset> {
        names
            .iter()
            .map(|n| ReleaseAsset {
                name: n.to_string(),
                data: vec![1, 2, 3],
            })
            .collect()
    }

    #[tokio::test]
    async fn middle_failure_yields_itemized_outcomes() {
        let api = ScriptedApi::failing(&["b.pdf"]);
        let outcomes = upload_assets(
            &api,
            7,
            &assets(&["a.pdf", "b.pdf", "c.pdf"]),
            Duration::ZERO,
            |_, _, _| {},
        )
        .await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].succeeded());
        assert!(!outcomes[1].succeeded());
        assert!(outcomes[2].succeeded());
        assert!(outcomes[1].error.as_ref().unwrap().contains("network"));
    }

    #[tokio::test]
    async fn uploads_are_strictly_sequential() {
        let api = ScriptedApi::failing(&[]);
        upload_assets(
            &api,
            7,
            &assets(&["a.pdf", "b.pdf", "c.pdf"]),
            Duration::ZERO,
            |_, _, _| {},
        )
        .await;
        assert_eq!(
            *api.calls.lock().unwrap(),
            vec!["a.pdf", "b.pdf", "c.pdf"]
        );
    }

    #[tokio::test]
    async fn progress_reports_every_asset() {
        let api = ScriptedApi::failing(&["a.pdf"]);
        let mut seen = Vec::new();
        upload_assets(
            &api,
            7,
            &assets(&["a.pdf", "b.pdf"]),
            Duration::ZERO,
            |i, total, outcome| seen.push((i, total, outcome.succeeded())),
        )
        .await;
        assert_eq!(seen, vec![(1, 2, false), (2, 2, true)]);
    }

    #[test]
    fn empty_token_is_precondition_failure() {
        let err = ReleaseClient::new("u", "r", "  ").unwrap_err();
        assert!(matches!(err, PublishError::Precondition(_)));
    }
}
