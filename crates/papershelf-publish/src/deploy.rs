//! Deploy orchestration: create release, upload assets, finalize URLs.

use std::time::Duration;

use crate::bundle::{Bundle, HostedTarget, CDN_BASE};
use crate::error::PublishError;
use crate::release::{upload_assets, Release, ReleaseApi, UploadOutcome};

/// Itemized result of a deploy run. Partial success is normal.
#[derive(Clone, Debug)]
pub struct DeployOutcome {
    pub release: Release,
    pub uploaded: usize,
    pub failed: usize,
    pub outcomes: Vec<UploadOutcome>,
    /// Base URL the successfully uploaded PDFs are served from.
    pub cdn_base: String,
    /// Human-readable summary lines for the notification surface.
    pub instructions: Vec<String>,
}

/// Create the release, upload every queued asset sequentially, then
/// rewrite the bundle's CDN references for the assets that made it.
/// Records whose asset failed keep their pending reference unchanged.
pub async fn deploy<A: ReleaseApi>(
    bundle: &mut Bundle,
    api: &A,
    target: &HostedTarget,
    delay: Duration,
    progress: impl FnMut(usize, usize, &UploadOutcome),
) -> Result<DeployOutcome, PublishError> {
    let tag = target
        .tag
        .clone()
        .unwrap_or_else(|| format!("papers-{}", chrono::Utc::now().format("%Y%m%d%H%M%S")));

    let release = api
        .create_release(
            &tag,
            &format!("Paper catalog assets {}", tag),
            "PDF assets for the static paper catalog.",
        )
        .await?;
    tracing::info!(tag = %release.tag, url = %release.html_url, "release created");

    let outcomes = upload_assets(api, release.id, &bundle.assets, delay, progress).await;

    let uploaded_ids: Vec<String> = outcomes
        .iter()
        .filter(|o| o.succeeded())
        .filter_map(|o| o.name.strip_suffix(".pdf").map(str::to_string))
        .collect();
    bundle.finalize_tag_for(&uploaded_ids, &release.tag);

    let uploaded = uploaded_ids.len();
    let failed = outcomes.len() - uploaded;
    let cdn_base = format!(
        "{}/{}/{}@{}",
        CDN_BASE, target.owner, target.repo, release.tag
    );

    let mut instructions = vec![
        format!("{} of {} assets uploaded", uploaded, outcomes.len()),
        format!("PDFs are served from {}", cdn_base),
        format!("Release page: {}", release.html_url),
    ];
    if failed > 0 {
        instructions.push(format!(
            "{} asset(s) failed; their records still point at the pending tag - re-run deploy to retry",
            failed
        ));
    }

    Ok(DeployOutcome {
        release,
        uploaded,
        failed,
        outcomes,
        cdn_base,
        instructions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{build_bundle, ExportOptions};
    use papershelf_domain::{PaperRecord, PdfRef};

    struct FlakyApi {
        fail: &'static str,
    }

    impl ReleaseApi for FlakyApi {
        async fn create_release(
            &self,
            tag: &str,
            _title: &str,
            _body: &str,
        ) -> Result<Release, PublishError> {
            Ok(Release {
                id: 1,
                tag: tag.to_string(),
                html_url: "https://example.com/rel".to_string(),
            })
        }

        async fn upload_asset(
            &self,
            _release_id: u64,
            name: &str,
            _data: &[u8],
        ) -> Result<String, PublishError> {
            if name == self.fail {
                return Err(PublishError::Network("boom".to_string()));
            }
            Ok(format!("https://example.com/{}", name))
        }
    }

    fn hosted_bundle(ids: &[&str]) -> (Bundle, HostedTarget) {
        let records: Vec<PaperRecord> = ids
            .iter()
            .map(|id| {
                let mut r = PaperRecord::new(
                    format!("Paper {}", id),
                    vec!["A".to_string()],
                    2020,
                    "V".to_string(),
                );
                r.id = id.to_string();
                r
            })
            .collect();
        let target = HostedTarget {
            owner: "u".to_string(),
            repo: "r".to_string(),
            tag: None,
        };
        let options = ExportOptions {
            hosted: Some(target.clone()),
        };
        let bundle = build_bundle(&records, |_| Some(b"pdf".to_vec()), &options).unwrap();
        (bundle, target)
    }

    #[tokio::test]
    async fn deploy_rewrites_only_successful_assets() {
        let (mut bundle, mut target) = hosted_bundle(&["a", "b", "c"]);
        target.tag = Some("v9".to_string());
        let api = FlakyApi { fail: "b.pdf" };

        let outcome = deploy(&mut bundle, &api, &target, Duration::ZERO, |_, _, _| {})
            .await
            .unwrap();

        assert_eq!(outcome.uploaded, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.outcomes.len(), 3);
        assert_eq!(outcome.cdn_base, "https://cdn.jsdelivr.net/gh/u/r@v9");

        assert!(matches!(&bundle.records["a"].pdf, PdfRef::Cdn(u) if u.contains("@v9/")));
        assert!(matches!(&bundle.records["b"].pdf, PdfRef::Cdn(u) if u.contains("@undefined/")));
        assert!(matches!(&bundle.records["c"].pdf, PdfRef::Cdn(u) if u.contains("@v9/")));
        assert!(!bundle.is_final());
        assert!(outcome.instructions.iter().any(|l| l.contains("re-run")));
    }

    #[tokio::test]
    async fn clean_deploy_finalizes_bundle() {
        let (mut bundle, target) = hosted_bundle(&["a", "b"]);
        let api = FlakyApi { fail: "" };

        let outcome = deploy(&mut bundle, &api, &target, Duration::ZERO, |_, _, _| {})
            .await
            .unwrap();

        assert_eq!(outcome.failed, 0);
        assert!(bundle.is_final());
        // Default tag is timestamp-derived.
        assert!(outcome.release.tag.starts_with("papers-"));
    }
}
