use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command as Process;
use std::sync::Arc;

use anyhow::{bail, Context};

use papershelf_core::{Catalog, CatalogError, CatalogSources, SortKey};
use papershelf_domain::FilterState;
use papershelf_publish::{
    build_bundle, deploy, write_to_dir, ExportOptions, HostedTarget, ReleaseClient,
    DirSource, StaticImport, UPLOAD_DELAY,
};
use papershelf_store::{FallbackStore, RecordStore, SqlitePaperStore, StoreError};

use crate::cli::{Cli, Command};

/// An opened session: the catalog plus direct store access for binaries.
struct Session {
    catalog: Catalog,
    store: Option<Arc<SqlitePaperStore>>,
    fallback_path: PathBuf,
}

fn open_session(data_dir: &Path) -> anyhow::Result<Session> {
    fs::create_dir_all(data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;

    let store = match SqlitePaperStore::open(&data_dir.join("papers.db")) {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            tracing::warn!(error = %e, "record store unavailable, using fallback store");
            None
        }
    };
    let fallback_path = data_dir.join("fallback.json");
    let fallback = FallbackStore::new(&fallback_path);

    let catalog = Catalog::load(CatalogSources {
        snapshot: None,
        store: store.clone().map(|s| s as Arc<dyn RecordStore>),
        fallback: Some(fallback),
    })?;

    Ok(Session {
        catalog,
        store,
        fallback_path,
    })
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Add { files } => cmd_add(&cli.data_dir, &files),
        Command::List {
            query,
            category,
            venue,
            year_min,
            year_max,
            sort,
            page,
        } => cmd_list(&cli.data_dir, query, category, venue, year_min, year_max, &sort, page),
        Command::Delete { id } => cmd_delete(&cli.data_dir, &id),
        Command::Export {
            out,
            owner,
            repo,
            tag,
        } => cmd_export(&cli.data_dir, &out, owner, repo, tag),
        Command::Deploy {
            out,
            owner,
            repo,
            tag,
            token,
        } => cmd_deploy(&cli.data_dir, &out, owner, repo, tag, token).await,
        Command::Publish { account, repo } => cmd_publish(&account, &repo),
        Command::Status => cmd_status(&cli.data_dir),
    }
}

/// Per-batch counters for the ingest loop.
#[derive(Debug, Default)]
struct IngestOutcome {
    imported: usize,
    skipped: usize,
    quota_exceeded: bool,
}

/// Ingest every file into the catalog. A bad file or a failed record is
/// itemized and the loop continues; nothing aborts the batch.
fn ingest_files(catalog: &mut Catalog, files: &[PathBuf]) -> IngestOutcome {
    let mut outcome = IngestOutcome::default();
    for file in files {
        let content = match fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("{}: unreadable ({}), skipped", file.display(), e);
                outcome.skipped += 1;
                continue;
            }
        };

        let report = match file.extension().and_then(|e| e.to_str()) {
            Some("json") => papershelf_core::ingest_json(&content),
            Some("csv") => papershelf_core::ingest_csv(&content),
            _ => {
                eprintln!("{}: unsupported extension, skipped", file.display());
                outcome.skipped += 1;
                continue;
            }
        };

        let report = match report {
            Ok(report) => report,
            Err(e) => {
                eprintln!("{}: {}, skipped", file.display(), e);
                outcome.skipped += 1;
                continue;
            }
        };

        for error in &report.errors {
            eprintln!("{}: {}", file.display(), error);
            outcome.skipped += 1;
        }
        for record in report.records {
            match catalog.add(record, None) {
                Ok(_) => outcome.imported += 1,
                Err(e) => {
                    if matches!(
                        e,
                        CatalogError::Store(StoreError::QuotaExceeded { .. })
                    ) {
                        outcome.quota_exceeded = true;
                    }
                    eprintln!("{}: {}", file.display(), e);
                    outcome.skipped += 1;
                }
            }
        }
    }
    outcome
}

fn cmd_add(data_dir: &Path, files: &[PathBuf]) -> anyhow::Result<()> {
    if files.is_empty() {
        bail!("no input files given");
    }
    let mut session = open_session(data_dir)?;

    let outcome = ingest_files(&mut session.catalog, files);
    println!("{} imported, {} skipped", outcome.imported, outcome.skipped);

    if outcome.quota_exceeded {
        let usage = FallbackStore::new(&session.fallback_path).usage_report()?;
        println!(
            "fallback store full: {} of {} chars used ({} in thumbnails) across {} records",
            usage.total_chars, usage.capacity, usage.thumbnail_chars, usage.records
        );
        println!("delete records or restore the record store, then re-run add");
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_list(
    data_dir: &Path,
    query: Option<String>,
    category: Option<String>,
    venue: Option<String>,
    year_min: Option<i32>,
    year_max: Option<i32>,
    sort: &str,
    page: usize,
) -> anyhow::Result<()> {
    let mut session = open_session(data_dir)?;

    let sort_key = SortKey::parse(sort)
        .with_context(|| format!("unknown sort key {:?}", sort))?;
    let year_range = match (year_min, year_max) {
        (None, None) => None,
        (min, max) => Some((min.unwrap_or(i32::MIN), max.unwrap_or(i32::MAX))),
    };

    session.catalog.set_filter(FilterState {
        query: query.unwrap_or_default(),
        category,
        venue,
        year_range,
        ..Default::default()
    });
    session.catalog.set_sort(sort_key);
    session.catalog.set_page(page);

    let page = session.catalog.page();
    for paper in &page.papers {
        println!(
            "{}  {}  {} - {} ({}) [{} citations]",
            paper.id,
            paper.year,
            paper.title,
            paper.authors.join(", "),
            paper.venue,
            paper.citations
        );
    }
    println!(
        "page {} of {} ({} papers)",
        page.page, page.total_pages, page.total_records
    );
    Ok(())
}

fn cmd_delete(data_dir: &Path, id: &str) -> anyhow::Result<()> {
    let mut session = open_session(data_dir)?;
    session.catalog.delete(id)?;
    println!("deleted {}", id);
    Ok(())
}

fn hosted_target(
    owner: Option<String>,
    repo: Option<String>,
    tag: Option<String>,
) -> Option<HostedTarget> {
    match (owner, repo) {
        (Some(owner), Some(repo)) => Some(HostedTarget { owner, repo, tag }),
        _ => None,
    }
}

fn cmd_export(
    data_dir: &Path,
    out: &Path,
    owner: Option<String>,
    repo: Option<String>,
    tag: Option<String>,
) -> anyhow::Result<()> {
    let session = open_session(data_dir)?;
    let options = ExportOptions {
        hosted: hosted_target(owner, repo, tag),
    };

    let store = session.store.clone();
    let bundle = build_bundle(
        session.catalog.papers(),
        |id| {
            store
                .as_ref()
                .and_then(|s| s.get_binary(id).ok())
                .flatten()
        },
        &options,
    )?;
    write_to_dir(&bundle, out)?;

    println!(
        "exported {} papers ({} release assets) to {}",
        bundle.records.len(),
        bundle.assets.len(),
        out.display()
    );
    if !bundle.is_final() {
        println!("release tag pending: run `papershelf deploy` to upload assets and finalize URLs");
    }
    Ok(())
}

async fn cmd_deploy(
    data_dir: &Path,
    out: &Path,
    owner: String,
    repo: String,
    tag: Option<String>,
    token: Option<String>,
) -> anyhow::Result<()> {
    let token = token
        .or_else(|| std::env::var("PAPERSHELF_TOKEN").ok())
        .unwrap_or_default();
    // Fails fast on a missing token, before any side effect.
    let client = ReleaseClient::new(&owner, &repo, &token)?;

    let session = open_session(data_dir)?;
    let target = HostedTarget {
        owner,
        repo,
        tag,
    };
    let options = ExportOptions {
        hosted: Some(target.clone()),
    };

    let store = session.store.clone();
    let mut bundle = build_bundle(
        session.catalog.papers(),
        |id| {
            store
                .as_ref()
                .and_then(|s| s.get_binary(id).ok())
                .flatten()
        },
        &options,
    )?;

    let outcome = deploy(&mut bundle, &client, &target, UPLOAD_DELAY, |i, total, o| {
        if o.succeeded() {
            println!("[{}/{}] uploaded {}", i, total, o.name);
        } else {
            println!("[{}/{}] FAILED {}", i, total, o.name);
        }
    })
    .await?;

    write_to_dir(&bundle, out)?;
    for line in &outcome.instructions {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_publish(account: &str, repo: &str) -> anyhow::Result<()> {
    let remote_url = format!("https://github.com/{}/{}.git", account, repo);

    let set = Process::new("git")
        .args(["remote", "set-url", "origin", &remote_url])
        .status()
        .context("running git remote set-url")?;
    if !set.success() {
        let add = Process::new("git")
            .args(["remote", "add", "origin", &remote_url])
            .status()
            .context("running git remote add")?;
        if !add.success() {
            bail!("could not configure remote {}", remote_url);
        }
    }

    let push = Process::new("git")
        .args(["push", "-u", "origin", "HEAD"])
        .status()
        .context("running git push")?;
    if !push.success() {
        bail!("push to {} failed", remote_url);
    }

    println!("pushed current branch to {}", remote_url);
    println!("manual follow-up:");
    println!("  1. open https://github.com/{}/{}/settings/pages", account, repo);
    println!("  2. enable static hosting for the pushed branch, root folder");
    println!("  3. your catalog will be served from https://{}.github.io/{}/", account, repo);
    Ok(())
}

fn cmd_status(data_dir: &Path) -> anyhow::Result<()> {
    let session = open_session(data_dir)?;
    println!("catalog: {} papers, loaded from {:?}", session.catalog.len(), session.catalog.origin());

    // A deployed bundle next to the data dir is reported too.
    let bundle_dir = data_dir.join("bundle");
    if let Some(import) =
        StaticImport::initialize(DirSource::new(&bundle_dir))?
    {
        println!(
            "static bundle at {}: {} papers",
            bundle_dir.display(),
            import.index().total_papers
        );
    }

    let fallback = FallbackStore::new(&session.fallback_path);
    let usage = fallback.usage_report()?;
    println!(
        "fallback store: {} records, {} of {} chars used ({} in thumbnails)",
        usage.records, usage.total_chars, usage.capacity, usage.thumbnail_chars
    );
    Ok(())
}
