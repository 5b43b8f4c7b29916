//! Project sync pipeline.
//!
//! One run walks the project's screens page by page, fetches each
//! screen's latest version, reconciles layers and asset variants into
//! the metadata tree, downloads the selected variants and finishes with
//! the config pass. API failures at the project or screen-list level are
//! fatal; everything below that degrades per entity into the activity
//! log.

pub mod config_layer;
pub mod log;
pub mod names;
pub mod tree;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use futures_util::stream::{self, StreamExt};

use crate::download::{self, AssetFetcher, DownloadTask, TaskKind, DOWNLOAD_CONCURRENCY};
use crate::sync::config_layer::apply_config_pass;
use crate::sync::log::ActivityLog;
use crate::sync::names::sanitize_path_component;
use crate::sync::tree::{AssetVariant, MetadataTree, ScreenLayers};
use crate::zeplin::models::{RawAsset, Screen};
use crate::zeplin::ProjectApi;

/// Screens fetched per page.
pub const PAGE_SIZE: u64 = 30;

pub const SNAPSHOT_FILENAME: &str = "snapshot.png";

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub project_id: String,
    /// Restrict the run to a single screen id. The pagination loop still
    /// walks every page; non-matching screens are dropped after fetch.
    pub screen_id: Option<String>,
    /// Build metadata.json and log.json without downloading anything.
    pub metadata_only: bool,
    pub formats: Vec<String>,
    pub densities: Vec<String>,
    /// Output root override; defaults to `<project name>__assets`.
    pub directory: Option<String>,
    pub no_progress_bar: bool,
}

#[derive(Debug)]
pub struct SyncOutcome {
    pub tree: MetadataTree,
    pub log: ActivityLog,
    pub directory: PathBuf,
    pub downloaded: usize,
    pub failed: usize,
}

pub async fn run(
    api: &dyn ProjectApi,
    fetcher: &dyn AssetFetcher,
    options: &SyncOptions,
) -> anyhow::Result<SyncOutcome> {
    let project = api
        .get_project(&options.project_id)
        .await
        .with_context(|| format!("fetching project {}", options.project_id))?;

    let directory = match &options.directory {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from(format!("{}__assets", sanitize_path_component(&project.name))),
    };
    prepare_output_dir(&directory)
        .await
        .with_context(|| format!("preparing output directory {}", directory.display()))?;

    let total = project.screen_count;
    tracing::info!("Syncing project {} ({} screens)", project.name, total);

    let mut tree = MetadataTree::new(project);
    let mut log = ActivityLog::new();
    let mut downloaded = 0usize;
    let mut failed = 0usize;

    if total > 0 {
        let mut offset = 0u64;
        loop {
            let mut screens = api
                .list_screens(&options.project_id, offset, PAGE_SIZE)
                .await
                .with_context(|| format!("listing screens at offset {}", offset))?;

            if let Some(wanted) = &options.screen_id {
                screens.retain(|s| &s.id == wanted);
            }

            tree.ingest_screens(&screens);

            let versions = stream::iter(&screens)
                .map(|screen| async move {
                    let result = api
                        .get_screen_version(&options.project_id, &screen.id)
                        .await;
                    (screen, result)
                })
                .buffered(DOWNLOAD_CONCURRENCY)
                .collect::<Vec<_>>()
                .await;

            let mut layer_batches = Vec::new();
            let mut variants = Vec::new();
            let mut tasks = Vec::new();

            for (screen, result) in versions {
                let version = match result {
                    Ok(version) => version,
                    Err(e) => {
                        log.error_with_detail(
                            Some(&screen.name),
                            format!("Error fetching screen version for {}", screen.name),
                            e.to_string(),
                        );
                        continue;
                    }
                };

                if let Some(image) = &version.image {
                    tasks.push(DownloadTask {
                        url: image.original_url.clone(),
                        screen_name: screen.name.clone(),
                        filename: SNAPSHOT_FILENAME.to_string(),
                        kind: TaskKind::Snapshot,
                    });
                }

                variants.extend(collect_asset_variants(
                    screen,
                    version.assets,
                    &options.formats,
                    &options.densities,
                ));
                layer_batches.push(ScreenLayers {
                    screen_id: screen.id.clone(),
                    layers: version.layers,
                });
            }

            tree.ingest_layers(layer_batches, &mut log);
            let planned = tree.ingest_assets(variants, &mut log);
            tasks.extend(planned.into_iter().map(|p| DownloadTask {
                url: p.url,
                screen_name: p.screen_name,
                filename: p.filename,
                kind: TaskKind::Asset,
            }));

            if !options.metadata_only && !tasks.is_empty() {
                let (batch_downloaded, batch_failed) = download::run_batch(
                    fetcher,
                    tasks,
                    &directory,
                    &mut tree,
                    &mut log,
                    options.no_progress_bar,
                )
                .await;
                downloaded += batch_downloaded;
                failed += batch_failed;
            }

            offset = (offset + PAGE_SIZE).min(total);
            if offset + 1 >= total {
                break;
            }
        }
    }

    apply_config_pass(&mut tree, &mut log);

    Ok(SyncOutcome {
        tree,
        log,
        directory,
        downloaded,
        failed,
    })
}

/// Flatten one screen's exported asset groups into per-variant records,
/// keeping only the formats and densities selected for the run.
fn collect_asset_variants(
    screen: &Screen,
    assets: Vec<RawAsset>,
    formats: &[String],
    densities: &[String],
) -> Vec<AssetVariant> {
    let mut variants = Vec::new();
    for asset in assets {
        for content in &asset.contents {
            if !formats.iter().any(|f| f == &content.format) {
                continue;
            }
            if !densities.iter().any(|d| d == &content.density_label()) {
                continue;
            }
            variants.push(AssetVariant {
                screen_id: screen.id.clone(),
                screen_name: screen.name.clone(),
                display_name: asset.display_name.clone(),
                layer_source_id: asset.layer_source_id.clone(),
                url: content.url.clone(),
                format: content.format.clone(),
                density: content.density_label(),
            });
        }
    }
    variants
}

/// Recreate the output root from scratch so stale files from a previous
/// run never mix with this one.
async fn prepare_output_dir(dir: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    tokio::fs::create_dir_all(dir).await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::download::error::DownloadError;
    use crate::zeplin::error::ApiError;
    use crate::zeplin::models::{
        AssetContent, Project, RawAsset, RawLayer, RawRect, ScreenVersion,
    };

    struct MockApi {
        project: Project,
        screens: Vec<Screen>,
        versions: Vec<(String, ScreenVersion)>,
        list_calls: Mutex<Vec<(u64, u64)>>,
        failing_version_ids: Vec<String>,
    }

    impl MockApi {
        fn with_screens(count: u64) -> Self {
            let screens = (0..count)
                .map(|i| Screen {
                    id: format!("sc{}", i),
                    name: format!("Screen {}", i),
                })
                .collect();
            Self {
                project: Project {
                    id: "p1".into(),
                    name: "Demo".into(),
                    screen_count: count,
                },
                screens,
                versions: Vec::new(),
                list_calls: Mutex::new(Vec::new()),
                failing_version_ids: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl ProjectApi for MockApi {
        async fn get_project(&self, _project_id: &str) -> Result<Project, ApiError> {
            Ok(self.project.clone())
        }

        async fn list_screens(
            &self,
            _project_id: &str,
            offset: u64,
            limit: u64,
        ) -> Result<Vec<Screen>, ApiError> {
            self.list_calls.lock().unwrap().push((offset, limit));
            let start = offset as usize;
            let end = (offset + limit).min(self.screens.len() as u64) as usize;
            Ok(self.screens.get(start..end).unwrap_or(&[]).to_vec())
        }

        async fn get_screen_version(
            &self,
            _project_id: &str,
            screen_id: &str,
        ) -> Result<ScreenVersion, ApiError> {
            if self.failing_version_ids.iter().any(|id| id == screen_id) {
                return Err(ApiError::Status {
                    status: 500,
                    url: format!("/screens/{}", screen_id),
                });
            }
            for (id, version) in &self.versions {
                if id == screen_id {
                    return Ok(version.clone());
                }
            }
            Ok(ScreenVersion {
                layers: Vec::new(),
                assets: Vec::new(),
                image: None,
            })
        }
    }

    struct CountingFetcher {
        calls: AtomicUsize,
    }

    impl CountingFetcher {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AssetFetcher for CountingFetcher {
        async fn fetch_bytes(&self, _url: &str) -> Result<Vec<u8>, DownloadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    fn options(dir: &Path) -> SyncOptions {
        SyncOptions {
            project_id: "p1".into(),
            screen_id: None,
            metadata_only: false,
            formats: vec!["png".into()],
            densities: vec!["1".into(), "2".into()],
            directory: Some(dir.to_string_lossy().into_owned()),
            no_progress_bar: true,
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("zeplin-sync-run-{}-{}", name, std::process::id()))
    }

    #[tokio::test]
    async fn test_pagination_walks_pages_of_thirty() {
        let api = MockApi::with_screens(65);
        let fetcher = CountingFetcher::new();
        let dir = scratch_dir("pages");

        let outcome = run(&api, &fetcher, &options(&dir)).await.unwrap();

        let calls = api.list_calls.lock().unwrap().clone();
        assert_eq!(calls, vec![(0, 30), (30, 30), (60, 30)]);
        assert_eq!(outcome.tree.screens.len(), 65);
        assert_eq!(outcome.tree.screens[0].id, "sc0");
        assert_eq!(outcome.tree.screens[64].id, "sc64");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_exact_page_boundary_fetches_once() {
        let api = MockApi::with_screens(30);
        let fetcher = CountingFetcher::new();
        let dir = scratch_dir("boundary");

        let outcome = run(&api, &fetcher, &options(&dir)).await.unwrap();

        assert_eq!(api.list_calls.lock().unwrap().len(), 1);
        assert_eq!(outcome.tree.screens.len(), 30);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_zero_screens_skips_listing() {
        let api = MockApi::with_screens(0);
        let fetcher = CountingFetcher::new();
        let dir = scratch_dir("empty");

        let outcome = run(&api, &fetcher, &options(&dir)).await.unwrap();

        assert!(api.list_calls.lock().unwrap().is_empty());
        assert!(outcome.tree.screens.is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_screen_filter_narrows_tree_not_pagination() {
        let api = MockApi::with_screens(65);
        let fetcher = CountingFetcher::new();
        let dir = scratch_dir("filter");
        let mut opts = options(&dir);
        opts.screen_id = Some("sc42".into());

        let outcome = run(&api, &fetcher, &opts).await.unwrap();

        assert_eq!(api.list_calls.lock().unwrap().len(), 3);
        assert_eq!(outcome.tree.screens.len(), 1);
        assert_eq!(outcome.tree.screens[0].id, "sc42");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_metadata_only_never_touches_fetcher() {
        let mut api = MockApi::with_screens(2);
        api.versions.push((
            "sc0".into(),
            ScreenVersion {
                layers: vec![RawLayer {
                    id: "l1".into(),
                    source_id: "src1".into(),
                    name: "Icon".into(),
                    layer_type: "shape".into(),
                    rect: RawRect::default(),
                    content: None,
                    layers: Vec::new(),
                }],
                assets: vec![RawAsset {
                    display_name: "Icon[id:icon]".into(),
                    layer_source_id: "src1".into(),
                    contents: vec![AssetContent {
                        url: "https://cdn.example.com/icon.png".into(),
                        format: "png".into(),
                        density: 1.0,
                    }],
                }],
                image: None,
            },
        ));
        let fetcher = CountingFetcher::new();
        let dir = scratch_dir("metadata-only");
        let mut opts = options(&dir);
        opts.metadata_only = true;

        let outcome = run(&api, &fetcher, &opts).await.unwrap();

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.downloaded, 0);
        // The tree still carries the asset with its resolved filename.
        assert_eq!(
            outcome.tree.screens[0].layers[0].assets[0].filename,
            "icon.png"
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_version_failure_isolated_to_screen() {
        let mut api = MockApi::with_screens(3);
        api.failing_version_ids.push("sc1".into());
        let fetcher = CountingFetcher::new();
        let dir = scratch_dir("version-fail");

        let outcome = run(&api, &fetcher, &options(&dir)).await.unwrap();

        assert_eq!(outcome.tree.screens.len(), 3);
        let entries = outcome.log.bucket("Screen 1");
        assert_eq!(entries.len(), 2);
        assert!(entries[0]
            .description
            .contains("Error fetching screen version"));
        // The config pass still runs for the screen and finds no layers.
        assert!(entries[1].description.contains("config layer"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_variant_filtering_by_format_and_density() {
        let screen = Screen {
            id: "sc1".into(),
            name: "Home".into(),
        };
        let assets = vec![RawAsset {
            display_name: "Logo".into(),
            layer_source_id: "src1".into(),
            contents: vec![
                AssetContent {
                    url: "u1".into(),
                    format: "png".into(),
                    density: 1.0,
                },
                AssetContent {
                    url: "u2".into(),
                    format: "svg".into(),
                    density: 1.0,
                },
                AssetContent {
                    url: "u3".into(),
                    format: "png".into(),
                    density: 3.0,
                },
            ],
        }];

        let variants = collect_asset_variants(
            &screen,
            assets,
            &["png".to_string()],
            &["1".to_string(), "2".to_string()],
        );

        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].url, "u1");
        assert_eq!(variants[0].density, "1");
    }

    #[tokio::test]
    async fn test_output_dir_recreated_from_scratch() {
        let dir = scratch_dir("recreate");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("stale.txt"), b"old").unwrap();

        prepare_output_dir(&dir).await.unwrap();

        assert!(dir.is_dir());
        assert!(!dir.join("stale.txt").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
