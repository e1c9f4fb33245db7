use std::path::Path;

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use eonix_core::analysis::{ExtractionSummary, RepositoryAnalysis};
use eonix_core::cache::ExtractionCache;
use eonix_core::config::Config;
use eonix_core::detector::LanguageDetector;
use eonix_core::scanner::{FileInfo, RepositoryScanner};
use eonix_core::uas::ExtractionResult;

use crate::manager::{read_source, ExtractionManager};

/// One file's outcome before merging.
struct FileOutcome {
    key: String,
    content: Option<String>,
    result: ExtractionResult,
    from_cache: bool,
}

/// Scan, detect and extract a whole repository.
pub struct ExtractionPipeline {
    config: Config,
    manager: ExtractionManager,
}

impl ExtractionPipeline {
    pub fn new(config: Config) -> Result<Self> {
        let manager = ExtractionManager::new(&config.extractors)?;
        Ok(Self { config, manager })
    }

    pub fn with_manager(config: Config, manager: ExtractionManager) -> Self {
        Self { config, manager }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn manager(&self) -> &ExtractionManager {
        &self.manager
    }

    /// Run the full pipeline on `root`.
    ///
    /// Per-file failures end up in the result's `errors`/`warnings`; only
    /// problems with the run itself (missing root, thread pool) are errors.
    pub fn analyze(&self, root: &Path) -> Result<RepositoryAnalysis> {
        if !root.is_dir() {
            anyhow::bail!("{} is not a directory", root.display());
        }
        let root = root
            .canonicalize()
            .with_context(|| format!("failed to resolve {}", root.display()))?;

        let mut scanner = RepositoryScanner::new(&self.config.scan);
        let ignore_entries = scanner.load_ignore_file(&root);
        let files = scanner.scan(&root);
        info!(
            files = files.len(),
            ignore_entries,
            root = %root.display(),
            "scan complete"
        );

        let detection =
            LanguageDetector::with_rules(&root, &self.config.detector, scanner.rules().clone())
                .detect();
        info!(
            language = %detection.primary_language,
            confidence = %detection.confidence,
            "detection complete"
        );
        let scan = scanner.into_statistics();

        let sources: Vec<&FileInfo> = files
            .iter()
            .filter(|f| self.manager.supports(&f.extension))
            .collect();

        let incremental = self.config.pipeline.incremental;
        let cache = if incremental {
            ExtractionCache::load(&root).unwrap_or_else(|e| {
                warn!(error = %format!("{e:#}"), "ignoring unreadable extraction cache");
                ExtractionCache::new(&root)
            })
        } else {
            ExtractionCache::new(&root)
        };

        let mut builder = rayon::ThreadPoolBuilder::new();
        if self.config.pipeline.workers > 0 {
            builder = builder.num_threads(self.config.pipeline.workers);
        }
        let pool = builder
            .build()
            .context("failed to build extraction thread pool")?;

        let cached = incremental.then_some(&cache);
        let outcomes: Vec<FileOutcome> = pool.install(|| {
            sources
                .par_iter()
                .map(|file| self.extract_one(file, cached))
                .collect()
        });

        let mut cache = cache;
        let mut summary = ExtractionSummary::default();
        let mut results = Vec::with_capacity(outcomes.len());
        let mut files_from_cache = 0;
        let mut keys = Vec::with_capacity(outcomes.len());

        for outcome in outcomes {
            summary.record(&outcome.result);
            if outcome.from_cache {
                files_from_cache += 1;
            } else if let (true, Some(content)) = (incremental, outcome.content.as_deref()) {
                cache.insert(outcome.key.clone(), content, &outcome.result);
            }
            keys.push(outcome.key);
            results.push(outcome.result);
        }

        if incremental {
            cache.prune(&keys);
            if let Err(e) = cache.save() {
                warn!(error = %format!("{e:#}"), "failed to save extraction cache");
            }
        }

        let files_extracted = results.len();
        let result = ExtractionResult::concat(results);
        info!(
            files = files_extracted,
            cached = files_from_cache,
            nodes = result.nodes.len(),
            edges = result.edges.len(),
            "extraction complete"
        );

        Ok(RepositoryAnalysis {
            root,
            detection,
            scan,
            files_extracted,
            files_from_cache,
            result,
            summary,
        })
    }

    fn extract_one(&self, file: &FileInfo, cache: Option<&ExtractionCache>) -> FileOutcome {
        let key = file.relative_path.to_string_lossy().replace('\\', "/");
        let content = match read_source(&file.path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %file.path.display(), error = %format!("{e:#}"), "skipping unreadable file");
                return FileOutcome {
                    key,
                    content: None,
                    result: ExtractionResult::failed(format!("{e:#}")),
                    from_cache: false,
                };
            }
        };

        if let Some(hit) = cache.and_then(|c| c.get(&key, &content)) {
            debug!(path = %key, "using cached extraction");
            return FileOutcome {
                key,
                content: None,
                result: hit.clone(),
                from_cache: true,
            };
        }

        let result = self.manager.extract_source(&file.path, &content);
        FileOutcome {
            key,
            content: Some(content),
            result,
            from_cache: false,
        }
    }
}
