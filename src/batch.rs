//! Index every decision table under a directory

use crate::config::{Config, ErrorPolicy};
use crate::error::{IndexError, ModelError};
use crate::extractor::DecisionTableIndexer;
use crate::index::DefaultIndexBuilder;
use crate::model::DecisionTable;
use crate::types::Fact;
use log::{debug, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Failure indexing one asset of a batch
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Failed to load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: ModelError,
    },

    #[error("Failed to index {}: {source}", path.display())]
    Index {
        path: PathBuf,
        #[source]
        source: IndexError,
    },

    #[error("Failed to walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

impl BatchError {
    pub fn path(&self) -> &Path {
        match self {
            BatchError::Load { path, .. }
            | BatchError::Index { path, .. }
            | BatchError::Walk { path, .. } => path,
        }
    }
}

/// Facts for one indexed table
#[derive(Debug, Clone, Serialize)]
pub struct AssetIndex {
    pub path: PathBuf,
    pub facts: HashSet<Fact>,
    /// Columns skipped under the column error policy
    pub skipped: Vec<String>,
}

/// Outcome of indexing a directory
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub assets: Vec<AssetIndex>,
    /// Assets that failed under [`ErrorPolicy::Skip`]
    #[serde(serialize_with = "serialize_failures")]
    pub failures: Vec<BatchError>,
}

fn serialize_failures<S: serde::Serializer>(
    failures: &[BatchError],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(failures.iter().map(|e| e.to_string()))
}

impl BatchReport {
    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn fact_count(&self) -> usize {
        self.assets.iter().map(|a| a.facts.len()).sum()
    }
}

/// Walks a directory and indexes each table document in isolation
#[derive(Debug, Clone, Default)]
pub struct BatchIndexer {
    config: Config,
}

impl BatchIndexer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Index one table file with a fresh sink
    pub fn index_file(&self, path: &Path) -> Result<AssetIndex, BatchError> {
        let table = DecisionTable::load(path).map_err(|source| BatchError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        let mut builder = DefaultIndexBuilder::with_package(&table.package_name);
        let report = DecisionTableIndexer::from_config(&table, &self.config)
            .index_report(&mut builder)
            .map_err(|source| BatchError::Index {
                path: path.to_path_buf(),
                source,
            })?;

        debug!("Indexed {} ({} facts)", path.display(), report.facts.len());

        Ok(AssetIndex {
            path: path.to_path_buf(),
            facts: report.facts,
            skipped: report.skipped.iter().map(|e| e.to_string()).collect(),
        })
    }

    /// Index all matching files under `dir`, in path order
    pub fn index_directory(&self, dir: &Path) -> Result<BatchReport, BatchError> {
        let mut report = BatchReport::default();

        for entry in WalkDir::new(dir)
            .follow_links(self.config.batch.follow_links)
            .sort_by_file_name()
        {
            let outcome = match entry {
                Ok(entry) => {
                    let matched = entry.file_type().is_file()
                        && entry
                            .file_name()
                            .to_str()
                            .map(|name| self.config.batch.matches(name))
                            .unwrap_or(false);
                    if !matched {
                        continue;
                    }
                    self.index_file(entry.path())
                }
                Err(e) => Err(BatchError::Walk {
                    path: e.path().unwrap_or(dir).to_path_buf(),
                    source: e,
                }),
            };

            match outcome {
                Ok(asset) => report.assets.push(asset),
                Err(e) => match self.config.batch.on_error {
                    ErrorPolicy::Abort => return Err(e),
                    ErrorPolicy::Skip => {
                        warn!("{}", e);
                        report.failures.push(e);
                    }
                },
            }
        }

        Ok(report)
    }
}
