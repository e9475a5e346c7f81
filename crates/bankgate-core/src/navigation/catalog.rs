//! Process-wide navigation tree, loaded once.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use bankgate_types::Role;
use tokio::sync::OnceCell;

use super::menu::{MenuItem, menu_for};
use super::resolver;
use super::source::NavigationSource;
use super::tree::NavigationTree;

/// Where the cached tree came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeOrigin {
    Source,
    /// Last-known-good snapshot after a failed fetch.
    Snapshot,
    /// Nothing usable; every protected lookup is denied.
    Empty,
}

#[derive(Debug)]
struct LoadedTree {
    tree: Arc<NavigationTree>,
    origin: TreeOrigin,
}

/// Loads the navigation tree once and serves it for the process lifetime.
///
/// Concurrent `load()` calls before the first completes share a single fetch.
/// A failed fetch still marks the catalog loaded, with the last-known-good
/// snapshot or an empty tree, so callers never wait on configuration forever.
pub struct NavigationCatalog {
    source: Box<dyn NavigationSource>,
    snapshot_path: Option<PathBuf>,
    loaded: OnceCell<LoadedTree>,
}

impl fmt::Debug for NavigationCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationCatalog")
            .field("source", &self.source.name())
            .field("snapshot_path", &self.snapshot_path)
            .field("loaded", &self.loaded.initialized())
            .finish()
    }
}

impl NavigationCatalog {
    pub fn new(source: Box<dyn NavigationSource>) -> Self {
        Self {
            source,
            snapshot_path: None,
            loaded: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn with_snapshot(mut self, path: Option<PathBuf>) -> Self {
        self.snapshot_path = path;
        self
    }

    pub async fn load(&self) -> Arc<NavigationTree> {
        let loaded = self
            .loaded
            .get_or_init(|| self.fetch_or_fallback())
            .await;
        Arc::clone(&loaded.tree)
    }

    /// The cached tree, without triggering a load.
    pub fn get(&self) -> Option<Arc<NavigationTree>> {
        self.loaded.get().map(|l| Arc::clone(&l.tree))
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    pub fn origin(&self) -> Option<TreeOrigin> {
        self.loaded.get().map(|l| l.origin)
    }

    pub async fn can_access(&self, path: &str, role: Option<&Role>) -> bool {
        let tree = self.load().await;
        resolver::can_access(&tree, path, role)
    }

    pub async fn menu_for(&self, role: Option<&Role>) -> Vec<MenuItem> {
        let tree = self.load().await;
        menu_for(&tree, role)
    }

    async fn fetch_or_fallback(&self) -> LoadedTree {
        let source_name = self.source.name();
        match self.source.fetch().await {
            Ok(tree) => {
                tracing::debug!(
                    source = %source_name,
                    nodes = tree.node_count(),
                    "navigation loaded"
                );
                if let Some(path) = &self.snapshot_path
                    && let Err(err) = write_snapshot(path, &tree)
                {
                    tracing::warn!(path = %path.display(), "failed to snapshot navigation: {err:#}");
                }
                LoadedTree {
                    tree: Arc::new(tree),
                    origin: TreeOrigin::Source,
                }
            }
            Err(err) => {
                tracing::warn!(source = %source_name, "navigation unavailable: {err}");
                match self.snapshot_path.as_deref().map(read_snapshot) {
                    Some(Ok(tree)) => {
                        tracing::info!("using last-known-good navigation snapshot");
                        LoadedTree {
                            tree: Arc::new(tree),
                            origin: TreeOrigin::Snapshot,
                        }
                    }
                    Some(Err(snapshot_err)) => {
                        tracing::warn!("navigation snapshot unusable: {snapshot_err:#}");
                        empty()
                    }
                    None => empty(),
                }
            }
        }
    }
}

fn empty() -> LoadedTree {
    LoadedTree {
        tree: Arc::new(NavigationTree::default()),
        origin: TreeOrigin::Empty,
    }
}

fn read_snapshot(path: &Path) -> Result<NavigationTree> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    NavigationTree::from_json(&contents)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))
}

fn write_snapshot(path: &Path, tree: &NavigationTree) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    let json = tree.to_json_pretty()?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(json.as_bytes())
        .context("Failed to write navigation snapshot")?;
    tmp.persist(path)
        .with_context(|| format!("Failed to persist snapshot to {}", path.display()))?;
    Ok(())
}
