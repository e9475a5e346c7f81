//! Where navigation documents come from.

use std::fs;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use url::Url;

use super::error::CatalogError;
use super::tree::NavigationTree;
use crate::backend::USER_AGENT;
use crate::config::NavigationLocation;

/// Boxed fetch future, so sources stay object-safe.
pub type SourceFuture<'a> =
    Pin<Box<dyn Future<Output = Result<NavigationTree, CatalogError>> + Send + 'a>>;

/// A fetchable navigation document.
pub trait NavigationSource: Send + Sync {
    /// Human-readable origin for logs and errors.
    fn name(&self) -> String;

    fn fetch(&self) -> SourceFuture<'_>;
}

/// Builds the source configured for `location`.
pub fn from_location(location: NavigationLocation) -> Box<dyn NavigationSource> {
    match location {
        NavigationLocation::File(path) => Box::new(FileSource::new(path)),
        NavigationLocation::Remote(url) => Box::new(HttpSource::new(url)),
    }
}

/// JSON document on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl NavigationSource for FileSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> SourceFuture<'_> {
        let path = self.path.clone();
        Box::pin(async move {
            let name = path.display().to_string();
            let contents = tokio::task::spawn_blocking(move || fs::read_to_string(&path))
                .await
                .map_err(|e| CatalogError::Fetch {
                    source_name: name.clone(),
                    message: e.to_string(),
                })?
                .map_err(|e| CatalogError::Fetch {
                    source_name: name,
                    message: e.to_string(),
                })?;
            NavigationTree::from_json(&contents)
        })
    }
}

/// JSON document served over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    url: Url,
}

impl HttpSource {
    pub fn new(url: Url) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self { client, url }
    }
}

impl NavigationSource for HttpSource {
    fn name(&self) -> String {
        self.url.to_string()
    }

    fn fetch(&self) -> SourceFuture<'_> {
        Box::pin(async move {
            let fetch_err = |message: String| CatalogError::Fetch {
                source_name: self.url.to_string(),
                message,
            };
            let response = self
                .client
                .get(self.url.clone())
                .header("Accept", "application/json")
                .send()
                .await
                .map_err(|e| fetch_err(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(fetch_err(format!("HTTP {status}")));
            }
            let body = response.text().await.map_err(|e| fetch_err(e.to_string()))?;
            NavigationTree::from_json(&body)
        })
    }
}

/// In-memory tree; always succeeds.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    tree: NavigationTree,
}

impl StaticSource {
    pub fn new(tree: NavigationTree) -> Self {
        Self { tree }
    }
}

impl NavigationSource for StaticSource {
    fn name(&self) -> String {
        "static".to_string()
    }

    fn fetch(&self) -> SourceFuture<'_> {
        let tree = self.tree.clone();
        Box::pin(async move {
            tree.validate()?;
            Ok(tree)
        })
    }
}
