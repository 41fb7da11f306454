use std::{
    collections::HashSet,
    fs, io,
    path::{Path, PathBuf},
};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::paper::Paper;

/// Failures writing the state file. Problems reading it are never errors: a broken file is
/// replaced by an empty one.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create state directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write state file {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialise state")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct State<'a> {
    seen_links: Vec<&'a str>,
}

/// Links that were already delivered, persisted as `{"seen_links": [...]}`.
///
/// Every change rewrites the whole file with the links sorted.
#[derive(Debug)]
pub struct SeenStore {
    path: PathBuf,
    seen: HashSet<String>,
}

impl SeenStore {
    /// Open the store at `path`, creating the file (and its directory) when missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut store = SeenStore {
            path,
            seen: HashSet::new(),
        };

        if !store.path.exists() {
            debug!(path = %store.path.display(), "creating empty state file");
            store.persist()?;
            return Ok(store);
        }

        match load(&store.path) {
            Ok(seen) => store.seen = seen,
            Err(reason) => {
                warn!(
                    path = %store.path.display(),
                    reason = %reason,
                    "failed to load state file, starting fresh"
                );
                store.persist()?;
            }
        }
        debug!(path = %store.path.display(), count = store.seen.len(), "loaded seen links");
        Ok(store)
    }

    /// Load the links at `path` without creating, repairing or ever writing the file.
    pub fn read_only(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let seen = if path.exists() {
            load(&path).unwrap_or_else(|reason| {
                warn!(path = %path.display(), reason = %reason, "ignoring unreadable state file");
                HashSet::new()
            })
        } else {
            HashSet::new()
        };
        SeenStore { path, seen }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn is_seen(&self, paper: &Paper) -> bool {
        self.seen.contains(paper.link())
    }

    /// Record `paper` as delivered. Already known links do not touch the file.
    pub fn mark_seen(&mut self, paper: &Paper) -> Result<(), StoreError> {
        if !self.seen.insert(paper.link().to_string()) {
            return Ok(());
        }
        self.persist()
    }

    fn persist(&self) -> Result<(), StoreError> {
        let mut seen_links: Vec<&str> = self.seen.iter().map(String::as_str).collect();
        seen_links.sort_unstable();
        let payload = serde_json::to_string_pretty(&State { seen_links })?;

        // Write a sibling and rename it over the real file so readers never see half a document.
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        fs::write(&tmp, payload).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)
    }
}

fn load(path: &Path) -> Result<HashSet<String>, String> {
    let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let value: Value = serde_json::from_str(&text).map_err(|e| e.to_string())?;

    let Value::Object(mut map) = value else {
        return Err("state is not a JSON object".to_string());
    };
    match map.remove("seen_links") {
        None => Ok(HashSet::new()),
        Some(Value::Array(links)) => Ok(links
            .into_iter()
            .filter_map(|link| match link {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect()),
        Some(_) => Err("`seen_links` is not a list".to_string()),
    }
}
