//! store.rs: stored content items, in memory with optional JSON file persistence.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::agent::types::StoredContent;

#[derive(Debug)]
pub struct ContentStore {
    inner: Mutex<Vec<StoredContent>>,
    path: Option<PathBuf>,
}

impl ContentStore {
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
            path: None,
        }
    }

    /// Open a file-backed store. A missing file starts empty; a corrupt one is an error.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let items = match fs::read_to_string(&path) {
            Ok(s) if s.trim().is_empty() => Vec::new(),
            Ok(s) => serde_json::from_str::<Vec<StoredContent>>(&s)
                .with_context(|| format!("parsing content store {}", path.display()))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("reading content store {}", path.display()))
            }
        };
        Ok(Self {
            inner: Mutex::new(items),
            path: Some(path),
        })
    }

    /// Insert unless an item with the same id exists. Returns whether it was added.
    pub fn insert(&self, item: StoredContent) -> bool {
        let mut g = self.lock();
        if g.iter().any(|it| it.id == item.id) {
            return false;
        }
        g.push(item);
        true
    }

    /// All items in insertion order.
    pub fn all(&self) -> Vec<StoredContent> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Write the current items to the backing file (no-op for in-memory stores).
    pub fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&*self.lock()).context("serializing store")?;
        write_atomic(path, json.as_bytes())
            .with_context(|| format!("writing content store {}", path.display()))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<StoredContent>> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    fs::rename(tmp, path)
}

/// Stable item id: first 16 hex chars of SHA-256 over `source_url \n content`.
pub fn content_id(source_url: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_url.as_bytes());
    hasher.update(b"\n");
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str, content: &str) -> StoredContent {
        StoredContent {
            id: content_id(url, content),
            title: format!("t:{url}"),
            source_url: url.to_string(),
            content: content.to_string(),
            quality_score: 0.7,
            ..Default::default()
        }
    }

    #[test]
    fn content_id_is_stable_and_short() {
        let a = content_id("https://a", "body");
        assert_eq!(a.len(), 16);
        assert_eq!(a, content_id("https://a", "body"));
        assert_ne!(a, content_id("https://b", "body"));
    }

    #[test]
    fn duplicates_are_ignored() {
        let s = ContentStore::in_memory();
        assert!(s.insert(item("https://a", "x")));
        assert!(!s.insert(item("https://a", "x")));
        assert!(s.insert(item("https://a", "y")));
        assert_eq!(s.len(), 2);
        s.clear();
        assert!(s.is_empty());
    }

    #[test]
    fn file_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let s = ContentStore::open(&path).unwrap();
        assert!(s.is_empty());
        s.insert(item("https://a", "x"));
        s.insert(item("https://b", "y"));
        s.persist().unwrap();

        let reopened = ContentStore::open(&path).unwrap();
        let titles: Vec<String> = reopened.all().into_iter().map(|i| i.title).collect();
        assert_eq!(titles, vec!["t:https://a", "t:https://b"]);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{not json").unwrap();
        assert!(ContentStore::open(&path).is_err());
    }
}
