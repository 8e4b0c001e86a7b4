//! Memoization: volatile and file-backed caches
//!
//! A cache node wraps one child and owns the only mutable state in the
//! engine: a single-slot entry holding the last computed value and, for the
//! keyed variant, the fingerprint of the argument set that produced it.
//!
//! Two storage strategies satisfy the same [`CacheStorage`] contract:
//! [`MemoryStorage`] (process memory) and [`FileStorage`] (one backing file;
//! presence of the path is the "populated" signal, and the cache's durability
//! is exactly the file's durability). Two invalidation policies: keyless
//! (compute once per node instance, ever) and keyed (recompute whenever the
//! fingerprint of the current argument set changes).
//!
//! At most one evaluation of the child happens per (node instance,
//! fingerprint) pair: a per-node async mutex is held across the whole
//! load/compute/save step, so concurrent first callers observe the first
//! completed result instead of racing to compute their own.
//!
//! # Examples
//!
//! ```rust
//! use fai_core::{cache, compute, Args, Node, NodeExt};
//! use serde_json::{json, Value};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> fai_core::Result<()> {
//! let calls = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&calls);
//! let expensive = compute([] as [&str; 0], move |_: &Args| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//!     Ok(json!("expensive result"))
//! });
//!
//! let cached = cache(expensive.into_node());
//! cached.invoke(&Args::new()).await?;
//! cached.invoke(&Args::new()).await?;
//! assert_eq!(calls.load(Ordering::SeqCst), 1);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::args::Args;
use crate::error::Result;
use crate::node::{resolve_key, Node, NodeRef};

/// Fingerprint of an argument set: SHA-256 over the sorted items.
///
/// [`Args`] iterates in sorted key order, so serializing it directly honors
/// the "hash of the sorted argument-set items" rule.
pub fn fingerprint(args: &Args) -> Result<String> {
    let mut hasher = Sha256::new();
    for (key, value) in args {
        hasher.update(key.as_bytes());
        hasher.update([0]);
        hasher.update(serde_json::to_string(value)?.as_bytes());
        hasher.update([0]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// A populated cache slot. Never partially updated: the entry is replaced
/// wholesale or not at all.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The last computed value.
    pub value: Value,
    /// Fingerprint of the argument set that produced it (keyed variant only).
    pub fingerprint: Option<String>,
}

/// Storage contract shared by the volatile and durable strategies.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Reads the current entry, if any.
    async fn load(&self) -> Result<Option<CacheEntry>>;

    /// Replaces the entry.
    async fn save(&self, entry: &CacheEntry) -> Result<()>;

    /// Empties the storage.
    async fn clear(&self) -> Result<()>;

    /// Whether the storage currently holds no entry.
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.load().await?.is_none())
    }
}

/// Volatile single-slot storage in process memory.
#[derive(Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<CacheEntry>>,
}

impl MemoryStorage {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn load(&self) -> Result<Option<CacheEntry>> {
        Ok(self.slot.lock().expect("cache slot poisoned").clone())
    }

    async fn save(&self, entry: &CacheEntry) -> Result<()> {
        *self.slot.lock().expect("cache slot poisoned") = Some(entry.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.slot.lock().expect("cache slot poisoned") = None;
        Ok(())
    }
}

/// Durable single-slot storage backed by one file.
///
/// The entry is written as a JSON text blob. Deleting the file is equivalent
/// to [`CacheStorage::clear`].
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Storage over the given path. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing path.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl CacheStorage for FileStorage {
    async fn load(&self) -> Result<Option<CacheEntry>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, entry: &CacheEntry) -> Result<()> {
        tokio::fs::write(&self.path, serde_json::to_string(entry)?).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn is_empty(&self) -> Result<bool> {
        Ok(!self.path.exists())
    }
}

/// Memoizing wrapper around one child node.
pub struct CacheNode {
    key: Option<String>,
    child: NodeRef,
    storage: Box<dyn CacheStorage>,
    keyed: bool,
    // Held across load/compute/save so concurrent callers under the same
    // fingerprint get a single child evaluation.
    flight: tokio::sync::Mutex<()>,
}

impl CacheNode {
    /// Cache over explicit storage and invalidation policy.
    pub fn new(child: NodeRef, storage: Box<dyn CacheStorage>, keyed: bool) -> Self {
        Self { key: None, child, storage, keyed, flight: tokio::sync::Mutex::new(()) }
    }

    /// Sets the output key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Forces the next invocation to recompute.
    pub async fn clear(&self) -> Result<()> {
        let _flight = self.flight.lock().await;
        self.storage.clear().await
    }

    /// Whether the cache currently holds a value.
    pub async fn is_empty(&self) -> Result<bool> {
        self.storage.is_empty().await
    }
}

#[async_trait]
impl Node for CacheNode {
    async fn invoke(&self, args: &Args) -> Result<Value> {
        let _flight = self.flight.lock().await;

        let current = if self.keyed { Some(fingerprint(args)?) } else { None };
        if let Some(entry) = self.storage.load().await? {
            if !self.keyed || entry.fingerprint == current {
                debug!(key = self.key(), "cache hit");
                return Ok(entry.value);
            }
            debug!(key = self.key(), "cache fingerprint changed, recomputing");
        }

        let value = self.child.invoke(args).await?;
        self.storage
            .save(&CacheEntry { value: value.clone(), fingerprint: current })
            .await?;
        Ok(value)
    }

    fn key(&self) -> &str {
        resolve_key(&self.key)
    }
}

/// Keyless volatile cache: the child runs once, ever, per node instance.
pub fn cache(child: NodeRef) -> CacheNode {
    CacheNode::new(child, Box::new(MemoryStorage::new()), false)
}

/// Keyed volatile cache: the child reruns whenever the argument-set
/// fingerprint differs from the one that produced the stored value. Single
/// slot: returning to an earlier fingerprint recomputes.
pub fn keyed_cache(child: NodeRef) -> CacheNode {
    CacheNode::new(child, Box::new(MemoryStorage::new()), true)
}

/// Keyless durable cache backed by a file at `path`.
pub fn store(child: NodeRef, path: impl Into<PathBuf>) -> CacheNode {
    CacheNode::new(child, Box::new(FileStorage::new(path)), false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::node::{compute, NodeExt};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_child(calls: Arc<AtomicUsize>) -> NodeRef {
        compute(["tag"], move |args: &Args| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!(format!("run {} for {}", n, args["tag"])))
        })
        .into_node()
    }

    #[tokio::test]
    async fn keyless_cache_evaluates_child_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let node = cache(counting_child(Arc::clone(&calls)));

        let first = node.invoke(&args! { "tag" => "a" }).await.unwrap();
        // Different arguments, same cached value: keyless means once, ever.
        let second = node.invoke(&args! { "tag" => "b" }).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn keyed_cache_recomputes_on_fingerprint_change() {
        let calls = Arc::new(AtomicUsize::new(0));
        let node = keyed_cache(counting_child(Arc::clone(&calls)));

        let a = node.invoke(&args! { "tag" => "a" }).await.unwrap();
        let a_again = node.invoke(&args! { "tag" => "a" }).await.unwrap();
        let b = node.invoke(&args! { "tag" => "b" }).await.unwrap();

        assert_eq!(a, a_again);
        assert_ne!(a, b);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn keyed_cache_is_single_slot() {
        let calls = Arc::new(AtomicUsize::new(0));
        let node = keyed_cache(counting_child(Arc::clone(&calls)));

        node.invoke(&args! { "tag" => "a" }).await.unwrap();
        node.invoke(&args! { "tag" => "b" }).await.unwrap();
        // Back to A: the slot now holds B's entry, so A is recomputed.
        node.invoke(&args! { "tag" => "a" }).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn clear_forces_recompute() {
        let calls = Arc::new(AtomicUsize::new(0));
        let node = cache(counting_child(Arc::clone(&calls)));

        node.invoke(&Args::new()).await.unwrap();
        assert!(!node.is_empty().await.unwrap());
        node.clear().await.unwrap();
        assert!(node.is_empty().await.unwrap());
        node.invoke(&Args::new()).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn file_storage_survives_a_new_node_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".setting");

        let calls = Arc::new(AtomicUsize::new(0));
        let first = store(counting_child(Arc::clone(&calls)), &path);
        let populated = first.invoke(&Args::new()).await.unwrap();

        // A fresh node over the same path sees the populated file.
        let second = store(counting_child(Arc::clone(&calls)), &path);
        let reused = second.invoke(&Args::new()).await.unwrap();

        assert_eq!(populated, reused);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn deleting_the_backing_file_clears_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".story");

        let calls = Arc::new(AtomicUsize::new(0));
        let node = store(counting_child(Arc::clone(&calls)), &path);

        node.invoke(&Args::new()).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();
        node.invoke(&Args::new()).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fingerprint_ignores_insertion_order() {
        let mut ab = Args::new();
        ab.insert("a".into(), json!(1));
        ab.insert("b".into(), json!(2));

        let mut ba = Args::new();
        ba.insert("b".into(), json!(2));
        ba.insert("a".into(), json!(1));

        assert_eq!(fingerprint(&ab).unwrap(), fingerprint(&ba).unwrap());
        assert_ne!(fingerprint(&ab).unwrap(), fingerprint(&Args::new()).unwrap());
    }
}
