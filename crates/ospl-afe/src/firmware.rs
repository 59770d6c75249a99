//! External configuration blobs: loading and the shared cache.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, error, info};

use crate::config::{AfeConfig, CONFIG_SLOTS, DEFAULT_MAX_CONFIG_SIZE};
use crate::error::{LoadError, Result};

/// Source of named configuration blobs.
pub trait BlobSource: Send + Sync {
    fn load_blob(&self, name: &str) -> std::result::Result<Bytes, LoadError>;
}

impl<S: BlobSource + ?Sized> BlobSource for Arc<S> {
    fn load_blob(&self, name: &str) -> std::result::Result<Bytes, LoadError> {
        (**self).load_blob(name)
    }
}

/// Reads `<dir>/<name>` as a regular file of bounded size.
#[derive(Debug, Clone)]
pub struct DirectoryBlobSource {
    dir: PathBuf,
    max_size: usize,
}

impl DirectoryBlobSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_size: DEFAULT_MAX_CONFIG_SIZE,
        }
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl BlobSource for DirectoryBlobSource {
    fn load_blob(&self, name: &str) -> std::result::Result<Bytes, LoadError> {
        let path = self.dir.join(name);
        let io_err = |source: std::io::Error| LoadError::Io {
            name: name.to_string(),
            source,
        };

        let metadata = match std::fs::symlink_metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(LoadError::NotFound {
                    name: name.to_string(),
                })
            }
            Err(err) => return Err(io_err(err)),
        };
        // Symlinks and directories are treated as absent.
        if !metadata.file_type().is_file() {
            return Err(LoadError::NotFound {
                name: name.to_string(),
            });
        }
        if metadata.len() > self.max_size as u64 {
            return Err(LoadError::TooLarge {
                name: name.to_string(),
                size: metadata.len(),
                max: self.max_size,
            });
        }

        let file = std::fs::File::open(&path).map_err(io_err)?;
        let read_limit = u64::try_from(self.max_size.saturating_add(1)).unwrap_or(u64::MAX);
        let mut content = Vec::new();
        file.take(read_limit)
            .read_to_end(&mut content)
            .map_err(io_err)?;
        if content.len() > self.max_size {
            return Err(LoadError::TooLarge {
                name: name.to_string(),
                size: content.len() as u64,
                max: self.max_size,
            });
        }
        if content.is_empty() {
            return Err(LoadError::Empty {
                name: name.to_string(),
            });
        }
        Ok(Bytes::from(content))
    }
}

/// In-memory blobs keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobSource {
    blobs: HashMap<String, Bytes>,
}

impl MemoryBlobSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(mut self, name: impl Into<String>, blob: impl Into<Bytes>) -> Self {
        self.insert(name, blob);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, blob: impl Into<Bytes>) {
        self.blobs.insert(name.into(), blob.into());
    }
}

impl BlobSource for MemoryBlobSource {
    fn load_blob(&self, name: &str) -> std::result::Result<Bytes, LoadError> {
        match self.blobs.get(name) {
            Some(blob) if blob.is_empty() => Err(LoadError::Empty {
                name: name.to_string(),
            }),
            Some(blob) => Ok(blob.clone()),
            None => Err(LoadError::NotFound {
                name: name.to_string(),
            }),
        }
    }
}

/// Load every named blob. A failure only affects its own slot.
pub fn load_all<S: BlobSource + ?Sized>(
    source: &S,
    names: &[String; CONFIG_SLOTS],
) -> [std::result::Result<Bytes, LoadError>; CONFIG_SLOTS] {
    std::array::from_fn(|index| source.load_blob(&names[index]))
}

/// Bytes of `blob` up to, not including, the first NUL.
pub fn config_string(blob: &[u8]) -> &[u8] {
    match blob.iter().position(|byte| *byte == 0) {
        Some(end) => &blob[..end],
        None => blob,
    }
}

#[derive(Debug, Default)]
struct CacheState {
    loaded: bool,
    slots: [Option<Bytes>; CONFIG_SLOTS],
}

/// The four cached external configurations.
///
/// Filled once by a background load; readers either check [`is_loaded`] or
/// block in [`wait_loaded`] until the load has published its results.
///
/// [`is_loaded`]: ConfigCache::is_loaded
/// [`wait_loaded`]: ConfigCache::wait_loaded
#[derive(Debug, Default)]
pub struct ConfigCache {
    state: Mutex<CacheState>,
    loaded: Condvar,
}

impl ConfigCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load all slots on the calling thread.
    ///
    /// Blobs are read without holding the cache lock and published together.
    pub fn load<S: BlobSource + ?Sized>(&self, source: &S, names: &[String; CONFIG_SLOTS]) {
        let mut slots: [Option<Bytes>; CONFIG_SLOTS] = Default::default();
        for (index, result) in load_all(source, names).into_iter().enumerate() {
            slots[index] = match result {
                Ok(blob) => {
                    info!(name = %names[index], "loading cfg file");
                    debug!(
                        index,
                        size = blob.len(),
                        config = %String::from_utf8_lossy(config_string(&blob)),
                        "external config"
                    );
                    Some(blob)
                }
                Err(err) => {
                    error!(index, name = %names[index], error = %err, "failed to load config");
                    None
                }
            };
        }
        {
            let mut state = lock(&self.state);
            state.slots = slots;
            state.loaded = true;
        }
        self.loaded.notify_all();
    }

    /// Run [`load`](ConfigCache::load) on a dedicated `ospl-config` thread.
    pub fn spawn_load<S>(
        self: &Arc<Self>,
        source: S,
        names: [String; CONFIG_SLOTS],
    ) -> Result<JoinHandle<()>>
    where
        S: BlobSource + 'static,
    {
        let cache = Arc::clone(self);
        let handle = thread::Builder::new()
            .name("ospl-config".to_string())
            .spawn(move || cache.load(&source, &names))?;
        Ok(handle)
    }

    pub fn is_loaded(&self) -> bool {
        lock(&self.state).loaded
    }

    /// Block until the load finished or `timeout` passed. Returns `is_loaded()`.
    pub fn wait_loaded(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = lock(&self.state);
        while !state.loaded {
            state = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    self.loaded
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .loaded
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
        true
    }

    /// Blob in `index`, `None` when absent, out of range, or not loaded yet.
    pub fn get(&self, index: usize) -> Option<Bytes> {
        lock(&self.state).slots.get(index).cloned().flatten()
    }

    /// Number of slots holding a blob.
    pub fn available(&self) -> usize {
        lock(&self.state).slots.iter().filter(|slot| slot.is_some()).count()
    }
}

/// Blob source described by an engine configuration, if it names a directory.
pub fn directory_source(config: &AfeConfig) -> Option<DirectoryBlobSource> {
    config
        .firmware_dir
        .as_ref()
        .map(|dir| DirectoryBlobSource::new(dir).with_max_size(config.max_config_size))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
