use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;

use super::backend::{Backend, FileBackend, MemoryBackend};
use crate::error::Result;

pub type ContextId = u64;

const EVENT_CAPACITY: usize = 64;

/// A change made through one store context. `key` is `None` when the
/// receiver fell behind and lost events, in which case every key should be
/// treated as changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: Option<String>,
    pub origin: ContextId,
}

/// Handle onto a shared key-value backend.
///
/// Every handle belongs to a context (the equivalent of a browser tab).
/// Clones share the context; [`Store::open_context`] creates a sibling.
/// Writes notify every context except the one that wrote.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn Backend>,
    events: broadcast::Sender<StorageEvent>,
    contexts: Arc<AtomicU64>,
    context: ContextId,
}

impl Store {
    pub fn new(backend: impl Backend + 'static) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let contexts = Arc::new(AtomicU64::new(1));
        let context = contexts.fetch_add(1, Ordering::Relaxed);
        Self {
            backend: Arc::new(backend),
            events,
            contexts,
            context,
        }
    }

    pub fn memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(FileBackend::new(path))
    }

    pub fn open_context(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            events: self.events.clone(),
            contexts: Arc::clone(&self.contexts),
            context: self.contexts.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn context_id(&self) -> ContextId {
        self.context
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.backend.get(key)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.backend.set(key, value)?;
        self.notify(key);
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        if self.backend.remove(key)? {
            self.notify(key);
        }
        Ok(())
    }

    pub fn subscribe(&self) -> StorageEvents {
        StorageEvents {
            receiver: self.events.subscribe(),
            context: self.context,
        }
    }

    fn notify(&self, key: &str) {
        // No receivers is fine.
        let _ = self.events.send(StorageEvent {
            key: Some(key.to_string()),
            origin: self.context,
        });
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Change notifications from other contexts of the same store.
pub struct StorageEvents {
    receiver: broadcast::Receiver<StorageEvent>,
    context: ContextId,
}

impl StorageEvents {
    /// Next change made by another context, or `None` once every store
    /// handle has been dropped.
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.origin == self.context => continue,
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    return Some(StorageEvent {
                        key: None,
                        origin: 0,
                    });
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
