//! Shared, concurrently mutated document handle.

use super::Document;
use crate::result::{PierceError, PierceResult};
use std::sync::{Arc, RwLock, RwLockReadGuard};
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

#[derive(Debug)]
struct Inner {
    document: RwLock<Document>,
    changed: Notify,
}

/// A [`Document`] shared between the code that mutates it and any number of
/// concurrent waits.
///
/// Every read holds the lock for one evaluation pass, so a pass always sees a
/// consistent tree. Every mutation wakes waiters parked on
/// [`changed`](Self::changed).
#[derive(Debug, Clone)]
pub struct SharedDocument {
    inner: Arc<Inner>,
}

impl Default for SharedDocument {
    fn default() -> Self {
        Self::new(Document::new())
    }
}

impl SharedDocument {
    /// Wrap a document
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self {
            inner: Arc::new(Inner {
                document: RwLock::new(document),
                changed: Notify::new(),
            }),
        }
    }

    /// Read-locked snapshot for a single evaluation pass
    pub fn read(&self) -> PierceResult<RwLockReadGuard<'_, Document>> {
        self.inner
            .document
            .read()
            .map_err(|_| PierceError::InvalidState {
                message: "document lock poisoned by a panicking writer".to_string(),
            })
    }

    /// Snapshot for evaluating `selector`; a poisoned lock is an evaluation
    /// failure of that selector
    pub fn snapshot(&self, selector: &str) -> PierceResult<RwLockReadGuard<'_, Document>> {
        self.inner
            .document
            .read()
            .map_err(|_| PierceError::Evaluation {
                selector: selector.to_string(),
                message: "document lock poisoned by a panicking writer".to_string(),
            })
    }

    /// Apply a mutation and signal waiters
    pub fn mutate<R>(&self, f: impl FnOnce(&mut Document) -> R) -> PierceResult<R> {
        let result = {
            let mut document =
                self.inner
                    .document
                    .write()
                    .map_err(|_| PierceError::InvalidState {
                        message: "document lock poisoned by a panicking writer".to_string(),
                    })?;
            f(&mut *document)
        };
        self.inner.changed.notify_waiters();
        Ok(result)
    }

    /// Future that completes on the next mutation.
    ///
    /// Call `enable()` on the pinned future before evaluating to make sure a
    /// mutation racing with the evaluation is not missed.
    pub fn changed(&self) -> Notified<'_> {
        self.inner.changed.notified()
    }
}
