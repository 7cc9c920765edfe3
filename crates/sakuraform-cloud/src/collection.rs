//! Element-level edits over whole-object APIs
//!
//! Some parents (GSLB servers, VPC-router firewall rules) only expose their
//! embedded lists through a full GET/PUT of the parent. A [`CollectionEditor`]
//! turns "add one element" / "remove one element" into
//! lock → read → mutate → write → apply → unlock, holding a
//! [`NamedResourceMutex`] lock on the parent ID for the whole cycle so two
//! editors in this process never lose each other's update.

use crate::error::Result;
use crate::lock::NamedResourceMutex;
use async_trait::async_trait;
use std::sync::Arc;

/// Result of adding an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// No equal element existed; appended
    Inserted,
    /// An equal element existed; its mutable fields were overwritten
    Updated,
}

/// Parent-specific half of a collection editor
#[async_trait]
pub trait CollectionBackend: Send + Sync {
    type Parent: Send + Sync;
    type Element: Send;
    type Key: Send + Sync + ?Sized;

    /// Resource kind used in log lines
    fn kind(&self) -> &'static str;

    async fn read(&self, parent_id: &str) -> Result<Self::Parent>;

    /// Whole-object write-back
    async fn write(&self, parent_id: &str, parent: &Self::Parent) -> Result<()>;

    /// Runs after the write-back, still under the lock
    async fn apply(&self, _parent_id: &str) -> Result<()> {
        Ok(())
    }

    /// Insert `element`, or update the element considered equal to it
    fn upsert(&self, parent: &mut Self::Parent, element: Self::Element) -> Result<Upsert>;

    /// Drop every element matching `key`, returning how many were removed
    fn remove(&self, parent: &mut Self::Parent, key: &Self::Key) -> usize;
}

/// Serialized add/remove over a [`CollectionBackend`]
pub struct CollectionEditor<B: CollectionBackend> {
    backend: B,
    locks: Arc<NamedResourceMutex>,
}

impl<B: CollectionBackend> CollectionEditor<B> {
    /// Editor sharing the process-wide lock registry
    pub fn new(backend: B) -> Self {
        Self::with_locks(backend, NamedResourceMutex::global())
    }

    pub fn with_locks(backend: B, locks: Arc<NamedResourceMutex>) -> Self {
        Self { backend, locks }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn add_element(&self, parent_id: &str, element: B::Element) -> Result<Upsert> {
        let _guard = self.locks.lock(parent_id).await;

        let mut parent = self.backend.read(parent_id).await?;
        let outcome = self.backend.upsert(&mut parent, element)?;
        self.backend.write(parent_id, &parent).await?;
        self.backend.apply(parent_id).await?;

        tracing::info!(
            "{} {}: element {}",
            self.backend.kind(),
            parent_id,
            match outcome {
                Upsert::Inserted => "added",
                Upsert::Updated => "updated",
            }
        );
        Ok(outcome)
    }

    /// Removing an absent element succeeds without writing anything
    pub async fn remove_element(&self, parent_id: &str, key: &B::Key) -> Result<usize> {
        let _guard = self.locks.lock(parent_id).await;

        let mut parent = self.backend.read(parent_id).await?;
        let removed = self.backend.remove(&mut parent, key);
        if removed == 0 {
            tracing::debug!(
                "{} {}: nothing to remove",
                self.backend.kind(),
                parent_id
            );
            return Ok(0);
        }

        self.backend.write(parent_id, &parent).await?;
        self.backend.apply(parent_id).await?;

        tracing::info!(
            "{} {}: removed {} element(s)",
            self.backend.kind(),
            parent_id,
            removed
        );
        Ok(removed)
    }
}
