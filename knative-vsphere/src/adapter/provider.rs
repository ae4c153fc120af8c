//! The vSphere side of the adapter.
use super::{
    checkpoint::Checkpoint,
    event::{ManagedObjectReference, ProviderEvent},
};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("vSphere session failed: {0}")]
    Session(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("unable to decode event: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A logged in session reading the event history of a vCenter.
#[async_trait]
pub trait EventSession: Send {
    /// The folder at the top of the inventory.
    async fn root_folder(&mut self) -> Result<ManagedObjectReference, ProviderError>;
    /// Starts tailing events under `root`, after `from` when given.
    async fn subscribe(&mut self, root: &ManagedObjectReference, from: Option<&Checkpoint>) -> Result<(), ProviderError>;
    /// The next batch of events in feed order, or `None` once the feed is closed.
    async fn next_batch(&mut self) -> Result<Option<Vec<ProviderEvent>>, ProviderError>;
    /// Logs out.
    fn close(&mut self);
}
