//! Drives the dependents of every `VSphereSource` toward their desired shape.
pub mod controller;
pub mod index;
pub mod semantic;
pub mod store;
pub mod vsphere;

#[cfg(test)]
pub(crate) mod fake;

use knative::apis::FieldError;
use kube::Resource;
use std::fmt;
use store::StoreError;
use thiserror::Error;
use tracing::{info, warn};

/// Identifies a namespaced object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        ObjectKey {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// The key of a stored object, if it carries a name.
    pub fn from_resource<K: Resource>(object: &K) -> Option<Self> {
        let meta = object.meta();
        Some(ObjectKey::new(meta.namespace.clone().unwrap_or_default(), meta.name.clone()?))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Normal,
    Warning,
}

/// A human readable record of something the reconciler did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileEvent {
    pub type_: EventType,
    pub reason: String,
    pub message: String,
}

impl ReconcileEvent {
    pub fn normal(reason: &str, message: impl Into<String>) -> Self {
        ReconcileEvent {
            type_: EventType::Normal,
            reason: reason.to_string(),
            message: message.into(),
        }
    }

    pub fn warning(reason: &str, message: impl Into<String>) -> Self {
        ReconcileEvent {
            type_: EventType::Warning,
            reason: reason.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("invalid spec: {0}")]
    Validation(#[from] FieldError),
    #[error("failed to resolve sink: {0}")]
    Sink(#[source] knative::error::Error),
    #[error("{kind} {name:?} exists and is not controlled by this source")]
    NotOwned { kind: String, name: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReconcileError {
    /// Permanent errors need a spec edit, so they are not retried.
    pub fn is_permanent(&self) -> bool {
        matches!(self, ReconcileError::Validation(_))
    }
}

/// Sink for [`ReconcileEvent`]s.
pub trait Recorder: Send + Sync {
    fn record(&self, key: &ObjectKey, event: &ReconcileEvent);
}

/// Writes events to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecorder;

impl Recorder for TracingRecorder {
    fn record(&self, key: &ObjectKey, event: &ReconcileEvent) {
        match event.type_ {
            EventType::Normal => info!(%key, reason = %event.reason, "{}", event.message),
            EventType::Warning => warn!(%key, reason = %event.reason, "{}", event.message),
        }
    }
}
