//! The position of the adapter in the event feed.
use super::{
    event::Event,
    kvstore::{KvStore, KvStoreError},
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The last event delivered to the sink.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub last_event_key: i32,
    pub last_event_time: DateTime<FixedOffset>,
}

impl Checkpoint {
    pub fn of(event: &Event) -> Self {
        Checkpoint {
            last_event_key: event.key,
            last_event_time: event.created_time,
        }
    }
}

/// Persists the [`Checkpoint`] of one source, JSON encoded under its key.
pub struct CheckpointStore<S> {
    store: S,
    key: String,
    current: Option<Checkpoint>,
}

impl<S: KvStore> CheckpointStore<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        CheckpointStore {
            store,
            key: key.into(),
            current: None,
        }
    }

    /// Loads the persisted checkpoint. An undecodable value is an error rather than a
    /// reason to start over.
    pub async fn init(&mut self) -> Result<Option<&Checkpoint>, KvStoreError> {
        self.store.init().await?;
        self.current = match self.store.get(&self.key) {
            Some(raw) => Some(serde_json::from_str(&raw).map_err(|source| KvStoreError::Decode {
                key: self.key.clone(),
                source,
            })?),
            None => None,
        };
        Ok(self.current.as_ref())
    }

    pub fn current(&self) -> Option<&Checkpoint> {
        self.current.as_ref()
    }

    /// Persists `checkpoint` if it is past the current one. Returns whether it moved.
    pub async fn advance(&mut self, checkpoint: Checkpoint) -> Result<bool, KvStoreError> {
        if let Some(current) = &self.current {
            if checkpoint.last_event_key <= current.last_event_key {
                debug!(key = checkpoint.last_event_key, current = current.last_event_key, "checkpoint not advanced");
                return Ok(false);
            }
        }
        let raw = serde_json::to_string(&checkpoint).map_err(|source| KvStoreError::Encode {
            key: self.key.clone(),
            source,
        })?;
        self.store.set(&self.key, raw).await?;
        self.current = Some(checkpoint);
        Ok(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::adapter::event::sample;
    use crate::adapter::kvstore::test::MemoryKvStore;

    fn checkpoint(key: i32) -> Checkpoint {
        Checkpoint::of(sample("VmPoweredOnEvent", key).base())
    }

    #[tokio::test]
    async fn advances_forward_only() {
        let kv = MemoryKvStore::default();
        let mut store = CheckpointStore::new(kv.clone(), "vcenter");
        assert_eq!(store.init().await.unwrap(), None);

        assert!(store.advance(checkpoint(5)).await.unwrap());
        assert!(!store.advance(checkpoint(5)).await.unwrap());
        assert!(!store.advance(checkpoint(4)).await.unwrap());
        assert_eq!(store.current().map(|c| c.last_event_key), Some(5));

        let persisted: Checkpoint = serde_json::from_str(&kv.entries.lock()["vcenter"]).unwrap();
        assert_eq!(persisted, checkpoint(5));
    }

    #[tokio::test]
    async fn init_loads_the_persisted_checkpoint() {
        let kv = MemoryKvStore::default();
        kv.entries.lock().insert(
            "vcenter".into(),
            r#"{"lastEventKey":41,"lastEventTime":"2020-03-01T12:00:00.5-08:00"}"#.into(),
        );
        let mut store = CheckpointStore::new(kv, "vcenter");
        let loaded = store.init().await.unwrap().cloned().unwrap();
        assert_eq!(loaded.last_event_key, 41);
        assert_eq!(loaded.last_event_time.to_rfc3339(), "2020-03-01T12:00:00.500-08:00");
    }

    #[tokio::test]
    async fn undecodable_checkpoints_fail_init() {
        let kv = MemoryKvStore::default();
        kv.entries.lock().insert("vcenter".into(), "not json".into());
        let mut store = CheckpointStore::new(kv, "vcenter");
        assert!(matches!(store.init().await, Err(KvStoreError::Decode { .. })));
    }
}
