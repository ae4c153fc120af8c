//! The receive adapter: tails the vCenter event history and forwards every event to the
//! sink as a CloudEvent, in feed order and at least once. An event is checkpointed only
//! after the sink accepted it, so an unclean shutdown between the two may send it again.
pub mod checkpoint;
pub mod event;
pub mod kvstore;
pub mod provider;
pub mod reporter;
pub mod sender;
pub mod transform;

use crate::config::EnvConfig;
use checkpoint::{Checkpoint, CheckpointStore};
use event::ProviderEvent;
use kvstore::{ConfigMapKvStore, KvStore, KvStoreError};
use provider::{EventSession, ProviderError};
use reporter::{ReportArgs, StatsReporter, TracingReporter, RESOURCE_GROUP};
use sender::{DeliveryError, EventSender, HttpSender};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use transform::Transformer;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("unable to initialize checkpoint store: {0}")]
    Startup(#[source] KvStoreError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("event feed closed")]
    FeedClosed,
    #[error("unable to encode event {key}: {source}")]
    Encode {
        key: i32,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to deliver event {id}: {source}")]
    Delivery {
        id: String,
        #[source]
        source: DeliveryError,
    },
    #[error("failed to persist checkpoint: {0}")]
    Checkpoint(#[from] KvStoreError),
}

pub struct Adapter<P, K> {
    namespace: String,
    session: P,
    checkpoints: CheckpointStore<K>,
    transformer: Transformer,
    sender: Arc<dyn EventSender>,
    reporter: Arc<dyn StatsReporter>,
}

impl<P: EventSession, K: KvStore> Adapter<P, K> {
    /// Loads the checkpoint of the source named in `config`.
    pub async fn new(
        config: &EnvConfig,
        session: P,
        kvstore: K,
        sender: Arc<dyn EventSender>,
        reporter: Arc<dyn StatsReporter>,
    ) -> Result<Self, AdapterError> {
        let mut checkpoints = CheckpointStore::new(kvstore, config.name.clone());
        if let Some(checkpoint) = checkpoints.init().await.map_err(AdapterError::Startup)? {
            info!(key = checkpoint.last_event_key, "resuming after checkpoint");
        }

        Ok(Adapter {
            namespace: config.namespace.clone(),
            session,
            checkpoints,
            transformer: Transformer::new(config.address.as_str(), config.ce_overrides.as_ref()),
            sender,
            reporter,
        })
    }

    /// Forwards events until `cancel` fires or something fails. The session is closed
    /// either way.
    pub async fn start(mut self, cancel: CancellationToken) -> Result<(), AdapterError> {
        let result = self.run(&cancel).await;
        self.session.close();
        result
    }

    async fn run(&mut self, cancel: &CancellationToken) -> Result<(), AdapterError> {
        let root = self.session.root_folder().await?;
        self.session.subscribe(&root, self.checkpoints.current()).await?;
        info!(root = %root.value, "tailing events");

        loop {
            let batch = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                batch = self.session.next_batch() => batch?,
            };
            let batch = batch.ok_or(AdapterError::FeedClosed)?;

            for event in &batch {
                if cancel.is_cancelled() {
                    return Ok(());
                }
                self.deliver(event).await?;
            }
        }
    }

    /// Sends one event and moves the checkpoint past it.
    async fn deliver(&mut self, event: &ProviderEvent) -> Result<(), AdapterError> {
        if let Some(checkpoint) = self.checkpoints.current() {
            if event.key() <= checkpoint.last_event_key {
                debug!(key = event.key(), "skipping delivered event");
                return Ok(());
            }
        }

        let cloud_event = self.transformer
            .transform(event)
            .map_err(|source| AdapterError::Encode { key: event.key(), source })?;
        let result = self.sender.send(&cloud_event).await;

        let code = match &result {
            Ok(code) => Some(*code),
            Err(err) => err.status_code(),
        };
        if let Some(code) = code {
            self.reporter.report_event_count(&ReportArgs {
                namespace: self.namespace.clone(),
                event_source: cloud_event.source().to_string(),
                event_type: cloud_event.event_type().to_string(),
                resource_group: RESOURCE_GROUP.to_string(),
            }, code);
        }

        if let Err(source) = result {
            error!(id = cloud_event.id(), error = %source, "failed to send cloudevent");
            return Err(AdapterError::Delivery {
                id: cloud_event.id().to_string(),
                source,
            });
        }
        self.checkpoints.advance(Checkpoint::of(event.base())).await?;
        Ok(())
    }
}

/// Runs an adapter for `config`, checkpointing to its config map and posting to its sink.
pub async fn run<P: EventSession>(
    config: EnvConfig,
    client: kube::Client,
    session: P,
    cancel: CancellationToken,
) -> Result<(), AdapterError> {
    let kvstore = ConfigMapKvStore::new(client, &config.namespace, config.kvstore_configmap.clone());
    let sender = Arc::new(HttpSender::new(config.sink.clone()));
    Adapter::new(&config, session, kvstore, sender, Arc::new(TracingReporter))
        .await?
        .start(cancel)
        .await
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::adapter::event::{sample, ManagedObjectReference};
    use crate::adapter::kvstore::test::MemoryKvStore;
    use crate::adapter::transform::CloudEvent;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};

    type Batch = Result<Option<Vec<ProviderEvent>>, ProviderError>;

    /// Replays scripted batches, then waits forever.
    #[derive(Default)]
    struct ScriptedSession {
        batches: VecDeque<Batch>,
        subscribed_from: Arc<Mutex<Option<Option<Checkpoint>>>>,
        closed: Arc<AtomicBool>,
    }

    impl ScriptedSession {
        fn new(batches: Vec<Batch>) -> Self {
            ScriptedSession {
                batches: batches.into(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl EventSession for ScriptedSession {
        async fn root_folder(&mut self) -> Result<ManagedObjectReference, ProviderError> {
            Ok(ManagedObjectReference {
                type_: "Folder".into(),
                value: "group-d1".into(),
            })
        }

        async fn subscribe(&mut self, _: &ManagedObjectReference, from: Option<&Checkpoint>) -> Result<(), ProviderError> {
            *self.subscribed_from.lock() = Some(from.cloned());
            Ok(())
        }

        async fn next_batch(&mut self) -> Result<Option<Vec<ProviderEvent>>, ProviderError> {
            match self.batches.pop_front() {
                Some(batch) => batch,
                None => std::future::pending().await,
            }
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<CloudEvent>>,
        reject: Option<&'static str>,
        /// Cancels the token while accepting the event with this id.
        cancel_on: Option<(&'static str, CancellationToken)>,
    }

    #[async_trait]
    impl EventSender for RecordingSender {
        async fn send(&self, event: &CloudEvent) -> Result<u16, DeliveryError> {
            if self.reject == Some(event.id()) {
                return Err(DeliveryError::Rejected { status: 500 });
            }
            if let Some((id, cancel)) = &self.cancel_on {
                if *id == event.id() {
                    cancel.cancel();
                }
            }
            self.sent.lock().push(event.clone());
            Ok(202)
        }
    }

    impl RecordingSender {
        fn ids(&self) -> Vec<String> {
            self.sent.lock().iter().map(|e| e.id().to_string()).collect()
        }
    }

    #[derive(Default)]
    struct CollectingReporter(Mutex<Vec<(ReportArgs, u16)>>);

    impl StatsReporter for CollectingReporter {
        fn report_event_count(&self, args: &ReportArgs, response_code: u16) {
            self.0.lock().push((args.clone(), response_code));
        }
    }

    fn config() -> EnvConfig {
        EnvConfig {
            namespace: "default".into(),
            name: "vcenter".into(),
            sink: "http://event-display.default.svc.cluster.local".parse().unwrap(),
            ce_overrides: None,
            address: "https://vcenter.corp.local/sdk".parse().unwrap(),
            insecure: false,
            secret_path: PathBuf::from(crate::config::DEFAULT_SECRET_PATH),
            kvstore_configmap: "vcenter-configmap".into(),
        }
    }

    fn events(keys: &[i32]) -> Vec<ProviderEvent> {
        keys.iter().map(|key| sample("VmPoweredOnEvent", *key)).collect()
    }

    fn persisted_key(kv: &MemoryKvStore) -> Option<i32> {
        kv.entries.lock()
            .get("vcenter")
            .map(|raw| serde_json::from_str::<Checkpoint>(raw).unwrap().last_event_key)
    }

    async fn adapter(
        session: ScriptedSession,
        kv: MemoryKvStore,
        sender: Arc<RecordingSender>,
        reporter: Arc<CollectingReporter>,
    ) -> Adapter<ScriptedSession, MemoryKvStore> {
        Adapter::new(&config(), session, kv, sender, reporter).await.unwrap()
    }

    #[tokio::test]
    async fn delivers_in_feed_order_and_checkpoints() {
        let kv = MemoryKvStore::default();
        let sender = Arc::new(RecordingSender::default());
        let reporter = Arc::new(CollectingReporter::default());
        let session = ScriptedSession::new(vec![Ok(Some(events(&[1, 2, 3]))), Ok(Some(events(&[4]))), Ok(None)]);
        let closed = Arc::clone(&session.closed);

        let result = adapter(session, kv.clone(), sender.clone(), reporter.clone())
            .await
            .start(CancellationToken::new())
            .await;

        assert!(matches!(result, Err(AdapterError::FeedClosed)));
        assert_eq!(sender.ids(), vec!["1", "2", "3", "4"]);
        assert_eq!(persisted_key(&kv), Some(4));
        assert!(closed.load(Ordering::SeqCst));

        let reports = reporter.0.lock();
        assert_eq!(reports.len(), 4);
        let (args, code) = &reports[0];
        assert_eq!(*code, 202);
        assert_eq!(args, &ReportArgs {
            namespace: "default".into(),
            event_source: "https://vcenter.corp.local/sdk".into(),
            event_type: "com.vmware.vsphere.vmpoweredonevent".into(),
            resource_group: RESOURCE_GROUP.into(),
        });
    }

    #[tokio::test]
    async fn restart_resumes_after_the_checkpoint() {
        let kv = MemoryKvStore::default();
        let checkpoint = Checkpoint::of(sample("VmPoweredOnEvent", 2).base());
        kv.entries.lock().insert("vcenter".into(), serde_json::to_string(&checkpoint).unwrap());

        let sender = Arc::new(RecordingSender::default());
        let session = ScriptedSession::new(vec![Ok(Some(events(&[1, 2, 3]))), Ok(None)]);
        let subscribed_from = Arc::clone(&session.subscribed_from);

        let result = adapter(session, kv.clone(), sender.clone(), Default::default())
            .await
            .start(CancellationToken::new())
            .await;

        assert!(matches!(result, Err(AdapterError::FeedClosed)));
        assert_eq!(*subscribed_from.lock(), Some(Some(checkpoint)));
        assert_eq!(sender.ids(), vec!["3"]);
        assert_eq!(persisted_key(&kv), Some(3));
    }

    #[tokio::test]
    async fn delivery_failure_keeps_the_checkpoint() {
        let kv = MemoryKvStore::default();
        let sender = Arc::new(RecordingSender {
            reject: Some("2"),
            ..Default::default()
        });
        let reporter = Arc::new(CollectingReporter::default());
        let session = ScriptedSession::new(vec![Ok(Some(events(&[1, 2, 3])))]);
        let closed = Arc::clone(&session.closed);

        let result = adapter(session, kv.clone(), sender.clone(), reporter.clone())
            .await
            .start(CancellationToken::new())
            .await;

        match result {
            Err(AdapterError::Delivery { id, source }) => {
                assert_eq!(id, "2");
                assert_eq!(source.status_code(), Some(500));
            }
            other => panic!("expected a delivery error, got {other:?}"),
        }
        assert_eq!(sender.ids(), vec!["1"]);
        assert_eq!(persisted_key(&kv), Some(1));
        let codes: Vec<u16> = reporter.0.lock().iter().map(|(_, code)| *code).collect();
        assert_eq!(codes, vec![202, 500]);
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cancellation_stops_a_waiting_adapter() {
        let session = ScriptedSession::new(vec![Ok(Some(events(&[1])))]);
        let closed = Arc::clone(&session.closed);
        let sender = Arc::new(RecordingSender::default());
        let adapter = adapter(session, MemoryKvStore::default(), sender.clone(), Default::default()).await;

        let cancel = CancellationToken::new();
        let running = tokio::spawn(adapter.start(cancel.clone()));
        while sender.ids().is_empty() {
            tokio::task::yield_now().await;
        }
        cancel.cancel();

        assert!(running.await.unwrap().is_ok());
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cancellation_mid_batch_stops_after_the_current_event() {
        let kv = MemoryKvStore::default();
        let cancel = CancellationToken::new();
        let sender = Arc::new(RecordingSender {
            cancel_on: Some(("1", cancel.clone())),
            ..Default::default()
        });
        let session = ScriptedSession::new(vec![Ok(Some(events(&[1, 2, 3])))]);
        let closed = Arc::clone(&session.closed);

        let result = adapter(session, kv.clone(), sender.clone(), Default::default())
            .await
            .start(cancel)
            .await;

        assert!(result.is_ok());
        assert_eq!(sender.ids(), vec!["1"]);
        assert_eq!(persisted_key(&kv), Some(1));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn provider_errors_are_fatal() {
        let session = ScriptedSession::new(vec![Err(ProviderError::Session("connection reset".into()))]);
        let result = adapter(session, MemoryKvStore::default(), Default::default(), Default::default())
            .await
            .start(CancellationToken::new())
            .await;
        assert!(matches!(result, Err(AdapterError::Provider(ProviderError::Session(_)))));
    }

    #[tokio::test]
    async fn undecodable_checkpoint_fails_startup() {
        let kv = MemoryKvStore::default();
        kv.entries.lock().insert("vcenter".into(), "{".into());
        let result = Adapter::new(
            &config(),
            ScriptedSession::default(),
            kv,
            Arc::new(RecordingSender::default()),
            Arc::new(CollectingReporter::default()),
        ).await;
        assert!(matches!(result, Err(AdapterError::Startup(KvStoreError::Decode { .. }))));
    }
}
