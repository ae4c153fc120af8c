//! Runs the [`Reconciler`] under the `kube` runtime controller.
//!
//! The runtime reconciles a source at most once at a time and coalesces the changes
//! that arrive while it runs. Changes to dependents reach their source through the
//! [`OwnerIndex`].
use super::{
    index::OwnerIndex,
    store::ResourceStore,
    vsphere::{resources::SOURCE_LABEL, Reconciler},
    ObjectKey, ReconcileError, ReconcileEvent, Recorder,
};
use crate::apis::sources::v1alpha1::{VSphereBinding, VSphereSource};
use futures::StreamExt;
use k8s_openapi::api::{apps::v1::Deployment, core::v1::ServiceAccount, rbac::v1::RoleBinding};
use knative_eventing::apis::sources::v1::SinkBinding;
use kube::{
    api::{Api, ListParams},
    runtime::{
        controller::{Action, Context},
        reflector::ObjectRef,
        Controller as Runtime,
    },
    Client, Resource,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// How long a reconciled source waits before it is reconciled again without a change.
    pub resync_period: Duration,
    /// Delay before retrying a failed source, doubled with every consecutive failure.
    pub retry_base: Duration,
    pub retry_max: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        ControllerOptions {
            resync_period: Duration::from_secs(10 * 60 * 60),
            retry_base: Duration::from_millis(5),
            retry_max: Duration::from_secs(1000),
        }
    }
}

/// Per-source retry delays, growing exponentially with consecutive failures.
#[derive(Debug)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    failures: Mutex<HashMap<ObjectKey, u32>>,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Backoff {
            base,
            max,
            failures: Mutex::default(),
        }
    }

    /// Counts a failure of `key` and returns how long to wait before the next attempt.
    pub fn next(&self, key: &ObjectKey) -> Duration {
        let mut failures = self.failures.lock();
        let count = failures.entry(key.clone()).or_insert(0);
        let delay = self.base.saturating_mul(2u32.saturating_pow(*count)).min(self.max);
        *count = count.saturating_add(1);
        delay
    }

    pub fn forget(&self, key: &ObjectKey) {
        self.failures.lock().remove(key);
    }

    pub fn failures(&self, key: &ObjectKey) -> u32 {
        self.failures.lock().get(key).copied().unwrap_or(0)
    }
}

/// A failed reconcile and when to retry it. Without a delay the source waits for its next change.
#[derive(Error, Debug)]
#[error("failed to reconcile {key}: {source}")]
pub struct ReconcileFailure {
    pub key: ObjectKey,
    #[source]
    pub source: ReconcileError,
    pub retry_after: Option<Duration>,
}

pub struct Controller<S> {
    reconciler: Reconciler<S>,
    recorder: Arc<dyn Recorder>,
    index: Arc<OwnerIndex>,
    backoff: Backoff,
    options: ControllerOptions,
}

impl<S: ResourceStore + 'static> Controller<S> {
    pub fn new(reconciler: Reconciler<S>, recorder: Arc<dyn Recorder>, options: ControllerOptions) -> Self {
        Controller {
            reconciler,
            recorder,
            index: Arc::default(),
            backoff: Backoff::new(options.retry_base, options.retry_max),
            options,
        }
    }

    pub fn index(&self) -> &Arc<OwnerIndex> {
        &self.index
    }

    /// Reconciles one source and records the outcome.
    ///
    /// Transient errors come back with a retry delay; permanent ones wait for a spec edit.
    pub async fn process(&self, key: &ObjectKey) -> Result<(), ReconcileFailure> {
        match self.reconciler.reconcile(key).await {
            Ok(event) => {
                self.backoff.forget(key);
                if let Some(event) = event {
                    self.recorder.record(key, &event);
                }
                Ok(())
            }
            Err(err) => {
                self.recorder.record(key, &ReconcileEvent::warning("InternalError", err.to_string()));
                let retry_after = if err.is_permanent() {
                    self.backoff.forget(key);
                    None
                } else {
                    let delay = self.backoff.next(key);
                    debug!(%key, failures = self.backoff.failures(key), ?delay, "retrying after error");
                    Some(delay)
                };
                Err(ReconcileFailure {
                    key: key.clone(),
                    source: err,
                    retry_after,
                })
            }
        }
    }

    /// Watches sources and their dependents, reconciling until `cancel` fires.
    ///
    /// Reconciles already running when `cancel` fires are allowed to finish.
    pub async fn run(self, client: Client, cancel: CancellationToken) {
        let index = Arc::clone(&self.index);
        let dependents = ListParams::default().labels(SOURCE_LABEL);

        info!("starting controller");
        Runtime::new(Api::<VSphereSource>::all(client.clone()), ListParams::default())
            .watches(Api::<ServiceAccount>::all(client.clone()), dependents.clone(), router::<ServiceAccount>(&index))
            .watches(Api::<RoleBinding>::all(client.clone()), dependents.clone(), router::<RoleBinding>(&index))
            .watches(Api::<VSphereBinding>::all(client.clone()), dependents.clone(), router::<VSphereBinding>(&index))
            .watches(Api::<SinkBinding>::all(client.clone()), dependents.clone(), router::<SinkBinding>(&index))
            .watches(Api::<Deployment>::all(client), dependents, router::<Deployment>(&index))
            .graceful_shutdown_on(cancel.cancelled_owned())
            .run(reconcile::<S>, error_policy::<S>, Context::new(self))
            .for_each(|result| async move {
                match result {
                    Ok((source, _)) => debug!(%source, "reconciled"),
                    Err(err) => warn!(error = %err, "reconcile failed"),
                }
            })
            .await;
        info!("controller stopped");
    }
}

/// Maps a dependent to the source controlling it.
fn router<K: Resource<DynamicType = ()> + 'static>(
    index: &Arc<OwnerIndex>,
) -> impl Fn(K) -> Option<ObjectRef<VSphereSource>> + Send + Sync + 'static {
    let index = Arc::clone(index);
    move |object| {
        let owner = index.route(&object)?;
        Some(ObjectRef::new(&owner.name).within(&owner.namespace))
    }
}

async fn reconcile<S: ResourceStore + 'static>(
    source: Arc<VSphereSource>,
    ctx: Context<Controller<S>>,
) -> Result<Action, ReconcileFailure> {
    let controller = ctx.get_ref();
    match ObjectKey::from_resource(source.as_ref()) {
        Some(key) => {
            controller.process(&key).await?;
            Ok(Action::requeue(controller.options.resync_period))
        }
        None => Ok(Action::await_change()),
    }
}

fn error_policy<S>(failure: &ReconcileFailure, _: Context<Controller<S>>) -> Action {
    failure.retry_after.map_or_else(Action::await_change, Action::requeue)
}
