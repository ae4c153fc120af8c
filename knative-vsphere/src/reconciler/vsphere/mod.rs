//! Reconciles a [`VSphereSource`] into the receive adapter and the objects it relies on.
//!
//! Dependents are reconciled in structural order: the service account and role binding
//! the adapter runs with, the two bindings targeting the adapter, then the adapter
//! deployment itself. Readiness reflects that every dependent exists in its desired
//! shape, not that the adapter is running.
pub mod resources;

use super::{
    semantic,
    store::{Object, ResourceStore, StoreError},
    ObjectKey, ReconcileError, ReconcileEvent, Recorder,
};
use crate::apis::sources::v1alpha1::{
    VSphereBinding, VSphereSource, VSphereSourceCondition, VSphereSourceConditionManager,
    VSphereSourceStatus,
};
use crate::config::ReconcilerConfig;
use k8s_openapi::api::{apps::v1::Deployment, core::v1::ServiceAccount, rbac::v1::RoleBinding};
use knative::{
    addressable_type::AddressableResolver,
    apis::{Defaultable, Validatable},
    conditions::ConditionAccessor,
    source_types::SinkManager,
};
use knative_eventing::apis::sources::v1::SinkBinding;
use kube::Resource;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Reason of the `Ready` condition when the spec does not validate.
pub const REASON_INVALID_SPEC: &str = "InvalidSpec";

/// Annotation holding the owned portion of a dependent as last written by the reconciler.
pub const LAST_APPLIED_ANNOTATION: &str = "sources.tanzu.vmware.com/last-applied";

/// A dependent object and the portion of it the reconciler owns.
///
/// Only the owned portion is compared against the desired object and overwritten;
/// everything else (annotations, defaulted status, injected fields) is left alone.
pub trait Dependent: Object {
    fn owned(&self) -> Result<Value, serde_json::Error>;
    fn adopt(&mut self, desired: &Self);
}

impl Dependent for ServiceAccount {
    fn owned(&self) -> Result<Value, serde_json::Error> {
        Ok(Value::Null)
    }

    fn adopt(&mut self, _: &Self) {}
}

impl Dependent for RoleBinding {
    fn owned(&self) -> Result<Value, serde_json::Error> {
        let mut owned = Map::new();
        owned.insert("roleRef".into(), serde_json::to_value(&self.role_ref)?);
        owned.insert("subjects".into(), serde_json::to_value(&self.subjects)?);
        Ok(Value::Object(owned))
    }

    fn adopt(&mut self, desired: &Self) {
        self.role_ref = desired.role_ref.clone();
        self.subjects = desired.subjects.clone();
    }
}

impl Dependent for VSphereBinding {
    fn owned(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(&self.spec)
    }

    fn adopt(&mut self, desired: &Self) {
        self.spec = desired.spec.clone();
    }
}

impl Dependent for SinkBinding {
    fn owned(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(&self.spec)
    }

    fn adopt(&mut self, desired: &Self) {
        self.spec = desired.spec.clone();
    }
}

impl Dependent for Deployment {
    fn owned(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(&self.spec)
    }

    fn adopt(&mut self, desired: &Self) {
        self.spec = desired.spec.clone();
    }
}

fn last_applied<K: Resource>(object: &K) -> Option<Value> {
    let raw = object.meta().annotations.as_ref()?.get(LAST_APPLIED_ANNOTATION)?;
    serde_json::from_str(raw).ok()
}

fn record_applied<K: Resource>(object: &mut K, owned: &Value) -> Result<(), serde_json::Error> {
    let raw = serde_json::to_string(owned)?;
    object.meta_mut()
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(LAST_APPLIED_ANNOTATION.to_string(), raw);
    Ok(())
}

/// The observed dependent was last written from `wanted` and still contains it.
///
/// Recording what was written catches fields dropped from the desired state, while the
/// containment check tolerates fields the API server or webhooks fill in.
fn is_current<D: Dependent>(observed: &D, wanted: &Value) -> Result<bool, serde_json::Error> {
    if last_applied(observed).as_ref() != Some(wanted) {
        return Ok(false);
    }
    Ok(semantic::contains(&observed.owned()?, wanted))
}

fn is_controlled_by<K: Resource>(object: &K, source: &VSphereSource) -> bool {
    let uid = source.metadata.uid.as_deref();
    object.meta().owner_references
        .iter()
        .flatten()
        .any(|owner| owner.controller == Some(true) && Some(owner.uid.as_str()) == uid)
}

/// Dependents that already exist but are controlled by someone else stay untouched and
/// fail the condition; everything else leaves it undetermined until the next attempt.
fn mark_failed(status: &mut VSphereSourceStatus, condition: VSphereSourceCondition, reason: &str, err: &ReconcileError) {
    let message = Some(err.to_string());
    match err {
        ReconcileError::NotOwned { .. } => status.manager().mark_false(condition, reason, message),
        _ => status.manager().mark_unknown(condition, reason, message),
    }
}

pub struct Reconciler<S> {
    store: Arc<S>,
    resolver: Arc<dyn AddressableResolver>,
    recorder: Arc<dyn Recorder>,
    config: ReconcilerConfig,
}

impl<S: ResourceStore> Reconciler<S> {
    pub fn new(
        store: Arc<S>,
        resolver: Arc<dyn AddressableResolver>,
        recorder: Arc<dyn Recorder>,
        config: ReconcilerConfig,
    ) -> Self {
        Reconciler { store, resolver, recorder, config }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Drives the source named by `key` toward its desired state.
    ///
    /// Returns `Ok(None)` when the source no longer exists or is being deleted. The status
    /// is written back whenever it changed, including when reconciliation failed part way.
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<Option<ReconcileEvent>, ReconcileError> {
        let original = match self.store.get::<VSphereSource>(&key.namespace, &key.name).await? {
            Some(source) => source,
            None => {
                debug!(%key, "source no longer exists");
                return Ok(None);
            }
        };
        if original.metadata.deletion_timestamp.is_some() {
            // the garbage collector is removing the dependents
            debug!(%key, "source is being deleted");
            return Ok(None);
        }

        let mut source = original.clone();
        source.set_defaults();
        let mut status = source.status.take().unwrap_or_default();
        status.initialize_conditions();

        let result = self.reconcile_kind(key, &source, &mut status).await;

        if original.status.as_ref() != Some(&status) {
            let mut updated = original;
            updated.status = Some(status);
            if let Err(err) = self.store.update_status(&updated).await {
                match &result {
                    Ok(()) => return Err(err.into()),
                    Err(reconcile_err) => {
                        warn!(%key, error = %err, "failed to persist status of failed reconcile: {reconcile_err}")
                    }
                }
            }
        }

        result.map(|()| {
            Some(ReconcileEvent::normal(
                "VSphereSourceReconciled",
                format!("VSphereSource reconciled: \"{key}\""),
            ))
        })
    }

    async fn reconcile_kind(
        &self,
        key: &ObjectKey,
        source: &VSphereSource,
        status: &mut VSphereSourceStatus,
    ) -> Result<(), ReconcileError> {
        if let Err(err) = source.validate() {
            status.mark_false(REASON_INVALID_SPEC, Some(err.to_string()));
            return Err(err.into());
        }

        let sink = source.spec.source_spec.sink.clone().unwrap_or_default();
        match sink.resolve_uri(self.resolver.as_ref()).await {
            Ok(uri) => status.mark_sink(uri),
            Err(err) => {
                status.mark_sink_unknown("SinkNotFound", Some(format!("couldn't resolve sink: {err}")));
                return Err(ReconcileError::Sink(err));
            }
        }

        if let Err(err) = self.reconcile_bindings(key, source).await {
            mark_failed(status, VSphereSourceCondition::BindingReady, "BindingReconcileFailed", &err);
            return Err(err);
        }
        status.mark_bindingready();

        let deployment = resources::make_deployment(source, &self.config.adapter_image);
        if let Err(err) = self.reconcile_dependent(key, source, deployment).await {
            mark_failed(status, VSphereSourceCondition::DeploymentReady, "DeploymentReconcileFailed", &err);
            return Err(err);
        }
        status.mark_deploymentready();

        status.source_status.status.observed_generation = source.metadata.generation;
        Ok(())
    }

    async fn reconcile_bindings(&self, key: &ObjectKey, source: &VSphereSource) -> Result<(), ReconcileError> {
        let access = resources::make_access_objects(source);
        self.reconcile_dependent(key, source, access.service_account).await?;
        self.reconcile_dependent(key, source, access.role_binding).await?;
        self.reconcile_dependent(key, source, resources::make_vsphere_binding(source)).await?;
        self.reconcile_dependent(key, source, resources::make_sink_binding(source)).await
    }

    /// Creates `desired`, or brings the owned portion of the existing object in line with it.
    async fn reconcile_dependent<D: Dependent>(
        &self,
        key: &ObjectKey,
        source: &VSphereSource,
        mut desired: D,
    ) -> Result<(), ReconcileError> {
        let kind = D::kind(&());
        let meta = desired.meta();
        let name = meta.name.clone().unwrap_or_default();
        let namespace = meta.namespace.clone().unwrap_or_default();
        let wanted = desired.owned().map_err(StoreError::from)?;

        let mut observed = match self.store.get::<D>(&namespace, &name).await? {
            Some(observed) => observed,
            None => {
                record_applied(&mut desired, &wanted).map_err(StoreError::from)?;
                self.store.create(&desired).await?;
                self.recorder.record(key, &ReconcileEvent::normal("Created", format!("created {kind} {name:?}")));
                return Ok(());
            }
        };
        if !is_controlled_by(&observed, source) {
            return Err(ReconcileError::NotOwned { kind: kind.to_string(), name });
        }
        if is_current(&observed, &wanted).map_err(StoreError::from)? {
            debug!(%key, %kind, %name, "dependent is up to date");
            return Ok(());
        }

        observed.adopt(&desired);
        record_applied(&mut observed, &wanted).map_err(StoreError::from)?;
        self.store.update(&observed).await?;
        self.recorder.record(key, &ReconcileEvent::normal("Updated", format!("updated {kind} {name:?}")));
        Ok(())
    }
}
