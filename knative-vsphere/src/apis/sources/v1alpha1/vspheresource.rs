use super::VAuthSpec;
use knative::{
    apis::{Defaultable, FieldError, Validatable},
    conditions::{ConditionAccessor, Conditions},
    derive::ConditionType,
    source_types::{SinkManager, SourceConditionType, SourceSpec, SourceStatus},
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// VSphereSource forwards the event stream of a vCenter to a sink.
#[derive(CustomResource, Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[kube(
    kind = "VSphereSource",
    group = "sources.tanzu.vmware.com",
    status = "VSphereSourceStatus",
    version = "v1alpha1",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct VSphereSourceSpec {
    /// Sink and CloudEventOverrides
    #[serde(flatten)]
    pub source_spec: SourceSpec,
    /// Address, credentials and TLS settings of the vCenter
    #[serde(flatten)]
    pub auth: VAuthSpec,
}

#[derive(ConditionType, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema)]
pub enum VSphereSourceCondition {
    Ready,
    /// The sink resolved to a URI.
    #[dependent]
    SinkProvided,
    /// The access objects and both bindings exist in the desired shape.
    #[dependent]
    BindingReady,
    /// The receive adapter deployment exists in the desired shape.
    #[dependent]
    DeploymentReady,
}

impl SourceConditionType for VSphereSourceCondition {
    fn sinkprovided() -> Self {
        VSphereSourceCondition::SinkProvided
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, JsonSchema)]
pub struct VSphereSourceStatus {
    /// inherits [`SourceStatus`], which currently provides:
    /// * observed_generation
    /// * conditions
    /// * sink_uri
    #[serde(flatten)]
    pub source_status: SourceStatus<VSphereSourceCondition>,
}

impl ConditionAccessor<VSphereSourceCondition> for VSphereSourceStatus {
    fn conditions(&mut self) -> &mut Conditions<VSphereSourceCondition> {
        self.source_status.conditions()
    }
}

impl SinkManager<VSphereSourceCondition> for VSphereSourceStatus {
    fn source_status(&mut self) -> &mut SourceStatus<VSphereSourceCondition> {
        &mut self.source_status
    }
}

impl Defaultable for VSphereSource {
    fn set_defaults(&mut self) {
        let namespace = self.metadata.namespace.clone().unwrap_or_default();
        self.spec.source_spec.set_defaults(&namespace);
    }
}

impl Validatable for VSphereSource {
    fn validate(&self) -> Result<(), FieldError> {
        let mut errs = FieldError::default();
        if let Err(err) = self.spec.source_spec.validate() {
            errs = errs.also(err);
        }
        if let Err(err) = self.spec.auth.validate() {
            errs = errs.also(err);
        }
        errs.via_field("spec").into_result()
    }
}
