use super::VAuthSpec;
use knative::{
    apis::{Defaultable, FieldError, Validatable},
    binding_types::BindingSpec,
    conditions::{ConditionAccessor, Conditions},
    derive::ConditionType,
    status_types::Status,
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// VSphereBinding projects vSphere credentials into the workload named by its subject,
/// exposing them through the `GOVC_*` environment and a mounted secret.
#[derive(CustomResource, Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[kube(
    kind = "VSphereBinding",
    group = "sources.tanzu.vmware.com",
    status = "VSphereBindingStatus",
    version = "v1alpha1",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct VSphereBindingSpec {
    /// Subject
    #[serde(flatten)]
    pub binding_spec: BindingSpec,
    #[serde(flatten)]
    pub auth: VAuthSpec,
}

#[derive(ConditionType, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema)]
pub enum VSphereBindingCondition {
    Ready,
    /// The subject has been augmented with the credentials.
    #[dependent]
    BindingAvailable,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, JsonSchema)]
pub struct VSphereBindingStatus {
    #[serde(flatten)]
    pub status: Status<VSphereBindingCondition>,
}

impl ConditionAccessor<VSphereBindingCondition> for VSphereBindingStatus {
    fn conditions(&mut self) -> &mut Conditions<VSphereBindingCondition> {
        self.status.conditions()
    }
}

impl Defaultable for VSphereBinding {
    fn set_defaults(&mut self) {
        let namespace = self.metadata.namespace.clone().unwrap_or_default();
        self.spec.binding_spec.subject.set_default_namespace(&namespace);
    }
}

impl Validatable for VSphereBinding {
    fn validate(&self) -> Result<(), FieldError> {
        let mut errs = FieldError::default();
        if let Err(err) = self.spec.binding_spec.validate() {
            errs = errs.also(err);
        }
        if let Err(err) = self.spec.auth.validate() {
            errs = errs.also(err);
        }
        errs.via_field("spec").into_result()
    }
}
