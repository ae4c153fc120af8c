use kube::CustomResource;
use knative::{
    apis::FieldError,
    source_types::{SourceSpec, SourceStatus, SourceCondition},
    binding_types::BindingSpec,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// SinkBinding describes a Binding that is also a Source.
/// The `sink` is resolved to a URL and then projected into
/// the `subject` by augmenting the definition of the
/// referenced containers to have a `K_SINK` environment
/// variable holding the endpoint to which to send cloud events.
#[derive(CustomResource, Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[kube(
    kind = "SinkBinding",
    group = "sources.knative.dev",
    status = "SinkBindingStatus",
    version = "v1",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct SinkBindingSpec {
    /// Sink and CloudEventOverrides
    #[serde(flatten)]
    pub source_spec: SourceSpec,
    /// Subject
    #[serde(flatten)]
    pub binding_spec: BindingSpec,
}

impl SinkBindingSpec {
    /// Defaults sink and subject namespaces to the namespace of the binding.
    pub fn set_defaults(&mut self, namespace: &str) {
        self.source_spec.set_defaults(namespace);
        self.binding_spec.subject.set_default_namespace(namespace);
    }

    pub fn validate(&self) -> Result<(), FieldError> {
        let errs = match self.source_spec.validate() {
            Ok(()) => FieldError::default(),
            Err(err) => err,
        };
        match self.binding_spec.validate() {
            Ok(()) => errs,
            Err(err) => errs.also(err),
        }
        .into_result()
    }
}

/// Communicates the observed state of the [`SinkBinding`] (from the controller).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, JsonSchema)]
pub struct SinkBindingStatus {
    /// inherits [`SourceStatus`], which currently provides:
    /// * observed_generation
    /// * conditions
    /// * sink_uri
    #[serde(flatten)]
    pub source_status: SourceStatus<SourceCondition>,
}
