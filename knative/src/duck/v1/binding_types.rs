use crate::apis::FieldError;
use k8s_openapi::{
    api::core::v1::ObjectReference,
    apimachinery::pkg::apis::meta::v1::LabelSelector,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Default, Debug, PartialEq, JsonSchema)]
pub struct BindingSpec {
    // We diverge from knative go for the binding spec.
    // The Binding relies heavily of ducktyping, as described
    // in the docs: https://knative.dev/docs/reference/concepts/duck-typing/#binding
    pub subject: Reference,
}

impl BindingSpec {
    pub fn validate(&self) -> Result<(), FieldError> {
        self.subject.validate().map_err(|err| err.via_field("subject"))
    }
}

// Found in knative.dev/pkg/tracker
/// Reference is modeled after corev1.ObjectReference, but omits fields
/// unsupported by the tracker, and permits us to extend things in
/// divergent ways.
#[derive(Serialize, Deserialize, Clone, Default, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(flatten)]
    pub subject: Subject
}

impl Reference {
    pub fn set_default_namespace(&mut self, namespace: &str) {
        if self.namespace.as_deref().map_or(true, str::is_empty) {
            self.namespace = Some(namespace.to_string());
        }
    }

    pub fn validate(&self) -> Result<(), FieldError> {
        let mut errs = FieldError::default();
        if self.kind.as_deref().map_or(true, str::is_empty) {
            errs = errs.also(FieldError::missing_field(&["kind"]));
        }
        if self.api_version.as_deref().map_or(true, str::is_empty) {
            errs = errs.also(FieldError::missing_field(&["apiVersion"]));
        }
        if let Subject::Name(name) = &self.subject {
            if name.is_empty() {
                errs = errs.also(FieldError::missing_field(&["name"]));
            }
        }
        errs.into_result()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Subject {
    Name(String),
    Selector(LabelSelector)
}

impl Default for Subject {
    fn default() -> Self {
        Subject::Name("".into())
    }
}

impl From<Reference> for ObjectReference {
    fn from(reference: Reference) -> ObjectReference {
        let Reference { api_version, kind, namespace, subject } = reference;
        ObjectReference {
            api_version,
            kind,
            namespace,
            name: match subject {
                Subject::Name(name) => Some(name),
                Subject::Selector(..) => None
            },
            ..Default::default()
        }
    }
}
