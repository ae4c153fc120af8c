use crate::apis::FieldError;
use crate::error::DiscoveryError;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::core::GroupVersionKind;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// KReference contains enough information to refer to another object.
/// It's a trimmed down version of corev1.ObjectReference.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KReference {
    /// Kind of the referent.
    /// More info: https://git.k8s.io/community/contributors/devel/sig-architecture/api-conventions.md#types-kinds
    pub kind: String,
    /// Namespace of the referent.
    /// More info: https://kubernetes.io/docs/concepts/overview/working-with-objects/namespaces/
    /// This is optional field, it gets defaulted to the object holding it if left out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Name of the referent.
    /// More info: https://kubernetes.io/docs/concepts/overview/working-with-objects/names/#names
    pub name: String,
    /// API version of the referent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Group of the API, without the version of the group. This can be used as an alternative to
    /// the APIVersion when the version is carried separately.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl From<KReference> for ObjectReference {
    fn from(reference: KReference) -> ObjectReference {
        ObjectReference {
            name: Some(reference.name),
            namespace: reference.namespace,
            api_version: reference.api_version,
            kind: Some(reference.kind),
            ..Default::default()
        }
    }
}

impl KReference {
    /// Fills in the namespace of the object holding this reference. An explicit namespace is
    /// left alone.
    pub fn set_default_namespace(&mut self, namespace: &str) {
        if self.namespace.as_deref().map_or(true, str::is_empty) {
            self.namespace = Some(namespace.to_string());
        }
    }

    pub fn validate(&self) -> Result<(), FieldError> {
        let mut errs = FieldError::default();
        if self.kind.is_empty() {
            errs = errs.also(FieldError::missing_field(&["kind"]));
        }
        if self.name.is_empty() {
            errs = errs.also(FieldError::missing_field(&["name"]));
        }
        if self.api_version.as_deref().map_or(true, str::is_empty) {
            errs = errs.also(FieldError::missing_field(&["apiVersion"]));
        }
        errs.into_result()
    }

    /// Splits `apiVersion` (and `group`, when the version is bare) into a [`GroupVersionKind`].
    pub fn group_version_kind(&self) -> Result<GroupVersionKind, DiscoveryError> {
        let api_version = self.api_version
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| DiscoveryError::MissingApiVersion(format!("{} {}", self.kind, self.name)))?;

        let (group, version) = match (api_version.split_once('/'), self.group.as_deref()) {
            (Some((group, version)), _) => (group, version),
            (None, Some(group)) => (group, api_version),
            (None, None) => ("", api_version),
        };

        if version.is_empty() || version.contains('/') {
            return Err(DiscoveryError::InvalidApiVersion(api_version.to_string()));
        }

        Ok(GroupVersionKind::gvk(group, version, &self.kind))
    }
}
