use k8s_openapi::api::core::v1::LocalObjectReference;
use knative::apis::FieldError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// How to reach and authenticate against a vCenter.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VAuthSpec {
    /// Address is the URL of the vSphere API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Url>,
    /// SkipTLSVerify maps to the --insecure flag of govc.
    #[serde(default, rename = "skipTLSVerify")]
    pub skip_tls_verify: bool,
    /// SecretRef is a reference to a Kubernetes secret of type `kubernetes.io/basic-auth`
    /// holding the `username` and `password` for the vSphere API.
    #[serde(default)]
    pub secret_ref: LocalObjectReference,
}

impl VAuthSpec {
    pub fn validate(&self) -> Result<(), FieldError> {
        let mut errs = FieldError::default();
        if self.address.as_ref().and_then(Url::host_str).map_or(true, str::is_empty) {
            errs = errs.also(FieldError::missing_field(&["address.host"]));
        }
        if self.secret_ref.name.as_deref().map_or(true, str::is_empty) {
            errs = errs.also(FieldError::missing_field(&["secretRef.name"]));
        }
        errs.into_result()
    }
}

#[cfg(test)]
pub(crate) fn valid_auth() -> VAuthSpec {
    VAuthSpec {
        address: Some("https://vcenter.corp.local".parse().unwrap()),
        skip_tls_verify: true,
        secret_ref: LocalObjectReference {
            name: Some("vsphere-credentials".into()),
        },
    }
}
