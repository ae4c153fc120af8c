use super::{adapter_subject, child_meta, names};
use crate::apis::sources::v1alpha1::{VSphereBinding, VSphereBindingSpec, VSphereSource};
use knative::binding_types::BindingSpec;

/// Projects the source's vSphere credentials into the adapter deployment.
pub fn make_vsphere_binding(source: &VSphereSource) -> VSphereBinding {
    VSphereBinding {
        metadata: child_meta(source, names::vsphere_binding(source)),
        spec: VSphereBindingSpec {
            binding_spec: BindingSpec {
                subject: adapter_subject(source),
            },
            auth: source.spec.auth.clone(),
        },
        status: None,
    }
}
