//! Pure builders for the dependents of a `VSphereSource`.
//!
//! Every builder is a deterministic function of the source (and the adapter image),
//! which keeps the comparison against observed objects free of spurious differences.
mod deployment;
pub mod names;
mod rbac;
mod sinkbinding;
mod vspherebinding;

pub use deployment::make_deployment;
pub use rbac::{make_access_objects, AccessObjects, ADAPTER_CLUSTER_ROLE};
pub use sinkbinding::make_sink_binding;
pub use vspherebinding::make_vsphere_binding;

use crate::apis::sources::v1alpha1::VSphereSource;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use knative::binding_types::{Reference, Subject};
use kube::Resource;
use std::collections::BTreeMap;

/// Label carrying [`names::source_label`] on the adapter pods.
pub const SOURCE_LABEL: &str = "sources.tanzu.vmware.com/vspheresource";

fn namespace(source: &VSphereSource) -> String {
    source.metadata.namespace.clone().unwrap_or_default()
}

fn owner_references(source: &VSphereSource) -> Option<Vec<OwnerReference>> {
    source.controller_owner_ref(&()).map(|owner| vec![owner])
}

fn labels(source: &VSphereSource) -> BTreeMap<String, String> {
    BTreeMap::from([(SOURCE_LABEL.to_string(), names::source_label(source))])
}

/// Metadata shared by every dependent: name, namespace, labels and the controller reference.
fn child_meta(source: &VSphereSource, name: String) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        namespace: Some(namespace(source)),
        labels: Some(labels(source)),
        owner_references: owner_references(source),
        ..Default::default()
    }
}

/// Both bindings target the adapter deployment by name.
fn adapter_subject(source: &VSphereSource) -> Reference {
    Reference {
        kind: Some(Deployment::kind(&()).into_owned()),
        api_version: Some(Deployment::api_version(&()).into_owned()),
        namespace: Some(namespace(source)),
        subject: Subject::Name(names::deployment(source)),
    }
}

#[cfg(test)]
pub(crate) mod test {
    use crate::apis::sources::v1alpha1::{VAuthSpec, VSphereSource, VSphereSourceSpec};
    use k8s_openapi::api::core::v1::LocalObjectReference;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use knative::source_types::SourceSpec;

    pub(crate) fn source_named(name: &str) -> VSphereSource {
        VSphereSource {
            metadata: ObjectMeta {
                name: Some(name.into()),
                namespace: Some("default".into()),
                uid: Some("7d9f0c56-6c1e-4c2b-9f0e-2d1f3f6f0a11".into()),
                generation: Some(1),
                ..Default::default()
            },
            spec: VSphereSourceSpec {
                source_spec: SourceSpec {
                    sink: Some(url::Url::parse("http://event-display.default.svc.cluster.local").unwrap().into()),
                    ce_overrides: None,
                },
                auth: VAuthSpec {
                    address: Some("https://vcenter.corp.local".parse().unwrap()),
                    skip_tls_verify: true,
                    secret_ref: LocalObjectReference {
                        name: Some("vsphere-credentials".into()),
                    },
                },
            },
            status: None,
        }
    }

    #[test]
    fn children_are_controlled_by_the_source() {
        let source = source_named("vcenter");
        let meta = super::child_meta(&source, "vcenter-deployment".into());
        let owner = meta.owner_references.unwrap().pop().unwrap();
        assert_eq!(owner.kind, "VSphereSource");
        assert_eq!(owner.api_version, "sources.tanzu.vmware.com/v1alpha1");
        assert_eq!(owner.name, "vcenter");
        assert_eq!(owner.controller, Some(true));
        assert_eq!(meta.namespace.as_deref(), Some("default"));
    }
}
