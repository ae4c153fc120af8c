use super::{child_meta, names, namespace};
use crate::apis::sources::v1alpha1::VSphereSource;
use k8s_openapi::api::{
    core::v1::ServiceAccount,
    rbac::v1::{RoleBinding, RoleRef, Subject},
};

/// Grants the adapter access to its checkpoint config map.
pub const ADAPTER_CLUSTER_ROLE: &str = "vsphere-receive-adapter-cm";

/// The identity the adapter runs as, and its permissions.
#[derive(Debug, Clone)]
pub struct AccessObjects {
    pub service_account: ServiceAccount,
    pub role_binding: RoleBinding,
}

pub fn make_access_objects(source: &VSphereSource) -> AccessObjects {
    let service_account_name = names::service_account(source);

    AccessObjects {
        service_account: ServiceAccount {
            metadata: child_meta(source, service_account_name.clone()),
            ..Default::default()
        },
        role_binding: RoleBinding {
            metadata: child_meta(source, names::role_binding(source)),
            role_ref: RoleRef {
                api_group: "rbac.authorization.k8s.io".into(),
                kind: "ClusterRole".into(),
                name: ADAPTER_CLUSTER_ROLE.into(),
            },
            subjects: Some(vec![Subject {
                api_group: None,
                kind: "ServiceAccount".into(),
                name: service_account_name,
                namespace: Some(namespace(source)),
            }]),
        },
    }
}
