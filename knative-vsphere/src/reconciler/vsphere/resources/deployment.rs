use super::{child_meta, labels, names, namespace};
use crate::apis::sources::v1alpha1::VSphereSource;
use k8s_openapi::{
    api::{
        apps::v1::{Deployment, DeploymentSpec},
        core::v1::{Container, EnvVar, EnvVarSource, ObjectFieldSelector, PodSpec, PodTemplateSpec},
    },
    apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta},
};

/// Metrics domain reported by the receive adapter.
pub const METRICS_DOMAIN: &str = "knative.dev/eventing";

fn env(name: &str, value: String) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value),
        value_from: None,
    }
}

/// The receive adapter. `K_SINK` is injected by the sink binding and the
/// `GOVC_*` settings by the vSphere binding, both targeting this deployment.
pub fn make_deployment(source: &VSphereSource, image: &str) -> Deployment {
    let labels = labels(source);

    Deployment {
        metadata: child_meta(source, names::deployment(source)),
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    service_account_name: Some(names::service_account(source)),
                    containers: vec![Container {
                        name: "adapter".into(),
                        image: Some(image.to_string()),
                        env: Some(vec![
                            EnvVar {
                                name: "NAMESPACE".into(),
                                value: None,
                                value_from: Some(EnvVarSource {
                                    field_ref: Some(ObjectFieldSelector {
                                        api_version: None,
                                        field_path: "metadata.namespace".into(),
                                    }),
                                    ..Default::default()
                                }),
                            },
                            env("NAME", source.metadata.name.clone().unwrap_or_default()),
                            env("VSPHERE_KVSTORE_CONFIGMAP", names::config_map(source)),
                            env("METRICS_DOMAIN", METRICS_DOMAIN.into()),
                        ]),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    }
}
