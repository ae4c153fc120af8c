use super::{adapter_subject, child_meta, names};
use crate::apis::sources::v1alpha1::VSphereSource;
use knative::binding_types::BindingSpec;
use knative_eventing::apis::sources::v1::{SinkBinding, SinkBindingSpec};

/// Injects the resolved sink as `K_SINK` into the adapter deployment.
pub fn make_sink_binding(source: &VSphereSource) -> SinkBinding {
    SinkBinding {
        metadata: child_meta(source, names::sink_binding(source)),
        spec: SinkBindingSpec {
            source_spec: source.spec.source_spec.clone(),
            binding_spec: BindingSpec {
                subject: adapter_subject(source),
            },
        },
        status: None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reconciler::vsphere::resources::test::source_named;
    use std::collections::BTreeMap;

    #[test]
    fn carries_sink_and_overrides() {
        let mut source = source_named("vcenter");
        source.spec.source_spec.ce_overrides = Some(knative::source_types::CloudEventOverrides {
            extensions: Some(BTreeMap::from([("team".to_string(), "infra".to_string())])),
        });
        let binding = make_sink_binding(&source);
        assert_eq!(binding.metadata.name.as_deref(), Some("vcenter-sinkbinding"));
        assert_eq!(binding.spec.source_spec, source.spec.source_spec);
        assert_eq!(
            binding.spec.binding_spec.subject.subject,
            knative::binding_types::Subject::Name("vcenter-deployment".into())
        );
        assert!(binding.spec.validate().is_ok());
    }
}
