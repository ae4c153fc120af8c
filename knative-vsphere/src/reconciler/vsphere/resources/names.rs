//! Deterministic names of the dependents of a source.
use crate::apis::sources::v1alpha1::VSphereSource;
use knative::kmeta::child_name;

fn source_name(source: &VSphereSource) -> &str {
    source.metadata.name.as_deref().unwrap_or_default()
}

pub fn deployment(source: &VSphereSource) -> String {
    child_name(source_name(source), "-deployment")
}

pub fn sink_binding(source: &VSphereSource) -> String {
    child_name(source_name(source), "-sinkbinding")
}

pub fn vsphere_binding(source: &VSphereSource) -> String {
    child_name(source_name(source), "-vspherebinding")
}

pub fn config_map(source: &VSphereSource) -> String {
    child_name(source_name(source), "-configmap")
}

pub fn role_binding(source: &VSphereSource) -> String {
    child_name(source_name(source), "-rolebinding")
}

pub fn service_account(source: &VSphereSource) -> String {
    child_name(source_name(source), "-serviceaccount")
}

/// A label value identifying the source, kept within the label length limit.
pub fn source_label(source: &VSphereSource) -> String {
    child_name(source_name(source), "")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reconciler::vsphere::resources::test::source_named;

    fn check(name: &str, f: fn(&VSphereSource) -> String, want: &str) {
        let got = f(&source_named(name));
        assert_eq!(got, want, "name for {name:?}");
        assert!(got.len() <= 63);
    }

    #[test]
    fn deployment_names() {
        check(&"f".repeat(63), deployment, "ffffffffffffffffffff105d7597f637e83cc711605ac3ea4957-deployment");
        check(&"f".repeat(52), deployment, &("f".repeat(52) + "-deployment"));
        check("foo", deployment, "foo-deployment");
    }

    #[test]
    fn sink_binding_names() {
        check(&"u".repeat(50), sink_binding, &("u".repeat(50) + "-sinkbinding"));
        check(&"u".repeat(63), sink_binding, "uuuuuuuuuuuuuuuuuuuca47ad1ce8479df271ec0d23653ce256-sinkbinding");
        check("foo", sink_binding, "foo-sinkbinding");
    }

    #[test]
    fn other_names() {
        check("baz", vsphere_binding, "baz-vspherebinding");
        check("baz", config_map, "baz-configmap");
        check("baz", role_binding, "baz-rolebinding");
        check("baz", service_account, "baz-serviceaccount");
    }

    #[test]
    fn names_are_stable() {
        let long = source_named(&"x".repeat(70));
        assert_eq!(deployment(&long), deployment(&long));
        assert_eq!(source_label(&long).len(), 63);
        assert_eq!(source_label(&source_named("foo")), "foo");
    }
}
