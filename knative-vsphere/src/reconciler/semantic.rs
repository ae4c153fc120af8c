//! Semantic comparison of desired and observed objects.
//!
//! The API server and admission webhooks fill in fields the reconciler never sets, so
//! a plain equality check would report a difference on every pass. An observed value
//! satisfies a desired one when everything the reconciler asked for is present.
use serde_json::Value;

/// Whether `observed` contains everything in `desired`.
///
/// * object fields missing from `observed` only match empty desired values
/// * arrays match when the desired elements appear in `observed` in the same order,
///   so injected entries (like binding environment variables) are tolerated
/// * scalars must be equal
pub fn contains(observed: &Value, desired: &Value) -> bool {
    match (observed, desired) {
        (_, Value::Null) => true,
        (Value::Null, desired) => is_empty(desired),
        (Value::Object(observed), Value::Object(desired)) => desired.iter().all(|(field, want)| {
            observed.get(field).map_or_else(|| is_empty(want), |have| contains(have, want))
        }),
        (Value::Array(observed), Value::Array(desired)) => {
            let mut remaining = observed.iter();
            desired.iter().all(|want| remaining.any(|have| contains(have, want)))
        }
        (observed, desired) => observed == desired,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn server_defaults_are_ignored() {
        let desired = json!({"replicas": 1, "template": {"spec": {"containers": [{"name": "adapter"}]}}});
        let observed = json!({
            "replicas": 1,
            "progressDeadlineSeconds": 600,
            "template": {"spec": {
                "containers": [{"name": "adapter", "imagePullPolicy": "IfNotPresent"}],
                "restartPolicy": "Always"
            }}
        });
        assert!(contains(&observed, &desired));
    }

    #[test]
    fn changed_scalars_are_detected() {
        let desired = json!({"template": {"spec": {"containers": [{"image": "adapter:v2"}]}}});
        let observed = json!({"template": {"spec": {"containers": [{"image": "adapter:v1"}]}}});
        assert!(!contains(&observed, &desired));
    }

    #[test]
    fn injected_array_entries_are_tolerated_but_order_matters() {
        let desired = json!([{"name": "NAMESPACE"}, {"name": "NAME"}]);
        let injected = json!([{"name": "NAMESPACE"}, {"name": "K_SINK"}, {"name": "NAME"}]);
        assert!(contains(&injected, &desired));

        let reordered = json!([{"name": "NAME"}, {"name": "NAMESPACE"}]);
        assert!(!contains(&reordered, &desired));

        let missing = json!([{"name": "NAMESPACE"}]);
        assert!(!contains(&missing, &desired));
    }

    #[test]
    fn missing_fields_match_only_empty_values() {
        assert!(contains(&json!({}), &json!({"labels": {}})));
        assert!(contains(&json!({"labels": null}), &json!({"labels": []})));
        assert!(!contains(&json!({}), &json!({"labels": {"app": "adapter"}})));
    }
}
