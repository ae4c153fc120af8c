use std::collections::BTreeMap;
use std::fmt;

/// A collection of validation problems, each naming the field paths it applies to.
///
/// Problems sharing a message are merged when displayed, so
/// `missing_field(&["a"]).also(missing_field(&["b"]))` renders as `missing field(s): a, b`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldError {
    violations: Vec<Violation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Violation {
    message: String,
    paths: Vec<String>,
}

impl FieldError {
    pub fn new(message: impl Into<String>, paths: &[&str]) -> Self {
        FieldError {
            violations: vec![Violation {
                message: message.into(),
                paths: paths.iter().map(|p| p.to_string()).collect(),
            }],
        }
    }

    pub fn missing_field(paths: &[&str]) -> Self {
        Self::new("missing field(s)", paths)
    }

    pub fn generic(message: impl Into<String>, paths: &[&str]) -> Self {
        Self::new(message, paths)
    }

    pub fn invalid_value(value: impl fmt::Display, path: &str) -> Self {
        Self::new(format!("invalid value: {value}"), &[path])
    }

    pub fn multiple_one_of(paths: &[&str]) -> Self {
        Self::new("expected exactly one, got both", paths)
    }

    /// Prefixes every path with `field`, as when a nested struct's errors surface on its parent.
    pub fn via_field(mut self, field: &str) -> Self {
        for violation in &mut self.violations {
            for path in &mut violation.paths {
                *path = if path.is_empty() {
                    field.to_string()
                } else if path.starts_with('[') {
                    format!("{field}{path}")
                } else {
                    format!("{field}.{path}")
                };
            }
        }
        self
    }

    pub fn also(mut self, other: FieldError) -> Self {
        self.violations.extend(other.violations);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn into_result(self) -> Result<(), FieldError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Every path named by this error.
    pub fn paths(&self) -> Vec<&str> {
        self.violations
            .iter()
            .flat_map(|v| v.paths.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut merged: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for violation in &self.violations {
            merged
                .entry(violation.message.as_str())
                .or_default()
                .extend(violation.paths.iter().map(String::as_str));
        }

        let lines = merged.into_iter().map(|(message, mut paths)| {
            paths.sort_unstable();
            paths.dedup();
            format!("{message}: {}", paths.join(", "))
        });

        f.write_str(&lines.collect::<Vec<_>>().join("\n"))
    }
}

impl std::error::Error for FieldError {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn merges_paths_with_the_same_message() {
        let err = FieldError::missing_field(&["secretRef.name"])
            .also(FieldError::missing_field(&["address.host"]))
            .via_field("spec");
        assert_eq!(err.to_string(), "missing field(s): spec.address.host, spec.secretRef.name");
    }

    #[test]
    fn distinct_messages_render_on_separate_lines() {
        let err = FieldError::generic("expected at least one, got none", &["sink.ref", "sink.uri"])
            .also(FieldError::missing_field(&["address.host"]));
        assert_eq!(
            err.to_string(),
            "expected at least one, got none: sink.ref, sink.uri\nmissing field(s): address.host"
        );
    }

    #[test]
    fn empty_error_is_ok() {
        assert!(FieldError::default().into_result().is_ok());
        assert!(FieldError::missing_field(&["name"]).into_result().is_err());
    }

    #[test]
    fn via_field_handles_indexes_and_empty_paths() {
        let err = FieldError::invalid_value("x", "").also(FieldError::invalid_value("y", "[0]"));
        let err = err.via_field("subjects");
        assert_eq!(err.paths(), vec!["subjects", "subjects[0]"]);
    }
}
