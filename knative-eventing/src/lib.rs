//! Custom resources of Knative eventing that other sources build on.
pub mod apis;
