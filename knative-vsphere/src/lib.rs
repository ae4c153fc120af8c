//! A Knative event source for vSphere.
//!
//! The [`reconciler`] drives the objects that run a receive adapter for every
//! [`VSphereSource`](apis::sources::v1alpha1::VSphereSource), and the [`adapter`] tails the
//! vSphere event feed and forwards each event to the sink as a CloudEvent.
pub mod adapter;
pub mod apis;
pub mod config;
pub mod reconciler;
