pub mod v1alpha1;

/// API group of the vSphere resources.
pub const GROUP: &str = "sources.tanzu.vmware.com";
