mod vauth;
mod vspherebinding;
mod vspheresource;

pub use vauth::VAuthSpec;
pub use vspherebinding::{VSphereBinding, VSphereBindingCondition, VSphereBindingSpec, VSphereBindingStatus};
pub use vspheresource::{
    VSphereSource, VSphereSourceCondition, VSphereSourceConditionManager, VSphereSourceSpec,
    VSphereSourceStatus,
};
