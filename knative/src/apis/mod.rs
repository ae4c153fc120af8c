//! Validation plumbing shared by custom resources.
mod field_error;

pub use field_error::FieldError;

/// Resources that can fill in defaults for omitted fields.
pub trait Defaultable {
    fn set_defaults(&mut self);
}

/// Resources that can check their own shape.
pub trait Validatable {
    /// Returns every problem found, or `Ok(())` when the resource is well formed.
    fn validate(&self) -> Result<(), FieldError>;
}
