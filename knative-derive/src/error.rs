use crate::REQUIRED_VARIANTS;
use proc_macro2::Span;
use syn::Error;
use std::fmt;

pub enum VerificationError {
    /// A happy variant was marked `#[dependent]`.
    NotDependent(String),
    /// Zero or several happy variants.
    OneRequiredVariant,
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationError::NotDependent(s) => write!(f, "{s} is the happy condition and may not be a dependent"),
            VerificationError::OneRequiredVariant => write!(
                f,
                "ConditionType must contain exactly one {} variant",
                REQUIRED_VARIANTS.join(" or ")
            )
        }
    }
}

impl From<VerificationError> for Error {
    fn from(v: VerificationError) -> Error {
        Error::new(Span::call_site(), v)
    }
}
