//! Derive [`ConditionType`] on your own types to adhere to the Knative Source schema and condition
//! management.
//!
//! The enum must contain exactly one of `Ready` or `Succeeded`, which becomes the happy
//! condition. Variants marked `#[dependent]` must all be true for the happy condition to be true.
mod error;
mod inner;

use syn::{parse_macro_input, DeriveInput};

/// Condition types that may be used as the top level, happy condition.
pub(crate) const REQUIRED_VARIANTS: [&str; 2] = ["Ready", "Succeeded"];

#[proc_macro_derive(ConditionType, attributes(dependent))]
pub fn derive_condition_type(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    inner::inner_derive(ast).unwrap_or_else(|err| err.to_compile_error().into())
}
