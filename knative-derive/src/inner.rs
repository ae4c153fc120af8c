use crate::{
    REQUIRED_VARIANTS,
    error::VerificationError
};
use proc_macro::TokenStream;
use quote::quote;
use syn::{
    spanned::Spanned,
    punctuated::Punctuated,
    token::Comma,
    Variant,
    Error,
    Result,
    Data::Enum,
    DeriveInput,
    Ident
};

fn is_required(variant: &Variant) -> bool {
    REQUIRED_VARIANTS.contains(&variant.ident.to_string().as_str())
}

fn is_dependent(variant: &Variant) -> bool {
    variant.attrs
        .iter()
        .any(|a| a.path.segments.iter()
             .any(|p| p.ident == "dependent"))
}

fn verify_variants(variants: &Punctuated<Variant, Comma>) -> Result<&Ident> {
    let mut happy = None;

    for v in variants {
        if !v.fields.is_empty() {
            return Err(Error::new(v.span(), "ConditionType variants may not carry fields"));
        }
        if is_required(v) {
            // Ensure top level conditions are not dependents
            if is_dependent(v) {
                return Err(VerificationError::NotDependent(v.ident.to_string()).into());
            }
            // Ensure only one top level condition exists
            if happy.replace(&v.ident).is_some() {
                return Err(VerificationError::OneRequiredVariant.into());
            }
        }
    }

    happy.ok_or_else(|| VerificationError::OneRequiredVariant.into())
}

pub fn inner_derive(ast: DeriveInput) -> Result<TokenStream> {
    let name = &ast.ident;

    let variants = match ast.data {
        Enum(syn::DataEnum { ref variants, .. }) => variants,
        _ => return Err(Error::new(
            ast.span(),
            "ConditionType may only be derived on enums"
        ))
    };

    let happy = verify_variants(variants)?;
    let dependents = variants.iter()
        .filter(|v| is_dependent(v))
        .map(|v| &v.ident);

    let plain: Vec<&Ident> = variants.iter()
        .filter(|v| !is_required(v))
        .map(|v| &v.ident)
        .collect();

    let trait_fns = plain.iter().map(|c| {
        let lower = Ident::new(&c.to_string().to_lowercase(), c.span());
        let doc = format!("Returns the `{c}` variant of the [`ConditionType`]");
        quote! {
            #[doc = #doc]
            fn #lower() -> Self;
        }
    });

    let impl_fns = plain.iter().map(|c| {
        let lower = Ident::new(&c.to_string().to_lowercase(), c.span());
        quote! {
            #[inline]
            fn #lower() -> Self {
                #name::#c
            }
        }
    });

    let manager_fns = plain.iter().map(|c| {
        let lower = c.to_string().to_lowercase();
        let getter = Ident::new(&lower, c.span());
        let mark = Ident::new(&format!("mark_{lower}"), c.span());
        let mark_with_reason = Ident::new(&format!("mark_{lower}_with_reason"), c.span());
        let mark_not = Ident::new(&format!("mark_not_{lower}"), c.span());
        quote! {
            fn #mark(&mut self) {
                self.manager().mark_true(S::#getter());
            }

            fn #mark_with_reason(&mut self, reason: &str, message: Option<String>) {
                self.manager().mark_true_with_reason(S::#getter(), reason, message);
            }

            fn #mark_not(&mut self, reason: &str, message: Option<String>) {
                self.manager().mark_false(S::#getter(), reason, message);
            }
        }
    });

    let condition_type_name = Ident::new(&format!("{name}Type"), name.span());
    let condition_type_doc = format!("A [`ConditionType`] that implement this trait duck types to [`{name}`].");
    let manager_name = Ident::new(&format!("{name}Manager"), name.span());
    let manager_doc = format!("Allows a status to manage [`{name}`].");

    Ok(quote! {
        #[doc = #condition_type_doc]
        pub trait #condition_type_name: ::knative_conditions::ConditionType {
            #(#trait_fns)*
        }

        #[automatically_derived]
        impl #condition_type_name for #name {
            #(#impl_fns)*
        }

        #[automatically_derived]
        impl ::knative_conditions::ConditionType for #name {
            #[inline]
            fn happy() -> Self {
                #name::#happy
            }

            #[inline]
            fn dependents() -> &'static [Self] {
                &[#(#name::#dependents),*]
            }
        }

        #[automatically_derived]
        impl Default for #name {
            fn default() -> Self {
                #name::#happy
            }
        }

        #[automatically_derived]
        impl ::std::fmt::Display for #name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::write!(f, "{:?}", self)
            }
        }

        #[doc = #manager_doc]
        pub trait #manager_name<S>: ::knative_conditions::ConditionAccessor<S>
        where S: #condition_type_name {
            #(#manager_fns)*
        }

        impl<S: #condition_type_name, T: ::knative_conditions::ConditionAccessor<S> + ?Sized> #manager_name<S> for T {}
    }.into())
}
