//! Signature analysis for `#[tool]` methods.

use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, format_ident, quote};
use syn::ext::IdentExt;
use syn::visit_mut::{self, VisitMut};
use syn::{
    Error, FnArg, GenericArgument, Ident, ImplItemFn, Pat, PatType, Path, PathArguments,
    ReturnType, Signature, Type, TypeArray, TypeParamBound, TypeSlice,
};

use crate::Declaration;

#[derive(Clone, Copy)]
enum ReceiverKind {
    Static,
    Instance,
}

/// How an extracted argument reaches the method.
#[derive(Clone, Copy)]
enum Pass {
    Owned,
    Ref,
    OptionDeref,
    OptionRef,
}

enum ParamKind {
    Cancellation { by_ref: bool },
    Value { extract: Type, optional: bool, pass: Pass },
}

struct Param {
    name: String,
    binding: Ident,
    kind: ParamKind,
}

struct Output {
    awaits: bool,
    fallible: bool,
    success: Option<Type>,
}

/// A `#[tool]` method reduced to what the expansion needs.
pub(crate) struct ToolMethod {
    ident: Ident,
    receiver: ReceiverKind,
    public: bool,
    params: Vec<Param>,
    output: Output,
    declaration: Declaration,
}

impl ToolMethod {
    /// `Self` in parameter and return types is read as `self_ty`.
    pub(crate) fn analyze(
        function: &ImplItemFn,
        declaration: Declaration,
        self_ty: &Type,
    ) -> syn::Result<Self> {
        let sig = &function.sig;
        if !sig.generics.params.is_empty() {
            return Err(Error::new_spanned(
                &sig.generics,
                "`#[tool]` methods cannot be generic",
            ));
        }

        let mut receiver = ReceiverKind::Static;
        let mut params = Vec::new();
        for (index, input) in sig.inputs.iter().enumerate() {
            match input {
                FnArg::Receiver(recv) => {
                    if recv.reference.is_none()
                        || recv.mutability.is_some()
                        || recv.colon_token.is_some()
                    {
                        return Err(Error::new_spanned(
                            recv,
                            "`#[tool]` methods take `&self`; shared state needs interior mutability",
                        ));
                    }
                    receiver = ReceiverKind::Instance;
                }
                FnArg::Typed(pat_type) => params.push(Param::analyze(index, pat_type, self_ty)?),
            }
        }

        Ok(Self {
            ident: sig.ident.clone(),
            receiver,
            public: matches!(function.vis, syn::Visibility::Public(_)),
            params,
            output: Output::analyze(sig, self_ty),
            declaration,
        })
    }

    fn ident_str(&self) -> String {
        self.ident.unraw().to_string()
    }

    /// The invocation adapter: argument extraction, the call, and output
    /// serialisation, boxed into an `InvokeFuture`.
    pub(crate) fn expand_binding(&self, krate: &Path, self_ty: &Type) -> TokenStream2 {
        let ident = &self.ident;
        let ident_str = self.ident_str();
        let call_fn = format_ident!("__toolbelt_call_{}", ident_str);
        let bind_fn = format_ident!("__toolbelt_bind_{}", ident_str);

        let (target, callee) = match self.receiver {
            ReceiverKind::Instance => (
                quote! {
                    let __toolbelt_this =
                        #krate::__private::downcast_target::<#self_ty>(__toolbelt_target, #ident_str)?;
                },
                quote!(__toolbelt_this.#ident),
            ),
            ReceiverKind::Static => (quote!(), quote!(<#self_ty>::#ident)),
        };
        let extractions = self.params.iter().filter_map(Param::extraction);
        let call_args = self.params.iter().map(Param::call_arg);
        let awaited = self.output.awaits.then(|| quote!(.await));
        let unwrapped = self
            .output
            .fallible
            .then(|| quote!(.map_err(#krate::__private::execution_error)?));

        quote! {
            #[allow(unused_variables, non_snake_case, clippy::all, clippy::pedantic)]
            async fn #call_fn(
                __toolbelt_target: ::core::option::Option<#krate::Instance>,
                __toolbelt_args: #krate::Arguments,
                __toolbelt_cancel: #krate::CancellationToken,
            ) -> #krate::ToolResult<#krate::__private::serde_json::Value> {
                #target
                #(#extractions)*
                let __toolbelt_output = #callee(#(#call_args),*) #awaited #unwrapped;
                #krate::__private::to_output(__toolbelt_output)
            }

            #[allow(non_snake_case)]
            fn #bind_fn(
                target: ::core::option::Option<#krate::Instance>,
                args: #krate::Arguments,
                cancel: #krate::CancellationToken,
            ) -> #krate::InvokeFuture {
                ::std::boxed::Box::pin(#call_fn(target, args, cancel))
            }
        }
    }

    /// The `MethodInfo` expression describing this method.
    pub(crate) fn expand_info(&self, krate: &Path) -> TokenStream2 {
        let ident_str = self.ident_str();
        let bind_fn = format_ident!("__toolbelt_bind_{}", ident_str);
        let receiver = match self.receiver {
            ReceiverKind::Instance => quote!(#krate::Receiver::Instance),
            ReceiverKind::Static => quote!(#krate::Receiver::Static),
        };
        let visibility = if self.public {
            quote!(#krate::Visibility::Public)
        } else {
            quote!(#krate::Visibility::Private)
        };
        let declaration = self.declaration.to_tokens(krate);
        let params = self.params.iter().map(|param| param.spec(krate));
        let returns = self.output.spec(krate);

        quote! {
            #krate::MethodInfo::new(#ident_str, #receiver, #bind_fn)
                .with_visibility(#visibility)
                .with_declaration(#declaration)
                #(.with_param(#params))*
                .with_returns(#returns)
        }
    }
}

impl Param {
    fn analyze(index: usize, pat_type: &PatType, self_ty: &Type) -> syn::Result<Self> {
        let Pat::Ident(pat_ident) = &*pat_type.pat else {
            return Err(Error::new_spanned(
                &pat_type.pat,
                "`#[tool]` parameters must be plain identifiers",
            ));
        };
        if pat_ident.by_ref.is_some() || pat_ident.subpat.is_some() {
            return Err(Error::new_spanned(
                pat_ident,
                "`#[tool]` parameters must be plain identifiers",
            ));
        }

        Ok(Self {
            name: pat_ident.ident.unraw().to_string(),
            binding: format_ident!("__toolbelt_arg_{}", index),
            kind: classify(&replace_self(&pat_type.ty, self_ty))?,
        })
    }

    fn extraction(&self) -> Option<TokenStream2> {
        let ParamKind::Value {
            extract, optional, ..
        } = &self.kind
        else {
            return None;
        };
        let binding = &self.binding;
        let name = &self.name;
        Some(if *optional {
            quote! {
                let #binding: ::core::option::Option<#extract> =
                    __toolbelt_args.optional::<#extract>(#name)?;
            }
        } else {
            quote! {
                let #binding: #extract = __toolbelt_args.required::<#extract>(#name)?;
            }
        })
    }

    fn call_arg(&self) -> TokenStream2 {
        let binding = &self.binding;
        match &self.kind {
            ParamKind::Cancellation { by_ref: true } => quote!(&__toolbelt_cancel),
            ParamKind::Cancellation { by_ref: false } => {
                quote!(::core::clone::Clone::clone(&__toolbelt_cancel))
            }
            ParamKind::Value { pass, .. } => match pass {
                Pass::Owned => quote!(#binding),
                Pass::Ref => quote!(&#binding),
                Pass::OptionDeref => quote!(#binding.as_deref()),
                Pass::OptionRef => quote!(#binding.as_ref()),
            },
        }
    }

    fn spec(&self, krate: &Path) -> TokenStream2 {
        let name = &self.name;
        match &self.kind {
            ParamKind::Cancellation { .. } => quote!(#krate::ParamSpec::cancellation(#name)),
            ParamKind::Value {
                extract, optional, ..
            } => {
                let described = describe(krate, extract);
                let optional = optional.then(|| quote!(.optional()));
                quote!(#krate::ParamSpec::value(#name, #described) #optional)
            }
        }
    }
}

impl Output {
    fn analyze(sig: &Signature, self_ty: &Type) -> Self {
        let declared = match &sig.output {
            ReturnType::Default => None,
            ReturnType::Type(_, ty) => Some(&**ty),
        };
        let (awaits, value) = if sig.asyncness.is_some() {
            (true, declared)
        } else if let Some(output) = declared.and_then(future_output) {
            (true, Some(output))
        } else {
            (false, declared)
        };

        let value = value.filter(|ty| !is_unit(ty));
        let (fallible, success) = match value.and_then(result_ok) {
            Some(ok) => (true, Some(ok).filter(|ty| !is_unit(ty))),
            None => (false, value),
        };

        Self {
            awaits,
            fallible,
            success: success.map(|ty| replace_self(ty, self_ty)),
        }
    }

    fn spec(&self, krate: &Path) -> TokenStream2 {
        let described = self.success.as_ref().map(|ty| describe(krate, ty));
        let base = match (self.awaits, described) {
            (true, Some(inner)) => {
                quote!(#krate::ReturnSpec::asynchronous(::core::option::Option::Some(#inner)))
            }
            (true, None) => quote!(#krate::ReturnSpec::asynchronous(::core::option::Option::None)),
            (false, Some(inner)) => quote!(#krate::ReturnSpec::value(#inner)),
            (false, None) => quote!(#krate::ReturnSpec::void()),
        };
        if self.fallible {
            quote!(#base.fallible())
        } else {
            base
        }
    }
}

fn classify(ty: &Type) -> syn::Result<ParamKind> {
    if is_cancellation(ty) {
        return Ok(ParamKind::Cancellation {
            by_ref: matches!(ty, Type::Reference(_)),
        });
    }

    match ty {
        Type::ImplTrait(_) => Err(Error::new_spanned(
            ty,
            "`#[tool]` parameters need a concrete type",
        )),
        Type::Reference(reference) if reference.mutability.is_some() => Err(Error::new_spanned(
            ty,
            "`#[tool]` parameters cannot be `&mut`",
        )),
        Type::Reference(reference) => Ok(ParamKind::Value {
            extract: owned(&reference.elem),
            optional: false,
            pass: Pass::Ref,
        }),
        _ => match option_inner(ty) {
            Some(Type::Reference(reference)) => {
                let pass = if matches!(*reference.elem, Type::Slice(_)) || is_str(&reference.elem) {
                    Pass::OptionDeref
                } else {
                    Pass::OptionRef
                };
                Ok(ParamKind::Value {
                    extract: owned(&reference.elem),
                    optional: true,
                    pass,
                })
            }
            Some(inner) => Ok(ParamKind::Value {
                extract: inner.clone(),
                optional: true,
                pass: Pass::Owned,
            }),
            None => Ok(ParamKind::Value {
                extract: ty.clone(),
                optional: false,
                pass: Pass::Owned,
            }),
        },
    }
}

struct ReplaceSelf<'a>(&'a Type);

impl VisitMut for ReplaceSelf<'_> {
    fn visit_type_mut(&mut self, ty: &mut Type) {
        if matches!(ty, Type::Path(path) if path.qself.is_none() && path.path.is_ident("Self")) {
            *ty = self.0.clone();
            return;
        }
        visit_mut::visit_type_mut(self, ty);
    }
}

/// `ty` with every bare `Self` replaced by the impl's type. Generated
/// adapters live outside the impl block, where `Self` does not resolve.
fn replace_self(ty: &Type, self_ty: &Type) -> Type {
    let mut ty = ty.clone();
    ReplaceSelf(self_ty).visit_type_mut(&mut ty);
    ty
}

/// Owned counterpart of a borrowed parameter type.
fn owned(elem: &Type) -> Type {
    match elem {
        _ if is_str(elem) => syn::parse_quote!(::std::string::String),
        Type::Slice(slice) => {
            let inner = &slice.elem;
            syn::parse_quote!(::std::vec::Vec<#inner>)
        }
        other => other.clone(),
    }
}

/// Structural `TypeDescription` expression for `ty`.
fn describe(krate: &Path, ty: &Type) -> TokenStream2 {
    match ty {
        Type::Reference(reference) => describe(krate, &reference.elem),
        Type::Paren(paren) => describe(krate, &paren.elem),
        Type::Group(group) => describe(krate, &group.elem),
        Type::Slice(TypeSlice { elem, .. }) | Type::Array(TypeArray { elem, .. }) => {
            let element = describe(krate, elem);
            quote!(#krate::TypeDescription::array(#element))
        }
        Type::Path(path) if path.qself.is_none() => {
            let Some(segment) = path.path.segments.last() else {
                return named(krate, &ty.to_token_stream().to_string());
            };
            let name = segment.ident.unraw().to_string();
            let args = type_args(&segment.arguments);
            match (name.as_str(), args.as_slice()) {
                ("str", []) => named(krate, "String"),
                ("Vec", [element]) => {
                    let element = describe(krate, element);
                    quote!(#krate::TypeDescription::array(#element))
                }
                (_, []) => named(krate, &name),
                _ => {
                    let args = args.iter().map(|arg| describe(krate, arg));
                    quote!(#krate::TypeDescription::generic(#name, ::std::vec![#(#args),*]))
                }
            }
        }
        Type::Tuple(tuple) if tuple.elems.is_empty() => named(krate, "()"),
        other => named(krate, &other.to_token_stream().to_string()),
    }
}

fn named(krate: &Path, name: &str) -> TokenStream2 {
    quote!(#krate::TypeDescription::named(#name))
}

fn type_args(arguments: &PathArguments) -> Vec<&Type> {
    match arguments {
        PathArguments::AngleBracketed(angle) => angle
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn last_segment_is<'a>(ty: &'a Type, ident: &str) -> Option<&'a PathArguments> {
    match ty {
        Type::Path(path) if path.qself.is_none() => path
            .path
            .segments
            .last()
            .filter(|segment| segment.ident == ident)
            .map(|segment| &segment.arguments),
        _ => None,
    }
}

fn is_str(ty: &Type) -> bool {
    last_segment_is(ty, "str").is_some()
}

fn is_unit(ty: &Type) -> bool {
    match ty {
        Type::Tuple(tuple) => tuple.elems.is_empty(),
        Type::Paren(paren) => is_unit(&paren.elem),
        _ => false,
    }
}

fn is_cancellation(ty: &Type) -> bool {
    let ty = match ty {
        Type::Reference(reference) => &*reference.elem,
        other => other,
    };
    last_segment_is(ty, "CancellationToken").is_some()
}

fn option_inner(ty: &Type) -> Option<&Type> {
    let arguments = last_segment_is(ty, "Option")?;
    match type_args(arguments).as_slice() {
        [inner] => Some(*inner),
        _ => None,
    }
}

fn result_ok(ty: &Type) -> Option<&Type> {
    let arguments = last_segment_is(ty, "Result")?;
    type_args(arguments).first().copied()
}

/// `Output` of an `impl Future<Output = T>` return type.
fn future_output(ty: &Type) -> Option<&Type> {
    let Type::ImplTrait(bounds) = ty else {
        return None;
    };
    bounds.bounds.iter().find_map(|bound| {
        let TypeParamBound::Trait(trait_bound) = bound else {
            return None;
        };
        let segment = trait_bound.path.segments.last()?;
        if segment.ident != "Future" {
            return None;
        }
        let PathArguments::AngleBracketed(angle) = &segment.arguments else {
            return None;
        };
        angle.args.iter().find_map(|arg| match arg {
            GenericArgument::AssocType(assoc) if assoc.ident == "Output" => Some(&assoc.ty),
            _ => None,
        })
    })
}
