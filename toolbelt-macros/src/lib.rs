//! Procedural macros declaring toolbelt capabilities.
//!
//! `#[toolbox]` turns an inherent impl block into a registration table: every
//! method annotated with `#[tool(...)]` gets an invocation adapter and a
//! structural description of its signature, and the table is submitted to
//! the link-time inventory under the declaring crate's name.
//!
//! ```ignore
//! use toolbelt_discovery::toolbox;
//!
//! pub struct WeatherTool { /* ... */ }
//!
//! #[toolbox]
//! impl WeatherTool {
//!     #[tool(name = "GetWeatherInCity", description = "Current weather in a city")]
//!     pub async fn get_weather(&self, city: String, cancel: CancellationToken) -> Result<Vec<String>, WeatherError> {
//!         /* ... */
//!     }
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{ToTokens, quote};
use syn::meta::ParseNestedMeta;
use syn::{Attribute, Error, ImplItem, ItemImpl, LitStr, Meta, Path, Type, parse_macro_input};

mod signature;

use signature::ToolMethod;

/// Registers the `#[tool]` methods of an inherent impl block.
///
/// Options:
/// - `crate = "path"`: path to the discovery runtime, default
///   `::toolbelt_discovery`.
/// - `resolve`: use the type's `Resolve` impl as its activator.
/// - `name = "..."`: display name of the owning type.
#[proc_macro_attribute]
pub fn toolbox(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut args = ToolboxArgs::default();
    let parser = syn::meta::parser(|meta| args.parse(meta));
    parse_macro_input!(attr with parser);
    let item = parse_macro_input!(item as ItemImpl);

    expand_toolbox(args, item)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

/// Declares a capability. Only meaningful on a method inside a `#[toolbox]`
/// impl block, which consumes the attribute.
///
/// Options (all string literals): `name`, `description`, `input_params`,
/// `output_params`, `on_failure`.
#[proc_macro_attribute]
pub fn tool(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let item = TokenStream2::from(item);
    let error = Error::new(
        Span::call_site(),
        "`#[tool]` must annotate a method inside a `#[toolbox]` impl block",
    )
    .into_compile_error();
    quote!(#error #item).into()
}

#[derive(Default)]
struct ToolboxArgs {
    krate: Option<Path>,
    resolve: bool,
    name: Option<LitStr>,
}

impl ToolboxArgs {
    fn parse(&mut self, meta: ParseNestedMeta<'_>) -> syn::Result<()> {
        if meta.path.is_ident("crate") {
            let path: LitStr = meta.value()?.parse()?;
            self.krate = Some(path.parse()?);
        } else if meta.path.is_ident("resolve") {
            self.resolve = true;
        } else if meta.path.is_ident("name") {
            self.name = Some(meta.value()?.parse()?);
        } else {
            return Err(meta.error("unsupported toolbox option; expected `crate`, `resolve`, or `name`"));
        }
        Ok(())
    }
}

/// Parsed `#[tool(...)]` options.
#[derive(Default)]
pub(crate) struct Declaration {
    name: Option<LitStr>,
    description: Option<LitStr>,
    input_params: Option<LitStr>,
    output_params: Option<LitStr>,
    on_failure: Option<LitStr>,
}

impl Declaration {
    fn parse(attr: &Attribute) -> syn::Result<Self> {
        let mut declaration = Self::default();
        if matches!(attr.meta, Meta::Path(_)) {
            return Ok(declaration);
        }

        attr.parse_nested_meta(|meta| {
            let slot = if meta.path.is_ident("name") {
                &mut declaration.name
            } else if meta.path.is_ident("description") {
                &mut declaration.description
            } else if meta.path.is_ident("input_params") {
                &mut declaration.input_params
            } else if meta.path.is_ident("output_params") {
                &mut declaration.output_params
            } else if meta.path.is_ident("on_failure") {
                &mut declaration.on_failure
            } else {
                return Err(meta.error(
                    "unsupported tool option; expected `name`, `description`, `input_params`, `output_params`, or `on_failure`",
                ));
            };
            if slot.is_some() {
                return Err(meta.error("duplicate tool option"));
            }
            *slot = Some(meta.value()?.parse()?);
            Ok(())
        })?;

        Ok(declaration)
    }

    pub(crate) fn to_tokens(&self, krate: &Path) -> TokenStream2 {
        let mut tokens = quote!(#krate::CapabilityDeclaration::new());
        let setters = [
            (quote!(with_name), &self.name),
            (quote!(with_description), &self.description),
            (quote!(with_input_params), &self.input_params),
            (quote!(with_output_params), &self.output_params),
            (quote!(with_on_failure), &self.on_failure),
        ];
        for (setter, value) in setters {
            if let Some(value) = value {
                tokens.extend(quote!(.#setter(#value)));
            }
        }
        tokens
    }
}

fn is_tool_attr(attr: &Attribute) -> bool {
    attr.path()
        .segments
        .last()
        .is_some_and(|segment| segment.ident == "tool")
}

fn display_name(ty: &Type) -> String {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .map_or_else(|| ty.to_token_stream().to_string(), |s| s.ident.to_string()),
        _ => ty.to_token_stream().to_string(),
    }
}

fn expand_toolbox(args: ToolboxArgs, mut item: ItemImpl) -> syn::Result<TokenStream2> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(Error::new_spanned(
            path,
            "`#[toolbox]` expects an inherent impl block",
        ));
    }
    if !item.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &item.generics,
            "`#[toolbox]` cannot register a generic impl block; register a concrete type instead",
        ));
    }

    let krate = args
        .krate
        .unwrap_or_else(|| syn::parse_quote!(::toolbelt_discovery));
    let self_ty = (*item.self_ty).clone();
    let type_name = args
        .name
        .map_or_else(|| display_name(&self_ty), |name| name.value());

    let mut methods = Vec::new();
    for impl_item in &mut item.items {
        let ImplItem::Fn(function) = impl_item else {
            continue;
        };

        let (declarations, rest): (Vec<_>, Vec<_>) =
            function.attrs.drain(..).partition(is_tool_attr);
        function.attrs = rest;

        let mut declarations = declarations.into_iter();
        let Some(first) = declarations.next() else {
            continue;
        };
        if let Some(extra) = declarations.next() {
            return Err(Error::new_spanned(
                extra,
                "a method carries at most one `#[tool]` declaration",
            ));
        }

        let declaration = Declaration::parse(&first)?;
        methods.push(ToolMethod::analyze(function, declaration, &self_ty)?);
    }

    let bindings = methods
        .iter()
        .map(|method| method.expand_binding(&krate, &self_ty));
    let infos = methods.iter().map(|method| method.expand_info(&krate));
    let activator = args
        .resolve
        .then(|| quote!(.with_activator(#krate::__private::activate::<#self_ty>)));

    Ok(quote! {
        #item

        const _: () = {
            #(#bindings)*

            fn __toolbelt_load() -> ::core::result::Result<#krate::TypeInfo, #krate::TypeLoadError> {
                #krate::TypeInfo::builder::<#self_ty>(#type_name)
                    .with_path(::core::module_path!())
                    #activator
                    #(.with_method(#infos))*
                    .build()
            }

            #krate::__private::inventory::submit! {
                #krate::TypeRegistration::new(::core::env!("CARGO_CRATE_NAME"), __toolbelt_load)
            }
        };
    })
}
