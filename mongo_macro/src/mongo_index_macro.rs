use quote::quote;
use syn::parse::Parse;
use syn::{parse_macro_input, DeriveInput, LitInt, LitStr, Token};

/// 单条 `#[mongo_index(...)]` 的解析结果
#[derive(Default)]
struct IndexSpec {
    fields: Vec<String>,
    is_unique: bool,
    sort_order: i32,
    index_name: Option<String>,
    expire_after_secs: Option<u64>,
}

fn parse_index_attr(attr: &syn::Attribute) -> syn::Result<IndexSpec> {
    let mut spec = IndexSpec { sort_order: 1, ..Default::default() };

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("fields") {
            let content;
            syn::bracketed!(content in meta.input);
            let lits = content.parse_terminated(<LitStr as Parse>::parse, Token![,])?;
            spec.fields.extend(lits.iter().map(|lit| lit.value()));
        } else if meta.path.is_ident("unique") {
            spec.is_unique = true;
        } else if meta.path.is_ident("order") {
            let content;
            syn::parenthesized!(content in meta.input);
            let lit: LitStr = content.parse()?;
            if lit.value().eq_ignore_ascii_case("desc") {
                spec.sort_order = -1;
            }
        } else if meta.path.is_ident("name") {
            let content;
            syn::parenthesized!(content in meta.input);
            let lit: LitStr = content.parse()?;
            spec.index_name = Some(lit.value());
        } else if meta.path.is_ident("expire_after") {
            let content;
            syn::parenthesized!(content in meta.input);
            let lit: LitInt = content.parse()?;
            spec.expire_after_secs = Some(lit.base10_parse::<u64>()?);
        } else {
            return Err(meta.error("unsupported #[mongo_index(...)] option"));
        }
        Ok(())
    })?;

    if spec.fields.is_empty() {
        return Err(syn::Error::new_spanned(attr, "#[mongo_index] requires fields[\"..\"]"));
    }
    Ok(spec)
}

pub fn expand_index_model_provider(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    let name = &ast.ident;

    let mut index_exprs = vec![];

    for attr in ast.attrs.iter().filter(|a| a.path().is_ident("mongo_index")) {
        let spec = match parse_index_attr(attr) {
            Ok(spec) => spec,
            Err(e) => return e.to_compile_error().into(),
        };

        let sort_order = spec.sort_order;
        let field_names = &spec.fields;
        let key_doc = quote! {
            {
                let mut keys = mongodb::bson::Document::new();
                #( keys.insert(#field_names, #sort_order); )*
                keys
            }
        };

        let mut options = quote! { mongodb::options::IndexOptions::builder() };
        if spec.is_unique {
            options = quote! { #options.unique(true) };
        }
        if let Some(ref index_name) = spec.index_name {
            options = quote! { #options.name(#index_name.to_string()) };
        }
        if let Some(secs) = spec.expire_after_secs {
            options = quote! { #options.expire_after(std::time::Duration::from_secs(#secs)) };
        }

        index_exprs.push(quote! {
            mongodb::IndexModel::builder()
                .keys(#key_doc)
                .options(#options.build())
                .build()
        });
    }

    let gen = quote! {
        impl MongoIndexModelProvider for #name {
            fn index_models() -> Vec<mongodb::IndexModel> {
                vec![
                    #(#index_exprs),*
                ]
            }
        }
    };

    gen.into()
}
