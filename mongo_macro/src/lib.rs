extern crate proc_macro;

mod mongo_index_macro;

use proc_macro::TokenStream;

/// 根据 `#[mongo_index(...)]` 声明生成 `MongoIndexModelProvider` 实现
///
/// ```ignore
/// #[derive(MongoIndexModelProvider)]
/// #[mongo_index(fields["email"], unique)]
/// #[mongo_index(fields["created_at"], expire_after(3600))]
/// struct Account { .. }
/// ```
#[proc_macro_derive(MongoIndexModelProvider, attributes(mongo_index))]
pub fn mongo_index_model_provider(input: TokenStream) -> TokenStream {
    mongo_index_macro::expand_index_model_provider(input)
}
