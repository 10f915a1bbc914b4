//! ddd-repository 的过程宏
//!
//! - `#[entity]`：为具名字段结构体生成 `Entity` 实现（按字段名读写值）。
//!
use proc_macro::TokenStream;

mod derive_utils;
mod entity;
mod field_utils;

/// 实体宏
/// - 若缺失则追加 `id: IdType` 字段，并置于字段最前
/// - 派生 `Debug`（可通过 `debug = false` 关闭）与 `Clone`
/// - 实现 `::ddd_repository::entity::Entity`，`field/set_field` 覆盖除 `#[field(skip)]` 外的所有字段
/// - 支持参数：`#[entity(id = IdType, name = "type_name", debug = true|false)]`
///   - `id` 默认 `String`
///   - `name` 默认为结构体名的 snake_case 形式
#[proc_macro_attribute]
pub fn entity(attr: TokenStream, item: TokenStream) -> TokenStream {
    entity::expand(attr, item)
}
