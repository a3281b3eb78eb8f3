pub mod biz_const;
pub mod biz_service;
pub mod entitys;
pub mod manager;

#[cfg(test)]
pub(crate) mod test_support;

pub use biz_service::Repositories;
