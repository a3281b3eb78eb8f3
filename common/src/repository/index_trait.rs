use mongodb::IndexModel;

/// 由 `#[derive(MongoIndexModelProvider)]` 生成，声明集合需要的索引
pub trait MongoIndexModelProvider {
    fn index_models() -> Vec<IndexModel>;
}
