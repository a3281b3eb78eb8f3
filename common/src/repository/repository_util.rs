use crate::errors::AppError;
use crate::index_trait::MongoIndexModelProvider;
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{Document, doc};
use mongodb::options::FindOptions;
use mongodb::results::UpdateResult;
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum OrderType {
    #[default]
    Asc,
    Desc,
}

#[async_trait]
pub trait Repository<T> {
    async fn find_by_id(&self, id: &str) -> Result<Option<T>, AppError>;
    async fn insert(&self, entity: &T) -> Result<(), AppError>;
    async fn find_one(&self, filter: Document) -> Result<Option<T>, AppError>;
    async fn find_many(&self, filter: Document, limit: Option<i64>, order: Option<(&str, OrderType)>) -> Result<Vec<T>, AppError>;
    /// 单文档原子更新，返回 (matched, modified)
    async fn update_one(&self, filter: Document, update: Document) -> Result<UpdateResult, AppError>;
    async fn find_one_and_delete(&self, filter: Document) -> Result<Option<T>, AppError>;
    async fn delete_one(&self, filter: Document) -> Result<u64, AppError>;
}

#[derive(Debug)]
pub struct BaseRepository<T: Send + Sync> {
    pub collection: Collection<T>, // 线程安全的数据库连接池
    pub name: String,
}

impl<T: Send + Sync> Clone for BaseRepository<T> {
    fn clone(&self) -> Self {
        Self { collection: self.collection.clone(), name: self.name.clone() }
    }
}

impl<T: Send + Sync> BaseRepository<T> {
    pub fn new(db: &Database, name: &str) -> Self {
        Self { collection: db.collection(name), name: name.to_string() }
    }
}

impl<T> BaseRepository<T>
where
    T: Send + Sync + MongoIndexModelProvider,
{
    /// 按实体上的 `#[mongo_index]` 声明创建索引（已存在的索引 Mongo 会忽略）
    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        let models = T::index_models();
        if models.is_empty() {
            return Ok(());
        }
        let count = models.len();
        self.collection.create_indexes(models).await?;
        log::info!("[{}] {} index(es) ensured", self.name, count);
        Ok(())
    }
}

#[async_trait]
impl<T> Repository<T> for BaseRepository<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    async fn find_by_id(&self, id: &str) -> Result<Option<T>, AppError> {
        self.find_one(doc! { "_id": id }).await
    }

    async fn insert(&self, entity: &T) -> Result<(), AppError> {
        self.collection.insert_one(entity).await?;
        Ok(())
    }

    async fn find_one(&self, filter: Document) -> Result<Option<T>, AppError> {
        Ok(self.collection.find_one(filter).await?)
    }

    async fn find_many(&self, filter: Document, limit: Option<i64>, order: Option<(&str, OrderType)>) -> Result<Vec<T>, AppError> {
        let mut options = FindOptions::default();
        options.limit = limit;
        if let Some((field, order_type)) = order {
            let direction = if order_type == OrderType::Desc { -1 } else { 1 };
            options.sort = Some(doc! { field: direction });
        }
        let mut cursor = self.collection.find(filter).with_options(options).await?;
        let mut result = vec![];
        while let Some(doc) = cursor.try_next().await? {
            result.push(doc);
        }
        Ok(result)
    }

    async fn update_one(&self, filter: Document, update: Document) -> Result<UpdateResult, AppError> {
        Ok(self.collection.update_one(filter, update).await?)
    }

    async fn find_one_and_delete(&self, filter: Document) -> Result<Option<T>, AppError> {
        Ok(self.collection.find_one_and_delete(filter).await?)
    }

    async fn delete_one(&self, filter: Document) -> Result<u64, AppError> {
        let result = self.collection.delete_one(filter).await?;
        Ok(result.deleted_count)
    }
}
