use crate::entitys::group_entity::Group;
use async_trait::async_trait;
use common::errors::AppError;
use common::repository_util::{BaseRepository, Repository};
use common::util::date_util::now;
use mongodb::Database;
use mongodb::bson::doc;

#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn insert(&self, group: &Group) -> Result<(), AppError>;
    async fn find_by_id(&self, group_id: &str) -> Result<Option<Group>, AppError>;
    /// 小组成员去重追加；群组或小组不存在时返回 false
    async fn add_member(&self, group_id: &str, sub_group_id: &str, account_id: &str) -> Result<bool, AppError>;
    async fn remove_member(&self, group_id: &str, sub_group_id: &str, account_id: &str) -> Result<bool, AppError>;
    async fn set_leader(&self, group_id: &str, account_id: Option<&str>) -> Result<bool, AppError>;
}

#[derive(Debug, Clone)]
pub struct GroupService {
    pub dao: BaseRepository<Group>,
}

impl GroupService {
    pub fn new(db: &Database) -> Self {
        Self { dao: BaseRepository::new(db, "group") }
    }
}

#[async_trait]
impl GroupStore for GroupService {
    async fn insert(&self, group: &Group) -> Result<(), AppError> {
        self.dao.insert(group).await
    }

    async fn find_by_id(&self, group_id: &str) -> Result<Option<Group>, AppError> {
        self.dao.find_by_id(group_id).await
    }

    async fn add_member(&self, group_id: &str, sub_group_id: &str, account_id: &str) -> Result<bool, AppError> {
        let filter = doc! { "_id": group_id, "sub_groups._id": sub_group_id };
        let update = doc! {
            "$addToSet": { "sub_groups.$.members": account_id },
            "$set": { "update_time": now() },
        };
        let result = self.dao.update_one(filter, update).await?;
        Ok(result.matched_count == 1)
    }

    async fn remove_member(&self, group_id: &str, sub_group_id: &str, account_id: &str) -> Result<bool, AppError> {
        let filter = doc! { "_id": group_id, "sub_groups._id": sub_group_id };
        let update = doc! {
            "$pull": { "sub_groups.$.members": account_id },
            "$set": { "update_time": now() },
        };
        let result = self.dao.update_one(filter, update).await?;
        Ok(result.matched_count == 1)
    }

    async fn set_leader(&self, group_id: &str, account_id: Option<&str>) -> Result<bool, AppError> {
        let update = doc! { "$set": { "leader_id": account_id, "update_time": now() } };
        let result = self.dao.update_one(doc! { "_id": group_id }, update).await?;
        Ok(result.matched_count == 1)
    }
}
