use crate::entitys::account_entity::{Account, Membership};
use crate::entitys::notification_entity::Notification;
use async_trait::async_trait;
use common::errors::AppError;
use common::repository_util::{BaseRepository, Repository};
use common::util::date_util::now;
use mongodb::Database;
use mongodb::bson::{doc, to_bson};
use std::collections::HashMap;

/// 账号存储。所有内嵌列表的修改都是单文档原子更新
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// 邮箱重复返回 Conflict
    async fn insert(&self, account: &Account) -> Result<(), AppError>;
    async fn find_by_id(&self, account_id: &str) -> Result<Option<Account>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError>;
    /// 按传入顺序返回，找不到的 ID 直接跳过
    async fn find_by_ids(&self, account_ids: &[String]) -> Result<Vec<Account>, AppError>;
    /// 账号不存在或已持有同一 (group, sub_group) 身份时返回 false
    async fn push_membership(&self, account_id: &str, membership: &Membership) -> Result<bool, AppError>;
    async fn pull_membership(&self, account_id: &str, membership_id: &str) -> Result<bool, AppError>;
    async fn push_notification(&self, account_id: &str, notification: &Notification) -> Result<bool, AppError>;
    async fn pull_notification(&self, account_id: &str, notification_id: &str) -> Result<bool, AppError>;
    async fn set_push_address(&self, account_id: &str, push_address: Option<&str>) -> Result<bool, AppError>;
    async fn set_password_hash(&self, account_id: &str, password_hash: &str) -> Result<bool, AppError>;
    async fn delete(&self, account_id: &str) -> Result<bool, AppError>;
}

#[derive(Debug, Clone)]
pub struct AccountService {
    pub dao: BaseRepository<Account>,
}

impl AccountService {
    pub fn new(db: &Database) -> Self {
        Self { dao: BaseRepository::new(db, "account") }
    }
}

/// 按请求顺序重排查询结果
pub(crate) fn order_by_ids(account_ids: &[String], found: Vec<Account>) -> Vec<Account> {
    let mut by_id: HashMap<String, Account> = found.into_iter().map(|a| (a.id.clone(), a)).collect();
    account_ids.iter().filter_map(|id| by_id.remove(id)).collect()
}

#[async_trait]
impl AccountStore for AccountService {
    async fn insert(&self, account: &Account) -> Result<(), AppError> {
        match self.dao.insert(account).await {
            Err(e) if e.is_duplicate_key() => Err(AppError::Conflict(format!("email already registered: {}", account.email))),
            other => other,
        }
    }

    async fn find_by_id(&self, account_id: &str) -> Result<Option<Account>, AppError> {
        self.dao.find_by_id(account_id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        self.dao.find_one(doc! { "email": email.to_lowercase() }).await
    }

    async fn find_by_ids(&self, account_ids: &[String]) -> Result<Vec<Account>, AppError> {
        if account_ids.is_empty() {
            return Ok(vec![]);
        }
        let found = self.dao.find_many(doc! { "_id": { "$in": account_ids.to_vec() } }, None, None).await?;
        Ok(order_by_ids(account_ids, found))
    }

    async fn push_membership(&self, account_id: &str, membership: &Membership) -> Result<bool, AppError> {
        let filter = doc! {
            "_id": account_id,
            "memberships": { "$not": { "$elemMatch": {
                "group_id": membership.group_id.as_str(),
                "sub_group_id": membership.sub_group_id.as_deref(),
            } } },
        };
        let update = doc! {
            "$push": { "memberships": to_bson(membership)? },
            "$set": { "update_time": now() },
        };
        let result = self.dao.update_one(filter, update).await?;
        Ok(result.matched_count == 1)
    }

    async fn pull_membership(&self, account_id: &str, membership_id: &str) -> Result<bool, AppError> {
        let update = doc! {
            "$pull": { "memberships": { "_id": membership_id } },
            "$set": { "update_time": now() },
        };
        let result = self
            .dao
            .update_one(doc! { "_id": account_id, "memberships._id": membership_id }, update)
            .await?;
        Ok(result.modified_count == 1)
    }

    async fn push_notification(&self, account_id: &str, notification: &Notification) -> Result<bool, AppError> {
        let update = doc! { "$push": { "inbox": to_bson(notification)? } };
        let result = self.dao.update_one(doc! { "_id": account_id }, update).await?;
        Ok(result.matched_count == 1)
    }

    async fn pull_notification(&self, account_id: &str, notification_id: &str) -> Result<bool, AppError> {
        let update = doc! { "$pull": { "inbox": { "_id": notification_id } } };
        let result = self
            .dao
            .update_one(doc! { "_id": account_id, "inbox._id": notification_id }, update)
            .await?;
        Ok(result.modified_count == 1)
    }

    async fn set_push_address(&self, account_id: &str, push_address: Option<&str>) -> Result<bool, AppError> {
        let update = doc! { "$set": { "push_address": push_address, "update_time": now() } };
        let result = self.dao.update_one(doc! { "_id": account_id }, update).await?;
        Ok(result.matched_count == 1)
    }

    async fn set_password_hash(&self, account_id: &str, password_hash: &str) -> Result<bool, AppError> {
        let update = doc! { "$set": { "password_hash": password_hash, "update_time": now() } };
        let result = self.dao.update_one(doc! { "_id": account_id }, update).await?;
        Ok(result.matched_count == 1)
    }

    async fn delete(&self, account_id: &str) -> Result<bool, AppError> {
        Ok(self.dao.delete_one(doc! { "_id": account_id }).await? == 1)
    }
}
