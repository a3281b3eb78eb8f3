pub mod account_service;
pub mod event_service;
pub mod group_service;
pub mod mail_service;
pub mod memory_store;
pub mod push_service;
pub mod reset_token_service;

use crate::biz_service::account_service::{AccountService, AccountStore};
use crate::biz_service::event_service::{EventService, EventStore};
use crate::biz_service::group_service::{GroupService, GroupStore};
use crate::biz_service::memory_store::{MemoryAccountStore, MemoryEventStore, MemoryGroupStore, MemoryResetTokenStore};
use crate::biz_service::reset_token_service::{ResetTokenService, ResetTokenStore};
use common::errors::AppError;
use mongodb::Database;
use std::sync::Arc;

/// 进程启动时构建一次，随请求上下文向下传递
#[derive(Clone)]
pub struct Repositories {
    pub accounts: Arc<dyn AccountStore>,
    pub groups: Arc<dyn GroupStore>,
    pub events: Arc<dyn EventStore>,
    pub reset_tokens: Arc<dyn ResetTokenStore>,
}

impl Repositories {
    /// Mongo 实现，同时按实体声明创建索引
    pub async fn mongo(db: &Database) -> Result<Self, AppError> {
        let accounts = AccountService::new(db);
        let groups = GroupService::new(db);
        let events = EventService::new(db);
        let reset_tokens = ResetTokenService::new(db);

        accounts.dao.ensure_indexes().await?;
        groups.dao.ensure_indexes().await?;
        events.dao.ensure_indexes().await?;
        reset_tokens.dao.ensure_indexes().await?;

        Ok(Self {
            accounts: Arc::new(accounts),
            groups: Arc::new(groups),
            events: Arc::new(events),
            reset_tokens: Arc::new(reset_tokens),
        })
    }

    pub fn memory() -> Self {
        Self {
            accounts: Arc::new(MemoryAccountStore::default()),
            groups: Arc::new(MemoryGroupStore::default()),
            events: Arc::new(MemoryEventStore::default()),
            reset_tokens: Arc::new(MemoryResetTokenStore::default()),
        }
    }
}
