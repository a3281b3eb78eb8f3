use crate::entitys::reset_token_entity::{ResetToken, TokenKind};
use async_trait::async_trait;
use common::errors::AppError;
use common::repository_util::{BaseRepository, Repository};
use mongodb::Database;
use mongodb::bson::{DateTime, doc, to_bson};

#[async_trait]
pub trait ResetTokenStore: Send + Sync {
    async fn insert(&self, token: &ResetToken) -> Result<(), AppError>;
    /// 取出并删除匹配的令牌（一次性），created_at 早于 not_before 视为过期
    async fn take(&self, account_id: &str, token: &str, kind: TokenKind, not_before: DateTime) -> Result<Option<ResetToken>, AppError>;
}

#[derive(Debug, Clone)]
pub struct ResetTokenService {
    pub dao: BaseRepository<ResetToken>,
}

impl ResetTokenService {
    pub fn new(db: &Database) -> Self {
        Self { dao: BaseRepository::new(db, "reset_token") }
    }
}

#[async_trait]
impl ResetTokenStore for ResetTokenService {
    async fn insert(&self, token: &ResetToken) -> Result<(), AppError> {
        self.dao.insert(token).await
    }

    async fn take(&self, account_id: &str, token: &str, kind: TokenKind, not_before: DateTime) -> Result<Option<ResetToken>, AppError> {
        let filter = doc! {
            "account_id": account_id,
            "token": token,
            "kind": to_bson(&kind)?,
            "created_at": { "$gte": not_before },
        };
        self.dao.find_one_and_delete(filter).await
    }
}
