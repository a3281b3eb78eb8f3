use common::index_trait::MongoIndexModelProvider;
use mongo_macro::MongoIndexModelProvider as MongoDeriveMongoIndex;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

/// 一次性令牌，created_at 上的 TTL 索引负责过期清理。
/// 索引时长须与 `MAX_RESET_TOKEN_TTL_SECS` 一致，配置校验保证有效期不超过它
#[derive(Debug, Clone, Serialize, Deserialize, MongoDeriveMongoIndex)]
#[mongo_index(fields["created_at"], expire_after(3600), name("ttl_reset_token"))]
#[mongo_index(fields["account_id"], name("idx_reset_token_account"))]
pub struct ResetToken {
    #[serde(rename = "_id")]
    pub id: String,
    pub account_id: String,
    pub token: String,
    pub kind: TokenKind,
    /// TTL 索引要求 BSON 日期类型
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Session,
    PasswordReset,
}
