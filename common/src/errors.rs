use mongodb::bson::ser::Error as BsonSerError;
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    // ==== 认证 / 授权 ====
    #[error("Unauthenticated")]
    Unauthenticated,

    /// 角色不符与跨租户统一为同一种拒绝，不对外暴露原因
    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Invalid email or password")]
    InvalidCredentials,

    // ==== 常规业务错误 ====
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    Validation(String),

    #[error("Passwords do not match")]
    PasswordMismatch,

    // ==== 系统错误 ====
    #[error("MongoDB error: {0}")]
    Mongo(#[from] MongoError),
    #[error("BSON error: {0}")]
    Bson(#[from] BsonSerError),
    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    /// 业务层拒绝（可直接返回给调用方），其余为基础设施故障
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AppError::Unauthenticated
                | AppError::Unauthorized
                | AppError::InvalidCredentials
                | AppError::NotFound(_)
                | AppError::Conflict(_)
                | AppError::Validation(_)
                | AppError::PasswordMismatch
        )
    }

    /// 唯一索引冲突（E11000）
    pub fn is_duplicate_key(&self) -> bool {
        match self {
            AppError::Mongo(e) => matches!(e.kind.as_ref(), ErrorKind::Write(WriteFailure::WriteError(w)) if w.code == 11000),
            _ => false,
        }
    }

    /// 对外展示的信息，系统错误统一隐藏细节
    pub fn public_message(&self) -> String {
        if self.is_rejection() {
            self.to_string()
        } else {
            log::error!("{:?}", self);
            "Service error".to_string()
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}
impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}
impl From<validator::ValidationError> for AppError {
    fn from(e: validator::ValidationError) -> Self {
        AppError::Validation(e.code.to_string())
    }
}
