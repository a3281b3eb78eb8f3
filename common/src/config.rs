use config::Config;
use serde::Deserialize;

use crate::errors::AppError;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    pub database: Option<DatabaseConfig>,
    pub auth: Option<AuthConfig>,
    pub push: Option<PushConfig>,
    pub sweep: Option<SweepConfig>,
    pub sys: Option<SysConfig>,
    pub mail: Option<MailConfig>,
}

impl AppConfig {
    /// 读取配置文件，并允许 `APP_` 前缀的环境变量覆盖（如 `APP_AUTH__JWT_SECRET`）
    pub fn new(file: &str) -> Result<Self, AppError> {
        let config = Config::builder()
            .add_source(config::File::with_name(file).required(true))
            .add_source(config::Environment::with_prefix("APP").prefix_separator("_").separator("__"))
            .build()
            .map_err(|e| AppError::Internal(format!("config.build: {}", e)))?;
        let cfg = config
            .try_deserialize::<AppConfig>()
            .map_err(|e| AppError::Internal(format!("config.deserialize: {}", e)))?;
        cfg.get_auth().check()?;
        Ok(cfg)
    }

    pub fn get_database(&self) -> DatabaseConfig {
        self.database.clone().unwrap_or_default()
    }
    pub fn get_auth(&self) -> AuthConfig {
        self.auth.clone().unwrap_or_default()
    }
    pub fn get_push(&self) -> PushConfig {
        self.push.clone().unwrap_or_default()
    }
    pub fn get_sweep(&self) -> SweepConfig {
        self.sweep.clone().unwrap_or_default()
    }
    pub fn get_sys(&self) -> SysConfig {
        self.sys.clone().unwrap_or_default()
    }
    pub fn get_mail(&self) -> MailConfig {
        self.mail.clone().unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub db_name: String,
}
impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: "mongodb://127.0.0.1:27017".to_string(), db_name: "troop".to_string() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    //会话 JWT 签名密钥
    pub jwt_secret: String,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_reset_ttl")]
    pub reset_token_ttl_secs: u64,
}
fn default_session_ttl() -> u64 {
    55 * 24 * 3600
}
/// 重置令牌集合上 TTL 索引的过期时间，配置的有效期不能超过它
pub const MAX_RESET_TOKEN_TTL_SECS: u64 = 3600;

fn default_reset_ttl() -> u64 {
    MAX_RESET_TOKEN_TTL_SECS
}
impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            session_ttl_secs: default_session_ttl(),
            reset_token_ttl_secs: default_reset_ttl(),
        }
    }
}
impl AuthConfig {
    pub fn check(&self) -> Result<(), AppError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(AppError::Internal("auth.jwt_secret is required".to_string()));
        }
        if self.reset_token_ttl_secs == 0 || self.reset_token_ttl_secs > MAX_RESET_TOKEN_TTL_SECS {
            return Err(AppError::Internal(format!(
                "auth.reset_token_ttl_secs must be within 1..={}",
                MAX_RESET_TOKEN_TTL_SECS
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PushConfig {
    pub endpoint: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_push_timeout")]
    pub timeout_secs: u64,
    pub access_token: Option<String>,
}
fn default_chunk_size() -> usize {
    100
}
fn default_push_timeout() -> u64 {
    10
}
impl Default for PushConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://exp.host/--/api/v2/push/send".to_string(),
            chunk_size: default_chunk_size(),
            timeout_secs: default_push_timeout(),
            access_token: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SweepConfig {
    //扫描间隔（秒）
    pub interval_secs: u64,
    //认领租约，超时后其他节点可重新认领
    pub claim_lease_secs: i64,
}
impl Default for SweepConfig {
    fn default() -> Self {
        Self { interval_secs: 60, claim_lease_secs: 300 }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SysConfig {
    //全局日志级别
    pub log_level: String,
}
impl Default for SysConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    pub from_address: String,
    pub from_name: String,
}
impl Default for MailConfig {
    fn default() -> Self {
        Self { from_address: "info@example.com".to_string(), from_name: "Troop".to_string() }
    }
}
