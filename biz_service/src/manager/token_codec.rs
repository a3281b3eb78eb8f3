use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use common::config::AuthConfig;
use common::errors::AppError;
use common::util::date_util::now;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::entitys::reset_token_entity::TokenKind;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// 账号 ID
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
    pub kind: TokenKind,
}

/// 会话凭证编解码（HS256）
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl TokenCodec {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl_secs: config.session_ttl_secs,
        }
    }

    pub fn issue(&self, account_id: &str) -> Result<String, AppError> {
        let iat = now().max(0) as u64;
        let claims = Claims { sub: account_id.to_string(), iat, exp: iat + self.ttl_secs, kind: TokenKind::Session };
        encode(&Header::default(), &claims, &self.encoding).map_err(|e| AppError::Internal(format!("jwt.encode: {}", e)))
    }

    /// 校验签名与过期时间，且必须是会话类型
    pub fn verify(&self, token: &str) -> Option<Claims> {
        let claims = decode::<Claims>(token, &self.decoding, &Validation::default()).ok()?.claims;
        (claims.kind == TokenKind::Session).then_some(claims)
    }
}

/// argon2id 哈希，PHC 字符串格式
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password.hash: {}", e)))
}

/// 哈希格式损坏按不匹配处理
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(e) => {
            log::warn!("stored password hash unreadable: {}", e);
            false
        }
    }
}
