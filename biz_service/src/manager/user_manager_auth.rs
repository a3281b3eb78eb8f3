use crate::biz_service::Repositories;
use crate::biz_service::mail_service::{MailServiceTrait, render_reset_mail};
use crate::entitys::account_entity::Account;
use crate::entitys::reset_token_entity::{ResetToken, TokenKind};
use crate::manager::session_manager::SessionContext;
use crate::manager::token_codec::{TokenCodec, hash_password, verify_password};
use async_trait::async_trait;
use common::config::{AuthConfig, MailConfig};
use common::errors::AppError;
use common::util::common_utils::{build_id, build_uuid};
use common::util::date_util::now;
use common::util::validate::{validate_password, validate_phone};
use mongodb::bson::DateTime;
use std::sync::Arc;
use validator::Validate;

#[derive(Debug, Clone, Default, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub password_confirm: String,
    pub phone: Option<String>,
    pub push_address: Option<String>,
}

/// 登录/注册结果；不替客户端选择默认身份
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub account: Account,
    pub no_groups: bool,
}

impl AuthSession {
    fn new(token: String, account: Account) -> Self {
        let no_groups = account.memberships.is_empty();
        Self { token, account, no_groups }
    }
}

#[async_trait]
pub trait UserManagerAuthOpt: Send + Sync {
    /// 注册，两次密码不一致时不写入任何数据
    async fn signup(&self, request: SignupRequest) -> Result<AuthSession, AppError>;
    /// 邮箱不存在与密码错误返回同一错误
    async fn login(&self, email: &str, password: &str, push_address: Option<&str>) -> Result<AuthSession, AppError>;
    async fn change_password(&self, ctx: &SessionContext, old_password: &str, new_password: &str) -> Result<(), AppError>;
    /// 调用方看来总是成功
    async fn request_password_reset(&self, email: &str) -> Result<(), AppError>;
    /// 令牌一次性有效
    async fn reset_password(&self, email: &str, token: &str, new_password: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct UserManagerAuth {
    repos: Repositories,
    codec: TokenCodec,
    mail: Arc<dyn MailServiceTrait>,
    mail_config: MailConfig,
    reset_ttl_secs: u64,
}

impl UserManagerAuth {
    pub fn new(repos: Repositories, auth: &AuthConfig, mail: Arc<dyn MailServiceTrait>, mail_config: MailConfig) -> Self {
        Self { repos, codec: TokenCodec::new(auth), mail, mail_config, reset_ttl_secs: auth.reset_token_ttl_secs }
    }

    async fn issue_reset_token(&self, account: &Account) -> Result<(), AppError> {
        let token = ResetToken {
            id: build_id(),
            account_id: account.id.clone(),
            token: build_uuid(),
            kind: TokenKind::PasswordReset,
            created_at: DateTime::now(),
        };
        self.repos.reset_tokens.insert(&token).await?;
        let mail = render_reset_mail(&self.mail_config, &account.email, &account.name, &token.token);
        self.mail.send_mail(&mail).await?;
        Ok(())
    }
}

#[async_trait]
impl UserManagerAuthOpt for UserManagerAuth {
    async fn signup(&self, request: SignupRequest) -> Result<AuthSession, AppError> {
        request.validate()?;
        if request.password != request.password_confirm {
            return Err(AppError::PasswordMismatch);
        }
        if let Some(phone) = request.phone.as_deref() {
            validate_phone(phone)?;
        }

        let time = now();
        let account = Account {
            id: build_id(),
            name: request.name.trim().to_string(),
            email: request.email.trim().to_lowercase(),
            password_hash: hash_password(&request.password)?,
            phone: request.phone,
            push_address: request.push_address.filter(|a| !a.is_empty()),
            memberships: vec![],
            inbox: vec![],
            create_time: time,
            update_time: time,
        };
        self.repos.accounts.insert(&account).await?;
        log::info!("account {} signed up", account.id);

        let token = self.codec.issue(&account.id)?;
        Ok(AuthSession::new(token, account))
    }

    async fn login(&self, email: &str, password: &str, push_address: Option<&str>) -> Result<AuthSession, AppError> {
        let Some(mut account) = self.repos.accounts.find_by_email(email.trim()).await? else {
            return Err(AppError::InvalidCredentials);
        };
        if !verify_password(password, &account.password_hash) {
            return Err(AppError::InvalidCredentials);
        }

        if let Some(address) = push_address.filter(|a| !a.is_empty()) {
            if account.push_address.as_deref() != Some(address) {
                self.repos.accounts.set_push_address(&account.id, Some(address)).await?;
                account.push_address = Some(address.to_string());
            }
        }

        let token = self.codec.issue(&account.id)?;
        Ok(AuthSession::new(token, account))
    }

    async fn change_password(&self, ctx: &SessionContext, old_password: &str, new_password: &str) -> Result<(), AppError> {
        let account = ctx.require_account()?;
        if !verify_password(old_password, &account.password_hash) {
            return Err(AppError::InvalidCredentials);
        }
        validate_password(new_password)?;
        self.repos.accounts.set_password_hash(&account.id, &hash_password(new_password)?).await?;
        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), AppError> {
        match self.repos.accounts.find_by_email(email.trim()).await {
            Ok(Some(account)) => {
                if let Err(e) = self.issue_reset_token(&account).await {
                    log::error!("password reset for {} not delivered: {}", account.id, e);
                }
            }
            Ok(None) => log::debug!("password reset requested for unknown email"),
            Err(e) => log::error!("password reset lookup failed: {}", e),
        }
        Ok(())
    }

    async fn reset_password(&self, email: &str, token: &str, new_password: &str) -> Result<(), AppError> {
        validate_password(new_password)?;
        let Some(account) = self.repos.accounts.find_by_email(email.trim()).await? else {
            return Err(AppError::Unauthorized);
        };
        let not_before = DateTime::from_millis((now() - self.reset_ttl_secs as i64) * 1000);
        if self
            .repos
            .reset_tokens
            .take(&account.id, token, TokenKind::PasswordReset, not_before)
            .await?
            .is_none()
        {
            return Err(AppError::Unauthorized);
        }
        self.repos.accounts.set_password_hash(&account.id, &hash_password(new_password)?).await?;
        log::info!("account {} reset its password", account.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Fixture, auth_config};

    fn manager(fx: &Fixture) -> UserManagerAuth {
        UserManagerAuth::new(fx.repos.clone(), &auth_config(), fx.mail.clone(), MailConfig::default())
    }

    fn signup_request(email: &str, password: &str, confirm: &str) -> SignupRequest {
        SignupRequest {
            name: "Ann".to_string(),
            email: email.to_string(),
            password: password.to_string(),
            password_confirm: confirm.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_signup_success_has_no_groups() {
        let fx = Fixture::new();
        let session = manager(&fx).signup(signup_request("a@example.com", "password1", "password1")).await.unwrap();
        assert!(session.no_groups);
        assert!(session.account.memberships.is_empty());

        let stored = fx.repos.accounts.find_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(stored.id, session.account.id);
        assert_ne!(stored.password_hash, "password1");
        let ctx = fx.resolver().resolve(Some(&session.token), None).await;
        assert_eq!(ctx.require_account().unwrap().id, stored.id);
    }

    #[tokio::test]
    async fn test_signup_mismatch_writes_nothing() {
        let fx = Fixture::new();
        let err = manager(&fx).signup(signup_request("a@example.com", "password1", "password2")).await.unwrap_err();
        assert!(matches!(err, AppError::PasswordMismatch));
        assert!(fx.repos.accounts.find_by_email("a@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_signup_rejects_bad_input_and_duplicates() {
        let fx = Fixture::new();
        let auth = manager(&fx);
        assert!(matches!(auth.signup(signup_request("nope", "password1", "password1")).await, Err(AppError::Validation(_))));
        assert!(matches!(auth.signup(signup_request("a@example.com", "short", "short")).await, Err(AppError::Validation(_))));
        auth.signup(signup_request("a@example.com", "password1", "password1")).await.unwrap();
        let dup = auth.signup(signup_request("A@Example.com", "password1", "password1")).await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_login_is_uniform_on_failure_and_updates_push_address() {
        let fx = Fixture::new();
        let auth = manager(&fx);
        auth.signup(signup_request("a@example.com", "password1", "password1")).await.unwrap();

        let wrong = auth.login("a@example.com", "password2", None).await.unwrap_err();
        let unknown = auth.login("b@example.com", "password1", None).await.unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());

        let session = auth.login("A@example.com", "password1", Some("ExponentPushToken[new]")).await.unwrap();
        assert_eq!(session.account.push_address.as_deref(), Some("ExponentPushToken[new]"));
        let stored = fx.repos.accounts.find_by_id(&session.account.id).await.unwrap().unwrap();
        assert_eq!(stored.push_address.as_deref(), Some("ExponentPushToken[new]"));
    }

    #[tokio::test]
    async fn test_reset_token_is_single_use() {
        let fx = Fixture::new();
        let auth = manager(&fx);
        auth.signup(signup_request("a@example.com", "password1", "password1")).await.unwrap();

        auth.request_password_reset("a@example.com").await.unwrap();
        auth.request_password_reset("ghost@example.com").await.unwrap();
        let sent = fx.mail.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        let stored = fx.repos.accounts.find_by_email("a@example.com").await.unwrap().unwrap();
        let token = {
            let content = &sent[0].content;
            let start = content.find("password: ").unwrap() + "password: ".len();
            content[start..].split_whitespace().next().unwrap().to_string()
        };

        assert!(matches!(auth.reset_password("a@example.com", "wrong", "password9").await, Err(AppError::Unauthorized)));
        auth.reset_password("a@example.com", &token, "password9").await.unwrap();
        assert!(matches!(auth.reset_password("a@example.com", &token, "password8").await, Err(AppError::Unauthorized)));

        assert!(auth.login("a@example.com", "password9", None).await.is_ok());
        assert!(auth.login("a@example.com", "password1", None).await.is_err());
        assert!(fx.repos.accounts.find_by_id(&stored.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_expired_reset_token_rejected() {
        let fx = Fixture::new();
        let auth = manager(&fx);
        let session = auth.signup(signup_request("a@example.com", "password1", "password1")).await.unwrap();
        let stale = ResetToken {
            id: build_id(),
            account_id: session.account.id.clone(),
            token: "old".to_string(),
            kind: TokenKind::PasswordReset,
            created_at: DateTime::from_millis((now() - 7200) * 1000),
        };
        fx.repos.reset_tokens.insert(&stale).await.unwrap();
        assert!(matches!(auth.reset_password("a@example.com", "old", "password9").await, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_change_password_checks_old_password() {
        let fx = Fixture::new();
        let auth = manager(&fx);
        let session = auth.signup(signup_request("a@example.com", "password1", "password1")).await.unwrap();
        let ctx = fx.resolver().resolve(Some(&session.token), None).await;

        assert!(matches!(auth.change_password(&ctx, "nope", "password9").await, Err(AppError::InvalidCredentials)));
        auth.change_password(&ctx, "password1", "password9").await.unwrap();
        assert!(auth.login("a@example.com", "password9", None).await.is_ok());
    }
}
