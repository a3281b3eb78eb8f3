use crate::biz_const::{BEARER_PREFIX, UNDEFINED_SELECTOR};
use crate::biz_service::Repositories;
use crate::entitys::account_entity::{Account, Membership};
use crate::manager::notification_manager::compute_recipients;
use crate::manager::token_codec::TokenCodec;
use common::errors::AppError;
use common::util::common_utils::is_object_id;
use tokio::sync::OnceCell;

/// 单次请求的上下文：账号 + 当前身份，收件人列表按需计算并缓存
pub struct SessionContext {
    pub account: Option<Account>,
    pub active_membership: Option<Membership>,
    repos: Repositories,
    recipients: OnceCell<Vec<Account>>,
}

impl SessionContext {
    pub fn anonymous(repos: Repositories) -> Self {
        Self { account: None, active_membership: None, repos, recipients: OnceCell::new() }
    }

    pub fn repos(&self) -> &Repositories {
        &self.repos
    }

    pub fn is_authenticated(&self) -> bool {
        self.account.is_some()
    }

    pub fn require_account(&self) -> Result<&Account, AppError> {
        self.account.as_ref().ok_or(AppError::Unauthenticated)
    }

    pub fn require_membership(&self) -> Result<&Membership, AppError> {
        self.require_account()?;
        self.active_membership.as_ref().ok_or(AppError::Unauthorized)
    }

    pub fn memberships(&self) -> &[Membership] {
        self.account.as_ref().map(|a| a.memberships.as_slice()).unwrap_or(&[])
    }

    /// 除当前身份以外的其他身份，供客户端切换
    pub fn other_memberships(&self) -> Vec<&Membership> {
        let active_id = self.active_membership.as_ref().map(|m| m.id.as_str());
        self.memberships().iter().filter(|m| Some(m.id.as_str()) != active_id).collect()
    }

    /// 当前群组的通知收件人，同一请求内只计算一次
    pub async fn recipients(&self) -> Result<&[Account], AppError> {
        let Some(membership) = &self.active_membership else {
            return Ok(&[]);
        };
        let list = self
            .recipients
            .get_or_try_init(|| compute_recipients(&self.repos, &membership.group_id))
            .await?;
        Ok(list.as_slice())
    }
}

/// 凭证 + 身份选择器 -> SessionContext，任何失败都退化为匿名上下文
#[derive(Clone)]
pub struct SessionResolver {
    repos: Repositories,
    codec: TokenCodec,
}

impl SessionResolver {
    pub fn new(repos: Repositories, codec: TokenCodec) -> Self {
        Self { repos, codec }
    }

    pub async fn resolve(&self, authorization: Option<&str>, selector: Option<&str>) -> SessionContext {
        let mut ctx = SessionContext::anonymous(self.repos.clone());

        let Some(raw) = authorization.map(str::trim).filter(|s| !s.is_empty()) else {
            return ctx;
        };
        let token = raw.strip_prefix(BEARER_PREFIX).unwrap_or(raw).trim();
        let Some(claims) = self.codec.verify(token) else {
            log::debug!("credential rejected, continuing anonymous");
            return ctx;
        };

        let account = match self.repos.accounts.find_by_id(&claims.sub).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                log::debug!("account {} no longer exists, continuing anonymous", claims.sub);
                return ctx;
            }
            Err(e) => {
                log::warn!("account lookup failed for {}: {}", claims.sub, e);
                return ctx;
            }
        };

        ctx.active_membership = normalize_selector(selector).and_then(|id| account.membership(id).cloned());
        if ctx.active_membership.is_none() && selector.is_some() {
            log::debug!("account {} selector did not match any membership", account.id);
        }
        ctx.account = Some(account);
        ctx
    }
}

/// "undefined" 和格式不合法的值都视为未提供
fn normalize_selector(selector: Option<&str>) -> Option<&str> {
    selector.map(str::trim).filter(|s| *s != UNDEFINED_SELECTOR && is_object_id(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entitys::account_entity::Role;
    use crate::test_support::{Fixture, membership};

    #[tokio::test]
    async fn test_matching_selector_sets_active_membership() {
        let fx = Fixture::new();
        let m1 = membership("g1", Some("s1"), Role::Member);
        let m2 = membership("g2", None, Role::Guardian);
        let account = fx.account_with("a@example.com", vec![m1.clone(), m2.clone()], None).await;
        let token = fx.codec.issue(&account.id).unwrap();
        let header = format!("Bearer {}", token);

        for m in [&m1, &m2] {
            let ctx = fx.resolver().resolve(Some(&header), Some(&m.id)).await;
            assert_eq!(ctx.active_membership.as_ref(), Some(m));
            assert_eq!(ctx.other_memberships().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_non_matching_selector_leaves_membership_unset() {
        let fx = Fixture::new();
        let m1 = membership("g1", Some("s1"), Role::Leader);
        let account = fx.account_with("a@example.com", vec![m1], None).await;
        let token = fx.codec.issue(&account.id).unwrap();
        let stranger = common::util::common_utils::build_id();

        for selector in [Some(stranger.as_str()), Some("undefined"), Some("garbage"), None] {
            let ctx = fx.resolver().resolve(Some(&token), selector).await;
            assert!(ctx.is_authenticated());
            assert!(ctx.active_membership.is_none(), "selector {:?}", selector);
            assert!(matches!(ctx.require_membership(), Err(AppError::Unauthorized)));
        }
    }

    #[tokio::test]
    async fn test_bad_credentials_resolve_anonymous() {
        let fx = Fixture::new();
        let account = fx.account_with("a@example.com", vec![], None).await;
        let token = fx.codec.issue(&account.id).unwrap();
        let resolver = fx.resolver();

        assert!(!resolver.resolve(None, None).await.is_authenticated());
        assert!(!resolver.resolve(Some("Bearer nonsense"), None).await.is_authenticated());
        let tampered = format!("{}x", token);
        assert!(!resolver.resolve(Some(&tampered), None).await.is_authenticated());

        fx.repos.accounts.delete(&account.id).await.unwrap();
        let ctx = resolver.resolve(Some(&token), None).await;
        assert!(matches!(ctx.require_account(), Err(AppError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_zero_memberships_still_resolves() {
        let fx = Fixture::new();
        let account = fx.account_with("new@example.com", vec![], None).await;
        let token = fx.codec.issue(&account.id).unwrap();
        let ctx = fx.resolver().resolve(Some(&token), Some("undefined")).await;
        assert_eq!(ctx.require_account().unwrap().id, account.id);
        assert!(ctx.memberships().is_empty());
        assert!(ctx.recipients().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recipients_are_memoized_per_request() {
        let fx = Fixture::new();
        let group = fx.group_with(vec![("s1", vec![])]).await;
        let m = membership(&group.id, Some("s1"), Role::Leader);
        let leader = fx.account_with("l@example.com", vec![m.clone()], None).await;
        fx.repos.groups.add_member(&group.id, "s1", &leader.id).await.unwrap();

        let token = fx.codec.issue(&leader.id).unwrap();
        let ctx = fx.resolver().resolve(Some(&token), Some(&m.id)).await;
        assert_eq!(ctx.recipients().await.unwrap().len(), 1);

        let late = fx.account_with("late@example.com", vec![], None).await;
        fx.repos.groups.add_member(&group.id, "s1", &late.id).await.unwrap();
        assert_eq!(ctx.recipients().await.unwrap().len(), 1);
    }
}
