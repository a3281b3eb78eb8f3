use crate::biz_service::Repositories;
use crate::entitys::notification_entity::Notification;
use crate::manager::session_manager::SessionContext;
use common::errors::AppError;

/// 账号自助操作：收件箱、推送地址、注销
#[derive(Clone)]
pub struct UserManager {
    repos: Repositories,
}

impl UserManager {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// 未读通知，按写入顺序
    pub async fn inbox(&self, ctx: &SessionContext) -> Result<Vec<Notification>, AppError> {
        let account_id = &ctx.require_account()?.id;
        match self.repos.accounts.find_by_id(account_id).await? {
            Some(account) => Ok(account.inbox),
            None => Err(AppError::Unauthenticated),
        }
    }

    /// 返回该通知是否存在
    pub async fn dismiss_notification(&self, ctx: &SessionContext, notification_id: &str) -> Result<bool, AppError> {
        let account = ctx.require_account()?;
        self.repos.accounts.pull_notification(&account.id, notification_id).await
    }

    pub async fn update_push_address(&self, ctx: &SessionContext, push_address: Option<&str>) -> Result<(), AppError> {
        let account = ctx.require_account()?;
        let address = push_address.map(str::trim).filter(|a| !a.is_empty());
        if !self.repos.accounts.set_push_address(&account.id, address).await? {
            return Err(AppError::NotFound(format!("account {}", account.id)));
        }
        Ok(())
    }

    /// 只能注销自己；其他记录中的引用保留，读取时按未知用户处理
    pub async fn delete_account(&self, ctx: &SessionContext) -> Result<bool, AppError> {
        let account = ctx.require_account()?;
        let deleted = self.repos.accounts.delete(&account.id).await?;
        if deleted {
            log::info!("account {} deleted", account.id);
        }
        Ok(deleted)
    }
}
