use crate::biz_const::ANY_ACCOUNT;
use crate::biz_service::Repositories;
use crate::entitys::account_entity::{Membership, Role};
use crate::manager::auth_manager::authorize;
use crate::manager::session_manager::SessionContext;
use common::errors::AppError;
use common::util::common_utils::build_id;

/// 加入/退出群组时同步账号身份列表与小组成员列表（两步写 + 补偿）
#[derive(Clone)]
pub struct MembershipSync {
    repos: Repositories,
}

impl MembershipSync {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn join_group(
        &self,
        ctx: &SessionContext,
        group_id: &str,
        sub_group_id: Option<&str>,
        role: Role,
    ) -> Result<Membership, AppError> {
        authorize(ctx, ANY_ACCOUNT)?;
        let account = ctx.require_account()?;

        let group = self
            .repos
            .groups
            .find_by_id(group_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("group {}", group_id)))?;
        if let Some(sub_group_id) = sub_group_id {
            if group.sub_group(sub_group_id).is_none() {
                return Err(AppError::NotFound(format!("sub group {}", sub_group_id)));
            }
        }

        let membership = Membership {
            id: build_id(),
            group_id: group.id.clone(),
            sub_group_id: sub_group_id.map(str::to_string),
            role,
            group_number: group.number.clone(),
        };
        if !self.repos.accounts.push_membership(&account.id, &membership).await? {
            return Err(AppError::Conflict(format!("already a member of {}", group_id)));
        }

        if let Some(sub_group_id) = sub_group_id {
            let added = self.repos.groups.add_member(group_id, sub_group_id, &account.id).await;
            if !matches!(added, Ok(true)) {
                self.compensate_join(&account.id, &membership.id).await;
                return Err(match added {
                    Err(e) => e,
                    _ => AppError::NotFound(format!("sub group {}", sub_group_id)),
                });
            }
        }

        if role == Role::Leader {
            match self.repos.groups.set_leader(group_id, Some(&account.id)).await {
                Ok(true) => {}
                Ok(false) => log::warn!("group {} vanished before leader update", group_id),
                Err(e) => log::error!("leader update for group {} failed: {}", group_id, e),
            }
        }

        log::info!("account {} joined group {} as {}", account.id, group_id, role);
        Ok(membership)
    }

    async fn compensate_join(&self, account_id: &str, membership_id: &str) {
        if let Err(e) = self.repos.accounts.pull_membership(account_id, membership_id).await {
            log::error!("join compensation failed, membership {} of {} left dangling: {}", membership_id, account_id, e);
        }
    }

    pub async fn leave_group(&self, ctx: &SessionContext, membership_id: &str) -> Result<(), AppError> {
        authorize(ctx, ANY_ACCOUNT)?;
        let account = ctx.require_account()?;
        let membership = account
            .membership(membership_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("membership {}", membership_id)))?;

        if let Some(sub_group_id) = membership.sub_group_id.as_deref() {
            self.repos.groups.remove_member(&membership.group_id, sub_group_id, &account.id).await?;
        }

        let pulled = self.repos.accounts.pull_membership(&account.id, membership_id).await;
        if !matches!(pulled, Ok(true)) {
            if let Some(sub_group_id) = membership.sub_group_id.as_deref() {
                if let Err(e) = self.repos.groups.add_member(&membership.group_id, sub_group_id, &account.id).await {
                    log::error!("leave compensation failed for {} in {}: {}", account.id, membership.group_id, e);
                }
            }
            return Err(match pulled {
                Err(e) => e,
                _ => AppError::NotFound(format!("membership {}", membership_id)),
            });
        }

        if membership.role == Role::Leader {
            let group = self.repos.groups.find_by_id(&membership.group_id).await?;
            if group.is_some_and(|g| g.leader_id.as_deref() == Some(account.id.as_str())) {
                self.repos.groups.set_leader(&membership.group_id, None).await?;
            }
        }
        log::info!("account {} left group {}", account.id, membership.group_id);
        Ok(())
    }

    /// 群组成员 ID（去重，首次出现顺序）
    pub async fn group_members(&self, group_id: &str) -> Result<Vec<String>, AppError> {
        let group = self
            .repos
            .groups
            .find_by_id(group_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("group {}", group_id)))?;
        Ok(group.member_ids())
    }
}
