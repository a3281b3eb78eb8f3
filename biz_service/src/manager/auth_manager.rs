use crate::entitys::account_entity::{Membership, Role};
use crate::manager::session_manager::SessionContext;
use common::errors::AppError;
use strum_macros::Display;

/// 拒绝原因只用于日志，对外统一为 Unauthorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
enum Denial {
    Anonymous,
    NoActiveMembership,
    WrongRole,
    WrongTenant,
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Anonymous => AppError::Unauthenticated,
            _ => AppError::Unauthorized,
        }
    }
}

fn deny(ctx: &SessionContext, denial: Denial) -> AppError {
    let account_id = ctx.account.as_ref().map(|a| a.id.as_str()).unwrap_or("-");
    log::debug!("access denied for {}: {}", account_id, denial);
    denial.into()
}

/// 角色检查。required 为空时任何已登录账号都可通过；
/// 非空时必须有当前身份且角色在集合内。每次调用都重新判断
pub fn authorize<'a>(ctx: &'a SessionContext, required: &[Role]) -> Result<Option<&'a Membership>, AppError> {
    if !ctx.is_authenticated() {
        return Err(deny(ctx, Denial::Anonymous));
    }
    if required.is_empty() {
        return Ok(ctx.active_membership.as_ref());
    }
    let Some(membership) = ctx.active_membership.as_ref() else {
        return Err(deny(ctx, Denial::NoActiveMembership));
    };
    if !required.contains(&membership.role) {
        return Err(deny(ctx, Denial::WrongRole));
    }
    Ok(Some(membership))
}

/// 角色 + 租户检查：当前身份所属群组必须与目标资源一致
pub fn authorize_in_group<'a>(ctx: &'a SessionContext, required: &[Role], group_id: &str) -> Result<&'a Membership, AppError> {
    let membership = match authorize(ctx, required)? {
        Some(m) => m,
        None => return Err(deny(ctx, Denial::NoActiveMembership)),
    };
    if membership.group_id != group_id {
        return Err(deny(ctx, Denial::WrongTenant));
    }
    Ok(membership)
}
