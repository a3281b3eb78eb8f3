use crate::entitys::account_entity::Role;

/// 任意已登录账号
pub const ANY_ACCOUNT: &[Role] = &[];

/// 群组管理（创建活动、编辑群信息）
pub const GROUP_ADMINS: &[Role] = &[Role::Leader, Role::AssistantLeader, Role::SeniorMember];

/// 可回复活动的角色
pub const RSVP_ROLES: &[Role] = &[
    Role::Leader,
    Role::AssistantLeader,
    Role::SeniorMember,
    Role::SubGroupLeader,
    Role::AssistantSubGroupLeader,
    Role::Member,
    Role::Guardian,
    Role::AdultVolunteer,
];

/// Authorization 头前缀
pub const BEARER_PREFIX: &str = "Bearer ";

/// 旧版客户端未选择身份时发送的占位值
pub const UNDEFINED_SELECTOR: &str = "undefined";

pub const REMINDER_TITLE_PREFIX: &str = "Friendly reminder that ";
pub const REMINDER_TITLE_SUFFIX: &str = " happens tomorrow!";
