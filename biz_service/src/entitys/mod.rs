pub mod account_entity;
pub mod event_entity;
pub mod group_entity;
pub mod mail_entity;
pub mod notification_entity;
pub mod reset_token_entity;
