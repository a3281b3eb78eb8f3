pub mod auth_manager;
pub mod membership_manager;
pub mod notification_manager;
pub mod reminder_job;
pub mod roster_manager;
pub mod session_manager;
pub mod token_codec;
pub mod user_manager;
pub mod user_manager_auth;
