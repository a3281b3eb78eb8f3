use biz_service::Repositories;
use biz_service::biz_service::push_service::ExpoPushService;
use biz_service::manager::notification_manager::NotificationDispatcher;
use biz_service::manager::reminder_job::ReminderSweep;
use common::config::AppConfig;
use common::db::init_db;
use log::{LevelFilter, info, warn};
use std::str::FromStr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 读取配置文件
    let config_file = std::env::var("APP_CONFIG").unwrap_or_else(|_| "job-config.toml".to_string());
    let config = AppConfig::new(&config_file)?;
    //初始化日志
    init_log(&config);
    info!("reminder job starting with {}", config_file);

    let db = init_db(&config.get_database()).await?;
    let repos = Repositories::mongo(&db).await?;

    let push = ExpoPushService::new(config.get_push())?;
    let dispatcher = NotificationDispatcher::new(repos.clone(), Arc::new(push));
    let sweep_config = config.get_sweep();
    let handle = ReminderSweep::new(repos, dispatcher, &sweep_config).start(sweep_config.interval_secs);

    tokio::signal::ctrl_c().await?;
    warn!("shutdown requested, stopping reminder sweep");
    handle.abort();
    Ok(())
}

pub fn init_log(config: &AppConfig) {
    let level = config.get_sys().log_level;
    let filter = LevelFilter::from_str(&level).unwrap_or(LevelFilter::Info);
    env_logger::Builder::new().filter(None, filter).init();
}
