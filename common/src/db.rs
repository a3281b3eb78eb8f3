use crate::config::DatabaseConfig;
use crate::errors::AppError;
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};

/// 建立 MongoDB 连接并 ping 一次，连接失败直接返回错误
pub async fn init_db(config: &DatabaseConfig) -> Result<Database, AppError> {
    let options = ClientOptions::parse(&config.url).await?;
    let client = Client::with_options(options)?;
    let db = client.database(&config.db_name);
    db.run_command(doc! { "ping": 1 }).await?;
    log::info!("MongoDB connected: {}", config.db_name);
    Ok(db)
}
