/// 当前 Unix 秒时间戳
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
