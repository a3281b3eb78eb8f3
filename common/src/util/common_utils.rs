use mongodb::bson::oid::ObjectId;
use uuid::Uuid;

/// 生成实体主键（ObjectId 十六进制字符串）
pub fn build_id() -> String {
    ObjectId::new().to_hex()
}

/// 是否为合法的实体主键
pub fn is_object_id(value: &str) -> bool {
    ObjectId::parse_str(value).is_ok()
}

/// 一次性随机凭证（重置密码等）
pub fn build_uuid() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_id_is_object_id() {
        let id = build_id();
        assert_eq!(id.len(), 24);
        assert!(is_object_id(&id));
        assert!(!is_object_id("undefined"));
        assert!(!is_object_id("zzzzzzzzzzzzzzzzzzzzzzzz"));
    }
}
