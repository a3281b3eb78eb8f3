use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// 密码长度校验：最少8位
pub fn validate_password(pwd: &str) -> Result<(), ValidationError> {
    if pwd.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::new("password.too.short"));
    }
    Ok(())
}

/// 国际手机号校验（可接受 +86、+1、0086 格式）
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    lazy_static! {
        static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9]{7,20}$").expect("phone regex");
    }

    if PHONE_RE.is_match(phone) { Ok(()) } else { Err(ValidationError::new("phone.invalid")) }
}
