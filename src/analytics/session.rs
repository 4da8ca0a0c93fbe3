//! 会话标识生成
//!
//! 每次页面加载生成一次：毫秒时间戳 + 随机字母数字后缀，
//! 无需鉴权即可关联同一会话的全部事件。

use chrono::Utc;

const SUFFIX_LEN: usize = 8;

/// 生成指定长度的随机字母数字串
fn random_suffix(length: usize) -> String {
    use std::iter;

    let chars = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

    iter::repeat_with(|| chars[rand::random_range(0..chars.len())] as char)
        .take(length)
        .collect()
}

/// 生成会话 ID，形如 `1709136000123-k3XbR9aZ`
pub fn generate_session_id() -> String {
    format!("{}-{}", Utc::now().timestamp_millis(), random_suffix(SUFFIX_LEN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_shape() {
        let id = generate_session_id();
        let (millis, suffix) = id.split_once('-').expect("id should contain a dash");
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_ne!(a, b);
    }
}
