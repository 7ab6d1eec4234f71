/// 用户缓存键前缀
const USER_PREFIX: &str = "user:";

/// 生成用户完整信息缓存键
pub fn user_key(user_id: &str) -> String {
    format!("{}{}", USER_PREFIX, user_id)
}

/// 生成用户公开资料缓存键
pub fn user_profile_key(user_id: &str) -> String {
    format!("{}{}:profile", USER_PREFIX, user_id)
}

/// 匹配某个用户所有缓存投影的模式
pub fn user_pattern(user_id: &str) -> String {
    format!("{}{}*", USER_PREFIX, user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_pattern_covers_every_projection() {
        let pattern = glob::Pattern::new(&user_pattern("42")).unwrap();
        assert!(pattern.matches(&user_key("42")));
        assert!(pattern.matches(&user_profile_key("42")));
        assert!(!pattern.matches(&user_key("7")));
    }
}
