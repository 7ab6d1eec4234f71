use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub cache_timeout_ms: u64,
    pub user_cache_ttl_secs: u64,
    pub session_sweep_interval_secs: u64,
    pub secure_cookies: bool,
    pub ping_message: String,
    /// 未配置时 Google 登录不可用
    pub google_client_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            redis_url: None,
            server_host: "0.0.0.0".into(),
            server_port: 8080,
            api_base_uri: "/api".into(),
            cache_timeout_ms: 500,
            user_cache_ttl_secs: 3600,
            session_sweep_interval_secs: 3600,
            secure_cookies: false,
            ping_message: "pong".into(),
            google_client_id: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let defaults = Config::default();
        // 空字符串等同于未配置远程缓存
        let redis_url = env::var("REDIS_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let google_client_id = env::var("GOOGLE_CLIENT_ID")
            .ok()
            .filter(|id| !id.trim().is_empty());

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            redis_url,
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_or("SERVER_PORT", defaults.server_port),
            api_base_uri: env::var("API_BASE_URI").unwrap_or(defaults.api_base_uri),
            cache_timeout_ms: parse_or("CACHE_TIMEOUT_MS", defaults.cache_timeout_ms),
            user_cache_ttl_secs: parse_or("USER_CACHE_TTL", defaults.user_cache_ttl_secs),
            session_sweep_interval_secs: parse_or(
                "SESSION_SWEEP_INTERVAL",
                defaults.session_sweep_interval_secs,
            ),
            secure_cookies: parse_or("SECURE_COOKIES", defaults.secure_cookies),
            ping_message: env::var("PING_MESSAGE").unwrap_or(defaults.ping_message),
            google_client_id,
        })
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }

    /// `None` 表示关闭后台清理
    pub fn session_sweep_interval(&self) -> Option<Duration> {
        (self.session_sweep_interval_secs > 0)
            .then(|| Duration::from_secs(self.session_sweep_interval_secs))
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value for {}, using default", key);
            default
        }),
        Err(_) => default,
    }
}
