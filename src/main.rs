use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use social_backend::{
    AppState,
    cache::CacheStore,
    config::Config,
    database::{PgSessionRepository, PgUserRepository},
    oauth::GoogleTokenVerifier,
    router::create_router,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'social_backend';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    // 缓存不可用时自动退化为进程内缓存，不影响启动
    let cache = Arc::new(CacheStore::initialize(&config).await);

    let google_client_id = config.google_client_id.clone();

    // 设置应用状态
    let mut state = AppState::new(
        config,
        cache,
        Arc::new(PgUserRepository::new(pool.clone())),
        Arc::new(PgSessionRepository::new(pool)),
    );

    match google_client_id {
        Some(client_id) => {
            let verifier = GoogleTokenVerifier::new(client_id, Duration::from_secs(10))
                .expect("Failed to build Google token verifier");
            state = state.with_identity_verifier(Arc::new(verifier));
        }
        None => tracing::info!("GOOGLE_CLIENT_ID not configured, Google sign-in disabled"),
    }

    // 定期清理过期会话和过期的进程内缓存条目
    if let Some(interval) = state.config.session_sweep_interval() {
        let sweeper = state.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = sweeper.sessions.purge_expired().await {
                    tracing::error!("Failed to purge expired sessions: {}", e);
                }
                sweeper.cache.purge_expired().await;
            }
        });
    }

    let router = create_router(state.clone());

    // 开发模式下允许跨域
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    // 启动服务器
    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router,
    )
    .await
    .expect("Failed to start server");
}
