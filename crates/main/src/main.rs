//! 主应用程序入口
//!
//! 启动 Axum Web API 服务。

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use application::{
    ChatCoordinator, IdentityVerifier, SessionRegistry, StatsService, SystemClock, TokenIssuer,
    UserService, UserServiceDependencies,
};
use config::AppConfig;
use infrastructure::{
    create_pool, BcryptPasswordHasher, JwtAuthService, PgMessageRepository, PgUserRepository,
};
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env_with_defaults();
    if let Err(err) = config.validate() {
        tracing::warn!(error = %err, "配置校验未通过，仅适用于开发环境");
    }

    tracing::info!(
        "连接数据库: {}",
        config.database.url.split('@').next_back().unwrap_or("unknown")
    );

    let pg_pool = create_pool(&config.database.url, config.database.max_connections).await?;

    // 运行迁移
    sqlx::migrate!("../../migrations").run(&pg_pool).await?;

    // 仓储
    let user_repository: Arc<dyn domain::UserRepository> =
        Arc::new(PgUserRepository::new(pg_pool.clone()));
    let message_repository: Arc<dyn domain::MessageRepository> =
        Arc::new(PgMessageRepository::new(pg_pool));

    // 外部适配器
    let password_hasher: Arc<dyn application::PasswordHasher> =
        Arc::new(BcryptPasswordHasher::new(config.server.bcrypt_cost));
    let clock: Arc<dyn application::Clock> = Arc::new(SystemClock);
    let auth_service = Arc::new(JwtAuthService::new(
        config.jwt.clone(),
        user_repository.clone(),
    ));

    // 应用层服务
    let user_service = Arc::new(UserService::new(UserServiceDependencies {
        user_repository: user_repository.clone(),
        password_hasher,
        clock: clock.clone(),
    }));
    let stats_service = Arc::new(StatsService::new(
        user_repository.clone(),
        message_repository.clone(),
    ));

    // 会话注册表与广播协调器
    let registry = Arc::new(SessionRegistry::new());
    let coordinator = Arc::new(ChatCoordinator::new(
        registry,
        message_repository,
        clock,
        Duration::from_secs(config.realtime.op_timeout_secs),
    ));

    let state = AppState::new(
        user_service,
        stats_service,
        coordinator,
        auth_service.clone() as Arc<dyn IdentityVerifier>,
        auth_service as Arc<dyn TokenIssuer>,
        config.realtime.clone(),
    );

    // 启动 Web 服务器
    let app = router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("聊天服务器启动在 http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
