//! Agora API Gateway

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use agora_adapter_email::{EmailClient, EmailTemplate};
use agora_adapter_postgres::{PostgresConfig, create_pool};
use agora_auth_core::{Argon2PasswordHasher, TokenService};
use agora_bootstrap::{Shutdown, init_runtime, join_task};
use agora_config::{AppConfig, ConfigError};
use agora_gateway::{AppState, build_router, metrics_router};
use agora_identity::application::{AuthDependencies, AuthService};
use agora_identity::domain::repositories::{UserRepository, VerificationTokenRepository};
use agora_identity::domain::unit_of_work::UnitOfWorkFactory;
use agora_identity::infrastructure::cleanup::CleanupTask;
use agora_identity::infrastructure::notification::{NotificationDispatcher, VerificationMailer};
use agora_identity::infrastructure::persistence::memory::MemoryStore;
use agora_identity::infrastructure::persistence::postgres::{
    PostgresUnitOfWorkFactory, PostgresUserRepository, PostgresVerificationTokenRepository,
    run_migrations,
};
use agora_telemetry::init_metrics;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::{error, info, warn};

const CONFIG_DIR: &str = "config";

struct Stores {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn VerificationTokenRepository>,
    uow_factory: Arc<dyn UnitOfWorkFactory>,
    pool: Option<PgPool>,
}

async fn build_stores(config: &AppConfig) -> Result<Stores, Box<dyn std::error::Error>> {
    let Some(url) = &config.database.url else {
        warn!("No database url configured, using in-memory store");
        let store = MemoryStore::new();
        return Ok(Stores {
            users: store.users(),
            tokens: store.verification_tokens(),
            uow_factory: Arc::new(store),
            pool: None,
        });
    };

    let pool = create_pool(
        &PostgresConfig::new(url.expose_secret().as_str())
            .with_max_connections(config.database.max_connections),
    )
    .await?;

    let report = run_migrations(&pool).await?;
    info!(
        applied = report.applied_count(),
        "Database migrations complete"
    );

    Ok(Stores {
        users: Arc::new(PostgresUserRepository::new(pool.clone())),
        tokens: Arc::new(PostgresVerificationTokenRepository::new(pool.clone())),
        uow_factory: Arc::new(PostgresUnitOfWorkFactory::new(pool.clone())),
        pool: Some(pool),
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // 加载配置
    let config = AppConfig::load(CONFIG_DIR)?;
    config.validate()?;

    init_runtime(&config)?;
    let metrics = init_metrics()?;

    let shutdown = Shutdown::new();
    let stores = build_stores(&config).await?;

    // 激活邮件后台发送
    let mailer = VerificationMailer::new(
        Arc::new(EmailClient::new(&config.email)?),
        EmailTemplate::builtin()?,
        config.verification.base_url.clone(),
    );
    let (dispatcher, notification_handle) =
        NotificationDispatcher::start(mailer, config.email.queue_capacity, shutdown.token());

    // 过期令牌清理
    let cleanup = Arc::new(CleanupTask::new(
        stores.tokens.clone(),
        Duration::from_secs(config.verification.cleanup_interval_secs),
    ));
    let cleanup_handle = cleanup.start(shutdown.token());

    let session_ttl = i64::try_from(config.jwt.expires_in_secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| ConfigError::Invalid("jwt.expires_in_secs out of range".into()))?;
    let verification_ttl = chrono::Duration::try_hours(config.verification.token_ttl_hours)
        .ok_or_else(|| {
            ConfigError::Invalid("verification.token_ttl_hours out of range".into())
        })?;

    let token_service = TokenService::new(
        config.jwt.secret.expose_secret(),
        session_ttl,
        config.jwt.issuer.clone(),
    );

    let auth = AuthService::new(
        AuthDependencies {
            users: stores.users,
            uow_factory: stores.uow_factory,
            hasher: Arc::new(Argon2PasswordHasher::new()),
            token_service,
            notifier: Arc::new(dispatcher),
        },
        verification_ttl,
    )?;

    let mut state = AppState::new(Arc::new(auth));
    if let Some(pool) = stores.pool.clone() {
        state = state.with_pool(pool);
    }

    let app = build_router(state);

    // 启动服务器
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(%addr, "Starting gateway");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // 指标单独监听
    let metrics_addr: SocketAddr =
        format!("{}:{}", config.server.host, config.telemetry.metrics_port).parse()?;
    let metrics_listener = tokio::net::TcpListener::bind(metrics_addr).await?;
    info!(%metrics_addr, "Starting metrics listener");
    let metrics_shutdown = shutdown.token();
    let metrics_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(metrics_listener, metrics_router(metrics))
            .with_graceful_shutdown(async move { metrics_shutdown.cancelled().await })
            .await
        {
            error!(error = %e, "Metrics listener failed");
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().wait())
        .await?;

    // HTTP 停止后再结束后台任务
    shutdown.trigger();
    tokio::join!(
        join_task("notification", notification_handle),
        join_task("cleanup", cleanup_handle),
        join_task("metrics", metrics_handle),
    );

    if let Some(pool) = stores.pool {
        pool.close().await;
    }

    info!("Gateway stopped");
    Ok(())
}
