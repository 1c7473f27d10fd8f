//! HTTP server for the mailroom API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::config::{Config, ServerConfig};
use crate::db::RefreshTokenRepository;
use crate::media::ImageStorage;
use crate::{Database, MailroomError, Result};

use super::handlers::AppState;
use super::middleware::{JwtState, RateLimitState};
use super::router::create_router;

/// Token cleanup interval: 1 hour.
const CLEANUP_INTERVAL_SECS: u64 = 3600;

/// Web server for the API.
pub struct WebServer {
    addr: SocketAddr,
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    login_limiter: Arc<RateLimitState>,
    server_config: ServerConfig,
}

impl WebServer {
    /// Create a server from the loaded configuration.
    ///
    /// Fails when the listen address is malformed or the upload
    /// directory cannot be created.
    pub fn new(config: &Config, db: Database) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| {
                MailroomError::Config(format!(
                    "invalid listen address {}:{}: {e}",
                    config.server.host, config.server.port
                ))
            })?;

        let images = ImageStorage::from_config(&config.uploads)?;
        tracing::info!("Image storage initialized at: {}", config.uploads.path);

        Ok(Self {
            addr,
            app_state: Arc::new(AppState::new(db, images, &config.auth)),
            jwt_state: Arc::new(JwtState::new(
                &config.auth.jwt_secret,
                &config.auth.jwt_issuer,
            )),
            login_limiter: Arc::new(RateLimitState::new(config.server.login_rate_limit)),
            server_config: config.server.clone(),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Remove expired and revoked refresh tokens every hour.
    fn start_token_cleanup_task(db: Database) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));

            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;

                match RefreshTokenRepository::new(db.pool())
                    .cleanup_expired()
                    .await
                {
                    Ok(0) => tracing::debug!("No expired refresh tokens to clean up"),
                    Ok(count) => tracing::info!(
                        deleted_count = count,
                        "Cleaned up expired/revoked refresh tokens"
                    ),
                    Err(e) => tracing::warn!(error = %e, "Failed to cleanup refresh tokens"),
                }
            }
        });
    }

    async fn bind(self) -> std::io::Result<(TcpListener, axum::Router)> {
        let db = self.app_state.db.clone();
        let limiter = self.login_limiter.clone();

        let router = create_router(
            self.app_state,
            self.jwt_state,
            self.login_limiter,
            &self.server_config.cors_origins,
        );

        let listener = TcpListener::bind(self.addr).await?;

        // Background tasks start only after a successful bind
        Self::start_token_cleanup_task(db);
        limiter.start_cleanup_task();
        tracing::info!("Token cleanup task started (runs every hour)");

        Ok((listener, router))
    }

    /// Run the web server until it fails.
    pub async fn run(self) -> std::io::Result<()> {
        let (listener, router) = self.bind().await?;
        tracing::info!("Web server listening on http://{}", listener.local_addr()?);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }

    /// Run the server in the background and return the bound address.
    ///
    /// Useful for tests that bind to port 0.
    pub async fn run_with_addr(self) -> std::io::Result<SocketAddr> {
        let (listener, router) = self.bind().await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
