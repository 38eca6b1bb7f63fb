use std::sync::Arc;
use tokio::net::TcpListener;

use curbcast::auth::JwtVerifier;
use curbcast::config::{Config, DEFAULT_JWT_SECRET};
use curbcast::state::AppState;
use curbcast::store::LoggingNotificationStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "curbcast=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env();
    print_banner(&config);

    if config.jwt_secret == DEFAULT_JWT_SECRET {
        tracing::warn!("CURBCAST_JWT_SECRET not set, using the development secret");
    }
    if config.service_key.is_none() {
        tracing::info!("CURBCAST_SERVICE_KEY not set, internal push API disabled");
    }

    let state = AppState::new(
        Arc::new(JwtVerifier::new(&config.jwt_secret)),
        Arc::new(LoggingNotificationStore),
        config.service_key.clone(),
        config.allowed_origins.clone(),
    );

    let app = curbcast::routes::router(state);

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .expect("failed to bind");

    let actual_port = listener
        .local_addr()
        .expect("failed to get local address")
        .port();
    eprintln!("  \x1b[32m→ listening on 0.0.0.0:{actual_port}\x1b[0m");
    eprintln!();

    axum::serve(listener, app).await.expect("server error");
}

fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");

    eprintln!();
    eprintln!("  \x1b[1;36mcurbcast\x1b[0m \x1b[2mv{version}\x1b[0m");
    eprintln!();
    eprintln!("  \x1b[2mport\x1b[0m         {}", config.port);
    eprintln!(
        "  \x1b[2morigins\x1b[0m      {}",
        config.allowed_origins.join(", ")
    );
    eprintln!(
        "  \x1b[2mpush api\x1b[0m     {}",
        if config.service_key.is_some() {
            "enabled"
        } else {
            "disabled"
        }
    );

    if config.jwt_secret == DEFAULT_JWT_SECRET {
        eprintln!();
        eprintln!("  \x1b[33m! development JWT secret in use\x1b[0m");
    }

    eprintln!();
}
