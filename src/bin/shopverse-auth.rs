// ABOUTME: Server binary for the ShopVerse authentication service
// ABOUTME: Loads configuration, wires dependencies, and runs the HTTP server
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

use anyhow::Result;
use shopverse_auth::{
    account::AccountService,
    auth::SessionIssuer,
    config::environment::ServerConfig,
    database::Database,
    logging,
    mail::{SharedMailer, SmtpMailer},
    otp::OtpEngine,
    rate_limit::RateLimiter,
    routes::ServerResources,
    server::AuthServer,
    store,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env()?;

    logging::init_from_env()?;

    info!("Starting ShopVerse auth service");
    info!("{}", config.summary());

    let store = store::from_config(&store::StoreConfig::from_settings(&config.store)).await?;
    info!("Key-value store initialized");

    let database = Arc::new(Database::new(&config.database.url.to_connection_string()).await?);
    info!(
        "Database initialized: {}",
        config.database.url.to_connection_string()
    );

    let mailer: SharedMailer = Arc::new(SmtpMailer::new(&config.smtp)?);
    info!(smtp_host = %config.smtp.host, "SMTP mailer initialized");

    let issuer = Arc::new(SessionIssuer::new(&config.jwt));
    let otp = Arc::new(OtpEngine::new(
        store.clone(),
        config.otp.clone(),
        config.security.otp_hash_key.clone(),
    ));
    let limiter = Arc::new(RateLimiter::new(store.clone(), config.otp.clone()));

    let accounts = AccountService::new(
        database.clone(),
        otp,
        limiter,
        mailer,
        issuer.clone(),
        config.otp.ttl_secs,
    );

    let http_port = config.http_port;
    let resources = Arc::new(ServerResources::new(
        Arc::new(config),
        database,
        store,
        accounts,
        issuer,
    ));

    info!(port = http_port, "Auth service ready");
    AuthServer::new(resources).run(http_port).await?;

    Ok(())
}
