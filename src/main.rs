#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use actix_web::{middleware::Logger, App, HttpServer};
use anyhow::Context;
use crossgate::{settings::GatewaySettings, GatewayComponents, VERSION};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = GatewaySettings::load().context("Failed to load settings")?;

    let components =
        GatewayComponents::from_settings(settings).context("Invalid gateway configuration")?;

    start_server(components).await
}

/// Start the gateway
///
/// # Errors
///
/// Returns an error if the server cannot bind or fails while running
async fn start_server(components: GatewayComponents) -> anyhow::Result<()> {
    let bind_address = components.settings.get_bind_address();
    print_startup_info(&bind_address, &components);

    HttpServer::new(move || {
        let components = components.clone();
        App::new()
            .wrap(Logger::default())
            .configure(move |cfg| components.configure(cfg))
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {bind_address}"))?
    .run()
    .await
    .context("Server error")
}

fn print_startup_info(bind_address: &str, components: &GatewayComponents) {
    let settings = &components.settings;
    log::info!("Starting crossgate {VERSION} on http://{bind_address}");
    log::info!("Environment: {:?}", settings.application.environment);
    log::info!("Session endpoints:");
    log::info!("  POST     /auth/session         - Issue the session cookie for a token");
    log::info!("  POST     /auth/session/refresh - Extend the session and re-issue the cookie");
    log::info!("  GET|POST /auth/sign_out        - Clear the session cookie");
    log::info!("  GET      /ping                 - Health check");
    log::info!("Guarded proxy:");
    log::info!("  ALL {{any path}} -> {}", settings.proxy.upstream_url);
    if let Some(api_upstream) = &settings.proxy.api_upstream_url {
        log::info!(
            "  ALL {}/* -> {api_upstream}",
            settings.routes.api_prefix.trim_end_matches('/')
        );
    }
}
