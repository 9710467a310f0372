//! Gateway assembly
//!
//! Builds every request-independent component once from settings and registers them, with
//! the routes, on an actix `App`.

use std::sync::Arc;

use actix_web::http::Method;
use actix_web::web;

use crate::cors::OriginAllowlist;
use crate::error::ConfigurationError;
use crate::guard::{RouteGuard, RouteTable};
use crate::handlers::{
    auth_preflight, gateway, health, issue_session, refresh_session, sign_out,
};
use crate::session::cookie::{CookieFactory, CookiePolicyBuilder};
use crate::session::store::{HttpSessionStore, SessionStore};
use crate::session::validator::SessionValidator;
use crate::settings::GatewaySettings;
use crate::utils::logging::LoggingHelper;

/// Everything the handlers share, built once at startup
///
/// All parts are immutable after construction and cheap to clone into each worker.
#[derive(Clone)]
pub struct GatewayComponents {
    pub settings: GatewaySettings,
    pub allowlist: OriginAllowlist,
    pub guard: RouteGuard,
    pub cookies: CookieFactory,
}

impl GatewayComponents {
    /// Build the components with the HTTP session store named in settings
    ///
    /// # Errors
    ///
    /// Returns an error if the origins, routes or store URL are misconfigured
    pub fn from_settings(settings: GatewaySettings) -> Result<Self, ConfigurationError> {
        let store = HttpSessionStore::new(&settings.session.store_url, settings.store_timeout())?;
        log::info!("Session store: {}", store.lookup_url());
        Self::with_store(settings, Arc::new(store))
    }

    /// Build the components around an arbitrary session store
    ///
    /// # Errors
    ///
    /// Returns an error if the origins or routes are misconfigured
    pub fn with_store(
        settings: GatewaySettings,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, ConfigurationError> {
        let environment = settings.application.environment;

        let allowlist = OriginAllowlist::from_settings(&settings)?;
        let routes = RouteTable::from_settings(&settings.routes)?;
        let validator = SessionValidator::new(store, settings.store_timeout());
        let cookies = CookieFactory::new(
            CookiePolicyBuilder::new(environment),
            settings.application.cookie_host.as_deref(),
            settings.session.max_age_hours,
        );

        LoggingHelper::log_cookie_policy(environment, cookies.fixed_policy());
        LoggingHelper::log_allowlist(&allowlist);

        Ok(Self {
            settings,
            allowlist,
            guard: RouteGuard::new(routes, validator),
            cookies,
        })
    }

    /// Register shared state and routes
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.settings.clone()))
            .app_data(web::Data::new(self.allowlist.clone()))
            .app_data(web::Data::new(self.guard.clone()))
            .app_data(web::Data::new(self.cookies.clone()));
        configure_services(cfg);
    }
}

/// Routes: session endpoints under `/auth`, health, and the guarded catch-all
pub fn configure_services(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/auth/session")
            .route(web::post().to(issue_session))
            .route(web::method(Method::OPTIONS).to(auth_preflight)),
    )
    .service(
        web::resource("/auth/session/refresh")
            .route(web::post().to(refresh_session))
            .route(web::method(Method::OPTIONS).to(auth_preflight)),
    )
    .service(
        web::resource("/auth/sign_out")
            .route(web::get().to(sign_out))
            .route(web::post().to(sign_out))
            .route(web::method(Method::OPTIONS).to(auth_preflight)),
    )
    .route("/ping", web::get().to(health))
    .default_service(web::route().to(gateway));
}
