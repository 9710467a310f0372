//! Session store oracle
//!
//! The store owns session records. This layer looks sessions up and, on an explicit refresh
//! request, asks the store to extend one; it never creates or deletes them.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

use crate::error::{ConfigurationError, StoreError};
use crate::models::Session;

/// Lookup interface of the external session store
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Look up the session a token denotes
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or answers with something unusable.
    /// `Ok(None)` means the store has no live session for this token.
    async fn lookup(&self, token: &str) -> Result<Option<Session>, StoreError>;

    /// Ask the store to extend the session a token denotes
    ///
    /// # Errors
    ///
    /// Same failure modes as [`SessionStore::lookup`].
    async fn refresh(&self, token: &str) -> Result<Option<Session>, StoreError>;
}

/// Session store reached over HTTP
///
/// `GET {base}/session` and `POST {base}/session/refresh`, token as bearer credential.
#[derive(Clone)]
pub struct HttpSessionStore {
    client: Client,
    lookup_url: Url,
    refresh_url: Url,
}

impl HttpSessionStore {
    /// Create a store client for `base_url`
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute http(s) URL
    pub fn new(base_url: &str, timeout: std::time::Duration) -> Result<Self, ConfigurationError> {
        let invalid = || ConfigurationError::InvalidStoreUrl(base_url.to_string());

        let mut base = Url::parse(base_url).map_err(|_| invalid())?;
        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(invalid());
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let lookup_url = base.join("session").map_err(|_| invalid())?;
        let refresh_url = base.join("session/refresh").map_err(|_| invalid())?;

        // The validator enforces its own deadline; this one bounds abandoned connections
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|_| invalid())?;

        Ok(Self {
            client,
            lookup_url,
            refresh_url,
        })
    }

    #[must_use]
    pub fn lookup_url(&self) -> &Url {
        &self.lookup_url
    }

    async fn read_session(
        response: reqwest::Response,
        token: &str,
    ) -> Result<Option<Session>, StoreError> {
        match response.status() {
            StatusCode::OK => {
                let body = response.bytes().await?;
                let mut session: Session = serde_json::from_slice(&body)
                    .map_err(|e| StoreError::Malformed(e.to_string()))?;
                if session.token.is_empty() {
                    token.clone_into(&mut session.token);
                }
                Ok(Some(session))
            }
            StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND | StatusCode::GONE => Ok(None),
            status => Err(StoreError::Unavailable(format!(
                "unexpected status {status}"
            ))),
        }
    }
}

#[async_trait]
impl SessionStore for HttpSessionStore {
    async fn lookup(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let response = self
            .client
            .get(self.lookup_url.clone())
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await?;
        Self::read_session(response, token).await
    }

    async fn refresh(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let response = self
            .client
            .post(self.refresh_url.clone())
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await?;
        Self::read_session(response, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_endpoint_urls() {
        let store = HttpSessionStore::new("https://sessions.example.com", Duration::from_secs(1))
            .unwrap();
        assert_eq!(
            store.lookup_url().as_str(),
            "https://sessions.example.com/session"
        );
        assert_eq!(
            store.refresh_url.as_str(),
            "https://sessions.example.com/session/refresh"
        );
    }

    #[test]
    fn test_endpoint_urls_keep_base_path() {
        let store =
            HttpSessionStore::new("http://internal:4000/auth/v1", Duration::from_secs(1)).unwrap();
        assert_eq!(
            store.lookup_url().as_str(),
            "http://internal:4000/auth/v1/session"
        );
    }

    #[test]
    fn test_rejects_invalid_base_urls() {
        for url in ["", "sessions.example.com", "ftp://sessions.example.com", "mailto:a@b.c"] {
            assert!(
                HttpSessionStore::new(url, Duration::from_secs(1)).is_err(),
                "url {url}"
            );
        }
    }

    /// Store stub answering by bearer token
    async fn stub_store(req: actix_web::HttpRequest) -> actix_web::HttpResponse {
        use actix_web::HttpResponse;

        let auth = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        match auth.trim_start_matches("Bearer ") {
            "live" => HttpResponse::Ok().json(serde_json::json!({
                "id": "s-1",
                "user_id": "u-1",
                "issued_at": "2026-01-01T00:00:00Z",
                "expires_at": "2026-01-02T00:00:00Z",
                "last_seen_at": "2026-01-01T12:00:00Z",
            })),
            "garbled" => HttpResponse::Ok().body("not json"),
            "broken" => HttpResponse::InternalServerError().finish(),
            _ => HttpResponse::Unauthorized().finish(),
        }
    }

    #[actix_web::test]
    async fn test_store_status_mapping() {
        use actix_web::{web, App, HttpServer};

        let server = HttpServer::new(|| App::new().default_service(web::to(stub_store)))
            .workers(1)
            .bind(("127.0.0.1", 0))
            .unwrap();
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());

        let store =
            HttpSessionStore::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();

        let session = store.lookup("live").await.unwrap().unwrap();
        assert_eq!(session.user_id, "u-1");
        // Token missing from the store's answer is filled in from the request
        assert_eq!(session.token, "live");
        assert!(store.refresh("live").await.unwrap().is_some());

        assert!(store.lookup("unknown").await.unwrap().is_none());
        assert!(matches!(
            store.lookup("garbled").await,
            Err(StoreError::Malformed(_))
        ));
        assert!(matches!(
            store.lookup("broken").await,
            Err(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_an_error() {
        // Port 9 (discard) on loopback is not expected to serve HTTP
        let store =
            HttpSessionStore::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        assert!(store.lookup("token").await.is_err());
    }
}
