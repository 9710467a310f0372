//! Session handling
//!
//! - [`cookie`] - cookie policy, issuance and extraction
//! - [`store`] - the external session store client
//! - [`validator`] - authoritative session validation

pub mod cookie;
pub mod store;
pub mod validator;

pub use cookie::{CookieFactory, CookiePolicy, CookiePolicyBuilder, SESSION_COOKIE_NAME};
pub use store::{HttpSessionStore, SessionStore};
pub use validator::{SessionOutcome, SessionValidator};
