// HTTP request handlers for the edge gateway
pub mod gateway;
pub mod health;
pub mod proxy;
pub mod session;

pub use gateway::gateway;
pub use health::health;
pub use proxy::forward_upstream;
pub use session::{auth_preflight, issue_session, refresh_session, sign_out};
