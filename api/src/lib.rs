pub mod config;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod metrics;
pub mod observability;
pub mod rate_limit;
pub mod routes;
pub mod security_headers;
pub mod state;
pub mod validation;
