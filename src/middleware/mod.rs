//! Cross-cutting request handling: client identification, session resolution, rate
//! limiting and response hardening.

pub mod ip;
pub mod rate_limit;
pub mod security_headers;
pub mod session;

pub use rate_limit::EndpointRateLimiter;
pub use session::CurrentUser;
