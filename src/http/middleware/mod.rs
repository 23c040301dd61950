//! Request pipeline wrappers shared by every route.

pub mod access_log;
pub mod timeout;

pub use access_log::access_log;
pub use timeout::request_timeout;
