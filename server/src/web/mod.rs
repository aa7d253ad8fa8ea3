pub mod admin_api;
pub mod app_state;
pub mod auth_middleware;
pub mod client_ip;
pub mod error;
pub mod geo;
pub mod gif;
pub mod rate_limit;
pub mod rest_api;
pub mod router;
