pub mod api;
pub mod config;
pub mod error;
pub mod repository;
pub mod retry;
pub mod routes;
pub mod service;
pub mod store;

#[cfg(test)]
mod test_support;

pub use api::Api;
pub use config::Config;
pub use routes::Route;
