pub mod auth;
pub mod bridge;
pub mod config;
pub mod error;
pub mod gateway;
pub mod routes;
pub mod state;
pub mod store;
