pub mod auth;
pub mod cache;
pub mod config;
pub mod database;
pub mod exotel;
pub mod http;
pub mod logging;
pub mod models;
pub mod phone;

pub use database::init_database;
pub use models::AppState;
