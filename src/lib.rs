pub mod app;
pub mod common;
pub mod config;
pub mod router;
