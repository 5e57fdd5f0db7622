pub mod cache;
pub mod config;
pub mod errors;
pub mod health;
pub mod tree;

pub mod database;
pub mod server;
pub mod services;
