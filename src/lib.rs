pub mod auth;
pub mod cli;
pub mod config;
pub mod content;
pub mod database;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod maintenance;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod state;
pub mod storage;
pub mod upload;
