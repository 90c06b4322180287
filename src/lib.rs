// ABOUTME: Library crate for the architect consultation chat client, exposing the chat core for the binary and tests

pub mod api;
pub mod app;
pub mod chat;
pub mod config;
pub mod credentials;
pub mod error;
pub mod models;
pub mod transport;

pub use error::ChatError;
