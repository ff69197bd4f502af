//! Clients and translation helpers for external systems

pub mod auth;
pub mod database;
pub mod digitalocean;
pub mod secrets;
