//! Per-resource lifecycle adapters

pub mod database;
