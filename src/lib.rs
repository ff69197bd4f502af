//! DigitalOcean Database Kubernetes Operator
//!
//! This operator reconciles DODatabaseCluster custom resources against the
//! DigitalOcean Managed Databases API.

pub mod clients;
pub mod config;
pub mod controllers;
pub mod crd;
pub mod error;
pub mod managed;
pub mod metrics;
pub mod reconcilers;

pub use error::{Error, Result};
