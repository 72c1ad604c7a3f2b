//! # Accounts API Library
//!
//! This library provides the core functionality for the Accounts API service:
//! credential authentication, client signup provisioning, and user management.

pub mod accounts;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod password;
pub mod repositories;
pub mod server;
pub mod telemetry;
pub mod token;
pub use migration;
