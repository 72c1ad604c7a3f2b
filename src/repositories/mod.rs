//! Repository layer for database operations.

pub mod client;
pub mod user;

pub use client::ClientRepository;
pub use user::{NewUser, UserRepository};
