//! Palaver, an in-memory multi-room chat backend for polling clients.
//!
//! All state lives in process memory behind per-structure synchronization;
//! a restart loses every room beyond the seeded default, every message,
//! every ban/effect, and all presence.

pub mod auth;
pub mod config;
pub mod engine;
pub mod web;
