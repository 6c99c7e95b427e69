//! Craft Content Generation Service
//!
//! Turns a product photo and a few seller inputs into marketing copy. Requests
//! are served either synchronously or as queued jobs executed by a worker pool;
//! the content provider behind each request is chosen from a registry and
//! configured from layered settings.

pub mod app_state;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
