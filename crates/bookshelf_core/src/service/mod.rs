//! Use-case services consumed by outer layers.
//!
//! # Responsibility
//! - Orchestrate change sets and adapter calls into use-case level APIs.
//! - Keep callers decoupled from the concrete storage backend.

pub mod book_service;
