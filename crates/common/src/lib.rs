//! `mcraw-common` — Shared types and errors for the mcraw reader crates.
//!
//! This crate is the foundation the container and codec crates depend on.
//! It defines the core abstractions:
//!
//! - **Types**: `Timestamp`, `Resolution`, `CfaPattern` (newtypes for safety)
//! - **Data flow**: `BufferOffset`, `AudioChunk` (index entries and payloads)
//! - **Errors**: `ContainerError`, `DecodeError` (thiserror-based)

pub mod error;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{ContainerError, DecodeError};
pub use types::{AudioChunk, BufferOffset, CfaPattern, Resolution, Timestamp};
