//! Core data models for the media capture pipeline.
//!
//! These are plain values handed between the services and serialized
//! as JSON by the HTTP handlers.

pub mod media;
pub mod stats;
