//! Configuration for pixgpu
//!
//! This module contains data structures for:
//! - Component descriptors (what gets installed, pinned versions)
//! - Settings (paths, timeouts, optional `--config` YAML overrides)

pub mod component;
pub mod settings;

// Re-export commonly used types
pub use component::{ArtifactKind, ArtifactSource, Component, ComponentDescriptor};
pub use settings::Settings;
