// src/config/mod.rs

//! Graph description loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a description from disk (`loader.rs`).
//! - Validate invariants like unique producers and acyclicity (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_from_str};
pub use model::{ActionConfig, ArtifactConfig, ConfigFile, ConfigSection, RawConfigFile};
pub use validate::validate_config;
