// src/model/mod.rs

//! Build graph data model.
//!
//! - [`key`] holds the stable identities of graph nodes.
//! - [`artifact`] describes things actions produce and consume.
//! - [`action`] describes units of work and their rewinding capabilities.

pub mod action;
pub mod artifact;
pub mod key;

pub use action::{Action, RewindCapability};
pub use artifact::{ActionInput, Artifact, ArtifactKind};
pub use key::{ActionKey, NodeKey};
