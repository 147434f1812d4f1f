//! Core data structures flowing through the `dreid-md` pipeline.
//!
//! - [`types`] – Elements and bond order classifications.
//! - [`metadata`] – Residue and chain annotations for biomolecular structures.
//! - [`structure`] – Atoms, bonds, box vectors and metadata as loaded from disk.
//! - [`system`] – The parameterized [`SimulationSystem`] with potentials and constraints.
//!
//! A [`Structure`] is what the loader produces and the analyzer consumes; a
//! [`SimulationSystem`] is what the builder produces and an engine consumes.
//!
//! [`Structure`]: structure::Structure
//! [`SimulationSystem`]: system::SimulationSystem

pub mod metadata;
pub mod structure;
pub mod system;
pub mod types;
