//! # Overview
//! "Modal" provides modal models: hierarchical state machine composites
//! whose states are refined by nested sub-models.  A modal model owns a
//! controller (the finite state machine) and any number of refinements,
//! each of which carries the same set of ports as the modal model itself.
//!
//! This repository contains:
//!
//! * Containment kernel, for named entities, ports, and relations with a
//! generation counter that tracks structural change.
//! * Port mirroring protocol, for keeping the ports of a modal model, its
//! controller, and its refinements identical under every structural edit.
//! * Causality analysis, for answering which outputs depend on which inputs
//! conservatively (across all states) or precisely (for the current state),
//! with a lazily invalidated per-state cache.
//! * Pre-built refinement actors, and a factory for registering custom ones.
//! * Editor facade, for driving modal models from JavaScript.
//!
//! Modal is compatible with a wide variety of compilation targets,
//! including WASM. Modal does not require nightly Rust.
pub mod causality;
pub mod editor;
pub mod kernel;
pub mod mirror;
pub mod models;
pub mod utils;
