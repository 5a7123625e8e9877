//! The editor module exposes modal models to JavaScript.  `WebModalModel`
//! wraps a `ModalModel` with an interface of strings, JSON, and YAML, so
//! that a browser-based editor can drive the mirroring protocol and query
//! causality without sharing Rust types.

pub mod web;

pub use self::web::WebModalModel;
