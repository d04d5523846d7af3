//! doseview: client-side orchestration for a clinical-imaging demo server.
//!
//! Each user action runs one fetch → validate → shape → render pipeline
//! against explicit view regions, so everything is testable without a page.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod response;
pub mod shape;
pub mod transport;
pub mod view;
