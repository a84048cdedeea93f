//! bomx - Bill of Materials extraction from product diagrams
//!
//! Sends a PNG/JPEG diagram with a fixed prompt to a multimodal model,
//! normalizes the reply into a list of part records and presents it as a
//! table with CSV and JSON exports.

pub mod cli;
pub mod core;
