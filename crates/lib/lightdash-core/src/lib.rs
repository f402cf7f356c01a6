//! Core client and operations for lightdash-mcp.
//!
//! This crate owns the HTTP client for the Lightdash REST API, the control
//! plane that implements each tool operation on top of it, and the small
//! pure helpers those operations share (name resolution, result shaping,
//! filter merging and chart configuration checks).

pub mod chart_config;
pub mod client;
pub mod control;
pub mod filters;
pub mod models;
pub mod resolve;
pub mod results;
