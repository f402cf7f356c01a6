//! MCP tool modules.
//!
//! Tools are grouped by Lightdash domain: projects and catalog, charts,
//! dashboards, dashboard tiles, query execution and spaces, plus contextual
//! help for building chart configurations.

pub mod catalog;
pub mod charts;
pub mod dashboards;
pub mod queries;
pub mod spaces;
pub mod tiles;
mod context;
