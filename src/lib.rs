//! Docshub: documentation hosting search and redirect service.
//!
//! The service indexes documentation projects and their built HTML pages into
//! a full-text index, answers faceted search queries over them, and evaluates
//! per-project redirect rules for incoming documentation paths.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod redirects;
pub mod registry;
pub mod search;
