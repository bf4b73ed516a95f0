//! Core library for skilltools
//!
//! This crate implements the **Functional Core** of the skilltools application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! - **`skilltools_core`** (this crate): pure transformation functions with zero I/O
//! - **`skilltools`**: configuration loading, HTTP calls and terminal output
//!
//! Every function here takes its inputs as arguments (including the merged
//! [`config::Config`]) and returns plain values, so it can be tested with
//! fixture data and no mocking.
//!
//! # Module Organization
//!
//! - [`format`]: Markdown ⇄ ADF (Cloud) and Markdown ⇄ storage XHTML (Data Center)
//! - [`query`]: combining a configured JQL/CQL scope with a user query
//! - [`defaults`]: filling creation fields from per-project and per-space defaults
//! - [`config`]: the configuration model and its file/environment/CLI layering
//! - [`atlassian`]: Jira and Confluence response transforms and request payloads
//!
//! # Example Usage
//!
//! ```rust
//! use skilltools_core::format::{to_markdown, to_target, DeploymentType};
//! use skilltools_core::query::effective_query;
//!
//! let target = to_target("# Title\n\nSome **bold** text", DeploymentType::Cloud);
//! assert_eq!(to_markdown(&target), "# Title\n\nSome **bold** text");
//!
//! let jql = effective_query(Some("status = Open"), Some("project = DEMO"));
//! assert_eq!(jql, "(project = DEMO) AND (status = Open)");
//! ```

pub mod atlassian;
pub mod config;
pub mod defaults;
pub mod format;
pub mod query;
