//! Wait for a package release to show up on a registry.
//!
//! Given one or more package specs (`name`, `@scope/name`, `name@1.x`, ...)
//! the crate polls the registry metadata endpoint until a version matching
//! the range, published no earlier than the grace window, appears.
//!
//! # Modules
//!
//! - [`parser`]: package spec parsing
//! - [`version`]: registry client, range grammar and release matching
//! - [`poll`]: poll loop with timeout racing
//! - [`action`]: commands run once a release is found
//! - [`output`]: report rendering
//! - [`config`]: invocation options and npm configuration
//! - [`cli`]: command line surface

pub mod action;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod parser;
pub mod poll;
pub mod version;
