//! Registry access and release matching
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Registry   │────▶│   Matcher   │◀────│    Range    │
//! │  (fetch)    │     │  (select)   │     │ (satisfies) │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ Registries  │
//! │   (npm)     │
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`registry`]: Registry trait for fetching publish records
//! - [`registries`]: Concrete registry implementations
//! - [`matcher`]: Newest release within a range and a grace window
//! - [`range`]: npm range grammar
//! - [`error`]: Registry and release matching errors
//! - [`semver`]: Shared semver utilities
//! - [`types`]: Registry metadata and release records

pub mod error;
pub mod matcher;
pub mod range;
pub mod registries;
pub mod registry;
pub mod semver;
pub mod types;
