//! Parser layer
//! - spec.rs: package spec parsing (`[@scope/]name[@range]`)

pub mod spec;

pub use spec::{ANY_VERSION, PackageSpec, SpecError};
