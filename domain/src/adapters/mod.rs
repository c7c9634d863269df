//! Test-only adapters that live inside the domain crate for convenience.
//!
//! These are intended purely for unit testing and local demos. The real CMS
//! adapter lives in the `kontent-client` crate.

pub mod memory;
