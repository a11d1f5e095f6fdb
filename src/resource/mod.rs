//! Resource Module
//!
//! Talk file library and property files

pub mod library;
pub mod propfile;

pub use library::*;
pub use propfile::*;
