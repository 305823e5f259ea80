//! Compilation policy definitions.

pub mod v1;

pub use v1::{CompilePolicy, LabelSource, LabelSourceError};
