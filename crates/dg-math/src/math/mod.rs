//! Core math modules.

pub mod error;
pub mod gaussian;
pub mod normalize;
pub mod spectral;
pub mod stable;
