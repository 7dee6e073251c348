//! digit-gauss math utilities.

pub mod math;

pub use math::error::{LinalgError, LinalgResult};
pub use math::gaussian::{mvn_log_pdf, support_tolerance, DegenerateGaussian, FullGaussian};
pub use math::normalize::*;
pub use math::spectral::{Spectrum, DEFAULT_RCOND};
pub use math::stable::*;
