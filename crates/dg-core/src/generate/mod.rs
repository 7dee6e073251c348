//! Generative path: draw class-conditional vectors and map them to pixels.

pub mod sampler;

pub use sampler::{mean_image, rescale, sample_class};
