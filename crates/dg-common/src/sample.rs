//! Validated 28x28 grayscale samples.

use schemars::{json_schema, JsonSchema, Schema, SchemaGenerator};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;

use crate::error::{Error, Result};

/// Width and height of a digit image.
pub const IMAGE_SIDE: usize = 28;
/// Pixels in a flattened image.
pub const SAMPLE_LEN: usize = IMAGE_SIDE * IMAGE_SIDE;
/// Largest pixel intensity.
pub const PIXEL_MAX: u8 = 255;

/// A flattened 28x28 image with every pixel in `0..=255`.
///
/// The only ways to build one validate length and range, so holders of a
/// `Sample` never re-check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Sample {
    pixels: Vec<u8>,
}

impl Sample {
    /// Validate raw integer pixel values.
    ///
    /// Length is checked before range, so a short sample with bad pixels
    /// reports the length.
    pub fn from_values(values: &[i64]) -> Result<Self> {
        if values.len() != SAMPLE_LEN {
            return Err(Error::SampleLength {
                actual: values.len(),
            });
        }
        let mut pixels = Vec::with_capacity(SAMPLE_LEN);
        for (index, &value) in values.iter().enumerate() {
            let pixel = u8::try_from(value).map_err(|_| Error::PixelOutOfRange { index, value })?;
            pixels.push(pixel);
        }
        Ok(Self { pixels })
    }

    /// Wrap pixels that are already in range; only the length can fail.
    pub fn from_pixels(pixels: Vec<u8>) -> Result<Self> {
        if pixels.len() != SAMPLE_LEN {
            return Err(Error::SampleLength {
                actual: pixels.len(),
            });
        }
        Ok(Self { pixels })
    }

    /// The all-black image.
    pub fn zeros() -> Self {
        Self {
            pixels: vec![0; SAMPLE_LEN],
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Pixels as floating-point features.
    pub fn to_f64(&self) -> Vec<f64> {
        self.pixels.iter().map(|&p| f64::from(p)).collect()
    }

    /// Row `r` of the 28x28 grid.
    pub fn row(&self, r: usize) -> Option<&[u8]> {
        self.pixels.chunks(IMAGE_SIDE).nth(r)
    }
}

impl<'de> Deserialize<'de> for Sample {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Vec::<i64>::deserialize(deserializer)?;
        Sample::from_values(&raw).map_err(D::Error::custom)
    }
}

impl JsonSchema for Sample {
    fn schema_name() -> Cow<'static, str> {
        "Sample".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "description": "Flattened 28x28 grayscale image",
            "type": "array",
            "items": { "type": "integer", "minimum": 0, "maximum": 255 },
            "minItems": SAMPLE_LEN,
            "maxItems": SAMPLE_LEN
        })
    }
}
