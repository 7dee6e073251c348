//! Class-conditional sampling and min/max rescaling to pixel intensities.
//!
//! A draw is mapped to `[0, 255]` using its own range:
//! `floor((v - min) / (max - min) * 255)`. A constant vector has no range
//! and maps to all zeros.

use dg_common::{Error, Result, Sample, PIXEL_MAX, SAMPLE_LEN};
use rand::Rng;

use crate::inference::ClassStatistics;

/// Rescale a real-valued vector of length 784 to a valid [`Sample`].
pub fn rescale(values: &[f64]) -> Result<Sample> {
    if values.len() != SAMPLE_LEN {
        return Err(Error::SampleLength {
            actual: values.len(),
        });
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(Error::InternalComputation(
            "cannot rescale a non-finite vector".to_string(),
        ));
    }

    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    if range <= 0.0 || !range.is_finite() {
        return Ok(Sample::zeros());
    }

    let scale = f64::from(PIXEL_MAX);
    let pixels = values
        .iter()
        .map(|&v| ((v - min) / range * scale).floor().clamp(0.0, scale) as u8)
        .collect();
    Sample::from_pixels(pixels)
}

/// Draw one vector from the class Gaussian and rescale it.
pub fn sample_class<R: Rng + ?Sized>(stats: &ClassStatistics, rng: &mut R) -> Result<Sample> {
    let draw = stats.density().sample(rng);
    rescale(draw.as_slice())
}

/// The class mean, rescaled like a draw.
pub fn mean_image(stats: &ClassStatistics) -> Result<Sample> {
    rescale(stats.mean().as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::estimate;
    use dg_common::{Label, TrainingTable};
    use dg_math::DEFAULT_RCOND;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_rescale_spans_full_range() {
        let mut values = vec![1.0; SAMPLE_LEN];
        values[0] = -3.0;
        values[1] = 5.0;
        let s = rescale(&values).unwrap();
        assert_eq!(s.pixels()[0], 0);
        assert_eq!(s.pixels()[1], 255);
        // (1 - -3) / 8 * 255 = 127.5
        assert_eq!(s.pixels()[2], 127);
    }

    #[test]
    fn test_constant_vector_rescales_to_zeros() {
        let s = rescale(&vec![42.0; SAMPLE_LEN]).unwrap();
        assert_eq!(s, Sample::zeros());
    }

    #[test]
    fn test_rescale_rejects_wrong_length_and_nan() {
        assert!(matches!(
            rescale(&[0.0; 10]),
            Err(Error::SampleLength { actual: 10 })
        ));
        let mut values = vec![0.0; SAMPLE_LEN];
        values[7] = f64::NAN;
        assert!(matches!(
            rescale(&values),
            Err(Error::InternalComputation(_))
        ));
    }

    #[test]
    fn test_sample_class_is_seed_deterministic() {
        let mut table = TrainingTable::new();
        for v in [10, 40, 90, 120] {
            let mut values = vec![0; SAMPLE_LEN];
            values[0] = v;
            values[1] = 255 - v;
            values[2] = v / 2;
            table.push(Sample::from_values(&values).unwrap(), Label::new(1).unwrap());
        }
        let stats = estimate(&table, DEFAULT_RCOND).unwrap();
        let class = stats.get(Label::new(1).unwrap()).unwrap();

        let a = sample_class(class, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = sample_class(class, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.pixels().len(), SAMPLE_LEN);
    }

    #[test]
    fn test_mean_image_of_single_row_class() {
        let mut values = vec![0; SAMPLE_LEN];
        values[3] = 200;
        values[4] = 100;
        let mut table = TrainingTable::new();
        table.push(Sample::from_values(&values).unwrap(), Label::new(0).unwrap());
        let stats = estimate(&table, DEFAULT_RCOND).unwrap();
        let image = mean_image(stats.get(Label::new(0).unwrap()).unwrap()).unwrap();
        assert_eq!(image.pixels()[3], 255);
        assert_eq!(image.pixels()[4], 127);
        assert_eq!(image.pixels()[0], 0);
    }
}
