//! Scaling of Lab channels to and from the colorization network's range.

use ndarray::Array4;

/// Maps raw Lab channels to the unit-ish range the colorization graph was
/// trained on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorNormalizer {
    /// Lightness value mapped to zero.
    pub l_center: f32,
    /// Lightness span mapped to one.
    pub l_range: f32,
    /// Chrominance span mapped to one.
    pub ab_range: f32,
}

impl Default for ColorNormalizer {
    fn default() -> Self {
        Self {
            l_center: 50.0,
            l_range: 100.0,
            ab_range: 110.0,
        }
    }
}

impl ColorNormalizer {
    #[must_use]
    pub fn normalize_l(&self, lightness: &Array4<f32>) -> Array4<f32> {
        lightness.mapv(|l| (l - self.l_center) / self.l_range)
    }

    #[must_use]
    pub fn denormalize_l(&self, lightness: &Array4<f32>) -> Array4<f32> {
        lightness.mapv(|l| l.mul_add(self.l_range, self.l_center))
    }

    #[must_use]
    pub fn normalize_ab(&self, chroma: &Array4<f32>) -> Array4<f32> {
        chroma.mapv(|ab| ab / self.ab_range)
    }

    #[must_use]
    pub fn denormalize_ab(&self, chroma: &Array4<f32>) -> Array4<f32> {
        chroma.mapv(|ab| ab * self.ab_range)
    }
}
