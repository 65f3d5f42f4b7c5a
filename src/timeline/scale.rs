/// Linear conversion between axis values and pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scale {
    value_per_pixel: f64,
}

impl Scale {
    pub const UNIT: Self = Self { value_per_pixel: 1.0 };

    /// Returns `None` unless the ratio is finite and positive.
    pub fn new(value_per_pixel: f64) -> Option<Self> {
        (value_per_pixel.is_finite() && value_per_pixel > 0.0).then_some(Self { value_per_pixel })
    }

    /// Falls back to one value per pixel for ratios that are NaN, infinite or non-positive.
    pub fn or_unit(value_per_pixel: f64) -> Self {
        Self::new(value_per_pixel).unwrap_or(Self::UNIT)
    }

    pub fn value_per_pixel(self) -> f64 {
        self.value_per_pixel
    }

    pub fn to_pixels(self, value: f64) -> i64 {
        (value / self.value_per_pixel).floor() as i64
    }

    pub fn to_value(self, pixels: f64) -> f64 {
        pixels * self.value_per_pixel
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::UNIT
    }
}
