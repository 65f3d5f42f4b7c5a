use super::layout::Extent;
use super::scale::Scale;

const STEP_TOLERANCE: f64 = 1e-9;

/// Bounds the navigator enforces on `value_per_pixel`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleLimits {
    pub min: f64,
    pub max: f64,
}

impl ScaleLimits {
    pub fn clamp(self, value_per_pixel: f64) -> f64 {
        value_per_pixel.clamp(self.min, self.max)
    }
}

impl Default for ScaleLimits {
    fn default() -> Self {
        Self {
            min: 1e-6,
            max: 1e15,
        }
    }
}

/// Keeps `keep_value` under the pixel offset `at` while zooming.
///
/// `at` is measured from the viewport center, or from the left edge of a
/// viewport `within` pixels wide when that is given.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomAnchor {
    pub keep_value: f64,
    pub at: f64,
    pub within: Option<f64>,
}

impl ZoomAnchor {
    fn offset_from_center(self) -> f64 {
        match self.within {
            Some(width) => self.at - width / 2.0,
            None => self.at,
        }
    }
}

/// Scale, focal value and vertical scroll of one timeline view.
#[derive(Clone, Debug, PartialEq)]
pub struct Navigator {
    scale: Scale,
    focal_value: f64,
    v_scroll: f64,
    limits: ScaleLimits,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(Scale::UNIT, 0.0)
    }
}

impl Navigator {
    pub fn new(scale: Scale, focal_value: f64) -> Self {
        let mut navigator = Self {
            scale: Scale::UNIT,
            focal_value: 0.0,
            v_scroll: 0.0,
            limits: ScaleLimits::default(),
        };
        navigator.set_scale(scale.value_per_pixel());
        navigator.scroll_to_value(focal_value);
        navigator
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn focal_value(&self) -> f64 {
        self.focal_value
    }

    pub fn v_scroll(&self) -> f64 {
        self.v_scroll
    }

    /// Applies a new ratio after clamping; returns what was actually applied.
    pub fn set_scale(&mut self, value_per_pixel: f64) -> Scale {
        let requested = Scale::or_unit(value_per_pixel);
        self.scale = Scale::or_unit(self.limits.clamp(requested.value_per_pixel()));
        self.scale
    }

    pub fn zoom_in(&mut self, anchor: Option<ZoomAnchor>) -> Scale {
        let next = step_down(self.scale.value_per_pixel());
        self.zoom_to(next, anchor)
    }

    pub fn zoom_out(&mut self, anchor: Option<ZoomAnchor>) -> Scale {
        let next = step_up(self.scale.value_per_pixel());
        self.zoom_to(next, anchor)
    }

    fn zoom_to(&mut self, value_per_pixel: f64, anchor: Option<ZoomAnchor>) -> Scale {
        let applied = self.set_scale(value_per_pixel);
        if let Some(anchor) = anchor {
            self.focal_value = anchor.keep_value - applied.to_value(anchor.offset_from_center());
        }
        applied
    }

    /// Fits every item, including ranged extents, into `width` pixels.
    pub fn zoom_to_fit<T: Extent>(&mut self, items: &[T], width: f64) {
        let Some((min, max)) = bounds(items) else {
            return;
        };

        let span = max - min;
        if span == 0.0 {
            self.set_scale(1.0);
            self.focal_value = min;
            return;
        }

        self.set_scale(span / width);
        self.focal_value = min + span / 2.0;
    }

    pub fn scroll_to_first<T: Extent>(&mut self, items: &[T]) {
        self.focal_value = bounds(items).map(|(min, _)| min).unwrap_or(0.0);
    }

    pub fn scroll_to_value(&mut self, value: f64) {
        if value.is_finite() {
            self.focal_value = value;
        }
    }

    /// Moves the view so content follows a horizontal drag of `dx` pixels.
    pub fn pan_by_pixels(&mut self, dx: f64) {
        self.scroll_to_value(self.focal_value - self.scale.to_value(dx));
    }

    pub fn scroll_vertically(&mut self, dy: f64, max: f64) {
        self.v_scroll = (self.v_scroll + dy).clamp(0.0, max.max(0.0));
    }

    pub fn set_v_scroll(&mut self, v_scroll: f64) {
        if v_scroll.is_finite() {
            self.v_scroll = v_scroll.max(0.0);
        }
    }

    /// Axis value under a pixel offset from the left edge of a viewport.
    pub fn value_at_offset(&self, offset: f64, width: f64) -> f64 {
        self.focal_value + self.scale.to_value(offset - width / 2.0)
    }

    /// Pixel offset of a value from the left edge of a viewport.
    pub fn offset_of_value(&self, value: f64, width: f64) -> f64 {
        self.offset_of_pixels(self.scale.to_pixels(value) as f64, width)
    }

    /// Converts an absolute layout pixel into a viewport offset.
    pub fn offset_of_pixels(&self, pixels: f64, width: f64) -> f64 {
        pixels - self.scale.to_pixels(self.focal_value) as f64 + (width / 2.0).floor()
    }
}

fn bounds<T: Extent>(items: &[T]) -> Option<(f64, f64)> {
    items.iter().fold(None, |bounds, item| {
        let start = item.value();
        let end = start + item.length();
        Some(match bounds {
            Some((min, max)) => (f64::min(min, start), f64::max(max, end)),
            None => (start, end),
        })
    })
}

/// Splits a ratio into `multiple * 10^order` with `multiple` in `[1, 10)`.
fn decompose(value_per_pixel: f64) -> (f64, i32) {
    let mut order = value_per_pixel.log10().floor() as i32;
    let mut multiple = divide_by_power(value_per_pixel, order);
    if multiple + STEP_TOLERANCE >= 10.0 {
        multiple = divide_by_power(value_per_pixel, order + 1);
        order += 1;
    } else if multiple + STEP_TOLERANCE < 1.0 {
        multiple = divide_by_power(value_per_pixel, order - 1);
        order -= 1;
    }
    (multiple, order)
}

fn divide_by_power(value: f64, order: i32) -> f64 {
    if order >= 0 {
        value / 10f64.powi(order)
    } else {
        value * 10f64.powi(-order)
    }
}

fn compose(multiple: f64, order: i32) -> f64 {
    if order >= 0 {
        multiple * 10f64.powi(order)
    } else {
        multiple / 10f64.powi(-order)
    }
}

fn whole_multiple(multiple: f64) -> Option<f64> {
    let rounded = multiple.round();
    ((multiple - rounded).abs() < STEP_TOLERANCE).then_some(rounded)
}

fn step_down(value_per_pixel: f64) -> f64 {
    let (multiple, order) = decompose(value_per_pixel);
    match whole_multiple(multiple) {
        Some(whole) if whole <= 1.0 => compose(9.0, order - 1),
        Some(whole) => compose(whole - 1.0, order),
        None => compose(multiple.floor(), order),
    }
}

fn step_up(value_per_pixel: f64) -> f64 {
    let (multiple, order) = decompose(value_per_pixel);
    let next = whole_multiple(multiple).unwrap_or_else(|| multiple.floor()) + 1.0;
    if next >= 10.0 {
        compose(1.0, order + 1)
    } else {
        compose(next, order)
    }
}

#[cfg(test)]
mod tests {
    use super::{Navigator, ScaleLimits, ZoomAnchor};
    use crate::timeline::layout::Extent;
    use crate::timeline::scale::Scale;

    struct Point(f64, f64);

    impl Extent for Point {
        fn value(&self) -> f64 {
            self.0
        }

        fn length(&self) -> f64 {
            self.1
        }
    }

    #[test]
    fn zoom_in_walks_the_nice_sequence() {
        let mut navigator = Navigator::new(Scale::or_unit(9.0), 0.0);
        let mut seen = vec![navigator.scale().value_per_pixel()];
        for _ in 0..10 {
            seen.push(navigator.zoom_in(None).value_per_pixel());
        }
        assert_eq!(
            seen,
            vec![9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0, 0.9, 0.8]
        );
    }

    #[test]
    fn zoom_out_is_the_exact_inverse() {
        let mut navigator = Navigator::new(Scale::or_unit(0.8), 0.0);
        let mut seen = vec![navigator.scale().value_per_pixel()];
        for _ in 0..12 {
            seen.push(navigator.zoom_out(None).value_per_pixel());
        }
        assert_eq!(
            seen,
            vec![0.8, 0.9, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 20.0]
        );

        let mut back = navigator.clone();
        let mut reversed = Vec::new();
        for _ in 0..12 {
            reversed.push(back.zoom_in(None).value_per_pixel());
        }
        seen.pop();
        seen.reverse();
        assert_eq!(reversed, seen);
    }

    #[test]
    fn off_grid_ratios_snap_in_the_zoom_direction() {
        let mut navigator = Navigator::new(Scale::or_unit(2.5), 0.0);
        assert_eq!(navigator.zoom_in(None).value_per_pixel(), 2.0);

        let mut navigator = Navigator::new(Scale::or_unit(2.5), 0.0);
        assert_eq!(navigator.zoom_out(None).value_per_pixel(), 3.0);

        let mut navigator = Navigator::new(Scale::or_unit(95.0), 0.0);
        assert_eq!(navigator.zoom_out(None).value_per_pixel(), 100.0);
    }

    #[test]
    fn anchored_zoom_keeps_the_value_in_place() {
        let mut navigator = Navigator::new(Scale::or_unit(10.0), 1_000.0);
        let keep_value = navigator.value_at_offset(700.0, 1_000.0);
        assert_eq!(keep_value, 3_000.0);

        navigator.zoom_in(Some(ZoomAnchor {
            keep_value,
            at: 700.0,
            within: Some(1_000.0),
        }));
        assert_eq!(navigator.scale().value_per_pixel(), 9.0);
        assert_eq!(navigator.value_at_offset(700.0, 1_000.0), keep_value);

        navigator.zoom_out(Some(ZoomAnchor {
            keep_value: 50.0,
            at: 0.0,
            within: None,
        }));
        assert_eq!(navigator.focal_value(), 50.0);
    }

    #[test]
    fn zoom_to_fit_spans_items() {
        let mut navigator = Navigator::default();
        navigator.zoom_to_fit(&[Point(100.0, 0.0), Point(300.0, 100.0)], 100.0);
        assert_eq!(navigator.scale().value_per_pixel(), 3.0);
        assert_eq!(navigator.focal_value(), 250.0);
    }

    #[test]
    fn zoom_to_fit_zero_span_uses_unit_scale() {
        let mut navigator = Navigator::new(Scale::or_unit(40.0), 0.0);
        navigator.zoom_to_fit(&[Point(42.0, 0.0), Point(42.0, 0.0)], 800.0);
        assert_eq!(navigator.scale(), Scale::UNIT);
        assert_eq!(navigator.focal_value(), 42.0);

        navigator.zoom_to_fit(&[Point(0.0, 0.0), Point(10.0, 0.0)], 0.0);
        assert_eq!(navigator.scale(), Scale::UNIT);
    }

    #[test]
    fn scrolls_and_pans() {
        let mut navigator = Navigator::new(Scale::or_unit(2.0), 0.0);
        navigator.scroll_to_first(&[Point(30.0, 0.0), Point(-5.0, 0.0)]);
        assert_eq!(navigator.focal_value(), -5.0);

        navigator.scroll_to_first::<Point>(&[]);
        assert_eq!(navigator.focal_value(), 0.0);

        navigator.scroll_to_value(12.0);
        navigator.pan_by_pixels(3.0);
        assert_eq!(navigator.focal_value(), 6.0);

        navigator.scroll_to_value(f64::NAN);
        assert_eq!(navigator.focal_value(), 6.0);

        navigator.scroll_vertically(50.0, 20.0);
        assert_eq!(navigator.v_scroll(), 20.0);
        navigator.scroll_vertically(-80.0, 20.0);
        assert_eq!(navigator.v_scroll(), 0.0);
    }

    #[test]
    fn limits_clamp_the_applied_scale() {
        let mut navigator = Navigator::default();
        navigator.limits = ScaleLimits { min: 0.5, max: 20.0 };
        assert_eq!(navigator.set_scale(100.0).value_per_pixel(), 20.0);
        assert_eq!(navigator.set_scale(-1.0).value_per_pixel(), 1.0);
        assert_eq!(navigator.set_scale(0.1).value_per_pixel(), 0.5);
        assert_eq!(navigator.zoom_in(None).value_per_pixel(), 0.5);
    }

    #[test]
    fn offsets_convert_between_values_and_pixels() {
        let navigator = Navigator::new(Scale::or_unit(10.0), 500.0);
        assert_eq!(navigator.offset_of_value(500.0, 200.0), 100.0);
        assert_eq!(navigator.offset_of_value(600.0, 200.0), 110.0);
        assert_eq!(navigator.value_at_offset(110.0, 200.0), 600.0);
    }
}
