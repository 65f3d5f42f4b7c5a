mod date;
mod numeric;

pub use date::DateRuler;
pub use numeric::NumericRuler;

use super::scale::Scale;

/// Upper bound on labels produced for one viewport.
const MAX_LABELS: usize = 512;

pub const DEFAULT_LABEL_SPACING: f64 = 90.0;

#[derive(Clone, Debug, PartialEq)]
pub struct RulerLabel {
    pub text: String,
    pub value: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayType {
    Numeric,
    Date,
}

/// A way of choosing label steps and printing labels for one kind of axis.
pub trait LabelScheme {
    type Step: Copy;

    /// Smallest step whose on-screen width is at least the minimum label spacing.
    fn smallest_label_step(&self, scale: Scale) -> Self::Step;

    /// Nominal width of a step in axis units.
    fn step_value(&self, step: Self::Step) -> f64;

    /// `count` aligned labels starting at or before `first_value`.
    fn labels(&self, count: usize, step: Self::Step, first_value: f64) -> Vec<RulerLabel>;

    fn visible_labels(&self, scale: Scale, first_value: f64, width: f64) -> Vec<RulerLabel> {
        let step = self.smallest_label_step(scale);
        let span = scale.to_value(width.max(0.0));
        let count = (span / self.step_value(step)).ceil();
        let count = if count.is_finite() { count as usize + 2 } else { 2 };
        self.labels(count.min(MAX_LABELS), step, first_value)
    }
}

#[derive(Clone, Debug)]
pub enum Ruler {
    Numeric(NumericRuler),
    Date(DateRuler),
}

impl Ruler {
    pub fn for_display(display: DisplayType) -> Self {
        match display {
            DisplayType::Numeric => Self::Numeric(NumericRuler::new(DEFAULT_LABEL_SPACING)),
            DisplayType::Date => Self::Date(DateRuler::utc(DEFAULT_LABEL_SPACING)),
        }
    }

    pub fn display_type(&self) -> DisplayType {
        match self {
            Self::Numeric(_) => DisplayType::Numeric,
            Self::Date(_) => DisplayType::Date,
        }
    }

    pub fn visible_labels(&self, scale: Scale, first_value: f64, width: f64) -> Vec<RulerLabel> {
        match self {
            Self::Numeric(ruler) => ruler.visible_labels(scale, first_value, width),
            Self::Date(ruler) => ruler.visible_labels(scale, first_value, width),
        }
    }

    /// Text for a single value, used by hover readouts.
    pub fn format_value(&self, value: f64, scale: Scale) -> String {
        match self {
            Self::Numeric(ruler) => ruler.format_value(value, ruler.smallest_label_step(scale)),
            Self::Date(ruler) => ruler.format_value(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DisplayType, Ruler};
    use crate::timeline::scale::Scale;

    #[test]
    fn visible_labels_cover_the_viewport() {
        let ruler = Ruler::for_display(DisplayType::Numeric);
        let labels = ruler.visible_labels(Scale::UNIT, 30.0, 1_000.0);
        assert_eq!(labels.first().map(|label| label.value), Some(0.0));
        let last = labels.last().map(|label| label.value).unwrap_or_default();
        assert!(last >= 1_030.0);
        assert!(labels.windows(2).all(|pair| pair[1].value - pair[0].value == 100.0));
    }

    #[test]
    fn dispatches_by_display_type() {
        let ruler = Ruler::for_display(DisplayType::Date);
        assert_eq!(ruler.display_type(), DisplayType::Date);
        let labels = ruler.visible_labels(Scale::or_unit(86_400_000.0 / 100.0), 0.0, 400.0);
        assert_eq!(labels[0].text, "1970-01-01");
        assert_eq!(labels[1].text, "1970-01-02");
    }
}
