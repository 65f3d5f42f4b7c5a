use super::{LabelScheme, RulerLabel};
use crate::timeline::scale::Scale;

const MULTIPLES: [f64; 4] = [1.0, 2.5, 5.0, 10.0];
const MAX_DECIMALS: usize = 12;

#[derive(Clone, Debug)]
pub struct NumericRuler {
    min_label_spacing: f64,
}

impl NumericRuler {
    pub fn new(min_label_spacing: f64) -> Self {
        Self { min_label_spacing }
    }

    pub fn format_value(&self, value: f64, step: f64) -> String {
        format_grouped(value, decimals_for(step))
    }
}

impl LabelScheme for NumericRuler {
    type Step = f64;

    fn smallest_label_step(&self, scale: Scale) -> f64 {
        let min_step = scale.to_value(self.min_label_spacing);
        let order = min_step.log10().floor() as i32;
        MULTIPLES
            .iter()
            .map(|multiple| scaled(*multiple, order))
            .find(|step| *step >= min_step)
            .unwrap_or_else(|| scaled(1.0, order + 1))
    }

    fn step_value(&self, step: f64) -> f64 {
        step
    }

    fn labels(&self, count: usize, step: f64, first_value: f64) -> Vec<RulerLabel> {
        let start = (first_value / step).floor();
        let decimals = decimals_for(step);
        (0..count)
            .map(|offset| {
                let value = (start + offset as f64) * step;
                RulerLabel {
                    text: format_grouped(value, decimals),
                    value,
                }
            })
            .collect()
    }
}

fn scaled(multiple: f64, order: i32) -> f64 {
    if order >= 0 {
        multiple * 10f64.powi(order)
    } else {
        multiple / 10f64.powi(-order)
    }
}

fn decimals_for(step: f64) -> usize {
    (0..MAX_DECIMALS)
        .find(|decimals| {
            let shifted = step * 10f64.powi(*decimals as i32);
            (shifted - shifted.round()).abs() <= 1e-9 * shifted.abs().max(1.0)
        })
        .unwrap_or(MAX_DECIMALS)
}

/// Formats with a fixed number of decimals and comma-grouped thousands.
pub fn format_grouped(value: f64, decimals: usize) -> String {
    let text = format!("{:.*}", decimals, value.abs());
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(text.len() + whole.len() / 3 + 1);
    let is_zero = text.chars().all(|ch| ch == '0' || ch == '.');
    if value.is_sign_negative() && !is_zero {
        grouped.push('-');
    }
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::{NumericRuler, format_grouped};
    use crate::timeline::ruler::LabelScheme;
    use crate::timeline::scale::Scale;

    #[test]
    fn picks_one_two_and_a_half_or_five() {
        let ruler = NumericRuler::new(80.0);
        assert_eq!(ruler.smallest_label_step(Scale::UNIT), 100.0);
        assert_eq!(ruler.smallest_label_step(Scale::or_unit(0.01)), 1.0);
        assert_eq!(NumericRuler::new(30.0).smallest_label_step(Scale::UNIT), 50.0);
        assert_eq!(NumericRuler::new(20.0).smallest_label_step(Scale::UNIT), 25.0);
        assert_eq!(NumericRuler::new(3.0).smallest_label_step(Scale::or_unit(0.1)), 0.5);
    }

    #[test]
    fn labels_align_to_the_step() {
        let ruler = NumericRuler::new(80.0);
        let labels = ruler.labels(3, 2.5, 3.0);
        let values = labels.iter().map(|label| label.value).collect::<Vec<_>>();
        let texts = labels.iter().map(|label| label.text.as_str()).collect::<Vec<_>>();
        assert_eq!(values, vec![2.5, 5.0, 7.5]);
        assert_eq!(texts, vec!["2.5", "5.0", "7.5"]);

        let negative = ruler.labels(2, 1_000.0, -1_500.0);
        assert_eq!(negative[0].text, "-2,000");
        assert_eq!(negative[1].text, "-1,000");
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(format_grouped(1_234_567.0, 0), "1,234,567");
        assert_eq!(format_grouped(-1_500.25, 2), "-1,500.25");
        assert_eq!(format_grouped(999.0, 0), "999");
        assert_eq!(format_grouped(-0.0, 1), "0.0");
        assert_eq!(format_grouped(0.25, 2), "0.25");
    }
}
