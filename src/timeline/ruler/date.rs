use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, Utc,
};

use super::{LabelScheme, RulerLabel};
use crate::timeline::scale::Scale;

const SECOND: i64 = 1_000;
const MINUTE: i64 = 60 * SECOND;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
/// Average Gregorian month and year, used only to rank steps.
const MONTH: i64 = 2_629_746_000;
const YEAR: i64 = 31_556_952_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateUnit {
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

impl DateUnit {
    const ALL: [Self; 7] = [
        Self::Millisecond,
        Self::Second,
        Self::Minute,
        Self::Hour,
        Self::Day,
        Self::Month,
        Self::Year,
    ];

    pub fn millis(self) -> i64 {
        match self {
            Self::Millisecond => 1,
            Self::Second => SECOND,
            Self::Minute => MINUTE,
            Self::Hour => HOUR,
            Self::Day => DAY,
            Self::Month => MONTH,
            Self::Year => YEAR,
        }
    }

    fn multiples(self) -> &'static [i64] {
        match self {
            Self::Millisecond => &[1, 2, 5, 10, 20, 50, 100, 200, 500],
            Self::Second => &[1, 2, 5, 10, 15, 30],
            Self::Minute => &[1, 2, 3, 4, 5, 6, 10, 12, 15, 20, 30, 60],
            Self::Hour => &[1, 2, 3, 4, 6, 8, 12],
            Self::Day => &[1, 2, 3, 7, 14],
            Self::Month => &[1, 2, 3, 4, 6],
            Self::Year => &[1, 2, 5, 10, 20, 25, 50, 100],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateStep {
    pub unit: DateUnit,
    pub multiple: i64,
}

impl DateStep {
    pub fn approximate_millis(self) -> f64 {
        self.unit.millis() as f64 * self.multiple as f64
    }
}

/// Calendar-aware labels for epoch-millisecond axes, in a fixed offset.
#[derive(Clone, Debug)]
pub struct DateRuler {
    min_label_spacing: f64,
    offset: FixedOffset,
}

impl DateRuler {
    pub fn new(min_label_spacing: f64, offset: FixedOffset) -> Self {
        Self {
            min_label_spacing,
            offset,
        }
    }

    pub fn utc(min_label_spacing: f64) -> Self {
        Self::new(min_label_spacing, Utc.fix())
    }

    pub fn format_value(&self, value: f64) -> String {
        self.local(value)
            .map(|local| local.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default()
    }

    fn local(&self, value: f64) -> Option<NaiveDateTime> {
        if !value.is_finite() {
            return None;
        }
        DateTime::from_timestamp_millis(value.floor() as i64)
            .map(|utc| utc.with_timezone(&self.offset).naive_local())
    }

    fn to_millis(&self, local: NaiveDateTime) -> i64 {
        local.and_utc().timestamp_millis() - i64::from(self.offset.local_minus_utc()) * SECOND
    }

    fn align(&self, step: DateStep, first_value: f64) -> Option<NaiveDateTime> {
        let local = self.local(first_value)?;
        match step.unit {
            DateUnit::Month => {
                let index = month_index(local.date()).div_euclid(step.multiple) * step.multiple;
                month_start(index)
            }
            DateUnit::Year => {
                let year = i64::from(local.year()).div_euclid(step.multiple) * step.multiple;
                year_start(year)
            }
            unit => {
                let size = unit.millis() * step.multiple;
                let millis = local.and_utc().timestamp_millis().div_euclid(size) * size;
                DateTime::from_timestamp_millis(millis).map(|aligned| aligned.naive_utc())
            }
        }
    }

    fn advance(&self, step: DateStep, cursor: NaiveDateTime) -> Option<NaiveDateTime> {
        match step.unit {
            DateUnit::Month => month_start(month_index(cursor.date()) + step.multiple),
            DateUnit::Year => year_start(i64::from(cursor.year()) + step.multiple),
            unit => {
                cursor.checked_add_signed(TimeDelta::milliseconds(unit.millis() * step.multiple))
            }
        }
    }

    fn format(&self, step: DateStep, cursor: NaiveDateTime) -> String {
        let at_midnight = cursor.time() == NaiveTime::MIN;
        let pattern = match step.unit {
            DateUnit::Year => "%Y",
            DateUnit::Month => "%b %Y",
            DateUnit::Day => "%Y-%m-%d",
            _ if at_midnight => "%Y-%m-%d",
            DateUnit::Hour | DateUnit::Minute => "%H:%M",
            DateUnit::Second => "%H:%M:%S",
            DateUnit::Millisecond => "%H:%M:%S%.3f",
        };
        cursor.format(pattern).to_string()
    }
}

impl LabelScheme for DateRuler {
    type Step = DateStep;

    fn smallest_label_step(&self, scale: Scale) -> DateStep {
        let min_step = scale.to_value(self.min_label_spacing);
        for unit in DateUnit::ALL {
            for multiple in unit.multiples() {
                let step = DateStep {
                    unit,
                    multiple: *multiple,
                };
                if step.approximate_millis() >= min_step {
                    return step;
                }
            }
        }

        let mut multiple: i64 = 1_000;
        while (multiple as f64) * (YEAR as f64) < min_step {
            match multiple.checked_mul(10) {
                Some(next) => multiple = next,
                None => break,
            }
        }
        DateStep {
            unit: DateUnit::Year,
            multiple,
        }
    }

    fn step_value(&self, step: DateStep) -> f64 {
        step.approximate_millis()
    }

    fn labels(&self, count: usize, step: DateStep, first_value: f64) -> Vec<RulerLabel> {
        let mut labels = Vec::with_capacity(count);
        let Some(mut cursor) = self.align(step, first_value) else {
            return labels;
        };

        for _ in 0..count {
            labels.push(RulerLabel {
                text: self.format(step, cursor),
                value: self.to_millis(cursor) as f64,
            });
            match self.advance(step, cursor) {
                Some(next) => cursor = next,
                None => break,
            }
        }

        labels
    }
}

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn month_start(index: i64) -> Option<NaiveDateTime> {
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
    NaiveDate::from_ymd_opt(year, month, 1).map(|date| date.and_time(NaiveTime::MIN))
}

fn year_start(year: i64) -> Option<NaiveDateTime> {
    let year = i32::try_from(year).ok()?;
    NaiveDate::from_ymd_opt(year, 1, 1).map(|date| date.and_time(NaiveTime::MIN))
}
