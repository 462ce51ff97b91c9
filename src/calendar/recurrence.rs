use crate::errors::RecurrenceError;
use serde::{Deserialize, Serialize};

/// Graph API recurrence pattern types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatternType {
    Daily,
    Weekly,
    AbsoluteMonthly,
    RelativeMonthly,
    AbsoluteYearly,
    RelativeYearly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

/// Week-of-month index for relative monthly/yearly patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekIndex {
    First,
    Second,
    Third,
    Fourth,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RangeType {
    EndDate,
    NoEnd,
    Numbered,
}

/// The repetition rule of a recurring event.
///
/// All type-specific fields are optional at the wire level; `validate`
/// enforces which ones each pattern type actually requires. `interval` is
/// signed so that out-of-range values reach validation instead of failing
/// at deserialization with an opaque message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrencePattern {
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<DayOfWeek>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_day_of_week: Option<DayOfWeek>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<WeekIndex>,
}

/// The temporal bound of a recurring series.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRange {
    #[serde(rename = "type")]
    pub range_type: RangeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_occurrences: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recurrence {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<RecurrencePattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<RecurrenceRange>,
}

/// Validate a recurrence specification against the structural rules the
/// Graph API enforces server-side, so the caller gets a readable message
/// instead of an opaque 400.
///
/// Rules are checked in a fixed order and the first violation wins:
/// pattern base fields, interval bound, pattern-type-specific fields, range
/// base fields, then range-type-specific fields. Pure function, no I/O.
pub fn validate(recurrence: &Recurrence) -> Result<(), RecurrenceError> {
    let pattern = recurrence
        .pattern
        .as_ref()
        .ok_or(RecurrenceError::MissingPatternBase)?;

    let interval = pattern
        .interval
        .ok_or(RecurrenceError::MissingPatternBase)?;

    if interval < 1 {
        return Err(RecurrenceError::IntervalTooSmall);
    }

    match pattern.pattern_type {
        PatternType::Daily => {}
        PatternType::Weekly => {
            if pattern.days_of_week.as_ref().map_or(true, Vec::is_empty) {
                return Err(RecurrenceError::WeeklyMissingDaysOfWeek);
            }
        }
        PatternType::AbsoluteMonthly => {
            if pattern.day_of_month.is_none() {
                return Err(RecurrenceError::AbsoluteMonthlyMissingDayOfMonth);
            }
        }
        PatternType::RelativeMonthly => {
            if pattern.days_of_week.is_none() || pattern.index.is_none() {
                return Err(RecurrenceError::RelativeMonthlyMissingFields);
            }
        }
        PatternType::AbsoluteYearly => {
            if pattern.day_of_month.is_none() || pattern.month.is_none() {
                return Err(RecurrenceError::AbsoluteYearlyMissingFields);
            }
        }
        PatternType::RelativeYearly => {
            if pattern.days_of_week.is_none()
                || pattern.index.is_none()
                || pattern.month.is_none()
            {
                return Err(RecurrenceError::RelativeYearlyMissingFields);
            }
        }
    }

    let range = recurrence
        .range
        .as_ref()
        .ok_or(RecurrenceError::MissingRangeBase)?;

    if range.start_date.as_deref().map_or(true, str::is_empty) {
        return Err(RecurrenceError::MissingRangeBase);
    }

    match range.range_type {
        RangeType::EndDate => {
            if range.end_date.as_deref().map_or(true, str::is_empty) {
                return Err(RecurrenceError::EndDateMissingEndDate);
            }
        }
        RangeType::Numbered => {
            // Zero counts as provided; only absence trips the presence rule
            let occurrences = range
                .number_of_occurrences
                .ok_or(RecurrenceError::NumberedMissingOccurrences)?;
            if occurrences < 1 {
                return Err(RecurrenceError::OccurrencesTooSmall);
            }
        }
        RangeType::NoEnd => {}
    }

    Ok(())
}
