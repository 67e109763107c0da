//! Condition-node predicates.
//!
//! Comparisons follow loose, form-style semantics: numbers authored as text
//! compare numerically against numeric attributes, and list literals compare
//! as their comma-joined text. Anything that cannot be read as a number
//! (blank text, missing attributes, words) behaves as NaN, so ordering
//! comparisons against it are false rather than treated as zero.

use crate::accounts::Account;

use super::graph::{ConditionData, ConditionField, ConditionOperator, ConditionValue};

/// Account attribute as seen by a condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeValue<'a> {
    Number(f64),
    Text(&'a str),
    Missing,
}

impl<'a> AttributeValue<'a> {
    /// Reads an allow-listed field; `None` for fields conditions cannot see.
    pub fn resolve(account: &'a Account, field: &ConditionField) -> Option<Self> {
        let value = match field {
            ConditionField::DelinquencyBand => text(account.delinquency_band.as_deref()),
            ConditionField::CurrentBalance => number(account.outstanding_balance),
            ConditionField::DaysPastDue => number(account.days_in_arrears),
            ConditionField::DebtCategory => text(account.debt_category.as_deref()),
            ConditionField::Other(_) => return None,
        };
        Some(value)
    }

    fn to_number(self) -> f64 {
        match self {
            AttributeValue::Number(value) => value,
            AttributeValue::Text(raw) => parse_number(raw),
            AttributeValue::Missing => f64::NAN,
        }
    }

    fn to_text(self) -> Option<String> {
        match self {
            AttributeValue::Number(value) => Some(value.to_string()),
            AttributeValue::Text(raw) => Some(raw.to_string()),
            AttributeValue::Missing => None,
        }
    }

    fn loosely_equals(self, expected: &ConditionValue) -> bool {
        match (self, expected) {
            (AttributeValue::Missing, _) | (_, ConditionValue::Empty) => false,
            (actual, ConditionValue::List(_)) => {
                actual.loosely_equals(&ConditionValue::Text(value_text(expected)))
            }
            (AttributeValue::Number(actual), ConditionValue::Number(value)) => actual == *value,
            (AttributeValue::Number(actual), ConditionValue::Text(raw)) => {
                actual == parse_number(raw)
            }
            (AttributeValue::Text(actual), ConditionValue::Number(value)) => {
                parse_number(actual) == *value
            }
            (AttributeValue::Text(actual), ConditionValue::Text(raw)) => actual == raw.as_str(),
        }
    }
}

fn text(value: Option<&str>) -> AttributeValue<'_> {
    value.map(AttributeValue::Text).unwrap_or(AttributeValue::Missing)
}

fn number<'a>(value: Option<f64>) -> AttributeValue<'a> {
    value.map(AttributeValue::Number).unwrap_or(AttributeValue::Missing)
}

fn parse_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

fn value_number(value: &ConditionValue) -> f64 {
    match value {
        ConditionValue::Number(number) => *number,
        ConditionValue::Text(raw) => parse_number(raw),
        ConditionValue::List(items) if items.len() == 1 => value_number(&items[0]),
        ConditionValue::List(_) | ConditionValue::Empty => f64::NAN,
    }
}

fn value_text(value: &ConditionValue) -> String {
    match value {
        ConditionValue::Number(number) => number.to_string(),
        ConditionValue::Text(raw) => raw.clone(),
        ConditionValue::List(items) => items.iter().map(value_text).collect::<Vec<_>>().join(","),
        ConditionValue::Empty => String::new(),
    }
}

fn range_bounds(value: &ConditionValue) -> Option<(f64, f64)> {
    let (low, high) = match value {
        ConditionValue::List(items) if items.len() == 2 => {
            (value_number(&items[0]), value_number(&items[1]))
        }
        ConditionValue::Text(raw) => {
            let (low, high) = raw.split_once(',')?;
            (parse_number(low), parse_number(high))
        }
        _ => return None,
    };
    Some((low, high))
}

/// Evaluates a condition node's predicate against an account.
pub fn evaluate_condition(account: &Account, condition: &ConditionData) -> bool {
    let Some(actual) = AttributeValue::resolve(account, &condition.field) else {
        return false;
    };
    let expected = &condition.value;

    match &condition.operator {
        ConditionOperator::Equals => actual.loosely_equals(expected),
        ConditionOperator::NotEquals => !actual.loosely_equals(expected),
        ConditionOperator::GreaterThan => actual.to_number() > value_number(expected),
        ConditionOperator::LessThan => actual.to_number() < value_number(expected),
        ConditionOperator::Contains => match actual.to_text() {
            Some(_) if matches!(expected, ConditionValue::Empty) => false,
            Some(haystack) => haystack
                .to_lowercase()
                .contains(&value_text(expected).to_lowercase()),
            None => false,
        },
        ConditionOperator::Between => match range_bounds(expected) {
            Some((low, high)) => {
                let value = actual.to_number();
                low <= value && value <= high
            }
            None => false,
        },
        ConditionOperator::InList => match expected {
            ConditionValue::List(items) => items.iter().any(|item| actual.loosely_equals(item)),
            ConditionValue::Text(raw) => raw
                .split(',')
                .any(|item| actual.loosely_equals(&ConditionValue::Text(item.trim().to_string()))),
            ConditionValue::Number(_) => actual.loosely_equals(expected),
            ConditionValue::Empty => false,
        },
        ConditionOperator::IsEmpty => is_empty(actual),
        ConditionOperator::IsNotEmpty => !is_empty(actual),
        ConditionOperator::Other(_) => false,
    }
}

fn is_empty(value: AttributeValue<'_>) -> bool {
    match value {
        AttributeValue::Missing => true,
        AttributeValue::Text(raw) => raw.trim().is_empty(),
        AttributeValue::Number(_) => false,
    }
}
