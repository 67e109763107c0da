use serde::{Deserialize, Serialize};

/// Ordinal delinquency bucket derived from days in arrears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelinquencyState {
    Current,
    Early,
    Moderate,
    Severe,
    Critical,
}

impl DelinquencyState {
    /// Bands days in arrears with inclusive upper bounds of 0, 30, 60 and 90.
    ///
    /// A missing or NaN figure fails every bound and falls through to
    /// `Critical`, the same way any other numeric threshold treats it.
    pub fn from_days(days_in_arrears: Option<f64>) -> Self {
        let Some(days) = days_in_arrears.filter(|days| !days.is_nan()) else {
            return Self::Critical;
        };

        if days <= 0.0 {
            Self::Current
        } else if days <= 30.0 {
            Self::Early
        } else if days <= 60.0 {
            Self::Moderate
        } else if days <= 90.0 {
            Self::Severe
        } else {
            Self::Critical
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DelinquencyState::Current => "current",
            DelinquencyState::Early => "early",
            DelinquencyState::Moderate => "moderate",
            DelinquencyState::Severe => "severe",
            DelinquencyState::Critical => "critical",
        }
    }
}
