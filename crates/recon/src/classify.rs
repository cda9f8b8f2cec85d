use serde::Serialize;

use crate::model::{Category, Record};

/// Row highlight class. Exactly one applies per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowHighlight {
    /// Matched row flagged as anomaly with `risk_level == "High"`.
    HighRiskAnomaly,
    /// Matched row flagged as anomaly at any other risk level.
    Anomaly,
    AmountMismatch,
    StatusMismatch,
    Neutral,
    /// Every internal-only row.
    UnmatchedInternal,
    /// Every provider-only row.
    UnmatchedProvider,
}

impl RowHighlight {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighRiskAnomaly => "high_risk_anomaly",
            Self::Anomaly => "anomaly",
            Self::AmountMismatch => "amount_mismatch",
            Self::StatusMismatch => "status_mismatch",
            Self::Neutral => "neutral",
            Self::UnmatchedInternal => "unmatched_internal",
            Self::UnmatchedProvider => "unmatched_provider",
        }
    }
}

impl std::fmt::Display for RowHighlight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a row for highlighting. Rule order is significant: the first
/// match wins. Only literal booleans count for the flag fields.
pub fn classify_row(category: Category, row: &Record) -> RowHighlight {
    match category {
        Category::Matched => {
            if row.flag("anomaly") == Some(true) {
                if row.text("risk_level") == Some("High") {
                    RowHighlight::HighRiskAnomaly
                } else {
                    RowHighlight::Anomaly
                }
            } else if row.flag("amount_match") == Some(false) {
                RowHighlight::AmountMismatch
            } else if row.flag("status_match") == Some(false) {
                RowHighlight::StatusMismatch
            } else {
                RowHighlight::Neutral
            }
        }
        Category::InternalOnly => RowHighlight::UnmatchedInternal,
        Category::ProviderOnly => RowHighlight::UnmatchedProvider,
    }
}
