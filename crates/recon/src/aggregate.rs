//! Summary aggregator: read-only cross-category view of a reconciliation run.

use serde::Serialize;

use crate::model::{Accent, Category, ColumnMappings, Summary};

/// Share of one category in the total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryShare {
    pub category: Category,
    pub label: &'static str,
    pub accent: Accent,
    pub count: u64,
    /// One-decimal percentage text, `"0"` when the total is zero.
    pub percent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityKind {
    Anomalies,
    HighRisk,
    AmountMismatches,
    StatusMismatches,
}

impl QualityKind {
    pub const ALL: [QualityKind; 4] = [
        QualityKind::Anomalies,
        QualityKind::HighRisk,
        QualityKind::AmountMismatches,
        QualityKind::StatusMismatches,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Anomalies => "Anomalies",
            Self::HighRisk => "High Risk",
            Self::AmountMismatches => "Amount Issues",
            Self::StatusMismatches => "Status Issues",
        }
    }

    pub fn caption(&self) -> &'static str {
        match self {
            Self::Anomalies => "Detected issues",
            Self::HighRisk => "Critical discrepancies",
            Self::AmountMismatches => "Value discrepancies",
            Self::StatusMismatches => "State mismatches",
        }
    }

    fn count(&self, summary: &Summary) -> u64 {
        match self {
            Self::Anomalies => summary.anomalies,
            Self::HighRisk => summary.high_risk,
            Self::AmountMismatches => summary.amount_mismatches,
            Self::StatusMismatches => summary.status_mismatches,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualitySignal {
    pub kind: QualityKind,
    pub label: &'static str,
    pub caption: &'static str,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingEntry {
    pub standardized: String,
    pub original: String,
}

impl std::fmt::Display for MappingEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} → {}", self.original, self.standardized)
    }
}

/// Column mappings of both sides, each listed independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingView {
    pub internal: Vec<MappingEntry>,
    pub provider: Vec<MappingEntry>,
}

impl MappingView {
    fn from_mappings(mappings: &ColumnMappings) -> Self {
        let entries = |side: &std::collections::BTreeMap<String, String>| {
            side.iter()
                .map(|(standardized, original)| MappingEntry {
                    standardized: standardized.clone(),
                    original: original.clone(),
                })
                .collect()
        };
        Self {
            internal: entries(&mappings.internal),
            provider: entries(&mappings.provider),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryView {
    pub total: u64,
    pub categories: Vec<CategoryShare>,
    pub quality: Vec<QualitySignal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mappings: Option<MappingView>,
}

impl SummaryView {
    /// `None` when no summary is available yet.
    pub fn build(summary: Option<&Summary>, mappings: Option<&ColumnMappings>) -> Option<SummaryView> {
        let summary = summary?;
        let total = summary.total();

        let categories = Category::ALL
            .iter()
            .map(|&category| {
                let count = summary.count(category);
                CategoryShare {
                    category,
                    label: category_label(category),
                    accent: category.default_accent(),
                    count,
                    percent: percent_label(count, total),
                }
            })
            .collect();

        let quality = QualityKind::ALL
            .iter()
            .map(|&kind| QualitySignal {
                kind,
                label: kind.label(),
                caption: kind.caption(),
                count: kind.count(summary),
            })
            .collect();

        Some(SummaryView {
            total,
            categories,
            quality,
            mappings: mappings.map(MappingView::from_mappings),
        })
    }

    pub fn share(&self, category: Category) -> Option<&CategoryShare> {
        self.categories.iter().find(|s| s.category == category)
    }
}

fn category_label(category: Category) -> &'static str {
    match category {
        Category::Matched => "Matched Transactions",
        Category::InternalOnly => "Internal Only",
        Category::ProviderOnly => "Provider Only",
    }
}

/// `count / total * 100` with one decimal, or `"0"` for a zero total.
pub fn percent_label(count: u64, total: u64) -> String {
    if total == 0 {
        return "0".to_string();
    }
    let pct = count as f64 / total as f64 * 100.0;
    format!("{:.1}", (pct * 10.0).round() / 10.0)
}
