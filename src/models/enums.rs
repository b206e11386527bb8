use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(InsightType {
    FinancialAnalysis => "financial_analysis",
    RiskAssessment => "risk_assessment",
    BusinessInsights => "business_insights",
    EntrepreneurialRecommendations => "entrepreneurial_recommendations",
    ExecutiveSummary => "executive_summary",
    MarketAnalysis => "market_analysis",
    CompetitiveAnalysis => "competitive_analysis",
    EsgAnalysis => "esg_analysis",
});

impl InsightType {
    pub const ALL: [InsightType; 8] = [
        InsightType::FinancialAnalysis,
        InsightType::RiskAssessment,
        InsightType::BusinessInsights,
        InsightType::EntrepreneurialRecommendations,
        InsightType::ExecutiveSummary,
        InsightType::MarketAnalysis,
        InsightType::CompetitiveAnalysis,
        InsightType::EsgAnalysis,
    ];

    /// Parse a stored type name, falling back to `business_insights` for
    /// names this build does not know.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(InsightType::BusinessInsights)
    }

    /// Human label: the type name with underscores replaced by spaces.
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }

    /// Title used when the model output carries none.
    pub fn default_title(&self) -> String {
        format!("{} Analysis", self.label())
    }
}

str_enum!(ProcessingStatus {
    Pending => "pending",
    Processing => "processing",
    Completed => "completed",
    Failed => "failed",
});

str_enum!(ExtractionMethod {
    PdfParse => "pdf-parse",
    Ocr => "ocr",
    Hybrid => "hybrid",
    Placeholder => "placeholder",
});

str_enum!(EngagementAction {
    View => "view",
    Like => "like",
    Share => "share",
    Bookmark => "bookmark",
    Skip => "skip",
});

// Externally visible queue item state. Never stored; derived from the
// item's timestamps and retry counters.
str_enum!(QueueState {
    Pending => "pending",
    Processing => "processing",
    Completed => "completed",
    Failed => "failed",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn insight_type_round_trips_every_variant() {
        for t in InsightType::ALL {
            assert_eq!(InsightType::from_str(t.as_str()).unwrap(), t);
        }
    }

    #[test]
    fn unknown_insight_type_is_invalid_enum() {
        let err = InsightType::from_str("weather_forecast").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
    }

    #[test]
    fn lenient_parse_falls_back_to_business_insights() {
        assert_eq!(InsightType::parse_lenient("nope"), InsightType::BusinessInsights);
        assert_eq!(InsightType::parse_lenient("esg_analysis"), InsightType::EsgAnalysis);
    }

    #[test]
    fn default_title_replaces_every_underscore() {
        assert_eq!(
            InsightType::EntrepreneurialRecommendations.default_title(),
            "entrepreneurial recommendations Analysis"
        );
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&ExtractionMethod::PdfParse).unwrap();
        assert_eq!(json, "\"pdf-parse\"");
        let t: InsightType = serde_json::from_str("\"risk_assessment\"").unwrap();
        assert_eq!(t, InsightType::RiskAssessment);
    }
}
