use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How the text/images of a document were obtained by the content
/// extraction collaborator. `PdfVision` and `PdfTextOnly` are produced by
/// the external PDF rasterization/text collaborators; the bundled extractor
/// only emits `ImageVision`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExtractionMethod {
    ImageVision,
    PdfVision,
    PdfTextOnly,
    Unknown,
}

/// Content of one document, ready for a vision provider: base64 page
/// images (JPEG/PNG) plus whatever text context the extractor had.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentContent {
    pub raw_text: String,
    pub page_count: usize,
    pub page_images: Vec<String>,
    pub extraction_method: ExtractionMethod,
}

/// Token accounting reported by a provider, injected into the extraction
/// result as its first field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub model: String,
}

/// Fraud risk tiers as reported by the model. Reconciliation may escalate
/// `Low` to `Medium`; it never moves past `Medium` or downward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// One tier up from the lowest; everything else is left alone.
    pub fn escalated(self) -> RiskLevel {
        match self {
            RiskLevel::Low => RiskLevel::Medium,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn risk_level_round_trips_uppercase() {
        assert_eq!(RiskLevel::from_str("MEDIUM").unwrap(), RiskLevel::Medium);
        assert_eq!(RiskLevel::High.to_string(), "HIGH");
    }

    #[test]
    fn escalation_stops_at_medium() {
        assert_eq!(RiskLevel::Low.escalated(), RiskLevel::Medium);
        assert_eq!(RiskLevel::Medium.escalated(), RiskLevel::Medium);
        assert_eq!(RiskLevel::High.escalated(), RiskLevel::High);
    }

    #[test]
    fn extraction_method_tag() {
        assert_eq!(ExtractionMethod::ImageVision.to_string(), "image_vision");
        assert_eq!(
            serde_json::to_string(&ExtractionMethod::PdfTextOnly).unwrap(),
            "\"pdf_text_only\""
        );
    }
}
