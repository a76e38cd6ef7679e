use serde::{Deserialize, Serialize};

/// Which page margin a callout label lives in.
///
/// Free-text quotes and captions outside the closed [`MetadataField`] set
/// always take the right gutter; that default is a deliberate policy, not
/// a fallback that can silently change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    #[default]
    Right,
}

/// The fixed metadata fields a job may carry, in declaration order.
///
/// The order here is the enumeration order of targets after quotes, and
/// therefore affects which label claims a contested slot first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    SourceUrl,
    Venue,
    Ensemble,
    PerformanceDate,
    Beneficiary,
}

impl MetadataField {
    pub const ALL: [MetadataField; 5] = [
        MetadataField::SourceUrl,
        MetadataField::Venue,
        MetadataField::Ensemble,
        MetadataField::PerformanceDate,
        MetadataField::Beneficiary,
    ];

    /// Human-readable caption drawn inside the label box.
    pub fn caption(self) -> &'static str {
        match self {
            MetadataField::SourceUrl => "Source of publication.",
            MetadataField::Venue => "Venue is distinguished organization.",
            MetadataField::Ensemble => "Ensemble is distinguished organization.",
            MetadataField::PerformanceDate => "Date of performance.",
            MetadataField::Beneficiary => "Beneficiary performed in production.",
        }
    }

    /// Gutter assignment for this field. All metadata callouts sit in the
    /// left margin so quotes keep the right margin to themselves.
    pub fn side(self) -> Side {
        match self {
            MetadataField::SourceUrl
            | MetadataField::Venue
            | MetadataField::Ensemble
            | MetadataField::PerformanceDate
            | MetadataField::Beneficiary => Side::Left,
        }
    }
}

/// Free-form key/value context attached to one source document.
///
/// Any subset of fields may be absent or empty; empty fields produce no
/// target.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceMetadata {
    pub source_url: Option<String>,
    pub venue: Option<String>,
    pub ensemble: Option<String>,
    pub performance_date: Option<String>,
    pub beneficiary: Option<String>,
}

impl SourceMetadata {
    fn value(&self, field: MetadataField) -> Option<&str> {
        let value = match field {
            MetadataField::SourceUrl => &self.source_url,
            MetadataField::Venue => &self.venue,
            MetadataField::Ensemble => &self.ensemble,
            MetadataField::PerformanceDate => &self.performance_date,
            MetadataField::Beneficiary => &self.beneficiary,
        };
        value.as_deref().filter(|v| !v.trim().is_empty())
    }
}

/// One thing to find and label: a caption for the margin box and a literal
/// search string to locate on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSpec {
    pub caption: String,
    pub needle: String,
    pub side: Side,
}

/// One document-annotation request.
#[derive(Debug, Clone)]
pub struct AnnotationJob {
    /// Raw bytes of the source PDF. Only page 0 is annotated.
    pub document: Vec<u8>,
    /// Verbatim quotes to call out, in order.
    pub quotes: Vec<String>,
    pub metadata: SourceMetadata,
    /// Opaque criterion identifier, echoed back in the result.
    pub criterion: String,
}

impl AnnotationJob {
    /// Materialize the ordered target list: quotes first, then present
    /// metadata fields in declaration order.
    pub fn targets(&self) -> Vec<TargetSpec> {
        let mut targets = Vec::with_capacity(self.quotes.len() + MetadataField::ALL.len());
        for quote in &self.quotes {
            targets.push(TargetSpec {
                caption: "Supporting evidence.".to_string(),
                needle: quote.clone(),
                side: Side::Right,
            });
        }
        for field in MetadataField::ALL {
            if let Some(value) = self.metadata.value(field) {
                targets.push(TargetSpec {
                    caption: field.caption().to_string(),
                    needle: value.to_string(),
                    side: field.side(),
                });
            }
        }
        targets
    }
}

/// Result record returned alongside the annotated bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionResult {
    pub criterion_id: String,
}
