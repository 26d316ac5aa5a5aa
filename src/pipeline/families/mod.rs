//! Document families.
//!
//! One extractor per family, all behind `FamilyExtractor`:
//! ```text
//! SourceDocument → locate sections → rule table → field sets
//! ```
//! An extractor returns one field set per output row (zero when its anchor
//! is absent) and owns the `RecordAssembler` that turns those field sets
//! into records. Patterns come from `ParserConfig` and are compiled once in
//! `build_extractor`.

pub mod ahcm;
pub mod biopsychosocial;
pub mod clinical_card;
pub mod php_daily;
pub mod substance_history;

pub use ahcm::AhcmExtractor;
pub use biopsychosocial::BiopsychosocialExtractor;
pub use clinical_card::ClinicalCardExtractor;
pub use php_daily::PhpDailyExtractor;
pub use substance_history::SubstanceHistoryExtractor;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ParserConfig};
use crate::pipeline::assemble::RecordAssembler;
use crate::pipeline::document::SourceDocument;
use crate::pipeline::rules::Field;

// ═══════════════════════════════════════════
// Family enum
// ═══════════════════════════════════════════

/// The five supported document families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentFamily {
    ClinicalCard,
    PhpDaily,
    Biopsychosocial,
    Ahcm,
    SubstanceHistory,
}

impl DocumentFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClinicalCard => "clinical-card",
            Self::PhpDaily => "php-daily",
            Self::Biopsychosocial => "biopsychosocial",
            Self::Ahcm => "ahcm",
            Self::SubstanceHistory => "substance-history",
        }
    }

    pub fn all() -> &'static [DocumentFamily] {
        &[
            Self::ClinicalCard,
            Self::PhpDaily,
            Self::Biopsychosocial,
            Self::Ahcm,
            Self::SubstanceHistory,
        ]
    }

    /// File name used when the output path is a directory.
    pub fn default_output_name(&self) -> &'static str {
        match self {
            Self::ClinicalCard => "daily_clinical_card_summary.csv",
            Self::PhpDaily => "extracted_php_assessments.csv",
            Self::Biopsychosocial => "bps_anonimized.csv",
            Self::Ahcm => "ahcm_survey_output.csv",
            Self::SubstanceHistory => "patient_substance_history.csv",
        }
    }
}

impl FromStr for DocumentFamily {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clinical-card" => Ok(Self::ClinicalCard),
            "php-daily" => Ok(Self::PhpDaily),
            "biopsychosocial" => Ok(Self::Biopsychosocial),
            "ahcm" => Ok(Self::Ahcm),
            "substance-history" => Ok(Self::SubstanceHistory),
            other => Err(format!("Invalid document family: {other}")),
        }
    }
}

impl std::fmt::Display for DocumentFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Extractor trait
// ═══════════════════════════════════════════

/// Fields for one output row.
pub type FieldSet = Vec<Field>;

/// Family-specific extraction. Must be object-safe for dynamic dispatch.
pub trait FamilyExtractor: Send + Sync {
    fn family(&self) -> DocumentFamily;

    /// Output columns after `group_identifier`, in order.
    fn columns(&self) -> Vec<String>;

    /// Whether fields outside `columns()` become extra output columns.
    fn open_schema(&self) -> bool {
        false
    }

    /// One field set per output row; empty when the document lacks the
    /// family's anchor.
    fn extract(&self, document: &SourceDocument) -> Vec<FieldSet>;

    fn assembler(&self) -> &RecordAssembler;
}

/// Compile the extractor for a family from configuration.
pub fn build_extractor(
    family: DocumentFamily,
    config: &ParserConfig,
) -> Result<Box<dyn FamilyExtractor>, ConfigError> {
    Ok(match family {
        DocumentFamily::ClinicalCard => Box::new(ClinicalCardExtractor::new(&config.clinical_card)?),
        DocumentFamily::PhpDaily => Box::new(PhpDailyExtractor::new(&config.php_daily)?),
        DocumentFamily::Biopsychosocial => {
            Box::new(BiopsychosocialExtractor::new(&config.biopsychosocial)?)
        }
        DocumentFamily::Ahcm => Box::new(AhcmExtractor::new(&config.ahcm)?),
        DocumentFamily::SubstanceHistory => {
            Box::new(SubstanceHistoryExtractor::new(&config.substance_history)?)
        }
    })
}
