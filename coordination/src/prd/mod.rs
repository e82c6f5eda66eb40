//! Structured PRD: the canonical model, extraction from prose, merging,
//! and quality scoring.

pub mod extract;
pub mod merge;
pub mod model;
pub mod quality;
pub mod rules;

pub use extract::{extract, split_sentences, Extraction, ExtractionTier, FallbackTarget};
pub use merge::{merge, merge_section, MergeReport};
pub use model::{PrdModel, SectionContent, SectionKey, SectionKind};
pub use quality::{QualityLevel, QualityReport, SectionQuality};
pub use rules::{detect_stance, is_generic, keyword_rules, route_sentence, KeywordRule, Stance};
