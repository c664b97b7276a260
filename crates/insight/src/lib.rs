//! Pattern discovery and segment suggestions on top of clustering.
//!
//! Data flows one way: customers → features → clusters → patterns →
//! suggestions. [`SegmentationEngine`] sequences the stages for one run.

pub mod error;
pub mod field;
pub mod orchestrator;
pub mod pattern;
pub mod suggest;

pub use error::InsightError;
pub use field::CustomerField;
pub use orchestrator::{ClusteringStrategy, SegmentationEngine, SegmentationReport};
pub use pattern::{
    BusinessImpact, DiscoveredPattern, PatternAnalyzer, PatternFeature, PatternSignal, PatternType,
};
pub use suggest::rules::{Condition, FeatureRule, RuleLogic, SegmentCriteria};
pub use suggest::{
    CopyError, CopySource, LlmSuggestionWriter, PatternSummary, Priority, RiskLevel,
    SuggestedSegment, SuggestionCopy, SuggestionGenerator, SuggestionSettings, SuggestionWriter,
    TemplateWriter,
};
