//! Segment suggestions: patterns in, ranked and scored segment proposals out.
//!
//! Numbers that drive ranking (priority, ROI, risk, confidence) are computed
//! locally from the pattern. The [`SuggestionWriter`] only supplies the
//! name, description and justification; when it fails or times out the
//! suggestion keeps its numbers and gets templated copy instead.

pub mod rules;
pub mod scoring;
pub mod writer;

use std::sync::Arc;
use std::time::Duration;

use cohort_core::config::SegmentationConfig;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::field::CustomerField;
use crate::pattern::{DiscoveredPattern, PatternSignal};
use rules::{Condition, FeatureRule, SegmentCriteria};
pub use writer::{
    CopyError, LlmSuggestionWriter, PatternSummary, SuggestionCopy, SuggestionWriter,
    TemplateWriter,
};

/// Value patterns at or above this mean churn risk also get a retention
/// suggestion.
pub const RETENTION_CHURN_THRESHOLD: f64 = 0.5;
/// Confidence multiplier applied when copy did not come from the writer.
pub const TEMPLATE_CONFIDENCE_FACTOR: f64 = 0.7;
const MAX_CONCURRENT_COPY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

/// Where a suggestion's copy came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopySource {
    /// Phrased by the configured writer.
    Generated,
    /// The configured writer is the template writer.
    Template,
    /// The writer failed or timed out and templated copy was substituted.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    /// One rule per pattern feature.
    Standard,
    /// Value pattern narrowed to customers likely to churn.
    Retention,
}

impl SuggestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionKind::Standard => "standard",
            SuggestionKind::Retention => "retention",
        }
    }
}

impl std::fmt::Display for SuggestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedSegment {
    pub suggestion_id: String,
    pub pattern_id: String,
    pub kind: SuggestionKind,
    pub name: String,
    pub description: String,
    pub criteria: SegmentCriteria,
    pub justification: String,
    pub estimated_size: usize,
    pub estimated_value: f64,
    pub confidence: f64,
    pub priority: Priority,
    pub implementation_complexity: Complexity,
    pub expected_roi: f64,
    pub risk_level: RiskLevel,
    pub copy_source: CopySource,
}

#[derive(Debug, Clone)]
pub struct SuggestionSettings {
    pub business_goals: Vec<String>,
    /// Per-suggestion bound on the writer call.
    pub copy_timeout: Duration,
    pub min_confidence: f64,
    pub max_suggestions: usize,
}

impl Default for SuggestionSettings {
    fn default() -> Self {
        Self {
            business_goals: Vec::new(),
            copy_timeout: Duration::from_secs(10),
            min_confidence: 0.0,
            max_suggestions: 20,
        }
    }
}

impl SuggestionSettings {
    pub fn from_config(config: &SegmentationConfig) -> Self {
        Self {
            business_goals: config.business_goals.clone(),
            copy_timeout: Duration::from_secs(config.copy_timeout_secs.max(1)),
            min_confidence: config.min_confidence,
            max_suggestions: config.max_suggestions,
        }
    }
}

/// Everything about a suggestion except its copy.
struct Draft {
    suggestion_id: String,
    pattern_id: String,
    kind: SuggestionKind,
    criteria: SegmentCriteria,
    summary: PatternSummary,
    strength: f64,
    estimated_size: usize,
    estimated_value: f64,
    priority: Priority,
    implementation_complexity: Complexity,
    expected_roi: f64,
    risk_level: RiskLevel,
}

impl Draft {
    fn new(pattern: &DiscoveredPattern, kind: SuggestionKind, rules: Vec<FeatureRule>) -> Self {
        let impact = pattern.business_impact;
        // Priority and ROI always use the revenue opportunity so the two
        // variants rank on one scale; retention reports the value at risk.
        let estimated_value = match kind {
            SuggestionKind::Standard => impact.revenue_opportunity,
            SuggestionKind::Retention => impact.risk_mitigation,
        };
        let summary = PatternSummary::new(
            pattern,
            kind,
            rules.iter().map(|r| r.to_string()).collect(),
        );
        Self {
            suggestion_id: format!("{}-{}", pattern.pattern_id, kind.as_str()),
            pattern_id: pattern.pattern_id.clone(),
            kind,
            implementation_complexity: scoring::complexity(rules.len()),
            criteria: SegmentCriteria::all(rules),
            summary,
            strength: pattern.strength,
            estimated_size: pattern.frequency,
            estimated_value,
            priority: scoring::priority(impact.revenue_opportunity, pattern.strength),
            expected_roi: scoring::expected_roi(impact.revenue_opportunity, pattern.frequency),
            risk_level: scoring::risk_level(impact.risk_mitigation, impact.revenue_opportunity),
        }
    }

    fn finish(self, copy: SuggestionCopy, copy_source: CopySource) -> SuggestedSegment {
        let confidence = match copy_source {
            CopySource::Generated => self.strength,
            CopySource::Template | CopySource::Fallback => {
                self.strength * TEMPLATE_CONFIDENCE_FACTOR
            }
        };
        SuggestedSegment {
            suggestion_id: self.suggestion_id,
            pattern_id: self.pattern_id,
            kind: self.kind,
            name: copy.title,
            description: copy.description,
            criteria: self.criteria,
            justification: copy.justification,
            estimated_size: self.estimated_size,
            estimated_value: self.estimated_value,
            confidence: confidence.clamp(0.0, 1.0),
            priority: self.priority,
            implementation_complexity: self.implementation_complexity,
            expected_roi: self.expected_roi,
            risk_level: self.risk_level,
            copy_source,
        }
    }
}

fn drafts_for(pattern: &DiscoveredPattern) -> Vec<Draft> {
    let rules: Vec<FeatureRule> = pattern.features.iter().map(FeatureRule::from_feature).collect();
    let mut drafts = Vec::with_capacity(2);

    if let PatternSignal::Value { mean_churn_risk, .. } = pattern.signal {
        if mean_churn_risk >= RETENTION_CHURN_THRESHOLD {
            let mut retention: Vec<FeatureRule> = rules
                .iter()
                .filter(|r| r.field != CustomerField::ChurnRisk)
                .cloned()
                .collect();
            retention.push(FeatureRule::new(
                CustomerField::ChurnRisk,
                Condition::Gte(RETENTION_CHURN_THRESHOLD),
            ));
            drafts.push(Draft::new(pattern, SuggestionKind::Standard, rules));
            drafts.push(Draft::new(pattern, SuggestionKind::Retention, retention));
            return drafts;
        }
    }

    drafts.push(Draft::new(pattern, SuggestionKind::Standard, rules));
    drafts
}

/// Turns discovered patterns into ranked segment suggestions.
pub struct SuggestionGenerator {
    writer: Arc<dyn SuggestionWriter>,
    settings: SuggestionSettings,
}

impl SuggestionGenerator {
    pub fn new(writer: Arc<dyn SuggestionWriter>, settings: SuggestionSettings) -> Self {
        Self { writer, settings }
    }

    pub fn settings(&self) -> &SuggestionSettings {
        &self.settings
    }

    /// Build, phrase, rank and filter suggestions for `patterns`.
    ///
    /// Never fails: writer errors and timeouts fall back to templated copy.
    pub async fn generate(&self, patterns: &[DiscoveredPattern]) -> Vec<SuggestedSegment> {
        let drafts: Vec<Draft> = patterns.iter().flat_map(drafts_for).collect();
        let candidates = drafts.len();

        let copies = self.write_copy(&drafts).await;

        let source = self.writer.source();
        let mut fallbacks = 0usize;
        let mut suggestions: Vec<SuggestedSegment> = drafts
            .into_iter()
            .zip(copies)
            .map(|(draft, copy)| match copy {
                Ok(copy) => draft.finish(copy, source),
                Err(e) => {
                    fallbacks += 1;
                    warn!(
                        suggestion_id = %draft.suggestion_id,
                        error = %e,
                        transient = matches!(&e, CopyError::Llm(inner) if inner.is_transient()),
                        "copy generation failed, using template"
                    );
                    let copy = TemplateWriter::compose(&draft.summary);
                    draft.finish(copy, CopySource::Fallback)
                }
            })
            .collect();

        scoring::rank(&mut suggestions);

        let min_confidence = self.settings.min_confidence;
        suggestions.retain(|s| s.confidence >= min_confidence);
        suggestions.truncate(self.settings.max_suggestions);

        info!(
            patterns = patterns.len(),
            candidates,
            kept = suggestions.len(),
            fallbacks,
            "suggestions generated"
        );
        suggestions
    }

    /// One writer call per draft, bounded in time and concurrency. Results
    /// come back in draft order.
    async fn write_copy(&self, drafts: &[Draft]) -> Vec<Result<SuggestionCopy, CopyError>> {
        let goals: Arc<[String]> = self.settings.business_goals.clone().into();
        let permits = Arc::new(Semaphore::new(MAX_CONCURRENT_COPY));
        let timeout = self.settings.copy_timeout;

        let mut tasks = JoinSet::new();
        for (index, draft) in drafts.iter().enumerate() {
            let writer = Arc::clone(&self.writer);
            let goals = Arc::clone(&goals);
            let permits = Arc::clone(&permits);
            let summary = draft.summary.clone();
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let result = match tokio::time::timeout(timeout, writer.write(&summary, &goals)).await {
                    Ok(result) => result,
                    Err(_) => Err(CopyError::Timeout(timeout)),
                };
                (index, result)
            });
        }

        let mut results: Vec<Option<Result<SuggestionCopy, CopyError>>> =
            drafts.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => debug!(error = %e, "copy task did not complete"),
            }
        }

        results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| Err(CopyError::Unavailable("copy task aborted".into()))))
            .collect()
    }
}
