//! Human-readable copy for suggestions.
//!
//! The generator only sees the [`SuggestionWriter`] trait. Production wires in
//! [`LlmSuggestionWriter`]; `--no-llm` runs and fallbacks use
//! [`TemplateWriter`].

use std::time::Duration;

use async_trait::async_trait;
use cohort_llm::{LlmError, LlmProvider, Message};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CopySource, SuggestionKind};
use crate::pattern::{BusinessImpact, DiscoveredPattern, PatternType};

/// Structured context handed to a writer. Everything a writer may mention.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternSummary {
    pub pattern_id: String,
    pub pattern_type: PatternType,
    pub kind: SuggestionKind,
    pub cluster_id: usize,
    pub description: String,
    pub features: Vec<String>,
    pub rules: Vec<String>,
    pub strength: f64,
    pub frequency: usize,
    pub actionable_insights: Vec<String>,
    pub business_impact: BusinessImpact,
}

impl PatternSummary {
    pub fn new(pattern: &DiscoveredPattern, kind: SuggestionKind, rules: Vec<String>) -> Self {
        Self {
            pattern_id: pattern.pattern_id.clone(),
            pattern_type: pattern.pattern_type,
            kind,
            cluster_id: pattern.cluster_id,
            description: pattern.description.clone(),
            features: pattern.features.iter().map(|f| f.label()).collect(),
            rules,
            strength: pattern.strength,
            frequency: pattern.frequency,
            actionable_insights: pattern.actionable_insights.clone(),
            business_impact: pattern.business_impact,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionCopy {
    pub title: String,
    pub description: String,
    pub justification: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("copy generation timed out after {0:?}")]
    Timeout(Duration),
    #[error("text generation failed: {0}")]
    Llm(#[from] LlmError),
    #[error("unusable copy: {0}")]
    InvalidResponse(String),
    #[error("copy writer unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait SuggestionWriter: Send + Sync {
    async fn write(
        &self,
        summary: &PatternSummary,
        business_goals: &[String],
    ) -> Result<SuggestionCopy, CopyError>;

    /// Provenance recorded on suggestions this writer phrases successfully.
    fn source(&self) -> CopySource {
        CopySource::Generated
    }
}

/// Deterministic copy built from the pattern alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateWriter;

impl TemplateWriter {
    pub fn compose(summary: &PatternSummary) -> SuggestionCopy {
        let title = match summary.kind {
            SuggestionKind::Standard => {
                format!("Cluster {} {} segment", summary.cluster_id, summary.pattern_type)
            }
            SuggestionKind::Retention => {
                format!("Cluster {} retention segment", summary.cluster_id)
            }
        };

        let mut description = summary.description.clone();
        if let Some(insight) = summary.actionable_insights.first() {
            description.push_str(". ");
            description.push_str(insight);
        }

        let impact = &summary.business_impact;
        let justification = format!(
            "{} customers, pattern strength {:.2}; revenue opportunity {:.0}, value at risk {:.0}",
            summary.frequency, summary.strength, impact.revenue_opportunity, impact.risk_mitigation
        );

        SuggestionCopy { title, description, justification }
    }
}

#[async_trait]
impl SuggestionWriter for TemplateWriter {
    async fn write(
        &self,
        summary: &PatternSummary,
        _business_goals: &[String],
    ) -> Result<SuggestionCopy, CopyError> {
        Ok(Self::compose(summary))
    }

    fn source(&self) -> CopySource {
        CopySource::Template
    }
}

const SYSTEM_PROMPT: &str = "You name and describe customer segments for a marketing team. \
You receive one discovered customer pattern as JSON together with the business goals. \
Reply with a single JSON object with exactly these string fields: \
\"title\" (at most 8 words), \"description\" (one or two sentences), \
\"justification\" (one sentence tying the segment to the goals). \
Do not invent numbers that are not in the pattern.";

/// Writer backed by a chat-completion provider.
pub struct LlmSuggestionWriter {
    provider: Box<dyn LlmProvider>,
    temperature: f32,
    max_tokens: u32,
}

impl LlmSuggestionWriter {
    pub fn new(provider: Box<dyn LlmProvider>, temperature: f32, max_tokens: u32) -> Self {
        Self { provider, temperature, max_tokens }
    }
}

#[derive(Serialize)]
struct CopyRequest<'a> {
    pattern: &'a PatternSummary,
    business_goals: &'a [String],
}

#[async_trait]
impl SuggestionWriter for LlmSuggestionWriter {
    async fn write(
        &self,
        summary: &PatternSummary,
        business_goals: &[String],
    ) -> Result<SuggestionCopy, CopyError> {
        let request = CopyRequest { pattern: summary, business_goals };
        let payload = serde_json::to_string_pretty(&request)
            .map_err(|e| CopyError::InvalidResponse(format!("cannot encode pattern: {e}")))?;

        let messages = vec![Message::system(SYSTEM_PROMPT), Message::user(payload)];
        let response = self
            .provider
            .complete(messages, self.temperature, self.max_tokens)
            .await?;
        debug!(pattern_id = %summary.pattern_id, len = response.len(), "copy response received");

        parse_copy(&response)
    }
}

fn parse_copy(response: &str) -> Result<SuggestionCopy, CopyError> {
    let json = extract_json(response);
    let copy: SuggestionCopy = serde_json::from_str(json)
        .map_err(|e| CopyError::InvalidResponse(format!("{e}: {json}")))?;
    if copy.title.trim().is_empty() {
        return Err(CopyError::InvalidResponse("empty title".into()));
    }
    Ok(copy)
}

/// Pull a JSON object out of a response that may be wrapped in a code
/// fence or prose.
fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```") {
        let after_tick = &trimmed[start + 3..];
        // Skip a language tag on the fence line.
        let content_start = after_tick.find('\n').map_or(0, |n| n + 1);
        if let Some(end) = after_tick[content_start..].find("```") {
            return after_tick[content_start..content_start + end].trim();
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return &trimmed[start..=end];
        }
    }

    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{PatternFeature, PatternSignal, ValueTier};
    use std::sync::{Arc, Mutex};

    fn pattern() -> DiscoveredPattern {
        DiscoveredPattern {
            pattern_id: "c2-value".into(),
            pattern_type: PatternType::Value,
            cluster_id: 2,
            description: "high value cluster of 8 customers".into(),
            signal: PatternSignal::Value {
                tier: ValueTier::High,
                mean_lifetime_value: 7000.0,
                mean_churn_risk: 0.6,
            },
            features: vec![PatternFeature::ValueTier { tier: ValueTier::High }],
            strength: 0.76,
            frequency: 8,
            customer_ids: (0..8).map(|i| format!("c{i}")).collect(),
            actionable_insights: vec!["Offer premium service tiers".into()],
            business_impact: BusinessImpact {
                revenue_opportunity: 11200.0,
                risk_mitigation: 33600.0,
                engagement_potential: 0.5,
            },
        }
    }

    struct CannedProvider {
        reply: String,
        seen: Arc<Mutex<Vec<Message>>>,
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        async fn complete(
            &self,
            messages: Vec<Message>,
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<String, LlmError> {
            self.seen.lock().unwrap().extend(messages);
            Ok(self.reply.clone())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl LlmProvider for FailingProvider {
        async fn complete(&self, _: Vec<Message>, _: f32, _: u32) -> Result<String, LlmError> {
            Err(LlmError::ApiError { status: 503, body: "overloaded".into() })
        }
    }

    #[test]
    fn extract_json_from_fence() {
        let input = "Here you go:\n```json\n{\"title\": \"x\"}\n```\nThanks";
        assert_eq!(extract_json(input), r#"{"title": "x"}"#);
    }

    #[test]
    fn extract_json_from_prose() {
        let input = "Sure! {\"title\": \"x\"} hope that helps";
        assert_eq!(extract_json(input), r#"{"title": "x"}"#);
    }

    #[test]
    fn empty_title_is_rejected() {
        let err = parse_copy(r#"{"title": " ", "description": "d", "justification": "j"}"#)
            .unwrap_err();
        assert!(matches!(err, CopyError::InvalidResponse(_)));
    }

    #[test]
    fn template_mentions_cluster_and_impact() {
        let summary = PatternSummary::new(&pattern(), SuggestionKind::Retention, vec![]);
        let copy = TemplateWriter::compose(&summary);
        assert_eq!(copy.title, "Cluster 2 retention segment");
        assert!(copy.description.ends_with("Offer premium service tiers"));
        assert!(copy.justification.contains("8 customers"));
        assert!(copy.justification.contains("33600"));
    }

    #[tokio::test]
    async fn llm_writer_sends_pattern_and_goals() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let provider = CannedProvider {
            reply: "```json\n{\"title\":\"VIP keepers\",\"description\":\"d\",\"justification\":\"j\"}\n```"
                .into(),
            seen: Arc::clone(&seen),
        };
        let writer = LlmSuggestionWriter::new(Box::new(provider), 0.3, 256);
        let summary = PatternSummary::new(&pattern(), SuggestionKind::Standard, vec![]);
        let goals = vec!["reduce churn".to_string()];

        let copy = writer.write(&summary, &goals).await.unwrap();
        assert_eq!(copy.title, "VIP keepers");
        assert_eq!(writer.source(), CopySource::Generated);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[1].content.contains("reduce churn"));
        assert!(seen[1].content.contains("c2-value"));
    }

    #[tokio::test]
    async fn llm_failure_surfaces_as_copy_error() {
        let writer = LlmSuggestionWriter::new(Box::new(FailingProvider), 0.3, 256);
        let summary = PatternSummary::new(&pattern(), SuggestionKind::Standard, vec![]);
        let err = writer.write(&summary, &[]).await.unwrap_err();
        match err {
            CopyError::Llm(e) => assert!(e.is_transient()),
            other => panic!("unexpected {:?}", other),
        }
    }
}
