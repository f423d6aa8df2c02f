use crate::config::LlmBudgetConfig;
use crate::error::Result;
use crate::governance::check_budget;
use crate::telemetry::pii;
use serde::{Deserialize, Serialize};

/// A versioned prompt template. The version string is part of the
/// response cache key so a prompt change never serves a stale cached
/// answer under the old prompt's semantics (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    ClassifyChange,
    ExplainRisk,
    SuggestOptimization,
}

impl PromptKind {
    pub fn version(self) -> &'static str {
        match self {
            PromptKind::ClassifyChange => "classify-change.v1",
            PromptKind::ExplainRisk => "explain-risk.v1",
            PromptKind::SuggestOptimization => "suggest-optimization.v1",
        }
    }

    fn template(self) -> &'static str {
        match self {
            PromptKind::ClassifyChange => {
                "Classify the semantic impact of the following SQL change. \
                 Respond with one of: cosmetic, non_breaking, metric_semantic, breaking.\n\n{body}"
            }
            PromptKind::ExplainRisk => {
                "Explain in one paragraph why the following model change carries the \
                 given risk score, referencing only the facts provided.\n\n{body}"
            }
            PromptKind::SuggestOptimization => {
                "Suggest a semantically equivalent rewrite of the following SQL that \
                 reduces shuffle or scan volume. Do not change result semantics.\n\n{body}"
            }
        }
    }

    fn render(self, body: &str) -> String {
        self.template().replace("{body}", body)
    }
}

/// What the collaborator actually returned, plus the token counts needed
/// to record spend regardless of outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl LlmUsage {
    pub fn cost_usd(&self, budget: &LlmBudgetConfig) -> f64 {
        let input_cost = self.input_tokens as f64 / 1_000_000.0 * budget.input_cost_per_million_usd;
        let output_cost = self.output_tokens as f64 / 1_000_000.0 * budget.output_cost_per_million_usd;
        input_cost + output_cost
    }
}

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub usage: LlmUsage,
}

/// The outbound call surface to an LLM collaborator. Implementors own the
/// transport; this crate only ever sees scrubbed prompts and raw
/// token-count responses (spec.md §4.6, §9).
#[async_trait::async_trait]
pub trait LlmCollaborator: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<LlmResponse>;
}

/// Tracks spend already committed this day/month so the budget guard can
/// evaluate a prospective call before it's made. The caller (not this
/// module) is responsible for persisting usage after every call, whether
/// it succeeded or failed, since spend is incurred on send not on success.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpendToDate {
    pub daily_usd: f64,
    pub monthly_usd: f64,
}

/// Scrubs free text and any embedded SQL, checks the tenant's daily and
/// monthly spend against the configured caps, and only then calls the
/// collaborator. Usage is returned to the caller for persistence
/// regardless of whether `complete` succeeded, since a failed call can
/// still have consumed input tokens.
pub async fn request_completion(
    collaborator: &dyn LlmCollaborator,
    kind: PromptKind,
    raw_body: &str,
    spend_to_date: SpendToDate,
    budget: &LlmBudgetConfig,
) -> Result<LlmResponse> {
    check_budget(spend_to_date.daily_usd, budget.daily_cap_usd, "daily")?;
    check_budget(spend_to_date.monthly_usd, budget.monthly_cap_usd, "monthly")?;

    let scrubbed_sql = pii::scrub_sql(raw_body);
    let scrubbed = pii::scrub(&scrubbed_sql);
    let prompt = kind.render(&scrubbed);

    collaborator.complete(&prompt).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubCollaborator {
        called: AtomicBool,
    }

    #[async_trait::async_trait]
    impl LlmCollaborator for StubCollaborator {
        async fn complete(&self, prompt: &str) -> Result<LlmResponse> {
            self.called.store(true, Ordering::SeqCst);
            assert!(!prompt.contains('@'), "prompt should not contain a raw email");
            Ok(LlmResponse {
                text: "non_breaking".to_string(),
                usage: LlmUsage {
                    input_tokens: 100,
                    output_tokens: 10,
                },
            })
        }
    }

    #[tokio::test]
    async fn scrubs_pii_before_dispatch_and_returns_usage() {
        let collaborator = StubCollaborator {
            called: AtomicBool::new(false),
        };
        let budget = LlmBudgetConfig::default();
        let response = request_completion(
            &collaborator,
            PromptKind::ClassifyChange,
            "contact admin@example.com about this change",
            SpendToDate::default(),
            &budget,
        )
        .await
        .unwrap();
        assert!(collaborator.called.load(Ordering::SeqCst));
        assert_eq!(response.usage.input_tokens, 100);
    }

    #[tokio::test]
    async fn refuses_call_once_daily_cap_is_reached() {
        let collaborator = StubCollaborator {
            called: AtomicBool::new(false),
        };
        let budget = LlmBudgetConfig::default();
        let spend = SpendToDate {
            daily_usd: budget.daily_cap_usd,
            monthly_usd: 0.0,
        };
        let err = request_completion(&collaborator, PromptKind::ExplainRisk, "body", spend, &budget)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "BUDGET_EXCEEDED");
        assert!(!collaborator.called.load(Ordering::SeqCst));
    }
}
