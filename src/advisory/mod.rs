//! Advisory intelligence engine: risk/fragility scoring, cost anomaly
//! detection, cost forecasting, a cost predictor with heuristic fallback,
//! a response cache, and an optional LLM collaborator path
//! (spec.md §4.6).
//!
//! Grounded in the teacher's `src/ml` (cost_predictor.rs, anomaly.rs) and
//! `src/cache/query_cache.rs` for the response cache's eviction policy.

mod cache;
mod cost_anomaly;
mod forecast;
mod fragility;
mod llm;
mod predictor;
mod risk;

pub use cache::{RequestType, ResponseCache};
pub use cost_anomaly::{detect_anomaly, AnomalyReport, AnomalySeverity};
pub use forecast::{forecast_cost, Forecast, Trend};
pub use fragility::{score_fragility, FragilityScore};
pub use llm::{request_completion, LlmCollaborator, LlmResponse, LlmUsage, PromptKind, SpendToDate};
pub use predictor::{predict_cost, Confidence, CostFeatures8, CostPrediction, TrainedCostModel};
pub use risk::{score_risk, RiskInputs, RiskScore};
