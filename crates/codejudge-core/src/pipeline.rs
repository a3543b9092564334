//! Staged analysis of one submission.
//!
//! Stages run strictly in order, each seeing every earlier result. A backend
//! failure that survives the retry budget aborts the whole run; a reply that
//! cannot be parsed only degrades its own stage and the run carries on.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::ChatBackend;
use crate::client::InferenceClient;
use crate::error::Result;
use crate::extract::extract;
use crate::features::{FeatureProvider, PatternFeatureExtractor};
use crate::metrics::{MetricsSummary, QuantitativeMetrics};
use crate::prompt::{self, PromptContext};
use crate::scoring::{self, Grade};
use crate::source::SourceUnit;
use crate::stage::{Stage, StageResult};
use crate::trace_time;

/// One raw backend reply, kept for audit only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub stage: String,
    pub response: String,
}

/// Append-only log of backend replies for a single run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationRecord(Vec<ConversationEntry>);

impl ConversationRecord {
    pub fn push(&mut self, stage: Stage, response: impl Into<String>) {
        self.0.push(ConversationEntry {
            stage: stage.name().to_string(),
            response: response.into(),
        });
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaInformation {
    pub analysis_timestamp: String,
    pub source_file: String,
    pub source_sha256: String,
    pub model_used: String,
    pub analysis_stages_completed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalAssessment {
    pub grade: Grade,
    pub score: f64,
    pub assessment_confidence: String,
}

/// Everything one pipeline execution produced. Field order is the
/// persisted key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRun {
    pub meta_information: MetaInformation,
    pub quantitative_metrics: MetricsSummary,
    pub final_assessment: FinalAssessment,
    #[serde(rename = "stage_1_code_analysis")]
    pub code_analysis: StageResult,
    #[serde(rename = "stage_2_failure_analysis")]
    pub failure_analysis: StageResult,
    #[serde(rename = "stage_3_edge_case_analysis")]
    pub edge_case_analysis: StageResult,
    #[serde(rename = "stage_4_comprehensive_feedback")]
    pub comprehensive_feedback: StageResult,
    pub conversation_history: ConversationRecord,
}

impl AnalysisRun {
    pub fn stage(&self, stage: Stage) -> &StageResult {
        match stage {
            Stage::CodeUnderstanding => &self.code_analysis,
            Stage::FailureAnalysis => &self.failure_analysis,
            Stage::EdgeCaseDiscovery => &self.edge_case_analysis,
            Stage::ComprehensiveFeedback => &self.comprehensive_feedback,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Drives the four stages against one inference client.
pub struct StageOrchestrator<'a, B, F = PatternFeatureExtractor> {
    client: &'a InferenceClient<B>,
    features: F,
}

impl<'a, B: ChatBackend> StageOrchestrator<'a, B> {
    pub fn new(client: &'a InferenceClient<B>) -> Self {
        Self {
            client,
            features: PatternFeatureExtractor,
        }
    }
}

impl<'a, B: ChatBackend, F: FeatureProvider> StageOrchestrator<'a, B, F> {
    pub fn with_feature_provider<G: FeatureProvider>(self, features: G) -> StageOrchestrator<'a, B, G> {
        StageOrchestrator {
            client: self.client,
            features,
        }
    }

    /// Run every stage and score the outcome.
    pub async fn run(&self, source: &SourceUnit, metrics: &QuantitativeMetrics) -> Result<AnalysisRun> {
        let start = Instant::now();
        let features = self.features.extract(&source.text);
        debug!(?features, "extracted structural features");

        let mut results: Vec<(Stage, StageResult)> = Vec::with_capacity(Stage::ALL.len());
        let mut conversation = ConversationRecord::default();

        for stage in Stage::ALL {
            let ctx = PromptContext {
                source: &source.text,
                metrics,
                features: &features,
                prior: &results,
            };
            let result = self.run_stage(stage, &ctx, &mut conversation).await?;
            results.push((stage, result));
        }

        let run = self.assemble(source, metrics, results, conversation);
        info!(
            grade = %run.final_assessment.grade,
            score = run.final_assessment.score,
            "analysis complete"
        );
        trace_time!(start, "analysis_run");
        Ok(run)
    }

    async fn run_stage(
        &self,
        stage: Stage,
        ctx: &PromptContext<'_>,
        conversation: &mut ConversationRecord,
    ) -> Result<StageResult> {
        if stage == Stage::FailureAnalysis && !ctx.metrics.has_failures() {
            info!(stage = %stage, "no failed tests; skipping backend call");
            return Ok(StageResult::no_failures());
        }

        let start = Instant::now();
        info!(stage = %stage, "stage started");
        let messages = prompt::build(stage, ctx);
        let reply = self.client.invoke(&messages, &stage.options()).await?;
        let result = extract(&reply);
        conversation.push(stage, reply);

        if result.is_degraded() {
            warn!(stage = %stage, "stage reply was not structured; continuing with degraded result");
        } else {
            info!(stage = %stage, keys = result.fields().len(), "stage finished");
        }
        trace_time!(start, "stage", stage = stage.name());
        Ok(result)
    }

    fn assemble(
        &self,
        source: &SourceUnit,
        metrics: &QuantitativeMetrics,
        results: Vec<(Stage, StageResult)>,
        conversation: ConversationRecord,
    ) -> AnalysisRun {
        let stages_completed = results.len();
        let mut ordered = results.into_iter().map(|(_, result)| result);
        let code_analysis = ordered.next().unwrap_or_default();
        let failure_analysis = ordered.next().unwrap_or_default();
        let edge_case_analysis = ordered.next().unwrap_or_default();
        let comprehensive_feedback = ordered.next().unwrap_or_default();

        let scoring_input = comprehensive_feedback.with_field(
            Stage::EdgeCaseDiscovery.artifact_key(),
            edge_case_analysis.clone().into_value(),
        );
        let (grade, score) = scoring::score(metrics, &scoring_input);

        AnalysisRun {
            meta_information: MetaInformation {
                analysis_timestamp: chrono::Utc::now().to_rfc3339(),
                source_file: source.display_path(),
                source_sha256: source.digest(),
                model_used: self.client.model().to_string(),
                analysis_stages_completed: stages_completed,
            },
            quantitative_metrics: metrics.summary(),
            final_assessment: FinalAssessment {
                grade,
                score,
                assessment_confidence: "high".to_string(),
            },
            code_analysis,
            failure_analysis,
            edge_case_analysis,
            comprehensive_feedback,
            conversation_history: conversation,
        }
    }
}
