//! `codejudge analyze` command

use std::fs;

use codejudge_core::backend::HttpBackend;
use codejudge_core::client::InferenceClient;
use codejudge_core::error::Result;
use codejudge_core::metrics::QuantitativeMetrics;
use codejudge_core::pipeline::StageOrchestrator;
use codejudge_core::report;
use codejudge_core::source::SourceUnit;
use tracing::{debug, info, warn};

use super::dispatch::{Command, CommandContext};
use super::write_output;
use crate::cli::AnalyzeArgs;

impl Command for AnalyzeArgs {
    fn execute(&self, ctx: &CommandContext) -> Result<()> {
        // Both inputs must load before the backend is touched
        let source = SourceUnit::load(&self.source)?;
        let metrics = QuantitativeMetrics::load(&self.results)?;
        debug!(elapsed = ?ctx.start.elapsed(), "load_inputs");

        let backend = HttpBackend::from_config(&ctx.config.backend)?;
        let model = ctx.model_or(&ctx.config.backend.analysis_model);
        let client = InferenceClient::new(backend, model, ctx.retry_policy());

        info!(source = %source.display_path(), model = %client.model(), "starting analysis");
        let run = ctx.block_on(async { StageOrchestrator::new(&client).run(&source, &metrics).await })??;

        // Render both before writing either; never leave half an output set
        let artifact = run.to_json_pretty()?;
        let rendered = report::render(&run);
        write_output(&self.json_out, &artifact)?;
        if let Err(e) = write_output(&self.report_out, &rendered) {
            if let Err(cleanup) = fs::remove_file(&self.json_out) {
                warn!(path = %self.json_out.display(), error = %cleanup, "could not remove partial output");
            }
            return Err(e);
        }
        debug!(elapsed = ?ctx.start.elapsed(), "write_outputs");

        println!(
            "Final grade: {} ({:.1}/100)",
            run.final_assessment.grade, run.final_assessment.score
        );
        println!("Analysis saved to {}", self.json_out.display());
        println!("Report saved to {}", self.report_out.display());
        Ok(())
    }
}
