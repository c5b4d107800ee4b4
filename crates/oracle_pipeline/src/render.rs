//! Report document generation for completed scenarios.

use std::fmt::{self, Write as _};

use oracle_agents::prompts::money;
use oracle_core::types::{
    CriticVerdict, DebateResult, DebateRound, FinancialReport, Scenario, SimulationResults,
};

use crate::error::RenderError;

/// Turns a completed scenario into a downloadable document.
pub trait ReportRenderer: Send + Sync {
    /// MIME type of the produced bytes.
    fn content_type(&self) -> &'static str;

    /// Render `scenario`, evaluated against `baseline`.
    ///
    /// # Errors
    ///
    /// [`RenderError::MissingSection`] when a required stage result is absent.
    /// [`RenderError::Format`] when writing the document fails.
    fn render(&self, baseline: &FinancialReport, scenario: &Scenario) -> Result<Vec<u8>, RenderError>;
}

/// Plain-text markdown summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl ReportRenderer for MarkdownRenderer {
    fn content_type(&self) -> &'static str {
        "text/markdown; charset=utf-8"
    }

    fn render(&self, baseline: &FinancialReport, scenario: &Scenario) -> Result<Vec<u8>, RenderError> {
        let sim = scenario
            .simulation_results
            .as_ref()
            .ok_or(RenderError::MissingSection("simulation results"))?;
        let critique = scenario
            .critic_verdict
            .as_ref()
            .ok_or(RenderError::MissingSection("critic verdict"))?;
        let debate = scenario
            .debate_result
            .as_ref()
            .ok_or(RenderError::MissingSection("debate result"))?;
        let verdict = scenario
            .final_verdict
            .as_deref()
            .ok_or(RenderError::MissingSection("final verdict"))?;

        let mut doc = String::new();
        write_header(&mut doc, scenario, verdict, debate)?;
        write_baseline(&mut doc, baseline)?;
        write_simulation(&mut doc, sim)?;
        write_critique(&mut doc, critique)?;
        write_debate(&mut doc, debate)?;
        Ok(doc.into_bytes())
    }
}

fn write_header(
    doc: &mut String,
    scenario: &Scenario,
    verdict: &str,
    debate: &DebateResult,
) -> fmt::Result {
    writeln!(doc, "# Counterfactual Scenario Report\n")?;
    writeln!(doc, "- Scenario: `{}`", scenario.id)?;
    writeln!(doc, "- Baseline report: `{}`", scenario.report_id)?;
    writeln!(doc, "- Created: {}", scenario.created_at.to_rfc3339())?;
    writeln!(doc, "- Final verdict: **{verdict}** ({} confidence)\n", debate.confidence_level.as_str())?;

    writeln!(doc, "## Scenario Deltas\n")?;
    writeln!(doc, "| Driver | Delta (bps) |")?;
    writeln!(doc, "|---|---:|")?;
    for (name, bps) in scenario.deltas.named() {
        writeln!(doc, "| {name} | {bps:+} |")?;
    }
    Ok(())
}

fn write_baseline(doc: &mut String, baseline: &FinancialReport) -> fmt::Result {
    let is = &baseline.income_statement;
    writeln!(doc, "\n## Baseline\n")?;
    writeln!(doc, "- Revenue: {}", money(is.revenue))?;
    writeln!(doc, "- EBITDA: {}", money(is.ebitda))?;
    writeln!(doc, "- Net income: {}", money(is.net_income))
}

fn write_simulation(doc: &mut String, sim: &SimulationResults) -> fmt::Result {
    writeln!(doc, "\n## Simulation\n")?;
    match sim.seed {
        Some(seed) => writeln!(doc, "{} trials, seed {seed}.\n", sim.trials)?,
        None => writeln!(doc, "{} trials, unseeded.\n", sim.trials)?,
    }
    writeln!(doc, "| Metric | Value |")?;
    writeln!(doc, "|---|---:|")?;
    for (label, value) in [
        ("Median NPV", sim.median_npv),
        ("P10 NPV", sim.p10_npv),
        ("P90 NPV", sim.p90_npv),
        ("Median revenue", sim.median_revenue),
        ("Median EBITDA", sim.median_ebitda),
        ("Median free cash flow", sim.median_fcf),
    ] {
        writeln!(doc, "| {label} | {} |", money(value))?;
    }
    if !sim.assumption_log.is_empty() {
        writeln!(doc, "\n### Assumptions\n")?;
        for line in &sim.assumption_log {
            writeln!(doc, "- {line}")?;
        }
    }
    Ok(())
}

fn write_critique(doc: &mut String, critique: &CriticVerdict) -> fmt::Result {
    writeln!(doc, "\n## Critique\n")?;
    writeln!(doc, "Auditor verdict: **{}**\n", critique.verdict.as_str().to_uppercase())?;
    for finding in &critique.comparative_analysis {
        writeln!(doc, "- {finding}")?;
    }
    Ok(())
}

fn write_debate(doc: &mut String, debate: &DebateResult) -> fmt::Result {
    writeln!(doc, "\n## Debate\n")?;
    match debate.convergence_round {
        Some(round) => writeln!(doc, "Converged in round {round} of {}.\n", debate.total_rounds())?,
        None => writeln!(doc, "No convergence after {} rounds.\n", debate.total_rounds())?,
    }
    for turn in &debate.rounds {
        write_turn(doc, turn)?;
    }

    writeln!(doc, "### Consensus\n")?;
    if !debate.consensus_summary.is_empty() {
        writeln!(doc, "{}\n", debate.consensus_summary)?;
    }
    write_points(doc, "Agreements", &debate.key_agreements)?;
    write_points(doc, "Disagreements", &debate.key_disagreements)
}

fn write_points(doc: &mut String, heading: &str, points: &[String]) -> fmt::Result {
    writeln!(doc, "#### {heading}\n")?;
    if points.is_empty() {
        return writeln!(doc, "- None recorded\n");
    }
    for point in points {
        writeln!(doc, "- {point}")?;
    }
    writeln!(doc)
}

fn write_turn(doc: &mut String, turn: &DebateRound) -> fmt::Result {
    writeln!(
        doc,
        "### Round {} - {} ({})\n\n{}\n",
        turn.round(),
        turn.role().name(),
        turn.recommendation().name().to_uppercase(),
        turn.argument()
    )
}
