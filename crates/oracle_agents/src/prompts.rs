//! Prompt construction for the critique and debate stages.
//!
//! Every prompt anchors the model in the difference between the historical
//! baseline and the counterfactual simulation, and restricts it to the
//! figures provided.

use std::fmt::Write as _;

use oracle_core::types::{AnalystRole, CriticVerdict, DebateRound, FinancialReport, SimulationResults};

use crate::parse::RECOMMENDATION_MARKER;

/// Persona of the critique model.
pub const CRITIC_SYSTEM: &str = "You are an adversarial financial auditor. \
You compare a counterfactual Monte Carlo simulation with the historical financial \
statements it was derived from and decide whether the counterfactual is plausible. \
Use only the figures provided. Respond with a single JSON object and nothing else.";

const OPTIMIST_PERSONA: &str = "You are an OPTIMISTIC financial analyst. Your role is to:
- Highlight growth opportunities and upside potential based ONLY on the provided data
- Support revenue and margin assumptions with evidence from the report
- Be constructive but acknowledge valid risks when presented

STRICT RULES:
1. NO HALLUCINATIONS: do not invent products, markets, pre-orders or internal projections.
2. CITE NUMBERS: support every claim with a figure from the data below.
3. RESPECT THE MATH: if the simulation shows flat growth, do not argue for acceleration.

Keep responses concise (2-3 paragraphs) and professional.";

const SKEPTIC_PERSONA: &str = "You are a SKEPTICAL financial analyst. Your role is to:
- Challenge assumptions and identify risks
- Question growth projections and valuation methods
- Point out downside scenarios and demand evidence for optimistic claims
- Call out any driver that does not appear in the data

STRICT RULES:
1. FACT CHECK: if the optimist claims margin expansion, check the OpEx delta.
2. DEMAND PROOF: ask where in the report any vague claim comes from.

Keep responses concise (2-3 paragraphs) and professional.";

/// Persona (system prompt) of a debate role.
pub fn persona(role: AnalystRole) -> &'static str {
    match role {
        AnalystRole::Optimist => OPTIMIST_PERSONA,
        AnalystRole::Skeptic => SKEPTIC_PERSONA,
    }
}

/// Format an amount with thousands separators and no decimals.
pub fn money(amount: f64) -> String {
    let rounded = format!("{:.0}", amount.abs());
    let mut out = String::with_capacity(rounded.len() + rounded.len() / 3 + 2);
    for (i, c) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if amount < 0.0 && rounded != "0" {
        format!("-${out}")
    } else {
        format!("${out}")
    }
}

fn baseline_block(report: &FinancialReport) -> String {
    let is = &report.income_statement;
    let opex_ratio = if is.revenue > 0.0 { is.opex / is.revenue * 100.0 } else { 0.0 };
    format!(
        "HISTORICAL REALITY (baseline report):\n\
         - Revenue: {}\n\
         - Gross profit: {} (gross margin {:.1}%)\n\
         - OpEx: {} ({:.1}% of revenue)\n\
         - EBITDA: {}\n\
         - Free cash flow inputs: CapEx {}, change in working capital {}\n",
        money(is.revenue),
        money(is.gross_profit),
        report.gross_margin() * 100.0,
        money(is.opex),
        opex_ratio,
        money(is.ebitda),
        money(report.cash_flow.capex),
        money(report.cash_flow.change_in_working_capital),
    )
}

fn simulation_block(sim: &SimulationResults) -> String {
    let mut out = format!(
        "COUNTERFACTUAL SIMULATION ({} trials):\n\
         - Median NPV: {} (P10 {}, P90 {})\n\
         - Median revenue: {}\n\
         - Median EBITDA: {}\n\
         - Median first-year free cash flow: {}\n\
         Assumptions:\n",
        sim.trials,
        money(sim.median_npv),
        money(sim.p10_npv),
        money(sim.p90_npv),
        money(sim.median_revenue),
        money(sim.median_ebitda),
        money(sim.median_fcf),
    );
    for line in &sim.assumption_log {
        let _ = writeln!(out, "- {line}");
    }
    out
}

/// User prompt of the critique stage.
pub fn critic_prompt(report: &FinancialReport, sim: &SimulationResults) -> String {
    format!(
        "{}\n{}\n\
         TASK: Compare historical reality with the counterfactual. Decide whether the \
         counterfactual is plausible given the baseline.\n\n\
         Respond with JSON only, in exactly this shape:\n\
         {{\"verdict\": \"approve\" or \"reject\", \"comparative_analysis\": [\"finding 1\", \"finding 2\", ...]}}\n\
         Each finding must contrast a historical figure with its counterfactual counterpart.",
        baseline_block(report),
        simulation_block(sim),
    )
}

fn critic_block(verdict: &CriticVerdict) -> String {
    let mut out = format!("AUDITOR VERDICT: {}\n", verdict.verdict.as_str().to_uppercase());
    for finding in &verdict.comparative_analysis {
        let _ = writeln!(out, "- {finding}");
    }
    out
}

fn transcript_block(transcript: &[DebateRound]) -> String {
    if transcript.is_empty() {
        return "DEBATE SO FAR: (none, you open the debate)\n".to_string();
    }
    let mut out = String::from("DEBATE SO FAR:\n");
    for turn in transcript {
        let _ = writeln!(
            out,
            "[Round {} - {}]\n{}\n",
            turn.round(),
            turn.role().name(),
            turn.argument().trim()
        );
    }
    out
}

/// User prompt of one debate turn.
pub fn debate_prompt(
    role: AnalystRole,
    round: u32,
    max_rounds: u32,
    report: &FinancialReport,
    sim: &SimulationResults,
    verdict: &CriticVerdict,
    transcript: &[DebateRound],
) -> String {
    let task = match (role, transcript.is_empty()) {
        (AnalystRole::Optimist, true) => {
            "Present your opening analysis of this COUNTERFACTUAL scenario: why the NPV is \
             reasonable given the simulation parameters and how it differs from historical reality."
        }
        (AnalystRole::Optimist, false) => {
            "Respond to the skeptic's latest challenge. Concede valid points explicitly and defend \
             the rest with figures from the data."
        }
        (AnalystRole::Skeptic, _) => {
            "Challenge the optimist's latest argument. Identify counterfactual assumptions that \
             contradict the historical baseline and acknowledge any common ground."
        }
    };

    format!(
        "ROUND {round} of {max_rounds}: {}\n\n{}\n{}\n{}\n{}\n\
         TASK: {task}\n\n\
         End your answer with a final line of exactly this form:\n\
         {RECOMMENDATION_MARKER}: BUY | HOLD | SELL",
        role.name().to_uppercase(),
        baseline_block(report),
        simulation_block(sim),
        critic_block(verdict),
        transcript_block(transcript),
    )
}
