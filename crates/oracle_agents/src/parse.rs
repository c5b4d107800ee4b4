//! Parsing of free-form model output into typed stage results.
//!
//! Models wrap JSON in code fences, prepend prose and decorate keywords with
//! markdown. The parsers here accept that noise, and anything they still
//! cannot read becomes a retryable [`StageError::Malformed`].

use oracle_core::types::{CriticVerdict, Recommendation, Verdict};
use serde::Deserialize;

use crate::error::StageError;

/// Marker every debate argument must end with.
pub const RECOMMENDATION_MARKER: &str = "RECOMMENDATION";

#[derive(Deserialize)]
struct RawVerdict {
    verdict: String,
    #[serde(default)]
    comparative_analysis: AnalysisField,
}

#[derive(Deserialize, Default)]
#[serde(untagged)]
enum AnalysisField {
    List(Vec<String>),
    Single(String),
    #[default]
    Missing,
}

/// The outermost `{ ... }` span of `text`, ignoring code fences and prose.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn parse_verdict_keyword(raw: &str) -> Option<Verdict> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "approve" | "approved" => Some(Verdict::Approve),
        "reject" | "rejected" => Some(Verdict::Reject),
        _ => None,
    }
}

/// Parse a critique response of the form
/// `{"verdict": "approve"|"reject", "comparative_analysis": [..]}`.
///
/// # Errors
///
/// [`StageError::Malformed`] if no JSON object is present, the verdict is
/// unknown or the analysis is empty.
pub fn parse_critic_verdict(text: &str) -> Result<CriticVerdict, StageError> {
    let json = extract_json_object(text)
        .ok_or_else(|| StageError::malformed("critique response contains no JSON object"))?;
    let raw: RawVerdict = serde_json::from_str(json)
        .map_err(|e| StageError::malformed(format!("critique JSON does not match the verdict shape: {e}")))?;

    let verdict = parse_verdict_keyword(&raw.verdict)
        .ok_or_else(|| StageError::malformed(format!("unknown verdict '{}'", raw.verdict)))?;

    let comparative_analysis: Vec<String> = match raw.comparative_analysis {
        AnalysisField::List(items) => items,
        AnalysisField::Single(item) => vec![item],
        AnalysisField::Missing => Vec::new(),
    }
    .into_iter()
    .map(|s| s.trim().to_string())
    .filter(|s| !s.is_empty())
    .collect();

    if comparative_analysis.is_empty() {
        return Err(StageError::malformed("critique has an empty comparative analysis"));
    }

    Ok(CriticVerdict {
        verdict,
        comparative_analysis,
    })
}

/// Read the `RECOMMENDATION: BUY|HOLD|SELL` line closing a debate argument.
///
/// The last marker in the text wins; markdown emphasis around it is ignored.
///
/// # Errors
///
/// [`StageError::Malformed`] if no marker is present or its value is not one
/// of the three recommendations.
pub fn parse_recommendation(text: &str) -> Result<Recommendation, StageError> {
    let line = text
        .lines()
        .rev()
        .find(|line| line.to_ascii_uppercase().contains(RECOMMENDATION_MARKER))
        .ok_or_else(|| StageError::malformed("argument does not state a RECOMMENDATION"))?;

    let upper = line.to_ascii_uppercase();
    let after_marker = upper
        .find(RECOMMENDATION_MARKER)
        .map(|idx| &upper[idx + RECOMMENDATION_MARKER.len()..])
        .unwrap_or_default();
    let keyword: String = after_marker
        .trim_start_matches(|c: char| !c.is_ascii_alphabetic())
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();

    Recommendation::parse(&keyword)
        .ok_or_else(|| StageError::malformed(format!("unknown recommendation in '{}'", line.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_in_code_fence() {
        let text = "Here is my assessment:\n```json\n{\"verdict\": \"Reject\", \"comparative_analysis\": [\"Growth of 2% exceeds history\", \"OpEx cut unsupported\"]}\n```";
        let verdict = parse_critic_verdict(text).unwrap();
        assert_eq!(verdict.verdict, Verdict::Reject);
        assert_eq!(verdict.comparative_analysis.len(), 2);
    }

    #[test]
    fn test_single_string_analysis_is_accepted() {
        let verdict = parse_critic_verdict(r#"{"verdict":"approve","comparative_analysis":"Plausible."}"#).unwrap();
        assert_eq!(verdict.verdict, Verdict::Approve);
        assert_eq!(verdict.comparative_analysis, vec!["Plausible.".to_string()]);
    }

    #[test]
    fn test_malformed_verdicts() {
        for text in [
            "I approve of this scenario.",
            r#"{"verdict": "maybe", "comparative_analysis": ["x"]}"#,
            r#"{"verdict": "approve", "comparative_analysis": []}"#,
            r#"{"verdict": "approve"}"#,
            r#"{"comparative_analysis": ["x"]}"#,
        ] {
            let err = parse_critic_verdict(text).unwrap_err();
            assert!(matches!(err, StageError::Malformed(_)), "{text}");
        }
    }

    #[test]
    fn test_recommendation_line() {
        assert_eq!(
            parse_recommendation("Margins hold up.\n\nRECOMMENDATION: BUY").unwrap(),
            Recommendation::Buy
        );
        assert_eq!(
            parse_recommendation("Too optimistic.\n**Recommendation:** sell.").unwrap(),
            Recommendation::Sell
        );
    }

    #[test]
    fn test_last_recommendation_wins() {
        let text = "Earlier I said RECOMMENDATION: BUY.\nHaving heard the skeptic:\nRECOMMENDATION: HOLD";
        assert_eq!(parse_recommendation(text).unwrap(), Recommendation::Hold);
    }

    #[test]
    fn test_missing_or_unknown_recommendation() {
        assert!(matches!(parse_recommendation("No conclusion."), Err(StageError::Malformed(_))));
        assert!(matches!(
            parse_recommendation("RECOMMENDATION: STRONG BUY"),
            Err(StageError::Malformed(_))
        ));
    }
}
