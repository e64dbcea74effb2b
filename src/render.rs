//! Plain-text rendering of prioritization results.
//!
//! Everything here is a pure function of its input, so the same result always
//! renders to the same lines.

use crate::protocol::{PrioritizationResult, PrioritizedItem};
use crate::session::ClarificationPrompt;

pub const RESULTS_HEADING: &str = "Prioritized Requirements:";
pub const CLARIFICATION_HEADING: &str = "Additional Information Needed:";
const EXPLANATION_INDENT: &str = "     ";

/// Format a score with exactly two decimal places.
///
/// Halves round away from zero, so 0.125 shows as "0.13".
pub fn format_score(score: f64) -> String {
    format!("{:.2}", (score * 100.0).round() / 100.0)
}

/// Lines for one ranked entry: a header line followed by the explanation.
pub fn format_result_item(position: usize, item: &PrioritizedItem) -> Vec<String> {
    let mut lines = vec![format!(
        "{:>2}. {} — Score: {}",
        position,
        item.requirement,
        format_score(item.score)
    )];
    lines.extend(item.explanation.lines().map(|line| {
        if line.trim().is_empty() {
            String::new()
        } else {
            format!("{}{}", EXPLANATION_INDENT, line)
        }
    }));
    lines
}

/// Render a result in the order the service returned it.
pub fn render_result(result: &PrioritizationResult) -> Vec<String> {
    let mut lines = vec![RESULTS_HEADING.to_string(), String::new()];

    if result.prioritized.is_empty() {
        lines.push("  (no requirements ranked)".to_string());
    }

    for (i, item) in result.prioritized.iter().enumerate() {
        lines.extend(format_result_item(i + 1, item));
    }

    let explanations = result.explanations();
    if !explanations.is_empty() {
        lines.push(String::new());
        for explanation in explanations {
            lines.extend(explanation.lines().map(String::from));
        }
    }

    lines
}

/// Summary of an open clarification round, shown under the results.
pub fn render_clarification_requests(
    prompts: &[ClarificationPrompt],
    requirements: &[String],
) -> Vec<String> {
    if prompts.is_empty() {
        return Vec::new();
    }

    let mut lines = vec![String::new(), CLARIFICATION_HEADING.to_string()];
    for prompt in prompts {
        let target = prompt
            .target
            .and_then(|t| requirements.get(t))
            .map(|r| format!(" [{}]", r))
            .unwrap_or_default();
        lines.push(format!("  {}. {}{}", prompt.index + 1, prompt.question, target));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(requirement: &str, score: f64, explanation: &str) -> PrioritizedItem {
        PrioritizedItem {
            requirement: requirement.to_string(),
            score,
            explanation: explanation.to_string(),
        }
    }

    fn result(items: Vec<PrioritizedItem>) -> PrioritizationResult {
        PrioritizationResult {
            prioritized: items,
            information_requests: None,
            prioritized_explanations: None,
        }
    }

    #[test]
    fn test_format_score_two_decimals() {
        assert_eq!(format_score(2.0), "2.00");
        assert_eq!(format_score(0.333333), "0.33");
        assert_eq!(format_score(1.005), "1.00");
        assert_eq!(format_score(-0.5), "-0.50");
        assert_eq!(format_score(0.125), "0.13");
        assert_eq!(format_score(1.125), "1.13");
        assert_eq!(format_score(-0.125), "-0.13");
    }

    #[test]
    fn test_format_result_item_keeps_blank_explanation_lines() {
        let lines = format_result_item(2, &item("A", 1.0, "line1\n\nline3"));
        assert_eq!(
            lines,
            vec![
                " 2. A — Score: 1.00".to_string(),
                "     line1".to_string(),
                String::new(),
                "     line3".to_string(),
            ]
        );
    }

    #[test]
    fn test_format_result_item_with_multiline_explanation() {
        let lines = format_result_item(
            1,
            &item(
                "Offline mode",
                0.333,
                "Low urgency.\nNote: Clarification provided - '24 hours'",
            ),
        );
        assert_eq!(
            lines,
            vec![
                " 1. Offline mode — Score: 0.33".to_string(),
                "     Low urgency.".to_string(),
                "     Note: Clarification provided - '24 hours'".to_string(),
            ]
        );
    }

    #[test]
    fn test_render_result_keeps_service_order() {
        let lines = render_result(&result(vec![
            item("Offline mode", 0.5, "b"),
            item("Fast login", 2.3333, "a"),
        ]));

        assert_eq!(lines[0], RESULTS_HEADING);
        let offline = lines.iter().position(|l| l.contains("Offline mode")).unwrap();
        let login = lines.iter().position(|l| l.contains("Fast login")).unwrap();
        assert!(offline < login);
        assert!(lines[offline].ends_with("Score: 0.50"));
        assert!(lines[login].ends_with("Score: 2.33"));
        assert_eq!(lines[offline + 1].trim(), "b");
        assert_eq!(lines[login + 1].trim(), "a");
    }

    #[test]
    fn test_render_result_is_idempotent() {
        let r = result(vec![item("A", 1.0, "x"), item("B", 0.25, "y")]);
        assert_eq!(render_result(&r), render_result(&r));
    }

    #[test]
    fn test_render_result_empty() {
        let lines = render_result(&result(vec![]));
        assert_eq!(lines[0], RESULTS_HEADING);
        assert!(lines.iter().any(|l| l.contains("no requirements ranked")));
    }

    #[test]
    fn test_render_result_appends_explanations() {
        let mut r = result(vec![item("A", 1.0, "")]);
        r.prioritized_explanations = Some(vec!["Comparatively, 'A' is first.".to_string()]);
        let lines = render_result(&r);
        assert_eq!(lines.last().unwrap(), "Comparatively, 'A' is first.");
    }

    #[test]
    fn test_render_clarification_requests() {
        let prompts = vec![
            ClarificationPrompt {
                index: 0,
                question: "What is the expected offline duration?".to_string(),
                target: Some(1),
            },
            ClarificationPrompt {
                index: 1,
                question: "Budget?".to_string(),
                target: None,
            },
        ];
        let requirements = vec!["Fast login".to_string(), "Offline mode".to_string()];
        let lines = render_clarification_requests(&prompts, &requirements);
        assert_eq!(lines[1], CLARIFICATION_HEADING);
        assert_eq!(
            lines[2],
            "  1. What is the expected offline duration? [Offline mode]"
        );
        assert_eq!(lines[3], "  2. Budget?");
    }

    #[test]
    fn test_render_clarification_requests_empty() {
        assert!(render_clarification_requests(&[], &[]).is_empty());
    }
}
