//! Prompt templates for the hosted generative endpoints
//!
//! Every prompt sent to the service lives here as a fixed template:
//! - FILTER_QUESTION: binary hazard gate
//! - RISK_SCORE_PROMPT / DETECTED_HAZARDS_PROMPT / RECOMMENDED_ACTIONS_PROMPT /
//!   RISK_EXPLANATION_PROMPT: per-image detail contracts
//! - build_prioritized_actions_prompt: site-wide top-3 ranking
//!
//! The formatting rules in these templates are strict string contracts; the
//! parsers in [`crate::parser`] validate the replies defensively.

/// Yes/no gate asked before any other processing of an image.
pub const FILTER_QUESTION: &str = "Does this image show any unsafe condition, \
safety hazard, or situation that could pose a risk to people or property?";

/// Risk score contract. The reply is expected to be a bare integer; the
/// parser still extracts defensively.
pub const RISK_SCORE_PROMPT: &str = "Return ONLY a single integer risk score from 0 to 10.";

pub const DETECTED_HAZARDS_PROMPT: &str = "List all specific safety hazards visible in this image. Use this exact format:
- [Hazard 1]
- [Hazard 2]
- [Hazard 3]

Do not include any introductory text. Bold keywords. Start directly with the first dash.";

pub const RECOMMENDED_ACTIONS_PROMPT: &str = "Provide specific corrective actions for the hazards in this image. Use this exact format:
- [Action 1]
- [Action 2]
- [Action 3]

Do not include any introductory text. Bold keywords. Start directly with the first dash.";

pub const RISK_EXPLANATION_PROMPT: &str = "Explain concisely why this image received its risk score.
Reference specific visible conditions and explain how they contribute
to the level of risk. Keep the explanation factual, neutral, and
appropriate for a safety inspection report. Limit to a short 1\u{2013}2 sentences.";

/// Task description attached to the multi-label classification request.
pub const CLASSIFY_TASK_DESCRIPTION: &str = "Identify all applicable hazard categories.";

/// Wrap the gate question into a strict one-word contract.
pub fn build_filter_prompt() -> String {
    format!("{FILTER_QUESTION}\n\nAnswer with exactly one word: yes or no. No other text.")
}

/// Build the multi-label classification prompt over the fixed taxonomy.
///
/// The reply contract is a JSON object `{"labels": [...]}` whose entries must
/// come from `labels`; zero, one, or many labels may apply.
pub fn build_classify_prompt(labels: &[&str], task_description: &str) -> String {
    let label_list = labels
        .iter()
        .map(|l| format!("- {l}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{task_description}

Choose from these categories only:
{label_list}

Multiple categories may apply. Return ONLY a JSON object in this exact shape:
{{\"labels\": [\"Category\", \"Category\"]}}

No other text. Use an empty list if no category applies."
    )
}

/// Explanation recorded for images the filter gate marks non-actionable.
pub const NON_ACTIONABLE_EXPLANATION: &str = "This image was automatically classified as \
non-actionable by the AI safety filter. No unsafe conditions or hazards were detected.";

/// Build the site-wide prioritization prompt.
///
/// # Arguments
/// * `hazard_summary` - frequency summary, e.g. "Fall Risk (3), Missing PPE (1)"
/// * `all_actions_text` - concatenated recommended-action text from every
///   actionable image in the batch
pub fn build_prioritized_actions_prompt(hazard_summary: &str, all_actions_text: &str) -> String {
    format!(
        "You are a site safety expert.
Based on the following site-wide hazards and observations, generate a prioritized list
of the TOP 3 corrective actions.
Rank them from highest to lowest priority.
Focus on actions that reduce the most risk.

Hazard frequency summary:
{hazard_summary}

Observed corrective actions:
{all_actions_text}

Use this exact format:
- [Action]
- [Action]
- [Action]

Do not include any introductory text. Start directly with the first dash."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_question_is_yes_no_shaped() {
        assert!(FILTER_QUESTION.starts_with("Does this image show"));
        assert!(!FILTER_QUESTION.contains('\n'));
    }

    #[test]
    fn test_bullet_prompts_forbid_preamble() {
        for prompt in [DETECTED_HAZARDS_PROMPT, RECOMMENDED_ACTIONS_PROMPT] {
            assert!(prompt.contains("Do not include any introductory text"));
            assert!(prompt.contains("Start directly with the first dash"));
        }
    }

    #[test]
    fn test_classify_prompt_lists_labels_and_json_contract() {
        let prompt = build_classify_prompt(&["Fall Risk", "Missing PPE"], CLASSIFY_TASK_DESCRIPTION);
        assert!(prompt.contains("- Fall Risk"));
        assert!(prompt.contains("- Missing PPE"));
        assert!(prompt.contains("{\"labels\":"));
        assert!(prompt.contains(CLASSIFY_TASK_DESCRIPTION));
    }

    #[test]
    fn test_prioritized_prompt_embeds_inputs() {
        let prompt = build_prioritized_actions_prompt(
            "Fall Risk (2), Missing PPE (1)",
            "- Install guardrails\n- Issue hard hats",
        );
        assert!(prompt.contains("TOP 3"));
        assert!(prompt.contains("Fall Risk (2), Missing PPE (1)"));
        assert!(prompt.contains("Install guardrails"));
    }
}
