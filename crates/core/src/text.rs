//! Text helpers for search queries and final responses

use crate::state::ActionTag;

const EMAIL_CTA: &str = "¿Te gustaría que te enviemos más información por email?";
const CALL_CTA: &str =
    "¿Te parece que coordinemos una videollamada para explicarte todo en detalle?";

fn strip_punctuation(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect()
}

/// Normalize text before embedding: lowercase, punctuation to spaces,
/// collapsed whitespace.
pub fn prepare_text_for_embedding(text: &str) -> String {
    strip_punctuation(text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trim the response and append a call to action for the first matching
/// next action (email takes precedence over a video call).
pub fn format_final_response(response: &str, next_actions: &[ActionTag]) -> String {
    let mut formatted = response.trim().to_string();

    if next_actions.contains(&ActionTag::AskEmail) {
        formatted.push_str("\n\n");
        formatted.push_str(EMAIL_CTA);
    } else if next_actions.contains(&ActionTag::ScheduleCall) {
        formatted.push_str("\n\n");
        formatted.push_str(CALL_CTA);
    }

    formatted
}
