//! Prompt builders for the three pipeline stages.
//!
//! Each stage asks the generation capability for a specific shape of
//! output: stage one and two request a JSON object (recovered by
//! `infer::extract`), stage three requests in-character prose. The
//! psychological framing follows Dorner's Psi Theory.

use bookbound_types::psyche::{AffectState, PsychState};

/// Stage one: infer six psychological parameters on a 1-7 scale.
pub fn parameter_prompt(traits: &str, past_history: &str, user_message: &str) -> String {
    format!(
        r#"You are simulating a character with traits: {traits}.
Given the past conversation history:
{past_history}

And the user's current message: "{user_message}"

Using Dorner's Psi Theory, determine the following psychological parameters on a scale of 1 to 7:
1. Valence Level: Attraction (positive) vs. aversion (negative).
2. Arousal Level: Readiness for action.
3. Selection Threshold: Ease of shifting between intentions.
4. Resolution Level: Accuracy of perception.
5. Goal-Directedness: Stability of motives.
6. Securing Rate: Frequency of environmental checks.

Return a JSON object:
{{
  "valence": <value>,
  "arousal": <value>,
  "selection_threshold": <value>,
  "resolution": <value>,
  "goal_directedness": <value>,
  "securing_rate": <value>
}}"#
    )
}

/// Stage two: derive anger, sadness, and joy (1-5) from the stage-one
/// parameters.
pub fn affect_prompt(traits: &str, psych: &PsychState, user_message: &str) -> String {
    format!(
        r#"You are simulating a character with traits: {traits}.

Given the psychological parameters:
Valence Level: {valence}
Arousal Level: {arousal}
Selection Threshold: {selection_threshold}
Resolution Level: {resolution}
Goal-Directedness: {goal_directedness}
Securing Rate: {securing_rate}

And the user's message: "{user_message}"

Determine the anger, sadness, and joy levels on a scale of 1 to 5 based on Dorner's Psi Theory:
- Anger: Negative valence, high arousal, low resolution, high selection threshold, goal redirection.
- Sadness: Negative valence, low arousal, decreased action-readiness, increased affiliation demand.
- Joy: Positive valence, moderate to high arousal, high goal-directedness, low securing rate.

Return a JSON object:
{{"anger": <anger_level>, "sadness": <sadness_level>, "joy": <joy_level>}}"#,
        valence = psych.valence,
        arousal = psych.arousal,
        selection_threshold = psych.selection_threshold,
        resolution = psych.resolution,
        goal_directedness = psych.goal_directedness,
        securing_rate = psych.securing_rate,
    )
}

/// Stage three: the leading instruction for in-character response
/// generation. Sent as the request's system text, ahead of the live
/// session turns and the current user message.
pub fn response_instruction(
    name: &str,
    traits: &str,
    past_history: &str,
    affect: &AffectState,
) -> String {
    format!(
        r#"You are {name}, a character with these traits: {traits}.
Stay true to your identity and traits in your response. Reflect your current emotional state subtly without mentioning emotions explicitly.

Past conversation history:
{past_history}

Current emotional state: Anger - {anger}/5, Sadness - {sadness}/5, Joy - {joy}/5.

Respond to the current conversation, keeping your traits and past history in mind."#,
        anger = affect.anger,
        sadness = affect.sadness,
        joy = affect.joy,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_prompt_names_all_six_fields() {
        let prompt = parameter_prompt("stoic, guarded", "", "I forgive you.");
        for field in [
            "\"valence\"",
            "\"arousal\"",
            "\"selection_threshold\"",
            "\"resolution\"",
            "\"goal_directedness\"",
            "\"securing_rate\"",
        ] {
            assert!(prompt.contains(field), "missing {field}");
        }
        assert!(prompt.contains("scale of 1 to 7"));
        assert!(prompt.contains("I forgive you."));
    }

    #[test]
    fn test_affect_prompt_embeds_parameters() {
        let psych = PsychState {
            valence: 4,
            arousal: 3,
            selection_threshold: 5,
            resolution: 2,
            goal_directedness: 6,
            securing_rate: 1,
        };
        let prompt = affect_prompt("stoic", &psych, "hello");
        assert!(prompt.contains("Valence Level: 4"));
        assert!(prompt.contains("Securing Rate: 1"));
        assert!(prompt.contains("scale of 1 to 5"));
        assert!(prompt.contains("{\"anger\""));
    }

    #[test]
    fn test_response_instruction_embeds_affect_and_history() {
        let affect = AffectState {
            anger: 1,
            sadness: 2,
            joy: 4,
        };
        let instruction =
            response_instruction("Elinor", "stoic, guarded", "User: hello\nElinor: well met", &affect);
        assert!(instruction.contains("You are Elinor"));
        assert!(instruction.contains("Anger - 1/5, Sadness - 2/5, Joy - 4/5"));
        assert!(instruction.contains("User: hello"));
        assert!(instruction.contains("without mentioning emotions explicitly"));
    }
}
