//! Psychological state snapshots derived from generation output.
//!
//! Both types are ephemeral per-turn values: inferred, consumed by the next
//! pipeline stage, and never cached across turns. Field ranges are enforced
//! at the extraction boundary -- an out-of-range value from the generation
//! capability is a data-quality error, never clamped.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Valid range for every [`PsychState`] field.
pub const PSYCH_RANGE: RangeInclusive<i64> = 1..=7;

/// Valid range for every [`AffectState`] field.
pub const AFFECT_RANGE: RangeInclusive<i64> = 1..=5;

/// Six psychological parameters on a 1-7 scale, in Dorner's Psi Theory
/// terms. Inferred in stage one of the turn pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PsychState {
    /// Attraction (positive) vs. aversion (negative).
    pub valence: u8,
    /// Readiness for action.
    pub arousal: u8,
    /// Ease of shifting between intentions.
    pub selection_threshold: u8,
    /// Accuracy of perception.
    pub resolution: u8,
    /// Stability of motives.
    pub goal_directedness: u8,
    /// Frequency of environmental checks.
    pub securing_rate: u8,
}

/// Emotion intensities on a 1-5 scale, derived from [`PsychState`] in
/// stage two. Optionally persisted with the character's reply for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectState {
    pub anger: u8,
    pub sadness: u8,
    pub joy: u8,
}
