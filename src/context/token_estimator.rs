//! Heuristic token estimation

use crate::chat::models::Message;

/// Token estimator trait for different estimation strategies
pub trait TokenEstimator: Send + Sync {
    /// Estimate the token cost of a single text
    fn estimate(&self, text: &str) -> f64;

    /// Estimate the token cost of an optional context plus a dialogue
    ///
    /// The blend is linear in word and character counts, so summing per-text
    /// estimates equals estimating the concatenation.
    fn estimate_request(&self, context: Option<&str>, messages: &[Message]) -> f64 {
        let mut total = context.map(|c| self.estimate(c)).unwrap_or(0.0);
        total += messages.iter().map(|m| self.estimate(&m.content)).sum::<f64>();
        total
    }
}

/// Blended word/character estimator
///
/// Averages a character-based heuristic (~4 chars per token) with a
/// word-based one (~4 tokens per 3 words). Neither alone tracks real
/// tokenizer behavior well across languages; the average smooths the bias
/// of either metric dominating. Downstream thresholds carry safety margins
/// for the remaining inaccuracy.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlendedEstimator;

impl BlendedEstimator {
    pub fn new() -> Self {
        Self
    }
}

impl TokenEstimator for BlendedEstimator {
    fn estimate(&self, text: &str) -> f64 {
        let words = text.split_whitespace().count() as f64;
        let chars = text.chars().count() as f64;
        (chars / 4.0 + (words / 3.0) * 4.0) / 2.0
    }
}
