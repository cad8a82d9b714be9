//! Context compression and token budget estimation

pub mod summarizer;
pub mod token_estimator;

pub use summarizer::ContextSummarizer;
pub use token_estimator::{BlendedEstimator, TokenEstimator};
