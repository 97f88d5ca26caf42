//! Token estimation for category index entries.
//!
//! Provides a [`TokenEstimator`] trait with a deterministic heuristic
//! implementation (the default) and a BPE-backed implementation using
//! tiktoken-rs for callers that want estimates aligned with an LLM
//! vocabulary. The engine only requires determinism and monotonicity in
//! content length at a fixed estimator version.

/// Trait for estimating the token footprint of memory content.
pub trait TokenEstimator: Send + Sync {
    /// Estimate tokens for the given content. Deterministic for a fixed
    /// estimator configuration.
    fn estimate(&self, content: &str) -> u64;

    /// Short identifier recorded in logs.
    fn name(&self) -> &'static str;
}

/// Whitespace-aware character heuristic: chars / 3.5, rounded up, plus a
/// ~15% safety margin. Zero for empty content.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicEstimator;

impl TokenEstimator for HeuristicEstimator {
    fn estimate(&self, content: &str) -> u64 {
        let chars = content.chars().count() as f64;
        let raw = (chars / 3.5).ceil() as u64;
        raw + raw / 7
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

/// BPE-backed estimator using tiktoken-rs cl100k_base.
pub struct TiktokenEstimator {
    bpe: tiktoken_rs::CoreBPE,
}

impl TiktokenEstimator {
    /// Build a cl100k_base estimator. Falls back to an error string when
    /// the vocabulary cannot be loaded, which callers treat as a reason to
    /// use the heuristic instead.
    pub fn cl100k() -> Result<Self, String> {
        tiktoken_rs::cl100k_base()
            .map(|bpe| TiktokenEstimator { bpe })
            .map_err(|e| e.to_string())
    }
}

impl TokenEstimator for TiktokenEstimator {
    fn estimate(&self, content: &str) -> u64 {
        self.bpe.encode_with_special_tokens(content).len() as u64
    }

    fn name(&self) -> &'static str {
        "cl100k"
    }
}

/// Create the estimator for a configuration tag.
///
/// Resolution:
/// 1. `"cl100k"` — tiktoken cl100k_base, falling back to the heuristic if
///    the vocabulary fails to load
/// 2. anything else (including absent) — the heuristic
pub fn create_estimator(tag: Option<&str>) -> std::sync::Arc<dyn TokenEstimator> {
    match tag {
        Some("cl100k") => match TiktokenEstimator::cl100k() {
            Ok(estimator) => std::sync::Arc::new(estimator),
            Err(reason) => {
                tracing::warn!(reason, "cl100k estimator unavailable, using heuristic");
                std::sync::Arc::new(HeuristicEstimator)
            }
        },
        _ => std::sync::Arc::new(HeuristicEstimator),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_is_zero_for_empty() {
        assert_eq!(HeuristicEstimator.estimate(""), 0);
    }

    #[test]
    fn heuristic_is_positive_for_short_text() {
        let estimate = HeuristicEstimator.estimate("use tabs");
        assert!(estimate > 0);
        assert!(estimate < 10, "short text should stay small, got {estimate}");
    }

    #[test]
    fn heuristic_is_monotone_in_length() {
        let short = HeuristicEstimator.estimate("abc");
        let long = HeuristicEstimator.estimate(&"abc".repeat(100));
        assert!(long > short);
    }

    #[test]
    fn heuristic_is_deterministic() {
        let text = "The quick brown fox jumps over the lazy dog.";
        assert_eq!(
            HeuristicEstimator.estimate(text),
            HeuristicEstimator.estimate(text)
        );
    }

    #[test]
    fn tiktoken_counts_short_text() {
        let estimator = TiktokenEstimator::cl100k().expect("cl100k loads");
        let estimate = estimator.estimate("Hello, world!");
        assert!(estimate > 0);
        assert!(estimate < 10);
    }

    #[test]
    fn factory_resolves_tags() {
        assert_eq!(create_estimator(None).name(), "heuristic");
        assert_eq!(create_estimator(Some("cl100k")).name(), "cl100k");
        assert_eq!(create_estimator(Some("unknown")).name(), "heuristic");
    }
}
