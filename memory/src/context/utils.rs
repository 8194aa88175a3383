//! Utility functions for context assembly.

/// Estimates the token count for a text string.
///
/// Rough approximation: 1 token ≈ 4 characters for English text, minimum 1.
pub fn estimate_tokens(text: &str) -> usize {
    ((text.len() as f64) / 4.0).ceil().max(1.0) as usize
}
