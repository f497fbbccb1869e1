//! Shared utilities for OCR backends.
//!
//! Provides common functionality for:
//! - Checking for CLI tool availability
//! - Normalizing raw recognizer output into text lines

/// Check if a binary is available in PATH.
pub fn check_binary(name: &str) -> bool {
    which::which(name).is_ok()
}

/// Split raw OCR output into trimmed, non-empty lines.
pub fn split_text_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_text_lines() {
        let lines = split_text_lines("  COINBASE \n\n\x0c\nState Farm\n");
        assert_eq!(lines, vec!["COINBASE", "State Farm"]);
    }
}
