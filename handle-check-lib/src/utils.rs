//! Utility functions for handle processing and validation.

use crate::error::HandleCheckError;
use std::collections::HashSet;

/// Validate a handle name.
///
/// Handles are opaque identifiers supplied by the caller; the only hard
/// requirement is that they are non-empty after trimming and contain no
/// whitespace (they are embedded into a URL path segment).
pub fn validate_handle(name: &str) -> Result<(), HandleCheckError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(HandleCheckError::invalid_handle(
            name,
            "Handle cannot be empty",
        ));
    }

    if trimmed.chars().any(char::is_whitespace) {
        return Err(HandleCheckError::invalid_handle(
            trimmed,
            "Handle cannot contain whitespace",
        ));
    }

    Ok(())
}

/// Deduplicate a list of handles, counting dropped duplicate occurrences.
///
/// Names are trimmed; empty lines vanish. First-seen enumeration order is
/// preserved so batch composition is deterministic across runs.
pub fn dedupe_counted(names: &[String]) -> (Vec<String>, usize) {
    let mut seen = HashSet::new();
    let mut work = Vec::new();
    let mut duplicates = 0;

    for name in names {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            work.push(trimmed.to_string());
        } else {
            duplicates += 1;
        }
    }

    (work, duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_handle() {
        assert!(validate_handle("alice").is_ok());
        assert!(validate_handle("  alice  ").is_ok());
        assert!(validate_handle("").is_err());
        assert!(validate_handle("   ").is_err());
        assert!(validate_handle("two words").is_err());
    }

    #[test]
    fn test_dedupe_counts_occurrences() {
        let names = vec![
            "alice".to_string(),
            "bob".to_string(),
            "alice".to_string(),
        ];
        let (work, duplicates) = dedupe_counted(&names);
        assert_eq!(work, vec!["alice", "bob"]);
        assert_eq!(duplicates, 1);
    }

    #[test]
    fn test_dedupe_preserves_first_seen_order() {
        let names = vec![
            "zed".to_string(),
            "alice".to_string(),
            "zed".to_string(),
            "bob".to_string(),
            "alice".to_string(),
        ];
        let (work, duplicates) = dedupe_counted(&names);
        assert_eq!(work, vec!["zed", "alice", "bob"]);
        assert_eq!(duplicates, 2);
    }

    #[test]
    fn test_dedupe_trims_and_drops_blanks() {
        let names = vec![
            " alice ".to_string(),
            "alice".to_string(),
            "".to_string(),
            "   ".to_string(),
        ];
        let (work, duplicates) = dedupe_counted(&names);
        assert_eq!(work, vec!["alice"]);
        assert_eq!(duplicates, 1);
    }

    #[test]
    fn test_dedupe_empty_input() {
        let (work, duplicates) = dedupe_counted(&[]);
        assert!(work.is_empty());
        assert_eq!(duplicates, 0);
    }
}
