//! Centralized input limits and parameter checks.

/// Maximum number of sequences allowed in a single alignment
pub const MAX_SEQUENCES: usize = 100_000;

/// Maximum alignment length (columns)
pub const MAX_ALIGNMENT_LENGTH: usize = 10_000_000;

/// Maximum combination length accepted for either search stage
pub const MAX_COMBINATION_LENGTH: usize = 64;

/// Check if adding another sequence would exceed the maximum allowed.
///
/// Call this with the current count BEFORE adding a new sequence.
/// Returns an error message if adding would exceed the limit, None if safe to add.
#[must_use]
pub fn check_sequence_limit(count: usize) -> Option<String> {
    if count >= MAX_SEQUENCES {
        Some(format!(
            "Too many sequences: adding another would exceed maximum of {MAX_SEQUENCES}"
        ))
    } else {
        None
    }
}

/// Validate a taxon or sequence name taken from a FASTA header.
///
/// Names must be non-empty and free of the separators used by query
/// specifications (`,` and `+`).
///
/// # Examples
///
/// ```
/// use dnc_solver::utils::validation::is_valid_taxon_name;
///
/// assert!(is_valid_taxon_name("neridae"));
/// assert!(!is_valid_taxon_name(""));
/// assert!(!is_valid_taxon_name("a+b"));
/// ```
#[must_use]
pub fn is_valid_taxon_name(name: &str) -> bool {
    !name.trim().is_empty() && !name.contains([',', '+', '|'])
}

/// True if `value` is a finite percentage in `0..=100`
#[must_use]
pub fn is_valid_percent(value: f64) -> bool {
    value.is_finite() && (0.0..=100.0).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_sequence_limit() {
        assert!(check_sequence_limit(0).is_none());
        assert!(check_sequence_limit(MAX_SEQUENCES - 1).is_none());
        assert!(check_sequence_limit(MAX_SEQUENCES).is_some());
    }

    #[test]
    fn test_is_valid_taxon_name() {
        assert!(is_valid_taxon_name("Conus_neridae"));
        assert!(!is_valid_taxon_name("   "));
        assert!(!is_valid_taxon_name("a,b"));
        assert!(!is_valid_taxon_name("a|b"));
    }

    #[test]
    fn test_is_valid_percent() {
        assert!(is_valid_percent(0.0));
        assert!(is_valid_percent(100.0));
        assert!(!is_valid_percent(-0.5));
        assert!(!is_valid_percent(f64::NAN));
    }
}
