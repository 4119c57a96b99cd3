//! Dotted version comparison.
//!
//! Compares versions numerically per component so that `1.10` sorts after
//! `1.6`, which a plain string comparison gets wrong.

use std::cmp::Ordering;

use crate::error::VersionError;

/// Compares two dot-delimited numeric version strings.
///
/// Components are walked left to right and textually equal components are
/// skipped. The first differing pair decides the result, compared numerically
/// after any `-suffix` is stripped, so `2.0-rc1` equals `2.0`. When one string
/// runs out of components first, the shorter one is considered smaller, which
/// means `1.2` sorts before `1.2.0`.
///
/// # Errors
///
/// Returns [`VersionError::InvalidComponent`] when the deciding component is
/// not numeric once its suffix is removed.
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering, VersionError> {
    let left: Vec<&str> = a.split('.').collect();
    let right: Vec<&str> = b.split('.').collect();

    let mut i = 0;
    while i < left.len() && i < right.len() && left[i] == right[i] {
        i += 1;
    }

    if i < left.len() && i < right.len() {
        let l = numeric_component(a, left[i])?;
        let r = numeric_component(b, right[i])?;
        return Ok(l.cmp(&r));
    }

    Ok(left.len().cmp(&right.len()))
}

fn numeric_component(version: &str, component: &str) -> Result<u64, VersionError> {
    let stripped = match component.find('-') {
        Some(idx) => &component[..idx],
        None => component,
    };
    stripped
        .parse::<u64>()
        .map_err(|_| VersionError::InvalidComponent {
            version: version.to_string(),
            component: component.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_not_lexicographic() {
        assert_eq!(compare_versions("1.10", "1.6"), Ok(Ordering::Greater));
        assert_eq!(compare_versions("1.6", "1.10"), Ok(Ordering::Less));
    }

    #[test]
    fn test_shorter_is_less() {
        assert_eq!(compare_versions("1.2", "1.2.0"), Ok(Ordering::Less));
        assert_eq!(compare_versions("1.2.3.4", "1.2.3"), Ok(Ordering::Greater));
    }

    #[test]
    fn test_suffix_stripped() {
        assert_eq!(compare_versions("2.0-rc1", "2.0"), Ok(Ordering::Equal));
        assert_eq!(compare_versions("5-rc1.1", "4.9"), Ok(Ordering::Greater));
    }

    #[test]
    fn test_reflexive() {
        for v in ["0", "1.2.0", "5.4.1", "10.0-beta", "0.4.17.1"] {
            assert_eq!(compare_versions(v, v), Ok(Ordering::Equal), "{v}");
        }
    }

    #[test]
    fn test_invalid_component() {
        let err = compare_versions("1.x", "1.2").unwrap_err();
        assert_eq!(
            err,
            VersionError::InvalidComponent {
                version: "1.x".to_string(),
                component: "x".to_string(),
            }
        );
    }

    #[test]
    fn test_invalid_component_after_decision_is_ignored() {
        // Only the first differing component is parsed.
        assert_eq!(compare_versions("2.x", "1.y"), Ok(Ordering::Greater));
    }
}
