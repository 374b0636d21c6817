//! Supplier lot number rules.
//!
//! Lot numbers are stored normalized (trimmed, upper-case). A valid lot is
//! 3 to 32 characters of `A-Z`, `0-9` and `-`, starts with a letter or digit,
//! and never contains `--`.

pub const MIN_LOT_LEN: usize = 3;
pub const MAX_LOT_LEN: usize = 32;

/// Trim and upper-case a raw lot number.
#[must_use]
pub fn normalize_lot_number(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Every format rule `lot` breaks. Empty means the format is valid.
///
/// Expects an already normalized lot number.
#[must_use]
pub fn lot_format_problems(lot: &str) -> Vec<String> {
    let mut problems = Vec::new();
    let len = lot.chars().count();

    if len < MIN_LOT_LEN || len > MAX_LOT_LEN {
        problems.push(format!(
            "lot number must be {MIN_LOT_LEN}-{MAX_LOT_LEN} characters (got {len})"
        ));
    }
    if let Some(bad) = lot
        .chars()
        .find(|c| !(c.is_ascii_uppercase() || c.is_ascii_digit() || *c == '-'))
    {
        problems.push(format!("lot number contains invalid character '{bad}'"));
    }
    if lot.starts_with('-') {
        problems.push("lot number must start with a letter or digit".to_string());
    }
    if lot.contains("--") {
        problems.push("lot number must not contain consecutive dashes".to_string());
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_lot_number("  ab-2024-07 "), "AB-2024-07");
    }

    #[rstest]
    #[case("AB-2024-07")]
    #[case("123")]
    #[case("LOT9")]
    fn accepts_valid_lots(#[case] lot: &str) {
        assert!(lot_format_problems(lot).is_empty(), "{lot} should be valid");
    }

    #[rstest]
    #[case("AB")]
    #[case("-AB12")]
    #[case("AB--12")]
    #[case("AB 12")]
    #[case("AB_12")]
    fn rejects_invalid_lots(#[case] lot: &str) {
        assert!(!lot_format_problems(lot).is_empty(), "{lot} should be invalid");
    }

    #[test]
    fn reports_every_problem() {
        let problems = lot_format_problems("-A");
        assert_eq!(problems.len(), 2);
    }
}
