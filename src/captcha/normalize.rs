//! OCR output normalization and the CAPTCHA format contract.
//!
//! The portal's CAPTCHA is 4-6 characters drawn from A-Z0-9, and the font
//! makes O/0 and I/l/1 indistinguishable; those are always digits on the
//! wire, so confusables are folded before validation.

/// Shortest CAPTCHA the portal renders.
pub const MIN_LEN: usize = 4;
/// Longest CAPTCHA the portal renders.
pub const MAX_LEN: usize = 6;

/// Uppercase, fold confusable glyphs onto the expected alphabet, and strip
/// everything outside A-Z0-9.
pub fn normalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .flat_map(|c| c.to_uppercase())
        .map(|c| match c {
            'O' => '0',
            'I' | 'L' => '1',
            other => other,
        })
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect()
}

/// True when `text` satisfies the full CAPTCHA format contract.
pub fn is_valid(text: &str) -> bool {
    (MIN_LEN..=MAX_LEN).contains(&text.len())
        && text
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_confusables() {
        assert_eq!(normalize(" ab1Ol \n"), "AB101");
        assert_eq!(normalize("I0O"), "100");
    }

    #[test]
    fn normalize_strips_foreign_characters() {
        assert_eq!(normalize("A B-1_2!"), "AB12");
        assert_eq!(normalize("«naïve»"), "NAVE");
    }

    #[test]
    fn format_contract_bounds_length() {
        assert!(!is_valid("AB1"));
        assert!(is_valid("AB12"));
        assert!(is_valid("AB12C3"));
        assert!(!is_valid("AB12C34"));
        assert!(!is_valid(""));
    }

    #[test]
    fn format_contract_rejects_foreign_charset() {
        assert!(!is_valid("ab12"));
        assert!(!is_valid("AB 12"));
        assert!(!is_valid("AB1é"));
    }
}
