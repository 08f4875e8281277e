//! Report content sanitization
//!
//! The report service is instructed to emit plain-text headings, but models
//! still leak markdown emphasis and heading markers. Every streamed fragment
//! passes through here before it reaches the accumulator, so asterisks and
//! hash runs never appear in a clinical report body.

/// Remove all `*` and `#` characters from a report fragment.
///
/// Pure and idempotent: `clean(clean(s)) == clean(s)` for any input.
pub fn clean(fragment: &str) -> String {
    fragment.chars().filter(|c| *c != '*' && *c != '#').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_asterisk_runs() {
        assert_eq!(clean("**Diagnosis**"), "Diagnosis");
        assert_eq!(clean("*a* **b** ***c***"), "a b c");
    }

    #[test]
    fn test_removes_hash_runs() {
        assert_eq!(clean("# Heading"), " Heading");
        assert_eq!(clean("### SOAP ###"), " SOAP ");
    }

    #[test]
    fn test_plain_text_unchanged() {
        let text = "BP 120/80, pulse 72. Follow-up in 2 weeks.";
        assert_eq!(clean(text), text);
    }

    #[test]
    fn test_idempotent() {
        let inputs = ["**bold** and # heading", "", "no markers", "##**##"];
        for input in inputs {
            let once = clean(input);
            assert_eq!(clean(&once), once);
            assert!(!once.contains('*'));
            assert!(!once.contains('#'));
        }
    }

    #[test]
    fn test_preserves_newlines_and_unicode() {
        assert_eq!(clean("naïve\n*case*\n"), "naïve\ncase\n");
    }
}
