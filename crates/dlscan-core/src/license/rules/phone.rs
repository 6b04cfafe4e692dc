//! Phone number extraction.

use super::patterns::PHONE;
use super::{ExtractionMatch, FieldExtractor};

/// First North-American phone number in the text, as printed.
pub struct PhoneExtractor;

impl FieldExtractor for PhoneExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        let m = PHONE.find(text)?;
        Some(
            ExtractionMatch::new(m.as_str().to_string(), m.as_str())
                .with_position(m.start(), m.end()),
        )
    }
}

/// Extract the first phone number, if any.
pub fn extract_phone(text: &str) -> Option<String> {
    PhoneExtractor.extract(text).map(|m| m.traced("Phone"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_span() {
        let m = PhoneExtractor.extract("TEL 555-123-4567").unwrap();
        assert_eq!(m.source, "555-123-4567");
        assert_eq!(m.position, Some((4, 16)));
        assert_eq!(m.traced("Phone"), "555-123-4567");
    }

    #[test]
    fn test_parenthesized_area_code() {
        assert_eq!(
            extract_phone("TEL (555) 123-4567"),
            Some("(555) 123-4567".to_string())
        );
    }

    #[test]
    fn test_separators() {
        assert_eq!(extract_phone("555.123.4567"), Some("555.123.4567".to_string()));
        assert_eq!(extract_phone("555 123 4567"), Some("555 123 4567".to_string()));
        assert_eq!(extract_phone("5551234567"), Some("5551234567".to_string()));
    }

    #[test]
    fn test_does_not_span_lines() {
        assert_eq!(extract_phone("555\n123\n4567"), None);
    }

    #[test]
    fn test_embedded_in_longer_number() {
        assert_eq!(extract_phone("DLN D12345678901"), None);
    }
}
