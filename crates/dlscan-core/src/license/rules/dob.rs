//! Date-of-birth extraction.

use super::patterns::DATE_OF_BIRTH;
use super::{ExtractionMatch, FieldExtractor};

/// Finds a `DOB` / `Date of Birth` label followed by an M/D/YYYY date.
///
/// The date is returned exactly as printed; no reformatting or calendar check.
pub struct DateOfBirthExtractor;

impl FieldExtractor for DateOfBirthExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        let caps = DATE_OF_BIRTH.captures(text)?;
        let date = caps.get(1)?;
        let full = caps.get(0)?;
        Some(
            ExtractionMatch::new(date.as_str().to_string(), full.as_str())
                .with_position(full.start(), full.end()),
        )
    }
}

/// Extract the date of birth, if labeled.
pub fn extract_date_of_birth(text: &str) -> Option<String> {
    DateOfBirthExtractor.extract(text).map(|m| m.traced("Date of birth"))
}
