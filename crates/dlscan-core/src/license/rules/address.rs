//! Street address and city/state/ZIP extraction.

use super::patterns::{CITY_STATE_ZIP, STREET_LINE};
use super::text::title_case;
use super::{ExtractionMatch, FieldExtractor};

/// Street line: house number, street name and a known suffix, title-cased.
pub struct StreetExtractor;

impl FieldExtractor for StreetExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        let m = STREET_LINE.find(text)?;
        Some(
            ExtractionMatch::new(title_case(m.as_str().trim()), m.as_str())
                .with_position(m.start(), m.end()),
        )
    }
}

/// City, state and ZIP code from one `City, ST 12345` group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityStateZip {
    /// Title-cased city.
    pub city: String,
    /// Two-letter state code, uppercase as printed.
    pub state: String,
    /// ZIP or ZIP+4, verbatim.
    pub zip: String,
}

/// Extractor for the `City, ST 12345[-6789]` line.
pub struct CityStateZipExtractor;

impl FieldExtractor for CityStateZipExtractor {
    type Output = ExtractionMatch<CityStateZip>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        let caps = CITY_STATE_ZIP.captures(text)?;
        let full = caps.get(0)?;
        let value = CityStateZip {
            city: title_case(caps.get(1)?.as_str()),
            state: caps.get(2)?.as_str().to_string(),
            zip: caps.get(3)?.as_str().to_string(),
        };
        Some(ExtractionMatch::new(value, full.as_str()).with_position(full.start(), full.end()))
    }
}

/// Extract the street line, if any.
pub fn extract_street(text: &str) -> Option<String> {
    StreetExtractor.extract(text).map(|m| m.traced("Address"))
}

/// Extract city, state and ZIP, if any.
pub fn extract_city_state_zip(text: &str) -> Option<CityStateZip> {
    CityStateZipExtractor.extract(text).map(|m| m.traced("City/State/ZIP"))
}
