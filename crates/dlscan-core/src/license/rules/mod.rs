//! Rule-based field extractors for driver-license transcripts.

pub mod address;
pub mod dob;
pub mod names;
pub mod patterns;
pub mod phone;
pub mod text;

pub use address::{extract_city_state_zip, extract_street, CityStateZip, CityStateZipExtractor, StreetExtractor};
pub use dob::{extract_date_of_birth, DateOfBirthExtractor};
pub use names::{resolve_names, NameStrategy, PartialName, ResolvedName};
pub use phone::{extract_phone, PhoneExtractor};
pub use text::{normalize_whitespace, title_case};

use tracing::trace;

/// Trait for single-field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from normalized text.
    fn extract(&self, text: &str) -> Option<Self::Output>;
}

/// An extracted value with the text it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Source text that was matched.
    pub source: String,
    /// Byte span in the normalized text.
    pub position: Option<(usize, usize)>,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, source: impl Into<String>) -> Self {
        Self {
            value,
            source: source.into(),
            position: None,
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }

    /// Log where `field` was found and return the value.
    pub fn traced(self, field: &str) -> T {
        match self.position {
            Some((start, end)) => trace!("{} from {:?} at {}..{}", field, self.source, start, end),
            None => trace!("{} from {:?}", field, self.source),
        }
        self.value
    }
}
