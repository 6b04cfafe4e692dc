//! Rule-based driver-license parser.

use chrono::{Local, NaiveDate};
use tracing::debug;

use crate::models::record::{Field, LicenseRecord};

use super::rules::{
    extract_city_state_zip, extract_date_of_birth, extract_phone, extract_street,
    names::{default_strategies, resolve_with, NameStrategy},
    normalize_whitespace,
};

/// Fields the parser tries to resolve from the transcript. The rest of the
/// Field Set is left for the operator to fill in.
pub const EXTRACTED_FIELDS: [Field; 8] = [
    Field::FirstName,
    Field::LastName,
    Field::DateOfBirth,
    Field::Address,
    Field::City,
    Field::State,
    Field::ZipCode,
    Field::Phone,
];

/// Result of parsing one transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    /// The structured record.
    pub record: LicenseRecord,
    /// Extracted fields that were not found. Expected for noisy OCR.
    pub gaps: Vec<Field>,
}

/// Trait for transcript parsing. Parsing never fails: unresolved fields are
/// left empty.
pub trait LicenseParser {
    /// Parse a transcript into a record.
    fn parse(&self, transcript: &str) -> ParseOutcome;
}

/// Parser running the ordered regex rules.
pub struct RuleBasedParser {
    /// Pinned processing date. `None` means today's local date.
    processing_date: Option<NaiveDate>,
    name_strategies: Vec<Box<dyn NameStrategy + Send + Sync>>,
}

impl RuleBasedParser {
    /// Create a parser with the default name chain.
    pub fn new() -> Self {
        Self {
            processing_date: None,
            name_strategies: default_strategies(),
        }
    }

    /// Stamp records with a fixed date instead of today.
    pub fn with_processing_date(mut self, date: NaiveDate) -> Self {
        self.processing_date = Some(date);
        self
    }

    /// Replace the name strategy chain.
    pub fn with_name_strategies(
        mut self,
        strategies: Vec<Box<dyn NameStrategy + Send + Sync>>,
    ) -> Self {
        self.name_strategies = strategies;
        self
    }

    fn processing_date(&self) -> NaiveDate {
        self.processing_date
            .unwrap_or_else(|| Local::now().date_naive())
    }
}

impl Default for RuleBasedParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LicenseParser for RuleBasedParser {
    fn parse(&self, transcript: &str) -> ParseOutcome {
        let text = normalize_whitespace(transcript);
        let mut record = LicenseRecord::new(self.processing_date());

        debug!("Parsing license from {} characters of text", text.len());

        let names = resolve_with(&text, &self.name_strategies);
        record.set(Field::FirstName, names.first);
        record.set(Field::LastName, names.last);

        if let Some(dob) = extract_date_of_birth(&text) {
            record.set(Field::DateOfBirth, dob);
        }

        if let Some(street) = extract_street(&text) {
            record.set(Field::Address, street);
        }

        if let Some(csz) = extract_city_state_zip(&text) {
            record.set(Field::City, csz.city);
            record.set(Field::State, csz.state);
            record.set(Field::ZipCode, csz.zip);
        }

        if let Some(phone) = extract_phone(&text) {
            record.set(Field::Phone, phone);
        }

        debug!(
            "Parsed -> First: {} | Last: {} | DOB: {}",
            record.get(Field::FirstName),
            record.get(Field::LastName),
            record.get(Field::DateOfBirth)
        );
        debug!("Parsed -> Address: {}", record.get(Field::Address));
        debug!(
            "Parsed -> City/State/Zip: {} / {} / {}",
            record.get(Field::City),
            record.get(Field::State),
            record.get(Field::ZipCode)
        );

        let gaps: Vec<Field> = EXTRACTED_FIELDS
            .into_iter()
            .filter(|f| !record.is_resolved(*f))
            .collect();
        if !gaps.is_empty() {
            debug!("Unresolved fields: {:?}", gaps);
        }

        ParseOutcome { record, gaps }
    }
}
