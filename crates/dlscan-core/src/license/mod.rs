//! Driver-license field extraction.

mod parser;
pub mod rules;

pub use parser::{LicenseParser, ParseOutcome, RuleBasedParser, EXTRACTED_FIELDS};
