//! Common regex patterns for US driver-license transcripts.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Whitespace normalization
    pub static ref HORIZONTAL_SPACE: Regex = Regex::new(r"[ \t]+").unwrap();

    pub static ref LINE_BREAK: Regex = Regex::new(r"\s*\n\s*").unwrap();

    // Numbered license fields: "1 SMITH" (last), "2 JOHN" (first)
    pub static ref NUMBERED_LAST: Regex = Regex::new(
        r"\b1\s+([A-Z][A-Z'`-]+)\b"
    ).unwrap();

    pub static ref NUMBERED_FIRST: Regex = Regex::new(
        r"\b2\s+([A-Z][A-Z'`-]+)\b"
    ).unwrap();

    // "LAST, FIRST [MIDDLE]"
    pub static ref COMMA_NAME: Regex = Regex::new(
        r"\b([A-Z][A-Z'`-]+)\s*,\s*([A-Z][A-Z'`-]+)(?:\s+[A-Z][A-Z'`-]+)?\b"
    ).unwrap();

    // Labeled names
    pub static ref LAST_NAME_LABEL: Regex = Regex::new(
        r"(?i)\b(?:Last Name|Surname|Family Name|LN)\b[:\s]+([A-Za-z'`-]+)"
    ).unwrap();

    pub static ref FIRST_NAME_LABEL: Regex = Regex::new(
        r"(?i)\b(?:First Name|Given Names|FN)\b[:\s]+([A-Za-z'`-]+)"
    ).unwrap();

    // Top-of-document heuristic
    pub static ref STATE_TOKEN: Regex = Regex::new(r"\b[A-Z]{2}\b").unwrap();

    pub static ref NAME_TOKEN: Regex = Regex::new(r"^[A-Za-z'`-]+$").unwrap();

    // Date of birth, M/D/YYYY kept verbatim
    pub static ref DATE_OF_BIRTH: Regex = Regex::new(
        r"(?i)(?:DOB|Date of Birth)[:\s]*([0-1]?\d/[0-3]?\d/\d{4})"
    ).unwrap();

    // Street line: optional field number, house number, street name, suffix
    pub static ref STREET_LINE: Regex = Regex::new(
        r"(?i)(?:\b[0-9]\s+)?\b\d{1,6}\s+[A-Za-z0-9.'\- ]+?\s(?:Street|St|Road|Rd|Avenue|Ave|Boulevard|Blvd|Lane|Ln|Court|Ct|Circle|Cir|Drive|Dr|Way|Wy|Terrace|Ter|Place|Pl)\b"
    ).unwrap();

    // "City, ST 12345[-6789]"
    pub static ref CITY_STATE_ZIP: Regex = Regex::new(
        r"([A-Za-z][A-Za-z .'-]+?),\s*([A-Z]{2})\s*(\d{5}(?:-\d{4})?)\b"
    ).unwrap();

    // North-American phone number
    pub static ref PHONE: Regex = Regex::new(
        r"(?:\(\d{3}\)|\b\d{3})[-. ]?\d{3}[-. ]?\d{4}\b"
    ).unwrap();
}
