//! The Field Set and the structured record produced for one license image.

use std::fmt;

use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Format used for the processing date and written to the store.
pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// One column of the canonical store layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Phone,
    Date,
    BeenHereBefore,
    FirstName,
    LastName,
    DateOfBirth,
    EmailAddress,
    Address,
    City,
    State,
    ZipCode,
    TypeOfService,
    PaymentType,
    Amount,
    Comments,
    /// Hyperlink back to the source image. Owned by the store, never by a record.
    ViewImage,
}

impl Field {
    /// All fields in header order.
    pub const ALL: [Field; 16] = [
        Field::Phone,
        Field::Date,
        Field::BeenHereBefore,
        Field::FirstName,
        Field::LastName,
        Field::DateOfBirth,
        Field::EmailAddress,
        Field::Address,
        Field::City,
        Field::State,
        Field::ZipCode,
        Field::TypeOfService,
        Field::PaymentType,
        Field::Amount,
        Field::Comments,
        Field::ViewImage,
    ];

    /// Fields carried by a [`LicenseRecord`] (everything but View Image).
    pub const RECORD: [Field; 15] = [
        Field::Phone,
        Field::Date,
        Field::BeenHereBefore,
        Field::FirstName,
        Field::LastName,
        Field::DateOfBirth,
        Field::EmailAddress,
        Field::Address,
        Field::City,
        Field::State,
        Field::ZipCode,
        Field::TypeOfService,
        Field::PaymentType,
        Field::Amount,
        Field::Comments,
    ];

    /// Exact header text of the column.
    pub fn header(self) -> &'static str {
        match self {
            Field::Phone => "Phone",
            Field::Date => "Date",
            Field::BeenHereBefore => "Have you Been Here Before?",
            Field::FirstName => "First Name",
            Field::LastName => "Last Name",
            Field::DateOfBirth => "Date Of Birth",
            Field::EmailAddress => "Email Address",
            Field::Address => "Address",
            Field::City => "City",
            Field::State => "State",
            Field::ZipCode => "Zip Code",
            Field::TypeOfService => "Type Of Service",
            Field::PaymentType => "Payment Type",
            Field::Amount => "Amount",
            Field::Comments => "Comments",
            Field::ViewImage => "View Image",
        }
    }

    /// Look a field up by its exact header text.
    pub fn from_header(header: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.header() == header)
    }

    /// Zero-based column index in the store.
    pub fn column(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// The canonical header row.
pub const HEADERS: [&str; 16] = [
    "Phone",
    "Date",
    "Have you Been Here Before?",
    "First Name",
    "Last Name",
    "Date Of Birth",
    "Email Address",
    "Address",
    "City",
    "State",
    "Zip Code",
    "Type Of Service",
    "Payment Type",
    "Amount",
    "Comments",
    "View Image",
];

/// Structured data parsed from one license transcript.
///
/// Every record field is always present; unresolved ones hold an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseRecord {
    values: [String; 15],
}

impl LicenseRecord {
    /// An empty record stamped with the given processing date.
    pub fn new(processing_date: NaiveDate) -> Self {
        let mut record = Self {
            values: Default::default(),
        };
        record.set(Field::Date, processing_date.format(DATE_FORMAT).to_string());
        record
    }

    /// Value of a field. View Image is always empty.
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::ViewImage => "",
            f => &self.values[f.column()],
        }
    }

    /// Set a field value. Writes to View Image are ignored.
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        if field != Field::ViewImage {
            self.values[field.column()] = value.into();
        }
    }

    /// Whether the field holds a non-empty value.
    pub fn is_resolved(&self, field: Field) -> bool {
        !self.get(field).is_empty()
    }

    /// `(field, value)` pairs in header order.
    pub fn values(&self) -> impl Iterator<Item = (Field, &str)> {
        Field::RECORD.into_iter().map(|f| (f, self.get(f)))
    }
}

impl Serialize for LicenseRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Field::RECORD.len()))?;
        for (field, value) in self.values() {
            map.serialize_entry(field.header(), value)?;
        }
        map.end()
    }
}
