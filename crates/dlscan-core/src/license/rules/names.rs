//! First/last name extraction.
//!
//! Names are resolved by an ordered chain of strategies, most reliable first:
//!
//! 1. [`NumberedFields`]: `1 LAST` / `2 FIRST`, the AAMVA numbered layout.
//! 2. [`CommaSeparated`]: `LAST, FIRST [MIDDLE]`.
//! 3. [`LabeledFields`]: `Last Name: ...`, `FN ...` and friends.
//! 4. [`TopOfDocument`]: an uppercase two or three word line near the top.
//!
//! Each strategy may resolve one or both names. The merge is first-win per
//! field, so a later strategy only fills what earlier ones left empty, and the
//! chain stops as soon as both names are known.

use tracing::trace;

use super::patterns::{
    COMMA_NAME, FIRST_NAME_LABEL, LAST_NAME_LABEL, NAME_TOKEN, NUMBERED_FIRST, NUMBERED_LAST,
    STATE_TOKEN,
};
use super::text::title_case;

/// Words printed on the card itself, skipped by
/// [`TopOfDocument::skipping_card_wording`].
const BOILERPLATE_WORDS: &[&str] = &[
    "DRIVER", "DRIVER'S", "DRIVERS", "LICENSE", "LICENCE", "IDENTIFICATION", "CARD", "STATE",
    "CLASS", "USA", "ENDORSEMENTS", "RESTRICTIONS", "NONE", "DONOR", "ORGAN", "VETERAN", "REAL",
    "SEX", "HGT", "WGT", "EYES", "HAIR", "EXP", "ISS", "DLN", "DUPLICATE", "PERMIT", "LEARNER",
    "INSTRUCTION", "COMMERCIAL", "OPERATOR",
];

/// Names found by one strategy. Either side may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialName {
    pub first: Option<String>,
    pub last: Option<String>,
}

impl PartialName {
    fn is_empty(&self) -> bool {
        self.first.is_none() && self.last.is_none()
    }

    fn into_option(self) -> Option<Self> {
        if self.is_empty() { None } else { Some(self) }
    }
}

/// One step of the name chain.
pub trait NameStrategy {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Try to find names in normalized text.
    fn extract(&self, text: &str) -> Option<PartialName>;
}

/// `1 SMITH` is the last name, `2 JOHN` the first name.
pub struct NumberedFields;

impl NameStrategy for NumberedFields {
    fn name(&self) -> &'static str {
        "numbered"
    }

    fn extract(&self, text: &str) -> Option<PartialName> {
        PartialName {
            last: NUMBERED_LAST.captures(text).map(|c| title_case(&c[1])),
            first: NUMBERED_FIRST.captures(text).map(|c| title_case(&c[1])),
        }
        .into_option()
    }
}

/// `DOE, JANE [MARIE]`.
///
/// A candidate directly followed by a ZIP code is a `CITY, ST 12345` line and
/// is skipped.
pub struct CommaSeparated;

impl NameStrategy for CommaSeparated {
    fn name(&self) -> &'static str {
        "comma"
    }

    fn extract(&self, text: &str) -> Option<PartialName> {
        COMMA_NAME
            .captures_iter(text)
            .find(|caps| {
                let end = caps.get(0).map_or(text.len(), |m| m.end());
                !starts_with_zip(&text[end..])
            })
            .map(|caps| PartialName {
                last: Some(title_case(&caps[1])),
                first: Some(title_case(&caps[2])),
            })
    }
}

fn starts_with_zip(rest: &str) -> bool {
    let rest = rest.trim_start();
    rest.len() >= 5 && rest.as_bytes()[..5].iter().all(u8::is_ascii_digit)
}

/// `Last Name: SMITH`, `Surname`, `Family Name`, `LN`; `First Name`, `Given Names`, `FN`.
pub struct LabeledFields;

impl NameStrategy for LabeledFields {
    fn name(&self) -> &'static str {
        "labeled"
    }

    fn extract(&self, text: &str) -> Option<PartialName> {
        PartialName {
            last: LAST_NAME_LABEL.captures(text).map(|c| title_case(&c[1])),
            first: FIRST_NAME_LABEL.captures(text).map(|c| title_case(&c[1])),
        }
        .into_option()
    }
}

/// Positional fallback: the first mostly-uppercase `LAST FIRST [MIDDLE]` line
/// among the first lines of the transcript.
///
/// By default any such line qualifies, so a `DRIVER LICENSE` title is read as
/// a name. Chains built with [`resolve_with`] can use
/// [`TopOfDocument::skipping_card_wording`] instead.
pub struct TopOfDocument {
    /// How many non-empty lines to inspect.
    pub max_lines: usize,
    /// Reject lines containing card wording such as `LICENSE` or `CLASS`.
    pub skip_card_wording: bool,
}

impl Default for TopOfDocument {
    fn default() -> Self {
        Self {
            max_lines: 12,
            skip_card_wording: false,
        }
    }
}

impl TopOfDocument {
    pub fn skipping_card_wording() -> Self {
        Self {
            skip_card_wording: true,
            ..Self::default()
        }
    }

    fn candidate<'a>(&self, line: &'a str) -> Option<Vec<&'a str>> {
        if line.chars().any(|c| c.is_ascii_digit()) || line.contains(',') {
            return None;
        }
        if STATE_TOKEN.is_match(line) {
            return None;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if !(2..=3).contains(&tokens.len()) {
            return None;
        }
        if !tokens.iter().all(|t| NAME_TOKEN.is_match(t)) {
            return None;
        }
        if self.skip_card_wording
            && tokens
                .iter()
                .any(|t| BOILERPLATE_WORDS.contains(&t.to_uppercase().as_str()))
        {
            return None;
        }

        // At least two thirds of the tokens must be fully uppercase.
        let upper = tokens.iter().filter(|t| is_uppercase_token(t)).count();
        (upper * 3 >= tokens.len() * 2).then_some(tokens)
    }
}

impl NameStrategy for TopOfDocument {
    fn name(&self) -> &'static str {
        "top-of-document"
    }

    fn extract(&self, text: &str) -> Option<PartialName> {
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .take(self.max_lines)
            .find_map(|line| self.candidate(line))
            .map(|tokens| PartialName {
                last: Some(title_case(tokens[0])),
                first: Some(title_case(tokens[1])),
            })
    }
}

fn is_uppercase_token(token: &str) -> bool {
    token.chars().any(char::is_alphabetic) && !token.chars().any(char::is_lowercase)
}

/// Names after the whole chain ran. Empty strings mean unresolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedName {
    pub first: String,
    pub last: String,
    /// Strategy that supplied the first name.
    pub first_source: Option<&'static str>,
    /// Strategy that supplied the last name.
    pub last_source: Option<&'static str>,
}

impl ResolvedName {
    /// Both names are known.
    pub fn is_complete(&self) -> bool {
        !self.first.is_empty() && !self.last.is_empty()
    }

    fn merge(&mut self, source: &'static str, partial: PartialName) {
        if self.first.is_empty() {
            if let Some(first) = partial.first.filter(|s| !s.is_empty()) {
                self.first = first;
                self.first_source = Some(source);
            }
        }
        if self.last.is_empty() {
            if let Some(last) = partial.last.filter(|s| !s.is_empty()) {
                self.last = last;
                self.last_source = Some(source);
            }
        }
    }
}

/// The default strategy chain, in precedence order.
pub fn default_strategies() -> Vec<Box<dyn NameStrategy + Send + Sync>> {
    vec![
        Box::new(NumberedFields),
        Box::new(CommaSeparated),
        Box::new(LabeledFields),
        Box::new(TopOfDocument::default()),
    ]
}

/// Run `strategies` in order over normalized text and merge first-win per field.
pub fn resolve_with(
    text: &str,
    strategies: &[Box<dyn NameStrategy + Send + Sync>],
) -> ResolvedName {
    let mut resolved = ResolvedName::default();
    for strategy in strategies {
        if resolved.is_complete() {
            break;
        }
        if let Some(partial) = strategy.extract(text) {
            trace!("name strategy {} matched {:?}", strategy.name(), partial);
            resolved.merge(strategy.name(), partial);
        }
    }
    resolved
}

/// Resolve first and last name with the default chain.
pub fn resolve_names(text: &str) -> ResolvedName {
    resolve_with(text, &default_strategies())
}
