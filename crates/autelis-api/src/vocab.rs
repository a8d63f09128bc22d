//! Translation between the TCP serial-port vocabulary and the HTTP
//! status-document vocabulary.
//!
//! Push updates name equipment with compact serial command words
//! (`AIRTMP`, `CIR41`, `WFALL`) and carry values such as `ON` or `SOLPREF`.
//! The HTTP interface names the same things `airtemp`, `feature1`,
//! `waterfall` and reports `"1"` / `"2"`. Both functions are total: tokens
//! without a mapping fall through instead of failing, so new firmware words
//! degrade to a best-effort element name rather than an error.

use std::borrow::Cow;

/// First and last Pentair circuit numbers that address feature circuits.
const FEATURE_CIRCUITS: std::ops::RangeInclusive<u32> = 41..=50;

const COMMAND_TABLE: &[(&str, &str)] = &[
    ("AIRTMP", "airtemp"),
    ("SPATMP", "spatemp"),
    ("SOLHT", "solarht"),
    ("SOLTMP", "solartemp"),
    ("WFALL", "waterfall"),
    ("CLEAN", "cleaner"),
    ("OPTIONS", "dip"),
    ("UNITS", "tempunits"),
    ("POOLTMP", "pooltemp"),
    ("POOLTMP2", "pooltemp"),
];

const VALUE_TABLE: &[(&str, &str)] = &[
    ("AUTO", "0"),
    ("SERVICE", "1"),
    ("TIMEOUT", "2"),
    ("TRUE", "1"),
    ("FALSE", "0"),
    ("T", "1"),
    ("F", "0"),
    ("ON", "1"),
    ("OFF", "0"),
    // Pentair heater settings
    ("HEATER", "1"),
    ("SOLPREF", "2"),
    ("SOLAR", "3"),
];

/// Convert a serial command word into the matching HTTP element name.
pub fn command_to_element(token: &str) -> String {
    if let Some(element) = circuit_element(token) {
        return element;
    }

    COMMAND_TABLE
        .iter()
        .find(|(word, _)| *word == token)
        .map_or_else(|| token.to_lowercase(), |(_, element)| (*element).to_owned())
}

/// Convert a serial value word into the matching HTTP element text.
pub fn value_to_text(token: &str) -> Cow<'_, str> {
    VALUE_TABLE
        .iter()
        .find(|(word, _)| *word == token)
        .map_or(Cow::Borrowed(token), |(_, text)| Cow::Borrowed(*text))
}

/// Pentair `CIR<n>` words: 41..=50 are features, everything else a circuit.
fn circuit_element(token: &str) -> Option<String> {
    let suffix = token.strip_prefix("CIR")?;
    let number: u32 = suffix.parse().ok()?;

    if FEATURE_CIRCUITS.contains(&number) {
        Some(format!("feature{}", number - FEATURE_CIRCUITS.start() + 1))
    } else {
        Some(format!("circuit{suffix}"))
    }
}
