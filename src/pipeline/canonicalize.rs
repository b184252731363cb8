//! Canonicalisation: raw rows or raw text → ordered, non-empty payloads.
//!
//! Spreadsheet rows and hand-typed lists look nothing alike, but both end up
//! as a flat [`PayloadBatch`]:
//!
//! * **Rows**: the non-empty cells of a row are joined with `-` in column
//!   order (`RAK1 | 1234 | BEBASPAJAK` → `RAK1-1234-BEBASPAJAK`). Rows with no
//!   non-empty cell contribute nothing.
//! * **Text**: one payload per line, trimmed; blank lines are skipped.
//!
//! No symbology validation happens here. Whether `"12345"` is a valid EAN-13
//! is the encoder's call, and its answer is per item.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use tracing::debug;

/// Separator placed between the cells of a tabular row.
pub const CELL_SEPARATOR: &str = "-";

/// A single spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum CellValue {
    /// Null, absent or empty-string cell.
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// The text this cell contributes to a payload, if any.
    ///
    /// Whitespace-only text counts as empty so a payload can never be blank.
    pub fn as_payload_part(&self) -> Option<Cow<'_, str>> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) if s.trim().is_empty() => None,
            CellValue::Text(s) => Some(Cow::Borrowed(s.as_str())),
            CellValue::Number(n) => Some(Cow::Owned(format_number(*n))),
            CellValue::Bool(b) => Some(Cow::Owned(b.to_string())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_payload_part().is_none()
    }
}

/// Print a number cell the way spreadsheet-to-JSON exports stringify it.
///
/// Shortest round-trip digits. Integral values have no fraction. Magnitudes
/// from `1e21` up and below `1e-6` use exponent notation with an explicit
/// sign (`1e+21`, `1.5e-7`). `-0` prints as `0`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".into();
    }
    if n.is_infinite() {
        let sign = if n < 0.0 { "-" } else { "" };
        return format!("{sign}Infinity");
    }
    if n == 0.0 {
        return "0".into();
    }

    let sci = format!("{:e}", n.abs());
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exp: i32 = exp.parse().unwrap_or(0);
    let len = digits.len() as i32;
    let point = exp + 1;

    let body = if len <= point && point <= 21 {
        format!("{digits}{}", "0".repeat((point - len) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{int}.{frac}")
    } else if -6 < point && point <= 0 {
        format!("0.{}{digits}", "0".repeat(point.unsigned_abs() as usize))
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        let dot = if rest.is_empty() { "" } else { "." };
        format!("{first}{dot}{rest}e{sign}{}", exp.unsigned_abs())
    };

    if n < 0.0 {
        format!("-{body}")
    } else {
        body
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s)
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

/// One row of a tabular source: column name → cell, in column order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawRecord {
    cells: Vec<(String, CellValue)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        self.cells.push((column.into(), value.into()));
    }

    /// Cells in column order.
    pub fn cells(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(k, _)| k == column).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Join the non-empty cells with [`CELL_SEPARATOR`].
    ///
    /// Returns `None` when every cell is empty.
    pub fn to_payload(&self) -> Option<Payload> {
        let parts: Vec<Cow<'_, str>> = self
            .cells
            .iter()
            .filter_map(|(_, v)| v.as_payload_part())
            .collect();
        if parts.is_empty() {
            return None;
        }
        Payload::new(parts.join(CELL_SEPARATOR))
    }
}

impl<K: Into<String>, V: Into<CellValue>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            cells: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Raw batch input as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchInput {
    /// Rows decoded from a spreadsheet, CSV or JSON source.
    Records(Vec<RawRecord>),
    /// Free text, one payload per line.
    Text(String),
}

impl BatchInput {
    /// Human-readable name of the input mode, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BatchInput::Records(_) => "tabular",
            BatchInput::Text(_) => "text",
        }
    }
}

impl From<Vec<RawRecord>> for BatchInput {
    fn from(records: Vec<RawRecord>) -> Self {
        BatchInput::Records(records)
    }
}

impl From<String> for BatchInput {
    fn from(text: String) -> Self {
        BatchInput::Text(text)
    }
}

impl From<&str> for BatchInput {
    fn from(text: &str) -> Self {
        BatchInput::Text(text.to_string())
    }
}

/// A canonical barcode value. Never empty, never whitespace-only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(String);

impl Payload {
    /// Returns `None` for empty or whitespace-only values.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for Payload {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered payloads for one run. Insertion order is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayloadBatch(Vec<Payload>);

impl PayloadBatch {
    pub fn new(payloads: Vec<Payload>) -> Self {
        Self(payloads)
    }

    /// Build from plain strings, skipping blank ones.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        values.into_iter().filter_map(Payload::new).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Payload> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Payload] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Payload> {
        self.0
    }

    /// Payload strings, in order.
    pub fn values(&self) -> Vec<&str> {
        self.0.iter().map(Payload::as_str).collect()
    }
}

impl FromIterator<Payload> for PayloadBatch {
    fn from_iter<I: IntoIterator<Item = Payload>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for PayloadBatch {
    type Item = Payload;
    type IntoIter = std::vec::IntoIter<Payload>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a PayloadBatch {
    type Item = &'a Payload;
    type IntoIter = std::slice::Iter<'a, Payload>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Turn raw input into the ordered payload list.
pub fn canonicalize(input: &BatchInput) -> PayloadBatch {
    match input {
        BatchInput::Records(records) => canonicalize_records(records),
        BatchInput::Text(text) => canonicalize_text(text),
    }
}

/// One payload per row with at least one non-empty cell.
pub fn canonicalize_records(records: &[RawRecord]) -> PayloadBatch {
    let batch: PayloadBatch = records.iter().filter_map(RawRecord::to_payload).collect();
    debug!(
        "Canonicalised {} rows → {} payloads ({} empty rows dropped)",
        records.len(),
        batch.len(),
        records.len() - batch.len()
    );
    batch
}

/// One payload per non-blank line, trimmed.
pub fn canonicalize_text(text: &str) -> PayloadBatch {
    let batch: PayloadBatch = text
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(Payload::new)
        .collect();
    debug!("Canonicalised text → {} payloads", batch.len());
    batch
}
