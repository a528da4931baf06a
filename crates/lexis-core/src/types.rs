//! Core data model: raw rows, the normalized article table, and source locators.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::normalize::normalize;

// =============================================================================
// Source locator
// =============================================================================

/// Fully-resolved location of a tabular source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// URL returning CSV with a header row.
    pub url: String,
    /// Header name of the identifier column.
    pub key_column: String,
    /// Header name of the text column.
    pub value_column: String,
}

/// One row as read from the source, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub key: String,
    pub value: String,
}

impl RawRow {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

// =============================================================================
// ArticleTable
// =============================================================================

/// A single normalized entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub key: String,
    pub value: String,
}

/// How [`ArticleTable::keys`] is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyOrder {
    /// Every key parsed as an integer; sorted by value.
    Numeric,
    /// Source order.
    Insertion,
}

/// Immutable key→text table built from raw rows.
///
/// Keys are unique and neither keys nor values are empty. The key ordering is
/// computed once at construction, so every reader of the same table sees the
/// same page slices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleTable {
    entries: Vec<Article>,
    index: HashMap<String, usize>,
    ordered_keys: Vec<String>,
    order: KeyOrder,
}

/// Result of building a table, with the count of rows that did not survive.
#[derive(Debug, Clone)]
pub struct TableBuild {
    pub table: ArticleTable,
    pub dropped: usize,
    pub duplicates: usize,
}

impl ArticleTable {
    /// Normalize raw rows into a table.
    ///
    /// Rows whose key or value is empty after normalization are dropped. A
    /// repeated key keeps its first position and takes the later value.
    pub fn build<I>(rows: I) -> TableBuild
    where
        I: IntoIterator<Item = RawRow>,
    {
        let mut entries: Vec<Article> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut dropped = 0;
        let mut duplicates = 0;

        for row in rows {
            let key = normalize(&row.key);
            let value = normalize(&row.value);
            if key.is_empty() || value.is_empty() {
                dropped += 1;
                continue;
            }
            match index.get(&key) {
                Some(&pos) => {
                    duplicates += 1;
                    entries[pos].value = value;
                }
                None => {
                    index.insert(key.clone(), entries.len());
                    entries.push(Article { key, value });
                }
            }
        }

        let (ordered_keys, order) = order_keys(&entries);

        TableBuild {
            table: Self {
                entries,
                index,
                ordered_keys,
                order,
            },
            dropped,
            duplicates,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact lookup by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&pos| self.entries[pos].value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Keys in display order (numeric when possible, else source order).
    pub fn keys(&self) -> &[String] {
        &self.ordered_keys
    }

    pub fn order(&self) -> KeyOrder {
        self.order
    }

    /// Entries in source order.
    pub fn iter(&self) -> impl Iterator<Item = &Article> {
        self.entries.iter()
    }
}

/// A base-10 integer key of any width, compared by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IntegerKey<'a> {
    negative: bool,
    /// Magnitude without leading zeros; empty for zero.
    digits: &'a str,
}

impl<'a> IntegerKey<'a> {
    fn parse(key: &'a str) -> Option<Self> {
        let (negative, body) = match key.as_bytes().first()? {
            b'-' => (true, &key[1..]),
            b'+' => (false, &key[1..]),
            _ => (false, key),
        };
        if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let digits = body.trim_start_matches('0');
        Some(Self {
            negative: negative && !digits.is_empty(),
            digits,
        })
    }
}

impl Ord for IntegerKey<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        let magnitude = self
            .digits
            .len()
            .cmp(&other.digits.len())
            .then_with(|| self.digits.cmp(other.digits));
        match (self.negative, other.negative) {
            (false, false) => magnitude,
            (true, true) => magnitude.reverse(),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
        }
    }
}

impl PartialOrd for IntegerKey<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn order_keys(entries: &[Article]) -> (Vec<String>, KeyOrder) {
    let numeric: Option<Vec<(IntegerKey<'_>, &str)>> = entries
        .iter()
        .map(|a| IntegerKey::parse(&a.key).map(|n| (n, a.key.as_str())))
        .collect();

    match numeric {
        Some(mut pairs) if !pairs.is_empty() => {
            // Stable: "01" and "1" keep their relative source order.
            pairs.sort_by(|(a, _), (b, _)| a.cmp(b));
            (
                pairs.into_iter().map(|(_, k)| k.to_string()).collect(),
                KeyOrder::Numeric,
            )
        }
        _ => (
            entries.iter().map(|a| a.key.clone()).collect(),
            KeyOrder::Insertion,
        ),
    }
}
