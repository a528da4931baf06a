//! Text normalization for table keys and values.
//!
//! Spreadsheet cells arrive with typographic apostrophes, smart quotes,
//! zero-width joiners and ragged whitespace. [`normalize`] folds them into one
//! canonical form so stored text and lookups compare predictably.

/// Code points dropped outright.
const ZERO_WIDTH: &[char] = &[
    '\u{200B}', // zero width space
    '\u{200C}', // zero width non-joiner
    '\u{200D}', // zero width joiner
    '\u{2060}', // word joiner
    '\u{FEFF}', // byte order mark
];

/// Apostrophe look-alikes, including the Uzbek Latin okina forms.
const APOSTROPHES: &[char] = &[
    '\u{2018}', '\u{2019}', '\u{201B}', '\u{02BB}', '\u{02BC}', '\u{02BD}', '\u{0060}',
    '\u{00B4}', '\u{2032}',
];

const DOUBLE_QUOTES: &[char] = &['\u{201C}', '\u{201D}', '\u{201E}', '\u{201F}', '\u{2033}'];

/// Stateless normalizer. Exists so callers can hold it as a component.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextNormalizer;

impl TextNormalizer {
    pub fn normalize(&self, raw: &str) -> String {
        normalize(raw)
    }
}

/// Map one character to its canonical form, or `None` to drop it.
fn canonical(c: char) -> Option<char> {
    if ZERO_WIDTH.contains(&c) {
        None
    } else if APOSTROPHES.contains(&c) {
        Some('\'')
    } else if DOUBLE_QUOTES.contains(&c) {
        Some('"')
    } else {
        Some(c)
    }
}

/// Normalize a raw cell value.
///
/// Drops zero-width code points, folds apostrophe and double-quote variants to
/// ASCII, collapses every whitespace run to a single space and trims both
/// ends. Never fails and is idempotent.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;

    for c in raw.chars().filter_map(canonical) {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }

    out
}
