//! Splitting long texts into message-sized chunks.

/// Split `text` into chunks of at most `limit` UTF-16 code units, the unit
/// Telegram measures message length in.
///
/// Each cut prefers, within the allowed window, the last paragraph break,
/// then the last line break, then the last space. A window with none of
/// those is cut hard at `limit`. Whitespace at chunk edges is dropped and
/// blank input yields no chunks.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        let hard = match window_end(rest, limit) {
            Some(idx) => idx,
            None => {
                chunks.push(rest.to_string());
                break;
            }
        };

        let window = &rest[..hard];
        let cut = window
            .rfind("\n\n")
            .or_else(|| window.rfind('\n'))
            .or_else(|| window.rfind(' '))
            .filter(|&idx| idx > 0)
            .unwrap_or(hard);

        chunks.push(rest[..cut].trim_end().to_string());
        rest = rest[cut..].trim_start();
    }

    chunks
}

/// UTF-16 length as Telegram counts it.
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Byte index where `text` first exceeds `limit` UTF-16 units, or `None` if
/// it fits. Always at least one character in, so a lone surrogate pair under
/// a limit of 1 still makes progress.
fn window_end(text: &str, limit: usize) -> Option<usize> {
    let mut units = 0;
    for (idx, c) in text.char_indices() {
        units += c.len_utf16();
        if units > limit {
            return Some(if idx == 0 { c.len_utf8() } else { idx });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_single_chunk() {
        assert_eq!(split_message("Hello world", 4096), vec!["Hello world"]);
    }

    #[test]
    fn test_blank_text_yields_nothing() {
        assert!(split_message("  \n ", 10).is_empty());
    }

    #[test]
    fn test_exact_limit_is_single_chunk() {
        let text = "a".repeat(10);
        assert_eq!(split_message(&text, 10), vec![text]);
    }

    #[test]
    fn test_prefers_paragraph_break() {
        let text = "first para\n\nsecond line\nthird";
        let chunks = split_message(text, 20);
        assert_eq!(chunks[0], "first para");
        assert_eq!(chunks[1], "second line\nthird");
    }

    #[test]
    fn test_falls_back_to_line_break() {
        let chunks = split_message("line one\nline two is long", 14);
        assert_eq!(chunks[0], "line one");
        assert_eq!(chunks[1], "line two is");
        assert_eq!(chunks[2], "long");
    }

    #[test]
    fn test_falls_back_to_word_boundary() {
        let chunks = split_message("alpha beta gamma delta", 11);
        assert_eq!(chunks, vec!["alpha beta", "gamma delta"]);
    }

    #[test]
    fn test_hard_cut_without_boundaries() {
        let chunks = split_message("abcdefghij", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_astral_characters_count_as_two_units() {
        // Each emoji is one char but two UTF-16 units.
        let text = "\u{1F600}".repeat(6);
        let chunks = split_message(&text, 4);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| utf16_len(c) <= 4));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_astral_heavy_text_stays_under_telegram_limit() {
        let text = "\u{1F4D6} ".repeat(1500);
        let chunks = split_message(&text, 4096);
        assert!(chunks.len() >= 2);
        assert!(chunks.iter().all(|c| utf16_len(c) <= 4096));
    }

    #[test]
    fn test_astral_character_over_tiny_limit_still_progresses() {
        assert_eq!(split_message("\u{1F600}a", 1), vec!["\u{1F600}", "a"]);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let text = "ёёёё ёёёё";
        let chunks = split_message(text, 4);
        assert_eq!(chunks, vec!["ёёёё", "ёёёё"]);
    }

    #[test]
    fn test_no_chunk_exceeds_limit_and_nothing_lost() {
        let text = "word ".repeat(2000);
        let chunks = split_message(&text, 4096);
        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| utf16_len(c) <= 4096));
        let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.split(' ')).collect();
        assert_eq!(rejoined.len(), 2000);
    }
}
