//! Greedy word wrapping shared by the slide renderer and the PDF deck.
//!
//! Words are appended to the current line while its measured width stays
//! within the budget; the first word that does not fit starts a new line. A
//! single word wider than the budget gets a line of its own and is never
//! split. Lines past `max_lines` are dropped, not overflowed.

/// Wrap `text` into at most `max_lines` lines no wider than `max_width`.
///
/// `measure` returns the rendered width of a candidate line, in whatever unit
/// `max_width` uses (pixels for images, points for PDF pages). Runs of
/// whitespace collapse to a single space.
pub fn wrap_words<F>(text: &str, max_width: f32, max_lines: usize, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f32,
{
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if lines.len() >= max_lines {
            break;
        }
        if current.is_empty() {
            current.push_str(word);
            continue;
        }

        let candidate = format!("{current} {word}");
        if measure(&candidate) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }

    if !current.is_empty() && lines.len() < max_lines {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One unit per character.
    fn chars(s: &str) -> f32 {
        s.chars().count() as f32
    }

    #[test]
    fn short_text_is_one_identical_line() {
        let text = "Cell biology basics";
        let lines = wrap_words(text, 100.0, 2, chars);
        assert_eq!(lines, vec![text.to_string()]);

        // Wrapping the result again changes nothing.
        let again = wrap_words(&lines[0], 100.0, 2, chars);
        assert_eq!(again, lines);
    }

    #[test]
    fn greedy_breaks_at_budget() {
        let lines = wrap_words("aaa bbb ccc ddd", 7.0, 10, chars);
        assert_eq!(lines, vec!["aaa bbb", "ccc ddd"]);
    }

    #[test]
    fn exact_fit_stays_on_line() {
        let lines = wrap_words("ab cd", 5.0, 10, chars);
        assert_eq!(lines, vec!["ab cd"]);
    }

    #[test]
    fn excess_lines_are_dropped() {
        let lines = wrap_words("one two three four five six", 5.0, 2, chars);
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn overlong_word_gets_its_own_line() {
        let lines = wrap_words("a supercalifragilistic b", 5.0, 5, chars);
        assert_eq!(lines, vec!["a", "supercalifragilistic", "b"]);
    }

    #[test]
    fn whitespace_is_normalised() {
        let lines = wrap_words("  spaced \n\t out  ", 100.0, 2, chars);
        assert_eq!(lines, vec!["spaced out"]);
    }

    #[test]
    fn empty_text_has_no_lines() {
        assert!(wrap_words("", 10.0, 2, chars).is_empty());
        assert!(wrap_words("   ", 10.0, 2, chars).is_empty());
        assert!(wrap_words("word", 10.0, 0, chars).is_empty());
    }
}
