//! Logical line reconstruction over arbitrarily sized text chunks.
//!
//! `\n` and `\r\n` both terminate a line. Quoting is not considered here, so a
//! quoted field holding a literal line break is split into two lines.

use memchr::{memchr, memrchr};
use std::mem;

/// Carries the unterminated tail of the input between [`feed`](Self::feed) calls.
#[derive(Debug, Default)]
pub struct LineTokenizer {
    fragment: String,
}

impl LineTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns every line it completes.
    ///
    /// Lines are yielded lazily; the trailing unterminated segment stays
    /// buffered for the next call.
    pub fn feed(&mut self, chunk: &str) -> Lines {
        let carried = self.fragment.len();
        self.fragment.push_str(chunk);

        // Only the new chunk can contain a terminator the fragment did not have.
        let Some(last_nl) = memrchr(b'\n', chunk.as_bytes()) else {
            return Lines::default();
        };
        let tail = self.fragment.split_off(carried + last_nl + 1);
        let complete = mem::replace(&mut self.fragment, tail);
        Lines {
            buf: complete,
            pos: 0,
        }
    }

    /// Drains the remaining fragment once the source is exhausted.
    pub fn finish(&mut self) -> Option<String> {
        let mut rest = mem::take(&mut self.fragment);
        if rest.is_empty() {
            return None;
        }
        if rest.ends_with('\r') {
            rest.pop();
        }
        Some(rest)
    }

    /// Bytes currently held back waiting for a terminator.
    pub fn pending(&self) -> usize {
        self.fragment.len()
    }
}

/// Complete lines produced by one [`LineTokenizer::feed`] call.
#[derive(Debug, Default)]
pub struct Lines {
    buf: String,
    pos: usize,
}

impl Iterator for Lines {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let rest = &self.buf[self.pos..];
        let nl = memchr(b'\n', rest.as_bytes())?;
        let line = rest[..nl].strip_suffix('\r').unwrap_or(&rest[..nl]);
        let line = line.to_string();
        self.pos += nl + 1;
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(chunks: &[&str]) -> Vec<String> {
        let mut tokenizer = LineTokenizer::new();
        let mut lines = Vec::new();
        for chunk in chunks {
            lines.extend(tokenizer.feed(chunk));
        }
        lines.extend(tokenizer.finish());
        lines
    }

    #[test]
    fn carries_fragment_across_feeds() {
        let mut tokenizer = LineTokenizer::new();
        assert_eq!(tokenizer.feed("name,ag").count(), 0);
        assert_eq!(tokenizer.pending(), 7);
        let lines: Vec<_> = tokenizer.feed("e\nJo,3").collect();
        assert_eq!(lines, vec!["name,age"]);
        assert_eq!(tokenizer.finish().as_deref(), Some("Jo,3"));
        assert_eq!(tokenizer.finish(), None);
    }

    #[test]
    fn crlf_and_lf_are_equivalent() {
        assert_eq!(tokenize(&["a\r\nb\nc\r\n"]), vec!["a", "b", "c"]);
    }

    #[test]
    fn crlf_split_between_chunks() {
        assert_eq!(tokenize(&["a\r", "\nb"]), vec!["a", "b"]);
    }

    #[test]
    fn empty_lines_are_kept() {
        assert_eq!(tokenize(&["a\n\nb\n"]), vec!["a", "", "b"]);
    }

    #[test]
    fn empty_final_fragment_yields_nothing() {
        assert_eq!(tokenize(&["a\n"]), vec!["a"]);
        assert!(tokenize(&[""]).is_empty());
    }

    #[test]
    fn unterminated_final_line_drops_carriage_return() {
        assert_eq!(tokenize(&["a\nb\r"]), vec!["a", "b"]);
    }

    #[test]
    fn quoted_line_break_splits_the_line() {
        assert_eq!(tokenize(&["\"x\ny\",z\n"]), vec!["\"x", "y\",z"]);
    }

    #[test]
    fn chunk_boundaries_do_not_change_lines() {
        let text = "h1,h2\r\n\"a,b\",c\n\nd,\"e\"\"f\"\r\nlast";
        let whole = tokenize(&[text]);
        let cuts: Vec<usize> = (0..=text.len())
            .filter(|&i| text.is_char_boundary(i))
            .collect();

        for &i in &cuts {
            for &j in cuts.iter().filter(|&&j| j >= i) {
                let chunks = [&text[..i], &text[i..j], &text[j..]];
                assert_eq!(tokenize(&chunks), whole, "cuts at {i} and {j}");
            }
        }
    }
}
