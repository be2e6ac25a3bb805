// SPDX-License-Identifier: PMPL-1.0-or-later

//! Line-oriented view of contract source text
//!
//! All offsets are byte offsets into the raw text. The masked copy has every
//! comment byte and every string-literal byte between the quotes replaced by
//! a space (newlines kept), so offsets and line numbers are identical between
//! the two.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static STATE_VAR_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:mapping\s*\(.*\)|[A-Za-z_][\w\.]*(?:\[\d*\])*)\s+(?:(?:public|private|internal|override|transient)\s+)*([A-Za-z_]\w*)\s*(?:=[^=]|;)",
    )
    .expect("state variable pattern is valid")
});

const NON_DECLARATION_PREFIXES: &[&str] = &[
    "function",
    "modifier",
    "event",
    "error",
    "constructor",
    "struct",
    "enum",
    "using",
    "return",
    "emit",
    "receive",
    "fallback",
];

/// A function declaration and its body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSpan {
    pub name: String,
    /// Offset of the `function` keyword
    pub start: usize,
    /// Offsets of the body, braces included
    pub body: Range<usize>,
}

impl FunctionSpan {
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.body.end
    }
}

/// A contract-level storage declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateVariable {
    pub name: String,
    pub line: usize,
}

pub struct SourceText<'a> {
    raw: &'a str,
    masked: String,
    line_starts: Vec<usize>,
}

impl<'a> SourceText<'a> {
    pub fn new(raw: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            raw.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );

        Self {
            raw,
            masked: mask_non_code(raw),
            line_starts,
        }
    }

    pub fn raw(&self) -> &'a str {
        self.raw
    }

    pub fn masked(&self) -> &str {
        &self.masked
    }

    /// Number of lines as an editor would count them
    pub fn total_lines(&self) -> usize {
        self.raw.lines().count()
    }

    /// 1-indexed line containing `offset`: newlines before it, plus one
    pub fn line_of(&self, offset: usize) -> usize {
        let offset = offset.min(self.raw.len());
        match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        }
    }

    /// Byte offset at which a 1-indexed line starts
    pub fn line_start(&self, line: usize) -> Option<usize> {
        line.checked_sub(1)
            .and_then(|idx| self.line_starts.get(idx).copied())
    }

    /// Raw text of a 1-indexed line, without its terminator
    pub fn line(&self, line: usize) -> Option<&'a str> {
        self.line_span(line)
            .map(|span| self.raw[span].trim_end_matches('\r'))
    }

    /// Comment-masked text of a 1-indexed line
    pub fn masked_line(&self, line: usize) -> Option<&str> {
        self.line_span(line)
            .map(|span| self.masked[span].trim_end_matches('\r'))
    }

    fn line_span(&self, line: usize) -> Option<Range<usize>> {
        let start = self.line_start(line)?;
        let end = self
            .line_starts
            .get(line)
            .map(|next| next - 1)
            .unwrap_or(self.raw.len());
        Some(start..end)
    }

    /// Number of physical lines, including a trailing empty line
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// The ±2 lines around `line`, joined with newlines
    pub fn snippet(&self, line: usize) -> String {
        if line == 0 || line > self.line_count() {
            return String::new();
        }
        let first = line.saturating_sub(2).max(1);
        let last = (line + 2).min(self.line_count());
        (first..=last)
            .filter_map(|n| self.line(n))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Balanced block following `from`.
    ///
    /// Parenthesized headers are skipped; a `;` at paren depth zero before any
    /// `{` means there is no block. Returns the span from `{` through `}`.
    pub fn block_after(&self, from: usize) -> Option<Range<usize>> {
        let bytes = self.masked.as_bytes();
        let mut paren = 0usize;
        let mut idx = from;
        while idx < bytes.len() {
            match bytes[idx] {
                b'(' => paren += 1,
                b')' => paren = paren.saturating_sub(1),
                b';' if paren == 0 => return None,
                b'{' if paren == 0 => break,
                _ => {}
            }
            idx += 1;
        }
        if idx >= bytes.len() {
            return None;
        }

        let open = idx;
        let mut depth = 0usize;
        for (pos, byte) in bytes.iter().enumerate().skip(open) {
            match byte {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(open..pos + 1);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Function whose body encloses `offset`.
    ///
    /// Walks backward to the nearest preceding `function` keyword and forward
    /// to its balanced closing brace. Returns `None` when that function does
    /// not contain the offset (the match sits in a constructor or modifier).
    pub fn enclosing_function(&self, offset: usize) -> Option<FunctionSpan> {
        let offset = offset.min(self.masked.len());
        let mut search_end = offset;
        loop {
            let start = self.masked[..search_end].rfind("function")?;
            if is_keyword_at(&self.masked, start, "function") {
                let span = self.function_at(start)?;
                return span.contains(offset).then_some(span);
            }
            search_end = start;
        }
    }

    /// Every function declaration with a body, in source order
    pub fn functions(&self) -> Vec<FunctionSpan> {
        let mut spans = Vec::new();
        let mut cursor = 0;
        while let Some(rel) = self.masked[cursor..].find("function") {
            let start = cursor + rel;
            cursor = start + "function".len();
            if !is_keyword_at(&self.masked, start, "function") {
                continue;
            }
            if let Some(span) = self.function_at(start) {
                spans.push(span);
            }
        }
        spans
    }

    fn function_at(&self, start: usize) -> Option<FunctionSpan> {
        let after = start + "function".len();
        let name: String = self.masked[after..]
            .trim_start()
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        let body = self.block_after(after)?;
        Some(FunctionSpan {
            name: if name.is_empty() {
                "<anonymous>".to_string()
            } else {
                name
            },
            start,
            body,
        })
    }

    /// Storage variables declared directly inside a contract body
    pub fn state_variables(&self) -> Vec<StateVariable> {
        let mut vars = Vec::new();
        let mut depth = 0usize;
        let mut contract_depths: Vec<usize> = Vec::new();
        let mut pending_contract = false;

        for (idx, line) in self.masked.split('\n').enumerate() {
            let trimmed = line.trim_start();
            let in_contract_body = contract_depths.last() == Some(&depth);

            if in_contract_body
                && !NON_DECLARATION_PREFIXES
                    .iter()
                    .any(|prefix| is_keyword_at(trimmed, 0, prefix))
                && !line.contains(" constant ")
                && !line.contains(" immutable ")
            {
                if let Some(caps) = STATE_VAR_DECL.captures(line) {
                    vars.push(StateVariable {
                        name: caps[1].to_string(),
                        line: idx + 1,
                    });
                }
            }

            if ["contract", "abstract", "library"]
                .iter()
                .any(|kw| is_keyword_at(trimmed, 0, kw))
            {
                pending_contract = true;
            }

            for byte in line.bytes() {
                match byte {
                    b'{' => {
                        depth += 1;
                        if pending_contract {
                            contract_depths.push(depth);
                            pending_contract = false;
                        }
                    }
                    b'}' => {
                        if contract_depths.last() == Some(&depth) {
                            contract_depths.pop();
                        }
                        depth = depth.saturating_sub(1);
                    }
                    _ => {}
                }
            }
        }
        vars
    }
}

/// True when `word` occurs at `pos` bounded by non-identifier characters
pub fn is_keyword_at(text: &str, pos: usize, word: &str) -> bool {
    if !text[pos..].starts_with(word) {
        return false;
    }
    let is_ident = |c: char| c.is_alphanumeric() || c == '_';
    let before_ok = text[..pos].chars().next_back().map_or(true, |c| !is_ident(c));
    let after_ok = text[pos + word.len()..]
        .chars()
        .next()
        .map_or(true, |c| !is_ident(c));
    before_ok && after_ok
}

/// Replace comment and string-literal bytes with spaces.
///
/// Newlines and the quote characters themselves are kept.
fn mask_non_code(raw: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Code,
        LineComment,
        BlockComment,
        Str(u8),
    }

    let bytes = raw.as_bytes();
    let mut out = bytes.to_vec();
    let mut state = State::Code;
    let mut idx = 0;

    while idx < bytes.len() {
        let byte = bytes[idx];
        let next = bytes.get(idx + 1).copied();
        match state {
            State::Code => match (byte, next) {
                (b'/', Some(b'/')) => {
                    out[idx] = b' ';
                    out[idx + 1] = b' ';
                    idx += 1;
                    state = State::LineComment;
                }
                (b'/', Some(b'*')) => {
                    out[idx] = b' ';
                    out[idx + 1] = b' ';
                    idx += 1;
                    state = State::BlockComment;
                }
                (b'"', _) | (b'\'', _) => state = State::Str(byte),
                _ => {}
            },
            State::LineComment => {
                if byte == b'\n' {
                    state = State::Code;
                } else {
                    out[idx] = b' ';
                }
            }
            State::BlockComment => {
                if byte == b'*' && next == Some(b'/') {
                    out[idx] = b' ';
                    out[idx + 1] = b' ';
                    idx += 1;
                    state = State::Code;
                } else if byte != b'\n' {
                    out[idx] = b' ';
                }
            }
            State::Str(quote) => {
                if byte == quote || byte == b'\n' {
                    state = State::Code;
                } else if byte == b'\\' && next.is_some_and(|n| n != b'\n') {
                    out[idx] = b' ';
                    out[idx + 1] = b' ';
                    idx += 1;
                } else {
                    out[idx] = b' ';
                }
            }
        }
        idx += 1;
    }

    // Every byte of a masked multi-byte character is overwritten, so the
    // output stays valid UTF-8.
    String::from_utf8(out).unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned())
}
