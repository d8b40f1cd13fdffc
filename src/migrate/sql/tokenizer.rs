use anyhow::{Result, bail};

/// One parenthesized value list. `None` is an unquoted `NULL`.
pub type RowTuple = Vec<Option<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuesScan {
    pub rows: Vec<RowTuple>,
    /// Bytes of input read, including the terminating `;` when one was found.
    pub consumed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Depth 0: whitespace and separators between tuples are skipped.
    BetweenTuples,
    /// Inside a tuple, outside any quoted literal.
    InTuple,
    /// Inside a `'...'` literal; `''` is the only escape.
    InQuoted,
}

#[derive(Debug)]
struct Scanner {
    state: ScanState,
    depth: usize,
    current: String,
    current_quoted: bool,
    quote_opened_at: usize,
    tuple: RowTuple,
    rows: Vec<RowTuple>,
}

impl Scanner {
    fn new() -> Self {
        Self {
            state: ScanState::BetweenTuples,
            depth: 0,
            current: String::new(),
            current_quoted: false,
            quote_opened_at: 0,
            tuple: Vec::new(),
            rows: Vec::new(),
        }
    }

    fn push(&mut self, ch: char) {
        if self.depth >= 1 {
            self.current.push(ch);
        }
    }

    fn unquoted_state(&self) -> ScanState {
        if self.depth == 0 {
            ScanState::BetweenTuples
        } else {
            ScanState::InTuple
        }
    }

    fn flush_scalar(&mut self) {
        let raw = std::mem::take(&mut self.current);
        let trimmed = raw.trim();
        let value = if !self.current_quoted && trimmed.eq_ignore_ascii_case("null") {
            None
        } else {
            Some(trimmed.to_string())
        };
        self.current_quoted = false;
        self.tuple.push(value);
    }

    fn flush_tuple(&mut self) {
        let tuple = std::mem::take(&mut self.tuple);
        self.rows.push(tuple);
    }
}

/// Scans the text that follows the `VALUES` keyword of one INSERT statement
/// into row tuples. Scanning stops at the first `;` outside any tuple.
pub fn scan_values(input: &str) -> Result<ValuesScan> {
    let mut scanner = Scanner::new();
    let mut chars = input.char_indices().peekable();

    while let Some((offset, ch)) = chars.next() {
        match scanner.state {
            ScanState::InQuoted => {
                if ch != '\'' {
                    scanner.push(ch);
                    continue;
                }

                if matches!(chars.peek(), Some((_, '\''))) {
                    chars.next();
                    scanner.push('\'');
                } else {
                    scanner.state = scanner.unquoted_state();
                }
            }
            ScanState::BetweenTuples | ScanState::InTuple => match ch {
                '\'' => {
                    if scanner.depth >= 1 {
                        scanner.current_quoted = true;
                    }
                    scanner.quote_opened_at = offset;
                    scanner.state = ScanState::InQuoted;
                }
                '(' => {
                    // nested parentheses are literal text inside the value
                    scanner.push('(');
                    scanner.depth += 1;
                    scanner.state = ScanState::InTuple;
                }
                ')' => {
                    if scanner.depth == 1 {
                        scanner.flush_scalar();
                        scanner.flush_tuple();
                    } else if scanner.depth > 1 {
                        scanner.push(')');
                    }
                    scanner.depth = scanner.depth.saturating_sub(1);
                    scanner.state = scanner.unquoted_state();
                }
                ',' if scanner.depth == 1 => scanner.flush_scalar(),
                ';' if scanner.depth == 0 => {
                    return Ok(ValuesScan {
                        rows: scanner.rows,
                        consumed: offset + ch.len_utf8(),
                    });
                }
                _ => scanner.push(ch),
            },
        }
    }

    if scanner.state == ScanState::InQuoted {
        bail!(
            "unterminated quoted string starting at byte {} of the VALUES list",
            scanner.quote_opened_at
        );
    }

    Ok(ValuesScan {
        rows: scanner.rows,
        consumed: input.len(),
    })
}
