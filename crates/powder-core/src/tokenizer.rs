//! Quote-aware delimited-row tokenizer.
//!
//! Splits a character stream into rows of fields. Double-quoted fields may
//! contain the delimiter or newlines, and `""` inside quotes is a literal
//! quote. Fields are returned untrimmed; callers trim as they see fit.
//!
//! The reader is a five-state automaton. [`transition`] is the whole state
//! table and is public so it can be exercised on its own:
//!
//! | state          | delim     | quote         | newline | other  | eof          |
//! |----------------|-----------|---------------|---------|--------|--------------|
//! | `Field`        | Delimited | QuoteEntered  | RowEnd  | Field  | RowEnd       |
//! | `Delimited`    | Delimited | QuoteEntered  | RowEnd  | Field  | RowEnd       |
//! | `QuoteEntered` | Quoted    | QuoteExited   | Quoted  | Quoted | Unterminated |
//! | `Quoted`       | Quoted    | QuoteExited   | Quoted  | Quoted | Unterminated |
//! | `QuoteExited`  | Delimited | Quoted        | RowEnd  | Field  | RowEnd       |
//!
//! Entering `Field` or `Quoted` stores the current character; entering
//! `Delimited` or ending the row emits the field under construction.
//!
//! # Example
//!
//! ```rust
//! use powder_core::tokenizer::Rows;
//!
//! let rows: Vec<_> = Rows::new("name,\"a,b\"\n1,2\n".chars())
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(rows, vec![vec!["name", "a,b"], vec!["1", "2"]]);
//! ```

use std::iter::Peekable;

use thiserror::Error;

/// Automaton states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Accumulating an unquoted field (the character was stored).
    Field,
    /// A delimiter just closed a field.
    Delimited,
    /// An opening quote was just read.
    QuoteEntered,
    /// Accumulating inside quotes (the character was stored).
    Quoted,
    /// A quote inside a quoted field was just read: either an escape or the close.
    QuoteExited,
}

/// Character classes the automaton distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Delimiter,
    Quote,
    Newline,
    Other,
    EndOfInput,
}

/// Result of feeding one character class to the automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    To(State),
    RowEnd,
    UnterminatedQuote,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("end of input inside a quoted field (row {row})")]
    UnterminatedQuote { row: usize },
}

/// The state table.
pub fn transition(state: State, class: CharClass) -> Transition {
    use CharClass::*;
    use State::*;

    match (state, class) {
        (Field | Delimited, Delimiter) => Transition::To(Delimited),
        (Field | Delimited, Quote) => Transition::To(QuoteEntered),
        (Field | Delimited, Newline | EndOfInput) => Transition::RowEnd,
        (Field | Delimited, Other) => Transition::To(Field),

        (QuoteEntered | Quoted, Quote) => Transition::To(QuoteExited),
        (QuoteEntered | Quoted, EndOfInput) => Transition::UnterminatedQuote,
        (QuoteEntered | Quoted, Delimiter | Newline | Other) => Transition::To(Quoted),

        (QuoteExited, Delimiter) => Transition::To(Delimited),
        (QuoteExited, Quote) => Transition::To(Quoted),
        (QuoteExited, Newline | EndOfInput) => Transition::RowEnd,
        (QuoteExited, Other) => Transition::To(Field),
    }
}

/// Lazy iterator of rows over a character source.
pub struct Rows<I: Iterator<Item = char>> {
    chars: Peekable<I>,
    delimiter: char,
    row: usize,
    finished: bool,
}

impl<I: Iterator<Item = char>> Rows<I> {
    /// Comma-delimited rows.
    pub fn new(chars: I) -> Self {
        Self::with_delimiter(chars, ',')
    }

    /// Rows split on `delimiter`. A leading byte-order mark is skipped.
    pub fn with_delimiter(chars: I, delimiter: char) -> Self {
        let mut chars = chars.peekable();
        chars.next_if_eq(&'\u{feff}');
        Self {
            chars,
            delimiter,
            row: 0,
            finished: false,
        }
    }

    fn classify(&self, ch: Option<char>) -> CharClass {
        match ch {
            None => CharClass::EndOfInput,
            Some(c) if c == self.delimiter => CharClass::Delimiter,
            Some('"') => CharClass::Quote,
            Some('\n') => CharClass::Newline,
            Some(_) => CharClass::Other,
        }
    }

    fn read_row(&mut self) -> Result<Vec<String>, TokenizeError> {
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut state = State::Field;

        loop {
            let ch = self.chars.next();
            match transition(state, self.classify(ch)) {
                Transition::To(next) => {
                    match next {
                        State::Field | State::Quoted => {
                            if let Some(c) = ch {
                                field.push(c);
                            }
                        }
                        State::Delimited => fields.push(std::mem::take(&mut field)),
                        State::QuoteEntered | State::QuoteExited => {}
                    }
                    state = next;
                }
                Transition::RowEnd => {
                    fields.push(field);
                    return Ok(fields);
                }
                Transition::UnterminatedQuote => {
                    return Err(TokenizeError::UnterminatedQuote { row: self.row });
                }
            }
        }
    }
}

impl<I: Iterator<Item = char>> Iterator for Rows<I> {
    type Item = Result<Vec<String>, TokenizeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.chars.peek().is_none() {
            return None;
        }
        let result = self.read_row();
        if result.is_err() {
            self.finished = true;
        }
        self.row += 1;
        Some(result)
    }
}

/// Tokenize a whole string with the default comma delimiter.
pub fn rows(text: &str) -> Rows<std::str::Chars<'_>> {
    Rows::new(text.chars())
}
