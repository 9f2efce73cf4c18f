//! Token stream: the raw argument list plus the single shared cursor.
//!
//! Backends never index the token array themselves. They read through
//! [`TokenStream::get_next_argument`] and use the checkpoint pair
//! ([`fetch_current_position`](TokenStream::fetch_current_position) /
//! [`restore_position`](TokenStream::restore_position)) to back out of a
//! failed match so the same tokens can be offered to the next backend.

/// Index of a parser in the orchestrator's active list.
pub type ParserId = usize;

/// A suspended, partially matched argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedPosition {
    /// Cursor at the time the argument was suspended.
    pub position: usize,
    /// Parser that owns the pending argument.
    pub parser: ParserId,
}

#[derive(Debug)]
pub struct TokenStream<'a> {
    tokens: &'a [String],
    /// Committed cursor; only moves forward except through rollback.
    position: usize,
    /// Read cursor; the next token handed out by `get_next_argument`.
    fetched_position: usize,
    saved: Vec<SavedPosition>,
}

impl<'a> TokenStream<'a> {
    pub fn new(tokens: &'a [String]) -> Self {
        Self {
            tokens,
            position: 0,
            fetched_position: 0,
            saved: Vec::new(),
        }
    }

    /// Committed cursor.
    pub fn current_position(&self) -> usize {
        self.position
    }

    /// Read cursor.
    pub fn fetched_position(&self) -> usize {
        self.fetched_position
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Whether every token has been committed.
    pub fn at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// Token at the committed cursor, without consuming it.
    pub fn current_token(&self) -> Option<&'a str> {
        self.tokens.get(self.position).map(String::as_str)
    }

    /// Hand out the token at the read cursor and advance it.
    pub fn get_next_argument(&mut self) -> Option<&'a str> {
        let token = self.tokens.get(self.fetched_position)?;
        self.fetched_position += 1;
        Some(token.as_str())
    }

    /// Commit everything read so far and return the new checkpoint.
    pub fn fetch_current_position(&mut self) -> usize {
        self.position = self.fetched_position;
        self.position
    }

    /// Roll the read cursor back to the last checkpoint.
    pub fn restore_position(&mut self) {
        self.fetched_position = self.position;
    }

    /// Step over the token at the committed cursor without offering it to
    /// anyone. Used for tokens dropped under a `skip` policy.
    pub fn skip_current(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
        self.fetched_position = self.position;
    }

    /// Suspend a partially matched argument owned by `parser`.
    pub fn save_current_position(&mut self, parser: ParserId) {
        self.saved.push(SavedPosition {
            position: self.position,
            parser,
        });
    }

    /// Most recently suspended argument, if any.
    pub fn pop_saved_parser(&mut self) -> Option<SavedPosition> {
        self.saved.pop()
    }

    pub fn saved_count(&self) -> usize {
        self.saved.len()
    }
}
