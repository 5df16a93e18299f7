//! The word list behind one file node.

use crate::token::{Token, Words};
use crate::{BufferCopier, FsError, Result};

/// Result of a single token read.
///
/// `end_of_data` is a normal terminal signal, not an error: it is set when
/// the requested token does not exist, in which case nothing was copied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadOutcome {
    pub len: usize,
    pub end_of_data: bool,
}

impl ReadOutcome {
    const END: Self = Self {
        len: 0,
        end_of_data: true,
    };

    fn copied(len: usize) -> Self {
        Self {
            len,
            end_of_data: false,
        }
    }
}

/// Ordered tokens of one file plus the read cursor shared by every handle
/// open on it.
#[derive(Debug, Default)]
pub struct TokenSequence {
    tokens: Vec<Token>,
    read_cursor: usize,
    max_tokens: Option<u64>,
}

impl TokenSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sequence refusing to grow past `max_tokens` tokens.
    pub fn with_token_limit(max_tokens: Option<u64>) -> Self {
        Self {
            max_tokens,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Index of the token the next [`read_next`](Self::read_next) returns.
    pub fn cursor(&self) -> usize {
        self.read_cursor
    }

    /// Length of the token at `token_offset`, `None` past the end.
    pub fn token_len(&self, token_offset: usize) -> Option<usize> {
        self.tokens.get(token_offset).map(Token::len)
    }

    /// Length of the token under the shared cursor, `None` at end of data.
    pub fn next_len(&self) -> Option<usize> {
        self.token_len(self.read_cursor)
    }

    pub fn rewind(&mut self) {
        self.read_cursor = 0;
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    /// Split `payload` into words and link them, in order, right after the
    /// token currently at `at_token_offset`. An empty sequence takes them as
    /// its first tokens, and an offset past the last token appends them.
    ///
    /// Only delimiter-terminated words are stored: a trailing word with no
    /// delimiter after it is dropped. Every word is copied in before anything
    /// is linked, so on error the sequence is unchanged. Returns the number
    /// of payload bytes consumed, which is always `payload.len()`.
    pub fn write(
        &mut self,
        at_token_offset: usize,
        payload: &[u8],
        copier: &dyn BufferCopier,
    ) -> Result<usize> {
        let mut staged = Vec::new();
        for word in Words::new(payload) {
            if self.would_exceed_limit(staged.len() + 1) {
                tracing::debug!(
                    tokens = self.tokens.len(),
                    limit = ?self.max_tokens,
                    "token limit reached"
                );
                return Err(FsError::AllocationFailed);
            }
            staged
                .try_reserve(1)
                .map_err(|_| FsError::AllocationFailed)?;
            staged.push(Token::copy_from(word, copier)?);
        }

        let at = if at_token_offset < self.tokens.len() {
            at_token_offset + 1
        } else {
            self.tokens.len()
        };
        self.tokens
            .try_reserve(staged.len())
            .map_err(|_| FsError::AllocationFailed)?;
        let linked = staged.len();
        self.tokens.splice(at..at, staged);

        tracing::trace!(at, linked, bytes = payload.len(), "tokens linked");
        Ok(payload.len())
    }

    /// Copy the token at `token_offset` into `buf`, clipped to its length.
    pub fn read_token(
        &self,
        token_offset: usize,
        buf: &mut [u8],
        copier: &dyn BufferCopier,
    ) -> Result<ReadOutcome> {
        let Some(token) = self.tokens.get(token_offset) else {
            return Ok(ReadOutcome::END);
        };
        let len = token.len().min(buf.len());
        copier.copy_out(&mut buf[..len], &token.text()[..len])?;
        Ok(ReadOutcome::copied(len))
    }

    /// Read the token under the shared cursor and advance it.
    ///
    /// At most one token is returned per call, whatever the size of `buf`.
    /// Once the cursor is past the end every call reports end of data and
    /// the cursor stays where it is. The cursor does not move on error.
    pub fn read_next(&mut self, buf: &mut [u8], copier: &dyn BufferCopier) -> Result<ReadOutcome> {
        let outcome = self.read_token(self.read_cursor, buf, copier)?;
        if !outcome.end_of_data {
            self.read_cursor += 1;
        }
        tracing::trace!(cursor = self.read_cursor, len = outcome.len, "read_next");
        Ok(outcome)
    }

    fn would_exceed_limit(&self, extra: usize) -> bool {
        self.max_tokens
            .is_some_and(|max| (self.tokens.len() + extra) as u64 > max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HostCopy;
    use crate::copy::testing::FaultAfter;
    use pretty_assertions::assert_eq;

    fn words(seq: &TokenSequence) -> Vec<String> {
        seq.tokens()
            .map(|t| String::from_utf8_lossy(t.text()).into_owned())
            .collect()
    }

    fn filled(payload: &[u8]) -> TokenSequence {
        let mut seq = TokenSequence::new();
        seq.write(0, payload, &HostCopy).unwrap();
        seq
    }

    #[test]
    fn write_tokenizes_into_lines() {
        let mut seq = TokenSequence::new();
        assert_eq!(seq.write(0, b"the quick brown fox ", &HostCopy), Ok(20));
        assert_eq!(words(&seq), ["the\n", "quick\n", "brown\n", "fox\n"]);
    }

    #[test]
    fn write_drops_unterminated_word() {
        let mut seq = TokenSequence::new();
        assert_eq!(seq.write(0, b"the quick brown", &HostCopy), Ok(15));
        assert_eq!(words(&seq), ["the\n", "quick\n"]);
    }

    #[test]
    fn write_links_after_token_at_offset() {
        let mut seq = filled(b"a d ");
        seq.write(0, b"b c ", &HostCopy).unwrap();
        assert_eq!(words(&seq), ["a\n", "b\n", "c\n", "d\n"]);

        seq.write(2, b"x ", &HostCopy).unwrap();
        assert_eq!(words(&seq), ["a\n", "b\n", "c\n", "x\n", "d\n"]);
    }

    #[test]
    fn write_to_empty_sequence_starts_it() {
        let mut seq = TokenSequence::new();
        seq.write(5, b"first ", &HostCopy).unwrap();
        seq.write(0, b"second ", &HostCopy).unwrap();
        assert_eq!(words(&seq), ["first\n", "second\n"]);
    }

    #[test]
    fn write_past_end_appends() {
        let mut seq = filled(b"one two ");
        seq.write(99, b"three ", &HostCopy).unwrap();
        assert_eq!(words(&seq), ["one\n", "two\n", "three\n"]);
    }

    #[test]
    fn write_fault_leaves_sequence_unchanged() {
        let mut seq = filled(b"keep me ");
        // The second word's copy faults.
        assert_eq!(
            seq.write(1, b"x y z ", &FaultAfter::new(1)),
            Err(FsError::Fault)
        );
        assert_eq!(words(&seq), ["keep\n", "me\n"]);
    }

    #[test]
    fn write_respects_token_limit() {
        let mut seq = TokenSequence::with_token_limit(Some(3));
        seq.write(0, b"a b ", &HostCopy).unwrap();
        assert_eq!(
            seq.write(2, b"c d ", &HostCopy),
            Err(FsError::AllocationFailed)
        );
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.write(2, b"c ", &HostCopy), Ok(2));
        assert_eq!(seq.len(), 3);
    }

    #[test]
    fn read_next_yields_one_token_per_call() {
        let mut seq = filled(b"one two ");
        let mut buf = [0u8; 64];

        let first = seq.read_next(&mut buf, &HostCopy).unwrap();
        assert_eq!(first, ReadOutcome::copied(4));
        assert_eq!(&buf[..first.len], b"one\n");

        let second = seq.read_next(&mut buf, &HostCopy).unwrap();
        assert_eq!(&buf[..second.len], b"two\n");

        assert_eq!(seq.read_next(&mut buf, &HostCopy), Ok(ReadOutcome::END));
        assert_eq!(seq.cursor(), 2);
        assert_eq!(seq.read_next(&mut buf, &HostCopy), Ok(ReadOutcome::END));
        assert_eq!(seq.cursor(), 2);
    }

    #[test]
    fn read_clips_to_buffer() {
        let seq = filled(b"elephant ");
        let mut buf = [0u8; 3];
        assert_eq!(
            seq.read_token(0, &mut buf, &HostCopy),
            Ok(ReadOutcome::copied(3))
        );
        assert_eq!(&buf, b"ele");
    }

    #[test]
    fn read_fault_keeps_cursor() {
        let mut seq = filled(b"one ");
        let mut buf = [0u8; 8];
        assert_eq!(
            seq.read_next(&mut buf, &FaultAfter::new(0)),
            Err(FsError::Fault)
        );
        assert_eq!(seq.cursor(), 0);
    }

    #[test]
    fn rewind_restarts_reading() {
        let mut seq = filled(b"one ");
        let mut buf = [0u8; 8];
        seq.read_next(&mut buf, &HostCopy).unwrap();
        seq.rewind();
        assert_eq!(seq.cursor(), 0);
        assert_eq!(seq.read_next(&mut buf, &HostCopy), Ok(ReadOutcome::copied(4)));
    }
}
