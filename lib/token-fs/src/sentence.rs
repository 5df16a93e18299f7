use crate::token::LINE_DELIMITER;
use crate::{BufferCopier, Result, TokenSequence};

const TERMINATOR: &[u8] = b". ";

/// Folds a file's tokens into the sentence displayed as its listing name.
///
/// `one\n two\n three\n` renders as `one two three. `. An empty file renders
/// as the bare terminator `. `.
#[derive(Clone, Copy, Debug)]
pub struct SentenceRenderer {
    max_bytes: usize,
}

impl SentenceRenderer {
    /// A renderer whose output never exceeds `max_bytes` bytes.
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// Render `sequence` from its first token.
    ///
    /// Tokens are read with a private cursor, so the sequence's shared read
    /// cursor is left alone. Rendering stops at the first token that would
    /// push the finished sentence past `max_bytes`; if not even the
    /// terminator fits, the result is empty. Only tokens that fit are
    /// copied, so memory use follows the sentence, not `max_bytes`.
    pub fn render(&self, sequence: &TokenSequence, copier: &dyn BufferCopier) -> Result<Vec<u8>> {
        if self.max_bytes < TERMINATOR.len() {
            return Ok(Vec::new());
        }

        let mut scratch = Vec::new();
        let mut out = Vec::new();
        let mut offset = 0;
        while let Some(token_len) = sequence.token_len(offset) {
            // `word` + separator now, plus the final `.` later.
            let word_len = token_len.saturating_sub(1);
            let needed = out
                .len()
                .saturating_add(word_len)
                .saturating_add(TERMINATOR.len());
            if needed > self.max_bytes {
                tracing::trace!(offset, max = self.max_bytes, "sentence truncated");
                break;
            }

            scratch.resize(token_len, 0);
            let outcome = sequence.read_token(offset, &mut scratch, copier)?;
            let word = match scratch[..outcome.len].split_last() {
                Some((&LINE_DELIMITER, word)) => word,
                _ => &scratch[..outcome.len],
            };
            out.extend_from_slice(word);
            out.push(b' ');
            offset += 1;
        }

        match out.last_mut() {
            Some(space) => {
                *space = TERMINATOR[0];
                out.push(TERMINATOR[1]);
            }
            None => out.extend_from_slice(TERMINATOR),
        }
        Ok(out)
    }
}
