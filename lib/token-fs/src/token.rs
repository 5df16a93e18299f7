use crate::{BufferCopier, FsError, Result};
use std::fmt;

/// Byte that ends every stored token.
pub(crate) const LINE_DELIMITER: u8 = b'\n';

#[inline]
pub(crate) fn is_word_delimiter(byte: u8) -> bool {
    matches!(byte, b' ' | b'\n' | b'\t')
}

/// One stored "word line": the word bytes followed by a single `\n`.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    text: Box<[u8]>,
}

impl Token {
    /// Build a token from a word living in caller memory. The word bytes are
    /// moved into the new buffer through `copier`.
    pub(crate) fn copy_from(word: &[u8], copier: &dyn BufferCopier) -> Result<Self> {
        let mut text = Vec::new();
        text.try_reserve_exact(word.len() + 1)
            .map_err(|_| FsError::AllocationFailed)?;
        text.resize(word.len(), 0);
        copier.copy_in(&mut text, word)?;
        text.push(LINE_DELIMITER);
        Ok(Self {
            text: text.into_boxed_slice(),
        })
    }

    /// The full token text, trailing newline included.
    pub fn text(&self) -> &[u8] {
        &self.text
    }

    /// The word without its trailing newline.
    pub fn word(&self) -> &[u8] {
        &self.text[..self.text.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Always false: a token holds at least its newline.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token")
            .field(&String::from_utf8_lossy(&self.text))
            .finish()
    }
}

/// Iterator over the delimiter-terminated words of a write payload.
///
/// A word still open when the payload ends is not yielded, and a NUL byte
/// ends the payload early.
#[derive(Debug)]
pub(crate) struct Words<'a> {
    rest: &'a [u8],
}

impl<'a> Words<'a> {
    pub(crate) fn new(payload: &'a [u8]) -> Self {
        let end = payload.iter().position(|b| *b == 0).unwrap_or(payload.len());
        Self {
            rest: &payload[..end],
        }
    }
}

impl<'a> Iterator for Words<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.rest.iter().position(|b| !is_word_delimiter(*b))?;
        let rest = &self.rest[start..];
        let Some(len) = rest.iter().position(|b| is_word_delimiter(*b)) else {
            // Unterminated trailing word.
            self.rest = &[];
            return None;
        };
        self.rest = &rest[len + 1..];
        Some(&rest[..len])
    }
}
