//! ANSI codepage transcoding
//!
//! Infinity Engine resources store text in a single-byte Windows codepage.
//! The [`TextTranscoder`] trait is the seam the buffer uses for string
//! fields; [`Codepage`] implements it on top of `encoding_rs`.

use encoding_rs::Encoding;
use thiserror::Error;

/// Transcoding failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscodeError {
    /// Input bytes are not valid in the source encoding
    #[error("malformed {encoding} input")]
    Malformed {
        /// Encoding name
        encoding: &'static str,
    },

    /// Text contains characters the target encoding cannot represent
    #[error("text is not representable in {encoding}")]
    Unmappable {
        /// Encoding name
        encoding: &'static str,
    },
}

/// Converts between an on-disk byte encoding and UTF-8
pub trait TextTranscoder {
    /// Decode raw bytes into a UTF-8 string
    fn decode(&self, bytes: &[u8]) -> Result<String, TranscodeError>;

    /// Encode a UTF-8 string into raw bytes
    fn encode(&self, text: &str) -> Result<Vec<u8>, TranscodeError>;
}

/// Single-byte codepage backed by `encoding_rs`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codepage(&'static Encoding);

impl Codepage {
    /// Wrap an `encoding_rs` encoding
    pub fn new(encoding: &'static Encoding) -> Self {
        Self(encoding)
    }

    /// Windows-1252, the codepage used by western game releases
    pub fn windows_1252() -> Self {
        Self(encoding_rs::WINDOWS_1252)
    }

    /// Look up a codepage by WHATWG label (e.g. `"windows-1251"`)
    pub fn for_label(label: &str) -> Option<Self> {
        Encoding::for_label(label.as_bytes()).map(Self)
    }

    /// Canonical encoding name
    pub fn name(&self) -> &'static str {
        self.0.name()
    }
}

impl Default for Codepage {
    fn default() -> Self {
        Self::windows_1252()
    }
}

impl TextTranscoder for Codepage {
    fn decode(&self, bytes: &[u8]) -> Result<String, TranscodeError> {
        self.0
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(std::borrow::Cow::into_owned)
            .ok_or(TranscodeError::Malformed {
                encoding: self.0.name(),
            })
    }

    fn encode(&self, text: &str) -> Result<Vec<u8>, TranscodeError> {
        let (bytes, _, had_unmappable) = self.0.encode(text);
        if had_unmappable {
            return Err(TranscodeError::Unmappable {
                encoding: self.0.name(),
            });
        }
        Ok(bytes.into_owned())
    }
}
