//! In-place binary buffer editor
//!
//! [`ByteBuffer`] owns a byte array and exposes bounds-checked typed
//! accessors, structural edits and in-place zlib (de)compression.
//!
//! # Error model
//!
//! Every fallible operation returns a [`BufferResult`]. The first failure is
//! also recorded inside the buffer: while it is set, all further operations
//! return the recorded error without touching the content. Call
//! [`ByteBuffer::clear_error`] to resume.
//!
//! # Modification tracking
//!
//! Writes compare the new bytes with the current content first; the dirty
//! flag is only raised when content actually changes. Structural edits and
//! stream replacements always mark the buffer as modified.

mod access;
mod edit;

use std::io::{Read, Write};
use std::ops::Range;

use crate::error::{BufferError, BufferResult};

/// Growable byte buffer with sticky error and dirty tracking
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteBuffer {
    data: Vec<u8>,
    modified: bool,
    error: Option<BufferError>,
}

impl ByteBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer holding `len` zero bytes
    pub fn with_len(len: usize) -> Self {
        Self::wrap(vec![0; len])
    }

    /// Take ownership of `data` without copying
    pub fn wrap(data: Vec<u8>) -> Self {
        Self {
            data,
            modified: false,
            error: None,
        }
    }

    /// Read the whole of `reader` into a new buffer
    pub fn load<R: Read>(mut reader: R) -> BufferResult<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(Self::wrap(data))
    }

    /// Write the buffer content to `writer`
    ///
    /// Clears the modified flag on success.
    pub fn save<W: Write>(&mut self, mut writer: W) -> BufferResult<()> {
        self.check()?;
        let result = writer.write_all(&self.data).map_err(BufferError::from);
        self.record(result)?;
        self.modified = false;
        Ok(())
    }

    /// Current content
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer and return its content
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Replace the whole content
    ///
    /// Resets the error state and marks the buffer as modified.
    pub fn replace_buffer(&mut self, data: Vec<u8>) {
        self.data = data;
        self.modified = true;
        self.error = None;
    }

    /// Recorded error, if any
    pub fn error(&self) -> Option<&BufferError> {
        self.error.as_ref()
    }

    /// Clear the recorded error so subsequent operations run again
    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Length of the content in bytes
    pub fn buffer_length(&self) -> usize {
        self.data.len()
    }

    /// Alias for [`ByteBuffer::buffer_length`]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether content changed since load, save or [`ByteBuffer::clear_modified`]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Mark the buffer as unmodified
    pub fn clear_modified(&mut self) {
        self.modified = false;
    }

    /// Short-circuit with the recorded error
    pub(crate) fn check(&self) -> BufferResult<()> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Record `err` and return it
    pub(crate) fn fail<T>(&mut self, err: BufferError) -> BufferResult<T> {
        self.error = Some(err.clone());
        Err(err)
    }

    /// Record the error of `result`, if any
    pub(crate) fn record<T>(&mut self, result: BufferResult<T>) -> BufferResult<T> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => self.fail(err),
        }
    }

    /// Validate `offset..offset + size` against the current length
    fn region(&mut self, offset: usize, size: usize) -> BufferResult<Range<usize>> {
        self.check()?;
        let len = self.data.len();
        match offset.checked_add(size) {
            Some(end) if end <= len => Ok(offset..end),
            _ => self.fail(BufferError::OutOfRange { offset, size, len }),
        }
    }

    /// Overwrite `offset..offset + bytes.len()` if the content differs
    ///
    /// The range must already be validated.
    fn write_if_different(&mut self, offset: usize, bytes: &[u8]) {
        let target = &mut self.data[offset..offset + bytes.len()];
        if target != bytes {
            target.copy_from_slice(bytes);
            self.modified = true;
        }
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self::wrap(data)
    }
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
