//! Typed, textual and raw accessors

use tracing::warn;

use super::ByteBuffer;
use crate::error::{BufferError, BufferResult};
use crate::offsets::FieldWidth;
use crate::text::{Codepage, TextTranscoder};

impl ByteBuffer {
    fn read_array<const N: usize>(&mut self, offset: usize) -> BufferResult<[u8; N]> {
        let range = self.region(offset, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[range]);
        Ok(out)
    }

    /// Write `bytes` at `offset` and return the bytes previously stored there
    fn swap_array<const N: usize>(&mut self, offset: usize, bytes: [u8; N]) -> BufferResult<[u8; N]> {
        let previous = self.read_array::<N>(offset)?;
        self.write_if_different(offset, &bytes);
        Ok(previous)
    }

    /// Read an unsigned byte
    pub fn get_u8(&mut self, offset: usize) -> BufferResult<u8> {
        Ok(u8::from_le_bytes(self.read_array(offset)?))
    }

    /// Read a signed byte
    pub fn get_i8(&mut self, offset: usize) -> BufferResult<i8> {
        Ok(i8::from_le_bytes(self.read_array(offset)?))
    }

    /// Read a little-endian `u16`
    pub fn get_u16(&mut self, offset: usize) -> BufferResult<u16> {
        Ok(u16::from_le_bytes(self.read_array(offset)?))
    }

    /// Read a little-endian `i16`
    pub fn get_i16(&mut self, offset: usize) -> BufferResult<i16> {
        Ok(i16::from_le_bytes(self.read_array(offset)?))
    }

    /// Read a little-endian `u32`
    pub fn get_u32(&mut self, offset: usize) -> BufferResult<u32> {
        Ok(u32::from_le_bytes(self.read_array(offset)?))
    }

    /// Read a little-endian `i32`
    pub fn get_i32(&mut self, offset: usize) -> BufferResult<i32> {
        Ok(i32::from_le_bytes(self.read_array(offset)?))
    }

    /// Read an unsigned value whose width is chosen at run time
    pub fn get_uint(&mut self, offset: usize, width: FieldWidth) -> BufferResult<u32> {
        match width {
            FieldWidth::Byte => self.get_u8(offset).map(u32::from),
            FieldWidth::Word => self.get_u16(offset).map(u32::from),
            FieldWidth::Dword => self.get_u32(offset),
        }
    }

    /// Read a sign-extended value whose width is chosen at run time
    pub fn get_int(&mut self, offset: usize, width: FieldWidth) -> BufferResult<i32> {
        match width {
            FieldWidth::Byte => self.get_i8(offset).map(i32::from),
            FieldWidth::Word => self.get_i16(offset).map(i32::from),
            FieldWidth::Dword => self.get_i32(offset),
        }
    }

    /// Write an unsigned byte, returning the previous value
    pub fn put_u8(&mut self, offset: usize, value: u8) -> BufferResult<u8> {
        self.swap_array(offset, value.to_le_bytes()).map(u8::from_le_bytes)
    }

    /// Write a signed byte, returning the previous value
    pub fn put_i8(&mut self, offset: usize, value: i8) -> BufferResult<i8> {
        self.swap_array(offset, value.to_le_bytes()).map(i8::from_le_bytes)
    }

    /// Write a little-endian `u16`, returning the previous value
    pub fn put_u16(&mut self, offset: usize, value: u16) -> BufferResult<u16> {
        self.swap_array(offset, value.to_le_bytes()).map(u16::from_le_bytes)
    }

    /// Write a little-endian `i16`, returning the previous value
    pub fn put_i16(&mut self, offset: usize, value: i16) -> BufferResult<i16> {
        self.swap_array(offset, value.to_le_bytes()).map(i16::from_le_bytes)
    }

    /// Write a little-endian `u32`, returning the previous value
    pub fn put_u32(&mut self, offset: usize, value: u32) -> BufferResult<u32> {
        self.swap_array(offset, value.to_le_bytes()).map(u32::from_le_bytes)
    }

    /// Write a little-endian `i32`, returning the previous value
    pub fn put_i32(&mut self, offset: usize, value: i32) -> BufferResult<i32> {
        self.swap_array(offset, value.to_le_bytes()).map(i32::from_le_bytes)
    }

    /// Copy `size` bytes starting at `offset`
    pub fn get_bytes(&mut self, offset: usize, size: usize) -> BufferResult<Vec<u8>> {
        let range = self.region(offset, size)?;
        Ok(self.data[range].to_vec())
    }

    /// Write `bytes` at `offset`
    pub fn put_bytes(&mut self, offset: usize, bytes: &[u8]) -> BufferResult<()> {
        self.region(offset, bytes.len())?;
        self.write_if_different(offset, bytes);
        Ok(())
    }

    /// Read a Windows-1252 text field of `size` bytes
    ///
    /// With `null_terminated`, the text ends at the first zero byte inside
    /// the field.
    pub fn get_string(
        &mut self,
        offset: usize,
        size: usize,
        null_terminated: bool,
    ) -> BufferResult<String> {
        self.get_string_with(offset, size, null_terminated, Some(&Codepage::windows_1252()))
    }

    /// Read a text field of `size` bytes through `transcoder`
    ///
    /// `None` reads the bytes as UTF-8. Bytes that fail to transcode are
    /// returned as lossy UTF-8 instead of failing the read.
    pub fn get_string_with(
        &mut self,
        offset: usize,
        size: usize,
        null_terminated: bool,
        transcoder: Option<&dyn TextTranscoder>,
    ) -> BufferResult<String> {
        self.check()?;
        if size == 0 {
            return Ok(String::new());
        }
        let range = self.region(offset, size)?;
        let mut field = &self.data[range];
        if null_terminated {
            if let Some(end) = field.iter().position(|&b| b == 0) {
                field = &field[..end];
            }
        }

        let raw = || String::from_utf8_lossy(field).into_owned();
        Ok(match transcoder {
            Some(t) => t.decode(field).unwrap_or_else(|e| {
                warn!("text field at {offset:#x}: {e}, using raw bytes");
                raw()
            }),
            None => raw(),
        })
    }

    /// Write `value` into a Windows-1252 text field of `size` bytes
    ///
    /// Shorter text is zero-padded; longer text is truncated to the field.
    /// Text that fills the field exactly is written without terminator.
    pub fn put_string(&mut self, offset: usize, size: usize, value: &str) -> BufferResult<()> {
        self.put_string_with(offset, size, value, Some(&Codepage::windows_1252()))
    }

    /// Write `value` into a text field of `size` bytes through `transcoder`
    ///
    /// `None` writes raw UTF-8. Text that fails to transcode is written as
    /// raw UTF-8 instead of failing the write.
    pub fn put_string_with(
        &mut self,
        offset: usize,
        size: usize,
        value: &str,
        transcoder: Option<&dyn TextTranscoder>,
    ) -> BufferResult<()> {
        self.check()?;
        if size == 0 {
            return Ok(());
        }
        self.region(offset, size)?;

        let mut field = match transcoder {
            Some(t) => t.encode(value).unwrap_or_else(|e| {
                warn!("text field at {offset:#x}: {e}, writing raw bytes");
                value.as_bytes().to_vec()
            }),
            None => value.as_bytes().to_vec(),
        };
        field.resize(size, 0);
        self.write_if_different(offset, &field);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::text::TranscodeError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_little_endian_layout() {
        let mut buf = ByteBuffer::with_len(8);
        buf.put_u32(0, 0x0352_5650).unwrap();
        buf.put_i16(4, -2).unwrap();
        assert_eq!(buf.as_bytes(), &[0x50, 0x56, 0x52, 0x03, 0xFE, 0xFF, 0, 0]);
        assert_eq!(buf.get_u16(4).unwrap(), 0xFFFE);
        assert_eq!(buf.get_i8(5).unwrap(), -1);
    }

    #[test]
    fn test_put_returns_previous_value() {
        let mut buf = ByteBuffer::wrap(vec![7, 0, 0, 0]);
        assert_eq!(buf.put_u8(0, 9), Ok(7));
        assert_eq!(buf.put_i32(0, -1), Ok(9));
        assert_eq!(buf.get_u32(0), Ok(u32::MAX));
    }

    #[test]
    fn test_unchanged_write_keeps_clean_state() {
        let mut buf = ByteBuffer::wrap(vec![1, 2, 3, 4]);
        buf.put_u16(0, 0x0201).unwrap();
        buf.put_bytes(2, &[3, 4]).unwrap();
        assert!(!buf.is_modified());

        buf.put_u8(3, 5).unwrap();
        assert!(buf.is_modified());
    }

    #[test]
    fn test_reads_at_end_are_out_of_range() {
        let mut buf = ByteBuffer::with_len(4);
        assert_eq!(buf.get_u32(0), Ok(0));
        assert_eq!(
            buf.get_u16(3),
            Err(BufferError::OutOfRange {
                offset: 3,
                size: 2,
                len: 4
            })
        );
        buf.clear_error();
        assert_eq!(buf.get_u8(4).unwrap_err().kind(), ErrorKind::OutOfRange);
        buf.clear_error();
        assert!(buf.get_u8(usize::MAX).is_err());
    }

    #[test]
    fn test_dynamic_width_reads_sign_extend() {
        let mut buf = ByteBuffer::wrap(vec![0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(buf.get_int(0, FieldWidth::Byte), Ok(-1));
        assert_eq!(buf.get_int(0, FieldWidth::Word), Ok(-1));
        assert_eq!(buf.get_uint(0, FieldWidth::Word), Ok(0xFFFF));
        assert_eq!(buf.get_uint(0, FieldWidth::Dword), Ok(u32::MAX));
    }

    #[test]
    fn test_get_bytes_copies_region() {
        let mut buf = ByteBuffer::wrap((0u8..10).collect());
        assert_eq!(buf.get_bytes(3, 4).unwrap(), vec![3, 4, 5, 6]);
        assert_eq!(buf.get_bytes(10, 0).unwrap(), Vec::<u8>::new());
        assert!(buf.get_bytes(8, 3).is_err());
    }

    #[test]
    fn test_short_string_is_zero_padded() {
        let mut buf = ByteBuffer::wrap(vec![0xAA; 8]);
        buf.put_string(0, 8, "SW1H01").unwrap();
        assert_eq!(buf.as_bytes(), b"SW1H01\0\0");
        assert_eq!(buf.get_string(0, 8, true).unwrap(), "SW1H01");
    }

    #[test]
    fn test_exact_size_string_has_no_terminator() {
        let mut buf = ByteBuffer::wrap(vec![0xAA; 10]);
        buf.put_string(1, 8, "AR0602AB").unwrap();
        assert_eq!(&buf.as_bytes()[1..9], b"AR0602AB");
        assert_eq!(buf.as_bytes()[9], 0xAA);
    }

    #[test]
    fn test_long_string_is_truncated() {
        let mut buf = ByteBuffer::with_len(4);
        buf.put_string(0, 4, "TOOLONG").unwrap();
        assert_eq!(buf.as_bytes(), b"TOOL");
    }

    #[test]
    fn test_null_termination_is_optional() {
        let mut buf = ByteBuffer::wrap(b"AB\0CD\0\0\0".to_vec());
        assert_eq!(buf.get_string(0, 8, true).unwrap(), "AB");
        assert_eq!(buf.get_string(0, 5, false).unwrap(), "AB\0CD");
        assert_eq!(buf.get_string(0, 0, true).unwrap(), "");
    }

    #[test]
    fn test_ansi_transcoding() {
        let mut buf = ByteBuffer::with_len(6);
        buf.put_string(0, 6, "Café").unwrap();
        assert_eq!(buf.as_bytes(), &[b'C', b'a', b'f', 0xE9, 0, 0]);
        assert_eq!(buf.get_string(0, 6, true).unwrap(), "Café");

        // Raw mode reads the codepage byte as lossy UTF-8
        assert_eq!(buf.get_string_with(0, 4, true, None).unwrap(), "Caf\u{FFFD}");
    }

    #[test]
    fn test_failed_transcoding_falls_back_to_raw_bytes() {
        struct Rejecting;
        impl TextTranscoder for Rejecting {
            fn decode(&self, _bytes: &[u8]) -> Result<String, TranscodeError> {
                Err(TranscodeError::Malformed { encoding: "test" })
            }
            fn encode(&self, _text: &str) -> Result<Vec<u8>, TranscodeError> {
                Err(TranscodeError::Unmappable { encoding: "test" })
            }
        }

        let mut buf = ByteBuffer::with_len(8);
        buf.put_string_with(0, 8, "ü", Some(&Rejecting)).unwrap();
        assert_eq!(&buf.as_bytes()[..3], &[0xC3, 0xBC, 0]);
        assert_eq!(buf.get_string_with(0, 8, true, Some(&Rejecting)).unwrap(), "ü");
        assert!(buf.error().is_none());
    }

    #[test]
    fn test_unchanged_string_keeps_clean_state() {
        let mut buf = ByteBuffer::wrap(b"DOOR01\0\0".to_vec());
        buf.put_string(0, 8, "DOOR01").unwrap();
        assert!(!buf.is_modified());

        // Same prefix, but the stale tail must still be cleared
        let mut buf = ByteBuffer::wrap(b"DOOR01XX".to_vec());
        buf.put_string(0, 8, "DOOR01").unwrap();
        assert!(buf.is_modified());
        assert_eq!(buf.as_bytes(), b"DOOR01\0\0");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn u32_round_trips(value in any::<u32>(), offset in 0usize..60) {
                let mut buf = ByteBuffer::with_len(64);
                buf.put_u32(offset, value).unwrap();
                prop_assert_eq!(buf.get_u32(offset).unwrap(), value);
                prop_assert_eq!(buf.get_i32(offset).unwrap(), value as i32);
                prop_assert_eq!(&buf.as_bytes()[offset..offset + 4], &value.to_le_bytes()[..]);
            }

            #[test]
            fn i16_round_trips(value in any::<i16>(), offset in 0usize..62) {
                let mut buf = ByteBuffer::with_len(64);
                buf.put_i16(offset, value).unwrap();
                prop_assert_eq!(buf.get_i16(offset).unwrap(), value);
                prop_assert_eq!(buf.get_u16(offset).unwrap(), value as u16);
            }

            #[test]
            fn u8_round_trips(value in any::<u8>(), offset in 0usize..64) {
                let mut buf = ByteBuffer::with_len(64);
                buf.put_u8(offset, value).unwrap();
                prop_assert_eq!(buf.get_u8(offset).unwrap(), value);
                prop_assert_eq!(buf.get_i8(offset).unwrap(), value as i8);
            }
        }
    }
}
