//! Structural edits and in-place stream (de)compression

use tracing::trace;

use super::ByteBuffer;
use crate::codec::{self, CompressionLevel};
use crate::error::{BufferError, BufferResult};

impl ByteBuffer {
    /// Insert `count` zero bytes at `offset`, shifting trailing content right
    ///
    /// `offset` may equal the buffer length to append.
    pub fn insert_bytes(&mut self, offset: usize, count: usize) -> BufferResult<()> {
        self.region(offset, 0)?;
        if count == 0 {
            return Ok(());
        }

        let len = self.data.len();
        let Some(new_len) = len.checked_add(count) else {
            return self.fail(BufferError::InvalidArguments(format!(
                "inserting {count} bytes overflows buffer length {len}"
            )));
        };
        if self.data.try_reserve_exact(count).is_err() {
            return self.fail(BufferError::InvalidArguments(format!(
                "cannot grow buffer from {len} to {new_len} bytes"
            )));
        }
        self.data.resize(new_len, 0);
        if offset < len {
            self.data.copy_within(offset..len, offset + count);
            self.data[offset..offset + count].fill(0);
        }
        self.modified = true;
        trace!("inserted {count} bytes at {offset:#x}, length now {}", self.data.len());
        Ok(())
    }

    /// Remove `count` bytes at `offset`, shifting trailing content left
    pub fn delete_bytes(&mut self, offset: usize, count: usize) -> BufferResult<()> {
        let range = self.region(offset, count)?;
        if count == 0 {
            return Ok(());
        }

        let len = self.data.len();
        if range.end < len {
            self.data.copy_within(range.end..len, offset);
        }
        self.data.truncate(len - count);
        self.modified = true;
        trace!("deleted {count} bytes at {offset:#x}, length now {}", self.data.len());
        Ok(())
    }

    /// Decompress the zlib stream stored in `offset..offset + size`
    ///
    /// The buffer is left untouched.
    pub fn decompress_region(&mut self, offset: usize, size: usize) -> BufferResult<Vec<u8>> {
        let range = self.region(offset, size)?;
        if size == 0 {
            let len = self.data.len();
            return self.fail(BufferError::OutOfRange { offset, size, len });
        }
        let result = codec::decompress(&self.data[range], size);
        self.record(result)
    }

    /// Like [`ByteBuffer::decompress_replace`], producing at most `limit`
    /// bytes
    ///
    /// Decompressed content past `limit` is discarded without being
    /// inflated. Returns the length of the decompressed region.
    pub fn decompress_replace_limited(
        &mut self,
        offset: usize,
        size: usize,
        limit: usize,
    ) -> BufferResult<usize> {
        let range = self.region(offset, size)?;
        if size == 0 {
            let len = self.data.len();
            return self.fail(BufferError::OutOfRange { offset, size, len });
        }
        let result = codec::decompress_limited(&self.data[range], limit);
        let decompressed = self.record(result)?;
        self.replace_region(offset, size, &decompressed)?;
        trace!(
            "decompressed {size} bytes at {offset:#x} into {} bytes (limit {limit})",
            decompressed.len()
        );
        Ok(decompressed.len())
    }

    /// Compress `offset..offset + size` into a zlib stream
    ///
    /// The buffer is left untouched.
    pub fn compress_region(
        &mut self,
        offset: usize,
        size: usize,
        level: CompressionLevel,
    ) -> BufferResult<Vec<u8>> {
        let range = self.region(offset, size)?;
        let result = codec::compress(&self.data[range], level);
        self.record(result)
    }

    /// Replace a zlib stream in place with its decompressed content
    ///
    /// The buffer is resized to fit. Returns the length of the
    /// decompressed region.
    pub fn decompress_replace(&mut self, offset: usize, size: usize) -> BufferResult<usize> {
        let decompressed = self.decompress_region(offset, size)?;
        self.replace_region(offset, size, &decompressed)?;
        trace!(
            "decompressed {size} bytes at {offset:#x} into {} bytes",
            decompressed.len()
        );
        Ok(decompressed.len())
    }

    /// Replace `offset..offset + size` in place with its zlib stream
    ///
    /// The buffer is resized to fit. Returns the length of the compressed
    /// region.
    pub fn compress_replace(
        &mut self,
        offset: usize,
        size: usize,
        level: CompressionLevel,
    ) -> BufferResult<usize> {
        let compressed = self.compress_region(offset, size, level)?;
        self.replace_region(offset, size, &compressed)?;
        trace!(
            "compressed {size} bytes at {offset:#x} into {} bytes",
            compressed.len()
        );
        Ok(compressed.len())
    }

    /// Swap `offset..offset + old_size` for `replacement`, resizing the
    /// buffer by the difference first
    fn replace_region(
        &mut self,
        offset: usize,
        old_size: usize,
        replacement: &[u8],
    ) -> BufferResult<()> {
        let new_size = replacement.len();
        if new_size > old_size {
            self.insert_bytes(offset + old_size, new_size - old_size)?;
        } else if new_size < old_size {
            self.delete_bytes(offset + new_size, old_size - new_size)?;
        }
        self.data[offset..offset + new_size].copy_from_slice(replacement);
        self.modified = true;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_in_middle() {
        let mut buf = ByteBuffer::wrap(vec![1, 2, 3, 4]);
        buf.insert_bytes(2, 3).unwrap();
        assert_eq!(buf.as_bytes(), &[1, 2, 0, 0, 0, 3, 4]);
        assert!(buf.is_modified());
    }

    #[test]
    fn test_insert_at_edges() {
        let mut buf = ByteBuffer::wrap(vec![1, 2]);
        buf.insert_bytes(0, 2).unwrap();
        assert_eq!(buf.as_bytes(), &[0, 0, 1, 2]);
        buf.insert_bytes(4, 1).unwrap();
        assert_eq!(buf.as_bytes(), &[0, 0, 1, 2, 0]);

        let mut empty = ByteBuffer::new();
        empty.insert_bytes(0, 0x34).unwrap();
        assert_eq!(empty.buffer_length(), 0x34);
    }

    #[test]
    fn test_insert_past_end_fails() {
        let mut buf = ByteBuffer::wrap(vec![1, 2]);
        assert_eq!(buf.insert_bytes(3, 1).unwrap_err().kind(), ErrorKind::OutOfRange);
        assert_eq!(buf.as_bytes(), &[1, 2]);
    }

    #[test]
    fn test_insert_overflowing_count_fails() {
        let mut buf = ByteBuffer::wrap(vec![1, 2, 3]);
        let err = buf.insert_bytes(1, usize::MAX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArguments);
        assert_eq!(buf.error(), Some(&err));
        assert_eq!(buf.as_bytes(), &[1, 2, 3]);
        assert!(!buf.is_modified());

        buf.clear_error();
        let err = buf.insert_bytes(3, usize::MAX - 8).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArguments);
        assert_eq!(buf.as_bytes(), &[1, 2, 3]);
    }

    #[test]
    fn test_zero_length_edits_are_noops() {
        let mut buf = ByteBuffer::wrap(vec![1, 2]);
        buf.insert_bytes(1, 0).unwrap();
        buf.delete_bytes(2, 0).unwrap();
        assert!(!buf.is_modified());
    }

    #[test]
    fn test_delete_at_edges() {
        let mut buf = ByteBuffer::wrap((0u8..8).collect());
        buf.delete_bytes(0, 2).unwrap();
        assert_eq!(buf.as_bytes(), &[2, 3, 4, 5, 6, 7]);
        buf.delete_bytes(4, 2).unwrap();
        assert_eq!(buf.as_bytes(), &[2, 3, 4, 5]);
        buf.delete_bytes(1, 2).unwrap();
        assert_eq!(buf.as_bytes(), &[2, 5]);
        buf.delete_bytes(0, 2).unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn test_delete_past_end_fails() {
        let mut buf = ByteBuffer::wrap(vec![1, 2, 3]);
        assert_eq!(buf.delete_bytes(2, 2).unwrap_err().kind(), ErrorKind::OutOfRange);
        assert_eq!(buf.as_bytes(), &[1, 2, 3]);
    }

    #[test]
    fn test_compress_replace_preserves_surroundings() {
        let payload = b"AREA".repeat(256);
        let mut data = vec![0xA1, 0xA2];
        data.extend_from_slice(&payload);
        data.extend_from_slice(&[0xB1, 0xB2, 0xB3]);
        let mut buf = ByteBuffer::wrap(data);

        let compressed_len = buf
            .compress_replace(2, payload.len(), CompressionLevel::BEST)
            .unwrap();
        assert!(compressed_len < payload.len());
        assert_eq!(buf.buffer_length(), 2 + compressed_len + 3);
        assert_eq!(&buf.as_bytes()[..2], &[0xA1, 0xA2]);
        assert_eq!(&buf.as_bytes()[2 + compressed_len..], &[0xB1, 0xB2, 0xB3]);

        let restored_len = buf.decompress_replace(2, compressed_len).unwrap();
        assert_eq!(restored_len, payload.len());
        assert_eq!(&buf.as_bytes()[2..2 + payload.len()], payload.as_slice());
        assert_eq!(&buf.as_bytes()[2 + payload.len()..], &[0xB1, 0xB2, 0xB3]);
    }

    #[test]
    fn test_region_helpers_leave_buffer_untouched() {
        let mut buf = ByteBuffer::wrap(b"hello hello hello".to_vec());
        let compressed = buf.compress_region(0, 17, CompressionLevel::Default).unwrap();
        assert!(!buf.is_modified());

        let mut packed = ByteBuffer::wrap(compressed);
        let len = packed.buffer_length();
        assert_eq!(packed.decompress_region(0, len).unwrap(), b"hello hello hello");
        assert!(!packed.is_modified());
    }

    #[test]
    fn test_decompress_requires_non_empty_region() {
        let mut buf = ByteBuffer::with_len(4);
        assert_eq!(buf.decompress_replace(0, 0).unwrap_err().kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn test_decompress_replace_limited_caps_output() {
        let payload = vec![0x11; 8192];
        let mut buf = ByteBuffer::wrap(payload.clone());
        let packed = buf.compress_replace(0, payload.len(), CompressionLevel::BEST).unwrap();

        let unpacked = buf.decompress_replace_limited(0, packed, 100).unwrap();
        assert_eq!(unpacked, 100);
        assert_eq!(buf.as_bytes(), &payload[..100]);
    }

    #[test]
    fn test_decompress_garbage_sets_codec_error() {
        let mut buf = ByteBuffer::wrap(vec![0xFF; 32]);
        let err = buf.decompress_replace(0, 32).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Codec);
        assert_eq!(buf.error(), Some(&err));
        assert_eq!(buf.as_bytes(), &[0xFF; 32]);
        assert!(!buf.is_modified());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn insert_then_delete_restores(
                data in prop::collection::vec(any::<u8>(), 0..256),
                pos in any::<prop::sample::Index>(),
                count in 0usize..64
            ) {
                let offset = pos.index(data.len() + 1);
                let mut buf = ByteBuffer::wrap(data.clone());
                buf.insert_bytes(offset, count).unwrap();
                prop_assert_eq!(buf.buffer_length(), data.len() + count);
                prop_assert!(buf.as_bytes()[offset..offset + count].iter().all(|&b| b == 0));
                buf.delete_bytes(offset, count).unwrap();
                prop_assert_eq!(buf.as_bytes(), data.as_slice());
            }

            #[test]
            fn compress_then_decompress_restores(
                prefix in prop::collection::vec(any::<u8>(), 0..32),
                region in prop::collection::vec(any::<u8>(), 0..2048),
                suffix in prop::collection::vec(any::<u8>(), 0..32),
                level in -2i32..=9
            ) {
                let mut data = prefix.clone();
                data.extend_from_slice(&region);
                data.extend_from_slice(&suffix);
                let mut buf = ByteBuffer::wrap(data.clone());

                let packed = buf
                    .compress_replace(prefix.len(), region.len(), CompressionLevel::from_i32(level))
                    .unwrap();
                let unpacked = buf.decompress_replace(prefix.len(), packed).unwrap();

                prop_assert_eq!(unpacked, region.len());
                prop_assert_eq!(buf.as_bytes(), data.as_slice());
            }
        }
    }
}
