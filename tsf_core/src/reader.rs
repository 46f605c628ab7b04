use anyhow::bail;

use crate::varint::read_varint;

/// Forward-only cursor over an immutable byte buffer.
///
/// Every read validates that enough bytes remain before advancing, so a
/// truncated or corrupt buffer surfaces as an error at the exact offset
/// where the stream ran dry, never as garbage values. The cursor only moves
/// forward; there is no seek.
///
/// The reader borrows its input and never copies or mutates it.
#[derive(Debug)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current offset from the start of the buffer.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left between the cursor and the end of the buffer.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> anyhow::Result<&'a [u8]> {
        if self.remaining() < n {
            bail!(
                "unexpected end of buffer: need {} bytes at offset {} but only {} remain",
                n,
                self.pos,
                self.remaining()
            );
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn u8(&mut self) -> anyhow::Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// A raw signed byte, read back from its two's-complement bit pattern.
    pub fn i8(&mut self) -> anyhow::Result<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn u16(&mut self) -> anyhow::Result<u16> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into()?))
    }

    pub fn u32(&mut self) -> anyhow::Result<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into()?))
    }

    pub fn varint(&mut self) -> anyhow::Result<u64> {
        read_varint(self.buf, &mut self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_advance_the_cursor() {
        let bytes = [0xAB, 0x34, 0x12, 0xEF, 0xBE, 0xAD, 0xDE, 0xFE, 0xAC, 0x02];
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.u8().unwrap(), 0xAB);
        assert_eq!(r.u16().unwrap(), 0x1234);
        assert_eq!(r.u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(r.i8().unwrap(), -2);
        assert_eq!(r.varint().unwrap(), 300);
        assert_eq!(r.position(), bytes.len());
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn reading_past_the_end_is_an_error() {
        let bytes = [0x01, 0x02];
        let mut r = ByteReader::new(&bytes);
        r.u16().unwrap();
        let err = r.u32().unwrap_err();
        assert!(
            err.to_string().contains("unexpected end of buffer"),
            "{err}"
        );
        // The failed read must not have advanced the cursor.
        assert_eq!(r.position(), 2);
    }

    #[test]
    fn truncated_varint_reports_the_offset() {
        let bytes = [0x00, 0x80];
        let mut r = ByteReader::new(&bytes);
        r.u8().unwrap();
        let err = r.varint().unwrap_err();
        assert!(err.to_string().contains("offset 2"), "{err}");
    }
}
