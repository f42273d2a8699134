use crate::error::DecodeError;

/// Forward-only cursor over the raw bytes of a register block, with signed
/// relative seeks.
///
/// The SolarEdge register map places each scale factor *after* the group of
/// fields it governs, so the decoder skips ahead to read the factor and then
/// rewinds to the fields. Every move and every read is bounds-checked; a bad
/// offset in the field table surfaces as `OutOfRange` instead of a silent
/// misread.
#[derive(Debug)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Moves the read position by `n` bytes; negative values rewind.
    pub fn skip(&mut self, n: i64) -> Result<(), DecodeError> {
        let target = self.pos as i64 + n;
        if target < 0 || target > self.data.len() as i64 {
            return Err(DecodeError::OutOfRange {
                pos: target,
                len: self.data.len(),
            });
        }
        self.pos = target as usize;
        Ok(())
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        let bytes = self.take(2)?;
        Ok(i16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn take(&mut self, width: usize) -> Result<&'a [u8], DecodeError> {
        if self.pos + width > self.data.len() {
            return Err(DecodeError::OutOfRange {
                pos: (self.pos + width) as i64,
                len: self.data.len(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + width];
        self.pos += width;
        Ok(bytes)
    }
}
