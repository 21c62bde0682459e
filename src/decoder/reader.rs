//! Endian-aware reader over the body of a single STDF record.
//!
//! STDF allows trailing fields of a record to be omitted, so every read
//! returns `None` once the body is exhausted (or too short for the field)
//! instead of failing. Record parsers use `?` to stop at the first missing
//! field.

/// Cursor over one record body
pub struct FieldReader<'a> {
    data: &'a [u8],
    pos: usize,
    little_endian: bool,
}

impl<'a> FieldReader<'a> {
    pub fn new(data: &'a [u8], little_endian: bool) -> Self {
        Self {
            data,
            pos: 0,
            little_endian,
        }
    }

    #[inline]
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let end = self.pos.checked_add(N)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        bytes.try_into().ok()
    }

    #[inline]
    fn take_slice(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Unsigned 1-byte integer (also B1 flag bytes)
    #[inline]
    pub fn u1(&mut self) -> Option<u8> {
        self.take::<1>().map(|b| b[0])
    }

    /// Unsigned 2-byte integer
    #[inline]
    pub fn u2(&mut self) -> Option<u16> {
        let b = self.take::<2>()?;
        Some(if self.little_endian {
            u16::from_le_bytes(b)
        } else {
            u16::from_be_bytes(b)
        })
    }

    /// Unsigned 4-byte integer
    #[inline]
    pub fn u4(&mut self) -> Option<u32> {
        let b = self.take::<4>()?;
        Some(if self.little_endian {
            u32::from_le_bytes(b)
        } else {
            u32::from_be_bytes(b)
        })
    }

    #[inline]
    pub fn i1(&mut self) -> Option<i8> {
        self.u1().map(|v| v as i8)
    }

    #[inline]
    pub fn i2(&mut self) -> Option<i16> {
        self.u2().map(|v| v as i16)
    }

    #[inline]
    pub fn i4(&mut self) -> Option<i32> {
        self.u4().map(|v| v as i32)
    }

    /// 4-byte IEEE float
    #[inline]
    pub fn r4(&mut self) -> Option<f32> {
        self.u4().map(f32::from_bits)
    }

    /// Single character (C*1)
    pub fn c1(&mut self) -> Option<char> {
        self.u1().map(char::from)
    }

    /// Length-prefixed character string (C*n)
    pub fn cn(&mut self) -> Option<String> {
        let len = self.u1()? as usize;
        let bytes = self.take_slice(len)?;
        Some(String::from_utf8_lossy(bytes).trim_end_matches('\0').to_string())
    }

    /// Length-prefixed byte field (B*n), skipped
    pub fn skip_bn(&mut self) -> Option<()> {
        let len = self.u1()? as usize;
        self.take_slice(len).map(|_| ())
    }

    /// Bit-count-prefixed bit field (D*n), skipped
    pub fn skip_dn(&mut self) -> Option<()> {
        let bits = self.u2()? as usize;
        self.take_slice(bits.div_ceil(8)).map(|_| ())
    }

    /// Array of `count` nibbles (N*1), skipped
    pub fn skip_nibbles(&mut self, count: usize) -> Option<()> {
        self.take_slice(count.div_ceil(2)).map(|_| ())
    }

    /// Array of `count` U*2 values
    pub fn u2_array(&mut self, count: usize) -> Option<Vec<u16>> {
        (0..count).map(|_| self.u2()).collect()
    }

    /// Array of `count` R*4 values
    pub fn r4_array(&mut self, count: usize) -> Option<Vec<f32>> {
        (0..count).map(|_| self.r4()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u2_both_endians() {
        let data = [0x01, 0x02];
        assert_eq!(FieldReader::new(&data, true).u2(), Some(0x0201));
        assert_eq!(FieldReader::new(&data, false).u2(), Some(0x0102));
    }

    #[test]
    fn test_read_u4_le() {
        // 210000 = 0x00033450
        let data = [0x50, 0x34, 0x03, 0x00];
        assert_eq!(FieldReader::new(&data, true).u4(), Some(210_000));
    }

    #[test]
    fn test_read_cn() {
        let data = [0x05, b'H', b'e', b'l', b'l', b'o', 0x00];
        let mut reader = FieldReader::new(&data, true);
        assert_eq!(reader.cn().as_deref(), Some("Hello"));
        assert_eq!(reader.cn().as_deref(), Some(""));
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_read_r4_le() {
        let bytes = 3.25f32.to_le_bytes();
        assert_eq!(FieldReader::new(&bytes, true).r4(), Some(3.25));
    }

    #[test]
    fn test_truncated_fields_return_none() {
        let data = [0x01];
        let mut reader = FieldReader::new(&data, true);
        assert_eq!(reader.u2(), None);

        // String claims 4 bytes but only 2 remain
        let data = [0x04, b'a', b'b'];
        assert_eq!(FieldReader::new(&data, true).cn(), None);
    }

    #[test]
    fn test_skip_dn_and_nibbles() {
        // 10 bits -> 2 bytes, then 3 nibbles -> 2 bytes, then one u1
        let data = [0x0A, 0x00, 0xFF, 0x03, 0x12, 0x30, 0x07];
        let mut reader = FieldReader::new(&data, true);
        reader.skip_dn().unwrap();
        reader.skip_nibbles(3).unwrap();
        assert_eq!(reader.u1(), Some(7));
    }
}
