use anyhow::bail;

use crate::reader::ByteReader;
use crate::writer::ByteWriter;

/// Magic constant identifying a TSF1 buffer.
/// Written little-endian, so every buffer starts with the bytes `53 54`.
pub const MAGIC: u16 = 0x5453;

/// The single supported format version.
pub const VERSION: u8 = 1;

/// Number of value columns per row. The format hardcodes this: the column
/// count is not carried in the header, and every non-empty buffer has exactly
/// six column streams after the timestamp stream.
pub const COLUMN_COUNT: usize = 6;

/// Size of the degenerate buffer produced for empty input:
///   magic:u16 + version:u8 + row count varint `0` = 4 bytes.
pub const EMPTY_BUFFER_SIZE: usize = 4;

// ── Row ────────────────────────────────────────────────────────────────────

/// One time-series sample: a millisecond timestamp plus six numeric columns
/// (price, volume, Greeks, or whatever the producing feed carries).
///
/// Rows have no identity beyond their position in the encoded sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Row {
    /// Epoch milliseconds.
    pub ts: i64,
    pub values: [f64; COLUMN_COUNT],
}

impl Row {
    pub fn new(ts: i64, values: [f64; COLUMN_COUNT]) -> Self {
        Self { ts, values }
    }
}

// ── Scale configuration ────────────────────────────────────────────────────

/// Per-column power-of-ten scale exponents.
///
/// Column value `v` is stored as `round(v * 10^-exp)`; an exponent of `-2`
/// keeps two decimal digits, `0` stores integers as-is. Exponents travel in
/// the buffer header, so decode never needs the configuration re-supplied.
///
/// Fractional precision finer than the exponent is rounded away on encode.
/// That loss is the format's scale/size trade-off, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleConfig {
    exponents: [i8; COLUMN_COUNT],
}

impl ScaleConfig {
    pub const fn new(exponents: [i8; COLUMN_COUNT]) -> Self {
        Self { exponents }
    }

    /// Build from a runtime slice, rejecting any length other than
    /// [`COLUMN_COUNT`]. This is the validation path for exponents that
    /// arrive as user input rather than as a fixed-size array.
    pub fn from_slice(exponents: &[i8]) -> anyhow::Result<Self> {
        let Ok(exponents) = <[i8; COLUMN_COUNT]>::try_from(exponents) else {
            bail!(
                "scale configuration must have exactly {} exponents, got {}",
                COLUMN_COUNT,
                exponents.len()
            );
        };
        Ok(Self { exponents })
    }

    #[inline]
    pub fn exponents(&self) -> [i8; COLUMN_COUNT] {
        self.exponents
    }

    #[inline]
    pub fn exponent(&self, col: usize) -> i8 {
        self.exponents[col]
    }

    /// Multiplier that takes a raw column value to its scaled integer form:
    /// `10^-exp`, so exponent `-2` gives `100.0`.
    #[inline]
    pub fn factor(&self, col: usize) -> f64 {
        10f64.powi(-(self.exponents[col] as i32))
    }
}

// ── Header ─────────────────────────────────────────────────────────────────

/// Decoded representation of a TSF1 buffer header.
///
/// Wire layout, in write order:
/// ```text
/// magic:u16 LE | version:u8 | row count:varint
///   | base seconds:u32 LE | base millis:u16 LE | scale:6 × i8
/// ```
/// A zero row count ends the buffer right after the count: the degenerate
/// empty buffer carries no base timestamp and no scale bytes, and both read
/// back as zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tsf1Header {
    pub row_count: u64,
    /// Base timestamp in epoch milliseconds, reconstructed from the
    /// seconds/millis split on the wire.
    pub base_ts: i64,
    pub scale: ScaleConfig,
}

impl Tsf1Header {
    /// Serialize the header into `w`.
    ///
    /// The wire stores base seconds in 32 bits, so a base timestamp before
    /// the epoch or at or beyond `u32::MAX` seconds is rejected here, before
    /// any stream bytes are produced.
    pub fn write_to(&self, w: &mut ByteWriter) -> anyhow::Result<()> {
        w.u16(MAGIC);
        w.u8(VERSION);
        w.varint(self.row_count);
        if self.row_count == 0 {
            return Ok(());
        }

        let base_sec = self.base_ts / 1000;
        if self.base_ts < 0 || base_sec > u32::MAX as i64 {
            bail!(
                "base timestamp {} ms is outside the header's 32-bit seconds range",
                self.base_ts
            );
        }
        w.u32(base_sec as u32);
        w.u16((self.base_ts % 1000) as u16);
        for exp in self.scale.exponents() {
            w.i8(exp);
        }
        Ok(())
    }

    /// Deserialize a header from `r`, checking magic and version.
    ///
    /// The version gate is a closed match over the supported set; a new
    /// format revision becomes a new arm, not a rewrite of the decode path.
    pub fn read_from(r: &mut ByteReader) -> anyhow::Result<Self> {
        let magic = r.u16()?;
        if magic != MAGIC {
            bail!(
                "bad magic 0x{:04x} (expected 0x{:04x}): not a TSF1 buffer",
                magic,
                MAGIC
            );
        }
        let version = r.u8()?;
        match version {
            VERSION => {}
            other => bail!("unsupported TSF1 version {} (supported: {})", other, VERSION),
        }

        let row_count = r.varint()?;
        if row_count == 0 {
            return Ok(Self {
                row_count: 0,
                base_ts: 0,
                scale: ScaleConfig::new([0; COLUMN_COUNT]),
            });
        }

        let base_sec = r.u32()? as i64;
        let base_ms = r.u16()? as i64;
        let mut exponents = [0i8; COLUMN_COUNT];
        for exp in exponents.iter_mut() {
            *exp = r.i8()?;
        }
        Ok(Self {
            row_count,
            base_ts: base_sec * 1000 + base_ms,
            scale: ScaleConfig::new(exponents),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_config_rejects_wrong_length() {
        assert!(ScaleConfig::from_slice(&[-2, 0, -2, -2, -2]).is_err());
        assert!(ScaleConfig::from_slice(&[-2, 0, -2, -2, -2, -2, -2]).is_err());
        assert!(ScaleConfig::from_slice(&[]).is_err());
        assert!(ScaleConfig::from_slice(&[-2, 0, -2, -2, -2, -2]).is_ok());
    }

    #[test]
    fn scale_factor() {
        let scale = ScaleConfig::new([-2, 0, 2, -4, 0, 0]);
        assert_eq!(scale.factor(0), 100.0);
        assert_eq!(scale.factor(1), 1.0);
        assert_eq!(scale.factor(2), 0.01);
        assert_eq!(scale.factor(3), 10000.0);
    }

    #[test]
    fn header_roundtrip() {
        let header = Tsf1Header {
            row_count: 1000,
            base_ts: 1_700_000_000_123,
            scale: ScaleConfig::new([-2, 0, -2, -2, -2, -2]),
        };
        let mut w = ByteWriter::with_capacity(32);
        header.write_to(&mut w).unwrap();

        let bytes = w.into_bytes();
        assert_eq!(&bytes[..2], &[0x53, 0x54]);
        assert_eq!(bytes[2], VERSION);

        let mut r = ByteReader::new(&bytes);
        let back = Tsf1Header::read_from(&mut r).unwrap();
        assert_eq!(back, header);
    }

    #[test]
    fn empty_header_stops_after_row_count() {
        let header = Tsf1Header {
            row_count: 0,
            base_ts: 0,
            scale: ScaleConfig::new([0; COLUMN_COUNT]),
        };
        let mut w = ByteWriter::with_capacity(EMPTY_BUFFER_SIZE);
        header.write_to(&mut w).unwrap();
        assert_eq!(w.bytes(), &[0x53, 0x54, VERSION, 0]);

        let mut r = ByteReader::new(w.bytes());
        let back = Tsf1Header::read_from(&mut r).unwrap();
        assert_eq!(back.row_count, 0);
    }

    #[test]
    fn base_timestamp_out_of_range_rejected() {
        let scale = ScaleConfig::new([0; COLUMN_COUNT]);
        for bad_ts in [-1i64, (u32::MAX as i64 + 1) * 1000] {
            let header = Tsf1Header {
                row_count: 1,
                base_ts: bad_ts,
                scale,
            };
            let mut w = ByteWriter::with_capacity(32);
            let err = header.write_to(&mut w).unwrap_err();
            assert!(err.to_string().contains("base timestamp"), "{err}");
        }
    }

    #[test]
    fn bad_magic_rejected() {
        let bytes = [0xAA, 0x54, VERSION, 0];
        let mut r = ByteReader::new(&bytes);
        let err = Tsf1Header::read_from(&mut r).unwrap_err();
        assert!(err.to_string().contains("magic"), "{err}");
    }

    #[test]
    fn unsupported_version_rejected() {
        let bytes = [0x53, 0x54, 2, 0];
        let mut r = ByteReader::new(&bytes);
        let err = Tsf1Header::read_from(&mut r).unwrap_err();
        assert!(err.to_string().contains("version"), "{err}");
    }
}
