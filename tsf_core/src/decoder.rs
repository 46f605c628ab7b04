use crate::format::{Row, Tsf1Header, COLUMN_COUNT};
use crate::reader::ByteReader;
use crate::varint::zigzag_decode;

/// Decode a TSF1 buffer back into its row sequence.
///
/// Header validation happens first: a bad magic, an unsupported version, or
/// any stream that runs past the end of the buffer fails the whole call with
/// a format error. There is no partial output; either every row decodes or
/// none do.
///
/// Column values come back as `f64` by dividing the reconstructed scaled
/// integers by `10^-exp`. That division is a second rounding step, so
/// round-trip equality against the encoder's input holds only up to the
/// precision implied by each column's exponent, not bit-for-bit.
///
/// The input buffer is only read; the returned rows are freshly allocated.
pub fn decode(buf: &[u8]) -> anyhow::Result<Vec<Row>> {
    let mut r = ByteReader::new(buf);
    let header = Tsf1Header::read_from(&mut r)?;
    if header.row_count == 0 {
        return Ok(Vec::new());
    }
    let n = header.row_count as usize;

    // ── timestamps: invert the second-order delta scheme ───────────────────
    let mut rows = Vec::with_capacity(n);
    let first_delta = zigzag_decode(r.varint()?);
    let first_ts = header.base_ts + first_delta;
    rows.push(Row::new(first_ts, [0.0; COLUMN_COUNT]));

    let mut prev_ts = first_ts;
    let mut prev_delta = first_delta;
    for _ in 1..n {
        let delta = prev_delta + zigzag_decode(r.varint()?);
        let ts = prev_ts + delta;
        rows.push(Row::new(ts, [0.0; COLUMN_COUNT]));
        prev_ts = ts;
        prev_delta = delta;
    }

    // ── columns: running sums of first-order deltas, then unscale ──────────
    for col in 0..COLUMN_COUNT {
        let factor = header.scale.factor(col);
        let mut scaled = zigzag_decode(r.varint()?);
        rows[0].values[col] = scaled as f64 / factor;
        for row in rows.iter_mut().skip(1) {
            scaled += zigzag_decode(r.varint()?);
            row.values[col] = scaled as f64 / factor;
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_bytes_rejected_without_rows() {
        let err = decode(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap_err();
        assert!(err.to_string().contains("magic"), "{err}");
    }

    #[test]
    fn too_short_for_a_header_is_an_error() {
        assert!(decode(&[]).is_err());
        assert!(decode(&[0x53]).is_err());
        assert!(decode(&[0x53, 0x54]).is_err());
    }
}
