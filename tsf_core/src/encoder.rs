use crate::format::{Row, ScaleConfig, Tsf1Header, COLUMN_COUNT};
use crate::varint::zigzag_encode;
use crate::writer::ByteWriter;

/// Encode `rows` into a self-describing TSF1 buffer.
///
/// # Layout produced
/// ```text
/// [HEADER: magic, version, row count, base timestamp, scale exponents]
/// [TIMESTAMP STREAM]   ← 1 initial zigzag delta, then N−1 delta-of-delta
/// [COLUMN STREAM × 6]  ← per column: 1 zigzag absolute, then N−1 deltas
/// ```
/// Column streams are fully columnar: all of column 0's values, then all of
/// column 1's, and so on. Successive values of one column are far closer to
/// each other than neighboring columns within a row, which is what keeps the
/// deltas small and the varints short.
///
/// # Caller contract
/// `rows` is expected to be sorted by ascending timestamp. This is not
/// verified: out-of-order timestamps still round-trip exactly, but the
/// second-order deltas stop clustering around zero and the stream loses its
/// byte-per-row behavior.
///
/// # Precision
/// Column `j` is stored as `round(v * 10^-exp[j])`; fractional digits finer
/// than the configured exponent are rounded away, and the decoded value is
/// only guaranteed within half a scale unit of the input. Scaled magnitudes
/// must fit `i64`.
///
/// # Errors
/// Fails if the first row's timestamp does not fit the header's 32-bit
/// seconds field. Empty input is not an error: it yields the 4-byte
/// degenerate buffer (magic, version, zero row count) and nothing else.
pub fn encode(rows: &[Row], scale: &ScaleConfig) -> anyhow::Result<Vec<u8>> {
    // Rough guess for mostly-single-byte varints; the writer grows as needed.
    let mut w = ByteWriter::with_capacity(rows.len() * (COLUMN_COUNT + 1) + 32);

    let base_ts = rows.first().map_or(0, |r| r.ts);
    let header = Tsf1Header {
        row_count: rows.len() as u64,
        base_ts,
        scale: *scale,
    };
    header.write_to(&mut w)?;
    if rows.is_empty() {
        return Ok(w.into_bytes());
    }

    // ── timestamp stream: second-order deltas ──────────────────────────────
    // The first entry is the delta against the header's base timestamp,
    // computed rather than assumed zero even though the base is taken from
    // the first row. Each following entry is the change in the delta, which
    // sits near zero whenever the sampling interval is steady.
    let first_delta = rows[0].ts - base_ts;
    w.varint(zigzag_encode(first_delta));
    let mut prev_ts = rows[0].ts;
    let mut prev_delta = first_delta;
    for row in &rows[1..] {
        let delta = row.ts - prev_ts;
        w.varint(zigzag_encode(delta - prev_delta));
        prev_ts = row.ts;
        prev_delta = delta;
    }

    // ── column streams: first-order deltas over scaled values ──────────────
    for col in 0..COLUMN_COUNT {
        let factor = scale.factor(col);
        let mut prev = scale_value(rows[0].values[col], factor);
        w.varint(zigzag_encode(prev));
        for row in &rows[1..] {
            let cur = scale_value(row.values[col], factor);
            w.varint(zigzag_encode(cur - prev));
            prev = cur;
        }
    }

    Ok(w.into_bytes())
}

#[inline]
fn scale_value(v: f64, factor: f64) -> i64 {
    (v * factor).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{EMPTY_BUFFER_SIZE, VERSION};

    #[test]
    fn empty_input_yields_the_degenerate_buffer() {
        let scale = ScaleConfig::new([-2, 0, -2, -2, -2, -2]);
        let buf = encode(&[], &scale).unwrap();
        assert_eq!(buf.len(), EMPTY_BUFFER_SIZE);
        assert_eq!(buf, vec![0x53, 0x54, VERSION, 0]);
    }

    #[test]
    fn pre_epoch_first_timestamp_rejected() {
        let scale = ScaleConfig::new([0; COLUMN_COUNT]);
        let rows = [Row::new(-5, [0.0; COLUMN_COUNT])];
        assert!(encode(&rows, &scale).is_err());
    }
}
