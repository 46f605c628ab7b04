//! TSF1 demo
//!
//! Generates a synthetic minute-bar ticker series (price, volume, and four
//! Greeks on their scale grids), encodes it, compares the buffer against the
//! raw numeric and JSON representations, then decodes and verifies that
//! every row survives the round trip exactly.

use std::time::Instant;

use anyhow::Result;
use serde::Serialize;

use tsf_core::{decode, encode, Row, ScaleConfig};

// ── constants ──────────────────────────────────────────────────────────────

const N_ROWS: usize = 50_000;
const INTERVAL_MS: i64 = 60_000;
const START_TS: i64 = 1_700_000_000_000;

/// Cent-scale price, integer volume, four decimal digits for the Greeks.
const SCALE: ScaleConfig = ScaleConfig::new([-2, 0, -4, -4, -4, -4]);

/// Raw footprint of one row: one i64 timestamp plus six f64 columns.
const RAW_ROW_BYTES: usize = 8 * 7;

// ── data generator ─────────────────────────────────────────────────────────

/// Deterministic LCG so the demo produces identical output on every run.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 11
    }

    /// Uniform step in `[-spread, spread]`.
    fn step(&mut self, spread: u64) -> i64 {
        (self.next() % (2 * spread + 1)) as i64 - spread as i64
    }
}

/// Random-walk a perpetual-future ticker: every value lands exactly on its
/// column's scale grid, so the decoded series must match bit-for-bit.
fn generate_rows(n: usize) -> Vec<Row> {
    let mut rng = Lcg(0x5EED_CAFE);
    let mut price_cents: i64 = 4_200_000; // $42,000.00
    let mut delta_ticks: i64 = 5_000; // 0.5000
    let mut gamma_ticks: i64 = 200;
    let mut theta_ticks: i64 = -1_500;
    let mut vega_ticks: i64 = 12_000;

    (0..n)
        .map(|i| {
            price_cents += rng.step(120);
            delta_ticks = (delta_ticks + rng.step(30)).clamp(-10_000, 10_000);
            gamma_ticks = (gamma_ticks + rng.step(10)).clamp(0, 5_000);
            theta_ticks = (theta_ticks + rng.step(25)).clamp(-50_000, 0);
            vega_ticks = (vega_ticks + rng.step(40)).clamp(0, 100_000);
            let volume = (rng.next() % 5_000) as f64;

            Row::new(
                START_TS + i as i64 * INTERVAL_MS,
                [
                    price_cents as f64 / 100.0,
                    volume,
                    delta_ticks as f64 / 10_000.0,
                    gamma_ticks as f64 / 10_000.0,
                    theta_ticks as f64 / 10_000.0,
                    vega_ticks as f64 / 10_000.0,
                ],
            )
        })
        .collect()
}

/// Mirror of the `tsf` CLI's JSON record shape, for the size comparison.
#[derive(Serialize)]
struct TickerRecord {
    ts: i64,
    price: f64,
    volume: f64,
    delta: f64,
    gamma: f64,
    theta: f64,
    vega: f64,
}

fn to_record(row: &Row) -> TickerRecord {
    let [price, volume, delta, gamma, theta, vega] = row.values;
    TickerRecord {
        ts: row.ts,
        price,
        volume,
        delta,
        gamma,
        theta,
        vega,
    }
}

// ── reporting ──────────────────────────────────────────────────────────────

fn section(title: &str) {
    println!();
    println!("── {title} {}", "─".repeat(60usize.saturating_sub(title.len())));
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

fn print_size_row(label: &str, bytes: usize, rows: usize, baseline: usize) {
    println!(
        "  {:<14} {:>12} {:>10.2} B/row {:>8.2}x",
        label,
        human_bytes(bytes as u64),
        bytes as f64 / rows as f64,
        baseline as f64 / bytes as f64,
    );
}

// ── demo runner ────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    println!();
    println!("  TSF1 · columnar time-series codec · demo");

    // ── Phase 1: generation ─────────────────────────────────────────────────
    section("1 · SYNTHETIC TICKER SERIES");
    let rows = generate_rows(N_ROWS);
    println!("  rows        : {} minute bars", rows.len());
    println!("  span        : {:.1} days", (N_ROWS as i64 * INTERVAL_MS) as f64 / 86_400_000.0);
    println!("  scale       : {:?}", SCALE.exponents());
    let first = &rows[0];
    println!(
        "  first row   : ts={} price={:.2} volume={} delta={:.4}",
        first.ts, first.values[0], first.values[1], first.values[2]
    );

    // ── Phase 2: encode ─────────────────────────────────────────────────────
    section("2 · ENCODE");
    let records: Vec<TickerRecord> = rows.iter().map(to_record).collect();
    let json = serde_json::to_vec(&records)?;
    let raw_bytes = N_ROWS * RAW_ROW_BYTES;

    let t0 = Instant::now();
    let buf = encode(&rows, &SCALE)?;
    let encode_time = t0.elapsed();

    println!(
        "  {:<14} {:>12} {:>16} {:>9}",
        "representation", "size", "density", "vs raw"
    );
    println!("  {}", "─".repeat(56));
    print_size_row("raw f64 rows", raw_bytes, N_ROWS, raw_bytes);
    print_size_row("JSON", json.len(), N_ROWS, raw_bytes);
    print_size_row("TSF1", buf.len(), N_ROWS, raw_bytes);
    println!();
    println!(
        "  encoded {} rows in {:.2}ms",
        N_ROWS,
        encode_time.as_secs_f64() * 1000.0
    );
    println!("  steady 60s interval: second-order timestamp deltas are all zero,");
    println!("  so the timestamp stream costs one byte per row.");

    // ── Phase 3: decode and verify ──────────────────────────────────────────
    section("3 · DECODE + VERIFY");
    let t0 = Instant::now();
    let decoded = decode(&buf)?;
    let decode_time = t0.elapsed();

    let mismatches = rows
        .iter()
        .zip(&decoded)
        .filter(|(orig, back)| orig != back)
        .count();

    println!(
        "  decoded {} rows in {:.2}ms",
        decoded.len(),
        decode_time.as_secs_f64() * 1000.0
    );
    println!("  exact matches : {} / {}", rows.len() - mismatches, rows.len());
    if mismatches > 0 {
        anyhow::bail!("{} rows failed to round-trip exactly", mismatches);
    }
    println!("  every grid-aligned value survived the round trip exactly");
    println!();
    Ok(())
}
