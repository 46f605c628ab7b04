use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use tsf_core::{decode, encode, ByteReader, Row, ScaleConfig, Tsf1Header};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "tsf",
    about = "TSF1 columnar time-series codec: encode, decode, and inspect ticker history buffers",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a JSON array of ticker records into a TSF1 buffer
    Encode {
        /// Source JSON file ("-" reads stdin)
        input: PathBuf,
        /// Destination TSF1 file
        output: PathBuf,
        /// Comma-separated scale exponents for price, volume, delta, gamma,
        /// theta, vega; -2 stores two decimal digits, 0 stores integers
        #[arg(
            short,
            long,
            default_value = "-2,0,-2,-2,-2,-2",
            allow_hyphen_values = true
        )]
        scale: String,
    },
    /// Decode a TSF1 buffer back into a JSON array of ticker records
    Decode {
        /// Source TSF1 file
        input: PathBuf,
        /// Destination JSON file ("-" writes stdout)
        output: PathBuf,
    },
    /// Print header metadata and buffer statistics
    Inspect {
        /// TSF1 file to inspect
        file: PathBuf,
    },
}

// ── JSON glue ──────────────────────────────────────────────────────────────

/// JSON shape of one sample, matching the upstream ticker feed's fields.
/// Column order in the buffer is the field order here, after `ts`.
#[derive(Debug, Serialize, Deserialize)]
struct TickerRecord {
    ts: i64,
    price: f64,
    volume: f64,
    delta: f64,
    gamma: f64,
    theta: f64,
    vega: f64,
}

impl TickerRecord {
    fn to_row(&self) -> Row {
        Row::new(
            self.ts,
            [
                self.price,
                self.volume,
                self.delta,
                self.gamma,
                self.theta,
                self.vega,
            ],
        )
    }

    fn from_row(row: &Row) -> Self {
        let [price, volume, delta, gamma, theta, vega] = row.values;
        Self {
            ts: row.ts,
            price,
            volume,
            delta,
            gamma,
            theta,
            vega,
        }
    }
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn parse_scale(raw: &str) -> anyhow::Result<ScaleConfig> {
    let exponents = raw
        .split(',')
        .map(|s| {
            s.trim()
                .parse::<i8>()
                .with_context(|| format!("invalid scale exponent '{}'", s.trim()))
        })
        .collect::<anyhow::Result<Vec<i8>>>()?;
    ScaleConfig::from_slice(&exponents)
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

fn read_input(path: &PathBuf) -> anyhow::Result<Vec<u8>> {
    if path.to_str() == Some("-") {
        let mut buf = Vec::new();
        io::stdin().lock().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        fs::read(path).with_context(|| format!("reading input file {:?}", path))
    }
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_encode(input: PathBuf, output: PathBuf, scale_arg: &str) -> anyhow::Result<()> {
    let scale = parse_scale(scale_arg)?;

    let json = read_input(&input)?;
    let records: Vec<TickerRecord> =
        serde_json::from_slice(&json).with_context(|| format!("parsing records from {:?}", input))?;
    let rows: Vec<Row> = records.iter().map(TickerRecord::to_row).collect();

    let t0 = Instant::now();
    let buf = encode(&rows, &scale)?;
    let elapsed = t0.elapsed();

    fs::write(&output, &buf).with_context(|| format!("writing output file {:?}", output))?;

    let ratio = json.len() as f64 / buf.len() as f64;
    eprintln!("  rows        : {}", rows.len());
    eprintln!("  scale       : {:?}", scale.exponents());
    eprintln!("  json input  : {}", human_bytes(json.len() as u64));
    eprintln!("  encoded     : {}", human_bytes(buf.len() as u64));
    eprintln!("  ratio       : {:.2}x vs JSON", ratio);
    if !rows.is_empty() {
        eprintln!("  bytes/row   : {:.2}", buf.len() as f64 / rows.len() as f64);
    }
    eprintln!("  elapsed     : {:.3}ms", elapsed.as_secs_f64() * 1000.0);
    Ok(())
}

fn run_decode(input: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let buf = read_input(&input)?;

    let t0 = Instant::now();
    let rows = decode(&buf).with_context(|| format!("decoding {:?}", input))?;
    let elapsed = t0.elapsed();

    let records: Vec<TickerRecord> = rows.iter().map(TickerRecord::from_row).collect();
    let json = serde_json::to_vec_pretty(&records)?;

    if output.to_str() == Some("-") {
        io::stdout().lock().write_all(&json)?;
        io::stdout().lock().write_all(b"\n")?;
    } else {
        fs::write(&output, &json).with_context(|| format!("writing output file {:?}", output))?;
    }

    eprintln!("  rows        : {}", rows.len());
    eprintln!("  encoded     : {}", human_bytes(buf.len() as u64));
    eprintln!("  json output : {}", human_bytes(json.len() as u64));
    eprintln!("  elapsed     : {:.3}ms", elapsed.as_secs_f64() * 1000.0);
    Ok(())
}

fn run_inspect(file: PathBuf) -> anyhow::Result<()> {
    let buf = read_input(&file)?;

    let mut reader = ByteReader::new(&buf);
    let header = Tsf1Header::read_from(&mut reader)
        .with_context(|| format!("reading header of {:?}", file))?;
    let header_bytes = reader.position();
    let payload_bytes = buf.len() - header_bytes;

    println!("=== TSF1 buffer: {:?} ===", file);
    println!();
    println!("  format version : {}", tsf_core::VERSION);
    println!("  rows           : {}", header.row_count);
    if header.row_count == 0 {
        println!("  (degenerate empty buffer: no base timestamp, no streams)");
    } else {
        println!("  base timestamp : {} ms", header.base_ts);
        println!("  scale          : {:?}", header.scale.exponents());
    }
    println!("  header         : {}", human_bytes(header_bytes as u64));
    println!("  streams        : {}", human_bytes(payload_bytes as u64));
    println!("  total          : {}", human_bytes(buf.len() as u64));
    if header.row_count > 0 {
        println!(
            "  bytes/row      : {:.2}",
            buf.len() as f64 / header.row_count as f64
        );
    }
    println!("  xxh3-64        : {:016x}", xxh3_64(&buf));
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Encode {
            input,
            output,
            scale,
        } => run_encode(input, output, &scale),
        Commands::Decode { input, output } => run_decode(input, output),
        Commands::Inspect { file } => run_inspect(file),
    }
}
