use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use open_bist_host_lib::{FrameScanner, Outcome, counter_gap};

/// Decode a raw capture of the report serial link.
#[derive(Parser, Debug)]
struct Args {
    /// File holding the captured byte stream
    capture: PathBuf,
    /// Emit one JSON object per report instead of text
    #[arg(long)]
    json: bool,
}

fn flag(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Normal => "ok",
        Outcome::Error => "FAIL",
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let bytes = fs::read(&args.capture)?;

    let mut scanner = FrameScanner::new();
    let mut prev = None;
    for report in scanner.push(&bytes) {
        if args.json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            let gap = match prev {
                Some(prev) => counter_gap(prev, report.counter),
                None => 1,
            };
            let note = match gap {
                1 => String::new(),
                0 => " (duplicate)".to_string(),
                n => format!(" ({} missed)", n - 1),
            };
            println!(
                "#{:010} can={} spi={} gpio={} watchdog={}{}",
                report.counter,
                flag(report.status.can()),
                flag(report.status.spi()),
                flag(report.status.gpio()),
                flag(report.status.watchdog()),
                note,
            );
        }
        prev = Some(report.counter);
    }
    Ok(())
}
