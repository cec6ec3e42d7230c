// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Print the HTT extended stats captured in a file.
//!
//! The file holds the raw little-endian TLV stream of one or more stats
//! responses, as the firmware sent it.

use std::fmt::Write as _;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use htt_stats::aggregate::StatsAggregate;
use htt_stats::stats::Stats;
use htt_stats::tags::TlvTag;
use htt_stats::tlv::{Tlv, TlvIter};
use htt_stats::HttError;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Tags are looked up by name among the raw values below this.
const TAG_SEARCH_LIMIT: u16 = 256;

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unknown TLV tag `{0}`")]
    UnknownTag(String),

    #[error("stats stream: {0}")]
    Stream(HttError),
}

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Stats dump to read.
    file: PathBuf,

    /// Print the TLV payloads in hex instead of decoding them.
    #[arg(long)]
    raw: bool,

    /// Only print TLVs with this tag, by name or number.
    #[arg(long)]
    tag: Option<String>,

    /// Skip the summary after the TLVs.
    #[arg(long)]
    no_summary: bool,

    /// Log at debug level. RUST_LOG overrides this.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_tag(arg: &str) -> Result<TlvTag, Error> {
    let number = match arg.strip_prefix("0x") {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => arg.parse::<u16>().ok(),
    };
    if let Some(raw) = number {
        return Ok(TlvTag::from_raw(raw));
    }
    (0..TAG_SEARCH_LIMIT)
        .map(TlvTag::from_raw)
        .find(|tag| tag.name() == arg)
        .ok_or_else(|| Error::UnknownTag(arg.to_string()))
}

fn hex_dump(payload: &[u8]) -> String {
    let mut out = String::new();
    for (line, chunk) in payload.chunks(16).enumerate() {
        let _ = write!(out, "  {:04x}:", line * 16);
        for byte in chunk {
            let _ = write!(out, " {:02x}", byte);
        }
        out.push('\n');
    }
    out
}

fn print_tlv(index: usize, tlv: &Tlv<'_>, raw: bool) {
    let title = format!(
        "[{}] {} (tag {}, {} bytes)",
        index,
        tlv.tag.name(),
        tlv.tag.raw(),
        tlv.len()
    );
    println!("{}", title.bold());

    if raw {
        print!("{}", hex_dump(tlv.payload));
        return;
    }
    match Stats::decode(tlv) {
        Ok(stats) => print!("{}", stats),
        Err(e) => {
            warn!(tag = tlv.tag.raw(), "cannot decode TLV: {}", e);
            println!("  {}", format!("undecodable: {}", e).red());
            print!("{}", hex_dump(tlv.payload));
        }
    }
}

fn run(args: &Args) -> Result<(), Error> {
    let data = std::fs::read(&args.file).map_err(|source| Error::Read {
        path: args.file.clone(),
        source,
    })?;
    debug!(len = data.len(), path = %args.file.display(), "read stats dump");

    let filter = args.tag.as_deref().map(parse_tag).transpose()?;

    let mut summary: StatsAggregate = StatsAggregate::new();
    let mut result = Ok(());
    for (index, tlv) in TlvIter::new(&data).enumerate() {
        let tlv = match tlv {
            Ok(tlv) => tlv,
            Err(e) => {
                result = Err(Error::Stream(e));
                break;
            }
        };
        summary.add_tlv(&tlv);
        if filter.map_or(true, |tag| tag == tlv.tag) {
            print_tlv(index, &tlv, args.raw);
        }
    }

    if !args.no_summary {
        println!("{}", "summary".green().bold());
        print!("{}", summary);
    }
    result
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tags_by_name_or_number() {
        assert_eq!(parse_tag("tx_pdev_cmn").unwrap(), TlvTag::TxPdevCmn);
        assert_eq!(parse_tag("6").unwrap(), TlvTag::TxHwqCmn);
        assert_eq!(parse_tag("0x5").unwrap(), TlvTag::String);
        assert!(matches!(
            parse_tag("no_such_tag"),
            Err(Error::UnknownTag(_))
        ));
    }

    #[test]
    fn hex_lines() {
        let dump = hex_dump(&[0xab; 18]);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("  0000: ab ab"));
        assert_eq!(lines[1], "  0010: ab ab");
    }
}
