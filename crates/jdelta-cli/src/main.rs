//! `jdelta` CLI — compute and apply structural deltas between JSON files.
//!
//! ## Usage
//!
//! ```sh
//! # Compute a delta (stanza-list JSON on stdout)
//! jdelta diff old.json new.json
//!
//! # Same delta as legible unified-diff text
//! jdelta diff -u old.json new.json -o changes.patch
//!
//! # Apply a delta; the target filename is read from the udiff header
//! jdelta patch -i changes.patch
//!
//! # Undo a change by applying the udiff in reverse
//! jdelta patch new.json -i changes.patch -R
//!
//! # Read one side from stdin
//! cat new.json | jdelta diff old.json -
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use jdelta_core::{diff_with_options, patch, udiff, upatch, upatch_reverse, DiffOptions, Stanza, UdiffHeader};
use serde_json::Value;
use std::io::{self, Read};

#[derive(Parser)]
#[command(name = "jdelta", version, about = "Structural diffs for JSON documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the delta that turns LEFT into RIGHT
    Diff {
        /// Starting point for the comparison ("-" for stdin)
        left: String,
        /// Result of the comparison ("-" for stdin)
        right: String,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Produce a more legible diff, in a format inspired by diff -u
        #[arg(short, long)]
        unified: bool,
        /// Trade potentially increased diff size for a faster result
        #[arg(short, long)]
        fast: bool,
        /// Print size statistics on stderr
        #[arg(short, long)]
        verbose: bool,
    },
    /// Apply a delta (stanza-list JSON or udiff text) to TARGET
    Patch {
        /// File to patch; recovered from the udiff header if omitted
        target: Option<String>,
        /// Patch file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Apply a udiff in reverse, recovering the original document
        #[arg(short = 'R', long)]
        reverse: bool,
    },
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Commands::Diff {
            left,
            right,
            output,
            unified,
            fast,
            verbose,
        } => run_diff(&left, &right, output.as_deref(), unified, fast, verbose),
        Commands::Patch {
            target,
            input,
            output,
            reverse,
        } => run_patch(target.as_deref(), input.as_deref(), output.as_deref(), reverse),
    }
}

fn run_diff(
    left: &str,
    right: &str,
    output: Option<&str>,
    unified: bool,
    fast: bool,
    verbose: bool,
) -> Result<()> {
    let left_value = read_json(left)?;
    let right_value = read_json(right)?;

    let options = DiffOptions { minimal: !fast };
    let stanzas = diff_with_options(&left_value, &right_value, &options);

    if verbose {
        let original = serde_json::to_string(&right_value)?.len();
        let delta = serde_json::to_string(&stanzas)?.len();
        let ratio = if original > 0 {
            (delta as f64 / original as f64) * 100.0
        } else {
            0.0
        };
        eprintln!(
            "Size of delta {ratio:.3}% size of original (original: {original} chars, delta: {delta} chars)"
        );
    }

    let rendered = if unified {
        let header = UdiffHeader {
            left: header_name(left),
            right: header_name(right),
        };
        udiff(&left_value, &right_value, &stanzas, &header)
    } else {
        let mut text = serde_json::to_string(&stanzas)?;
        text.push('\n');
        text
    };
    write_output(output, &rendered)
}

fn run_patch(
    target: Option<&str>,
    input: Option<&str>,
    output: Option<&str>,
    reverse: bool,
) -> Result<()> {
    let patch_text = read_input(input)?;
    let is_udiff = !patch_text.trim_start().starts_with('[');

    let target_path = match target {
        Some(path) => path.to_owned(),
        None => {
            if !is_udiff {
                bail!("a stanza-list patch does not name its target; pass TARGET explicitly");
            }
            let header = jdelta_core::read_header(&patch_text)
                .context("patch has no header to name a target; pass TARGET explicitly")?;
            let name = if reverse { &header.right } else { &header.left };
            // Header names carry an optional timestamp after a tab.
            name.split('\t').next().unwrap_or(name.as_str()).to_owned()
        }
    };
    let target_value = read_json(&target_path)?;

    let patched = if is_udiff {
        if reverse {
            upatch_reverse(&target_value, &patch_text)
                .with_context(|| format!("failed to reverse-apply udiff to {target_path}"))?
        } else {
            upatch(&target_value, &patch_text)
                .with_context(|| format!("failed to apply udiff to {target_path}"))?
        }
    } else {
        if reverse {
            bail!("only udiff patches can be applied in reverse");
        }
        let stanzas: Vec<Stanza> =
            serde_json::from_str(&patch_text).context("patch is not a valid stanza list")?;
        patch(&target_value, &stanzas)
            .with_context(|| format!("failed to apply patch to {target_path}"))?
    };

    let mut text = serde_json::to_string_pretty(&patched)?;
    text.push('\n');
    write_output(output, &text)
}

/// Header identifier for a diff side: the filename plus its mtime, or
/// `<stdin>` for piped input.
fn header_name(path: &str) -> String {
    if path == "-" {
        return "<stdin>".to_owned();
    }
    let mtime = std::fs::metadata(path).and_then(|meta| meta.modified()).ok();
    match mtime {
        Some(time) => {
            let stamp: chrono::DateTime<chrono::Local> = time.into();
            format!("{path}\t{}", stamp.format("%Y-%m-%d %H:%M:%S %z"))
        }
        None => path.to_owned(),
    }
}

fn read_json(path: &str) -> Result<Value> {
    let text = read_input(Some(path))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON from {path}"))
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some("-") | None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read from stdin")?;
            Ok(buf)
        }
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("failed to read file: {path}"))
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("failed to write file: {path}")),
        None => {
            print!("{content}");
            Ok(())
        }
    }
}
