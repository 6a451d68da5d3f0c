// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! dpx-probe - runtime layout probe and schema inspector
//!
//! Launches an isolated runtime to derive or verify the layout contract an
//! offload engine depends on, and dumps the schema collected for a root type.

use clap::{Parser, Subcommand};
use colored::*;
use dpx::layout::RuntimeFlags;
use dpx::partition::{StreamDecoder, StreamPartitioner};
use dpx::{DpxConfig, LayoutContract, RuntimeSizing, TypeDescriptor, TypeGraphCollector};
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Runtime layout probe
#[derive(Parser, Debug)]
#[command(name = "dpx-probe")]
#[command(version)]
#[command(about = "Derive or verify a managed runtime's layout contract")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Runtime launcher, overrides `runtime.java`
    #[arg(long, global = true)]
    java: Option<PathBuf>,

    /// Probe timeout in seconds, overrides `runtime.probe_timeout_secs`
    #[arg(short, long, global = true)]
    timeout: Option<u64>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe the runtime and print its layout contract
    Probe {
        /// Expected contract (JSON); verify instead of derive
        #[arg(short, long)]
        expect: Option<PathBuf>,

        /// Output JSON
        #[arg(long)]
        json: bool,

        /// Write the raw report as one length-prefixed frame to stdout
        #[arg(long, conflicts_with = "json")]
        framed: bool,
    },
    /// Print the sizing the runtime uses by default
    Flags {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Collect and print the schema of a root type
    Schema {
        /// Root type, e.g. `pkg.Media` or `java.util.List<pkg.Image>`
        root: String,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Split an encoded key/value stream into partition files
    Partition {
        /// Encoded input stream (stdin when absent)
        input: Option<PathBuf>,

        /// Directory receiving `part-<n>.dpxs`
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Partition count, overrides `partition.count`
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
}

fn main() {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(&args) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => DpxConfig::from_file(path)?,
        None => DpxConfig::default(),
    };
    if let Some(java) = &args.java {
        config.runtime.java = java.display().to_string();
    }
    if let Some(secs) = args.timeout {
        config.runtime.probe_timeout_secs = secs;
    }
    config.validate()?;

    match &args.command {
        Command::Probe {
            expect,
            json,
            framed,
        } => run_probe(&config, expect.as_deref(), *json, *framed),
        Command::Flags { json } => run_flags(&config, *json),
        Command::Schema { root, json } => run_schema(&config, root, *json),
        Command::Partition {
            input,
            out_dir,
            count,
        } => run_partition(
            input.as_deref(),
            out_dir,
            count.unwrap_or(config.partition.count),
        ),
    }
}

fn run_probe(
    config: &DpxConfig,
    expect: Option<&Path>,
    json: bool,
    framed: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let expected: Option<LayoutContract> = match expect {
        Some(path) => Some(serde_json::from_str(&fs::read_to_string(path)?)?),
        None => None,
    };
    let sizing = match &expected {
        Some(contract) => contract.sizing(),
        None => resolve_sizing(config)?,
    };
    sizing.validate()?;

    if !json && !framed {
        eprintln!("{} Probing {}", ">>>".green().bold(), config.runtime.java);
        eprintln!(
            "    heap={} base={:#x} class space={}",
            sizing.heap_max_size, sizing.heap_base, sizing.compressed_class_space_size
        );
    }

    let report = config.probe().report(&sizing)?;
    let contract = match &expected {
        Some(contract) => {
            report.check(contract)?;
            *contract
        }
        None => {
            report.check_sizing(&sizing)?;
            report.to_contract(&sizing)
        }
    };

    if framed {
        report.write_framed(io::stdout().lock())?;
    } else if json {
        println!("{}", serde_json::to_string_pretty(&contract)?);
    } else {
        let verdict = if expected.is_some() {
            "verified".green().bold()
        } else {
            "derived".cyan().bold()
        };
        println!("{} {}", verdict, contract);
    }
    Ok(())
}

fn run_flags(config: &DpxConfig, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let flags = RuntimeFlags::query_with_timeout(
        Path::new(&config.runtime.java),
        config.runtime.probe_timeout(),
    )?;
    let sizing = flags.sizing()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sizing)?);
        return Ok(());
    }
    print_sizing(&sizing);
    let compressed = flags.uses_compressed_pointers().unwrap_or(false);
    println!(
        "  {:<28} {}",
        "compressed pointers",
        if compressed { "yes".green() } else { "no".red() }
    );
    Ok(())
}

fn run_schema(config: &DpxConfig, root: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let root: TypeDescriptor = root.parse()?;
    let registry = config.registry()?;
    let mapping = config.mapping()?;
    let schema = TypeGraphCollector::new(&registry).collect(&root, Some(&mapping))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    println!("{} {} ({} entries)", "Schema".bold(), root, schema.len());
    for entry in schema.entries() {
        println!("  {:<18} {}", format!("{:?}", entry.kind).dimmed(), entry.ty);
    }
    for table in schema.enum_tables() {
        println!();
        println!("{} {}", "Enum".bold(), table.name);
        for (ordinal, variant) in table.variants.iter().enumerate() {
            println!("  {:>4}  {}", ordinal, variant);
        }
    }
    Ok(())
}

fn run_partition(
    input: Option<&Path>,
    out_dir: &Path,
    count: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let partitioner = StreamPartitioner::new(count)?;
    let reader: Box<dyn Read + Send> = match input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };
    let out = partitioner.partition(StreamDecoder::new(reader))?;

    fs::create_dir_all(out_dir)?;
    for (pid, buffer) in out.buffers.iter().enumerate() {
        fs::write(out_dir.join(format!("part-{}.dpxs", pid)), &buffer.bytes)?;
    }
    eprintln!(
        "{} {} records into {} partitions under {}",
        ">>>".green().bold(),
        out.records(),
        count,
        out_dir.display()
    );
    out.into_result()?;
    Ok(())
}

/// Sizing from the config, or the runtime's own defaults.
fn resolve_sizing(config: &DpxConfig) -> Result<RuntimeSizing, Box<dyn std::error::Error>> {
    if let Some(sizing) = config.runtime.sizing {
        return Ok(sizing);
    }
    log::debug!("[probe] no sizing configured, reading runtime flags");
    let flags = RuntimeFlags::query_with_timeout(
        Path::new(&config.runtime.java),
        config.runtime.probe_timeout(),
    )?;
    Ok(flags.sizing()?)
}

fn print_sizing(sizing: &RuntimeSizing) {
    println!("{}", "Runtime sizing".bold());
    let rows = [
        ("heap_min_size", sizing.heap_min_size),
        ("heap_max_size", sizing.heap_max_size),
        ("heap_base", sizing.heap_base),
        ("metaspace_size", sizing.metaspace_size),
        ("max_metaspace_size", sizing.max_metaspace_size),
        ("compressed_class_space_size", sizing.compressed_class_space_size),
    ];
    for (name, value) in rows {
        println!("  {:<28} {:#x} ({})", name, value, value);
    }
}
