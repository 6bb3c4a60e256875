// Mon Oct 19 2026 - Alex

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "objscope")]
#[command(author = "Alex")]
#[command(version = "0.1.0")]
#[command(about = "Crash-free memory probing and object introspection", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Raise the log level once per flag: info, debug, trace.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// JSON file overriding the classification heuristics.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true)]
    pub json: bool,

    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read bytes at an address of this process without crashing on a bad one.
    Probe(ProbeArgs),
    /// List readable mappings of this process.
    Maps(MapsArgs),
    /// Build sample classes and instances, then classify and introspect them.
    Demo(DemoArgs),
}

#[derive(Parser, Debug)]
pub struct ProbeArgs {
    /// Hex (0x...) or decimal address.
    pub address: String,

    #[arg(short = 'n', long, default_value = "8")]
    pub len: usize,
}

#[derive(Parser, Debug)]
pub struct MapsArgs {
    /// Include mappings without read permission.
    #[arg(long)]
    pub all: bool,
}

#[derive(Parser, Debug)]
pub struct DemoArgs {
    /// Extra addresses to classify after the sample objects.
    pub addresses: Vec<String>,

    /// Size allocations from the process memory map instead of the demo heap.
    #[arg(long)]
    pub maps_sizer: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe() {
        let args = Args::try_parse_from(["objscope", "--json", "probe", "0x1000", "--len", "16"]).unwrap();
        assert!(args.json);
        match args.command {
            Command::Probe(probe) => {
                assert_eq!(probe.address, "0x1000");
                assert_eq!(probe.len, 16);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_demo_with_globals_after_subcommand() {
        let args = Args::try_parse_from(["objscope", "demo", "0x10", "4096", "--log-level", "debug"]).unwrap();
        assert_eq!(args.log_level, "debug");
        match args.command {
            Command::Demo(demo) => assert_eq!(demo.addresses, vec!["0x10", "4096"]),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_verbose_count() {
        let args = Args::try_parse_from(["objscope", "maps", "-vv", "--no-color"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert!(args.no_color);
        assert_eq!(Args::try_parse_from(["objscope", "maps"]).unwrap().verbose, 0);
    }
}
