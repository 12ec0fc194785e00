use clap::Parser;
use harp_ingest::{CheckReport, Registry, all_ok, check_path};
use rayon::prelude::*;
use std::path::PathBuf;

/// Ingest each input file under every legal option combination of every
/// registered module and report what was found.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "harpcheck")]
struct Cli {
    /// File(s) or directories to check
    #[arg(value_name = "PATHS")]
    paths: Vec<PathBuf>,

    /// Verbose output (overrides RUST_LOG with "debug")
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in walkdir::WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
        } else {
            files.push(path.clone());
        }
    }
    files
}

fn print_report(report: &CheckReport) {
    let options = if report.options.is_empty() {
        String::from("default")
    } else {
        report.options.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(",")
    };

    if report.ok {
        println!("OK   {} [{}]", report.path, options);
        for variable in &report.variables {
            let unit = variable.unit.as_deref().unwrap_or("-");
            println!("       {:<20} {:?} {}", variable.name, variable.shape, unit);
        }
    } else {
        println!("FAIL {} [{}]: {}", report.path, options, report.error.as_deref().unwrap_or("unknown error"));
    }
}

fn main() {
    let args = Cli::parse();
    init_logging(args.verbose);

    let mut registry = Registry::new();
    registry.register(Box::new(harp_ingest::modules::text_grid::TextGridModule));

    let files = collect_files(&args.paths);
    let reports: Vec<CheckReport> = files.par_iter().flat_map(|path| check_path(&registry, path)).collect();

    for report in &reports {
        print_report(report);
    }

    let ok = all_ok(&reports);
    println!();
    println!("{} report(s), {}", reports.len(), if ok { "all ok" } else { "failures present" });

    if !ok {
        std::process::exit(1);
    }
}
