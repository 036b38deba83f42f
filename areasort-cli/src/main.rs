use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use areasort_core::{run, RunOutcome, SorterSettings};

#[derive(Debug, Parser)]
#[command(
    name = "areasort",
    version,
    about = "Inspect a save archive and sort the contents of area containers"
)]
struct Args {
    /// Save archive to read.
    #[arg(value_name = "SAVE")]
    input: PathBuf,

    /// Name of the area entry to decode. Without it, every entry is listed.
    #[arg(long)]
    area: Option<String>,

    /// Sort each container's items by resource reference and write a new save.
    #[arg(long, default_value_t = false, requires = "area", requires = "output")]
    sort: bool,

    /// Where to write the sorted save archive.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print results as JSON instead of plain text.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Verbose diagnostics, plus a JSON run log next to the output.
    #[arg(long, default_value_t = false)]
    debug: bool,
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_text(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Listed { entries } => {
            for entry in entries {
                println!("{}", entry.name);
            }
        }
        RunOutcome::AreaNotFound { area } => {
            eprintln!("Area '{area}' not found; nothing to report.");
        }
        RunOutcome::Reported {
            area,
            before,
            after,
            output_path,
            ..
        } => {
            println!("{area}");
            for line in before.lines() {
                println!("{line}");
            }
            if let Some(after) = after {
                println!("After sorting:");
                for line in after.lines() {
                    println!("{line}");
                }
            }
            if let Some(path) = output_path {
                println!("Wrote {}", path.display());
            }
        }
    }
}

fn main() {
    let args = Args::parse();
    init_tracing(args.debug);

    let settings = SorterSettings {
        input_path: args.input,
        output_path: args.output,
        area: args.area,
        sort: args.sort,
        debug: args.debug,
    };

    let outcome = match run(&settings) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&outcome) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                eprintln!("Error: failed to render JSON: {err}");
                std::process::exit(1);
            }
        }
    } else {
        print_text(&outcome);
    }
}
