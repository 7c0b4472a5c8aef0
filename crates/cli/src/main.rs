use std::{fs, process};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sicheck_cli::{dot, App, Command};
use sicheck_core::verdict::Verdict;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let app = App::parse();
    match &app.command {
        Command::Generate(args) => generate(args),
        Command::Verify(args) => verify(args),
    }
}

fn generate(args: &sicheck_cli::GenerateArgs) {
    fs::create_dir_all(&args.output_dir).unwrap_or_else(|e| {
        eprintln!("Failed to create output directory: {e}");
        process::exit(1);
    });

    let histories = sicheck_testgen::generate_mult_histories(
        args.n_hist,
        args.n_session,
        args.n_key,
        args.n_txn,
        args.n_evt,
    );

    for history in &histories {
        let path = args.output_dir.join(format!("{}.json", history.get_id()));
        let file = fs::File::create(&path).unwrap_or_else(|e| {
            eprintln!("Failed to create {}: {e}", path.display());
            process::exit(1);
        });
        serde_json::to_writer_pretty(file, history).unwrap_or_else(|e| {
            eprintln!("Failed to write {}: {e}", path.display());
            process::exit(1);
        });
    }

    println!(
        "Generated {} histories to {}",
        histories.len(),
        args.output_dir.display()
    );
}

fn verify(args: &sicheck_cli::VerifyArgs) {
    let config = args.checker_config();
    let mut any_failed = false;

    let mut entries: Vec<_> = fs::read_dir(&args.input_dir)
        .unwrap_or_else(|e| {
            eprintln!("Failed to read input directory: {e}");
            process::exit(1);
        })
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
        .collect();

    entries.sort_by_key(fs::DirEntry::path);

    if entries.is_empty() {
        eprintln!("No .json files found in {}", args.input_dir.display());
        process::exit(1);
    }

    for entry in entries {
        let path = entry.path();
        let filename = path.file_name().unwrap_or_default().to_string_lossy();

        let file = fs::File::open(&path).unwrap_or_else(|e| {
            eprintln!("Failed to open {filename}: {e}");
            process::exit(1);
        });

        let history: sicheck_testgen::History =
            serde_json::from_reader(file).unwrap_or_else(|e| {
                eprintln!("Failed to parse {filename}: {e}");
                process::exit(1);
            });

        match sicheck_solver::verify(history.get_data(), &config) {
            Ok(Verdict::Accept) => println!("{filename}: PASS"),
            Ok(Verdict::Reject(conflict)) => {
                println!("{filename}: FAIL (snapshot isolation violated)");
                if args.dot {
                    println!("{}", dot::render(&conflict));
                } else if args.verbose {
                    for (from, to, edges) in &conflict.edges {
                        let labels: Vec<String> =
                            edges.iter().map(ToString::to_string).collect();
                        println!("  {from} -> {to} [{}]", labels.join(","));
                    }
                    for constraint in &conflict.constraints {
                        println!(
                            "  constraint {} between {} and {}",
                            constraint.id, constraint.writes.0, constraint.writes.1
                        );
                    }
                }
                any_failed = true;
            }
            Err(e) => {
                println!("{filename}: FAIL ({e})");
                any_failed = true;
            }
        }
    }

    if any_failed {
        process::exit(1);
    }
}
