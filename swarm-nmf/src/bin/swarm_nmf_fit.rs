use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

fn usage() -> ! {
    eprintln!("Usage: swarm_nmf_fit <run_spec.json> [out_dir]");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  swarm_nmf_fit fit.json .");
    eprintln!();
    eprintln!("Writes runs/<run_id>/ under out_dir (default: current directory).");
    eprintln!("Set RUST_LOG=debug for per-run swarm details.");
    std::process::exit(2);
}

fn main() {
    let mut args = std::env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        usage();
    }

    let spec_path = PathBuf::from(args.remove(0));
    let out_dir = if args.is_empty() {
        PathBuf::from(".")
    } else {
        PathBuf::from(args.remove(0))
    };

    if !args.is_empty() {
        usage();
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let output = swarm_nmf::run::RunSpec::load(&spec_path)
        .and_then(|spec| swarm_nmf::run::execute(&spec, &out_dir));
    let output = match output {
        Ok(output) => output,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    println!("{}", output.reconstruction_error);
    println!("{}", output.bundle.run_dir().display());
}
