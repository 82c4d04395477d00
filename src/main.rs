use clap::Parser;
use readqc::{AnalyzeArgs, analyze_process};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    args: AnalyzeArgs,
}

fn main() {
    let cli = Cli::parse();

    if let Err(error) = analyze_process(cli.args) {
        eprintln!("readqc: {error}");
        std::process::exit(1);
    }
}
