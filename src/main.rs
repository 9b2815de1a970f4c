use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use readymeta::{ConvertOptions, DEFAULT_INPUT, Readymeta};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "readymeta",
    version,
    about = "Render Yoda dataset metadata as a PDF report that highlights missing fields"
)]
struct Cli {
    #[arg(help = "Metadata JSON file [default: yoda-metadata.json]")]
    input: Option<PathBuf>,
    #[arg(long, help = "Directory for the generated files (defaults to the input's directory)")]
    output_dir: Option<PathBuf>,
    #[arg(long, default_value_t = false, help = "Skip the markdown summary")]
    no_markdown: bool,
    #[arg(
        long,
        default_value_t = false,
        help = "Also write <stem>.normalized.json with empty fields omitted"
    )]
    normalized_json: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase log verbosity (-v info, -vv debug)")]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let input = match cli.input {
        Some(path) => path,
        None => {
            println!("Filename argument not provided, using default: {DEFAULT_INPUT}");
            PathBuf::from(DEFAULT_INPUT)
        }
    };
    let options = ConvertOptions {
        output_dir: cli.output_dir,
        write_markdown: !cli.no_markdown,
        write_normalized_json: cli.normalized_json,
    };

    let engine = Readymeta::builder()
        .build()
        .context("invalid report configuration")?;
    let outcome = engine
        .convert_file(&input, &options)
        .with_context(|| format!("failed to convert {}", input.display()))?;

    println!(
        "wrote {} ({} pages)",
        outcome.pdf_path.display(),
        outcome.page_count
    );
    if let Some(path) = &outcome.markdown_path {
        println!("wrote {}", path.display());
    }
    if let Some(path) = &outcome.normalized_json_path {
        println!("wrote {}", path.display());
    }
    println!(
        "{} warnings were generated, please check for missing (optional) information.",
        outcome.warning_count
    );
    println!("sha256 {}", outcome.fingerprint);
    Ok(())
}
