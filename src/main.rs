use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use metalens::error::ExtractError;
use metalens::metadata::{ExportFormat, ExtractionOptions, TypeOverride, export_all, run_with};

#[derive(Parser)]
#[command(
    name = "metalens",
    version,
    about = "Detecta el formato de cada archivo y muestra su metadata"
)]
struct Args {
    /// Archivos a inspeccionar
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Fuerza el tipo de archivo (auto, image, av, pdf, docx, xlsx, pptx, generic)
    #[arg(long = "type", env = "METALENS_TYPE", default_value = "Auto-Detect")]
    file_type: TypeOverride,

    /// Formato de salida: text o json
    #[arg(long, env = "METALENS_FORMAT", default_value = "text")]
    format: ExportFormat,

    /// Agrega los hashes MD5 y SHA-256
    #[arg(long, env = "METALENS_HASH")]
    hash: bool,

    /// Inspecciona el contenido cuando la extensión no es reconocida
    #[arg(long, env = "METALENS_SNIFF_CONTENT")]
    sniff_content: bool,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn,metalens=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let options = ExtractionOptions {
        include_hash: args.hash,
        sniff_content: args.sniff_content,
    };

    let mut failed = false;
    let mut results = Vec::with_capacity(args.paths.len());
    for path in &args.paths {
        match run_with(path, args.file_type, &options) {
            Ok(result) => results.push(result),
            Err(error @ ExtractError::PathNotFound(_)) => {
                eprintln!("Error: {error}");
                failed = true;
            }
        }
    }

    if !results.is_empty() {
        println!("{}", export_all(&results, args.format)?.trim_end());
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
