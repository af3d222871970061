use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use log::LevelFilter;

use proto_jsonschema::descriptor::{self, GenerationRequest};
use proto_jsonschema::options::ConverterOptions;

/// Generate JSON Schema documents from Protocol Buffer descriptors.
///
/// Reads a `CodeGeneratorRequest` encoded as protobuf JSON and writes one
/// schema per top-level message of every file to generate.
#[derive(Parser)]
#[command(name = "proto-jsonschema", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a descriptor request into .jsonschema files.
    Generate {
        /// Path to the JSON-encoded request, or "-" for stdin.
        #[arg(long, default_value = "-")]
        request: String,

        /// Output directory for generated schema files.
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Conversion parameters, replacing the request's own.
        ///
        /// Example: --parameter enforce_oneof,json_fieldnames,messages=[Order,Invoice]
        #[arg(long, env = "PROTO_JSONSCHEMA_PARAMETER")]
        parameter: Option<String>,

        /// Comma-separated proto file names, replacing the request's file list.
        #[arg(long, value_delimiter = ',')]
        files: Vec<String>,

        /// Log every registered type and converted file.
        #[arg(long)]
        debug: bool,

        /// Suppress non-error output.
        #[arg(long, short)]
        quiet: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");

        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = std::error::Error::source(cause);
        }

        process::exit(1);
    }
}

fn run(cli: Cli) -> proto_jsonschema::error::Result<()> {
    match cli.command {
        Commands::Generate {
            request,
            output_dir,
            parameter,
            files,
            debug,
            quiet,
        } => {
            let mut request = read_request(&request)?;
            if !files.is_empty() {
                request.file_to_generate = files;
            }
            let parameter = parameter.or_else(|| request.parameter.clone());
            let (options, ignored) =
                ConverterOptions::parse(parameter.as_deref().unwrap_or_default());

            let level = if debug || options.debug {
                LevelFilter::Debug
            } else if quiet {
                LevelFilter::Warn
            } else {
                LevelFilter::Info
            };
            env_logger::Builder::new()
                .filter_level(level)
                .format_timestamp(None)
                .parse_default_env()
                .init();
            for item in ignored {
                log::warn!("ignoring unknown parameter '{item}'");
            }

            log::debug!(
                "{} proto files, {} to generate",
                request.proto_file.len(),
                request.file_to_generate.len()
            );
            let generated = proto_jsonschema::codegen::generate(&request, &options)?;
            proto_jsonschema::codegen::write_files(&generated, &output_dir)?;
            log::info!(
                "wrote {} schemas to {}",
                generated.len(),
                output_dir.display()
            );
        }
    }

    Ok(())
}

fn read_request(source: &str) -> proto_jsonschema::error::Result<GenerationRequest> {
    if source == "-" {
        descriptor::read_request(std::io::stdin().lock())
    } else {
        descriptor::load_request(Path::new(source))
    }
}
