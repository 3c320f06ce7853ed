use std::io::Read;
use std::panic;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use polyglot_runner::config::parse_seconds;
use polyglot_runner::{CodeExecutor, Config, ConfigError, ExecutionRequest};

/// Compile and run a single submission, printing the outcome as JSON.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Source file to execute, `-` reads it from stdin
    #[arg(short, long, required_unless_present = "list_languages")]
    file: Option<PathBuf>,

    #[arg(short, long, default_value = "python")]
    language: String,

    /// Literal payload fed to the program's stdin
    #[arg(short, long, conflicts_with = "input_file")]
    input: Option<String>,

    #[arg(long)]
    input_file: Option<PathBuf>,

    /// Overrides MAX_EXECUTION_TIME, in seconds
    #[arg(long, value_parser = parse_timeout)]
    timeout: Option<Duration>,

    #[arg(long)]
    list_languages: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    set_panic_hook();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(limit) = args.timeout {
        config.max_execution_time = limit;
    }
    let executor = CodeExecutor::native(&config);

    if args.list_languages {
        println!("{}", executor.registry().describe());
        return Ok(ExitCode::SUCCESS);
    }

    let code = match args.file.as_deref() {
        Some(path) if path.as_os_str() == "-" => {
            let mut code = String::new();
            std::io::stdin().read_to_string(&mut code)?;
            code
        }
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => return Err("a source file is required".into()),
    };
    let input = match (args.input, args.input_file) {
        (Some(input), _) => Some(input),
        (None, Some(path)) => Some(tokio::fs::read_to_string(path).await?),
        (None, None) => None,
    };

    let request = ExecutionRequest {
        code,
        language: args.language,
        input,
    };
    tracing::debug!("Executing {} bytes of {}", request.code.len(), request.language);

    let outcome = executor.execute(&request).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(if outcome.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn parse_timeout(value: &str) -> Result<Duration, ConfigError> {
    parse_seconds("--timeout", value)
}

fn set_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        tracing::error!(
            message = "panic occurred",
            panic = %panic_info
        );
    }));
}
