use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use kafka_connector::lifecycle;

/// Forward newline-delimited JSON telemetry from HTTP to Kafka.
#[derive(Debug, Parser)]
#[command(name = "kafka-connector", version, about)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "./kafka_connector.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match lifecycle::run(&args.config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            eprintln!("kafka-connector [{}]: ERROR: {e}", std::process::id());
            ExitCode::FAILURE
        }
    }
}
