use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use log::info;

use falldetector::config::{
    DEFAULT_BIND_ADDR, DEFAULT_MAX_REQUEST_BYTES, DEFAULT_PORT, DEFAULT_TEST_DATA,
    DEFAULT_TRAINING_DATA,
};
use falldetector::classifier::builder::{
    DEFAULT_HIDDEN_UNITS, DEFAULT_LEARNING_RATE, DEFAULT_SEED, DEFAULT_STEPS,
};
use falldetector::client::DEFAULT_CONNECT_TIMEOUT;
use falldetector::{
    classify_remote, FeatureVector, ModelManager, Server, ServerConfig, TrainingConfig,
    TrainingPipeline,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a classifier on labeled CSV files and export it
    Train(TrainArgs),
    /// Serve the latest exported model over TCP
    Serve(ServeArgs),
    /// Send one feature vector to a running daemon
    Classify(ClassifyArgs),
}

#[derive(Args)]
struct TrainArgs {
    #[arg(long, env = "FALLDETECTOR_TRAINING_DATA", default_value = DEFAULT_TRAINING_DATA)]
    training_data: PathBuf,
    #[arg(long, env = "FALLDETECTOR_TEST_DATA", default_value = DEFAULT_TEST_DATA)]
    test_data: PathBuf,
    /// Directory receiving model exports [default: $FALLDETECTOR_MODEL_DIR/trained or ./falldetector_model/trained]
    #[arg(long)]
    models_dir: Option<PathBuf>,
    /// Hidden layer widths, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_HIDDEN_UNITS)]
    hidden_units: Vec<usize>,
    #[arg(long, default_value_t = DEFAULT_STEPS)]
    steps: usize,
    #[arg(long, default_value_t = DEFAULT_LEARNING_RATE)]
    learning_rate: f32,
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long, env = "FALLDETECTOR_BIND", default_value_t = DEFAULT_BIND_ADDR)]
    bind: IpAddr,
    #[arg(long, env = "FALLDETECTOR_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Directory holding model exports [default: $FALLDETECTOR_MODEL_DIR/trained or ./falldetector_model/trained]
    #[arg(long)]
    models_dir: Option<PathBuf>,
    #[arg(long, default_value_t = DEFAULT_MAX_REQUEST_BYTES)]
    max_request_bytes: usize,
    #[arg(long, default_value_t = 64)]
    max_connections: usize,
    /// Seconds a client has to send its request
    #[arg(long, default_value_t = 5)]
    read_timeout: u64,
    /// Seconds to wait for in-flight connections on shutdown
    #[arg(long, default_value_t = 5)]
    drain_timeout: u64,
}

#[derive(Args)]
struct ClassifyArgs {
    /// Daemon address, host:port
    #[arg(long, env = "FALLDETECTOR_SERVER", default_value = "127.0.0.1:4011")]
    server: String,
    impact_duration: f32,
    impact_violence: f32,
    impact_average: f32,
    post_impact_average: f32,
}

fn train(args: TrainArgs) -> anyhow::Result<()> {
    let config = TrainingConfig {
        training_data: args.training_data,
        test_data: args.test_data,
        models_dir: args.models_dir.unwrap_or_else(ModelManager::get_default_models_dir),
        hidden_units: args.hidden_units,
        steps: args.steps,
        learning_rate: args.learning_rate,
        seed: args.seed,
    };

    let report = TrainingPipeline::new(config).run()?;
    info!(
        "=== Training finished (took {:.2?}, final loss {:.5}) ===",
        report.elapsed, report.final_loss
    );
    println!("\n{}\n", report);
    Ok(())
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = ServerConfig {
        bind_addr: args.bind,
        port: args.port,
        max_request_bytes: args.max_request_bytes,
        read_timeout: Duration::from_secs(args.read_timeout),
        max_connections: args.max_connections,
        drain_timeout: Duration::from_secs(args.drain_timeout),
    };
    let manager = match args.models_dir {
        Some(dir) => ModelManager::new(dir)?,
        None => ModelManager::new_default()?,
    };

    let server = Server::with_latest_model(config, &manager).await?;
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for interrupt: {}", e);
            }
            info!("Interrupt received");
        })
        .await?;
    Ok(())
}

async fn classify(args: ClassifyArgs) -> anyhow::Result<()> {
    let features = FeatureVector::new(
        args.impact_duration,
        args.impact_violence,
        args.impact_average,
        args.post_impact_average,
    )?;
    let label = classify_remote(args.server.as_str(), &features, DEFAULT_CONNECT_TIMEOUT)
        .await
        .with_context(|| format!("classification via {} failed", args.server))?;
    println!("{} ({})", label, label.name());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Train(args) => train(args),
        Command::Serve(args) => serve(args).await,
        Command::Classify(args) => classify(args).await,
    }
}
