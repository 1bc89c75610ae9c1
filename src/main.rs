use actix::prelude::*;
use actix_web::{web, App, HttpServer};
use std::sync::Arc;

mod actors;
mod assessment;
mod config;
mod dom;
mod errors;
mod generator;
mod logger;
mod routing;
mod sanitize;
mod stdio;
mod surface;
mod templates;

use actors::health::HealthActor;
use clap::Parser;
use config::GeneratorConfig;
use generator::{ContentGenerator, HttpGenerator, UnconfiguredGenerator};

#[derive(Parser)]
#[command(name = "tutorloop")]
#[command(about = "Interactive assessment sessions with generated content and local fallbacks.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log at debug level unless config.yaml sets a level
    #[clap(long, global = true)]
    verbose: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Runs the HTTP and WebSocket server
    Serve,
    /// Runs a single session over stdin and stdout
    Stdio,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let log_level = config::CONFIG.log_level.as_deref().unwrap_or(default_level);
    logger::init_logger(log_level);

    let (generator, generator_ready) = build_generator(&config::CONFIG.generator);
    let health_actor_addr = HealthActor::new().start();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(generator, generator_ready, health_actor_addr).await,
        Commands::Stdio => stdio::run_stdio_session(config::CONFIG.clone(), generator, health_actor_addr).await,
    }
}

/// Picks the HTTP generator when an API key is available. Without one every
/// session runs on fallback content.
fn build_generator(settings: &GeneratorConfig) -> (Arc<dyn ContentGenerator>, bool) {
    let Some(api_key) = settings.api_key() else {
        log::warn!(
            "No API key found in ${}. Sessions will use standard questions only.",
            settings.api_key_env
        );
        return (Arc::new(UnconfiguredGenerator), false);
    };

    match HttpGenerator::new(settings, api_key) {
        Ok(generator) => {
            log::debug!("Using {} at {}", settings.model, settings.endpoint);
            (Arc::new(generator), true)
        }
        Err(e) => {
            log::error!("Could not set up the generator client: {}. Falling back to standard questions.", e);
            (Arc::new(UnconfiguredGenerator), false)
        }
    }
}

async fn run_server(
    generator: Arc<dyn ContentGenerator>,
    generator_ready: bool,
    health_actor_addr: Addr<HealthActor>,
) -> std::io::Result<()> {
    let host = config::CONFIG.server.host.clone();
    let port = config::CONFIG.server.port;

    let settings = web::Data::new(routing::SessionSettings {
        config: config::CONFIG.clone(),
        generator,
    });
    let health_data = web::Data::new(health_actor_addr);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(settings.clone())
            .app_data(health_data.clone())
            .configure(routing::configure)
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .bind((host.as_str(), port))
    .map_err(|e| {
        if e.kind() == std::io::ErrorKind::AddrInUse {
            println!("Error: The port {} is already in use.", port);
            println!("Another application is likely running on this port.");
            println!("Please stop the other application or change `server.port` in config.yaml.");
            std::process::exit(1);
        }
        e
    })?;

    logger::print_banner(&host, port, generator_ready);

    server.run().await
}
