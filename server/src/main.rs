use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::network::{ConnectionSettings, Server};
use std::path::PathBuf;
use std::time::Duration;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Path to the JSON configuration file
    #[clap(short, long, default_value = "config.json")]
    config: PathBuf,
    /// IP address to bind to, overrides the configuration file
    #[clap(short = 'H', long)]
    host: Option<String>,
    /// Port to listen on, overrides the configuration file
    #[clap(short, long)]
    port: Option<u16>,
    /// Socket write timeout per frame, in milliseconds
    #[clap(long, default_value = "5000")]
    write_timeout_ms: u64,
    /// Drop connections idle for this many seconds (0 disables)
    #[clap(long, default_value = "0")]
    idle_timeout_secs: u64,
    /// Outbound frames buffered per connection
    #[clap(long, default_value = "64")]
    queue_capacity: usize,
}

/// Main-method of the server.
/// Resolves the bind address from the config file and arguments, then serves until Ctrl+C.
#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = ServerConfig::load_or_default(&args.config);
    if let Some(host) = args.host {
        config.server_ip_address = host;
    }
    if let Some(port) = args.port {
        config.server_port = port;
    }

    let settings = ConnectionSettings {
        write_timeout: Duration::from_millis(args.write_timeout_ms),
        idle_timeout: (args.idle_timeout_secs > 0)
            .then(|| Duration::from_secs(args.idle_timeout_secs)),
        queue_capacity: args.queue_capacity,
    };

    let address = config.bind_address();
    let server = match Server::bind(&address, settings).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to bind {}: {}", address, e);
            std::process::exit(1);
        }
    };

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }
}
