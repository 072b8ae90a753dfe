//! CLI for topicast
//!
//! Subcommands:
//! - `server`: run the broker
//! - `publish`, `subscribe`, `topics`: small clients for smoke tests

use clap::{Parser, Subcommand};
use tracing::{error, info};

use topicast::codec::Serializer;
use topicast::config::{Settings, load_config};
use topicast::queue::{Queue, QueueRole};
use topicast::transport::Server;
use topicast::utils::logging;

#[derive(Parser)]
#[command(name = "topicast", version, about = "Hierarchical publish/subscribe broker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the broker
    Server {
        /// Override `server.host`
        #[arg(long)]
        host: Option<String>,
        /// Override `server.port`
        #[arg(long)]
        port: Option<u16>,
    },
    /// Publish one value to a topic
    Publish {
        #[arg(long)]
        topic: String,
        #[arg(long)]
        value: String,
        #[command(flatten)]
        conn: ConnArgs,
    },
    /// Print every value delivered for a topic until the broker disconnects
    Subscribe {
        #[arg(long)]
        topic: String,
        #[command(flatten)]
        conn: ConnArgs,
    },
    /// Print the topics known to the broker
    Topics {
        #[command(flatten)]
        conn: ConnArgs,
    },
}

#[derive(clap::Args)]
struct ConnArgs {
    /// Broker address; defaults to the configured host and port
    #[arg(long)]
    addr: Option<String>,
    /// Body encoding: json, xml or native
    #[arg(long, default_value = "json")]
    serializer: Serializer,
}

impl ConnArgs {
    fn addr(&self, settings: &Settings) -> String {
        self.addr.clone().unwrap_or_else(|| settings.server.addr())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    logging::init(&settings.log.level);

    let result = match cli.command {
        Command::Server { host, port } => {
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            run_server(settings).await
        }
        Command::Publish { topic, value, conn } => run_publish(&settings, conn, &topic, &value).await,
        Command::Subscribe { topic, conn } => run_subscribe(&settings, conn, &topic).await,
        Command::Topics { conn } => run_topics(&settings, conn).await,
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let server = Server::bind(settings).await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Cannot listen for shutdown signal: {e}");
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received. Exiting gracefully.");
        })
        .await?;
    Ok(())
}

async fn run_publish(
    settings: &Settings,
    conn: ConnArgs,
    topic: &str,
    value: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut queue = Queue::connect(conn.addr(settings), topic, QueueRole::Producer, conn.serializer).await?;
    queue.push(value).await?;
    queue.close().await?;
    Ok(())
}

async fn run_subscribe(
    settings: &Settings,
    conn: ConnArgs,
    topic: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut queue = Queue::connect(conn.addr(settings), topic, QueueRole::Consumer, conn.serializer).await?;
    while let Some(received) = queue.pull().await? {
        println!("{}\t{}", received.topic, received.value);
    }
    Ok(())
}

async fn run_topics(settings: &Settings, conn: ConnArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut queue = Queue::connect(conn.addr(settings), "", QueueRole::Producer, conn.serializer).await?;
    for topic in queue.list_topics().await? {
        println!("{topic}");
    }
    queue.close().await?;
    Ok(())
}
