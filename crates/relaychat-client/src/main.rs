//! Relaychat interactive client.
//!
//! # Usage
//!
//! ```bash
//! relaychat-client --name alice
//! relaychat-client --server 192.168.1.10:1234 --name bob
//! ```
//!
//! Each stdin line is sent as one message; each received message prints
//! as `name > text`. Exits cleanly when the server closes the
//! connection or stdin ends.

use clap::Parser;
use relaychat_client::{ClientEvent, connect};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Relaychat interactive client
#[derive(Parser, Debug)]
#[command(name = "relaychat-client")]
#[command(about = "Interactive text relay client")]
#[command(version)]
struct Args {
    /// Server address to connect to
    #[arg(short, long, default_value = "127.0.0.1:1234")]
    server: String,

    /// Display name to register
    #[arg(short, long)]
    name: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let mut client = connect(&args.server, &args.name).await?;

    println!("connected to {} as {}", args.server, args.name);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = client.next_event() => match event {
                Some(ClientEvent::Message { sender, text }) => {
                    println!("{sender} > {text}");
                },
                Some(ClientEvent::Disconnected { reason }) => {
                    eprintln!("{reason}");
                    break;
                },
                None => break,
            },
            line = lines.next_line() => match line? {
                Some(line) if !line.is_empty() => {
                    if let Err(e) = client.send(&line).await {
                        eprintln!("send failed: {e}");
                    }
                },
                Some(_) => {},
                None => break, // stdin closed
            },
        }
    }

    client.stop();

    Ok(())
}
