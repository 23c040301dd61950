use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "lb-cli")]
#[command(about = "Management CLI for lb-proxy", long_about = None)]
struct Cli {
    #[arg(short, long, env = "LB_URL", default_value = "http://localhost:8080")]
    url: String,

    /// Bearer token, when the server has `admin.api_key` set.
    #[arg(short, long, env = "LB_API_KEY")]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a client with its own bucket
    Create {
        client_id: String,
        #[arg(long)]
        capacity: u32,
        #[arg(long)]
        rate: u32,
    },
    /// Show a client's bucket
    Get { client_id: String },
    /// Replace a client's capacity and rate (refills the bucket)
    Update {
        client_id: String,
        #[arg(long)]
        capacity: u32,
        #[arg(long)]
        rate: u32,
    },
    /// Remove a client
    Delete { client_id: String },
    /// List backend liveness
    Backends,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", key))?,
        );
    }

    let clients_url = format!("{}/clients", cli.url);
    let request = match cli.command {
        Commands::Create {
            client_id,
            capacity,
            rate,
        } => client.post(&clients_url).json(&json!({
            "client_id": client_id,
            "capacity": capacity,
            "rate_per_sec": rate,
        })),
        Commands::Get { client_id } => client
            .get(&clients_url)
            .query(&[("client_id", client_id)]),
        Commands::Update {
            client_id,
            capacity,
            rate,
        } => client.put(&clients_url).json(&json!({
            "client_id": client_id,
            "capacity": capacity,
            "rate_per_sec": rate,
        })),
        Commands::Delete { client_id } => client
            .delete(&clients_url)
            .query(&[("client_id", client_id)]),
        Commands::Backends => client.get(format!("{}/backends", cli.url)),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let text = res.text().await?;
    if text.is_empty() {
        println!("{}", status);
        return Ok(());
    }
    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
