use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "relayer-cli")]
#[command(about = "Management CLI for the subscription relayer", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:10002")]
    url: String,

    /// Admin API key, sent as a bearer token.
    #[arg(short, long, env = "RELAYER_API_KEY")]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Service banner and ledger health
    Status,
    /// List stored subscriptions
    Subscriptions,
    /// List deployed contracts
    Contracts {
        /// Subscription contracts instead of token contracts
        #[arg(long)]
        sub: bool,
    },
    /// Drop every stored subscription
    Clear,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", key))?);
    }

    match cli.command {
        Commands::Status => {
            let res = client.get(format!("{}/", cli.url)).send().await?;
            print_response(res).await?;
            let res = client.get(format!("{}/health", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Subscriptions => {
            let res = client.get(format!("{}/subscriptions", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Contracts { sub } => {
            let path = if sub { "subcontracts" } else { "contracts" };
            let res = client.get(format!("{}/{}", cli.url, path)).send().await?;
            print_response(res).await?;
        }
        Commands::Clear => {
            let res = client
                .post(format!("{}/clear", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: relayer returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
