use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;

#[derive(Parser)]
#[command(name = "api-cli")]
#[command(about = "Send versioned requests to an api-router", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Vendor in `application/vnd.<vendor>.<version>+<format>`
    #[arg(long, default_value = "api")]
    vendor: String,

    /// API version; omit to let the server pick its default
    #[arg(short = 'V', long)]
    api_version: Option<String>,

    #[arg(short, long, default_value = "json")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// GET a path
    Get { path: String },
    /// Send a request with an optional JSON body
    Send {
        method: String,
        path: String,
        #[arg(short, long)]
        body: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(version) = &cli.api_version {
        let accept = format!("application/vnd.{}.{}+{}", cli.vendor, version, cli.format);
        headers.insert(ACCEPT, HeaderValue::from_str(&accept)?);
    }

    let (method, path, body) = match cli.command {
        Commands::Get { path } => (Method::GET, path, None),
        Commands::Send { method, path, body } => (Method::from_bytes(method.to_uppercase().as_bytes())?, path, body),
    };

    let url = format!("{}/{}", cli.url.trim_end_matches('/'), path.trim_start_matches('/'));
    let mut request = client.request(method, url).headers(headers);
    if let Some(body) = body {
        request = request.header(CONTENT_TYPE, "application/json").body(body);
    }

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> anyhow::Result<()> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
    }

    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
