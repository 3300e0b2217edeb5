use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use reqwest::Method;
use serde_json::Value;

use folio_gateway::auth::{
    AuthenticatedClient, FileStorage, LogObserver, RefreshCoordinator, UploadPart,
};
use folio_gateway::config::load_or_default;
use folio_gateway::images::UploadFile;
use folio_gateway::observability::logging::init_logging;
use folio_gateway::tools::{ToolRunner, ToolSession};

#[derive(Parser)]
#[command(name = "folio-cli")]
#[command(about = "Dashboard client for the Folio API", long_about = None)]
struct Cli {
    /// Configuration file providing the `[client]` and `[images]` sections
    #[arg(short, long, env = "FOLIO_CONFIG")]
    config: Option<PathBuf>,

    /// API base URL, overrides `client.base_url`
    #[arg(short, long)]
    url: Option<String>,

    /// Credential store, overrides `client.storage_path`
    #[arg(short, long)]
    storage: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the token pair
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "FOLIO_PASSWORD")]
        password: String,
    },
    /// Forget the stored token pair
    Logout,
    /// GET a resource and print its `data`
    Get { path: String },
    /// DELETE a resource
    Delete { path: String },
    /// POST a JSON body
    Post { path: String, body: String },
    /// PUT a JSON body
    Put { path: String, body: String },
    /// PATCH a JSON body
    Patch { path: String, body: String },
    /// Multipart upload; image files are compressed first
    Upload {
        path: String,
        /// Text field as key=value
        #[arg(long = "field")]
        fields: Vec<String>,
        /// File field as key=path
        #[arg(long = "file")]
        files: Vec<String>,
        /// Send as PUT instead of POST
        #[arg(long)]
        put: bool,
    },
    /// Backend-defined tools
    Tools {
        #[command(subcommand)]
        command: ToolCommands,
    },
}

#[derive(Subcommand)]
enum ToolCommands {
    /// List available tools
    List,
    /// Run a tool with the given field values
    Run {
        slug: String,
        /// Field value as key=value
        #[arg(long = "set")]
        values: Vec<String>,
        /// Run a repeatable generator several times
        #[arg(long, default_value_t = 1)]
        repeat: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_or_default(cli.config.as_deref())?;
    init_logging(&config.observability.log_level);

    if let Some(url) = cli.url {
        config.client.base_url = url;
    }
    if let Some(storage) = cli.storage {
        config.client.storage_path = storage;
    }

    let storage = Arc::new(FileStorage::open(&config.client.storage_path)?);
    let client = AuthenticatedClient::from_config(
        &config.client,
        &config.images,
        storage,
        Arc::new(RefreshCoordinator::new()),
        Arc::new(LogObserver),
    )?;

    match cli.command {
        Commands::Login { username, password } => {
            client.login(&username, &password).await?;
            println!("Logged in as {username}");
        }
        Commands::Logout => {
            client.logout()?;
            println!("Logged out");
        }
        Commands::Get { path } => {
            let data: Value = client.get(&path).await?;
            print_json(&data)?;
        }
        Commands::Delete { path } => print_json(&client.delete(&path).await?)?,
        Commands::Post { path, body } => {
            print_json(&client.post_json(&path, &parse_body(&body)?).await?)?
        }
        Commands::Put { path, body } => {
            print_json(&client.put_json(&path, &parse_body(&body)?).await?)?
        }
        Commands::Patch { path, body } => {
            print_json(&client.patch_json(&path, &parse_body(&body)?).await?)?
        }
        Commands::Upload { path, fields, files, put } => {
            let mut parts = Vec::new();
            for field in &fields {
                let (name, value) = split_pair(field)?;
                parts.push(UploadPart::Text { name, value });
            }
            for file in &files {
                let (name, file_path) = split_pair(file)?;
                parts.push(UploadPart::File { name, file: UploadFile::from_path(file_path)? });
            }
            let method = if put { Method::PUT } else { Method::POST };
            print_json(&client.upload(method, &path, parts).await?)?;
        }
        Commands::Tools { command } => run_tools(&client, command).await?,
    }

    Ok(())
}

async fn run_tools(
    client: &AuthenticatedClient,
    command: ToolCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    let runner = ToolRunner::new(client);

    match command {
        ToolCommands::List => {
            for tool in runner.list().await? {
                let marker = if tool.repeatable { " (repeatable)" } else { "" };
                println!("{:<24} {}{}", tool.slug, tool.name, marker);
                if let Some(description) = tool.description {
                    println!("{:<24} {}", "", description);
                }
            }
        }
        ToolCommands::Run { slug, values, repeat } => {
            let mut session = ToolSession::new(runner.schema(&slug).await?);
            for pair in &values {
                let (key, value) = split_pair(pair)?;
                session.form.set(&key, &value)?;
            }

            let runs = if session.is_repeatable() { repeat.max(1) } else { 1 };
            for _ in 0..runs {
                session.run(&runner).await?;
            }

            if session.is_repeatable() {
                // Oldest first so the newest ends up at the bottom of the terminal.
                let results: Vec<_> = session.history().iter().collect();
                for result in results.iter().rev() {
                    println!("{}", result.render());
                }
            } else if let Some(result) = session.latest() {
                print!("{}", result.render());
            }
        }
    }
    Ok(())
}

fn split_pair(pair: &str) -> Result<(String, String), Box<dyn std::error::Error>> {
    pair.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{pair}`").into())
}

fn parse_body(body: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(body)
}

fn print_json(value: &Value) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
