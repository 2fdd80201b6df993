//! Tabula CLI - Command-line interface for the Tabula daemon

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9630";

#[derive(Parser)]
#[command(name = "tabula")]
#[command(about = "Tabula CSV ingestion CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "TABULA_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a CSV file for ingestion
    Upload {
        /// Path to the CSV file (must be readable by the daemon)
        #[arg(short, long)]
        file: String,

        /// Expected format as JSON, or @path to a JSON file
        /// e.g. '{"A":{"name":"name","type":"string"}}'
        #[arg(long)]
        format: String,
    },

    /// Show the status of an uploaded file
    Status {
        /// File ID
        id: String,
    },

    /// List validation errors of a file
    Errors(PageArgs),

    /// List processed records of a file
    Processed(PageArgs),
}

#[derive(Args)]
struct PageArgs {
    /// File ID
    id: String,

    /// Zero-based page number
    #[arg(short, long, default_value = "0")]
    page: i64,

    /// Page size
    #[arg(short, long, default_value = "10")]
    size: i64,
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Deserialize, Tabled)]
struct ErrorRow {
    row: u64,
    column: String,
    message: String,
}

#[derive(Deserialize)]
struct Page<T> {
    data: Vec<T>,
    total: u64,
    page: u64,
    size: u64,
}

async fn call_rpc(url: &str, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

fn read_format(raw: &str) -> Result<serde_json::Value> {
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read format file {}", path))?,
        None => raw.to_string(),
    };
    serde_json::from_str(&text).context("Invalid JSON format")
}

fn print_page_footer<T>(page: &Page<T>) {
    println!(
        "{}",
        format!(
            "page {} (size {}), {} shown of {} total",
            page.page,
            page.size,
            page.data.len(),
            page.total
        )
        .dimmed()
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Upload { file, format } => {
            let expected_format = read_format(&format)?;
            // The daemon resolves paths from its own working directory
            let file_path = Path::new(&file)
                .canonicalize()
                .with_context(|| format!("Cannot resolve {}", file))?;

            let params = json!({
                "file_path": file_path.display().to_string(),
                "expected_format": expected_format,
            });

            let result = call_rpc(&cli.rpc_url, "files.upload.v1", params).await?;
            let id = result["id"].as_str().unwrap_or_default();

            println!("{}", "✓ File queued for ingestion".green().bold());
            println!("  {} {}", "ID:".bold(), id);
        }

        Commands::Status { id } => {
            let result = call_rpc(&cli.rpc_url, "files.status.v1", json!({ "id": id })).await?;

            let status = result["status"].as_str().unwrap_or("UNKNOWN");
            let colored_status = match status {
                "DONE" => status.green(),
                "FAILED" => status.red(),
                "PROCESSING" => status.yellow(),
                _ => status.normal(),
            };

            println!("{}", format!("File {}", id).cyan().bold());
            println!();
            println!("  {} {}", "Status:".bold(), colored_status);
            println!("  {} {}", "Processed:".bold(), result["processed"]);
            println!("  {} {}", "Errors:".bold(), result["errors"]);
            println!("  {} {}", "Faults:".bold(), result["faults"]);
            if let Some(reason) = result["failure_reason"].as_str() {
                println!("  {} {}", "Reason:".bold(), reason.red());
            }
        }

        Commands::Errors(args) => {
            let params = json!({ "id": args.id, "page": args.page, "size": args.size });
            let result = call_rpc(&cli.rpc_url, "files.errors.v1", params).await?;
            let page: Page<ErrorRow> = serde_json::from_value(result)?;

            if page.data.is_empty() {
                println!("{}", "No errors on this page".yellow());
            } else {
                println!("{}", Table::new(&page.data));
            }
            print_page_footer(&page);
        }

        Commands::Processed(args) => {
            let params = json!({ "id": args.id, "page": args.page, "size": args.size });
            let result = call_rpc(&cli.rpc_url, "files.processed.v1", params).await?;
            let page: Page<serde_json::Value> = serde_json::from_value(result)?;

            if page.data.is_empty() {
                println!("{}", "No records on this page".yellow());
            }
            for record in &page.data {
                println!("{}", record);
            }
            print_page_footer(&page);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_inline_format() {
        let value = read_format(r#"{"A":{"name":"a","type":"string"}}"#).unwrap();
        assert_eq!(value["A"]["type"], "string");
    }

    #[test]
    fn test_read_invalid_format() {
        assert!(read_format("{not json").is_err());
    }

    #[test]
    fn test_cli_parses_page_args() {
        let cli = Cli::try_parse_from(["tabula", "errors", "abc", "--page", "2", "--size", "5"])
            .unwrap();
        match cli.command {
            Commands::Errors(args) => {
                assert_eq!(args.id, "abc");
                assert_eq!(args.page, 2);
                assert_eq!(args.size, 5);
            }
            _ => panic!("expected errors command"),
        }
    }
}
