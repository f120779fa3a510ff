//! wisp-cli: terminal client for the Wisp HTTP API
//!
//! # Subcommands
//! - `status`                 - store diagnostics from `GET /test`
//! - `plans`                  - subscription plans
//! - `professionals`          - professional directory
//! - `results <user_id>`      - a user's test results
//! - `sessions <user_id>`     - a user's booked sessions
//! - `messages <user_id>`     - a user's chat history
//!
//! Every listing accepts `--json` to print the raw response body.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8000";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "wisp-cli", version, about = "Inspect a running Wisp API")]
struct Cli {
    /// Wisp HTTP server URL (overrides WISP_HTTP_URL env var)
    #[arg(long, env = "WISP_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show backend and document store status
    Status,

    /// List subscription plans
    Plans {
        #[arg(long)]
        json: bool,
    },

    /// List the professional directory
    Professionals {
        #[arg(long)]
        json: bool,
    },

    /// List a user's test results
    Results {
        user_id: String,
        #[arg(long)]
        json: bool,
    },

    /// List a user's sessions
    Sessions {
        user_id: String,
        #[arg(long)]
        json: bool,
    },

    /// Show a user's chat history
    Messages {
        user_id: String,
        #[arg(long)]
        json: bool,
    },
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PlanView {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub interval: String,
    #[serde(default)]
    pub features: Vec<String>,
}

/// `{items: [...]}` wrapper used by every per-owner listing.
#[derive(Debug, Deserialize)]
pub struct Items {
    pub items: Vec<Value>,
}

// ============================================================================
// Text Output
// ============================================================================

pub fn format_plan(p: &PlanView) -> String {
    let mut line = format!("{:<6} {:<6} ${:>6.2}/{}", p.id, p.name, p.price, p.interval);
    if !p.features.is_empty() {
        line.push_str("  — ");
        line.push_str(&p.features.join(", "));
    }
    line
}

/// One line per listed record, picking the fields that matter for `kind`.
pub fn format_item(kind: &str, item: &Value) -> String {
    let s = |key: &str| item[key].as_str().unwrap_or("-").to_string();
    match kind {
        "professionals" => {
            let rating = item["rating"]
                .as_f64()
                .map(|r| format!("{:.1}", r))
                .unwrap_or_else(|| "-".to_string());
            format!("{}  {} ({}) ★{}", s("id"), s("name"), s("specialty"), rating)
        }
        "results" => format!("{}  {}  {}  {}", s("id"), s("taken_at"), s("archetype"), s("summary")),
        "sessions" => format!(
            "{}  {}  with {}  [{}]",
            s("id"),
            s("datetime_iso"),
            s("professional_id"),
            s("status")
        ),
        "messages" => {
            let content: String = s("content").chars().take(120).collect();
            format!("{:>9}: {}", s("role"), content)
        }
        _ => item.to_string(),
    }
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

pub struct ApiClient {
    base: Url,
    http: reqwest::blocking::Client,
}

impl ApiClient {
    pub fn new(server: &str) -> anyhow::Result<Self> {
        let base = Url::parse(server).with_context(|| format!("invalid server URL {}", server))?;
        if base.cannot_be_a_base() {
            bail!("invalid server URL {}", server);
        }
        let http = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self { base, http })
    }

    /// `base` with each segment appended percent-encoded, so a user id
    /// containing `/`, `?` or `#` stays inside its own path segment.
    pub fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub fn get_json(&self, segments: &[&str]) -> anyhow::Result<Value> {
        let url = self.url(segments);
        let resp = self
            .http
            .get(url.clone())
            .send()
            .with_context(|| format!("connection failed to {}", url))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            bail!("server returned {}: {}", status, body);
        }

        resp.json()
            .with_context(|| format!("failed to parse response from {}", url))
    }

    pub fn plans(&self) -> anyhow::Result<Vec<PlanView>> {
        Ok(serde_json::from_value(self.get_json(&["plans"])?)?)
    }

    pub fn listing(&self, segments: &[&str]) -> anyhow::Result<Items> {
        Ok(serde_json::from_value(self.get_json(segments)?)?)
    }
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `/test` diagnostics as aligned `label: value` lines.
pub fn format_status(body: &Value) -> Vec<String> {
    let field = |key: &str| body[key].as_str().unwrap_or("?").to_string();
    let mut lines = vec![
        format!("Backend:       {}", field("backend")),
        format!("Database:      {}", field("database")),
        format!("DATABASE_URL:  {}", field("database_url")),
        format!("DATABASE_NAME: {}", field("database_name")),
        format!("Connection:    {}", field("connection_status")),
    ];
    if let Some(names) = body["collections"].as_array() {
        let names: Vec<&str> = names.iter().filter_map(Value::as_str).collect();
        lines.push(format!("Collections:   {}", names.join(", ")));
    }
    lines
}

fn do_status(client: &ApiClient) -> anyhow::Result<()> {
    let body = client.get_json(&["test"])?;
    for line in format_status(&body) {
        println!("{}", line);
    }
    Ok(())
}

fn do_plans(client: &ApiClient, json_output: bool) -> anyhow::Result<()> {
    if json_output {
        return print_json(&client.get_json(&["plans"])?);
    }
    for p in &client.plans()? {
        println!("{}", format_plan(p));
    }
    Ok(())
}

fn do_listing(client: &ApiClient, kind: &str, segments: &[&str], json_output: bool) -> anyhow::Result<()> {
    if json_output {
        return print_json(&client.get_json(segments)?);
    }
    let listing = client.listing(segments)?;
    if listing.items.is_empty() {
        eprintln!("No {} found", kind);
        return Ok(());
    }
    for item in &listing.items {
        println!("{}", format_item(kind, item));
    }
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn run(cli: Cli) -> anyhow::Result<()> {
    let client = ApiClient::new(&cli.server)?;
    match cli.command {
        Commands::Status => do_status(&client),
        Commands::Plans { json } => do_plans(&client, json),
        Commands::Professionals { json } => {
            do_listing(&client, "professionals", &["professionals"], json)
        }
        Commands::Results { user_id, json } => {
            do_listing(&client, "results", &["results", user_id.as_str()], json)
        }
        Commands::Sessions { user_id, json } => {
            do_listing(&client, "sessions", &["sessions", user_id.as_str()], json)
        }
        Commands::Messages { user_id, json } => {
            do_listing(&client, "messages", &["messages", user_id.as_str()], json)
        }
    }
}

fn main() {
    if let Err(e) = run(Cli::parse()) {
        eprintln!("wisp-cli: {:#}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
