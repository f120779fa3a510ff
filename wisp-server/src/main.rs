use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};
use wisp_core::{ConnectionHealth, Gateway, WispConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Optional TOML config file; DATABASE_URL, DATABASE_NAME and PORT override it
    #[arg(short, long, default_value = "wisp.toml")]
    config: String,

    /// Check the document store and exit
    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience; production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match WispConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    // Missing config or an unreachable store leaves the gateway degraded, not fatal
    let gateway = Gateway::connect(&config.database).await;

    if args.health {
        let report = gateway.health_check().await;
        let mark = |ok: bool| if ok { "✅" } else { "❌" };
        println!("{} DATABASE_URL set", mark(report.config.database_url));
        println!("{} DATABASE_NAME set", mark(report.config.database_name));
        match report.connection {
            ConnectionHealth::Connected { collections } => {
                println!("✅ Document store connected ({} collections)", collections.len());
                for name in collections {
                    println!("   - {}", name);
                }
            }
            ConnectionHealth::Uninitialized => {
                println!("❌ Document store not initialized");
                std::process::exit(1);
            }
            ConnectionHealth::Erroring(e) => {
                println!("❌ Document store connected but failing: {}", e);
                std::process::exit(1);
            }
        }
        println!("✅ Wisp health check passed");
        return Ok(());
    }

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    wisp_server::http::start_http_server(gateway, &config.http, tx.subscribe()).await?;

    Ok(())
}
