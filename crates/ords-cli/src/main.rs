use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ords")]
#[command(about = "Order service operator CLI", long_about = None)]
struct Cli {
    /// Config paths in merge order; defaults to ORDS_CONFIG or config/base.yaml
    #[arg(long = "config", global = true, value_delimiter = ',')]
    config: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env overlays...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Order inspection
    Order {
        #[command(subcommand)]
        cmd: OrderCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations.
    Migrate,
}

#[derive(Subcommand)]
enum OrderCmd {
    /// Decode and validate an order JSON file (no DB access).
    Validate {
        /// Path to the order document
        path: String,
    },

    /// Print one stored order as JSON
    Show { order_uid: String },

    /// List the most recently created orders
    Recent {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = commands::connect_db(&cli.config).await?;
            match cmd {
                DbCmd::Status => {
                    let s = ords_db::status(&pool).await?;
                    println!(
                        "db_ok={} has_orders_table={} order_count={}",
                        s.ok, s.has_orders_table, s.order_count
                    );
                }
                DbCmd::Migrate => {
                    ords_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let (loaded, _typed) = ords_config::load_service_config(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Order { cmd } => match cmd {
            OrderCmd::Validate { path } => commands::order::validate_file(&path)?,
            OrderCmd::Show { order_uid } => {
                let pool = commands::connect_db(&cli.config).await?;
                commands::order::show(pool, &order_uid).await?
            }
            OrderCmd::Recent { limit } => {
                let pool = commands::connect_db(&cli.config).await?;
                commands::order::recent(pool, limit).await?
            }
        },
    }

    Ok(())
}
