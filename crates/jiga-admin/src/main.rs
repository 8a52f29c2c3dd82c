use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use jiga_core::config::SeedConfig;
use jiga_core::credentials::{self, EnvSnapshot, HttpProber, ProbeEndpoints};
use jiga_core::loader::DataLoader;
use jiga_core::seed::{SeedSummary, Seeder};
use jiga_store::{DocumentStore, FirestoreStore, MemoryStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "JIGA Store administrative tooling", long_about = None)]
struct Cli {
    /// Emit JSON log lines instead of human-readable output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed agents, listings and reference data into Firestore
    DbSeed(DbSeedArgs),
    /// Check that service credentials are configured (and optionally working)
    VerifyCredentials(VerifyCredentialsArgs),
}

#[derive(Args, Debug, Default)]
struct DbSeedArgs {
    /// Directory holding core-agents.json and marketplace-listings.json
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Use the development project id when FIREBASE_PROJECT_ID is unset
    #[arg(long)]
    dev_project_fallback: bool,
    /// Run every phase against an in-memory store instead of Firestore
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug, Default)]
struct VerifyCredentialsArgs {
    /// Test connectivity for every fully configured service
    #[arg(long)]
    test: bool,
    /// Do not create .env.example when it is missing
    #[arg(long)]
    no_env_example: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json);

    match cli.command {
        Command::DbSeed(args) => handle_db_seed(args).await,
        Command::VerifyCredentials(args) => handle_verify_credentials(args).await,
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

async fn handle_db_seed(args: DbSeedArgs) -> Result<()> {
    println!("🌱 JIGA Store Database Seeding");
    println!("==============================\n");

    let mut config = SeedConfig::from_env().with_dev_project_fallback(args.dev_project_fallback);
    if let Some(data_dir) = args.data_dir {
        config = config.with_data_dir(data_dir);
    }

    let summary = if args.dry_run {
        info!("Dry run: writing to an in-memory store");
        let loader = DataLoader::new(config.data_dir.clone());
        run_seeder(Seeder::new(MemoryStore::new(), loader)).await?
    } else {
        let seeder = Seeder::<FirestoreStore>::connect(&config)
            .await
            .context("failed to initialize Firestore")?;
        run_seeder(seeder).await?
    };

    println!("\n✨ Database seeding completed successfully!\n");
    print!("{summary}");
    Ok(())
}

async fn run_seeder<S: DocumentStore>(mut seeder: Seeder<S>) -> Result<SeedSummary> {
    seeder.run().await.context("seeding failed")
}

async fn handle_verify_credentials(args: VerifyCredentialsArgs) -> Result<()> {
    println!("🔍 JIGA Store Credentials Verification\n");

    if !args.no_env_example {
        let cwd = env::current_dir().context("cannot determine working directory")?;
        credentials::write_env_example(&cwd).context("failed to write .env.example")?;
    }

    let env = EnvSnapshot::from_env();
    let prober = HttpProber::new(ProbeEndpoints::default())
        .context("failed to build HTTP client")?;
    let report = credentials::verify(&env, args.test, &prober).await;

    println!("{}", report.render_table());

    if report.all_required_valid() {
        println!("\n✅ All required credentials are configured!");
        Ok(())
    } else {
        println!("\nTo fix:");
        println!("1. Copy .env.example to .env");
        println!("2. Fill in the missing values");
        println!("3. Run this command again");
        bail!("some required credentials are missing or failing")
    }
}
