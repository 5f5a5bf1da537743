use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;

use mail_loader::config::{BulkLoadSettings, DatabaseConfig, LoaderConfig};
use mail_loader::db;
use mail_loader::load::{EmailLoader, LoadOptions, source};
use mail_loader::report::{SummaryTable, category_summary};
use mail_loader::taxonomy::Taxonomy;

#[derive(Parser, Debug)]
#[command(
    name = "mail-loader",
    about = "Load a CSV export of email metadata into PostgreSQL"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a CSV export, assigning each row a weighted random category.
    Load(LoadArgs),
    /// Print email count and total size per category.
    Summary,
}

#[derive(Args, Debug)]
struct LoadArgs {
    /// CSV export to load (defaults to LOADER_CSV_PATH or `updated_data.csv`).
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Rows per insert statement.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Maximum recipient length in characters.
    #[arg(long)]
    max_recipient_len: Option<usize>,

    /// Seed for category sampling, for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,

    /// JSON taxonomy file replacing the built-in categories.
    #[arg(long)]
    taxonomy: Option<PathBuf>,

    /// Skip foreign-key triggers during the load (superuser only).
    #[arg(long)]
    disable_triggers: bool,

    /// Read and assemble records without connecting to the database.
    #[arg(long)]
    dry_run: bool,
}

impl LoadArgs {
    fn apply(self, config: &mut LoaderConfig, settings: &mut BulkLoadSettings) {
        if let Some(csv) = self.csv {
            config.csv_path = csv;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size.max(1);
        }
        if let Some(max_recipient_len) = self.max_recipient_len {
            config.max_recipient_len = max_recipient_len.max(1);
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.taxonomy.is_some() {
            config.taxonomy_path = self.taxonomy;
        }
        if self.disable_triggers {
            settings.disable_triggers = true;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    mail_loader::init_logger();

    let cli = Cli::parse();
    let db_config = DatabaseConfig::from_env();

    match cli.command {
        Command::Load(args) => {
            let dry_run = args.dry_run;
            let mut config = LoaderConfig::from_env();
            let mut settings = BulkLoadSettings::from_env();
            args.apply(&mut config, &mut settings);
            run_load(config, settings, db_config, dry_run).await
        }
        Command::Summary => run_summary(db_config).await,
    }
}

async fn run_load(
    config: LoaderConfig,
    settings: BulkLoadSettings,
    db_config: DatabaseConfig,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let taxonomy = match &config.taxonomy_path {
        Some(path) => Taxonomy::from_json_file(path)?,
        None => Taxonomy::email_default(),
    };

    let mut rng = match config.seed {
        Some(seed) => {
            log::info!("sampling categories with seed {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let rows = source::read_csv_path(&config.csv_path)?;
    let loader = EmailLoader::new(&taxonomy, LoadOptions::from_config(&config, settings));

    if dry_run {
        let stats = loader.dry_run(&rows, &mut rng)?;
        print!("{}", stats);
        return Ok(());
    }

    let pool = match db::connect(&db_config).await {
        Ok(pool) => pool,
        Err(err) => {
            log::error!("error connecting to database: {}", err);
            return Err(err.into());
        }
    };

    let result = async {
        let mut conn = pool.acquire().await?;
        let stats = loader.load(&mut conn, &rows, &mut rng).await?;
        print!("{}", stats);

        let summary = category_summary(&mut conn).await?;
        print!("{}", SummaryTable(&summary));
        Ok::<_, Box<dyn std::error::Error>>(())
    }
    .await;

    pool.close().await;
    result
}

async fn run_summary(db_config: DatabaseConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pool = match db::connect(&db_config).await {
        Ok(pool) => pool,
        Err(err) => {
            log::error!("error connecting to database: {}", err);
            return Err(err.into());
        }
    };

    let result = async {
        let mut conn = pool.acquire().await?;
        let summary = category_summary(&mut conn).await?;
        print!("{}", SummaryTable(&summary));
        Ok::<_, Box<dyn std::error::Error>>(())
    }
    .await;

    pool.close().await;
    result
}
