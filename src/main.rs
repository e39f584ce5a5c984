use std::io::{BufRead, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use race_tracker::config::{Config, ConfigOverrides, StoreBackend};
use race_tracker::desk::RaceDesk;
use race_tracker::import::{
    parse, preview, render_template, CsvDialect, ImportOptions, MappingStrategy,
    TEMPLATE_FILE_NAME,
};
use race_tracker::listing::{ListQuery, SortDirection, SortState};
use race_tracker::output::csv::races_to_csv;
use race_tracker::output::json::render_json;
use race_tracker::output::table::{
    render_import_preview, render_race_detail, render_race_table, DetailTab,
};
use race_tracker::race::{EditForm, Race, RaceField, RaceId};
use race_tracker::server::run_server;
use race_tracker::session::Session;
use race_tracker::store::{RaceStore, RestRaceStore, SqliteRaceStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "race-tracker",
    about = "Track district-level race metrics: performance, registration and fundraising"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[arg(long)]
    backend: Option<String>,
    #[arg(long)]
    url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Filtered and sorted race list.
    List {
        #[arg(short, long, default_value = "")]
        search: String,
        #[arg(long, default_value = "state")]
        sort: String,
        #[arg(long)]
        desc: bool,
    },
    Show {
        id: i64,
        #[arg(long, default_value = "overview")]
        tab: String,
    },
    /// Bulk import a CSV file. Nothing is inserted if any row fails to map.
    Import {
        file: PathBuf,
        #[arg(long)]
        dialect: Option<String>,
        #[arg(long)]
        strategy: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    Template {
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        strategy: Option<String>,
    },
    /// Edit a race. Each --set takes `field=value`, e.g. `fundraising.labor=1000`.
    Edit {
        id: i64,
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },
    Delete {
        id: i64,
        #[arg(long)]
        yes: bool,
    },
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides::from_env());
    config.apply_overrides(ConfigOverrides {
        backend: cli
            .backend
            .as_deref()
            .map(StoreBackend::from_str)
            .transpose()?,
        url: cli.url.clone(),
        ..ConfigOverrides::default()
    });

    match &cli.command {
        Commands::Config { init, show } => {
            return handle_config_command(*init, *show, &config, &config_path)
        }
        Commands::Template { out, strategy } => {
            let strategy = resolve_import_options(&config, None, strategy.as_deref())?.strategy;
            return write_template(out.as_deref(), strategy);
        }
        _ => {}
    }

    let store = open_store(&config)?;
    info!("using {} store {}", config.store.backend, store.name());

    if let Commands::Serve { host, port } = &cli.command {
        let host = host.clone().unwrap_or_else(|| config.server.host.clone());
        let port = port.unwrap_or(config.server.port);
        let bind = format!("{host}:{port}");
        let addr: SocketAddr = bind
            .parse()
            .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
        let desk = RaceDesk::open(store).await?;
        return run_server(desk, config.import, addr).await;
    }

    let mut desk = RaceDesk::open(store).await?;

    match &cli.command {
        Commands::List { search, sort, desc } => {
            let field = RaceField::from_str(sort)?;
            let direction = if *desc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            };
            let sort = SortState::new(field, direction);
            let races = desk.view(&ListQuery::new(search.as_str(), sort));
            print_races(&races, Some(sort), cli.output)?;
        }
        Commands::Show { id, tab } => {
            let id = RaceId(*id);
            let race = desk
                .get(id)
                .ok_or_else(|| anyhow!("race {id} not found"))?;
            print_race(race, DetailTab::from_str(tab)?, cli.output)?;
        }
        Commands::Import {
            file,
            dialect,
            strategy,
            dry_run,
        } => {
            let options = resolve_import_options(&config, dialect.as_deref(), strategy.as_deref())?;
            let text = std::fs::read_to_string(file)
                .with_context(|| format!("failed reading CSV file: {}", file.display()))?;
            if *dry_run {
                let grid = parse(&text, options.dialect)?;
                let preview = preview(&grid, options.strategy)?;
                match cli.output {
                    OutputFormat::Table => println!("{}", render_import_preview(&preview)),
                    _ => println!("{}", render_json(&preview)?),
                }
                return Ok(());
            }
            match desk.import_csv(&text, options).await {
                Ok(outcome) => {
                    println!(
                        "Imported {} races ({} total) at {}",
                        outcome.inserted.len(),
                        outcome.total_races,
                        outcome.imported_at.to_rfc3339()
                    );
                }
                Err(err) => return Err(anyhow!(err.user_message())),
            }
        }
        Commands::Edit { id, set } => {
            let id = RaceId(*id);
            let current = desk
                .get(id)
                .ok_or_else(|| anyhow!("race {id} not found"))?;
            let form = build_edit_form(current, set)?;
            let saved = desk
                .save_edit(id, &form)
                .await
                .map_err(|err| anyhow!(err.user_message()))?;
            print_race(&saved, DetailTab::Fundraising, cli.output)?;
        }
        Commands::Delete { id, yes } => {
            let id = RaceId(*id);
            let name = desk
                .get(id)
                .map(Race::display_name)
                .ok_or_else(|| anyhow!("race {id} not found"))?;
            if !*yes && !confirm(&format!("Are you sure you want to delete {name}?"))? {
                warn!("delete of race {id} cancelled");
                return Ok(());
            }
            desk.delete(id)
                .await
                .map_err(|err| anyhow!(err.user_message()))?;
            println!("Deleted {name} ({} races remain)", desk.races().len());
        }
        Commands::Template { .. } | Commands::Serve { .. } | Commands::Config { .. } => {}
    }

    Ok(())
}

fn open_store(config: &Config) -> Result<Box<dyn RaceStore>> {
    let store: Box<dyn RaceStore> = match config.store.backend {
        StoreBackend::Rest => {
            let session = Session::resolve(&config.store)?;
            Box::new(RestRaceStore::new(&config.store, session)?)
        }
        StoreBackend::Sqlite => Box::new(SqliteRaceStore::open(&config.resolved_sqlite_path())?),
    };
    Ok(store)
}

fn resolve_import_options(
    config: &Config,
    dialect: Option<&str>,
    strategy: Option<&str>,
) -> Result<ImportOptions> {
    let mut options = config.import;
    if let Some(raw) = dialect {
        options.dialect = CsvDialect::from_str(raw)?;
    }
    if let Some(raw) = strategy {
        options.strategy = MappingStrategy::from_str(raw)?;
    }
    Ok(options)
}

fn build_edit_form(current: &Race, assignments: &[String]) -> Result<EditForm> {
    if assignments.is_empty() {
        return Err(anyhow!("at least one --set field=value is required for edit"));
    }
    let mut form = EditForm::from_race(current);
    for assignment in assignments {
        let (field, value) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow!("expected field=value, got {assignment}"))?;
        let field = RaceField::from_str(field.trim())?;
        form.set(field, value)?;
    }
    Ok(form)
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn write_template(out: Option<&Path>, strategy: MappingStrategy) -> Result<()> {
    let template = render_template(strategy);
    match out {
        Some(path) => {
            let path = if path.is_dir() {
                path.join(TEMPLATE_FILE_NAME)
            } else {
                path.to_path_buf()
            };
            std::fs::write(&path, template)
                .with_context(|| format!("failed writing template: {}", path.display()))?;
            println!("Wrote import template to {}", path.display());
        }
        None => println!("{template}"),
    }
    Ok(())
}

fn handle_config_command(init: bool, show: bool, config: &Config, config_path: &Path) -> Result<()> {
    if init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if show || !init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

fn print_races(races: &[Race], sort: Option<SortState>, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_race_table(races, sort)),
        OutputFormat::Json => println!("{}", render_json(races)?),
        OutputFormat::Csv => print!("{}", races_to_csv(races)?),
    }
    Ok(())
}

fn print_race(race: &Race, tab: DetailTab, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_race_detail(race, tab)),
        OutputFormat::Json => println!("{}", render_json(race)?),
        OutputFormat::Csv => print!("{}", races_to_csv(std::slice::from_ref(race))?),
    }
    Ok(())
}
