use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use tenantdb::admin::DirAdmin;
use tenantdb::companies::Companies;
use tenantdb::companies::Company;
use tenantdb::provision::suggest_storage_identifier;
use tenantdb::provision::ProvisionRequest;
use tenantdb::provision::Provisioner;
use tenantdb::sequences::CreateSequenceRequest;
use tenantdb::TenantProvider;
use tracing::metadata::LevelFilter;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::error::Error;
use crate::error::Result;

mod error;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
        .into()
    }
}

#[derive(Parser)]
#[command(name = "greenbook")]
#[command(propagate_version = true)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(value_enum, long, default_value = "info")]
    log_level: LogLevel,
    /// Directory holding the company registry and all company databases.
    #[arg(long, default_value = "greenbook_data")]
    data_path: PathBuf,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Manage companies.
    #[command(subcommand)]
    Company(CompanyCmd),
    /// Manage document-number sequences of the active company.
    #[command(subcommand)]
    Sequence(SequenceCmd),
}

#[derive(Subcommand)]
enum CompanyCmd {
    /// Create a new company in its own isolated database.
    Create {
        /// Human-facing company name.
        #[arg(long)]
        name: String,
        /// Database name; derived from the company name when omitted.
        /// Lowercase letters, digits and underscores only.
        #[arg(long)]
        database: Option<String>,
        /// Skip seeding the default counters and settings.
        #[arg(long)]
        no_defaults: bool,
        /// Skip the confirmation prompt.
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// List registered companies.
    List,
    /// Switch the active company.
    Use { database: String },
}

#[derive(Subcommand)]
enum SequenceCmd {
    /// Mint the next value of a sequence.
    Next { name: String },
    /// List sequence definitions.
    List,
    /// Define a new sequence.
    Create {
        name: String,
        #[arg(long, default_value_t = 0)]
        initial_value: u64,
        /// Rendering template, e.g. "INV-{value:06}".
        #[arg(long)]
        format: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(LevelFilter::from(cli.log_level))
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    match cli.cmd {
        Cmd::Company(cmd) => company(&cli.data_path, cmd),
        Cmd::Sequence(cmd) => sequence(&cli.data_path, cmd),
    }
}

fn open_registry(data_path: &Path) -> Result<Arc<Companies>> {
    let db = Arc::new(tenantdb::rocksdb::new(data_path.join("registry"))?);
    Ok(Arc::new(Companies::new(db)))
}

fn active_company(registry: &Companies) -> Result<Company> {
    registry.active()?.ok_or_else(|| {
        Error::Internal("no active company; create one with `greenbook company create`".to_string())
    })
}

fn open_active(data_path: &Path) -> Result<TenantProvider> {
    let registry = open_registry(data_path)?;
    let company = active_company(&registry)?;
    Ok(tenantdb::open_company(data_path, &company.storage_identifier)?)
}

fn company(data_path: &Path, cmd: CompanyCmd) -> Result<()> {
    let registry = open_registry(data_path)?;

    match cmd {
        CompanyCmd::Create {
            name,
            database,
            no_defaults,
            yes,
        } => {
            let storage_identifier =
                database.unwrap_or_else(|| suggest_storage_identifier(&name));

            println!("New company setup");
            println!(
                "A new, separate database will be created to store all data for this \
                 company, ensuring complete data isolation.\n"
            );
            println!("  Company display name: {name}");
            println!("  Database name:        {storage_identifier}");
            println!(
                "  Load default counters and settings: {}\n",
                if no_defaults { "No" } else { "Yes" }
            );

            if !yes && !confirm("Proceed?")? {
                println!("Aborted, nothing was created.");
                return Ok(());
            }

            let admin = Arc::new(DirAdmin::new(data_path.join("companies"))?);
            let provisioner = Provisioner::new(registry, admin);
            let tenant = provisioner.provision(ProvisionRequest {
                display_name: name,
                storage_identifier,
                seed_with_defaults: !no_defaults,
            })?;

            println!(
                "Company {:?} is ready. Reopen the application to switch to {:?}.",
                tenant.company.display_name, tenant.company.storage_identifier
            );
        }
        CompanyCmd::List => {
            let active = registry.active()?;
            for company in registry.list()?.data {
                let marker = match &active {
                    Some(a) if a.id == company.id => "*",
                    _ => " ",
                };
                println!(
                    "{marker} {:>4}  {:<24}  {}",
                    company.id, company.storage_identifier, company.display_name
                );
            }
        }
        CompanyCmd::Use { database } => {
            let company = registry.get_by_storage_identifier(&database)?;
            registry.set_active(company.id)?;
            println!(
                "Active company is now {:?} ({}).",
                company.display_name, company.storage_identifier
            );
        }
    }

    Ok(())
}

fn sequence(data_path: &Path, cmd: SequenceCmd) -> Result<()> {
    let provider = open_active(data_path)?;

    match cmd {
        SequenceCmd::Next { name } => {
            println!("{}", provider.sequences.next_value(&name)?);
        }
        SequenceCmd::List => {
            for seq in provider.sequences.list()?.data {
                println!(
                    "{:<24}  {:>12}  {}",
                    seq.name,
                    seq.current_value,
                    seq.format_template.as_deref().unwrap_or("-")
                );
            }
        }
        SequenceCmd::Create {
            name,
            initial_value,
            format,
        } => {
            let seq = provider.sequences.create(CreateSequenceRequest {
                name,
                initial_value,
                format_template: format,
            })?;
            println!("Defined sequence {:?} at {}.", seq.name, seq.current_value);
        }
    }

    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N]: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}
