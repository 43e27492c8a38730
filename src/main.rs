use anyhow::{Context, Result};
use banco_alimentos::{
    import_beneficiarios, init_tracing, load_csv, AppConfig, Beneficiario, Database,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Beneficiary registry maintenance
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// SQLite database file (defaults to BANCO_DATABASE or banco_alimentos.db)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import beneficiaries from a CSV file
    Import {
        /// CSV with a header row (nome,cpf,dataNascimento,...)
        csv: PathBuf,
    },
    /// List every beneficiary
    List,
    /// Show one beneficiary as JSON
    Show { id: i64 },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(database) = cli.database {
        config.database_path = database;
    }

    init_tracing(&config.log_level).context("Failed to initialise logging")?;

    let db = Database::open(&config.database_path).with_context(|| {
        format!("Failed to open database at {}", config.database_path.display())
    })?;

    match cli.command {
        Command::Import { csv } => run_import(&db, &csv),
        Command::List => run_list(&db),
        Command::Show { id } => run_show(&db, id),
    }
}

fn run_import(db: &Database, csv: &Path) -> Result<()> {
    println!("📂 Loading {}...", csv.display());
    let rows = load_csv(csv)?;
    println!("✓ Loaded {} beneficiarios from CSV", rows.len());

    let summary = import_beneficiarios(db, rows, Utc::now().date_naive())?;

    println!("✓ Inserted: {}", summary.inserted);
    println!("✓ Skipped duplicates: {}", summary.skipped_duplicates);
    for (line, reason) in &summary.rejected {
        println!("✗ Line {}: {}", line, reason);
    }
    println!("✓ Beneficiarios in database: {}", db.context().count()?);

    Ok(())
}

fn run_list(db: &Database) -> Result<()> {
    let all = db.context().to_list()?;

    println!("{:>6}  {:<11}  {:<9}  {:<8}  {}", "ID", "CPF", "CESTA", "SITUACAO", "NOME");
    for b in &all {
        print_row(b);
    }
    println!("\n{} beneficiarios", all.len());

    Ok(())
}

fn print_row(b: &Beneficiario) {
    println!(
        "{:>6}  {:<11}  {:<9}  {:<8}  {}",
        b.id, b.cpf, b.tipo_cesta, b.situacao, b.nome
    );
    let endereco = b.endereco();
    if !endereco.is_empty() {
        println!("{:>6}  {}", "", endereco);
    }
}

fn run_show(db: &Database, id: i64) -> Result<()> {
    match db.context().find(id)? {
        Some(b) => {
            println!("{}", serde_json::to_string_pretty(&b)?);
            Ok(())
        }
        None => {
            eprintln!("❌ Beneficiario {} not found", id);
            std::process::exit(1);
        }
    }
}
