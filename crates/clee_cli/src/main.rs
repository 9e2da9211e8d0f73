//! `clee` command-line entry point.
//!
//! # Responsibility
//! - Parse commands and global flags, load configuration, start logging.
//! - Wire SQLite repositories into core services and print their output.
//!
//! # Invariants
//! - Every failure surfaces as one line on stderr and a non-zero exit code.

mod config;
mod prompt;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use clee_core::model::sign::parse_sign_name;
use clee_core::{
    init_logging, open_db, CommentRequest, CommentService, DescribeService, FactRepository,
    RenderOptions, SqliteCommentRepository, SqliteFactRepository, SqliteSignRepository,
};
use config::{AppConfig, Overrides};
use log::{error, info};
use prompt::{ask_grep_choice, highlighter, TerminalConfirmer};
use rusqlite::Connection;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "clee")]
#[command(about = "Command-line environment for tablet transliterations", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Data directory (default: ~/.clee)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Database file (default: <data-dir>/grist.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log level: trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Show full span identifiers in the line column
    #[arg(long, global = true)]
    show_identifiers: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print summary information about an identifier or a sign
    Describe {
        #[arg(required = true)]
        target: Vec<String>,
    },
    /// Page through every text attesting a sign, with the sign highlighted
    Grep { sign: String },
    /// Add a comment and link it to objects and signs
    Comment {
        #[arg(required = true)]
        text: Vec<String>,

        /// Object identifiers to link in addition to those found in the text
        #[arg(short = 'u', long = "uid", num_args = 1..)]
        uids: Vec<String>,

        /// Sign names to link in addition to those found in the text
        #[arg(short = 's', long = "sign", num_args = 1..)]
        signs: Vec<String>,
    },
    /// List sign names used on tokens that are missing from the signlist
    Errors,
    /// Print the raw ATF for an identifier
    Atf { uid: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=command module=cli status=error error={err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(&Overrides {
        data_dir: cli.data_dir,
        db_path: cli.db,
        log_level: cli.log_level,
        show_identifiers: cli.show_identifiers,
    })?;
    start_logging(&config);

    if let Commands::Atf { uid } = &cli.command {
        print_atf(&config, uid)?;
        return Ok(());
    }

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create `{}`", parent.display()))?;
    }
    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open `{}`", config.db_path.display()))?;
    let options = RenderOptions {
        hide_identifier_detail: config.hide_identifier_detail,
        ..RenderOptions::default()
    };

    match cli.command {
        Commands::Describe { target } => {
            info!("event=command module=cli status=start command=describe");
            let service = describe_service(&conn)?;
            print_lines(service.describe(&target.join(" "), &options)?);
        }
        Commands::Grep { sign } => {
            info!("event=command module=cli status=start command=grep");
            grep(&conn, &sign, options)?;
        }
        Commands::Comment { text, uids, signs } => {
            info!("event=command module=cli status=start command=comment");
            add_comment(&conn, text.join(" "), uids, signs)?;
        }
        Commands::Errors => {
            info!("event=command module=cli status=start command=errors");
            print_lines(describe_service(&conn)?.errors_report()?);
        }
        Commands::Atf { .. } => {}
    }
    Ok(())
}

fn start_logging(config: &AppConfig) {
    let log_dir = if config.log_dir.is_absolute() {
        config.log_dir.clone()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(&config.log_dir),
            Err(err) => {
                eprintln!("warning: logging disabled: {err}");
                return;
            }
        }
    };
    if let Err(err) = init_logging(&config.log_level, &log_dir) {
        eprintln!("warning: logging disabled: {err}");
    }
}

type SqliteDescribeService<'conn> = DescribeService<
    SqliteFactRepository<'conn>,
    SqliteSignRepository<'conn>,
    SqliteCommentRepository<'conn>,
>;

fn describe_service(conn: &Connection) -> Result<SqliteDescribeService<'_>> {
    Ok(DescribeService::new(
        SqliteFactRepository::new(conn),
        SqliteSignRepository::new(conn),
        SqliteCommentRepository::try_new(conn)?,
    ))
}

fn grep(conn: &Connection, pattern: &str, options: RenderOptions<'_>) -> Result<()> {
    let sign = parse_sign_name(pattern).ok_or_else(|| anyhow!("'{pattern}' is not a sign name"))?;
    let service = describe_service(conn)?;
    let Some(texts) = service.sign_attestations(&sign)? else {
        println!("{sign} is not in the signlist.");
        return Ok(());
    };
    if texts.is_empty() {
        println!("{sign} is not attested in any text.");
        return Ok(());
    }

    let highlight = highlighter(&sign);
    let options = RenderOptions {
        decorator: Some(&highlight),
        ..options
    };
    let mut index = Some(0);
    while let Some(current) = index {
        print_lines(service.describe_object(&texts[current].tablet, &options)?);
        index = ask_grep_choice(texts.len()).apply(current, texts.len());
    }
    Ok(())
}

fn add_comment(
    conn: &Connection,
    body: String,
    explicit_objects: Vec<String>,
    explicit_signs: Vec<String>,
) -> Result<()> {
    let service = CommentService::new(
        SqliteFactRepository::new(conn),
        SqliteSignRepository::new(conn),
        SqliteCommentRepository::try_new(conn)?,
    );
    let request = CommentRequest {
        body,
        explicit_objects,
        explicit_signs,
    };

    let outcome = service
        .add_comment(&request, &mut TerminalConfirmer)
        .map_err(|err| anyhow!("{err}; comment not recorded"))?;
    let id = outcome.comment_id;
    println!("Inserted comment with CommentID = {id}");
    for uid in &outcome.links.object_uids {
        println!("Linked comment {id} to object {uid}");
    }
    for sign_id in &outcome.links.sign_ids {
        println!("Linked comment {id} to sign {sign_id}");
    }
    Ok(())
}

fn print_atf(config: &AppConfig, input: &str) -> Result<()> {
    let uid = canonical_atf_uid(config, input)?;
    let Some(path) = config.atf_path(&uid) else {
        return Err(anyhow!("'{input}' is not an identifier"));
    };
    match std::fs::read_to_string(path) {
        Ok(atf) => println!("{atf}"),
        Err(_) => println!("Could not find ATF file for {uid}"),
    }
    Ok(())
}

/// Stored casing of `input` when the database knows it, else `input` as typed.
fn canonical_atf_uid(config: &AppConfig, input: &str) -> Result<String> {
    if !config.db_path.is_file() {
        return Ok(input.to_string());
    }
    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open `{}`", config.db_path.display()))?;
    let canonical = SqliteFactRepository::new(&conn).canonical_uid(input)?;
    Ok(canonical.unwrap_or_else(|| input.to_string()))
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}
