use anyhow::{Context, Result};
use fll_migrate::{
    cli::{Cli, Commands},
    dump::{dump_database_to_file, load_database_dump},
    import::{
        check_for_differences, ensure_tournament, import_all_tournaments, import_database,
        load_from_dump_into_new_db, ImportOptions,
    },
    params::Parameters,
    parse_challenge,
    queries::find_tournament_by_name,
    upgrade::upgrade_database,
    writer::generate_db,
};
use rusqlite::Connection;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn open_new_db(path: &Path, force: bool) -> Result<Connection> {
    if path.exists() {
        if !force {
            anyhow::bail!("{:?} already exists, use --force to replace it", path);
        }
        fs::remove_file(path).with_context(|| format!("Failed to remove {:?}", path))?;
    }
    Connection::open(path).with_context(|| format!("Failed to create database: {:?}", path))
}

fn open_existing_db(path: &Path) -> Result<Connection> {
    if !path.exists() {
        anyhow::bail!("Database {:?} does not exist", path);
    }
    Connection::open(path).with_context(|| format!("Failed to open database: {:?}", path))
}

/// Load a dump into an in-memory store.
fn load_scratch(dump: &Path) -> Result<Connection> {
    let mut scratch = Connection::open_in_memory()?;
    let result = load_database_dump(dump, &mut scratch)?;
    if result.has_bugs {
        warn!("Dump contains bug reports, see {:?}", result.import_directory);
    }
    Ok(scratch)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse_args();

    match cli.command {
        Commands::Create {
            challenge,
            output_db,
            force,
        } => {
            let xml = fs::read_to_string(&challenge)
                .with_context(|| format!("Failed to read {:?}", challenge))?;
            let description = parse_challenge(&xml)?;
            let mut conn = open_new_db(&output_db, force)?;
            generate_db(&mut conn, &description)?;
            println!("Created {:?} for challenge {:?}", output_db, description.title);
        }

        Commands::Upgrade { database } => {
            let mut conn = open_existing_db(&database)?;
            let params = Parameters::new(&conn);
            let before = params.database_version()?;
            let description = params.challenge_description()?;
            upgrade_database(&mut conn, &description)?;
            println!(
                "Upgraded {:?} from version {} to {}",
                database,
                before,
                Parameters::new(&conn).database_version()?
            );
        }

        Commands::Load {
            dump,
            output_db,
            force,
        } => {
            let start = Instant::now();
            let file = File::open(&dump).with_context(|| format!("Failed to open {:?}", dump))?;
            let mut conn = open_new_db(&output_db, force)?;
            let result = load_from_dump_into_new_db(BufReader::new(file), &mut conn)?;
            if result.has_bugs {
                warn!("Dump contains bug reports, see {:?}", result.import_directory);
            }
            println!(
                "Created {:?} from {:?} in {:.1}s",
                output_db,
                dump,
                start.elapsed().as_secs_f64()
            );
        }

        Commands::Dump { database, output } => {
            let conn = open_existing_db(&database)?;
            dump_database_to_file(&conn, &output)?;
            println!("Dumped {:?} to {:?}", database, output);
        }

        Commands::Import {
            dump,
            database,
            tournament,
            skip_performance,
            skip_subjective,
            skip_finalist,
            skip_awards_script,
            force,
        } => {
            let source = load_scratch(&dump)?;
            let mut dest = open_existing_db(&database)?;
            let options = ImportOptions {
                performance: !skip_performance,
                subjective: !skip_subjective,
                finalist_schedule: !skip_finalist,
                awards_script: !skip_awards_script,
            };

            let tx = dest.transaction()?;
            match tournament {
                Some(name) => {
                    let source_tournament = find_tournament_by_name(&source, &name)?
                        .ok_or_else(|| fll_migrate::MigrationError::UnknownTournament(name.clone()))?;
                    ensure_tournament(&source, &tx, &source_tournament)?;
                    let report = check_for_differences(&source, &tx, &name)?;
                    if report.has_differences() && !force {
                        anyhow::bail!(
                            "Tournament {} differs between the dump and the database, run check for details or use --force",
                            name
                        );
                    }
                    import_database(&source, &tx, &name, &options)?;
                    println!("Imported tournament {}", name);
                }
                None => {
                    let imported = import_all_tournaments(&source, &tx, &options)?;
                    println!("Imported {} tournaments", imported.len());
                }
            }
            tx.commit()?;
        }

        Commands::Check {
            dump,
            database,
            tournament,
            json,
        } => {
            let source = load_scratch(&dump)?;
            let dest = open_existing_db(&database)?;
            let report = check_for_differences(&source, &dest, &tournament)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if !report.has_differences() && report.awards_script_differences.is_empty() {
                println!("No differences found for {}", tournament);
            } else {
                if report.missing_in_source {
                    println!("Tournament {} is missing from the dump", tournament);
                }
                if report.missing_in_dest {
                    println!("Tournament {} is missing from the database", tournament);
                }
                for team in &report.missing_teams {
                    println!("Team {} is missing from the database", team.number);
                }
                for diff in &report.team_differences {
                    println!(
                        "Team {} {}: dump {:?}, database {:?}",
                        diff.team_number, diff.property, diff.source_value, diff.dest_value
                    );
                }
                for diff in &report.awards_script_differences {
                    println!("Awards script {}", diff);
                }
            }
        }

        Commands::Version { database } => {
            let conn = open_existing_db(&database)?;
            println!("{}", Parameters::new(&conn).database_version()?);
        }
    }

    Ok(())
}
