pub mod challenge;
pub mod cli;
pub mod dump;
pub mod error;
pub mod import;
pub mod params;
pub mod queries;
pub mod schema;
pub mod scores;
pub mod upgrade;
pub mod writer;

pub use challenge::{parse_challenge, ChallengeDescription};
pub use cli::{Cli, Commands};
pub use dump::{dump_database, dump_database_to_file, load_database_dump, load_dump_reader, ImportResult};
pub use error::MigrationError;
pub use import::{check_for_differences, import_database, load_from_dump_into_new_db, ImportOptions};
pub use params::Parameters;
pub use upgrade::upgrade_database;
pub use writer::generate_db;
