pub mod generate;
pub mod schema_gen;

pub use generate::{
    create_dynamic_tables, create_score_views, generate_db, insert_placeholder_tournaments,
    insert_sentinel_teams,
};
pub use schema_gen::{create_table, create_views, generate_create_table};
