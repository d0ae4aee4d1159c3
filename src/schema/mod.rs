pub mod goals;
pub mod tables;
pub mod types;

pub use goals::*;
pub use types::*;

/// Schema version produced by this crate
pub const CURRENT_VERSION: i64 = 32;

pub const INTERNAL_TOURNAMENT_ID: i64 = -1;
pub const INTERNAL_TOURNAMENT_NAME: &str = "__INTERNAL__";
pub const INTERNAL_TOURNAMENT_LEVEL_ID: i64 = -1;
pub const INTERNAL_TOURNAMENT_LEVEL_NAME: &str = "__INTERNAL__";
pub const NO_NEXT_LEVEL_ID: i64 = -1;
pub const DEFAULT_TOURNAMENT_LEVEL_NAME: &str = "Level I";

pub const DUMMY_TOURNAMENT_NAME: &str = "DUMMY";
pub const DROP_TOURNAMENT_NAME: &str = "DROP";

pub const DEFAULT_TEAM_NAME: &str = "<No Name>";
pub const DEFAULT_TEAM_DIVISION: &str = "1";

/// Placeholder team for a bracket slot that advances automatically
pub const BYE_TEAM_NUMBER: i64 = -1;
/// Placeholder team for a tied bracket slot
pub const TIE_TEAM_NUMBER: i64 = -2;
/// Placeholder team for an unfilled bracket slot
pub const NULL_TEAM_NUMBER: i64 = -3;
pub const INTERNAL_TEAM_ORGANIZATION: &str = "INTERNAL";

/// Sentinel teams are never real competitors.
pub fn is_internal_team(team_number: i64) -> bool {
    team_number < 0
}
