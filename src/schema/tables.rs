//! Table schema definitions for every table whose shape does not depend on
//! the challenge description

use super::types::*;
use ColumnType::*;

// =============================================================================
// Parameters and authentication
// =============================================================================

pub static GLOBAL_PARAMETERS: TableSchema<'static> = TableSchema {
    name: "global_parameters",
    columns: &[
        Column::required("param", Varchar(64)),
        Column::required("param_value", LongVarchar),
    ],
    primary_key: &["param"],
    foreign_keys: &[],
    unique: &[],
};

pub static TOURNAMENT_PARAMETERS: TableSchema<'static> = TableSchema {
    name: "tournament_parameters",
    columns: &[
        Column::required("param", Varchar(64)),
        Column::required("param_value", LongVarchar),
        Column::required("tournament", Integer),
    ],
    primary_key: &["param", "tournament"],
    foreign_keys: &[ForeignKey::tournament(&["tournament"])],
    unique: &[],
};

pub static FLL_AUTHENTICATION: TableSchema<'static> = TableSchema {
    name: "fll_authentication",
    columns: &[
        Column::required("fll_user", Varchar(64)),
        Column::new("fll_pass", Char(32)),
        Column::required_default("num_failures", Integer, "0"),
        Column::with_default("last_failure", Timestamp, "NULL"),
    ],
    primary_key: &["fll_user"],
    foreign_keys: &[],
    unique: &[],
};

pub static AUTH_ROLES: TableSchema<'static> = TableSchema {
    name: "auth_roles",
    columns: &[
        Column::required("fll_user", Varchar(64)),
        Column::required("fll_role", Varchar(64)),
    ],
    primary_key: &["fll_user", "fll_role"],
    foreign_keys: &[ForeignKey::new(
        &["fll_user"],
        "fll_authentication",
        &["fll_user"],
    )],
    unique: &[],
};

// =============================================================================
// Tournaments and teams
// =============================================================================

pub static TOURNAMENT_LEVEL: TableSchema<'static> = TableSchema {
    name: "tournament_level",
    columns: &[
        Column::required("level_id", Identity),
        Column::required("level_name", LongVarchar),
        Column::required("next_level_id", Integer),
    ],
    primary_key: &[],
    foreign_keys: &[],
    unique: &["level_name"],
};

pub static TOURNAMENTS: TableSchema<'static> = TableSchema {
    name: "Tournaments",
    columns: &[
        Column::required("tournament_id", Identity),
        Column::required("Name", Varchar(128)),
        Column::new("Location", LongVarchar),
        Column::with_default("performance_seeding_modified", Timestamp, "NULL"),
        Column::with_default("subjective_modified", Timestamp, "NULL"),
        Column::with_default("summary_computed", Timestamp, "NULL"),
        Column::with_default("tournament_date", Date, "NULL"),
        Column::required("level_id", Integer),
    ],
    primary_key: &[],
    foreign_keys: &[ForeignKey::new(
        &["level_id"],
        "tournament_level",
        &["level_id"],
    )],
    unique: &["Name"],
};

pub static TEAMS: TableSchema<'static> = TableSchema {
    name: "Teams",
    columns: &[
        Column::required("TeamNumber", Integer),
        Column::required_default("TeamName", Varchar(255), "'<No Name>'"),
        Column::new("Organization", Varchar(255)),
    ],
    primary_key: &["TeamNumber"],
    foreign_keys: &[],
    unique: &[],
};

pub static TOURNAMENT_TEAMS: TableSchema<'static> = TableSchema {
    name: "TournamentTeams",
    columns: &[
        Column::required("TeamNumber", Integer),
        Column::required("Tournament", Integer),
        Column::required_default("event_division", Varchar(32), "'1'"),
        Column::required("judging_station", Varchar(64)),
    ],
    primary_key: &["TeamNumber", "Tournament"],
    foreign_keys: &[
        ForeignKey::team(&["TeamNumber"]),
        ForeignKey::tournament(&["Tournament"]),
    ],
    unique: &[],
};

pub static JUDGES: TableSchema<'static> = TableSchema {
    name: "Judges",
    columns: &[
        Column::required("id", Varchar(64)),
        Column::required("category", LongVarchar),
        Column::required("Tournament", Integer),
        Column::required("station", Varchar(64)),
    ],
    primary_key: &["id", "category", "Tournament", "station"],
    foreign_keys: &[ForeignKey::tournament(&["Tournament"])],
    unique: &[],
};

// =============================================================================
// Head to head
// =============================================================================

pub static TABLENAMES: TableSchema<'static> = TableSchema {
    name: "tablenames",
    columns: &[
        Column::required("Tournament", Integer),
        Column::required("PairID", Integer),
        Column::required("SideA", Varchar(64)),
        Column::required("SideB", Varchar(64)),
    ],
    primary_key: &["Tournament", "PairID"],
    foreign_keys: &[ForeignKey::tournament(&["Tournament"])],
    unique: &[],
};

pub static TABLE_DIVISION: TableSchema<'static> = TableSchema {
    name: "table_division",
    columns: &[
        Column::required("playoff_division", Varchar(32)),
        Column::required("tournament", Integer),
        Column::required("table_id", Integer),
    ],
    primary_key: &["playoff_division", "tournament", "table_id"],
    foreign_keys: &[
        ForeignKey::tournament(&["tournament"]),
        ForeignKey::new(
            &["tournament", "table_id"],
            "tablenames",
            &["Tournament", "PairID"],
        ),
    ],
    unique: &[],
};

pub static PLAYOFF_DATA: TableSchema<'static> = TableSchema {
    name: "PlayoffData",
    columns: &[
        Column::required("event_division", Varchar(32)),
        Column::required("Tournament", Integer),
        Column::required("PlayoffRound", Integer),
        Column::required("LineNumber", Integer),
        Column::with_default("Team", Integer, "-3"),
        Column::with_default("AssignedTable", Varchar(64), "NULL"),
        Column::with_default("Printed", Boolean, "FALSE"),
        Column::required("run_number", Integer),
    ],
    primary_key: &["event_division", "Tournament", "PlayoffRound", "LineNumber"],
    foreign_keys: &[
        ForeignKey::team(&["Team"]),
        ForeignKey::tournament(&["Tournament"]),
    ],
    unique: &[],
};

pub static PLAYOFF_BRACKET_TEAMS: TableSchema<'static> = TableSchema {
    name: "playoff_bracket_teams",
    columns: &[
        Column::required("tournament_id", Integer),
        Column::required("bracket_name", LongVarchar),
        Column::required("team_number", Integer),
    ],
    primary_key: &["tournament_id", "bracket_name", "team_number"],
    foreign_keys: &[
        ForeignKey::tournament(&["tournament_id"]),
        ForeignKey::team(&["team_number"]),
    ],
    unique: &[],
};

pub static AUTOMATIC_FINISHED_PLAYOFF: TableSchema<'static> = TableSchema {
    name: "automatic_finished_playoff",
    columns: &[
        Column::required("tournament_id", Integer),
        Column::required("bracket_name", Varchar(64)),
    ],
    primary_key: &["tournament_id", "bracket_name"],
    foreign_keys: &[ForeignKey::tournament(&["tournament_id"])],
    unique: &[],
};

pub static PLAYOFF_SCHEDULES: TableSchema<'static> = TableSchema {
    name: "playoff_schedules",
    columns: &[
        Column::required("tournament_id", Integer),
        Column::required("bracket_name", LongVarchar),
        Column::required("start_time", Time),
        Column::required("end_time", Time),
    ],
    primary_key: &["tournament_id", "bracket_name"],
    foreign_keys: &[ForeignKey::tournament(&["tournament_id"])],
    unique: &[],
};

pub static DELAYED_PERFORMANCE: TableSchema<'static> = TableSchema {
    name: "delayed_performance",
    columns: &[
        Column::required("tournament_id", Integer),
        Column::required("run_number", Integer),
        Column::required("delayed_until", Timestamp),
    ],
    primary_key: &["tournament_id", "run_number"],
    foreign_keys: &[ForeignKey::tournament(&["tournament_id"])],
    unique: &[],
};

// =============================================================================
// Schedule
// =============================================================================

pub static SCHEDULE: TableSchema<'static> = TableSchema {
    name: "schedule",
    columns: &[
        Column::required("tournament", Integer),
        Column::required("team_number", Integer),
        Column::new("judging_station", LongVarchar),
    ],
    primary_key: &["tournament", "team_number"],
    foreign_keys: &[ForeignKey::tournament(&["tournament"])],
    unique: &[],
};

pub static SCHED_PERF_ROUNDS: TableSchema<'static> = TableSchema {
    name: "sched_perf_rounds",
    columns: &[
        Column::required("tournament", Integer),
        Column::required("team_number", Integer),
        Column::required("perf_time", Time),
        Column::required("table_color", LongVarchar),
        Column::required("table_side", Integer),
        Column::required_default("practice", Boolean, "FALSE"),
    ],
    primary_key: &["tournament", "team_number", "perf_time"],
    foreign_keys: &[ForeignKey::new(
        &["tournament", "team_number"],
        "schedule",
        &["tournament", "team_number"],
    )],
    unique: &[],
};

pub static SCHED_SUBJECTIVE: TableSchema<'static> = TableSchema {
    name: "sched_subjective",
    columns: &[
        Column::required("tournament", Integer),
        Column::required("team_number", Integer),
        Column::required("name", LongVarchar),
        Column::required("subj_time", Time),
    ],
    primary_key: &["tournament", "team_number", "name"],
    foreign_keys: &[ForeignKey::new(
        &["tournament", "team_number"],
        "schedule",
        &["tournament", "team_number"],
    )],
    unique: &[],
};

pub static CATEGORY_SCHEDULE_COLUMN: TableSchema<'static> = TableSchema {
    name: "category_schedule_column",
    columns: &[
        Column::required("tournament", Integer),
        Column::required("category", LongVarchar),
        Column::required("schedule_column", LongVarchar),
    ],
    primary_key: &["tournament", "category"],
    foreign_keys: &[ForeignKey::tournament(&["tournament"])],
    unique: &[],
};

// =============================================================================
// Finalists and nominees
// =============================================================================

pub static FINALIST_CATEGORIES: TableSchema<'static> = TableSchema {
    name: "finalist_categories",
    columns: &[
        Column::required("tournament", Integer),
        Column::required("category", LongVarchar),
        Column::required("division", Varchar(32)),
        Column::with_default("room", Varchar(32), "NULL"),
    ],
    primary_key: &["tournament", "category", "division"],
    foreign_keys: &[ForeignKey::tournament(&["tournament"])],
    unique: &[],
};

pub static FINALIST_SCHEDULE: TableSchema<'static> = TableSchema {
    name: "finalist_schedule",
    columns: &[
        Column::required("tournament", Integer),
        Column::required("category", LongVarchar),
        Column::required("judge_time", Time),
        Column::with_default("judge_end_time", Time, "NULL"),
        Column::required("team_number", Integer),
        Column::required("division", Varchar(32)),
    ],
    primary_key: &["tournament", "category", "division", "judge_time"],
    foreign_keys: &[
        ForeignKey::tournament(&["tournament"]),
        ForeignKey::team(&["team_number"]),
        ForeignKey::new(
            &["tournament", "category", "division"],
            "finalist_categories",
            &["tournament", "category", "division"],
        ),
    ],
    unique: &[],
};

pub static FINALIST_PARAMETERS: TableSchema<'static> = TableSchema {
    name: "finalist_parameters",
    columns: &[
        Column::required("tournament_id", Integer),
        Column::required("award_group", LongVarchar),
        Column::required("start_time", Time),
        Column::required("slot_duration", Integer),
    ],
    primary_key: &["tournament_id", "award_group"],
    foreign_keys: &[ForeignKey::tournament(&["tournament_id"])],
    unique: &[],
};

pub static NON_NUMERIC_NOMINEES: TableSchema<'static> = TableSchema {
    name: "non_numeric_nominees",
    columns: &[
        Column::required("tournament", Integer),
        Column::required("category", LongVarchar),
        Column::required("team_number", Integer),
        Column::with_default("judge", Varchar(64), "NULL"),
    ],
    primary_key: &[],
    foreign_keys: &[
        ForeignKey::tournament(&["tournament"]),
        ForeignKey::team(&["team_number"]),
    ],
    unique: &[],
};

// =============================================================================
// Computed scores
// =============================================================================

pub static SUBJECTIVE_COMPUTED_SCORES: TableSchema<'static> = TableSchema {
    name: "subjective_computed_scores",
    columns: &[
        Column::required("category", LongVarchar),
        Column::required("goal_group", LongVarchar),
        Column::required("tournament", Integer),
        Column::required("team_number", Integer),
        Column::required("judge", Varchar(64)),
        Column::new("computed_total", Float),
        Column::required_default("no_show", Boolean, "FALSE"),
        Column::new("standardized_score", Float),
    ],
    primary_key: &["category", "goal_group", "tournament", "team_number", "judge"],
    foreign_keys: &[
        ForeignKey::tournament(&["tournament"]),
        ForeignKey::team(&["team_number"]),
    ],
    unique: &[],
};

pub static FINAL_SCORES: TableSchema<'static> = TableSchema {
    name: "final_scores",
    columns: &[
        Column::required("category", LongVarchar),
        Column::required("goal_group", LongVarchar),
        Column::required("tournament", Integer),
        Column::required("team_number", Integer),
        Column::new("final_score", Float),
    ],
    primary_key: &["category", "goal_group", "tournament", "team_number"],
    foreign_keys: &[
        ForeignKey::tournament(&["tournament"]),
        ForeignKey::team(&["team_number"]),
    ],
    unique: &[],
};

pub static OVERALL_SCORES: TableSchema<'static> = TableSchema {
    name: "overall_scores",
    columns: &[
        Column::required("tournament", Integer),
        Column::required("team_number", Integer),
        Column::new("overall_score", Float),
    ],
    primary_key: &["tournament", "team_number"],
    foreign_keys: &[
        ForeignKey::tournament(&["tournament"]),
        ForeignKey::team(&["team_number"]),
    ],
    unique: &[],
};

// =============================================================================
// Awards
// =============================================================================

pub static SUBJECTIVE_OVERALL_AWARD: TableSchema<'static> = TableSchema {
    name: "subjective_overall_award",
    columns: &[
        Column::required("tournament_id", Integer),
        Column::required("name", LongVarchar),
        Column::required("team_number", Integer),
        Column::new("description", LongVarchar),
        Column::required("place", Integer),
    ],
    primary_key: &["tournament_id", "name", "team_number"],
    foreign_keys: &[
        ForeignKey::tournament(&["tournament_id"]),
        ForeignKey::team(&["team_number"]),
    ],
    unique: &[],
};

pub static SUBJECTIVE_EXTRA_AWARD: TableSchema<'static> = TableSchema {
    name: "subjective_extra_award",
    columns: &[
        Column::required("tournament_id", Integer),
        Column::required("name", LongVarchar),
        Column::required("team_number", Integer),
        Column::new("description", LongVarchar),
        Column::required("award_group", LongVarchar),
        Column::required("place", Integer),
    ],
    primary_key: &["tournament_id", "name", "team_number"],
    foreign_keys: &[
        ForeignKey::tournament(&["tournament_id"]),
        ForeignKey::team(&["team_number"]),
    ],
    unique: &[],
};

pub static SUBJECTIVE_CHALLENGE_AWARD: TableSchema<'static> = TableSchema {
    name: "subjective_challenge_award",
    columns: &[
        Column::required("tournament_id", Integer),
        Column::required("name", LongVarchar),
        Column::required("team_number", Integer),
        Column::new("description", LongVarchar),
        Column::required("award_group", LongVarchar),
        Column::required("place", Integer),
    ],
    primary_key: &["tournament_id", "name", "team_number"],
    foreign_keys: &[
        ForeignKey::tournament(&["tournament_id"]),
        ForeignKey::team(&["team_number"]),
    ],
    unique: &[],
};

pub static ADVANCING_TEAMS: TableSchema<'static> = TableSchema {
    name: "advancing_teams",
    columns: &[
        Column::required("tournament_id", Integer),
        Column::required("team_number", Integer),
        Column::required("award_group", LongVarchar),
    ],
    primary_key: &["tournament_id", "team_number"],
    foreign_keys: &[
        ForeignKey::tournament(&["tournament_id"]),
        ForeignKey::team(&["team_number"]),
    ],
    unique: &[],
};

pub static AWARD_GROUP_ORDER: TableSchema<'static> = TableSchema {
    name: "award_group_order",
    columns: &[
        Column::required("tournament_id", Integer),
        Column::required("award_group", LongVarchar),
        Column::required("sort_order", Integer),
    ],
    primary_key: &["tournament_id", "award_group"],
    foreign_keys: &[ForeignKey::tournament(&["tournament_id"])],
    unique: &[],
};

pub static CATEGORIES_IGNORED: TableSchema<'static> = TableSchema {
    name: "categories_ignored",
    columns: &[
        Column::required("level_id", Integer),
        Column::required("category_identifier", LongVarchar),
        Column::required("category_type", Varchar(64)),
    ],
    primary_key: &["level_id", "category_identifier", "category_type"],
    foreign_keys: &[ForeignKey::new(
        &["level_id"],
        "tournament_level",
        &["level_id"],
    )],
    unique: &[],
};

// =============================================================================
// Awards script
// =============================================================================

/// One awards script table: a keyed value per (level, tournament, layer).
#[derive(Debug, Clone, Copy)]
pub struct AwardsScriptTable {
    pub name: &'static str,
    pub key_column: &'static str,
    pub value_column: &'static str,
    pub value_type: ColumnType,
    pub primary_key: &'static [&'static str],
    /// The value is a rank and the rows of a layer form one ordered list.
    pub ordered: bool,
}

pub static AWARDS_SCRIPT_TABLES: &[AwardsScriptTable] = &[
    AwardsScriptTable {
        name: "awards_script_text",
        key_column: "section_name",
        value_column: "text",
        value_type: LongVarchar,
        primary_key: &["section_name", "tournament_level_id", "tournament_id", "layer_rank"],
        ordered: false,
    },
    AwardsScriptTable {
        name: "awards_script_parameters",
        key_column: "param_name",
        value_column: "param_value",
        value_type: LongVarchar,
        primary_key: &["param_name", "tournament_level_id", "tournament_id", "layer_rank"],
        ordered: false,
    },
    AwardsScriptTable {
        name: "awards_script_subjective_text",
        key_column: "category_name",
        value_column: "text",
        value_type: LongVarchar,
        primary_key: &["category_name", "tournament_level_id", "tournament_id", "layer_rank"],
        ordered: false,
    },
    AwardsScriptTable {
        name: "awards_script_subjective_presenter",
        key_column: "category_name",
        value_column: "presenter",
        value_type: LongVarchar,
        primary_key: &["category_name", "tournament_level_id", "tournament_id", "layer_rank"],
        ordered: false,
    },
    AwardsScriptTable {
        name: "awards_script_nonnumeric_text",
        key_column: "category_title",
        value_column: "text",
        value_type: LongVarchar,
        primary_key: &["category_title", "tournament_level_id", "tournament_id", "layer_rank"],
        ordered: false,
    },
    AwardsScriptTable {
        name: "awards_script_nonnumeric_presenter",
        key_column: "category_title",
        value_column: "presenter",
        value_type: LongVarchar,
        primary_key: &["category_title", "tournament_level_id", "tournament_id", "layer_rank"],
        ordered: false,
    },
    AwardsScriptTable {
        name: "awards_script_award_order",
        key_column: "award",
        value_column: "award_rank",
        value_type: Integer,
        primary_key: &["award", "tournament_level_id", "tournament_id", "layer_rank"],
        ordered: true,
    },
    AwardsScriptTable {
        name: "awards_script_sponsor_order",
        key_column: "sponsor",
        value_column: "sponsor_rank",
        value_type: Integer,
        primary_key: &["sponsor", "tournament_level_id", "tournament_id", "layer_rank"],
        ordered: true,
    },
];

impl AwardsScriptTable {
    pub fn schema(&self) -> DynamicTable {
        DynamicTable {
            name: self.name.to_string(),
            columns: vec![
                Column::required("tournament_level_id", Integer),
                Column::required("tournament_id", Integer),
                Column::required("layer_rank", Integer),
                Column::required(self.key_column, Varchar(64)),
                Column::required(self.value_column, self.value_type),
            ],
            primary_key: self.primary_key,
            foreign_keys: &[],
        }
    }
}

/// Fixed tables in creation order (parents before children)
pub static FIXED_TABLES: &[&TableSchema<'static>] = &[
    &GLOBAL_PARAMETERS,
    &FLL_AUTHENTICATION,
    &AUTH_ROLES,
    &TOURNAMENT_LEVEL,
    &TOURNAMENTS,
    &TOURNAMENT_PARAMETERS,
    &TEAMS,
    &TABLENAMES,
    &TABLE_DIVISION,
    &PLAYOFF_DATA,
    &PLAYOFF_BRACKET_TEAMS,
    &AUTOMATIC_FINISHED_PLAYOFF,
    &TOURNAMENT_TEAMS,
    &SCHEDULE,
    &SCHED_PERF_ROUNDS,
    &SCHED_SUBJECTIVE,
    &CATEGORY_SCHEDULE_COLUMN,
    &NON_NUMERIC_NOMINEES,
    &FINALIST_CATEGORIES,
    &FINALIST_SCHEDULE,
    &JUDGES,
    &SUBJECTIVE_COMPUTED_SCORES,
    &FINAL_SCORES,
    &OVERALL_SCORES,
    &SUBJECTIVE_OVERALL_AWARD,
    &SUBJECTIVE_EXTRA_AWARD,
    &SUBJECTIVE_CHALLENGE_AWARD,
    &ADVANCING_TEAMS,
    &AWARD_GROUP_ORDER,
    &DELAYED_PERFORMANCE,
    &PLAYOFF_SCHEDULES,
    &FINALIST_PARAMETERS,
    &CATEGORIES_IGNORED,
];
