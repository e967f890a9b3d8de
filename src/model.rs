use std::collections::{BTreeSet, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const FIRST_GAMEWEEK: u8 = 1;
pub const LAST_GAMEWEEK: u8 = 38;
pub const SQUAD_SIZE: usize = 15;
pub const STARTING_SLOTS: u8 = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
}

impl Position {
    pub const ALL: [Position; 4] = [
        Position::Goalkeeper,
        Position::Defender,
        Position::Midfielder,
        Position::Forward,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Position::Goalkeeper => "GKP",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
        }
    }
}

impl TryFrom<u8> for Position {
    type Error = String;

    fn try_from(element_type: u8) -> Result<Self, Self::Error> {
        match element_type {
            1 => Ok(Position::Goalkeeper),
            2 => Ok(Position::Defender),
            3 => Ok(Position::Midfielder),
            4 => Ok(Position::Forward),
            other => Err(format!("unknown element_type {other}")),
        }
    }
}

impl From<Position> for u8 {
    fn from(position: Position) -> Self {
        match position {
            Position::Goalkeeper => 1,
            Position::Defender => 2,
            Position::Midfielder => 3,
            Position::Forward => 4,
        }
    }
}

/// Availability flag as published upstream (`a`, `d`, `i`, `s`, `u`, `n`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PlayerStatus {
    Fit,
    Doubtful,
    Injured,
    Suspended,
    #[default]
    Unknown,
}

impl PlayerStatus {
    pub fn code(&self) -> &'static str {
        match self {
            PlayerStatus::Fit => "a",
            PlayerStatus::Doubtful => "d",
            PlayerStatus::Injured => "i",
            PlayerStatus::Suspended => "s",
            PlayerStatus::Unknown => "u",
        }
    }
}

impl From<String> for PlayerStatus {
    fn from(raw: String) -> Self {
        match raw.trim() {
            "a" => PlayerStatus::Fit,
            "d" => PlayerStatus::Doubtful,
            "i" => PlayerStatus::Injured,
            "s" => PlayerStatus::Suspended,
            _ => PlayerStatus::Unknown,
        }
    }
}

impl From<PlayerStatus> for String {
    fn from(status: PlayerStatus) -> Self {
        status.code().to_string()
    }
}

/// One `elements[]` entry of the bootstrap snapshot. Numeric fields the
/// upstream encodes as strings stay strings here and are parsed in `enrich`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPlayer {
    pub id: u32,
    #[serde(default, deserialize_with = "string_or_default")]
    pub web_name: String,
    #[serde(default, deserialize_with = "string_or_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "string_or_default")]
    pub second_name: String,
    pub team: u32,
    /// Raw position code. Codes outside 1..=4 (e.g. the 5 upstream uses
    /// for managers) have no `Position`.
    #[serde(default)]
    pub element_type: u8,
    #[serde(default)]
    pub status: PlayerStatus,
    #[serde(default)]
    pub now_cost: u16,
    #[serde(default)]
    pub total_points: i32,
    #[serde(default)]
    pub minutes: u32,
    #[serde(default, deserialize_with = "string_or_default")]
    pub form: String,
    #[serde(default, deserialize_with = "string_or_default")]
    pub selected_by_percent: String,
    #[serde(default, deserialize_with = "string_or_default")]
    pub ep_next: String,
    #[serde(default, deserialize_with = "string_or_default")]
    pub points_per_game: String,
    #[serde(default, deserialize_with = "string_or_default")]
    pub expected_goal_involvements: String,
    #[serde(default)]
    pub transfers_in_event: i64,
    #[serde(default)]
    pub transfers_out_event: i64,
    #[serde(default)]
    pub chance_of_playing_next_round: Option<u8>,
    #[serde(default)]
    pub penalties_order: Option<u8>,
    #[serde(default)]
    pub direct_freekicks_order: Option<u8>,
    #[serde(default)]
    pub corners_and_indirect_freekicks_order: Option<u8>,
    #[serde(default, deserialize_with = "string_or_default")]
    pub news: String,
}

impl RawPlayer {
    pub fn position(&self) -> Option<Position> {
        Position::try_from(self.element_type).ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: u32,
    #[serde(default, deserialize_with = "string_or_default")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_default")]
    pub short_name: String,
    #[serde(default)]
    pub strength: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gameweek {
    pub id: u8,
    #[serde(default, deserialize_with = "string_or_default")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_default")]
    pub deadline_time: String,
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    pub is_next: bool,
}

impl Gameweek {
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        parse_utc(&self.deadline_time)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootstrapSnapshot {
    #[serde(rename = "elements", default, deserialize_with = "vec_or_default")]
    pub players: Vec<RawPlayer>,
    #[serde(default, deserialize_with = "vec_or_default")]
    pub teams: Vec<Team>,
    #[serde(rename = "events", default, deserialize_with = "vec_or_default")]
    pub gameweeks: Vec<Gameweek>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    pub id: u32,
    #[serde(rename = "event", default)]
    pub gameweek: Option<u8>,
    pub team_h: u32,
    pub team_a: u32,
    #[serde(default = "neutral_difficulty")]
    pub team_h_difficulty: u8,
    #[serde(default = "neutral_difficulty")]
    pub team_a_difficulty: u8,
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub team_h_score: Option<u8>,
    #[serde(default)]
    pub team_a_score: Option<u8>,
    #[serde(default, deserialize_with = "string_or_default")]
    pub kickoff_time: String,
}

/// A fixture seen from one team's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtureSide {
    pub opponent_id: u32,
    pub difficulty: u8,
    pub is_home: bool,
}

impl Fixture {
    pub fn side_for(&self, team_id: u32) -> Option<FixtureSide> {
        if self.team_h == team_id {
            Some(FixtureSide {
                opponent_id: self.team_a,
                difficulty: clamp_difficulty(self.team_h_difficulty),
                is_home: true,
            })
        } else if self.team_a == team_id {
            Some(FixtureSide {
                opponent_id: self.team_h,
                difficulty: clamp_difficulty(self.team_a_difficulty),
                is_home: false,
            })
        } else {
            None
        }
    }

    pub fn kickoff(&self) -> Option<DateTime<Utc>> {
        parse_utc(&self.kickoff_time)
    }
}

/// Every team's fixtures in `gameweek`, kickoff ordered. Teams with a blank are absent.
pub fn fixtures_by_team(fixtures: &[Fixture], gameweek: u8) -> HashMap<u32, Vec<FixtureSide>> {
    let mut matched: Vec<&Fixture> = fixtures
        .iter()
        .filter(|f| f.gameweek == Some(gameweek))
        .collect();
    matched.sort_by(|a, b| a.kickoff_time.cmp(&b.kickoff_time).then(a.id.cmp(&b.id)));

    let mut out: HashMap<u32, Vec<FixtureSide>> = HashMap::new();
    for fixture in matched {
        for team_id in [fixture.team_h, fixture.team_a] {
            if let Some(side) = fixture.side_for(team_id) {
                out.entry(team_id).or_default().push(side);
            }
        }
    }
    out
}

pub fn clamp_difficulty(raw: u8) -> u8 {
    raw.clamp(1, 5)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Chip {
    #[serde(rename = "wildcard")]
    Wildcard,
    #[serde(rename = "freehit")]
    FreeHit,
    #[serde(rename = "bboost")]
    BenchBoost,
    #[serde(rename = "3xc")]
    TripleCaptain,
}

impl Chip {
    pub const ALL: [Chip; 4] = [
        Chip::Wildcard,
        Chip::FreeHit,
        Chip::BenchBoost,
        Chip::TripleCaptain,
    ];

    pub fn from_api_name(raw: &str) -> Option<Chip> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "wildcard" => Some(Chip::Wildcard),
            "freehit" => Some(Chip::FreeHit),
            "bboost" => Some(Chip::BenchBoost),
            "3xc" => Some(Chip::TripleCaptain),
            _ => None,
        }
    }

    pub fn api_name(&self) -> &'static str {
        match self {
            Chip::Wildcard => "wildcard",
            Chip::FreeHit => "freehit",
            Chip::BenchBoost => "bboost",
            Chip::TripleCaptain => "3xc",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Chip::Wildcard => "Wildcard",
            Chip::FreeHit => "Free Hit",
            Chip::BenchBoost => "Bench Boost",
            Chip::TripleCaptain => "Triple Captain",
        }
    }
}

impl fmt::Display for Chip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipUsage {
    pub chip: Chip,
    pub gameweek: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pick {
    #[serde(rename = "element")]
    pub player_id: u32,
    #[serde(rename = "position")]
    pub slot: u8,
    #[serde(default = "default_multiplier")]
    pub multiplier: u8,
    #[serde(default)]
    pub is_captain: bool,
    #[serde(default)]
    pub is_vice_captain: bool,
}

impl Pick {
    pub fn is_starting(&self) -> bool {
        self.slot <= STARTING_SLOTS
    }
}

/// One manager's picks for one gameweek.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Squad {
    #[serde(default, deserialize_with = "vec_or_default")]
    pub picks: Vec<Pick>,
    #[serde(default, deserialize_with = "chip_or_none")]
    pub active_chip: Option<Chip>,
}

impl Squad {
    pub fn captain(&self) -> Option<u32> {
        self.picks.iter().find(|p| p.is_captain).map(|p| p.player_id)
    }

    pub fn vice_captain(&self) -> Option<u32> {
        self.picks
            .iter()
            .find(|p| p.is_vice_captain)
            .map(|p| p.player_id)
    }

    pub fn pick_for(&self, player_id: u32) -> Option<&Pick> {
        self.picks.iter().find(|p| p.player_id == player_id)
    }

    pub fn player_ids(&self) -> BTreeSet<u32> {
        self.picks.iter().map(|p| p.player_id).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameweekResult {
    #[serde(rename = "event")]
    pub gameweek: u8,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub total_points: i64,
    #[serde(default)]
    pub event_transfers: u32,
    #[serde(default)]
    pub event_transfers_cost: u32,
    #[serde(default)]
    pub points_on_bench: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawChipUsage {
    #[serde(default, deserialize_with = "string_or_default")]
    name: String,
    event: u8,
}

/// Response of `entry/{id}/history/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManagerHistory {
    #[serde(default, deserialize_with = "vec_or_default")]
    pub current: Vec<GameweekResult>,
    #[serde(default, deserialize_with = "vec_or_default")]
    chips: Vec<RawChipUsage>,
}

impl ManagerHistory {
    pub fn from_usages(current: Vec<GameweekResult>, usages: &[ChipUsage]) -> Self {
        let chips = usages
            .iter()
            .map(|usage| RawChipUsage {
                name: usage.chip.api_name().to_string(),
                event: usage.gameweek,
            })
            .collect();
        Self { current, chips }
    }

    /// Chip plays with recognised names; anything else upstream adds is skipped.
    pub fn chip_usages(&self) -> Vec<ChipUsage> {
        self.chips
            .iter()
            .filter_map(|raw| {
                Some(ChipUsage {
                    chip: Chip::from_api_name(&raw.name)?,
                    gameweek: raw.event,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueStanding {
    #[serde(rename = "entry")]
    pub manager_id: u64,
    #[serde(default, deserialize_with = "string_or_default")]
    pub entry_name: String,
    #[serde(default, deserialize_with = "string_or_default")]
    pub player_name: String,
    pub rank: u32,
    #[serde(rename = "total", default)]
    pub total_points: i64,
    #[serde(default)]
    pub event_total: i64,
}

/// Per-manager outcome of an upstream fetch. Failed entries are kept so the
/// analyzers can exclude them explicitly instead of reading them as empty.
#[derive(Debug, Clone)]
pub enum Fetched<T> {
    Loaded(T),
    Failed { reason: String },
}

impl<T> Fetched<T> {
    pub fn from_result<E: fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Fetched::Loaded(value),
            Err(err) => Fetched::Failed {
                reason: err.to_string(),
            },
        }
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            Fetched::Loaded(value) => Some(value),
            Fetched::Failed { .. } => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Fetched::Loaded(_))
    }
}

#[derive(Debug, Clone)]
pub struct RivalTeam {
    pub standing: LeagueStanding,
    /// Rival total minus user total; positive means the rival is ahead.
    pub points_gap: i64,
    pub squad: Fetched<Squad>,
}

impl RivalTeam {
    pub fn new(standing: LeagueStanding, user_total: i64, squad: Fetched<Squad>) -> Self {
        let points_gap = standing.total_points - user_total;
        Self {
            standing,
            points_gap,
            squad,
        }
    }

    pub fn manager_id(&self) -> u64 {
        self.standing.manager_id
    }
}

pub fn is_valid_gameweek(gameweek: u8) -> bool {
    (FIRST_GAMEWEEK..=LAST_GAMEWEEK).contains(&gameweek)
}

fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn neutral_difficulty() -> u8 {
    3
}

fn default_multiplier() -> u8 {
    1
}

fn vec_or_default<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    let value = Option::<Vec<T>>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

fn string_or_default<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let rendered = match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    };
    Ok(rendered)
}

fn chip_or_none<'de, D>(deserializer: D) -> std::result::Result<Option<Chip>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(Chip::from_api_name))
}
