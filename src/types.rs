use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, sync::Arc};

// ── Constants ──────────────────────────────────────────────────────────

pub const SEEDING_SCALE_PREFIX: &str = "SCALE.SEEDING";
pub const PUBLISH_STATUS_ITEM: &str = "PUBLISH.STATUS";
pub const PUBLIC_PUBLISH_KEY: &str = "PUBLIC";
pub const SIGN_IN_STATUS_ITEM: &str = "PARTICIPANT.SIGN_IN_STATUS";
pub const SIGNED_IN: &str = "SIGNED_IN";
pub const SIGNED_OUT: &str = "SIGNED_OUT";
pub const FLIGHT_PROFILE_EXTENSION: &str = "flightProfile";
pub const UNGROUPED: &str = "UNGROUPED";
pub const UNPAIRED: &str = "UNPAIRED";
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:17900";

// ── Shared state type aliases ──────────────────────────────────────────

pub type SharedTournament = Arc<Tournament>;

// ── Enumerations ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantType {
    Individual,
    Pair,
    Team,
    Group,
}

impl ParticipantType {
    pub fn is_composite(self) -> bool {
        !matches!(self, ParticipantType::Individual)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchUpType {
    #[default]
    Singles,
    Doubles,
    Team,
}

impl MatchUpType {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchUpType::Singles => "SINGLES",
            MatchUpType::Doubles => "DOUBLES",
            MatchUpType::Team => "TEAM",
        }
    }

    /// Whether a relevant participant of `participant_type` takes part in a
    /// matchUp of this type at its own granularity.
    pub fn accepts(self, participant_type: ParticipantType) -> bool {
        match self {
            MatchUpType::Singles => participant_type == ParticipantType::Individual,
            MatchUpType::Doubles => matches!(
                participant_type,
                ParticipantType::Individual | ParticipantType::Pair
            ),
            MatchUpType::Team => participant_type == ParticipantType::Team,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    #[default]
    Main,
    Qualifying,
    Consolation,
    PlayOff,
    VoluntaryConsolation,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Main => "MAIN",
            Stage::Qualifying => "QUALIFYING",
            Stage::Consolation => "CONSOLATION",
            Stage::PlayOff => "PLAY_OFF",
            Stage::VoluntaryConsolation => "VOLUNTARY_CONSOLATION",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchUpStatus {
    Abandoned,
    AwaitingResult,
    Bye,
    Cancelled,
    Completed,
    DeadRubber,
    Defaulted,
    DoubleDefault,
    DoubleWalkover,
    InProgress,
    Incomplete,
    NotPlayed,
    Retired,
    Suspended,
    #[default]
    ToBePlayed,
    Walkover,
}

impl MatchUpStatus {
    pub fn is_walkover(self) -> bool {
        matches!(self, MatchUpStatus::Walkover | MatchUpStatus::DoubleWalkover)
    }

    pub fn is_default(self) -> bool {
        matches!(self, MatchUpStatus::Defaulted | MatchUpStatus::DoubleDefault)
    }
}

// ── Participants ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeItem {
    pub item_type: String,
    #[serde(default)]
    pub item_value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Extension {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub participant_id: String,
    pub participant_type: ParticipantType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_role: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participant_role_responsibilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub individual_participant_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person: Option<Person>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_items: Vec<TimeItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<Extension>,
}

impl Participant {
    /// Latest time item of the given type; later items supersede earlier ones.
    pub fn latest_time_item(&self, item_type: &str) -> Option<&TimeItem> {
        self.time_items.iter().rev().find(|item| item.item_type == item_type)
    }

    pub fn sign_in_status(&self) -> &str {
        self.latest_time_item(SIGN_IN_STATUS_ITEM)
            .and_then(|item| item.item_value.as_str())
            .filter(|status| *status == SIGNED_IN)
            .unwrap_or(SIGNED_OUT)
    }
}

// ── Events and entries ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_category_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    #[serde(default)]
    pub participant_id: Option<String>,
    #[serde(default)]
    pub entry_status: Option<String>,
    #[serde(default)]
    pub entry_stage: Option<Stage>,
    #[serde(default)]
    pub entry_position: Option<u32>,
    #[serde(default)]
    pub extensions: Vec<Extension>,
}

impl Entry {
    /// Entries of pairs/teams still being assembled never count as draw participation.
    pub fn is_grouping_pending(&self) -> bool {
        matches!(self.entry_status.as_deref(), Some(UNGROUPED) | Some(UNPAIRED))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SeedingPublishState {
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub seeding_scale_names: Option<Vec<String>>,
    #[serde(default)]
    pub stage_seeding_scale_names: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PublishState {
    #[serde(default)]
    pub draw_ids: Option<Vec<String>>,
    #[serde(default)]
    pub seeding: Option<SeedingPublishState>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub draw_id: String,
    #[serde(default)]
    pub draw_name: Option<String>,
    #[serde(default)]
    pub flight_number: Option<u32>,
    #[serde(default)]
    pub draw_entries: Vec<Entry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FlightProfile {
    #[serde(default)]
    pub flights: Vec<Flight>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_id: String,
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub event_type: MatchUpType,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub draw_definitions: Vec<DrawDefinition>,
    #[serde(default)]
    pub time_items: Vec<TimeItem>,
    #[serde(default)]
    pub extensions: Vec<Extension>,
}

impl Event {
    /// Public publish state from the latest `PUBLISH.STATUS` time item.
    pub fn publish_state(&self) -> Option<PublishState> {
        let item = self
            .time_items
            .iter()
            .rev()
            .find(|item| item.item_type == PUBLISH_STATUS_ITEM)?;
        let public = item.item_value.get(PUBLIC_PUBLISH_KEY)?;
        serde_json::from_value(public.clone()).ok()
    }

    pub fn flight_profile(&self) -> Option<FlightProfile> {
        let extension = self
            .extensions
            .iter()
            .find(|extension| extension.name == FLIGHT_PROFILE_EXTENSION)?;
        serde_json::from_value(extension.value.clone()).ok()
    }

    pub fn draw_definition(&self, draw_id: &str) -> Option<&DrawDefinition> {
        self.draw_definitions.iter().find(|draw| draw.draw_id == draw_id)
    }
}

// ── Draws and structures ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PositionAssignment {
    pub draw_position: u32,
    #[serde(default)]
    pub participant_id: Option<String>,
    #[serde(default)]
    pub bye: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StructureSeedAssignment {
    pub seed_number: u32,
    #[serde(default)]
    pub seed_value: Option<Value>,
    #[serde(default)]
    pub participant_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Structure {
    pub structure_id: String,
    #[serde(default)]
    pub structure_name: Option<String>,
    #[serde(default)]
    pub stage: Stage,
    #[serde(default)]
    pub stage_sequence: Option<u32>,
    #[serde(default)]
    pub position_assignments: Vec<PositionAssignment>,
    #[serde(default)]
    pub seed_assignments: Vec<StructureSeedAssignment>,
    #[serde(default)]
    pub match_ups: Vec<MatchUp>,
    #[serde(default)]
    pub structures: Vec<Structure>,
}

impl Structure {
    /// Position assignments of this structure and any nested groups.
    pub fn all_position_assignments(&self) -> Vec<&PositionAssignment> {
        let mut out: Vec<&PositionAssignment> = self.position_assignments.iter().collect();
        for child in &self.structures {
            out.extend(child.all_position_assignments());
        }
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DrawDefinition {
    pub draw_id: String,
    #[serde(default)]
    pub draw_name: Option<String>,
    #[serde(default)]
    pub draw_type: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub structures: Vec<Structure>,
}

// ── MatchUps ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Side {
    pub side_number: u8,
    #[serde(default)]
    pub participant_id: Option<String>,
    #[serde(default)]
    pub individual_participant_ids: Vec<String>,
    #[serde(default)]
    pub draw_position: Option<u32>,
    #[serde(default)]
    pub bye: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    #[serde(default)]
    pub score_string_side1: Option<String>,
    #[serde(default)]
    pub score_string_side2: Option<String>,
}

impl Score {
    pub fn has_value(&self) -> bool {
        [&self.score_string_side1, &self.score_string_side2]
            .iter()
            .any(|value| value.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false))
    }

    pub fn for_side(&self, side_number: u8) -> Option<String> {
        match side_number {
            1 => self.score_string_side1.clone(),
            2 => self.score_string_side2.clone(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinishingPositionRange {
    pub winner: [u32; 2],
    pub loser: [u32; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MatchUpSchedule {
    #[serde(default)]
    pub scheduled_date: Option<String>,
    #[serde(default)]
    pub scheduled_time: Option<String>,
    #[serde(default)]
    pub time_after_recovery: Option<String>,
    #[serde(default)]
    pub type_change_time_after_recovery: Option<String>,
    #[serde(default)]
    pub court_id: Option<String>,
    #[serde(default)]
    pub venue_id: Option<String>,
}

impl MatchUpSchedule {
    pub fn is_scheduled(&self) -> bool {
        self.scheduled_date.is_some() || self.scheduled_time.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchUp {
    pub match_up_id: String,
    #[serde(default)]
    pub match_up_type: Option<MatchUpType>,
    #[serde(default)]
    pub match_up_status: MatchUpStatus,
    #[serde(default)]
    pub round_number: Option<u32>,
    #[serde(default)]
    pub round_position: Option<u32>,
    #[serde(default)]
    pub draw_positions: Vec<Option<u32>>,
    #[serde(default)]
    pub sides: Vec<Side>,
    #[serde(default)]
    pub winning_side: Option<u8>,
    #[serde(default)]
    pub score: Option<Score>,
    #[serde(default)]
    pub finishing_position_range: Option<FinishingPositionRange>,
    #[serde(default)]
    pub finishing_round: Option<u32>,
    #[serde(default)]
    pub schedule: Option<MatchUpSchedule>,
    #[serde(default)]
    pub collection_id: Option<String>,
    #[serde(default)]
    pub tie_match_ups: Vec<MatchUp>,
    #[serde(default)]
    pub winner_match_up_id: Option<String>,
    #[serde(default)]
    pub loser_match_up_id: Option<String>,
}

// ── Tournament ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    pub tournament_id: String,
    #[serde(default)]
    pub tournament_name: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub participants: Option<Vec<Participant>>,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl Tournament {
    pub fn participants(&self) -> &[Participant] {
        self.participants.as_deref().unwrap_or(&[])
    }

    pub fn find_participant(&self, participant_id: &str) -> Option<&Participant> {
        self.participants()
            .iter()
            .find(|participant| participant.participant_id == participant_id)
    }
}

// ── Config types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub tournament_record_path: String,
    pub server_addr: String,
    pub use_publish_state: bool,
    pub scheduled_minutes_difference: Option<f64>,
    pub diagnostics: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tournament_record_path: String::new(),
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            use_publish_state: false,
            scheduled_minutes_difference: None,
            diagnostics: false,
        }
    }
}
