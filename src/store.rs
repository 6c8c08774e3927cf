use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::types::{
    MatchUpStatus, MatchUpType, Participant, ParticipantType, Stage,
};

// ── Counters ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub wins: u32,
    pub losses: u32,
    pub walkover_wins: u32,
    pub default_wins: u32,
}

impl Tally {
    fn record(&mut self, won: bool, status: MatchUpStatus) {
        if won {
            self.wins += 1;
            if status.is_walkover() {
                self.walkover_wins += 1;
            }
            if status.is_default() {
                self.default_wins += 1;
            }
        } else {
            self.losses += 1;
        }
    }

    pub fn decided(&self) -> u32 {
        self.wins + self.losses
    }
}

/// Win/loss tallies overall and per discipline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
    pub total: Tally,
    pub singles: Tally,
    pub doubles: Tally,
    pub team: Tally,
}

impl Counters {
    pub fn discipline(&self, match_up_type: MatchUpType) -> &Tally {
        match match_up_type {
            MatchUpType::Singles => &self.singles,
            MatchUpType::Doubles => &self.doubles,
            MatchUpType::Team => &self.team,
        }
    }

    fn discipline_mut(&mut self, match_up_type: MatchUpType) -> &mut Tally {
        match match_up_type {
            MatchUpType::Singles => &mut self.singles,
            MatchUpType::Doubles => &mut self.doubles,
            MatchUpType::Team => &mut self.team,
        }
    }

    pub fn record(&mut self, match_up_type: MatchUpType, won: bool, status: MatchUpStatus) {
        self.discipline_mut(match_up_type).record(won, status);
        self.total.record(won, status);
    }
}

// ── Per-participant records ────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedAssignment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_value: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub event_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    pub event_type: MatchUpType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_value: Option<Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub seed_assignments: BTreeMap<Stage, SeedAssignment>,
    pub draw_ids: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub entry_extensions: BTreeMap<String, Value>,
}

impl EventRecord {
    pub fn add_draw_id(&mut self, draw_id: &str) {
        if !self.draw_ids.iter().any(|existing| existing == draw_id) {
            self.draw_ids.push(draw_id.to_string());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawRecord {
    pub draw_id: String,
    pub event_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_value: Option<Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub seed_assignments: BTreeMap<Stage, SeedAssignment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub draw_positions: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finishing_position_range: Option<[u32; 2]>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub structure_participation: Vec<StructureParticipation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentInfo {
    pub participant_id: String,
    pub participant_type: ParticipantType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentEncounter {
    pub match_up_id: String,
    pub event_id: String,
    pub draw_id: String,
    pub structure_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_won: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchUpScheduleSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub court_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_conflict: Option<String>,
}

/// One matchUp as seen from a single participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchUpSummary {
    pub match_up_id: String,
    pub event_id: String,
    pub draw_id: String,
    pub structure_id: String,
    pub match_up_type: MatchUpType,
    pub match_up_status: MatchUpStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_up_tie_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side_number: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_won: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finishing_position_range: Option<[u32; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finishing_round: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perspective_score_string: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub opponent_participant_info: Vec<OpponentInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_participant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<MatchUpScheduleSummary>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub potential: bool,
}

/// A decided or potential commitment on a date.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_after_recovery: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_change_time_after_recovery: Option<String>,
    pub match_up_type: MatchUpType,
    pub match_up_status: MatchUpStatus,
    pub match_up_id: String,
    /// Parent team matchUp when this item is a tie.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_up_tie_id: Option<String>,
    pub draw_id: String,
    pub structure_id: String,
    pub potential: bool,
    pub score_has_value: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConflict {
    pub prior_scheduled_match_up_id: String,
    pub match_up_id_with_conflict: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureParticipation {
    pub structure_id: String,
    pub draw_id: String,
    pub ranking_stage: Stage,
    pub win_count: u32,
    pub walkover_win_count: u32,
    pub default_win_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finishing_position_range: Option<[u32; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finishing_round: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_number: Option<u32>,
    pub participant_won: bool,
}

impl StructureParticipation {
    pub fn new(structure_id: &str, draw_id: &str, ranking_stage: Stage) -> Self {
        StructureParticipation {
            structure_id: structure_id.to_string(),
            draw_id: draw_id.to_string(),
            ranking_stage,
            win_count: 0,
            walkover_win_count: 0,
            default_win_count: 0,
            finishing_position_range: None,
            finishing_round: None,
            round_number: None,
            participant_won: false,
        }
    }
}

// ── Aggregate ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantAggregate {
    pub participant_id: String,
    pub counters: Counters,
    pub match_ups: BTreeMap<String, MatchUpSummary>,
    pub potential_match_ups: BTreeMap<String, MatchUpSummary>,
    pub events: BTreeMap<String, EventRecord>,
    pub draws: BTreeMap<String, DrawRecord>,
    pub opponents: BTreeMap<String, Vec<OpponentEncounter>>,
    pub structure_participation: BTreeMap<String, StructureParticipation>,
    pub schedule_items: Vec<ScheduleItem>,
    pub schedule_conflicts: Vec<ScheduleConflict>,
}

impl ParticipantAggregate {
    pub fn new(participant_id: &str) -> Self {
        ParticipantAggregate {
            participant_id: participant_id.to_string(),
            ..ParticipantAggregate::default()
        }
    }
}

/// Arena of aggregates, one per participant id, allocated before any traversal.
#[derive(Debug, Default, Clone)]
pub struct ParticipantStore {
    aggregates: BTreeMap<String, ParticipantAggregate>,
    order: Vec<String>,
}

impl ParticipantStore {
    pub fn initialize(participants: &[Participant]) -> Self {
        let mut store = ParticipantStore::default();
        for participant in participants {
            let id = &participant.participant_id;
            if store.aggregates.contains_key(id) {
                continue;
            }
            store.aggregates.insert(id.clone(), ParticipantAggregate::new(id));
            store.order.push(id.clone());
        }
        store
    }

    pub fn get(&self, participant_id: &str) -> Option<&ParticipantAggregate> {
        self.aggregates.get(participant_id)
    }

    /// Writes to unknown ids are dropped by callers; the store never grows after init.
    pub fn get_mut(&mut self, participant_id: &str) -> Option<&mut ParticipantAggregate> {
        self.aggregates.get_mut(participant_id)
    }

    /// Aggregates in participant-list order.
    pub fn iter(&self) -> impl Iterator<Item = &ParticipantAggregate> {
        self.order.iter().filter_map(|id| self.aggregates.get(id))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ParticipantAggregate> {
        self.aggregates.values_mut()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn into_map(self) -> BTreeMap<String, ParticipantAggregate> {
        self.aggregates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{composite, individual};

    #[test]
    fn test_initialize_allocates_empty_aggregates_in_order() {
        let participants = vec![
            individual("B"),
            individual("A"),
            composite("AB", ParticipantType::Pair, &["A", "B"]),
        ];
        let store = ParticipantStore::initialize(&participants);

        let ids: Vec<&str> = store.iter().map(|agg| agg.participant_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A", "AB"]);
        for aggregate in store.iter() {
            assert_eq!(aggregate.counters, Counters::default());
            assert!(aggregate.match_ups.is_empty());
            assert!(aggregate.schedule_items.is_empty());
        }
    }

    #[test]
    fn test_counters_mirror_discipline_and_total() {
        let mut counters = Counters::default();
        counters.record(MatchUpType::Doubles, true, MatchUpStatus::Walkover);
        counters.record(MatchUpType::Doubles, true, MatchUpStatus::Defaulted);
        counters.record(MatchUpType::Singles, false, MatchUpStatus::Completed);

        assert_eq!(counters.doubles.wins, 2);
        assert_eq!(counters.doubles.walkover_wins, 1);
        assert_eq!(counters.doubles.default_wins, 1);
        assert_eq!(counters.singles.losses, 1);
        assert_eq!(counters.total.wins, 2);
        assert_eq!(counters.total.walkover_wins, 1);
        assert_eq!(counters.total.decided(), 3);
    }

    #[test]
    fn test_duplicate_participant_ids_allocate_once() {
        let participants = vec![individual("A"), individual("A")];
        let store = ParticipantStore::initialize(&participants);
        assert_eq!(store.len(), 1);
    }
}
