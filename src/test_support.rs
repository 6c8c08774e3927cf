//! Fixture builders shared by unit tests.

use serde_json::{json, Value};

use crate::types::{
    Entry, Event, MatchUp, MatchUpStatus, MatchUpType, Participant, ParticipantType,
    PositionAssignment, Stage, Structure, TimeItem, Tournament, PUBLISH_STATUS_ITEM,
    SEEDING_SCALE_PREFIX,
};

pub fn individual(id: &str) -> Participant {
    Participant {
        participant_id: id.to_string(),
        participant_type: ParticipantType::Individual,
        participant_name: Some(format!("Player {id}")),
        participant_role: None,
        participant_role_responsibilities: Vec::new(),
        individual_participant_ids: Vec::new(),
        person: None,
        time_items: Vec::new(),
        extensions: Vec::new(),
    }
}

pub fn composite(id: &str, participant_type: ParticipantType, members: &[&str]) -> Participant {
    Participant {
        participant_type,
        individual_participant_ids: members.iter().map(|m| m.to_string()).collect(),
        ..individual(id)
    }
}

pub fn event(id: &str, event_type: MatchUpType) -> Event {
    Event {
        event_id: id.to_string(),
        event_name: Some(format!("Event {id}")),
        event_type,
        category: None,
        entries: Vec::new(),
        draw_definitions: Vec::new(),
        time_items: Vec::new(),
        extensions: Vec::new(),
    }
}

pub fn entry(participant_id: &str, entry_status: &str) -> Entry {
    Entry {
        participant_id: Some(participant_id.to_string()),
        entry_status: Some(entry_status.to_string()),
        ..Entry::default()
    }
}

pub fn structure(id: &str) -> Structure {
    Structure {
        structure_id: id.to_string(),
        structure_name: None,
        stage: Stage::Main,
        stage_sequence: Some(1),
        position_assignments: Vec::new(),
        seed_assignments: Vec::new(),
        match_ups: Vec::new(),
        structures: Vec::new(),
    }
}

pub fn assignment(draw_position: u32, participant_id: Option<&str>) -> PositionAssignment {
    PositionAssignment {
        draw_position,
        participant_id: participant_id.map(str::to_string),
        bye: participant_id.is_none(),
    }
}

pub fn match_up(id: &str) -> MatchUp {
    MatchUp {
        match_up_id: id.to_string(),
        match_up_type: None,
        match_up_status: MatchUpStatus::ToBePlayed,
        round_number: None,
        round_position: None,
        draw_positions: Vec::new(),
        sides: Vec::new(),
        winning_side: None,
        score: None,
        finishing_position_range: None,
        finishing_round: None,
        schedule: None,
        collection_id: None,
        tie_match_ups: Vec::new(),
        winner_match_up_id: None,
        loser_match_up_id: None,
    }
}

pub fn seeding_item(event_type: MatchUpType, scale_name: &str, value: Value) -> TimeItem {
    TimeItem {
        item_type: format!("{SEEDING_SCALE_PREFIX}.{}.{scale_name}", event_type.as_str()),
        item_value: value,
        created_at: None,
    }
}

pub fn publish_item(public: Value) -> TimeItem {
    TimeItem {
        item_type: PUBLISH_STATUS_ITEM.to_string(),
        item_value: json!({ "PUBLIC": public }),
        created_at: None,
    }
}

pub fn tournament(participants: Vec<Participant>, events: Vec<Event>) -> Tournament {
    Tournament {
        tournament_id: "T-1".to_string(),
        tournament_name: Some("Spring Open".to_string()),
        start_date: None,
        end_date: None,
        participants: Some(participants),
        events,
    }
}
