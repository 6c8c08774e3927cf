use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::types::{DrawDefinition, Entry, Event, Stage, Structure, Tournament};

/// Per-draw facts shared by the annotator, the aggregator and ranking consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedDrawInfo {
    pub draw_id: String,
    pub event_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<u32>,
    pub ordered_structure_ids: Vec<String>,
    pub draw_size: usize,
    #[serde(skip)]
    positions: HashMap<String, Vec<u32>>,
}

impl DerivedDrawInfo {
    pub fn draw_positions(&self, participant_id: &str) -> Vec<u32> {
        self.positions.get(participant_id).cloned().unwrap_or_default()
    }

    /// Participants holding any position assignment in the draw.
    pub fn positioned_participant_ids(&self) -> impl Iterator<Item = &str> {
        self.positions.keys().map(String::as_str)
    }

    /// Stable position of a structure within the draw; unknown ids sort last.
    pub fn structure_order(&self, structure_id: &str) -> usize {
        self.ordered_structure_ids
            .iter()
            .position(|id| id == structure_id)
            .unwrap_or(usize::MAX)
    }
}

/// A draw as seen by entry annotation: a generated draw definition, or a
/// flight whose draw has not been generated yet.
pub struct DrawSource<'a> {
    pub draw_id: &'a str,
    pub draw_definition: Option<&'a DrawDefinition>,
    pub entries: &'a [Entry],
    pub flight_number: Option<u32>,
}

pub fn draw_sources(event: &Event) -> Vec<DrawSource<'_>> {
    let flights = event.flight_profile().map(|profile| profile.flights).unwrap_or_default();
    let mut out = Vec::new();
    for draw in &event.draw_definitions {
        out.push(DrawSource {
            draw_id: &draw.draw_id,
            draw_definition: Some(draw),
            entries: &draw.entries,
            flight_number: flights
                .iter()
                .find(|flight| flight.draw_id == draw.draw_id)
                .and_then(|flight| flight.flight_number),
        });
    }
    out
}

/// Flights carry their own entry lists; they are returned owned because the
/// flight profile lives in an extension value.
pub fn pending_flights(event: &Event) -> Vec<crate::types::Flight> {
    event
        .flight_profile()
        .map(|profile| profile.flights)
        .unwrap_or_default()
        .into_iter()
        .filter(|flight| event.draw_definition(&flight.draw_id).is_none())
        .collect()
}

/// Entries of a generated draw, falling back to its flight's entries when the
/// draw definition was stored without them.
pub fn flight_entries_for(event: &Event, draw_id: &str) -> Vec<Entry> {
    event
        .flight_profile()
        .and_then(|profile| profile.flights.into_iter().find(|flight| flight.draw_id == draw_id))
        .map(|flight| flight.draw_entries)
        .unwrap_or_default()
}

fn collect_structures<'a>(structure: &'a Structure, out: &mut Vec<&'a Structure>) {
    out.push(structure);
    for child in &structure.structures {
        collect_structures(child, out);
    }
}

fn derive_one(event: &Event, draw: &DrawDefinition, flight_number: Option<u32>) -> DerivedDrawInfo {
    let mut structures = Vec::new();
    for structure in &draw.structures {
        collect_structures(structure, &mut structures);
    }

    let mut positions: HashMap<String, Vec<u32>> = HashMap::new();
    for structure in &structures {
        for assignment in &structure.position_assignments {
            if let Some(participant_id) = &assignment.participant_id {
                let entry = positions.entry(participant_id.clone()).or_default();
                if !entry.contains(&assignment.draw_position) {
                    entry.push(assignment.draw_position);
                }
            }
        }
    }

    let draw_size = draw
        .structures
        .iter()
        .find(|structure| structure.stage == Stage::Main)
        .map(|structure| structure.all_position_assignments().len())
        .unwrap_or(0);

    DerivedDrawInfo {
        draw_id: draw.draw_id.clone(),
        event_id: event.event_id.clone(),
        draw_name: draw.draw_name.clone(),
        draw_type: draw.draw_type.clone(),
        flight_number,
        ordered_structure_ids: structures.iter().map(|s| s.structure_id.clone()).collect(),
        draw_size,
        positions,
    }
}

pub fn derive_draw_info(tournament: &Tournament) -> BTreeMap<String, DerivedDrawInfo> {
    let mut out = BTreeMap::new();
    for event in &tournament.events {
        for source in draw_sources(event) {
            if let Some(draw) = source.draw_definition {
                out.insert(draw.draw_id.clone(), derive_one(event, draw, source.flight_number));
            }
        }
        for flight in pending_flights(event) {
            out.insert(
                flight.draw_id.clone(),
                DerivedDrawInfo {
                    draw_id: flight.draw_id.clone(),
                    event_id: event.event_id.clone(),
                    draw_name: flight.draw_name.clone(),
                    draw_type: None,
                    flight_number: flight.flight_number,
                    ordered_structure_ids: Vec::new(),
                    draw_size: 0,
                    positions: HashMap::new(),
                },
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{assignment, event, structure};
    use crate::types::MatchUpType;
    use serde_json::json;

    #[test]
    fn test_ordered_structure_ids_keep_input_order() {
        let mut ev = event("E1", MatchUpType::Singles);
        let mut main = structure("MAIN-S");
        main.position_assignments = vec![assignment(1, Some("A")), assignment(2, Some("B"))];
        let mut consolation = structure("CONS-S");
        consolation.stage = Stage::Consolation;
        consolation.position_assignments = vec![assignment(1, Some("B"))];
        ev.draw_definitions.push(DrawDefinition {
            draw_id: "D1".to_string(),
            draw_name: Some("Main Draw".to_string()),
            draw_type: Some("FEED_IN_CHAMPIONSHIP".to_string()),
            category: None,
            entries: Vec::new(),
            structures: vec![consolation, main],
        });
        let tournament = crate::test_support::tournament(Vec::new(), vec![ev]);

        let info = derive_draw_info(&tournament);
        let draw = &info["D1"];
        assert_eq!(draw.ordered_structure_ids, vec!["CONS-S", "MAIN-S"]);
        assert_eq!(draw.structure_order("MAIN-S"), 1);
        assert_eq!(draw.draw_size, 2);
        assert_eq!(draw.draw_positions("B"), vec![1, 2]);
        let mut positioned: Vec<&str> = draw.positioned_participant_ids().collect();
        positioned.sort();
        assert_eq!(positioned, vec!["A", "B"]);
    }

    #[test]
    fn test_flights_without_draws_are_listed() {
        let mut ev = event("E1", MatchUpType::Singles);
        ev.extensions.push(crate::types::Extension {
            name: "flightProfile".to_string(),
            value: json!({ "flights": [
                { "drawId": "F1", "drawName": "Flight 1", "flightNumber": 1,
                  "drawEntries": [{ "participantId": "A", "entryStatus": "DIRECT_ACCEPTANCE" }] }
            ] }),
        });
        let tournament = crate::test_support::tournament(Vec::new(), vec![ev]);

        let info = derive_draw_info(&tournament);
        assert_eq!(info["F1"].flight_number, Some(1));
        assert_eq!(pending_flights(&tournament.events[0]).len(), 1);
        assert_eq!(flight_entries_for(&tournament.events[0], "F1").len(), 1);
    }
}
