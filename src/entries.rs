use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::draws::{draw_sources, flight_entries_for, pending_flights, DerivedDrawInfo};
use crate::identity::RelevantParticipantIds;
use crate::seeding::{draw_seeding, draw_seeding_visible, event_seeding, resolve_draw_seeding, Seeding};
use crate::store::{DrawRecord, EventRecord, ParticipantStore};
use crate::types::{DrawDefinition, Entry, Event, Participant, Tournament};

#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotationOptions {
    pub with_seeding: bool,
    pub use_publish_state: bool,
    pub diagnostics: bool,
}

/// Lookup of participants by id for the duration of one query.
pub type ParticipantIndex<'a> = HashMap<&'a str, &'a Participant>;

pub fn participant_index(tournament: &Tournament) -> ParticipantIndex<'_> {
    tournament
        .participants()
        .iter()
        .map(|participant| (participant.participant_id.as_str(), participant))
        .collect()
}

fn entry_extensions(entry: &Entry) -> BTreeMap<String, Value> {
    entry
        .extensions
        .iter()
        .map(|extension| (extension.name.clone(), extension.value.clone()))
        .collect()
}

fn new_event_record(event: &Event, entry: Option<&Entry>, seeding: &Seeding) -> EventRecord {
    EventRecord {
        event_id: event.event_id.clone(),
        event_name: event.event_name.clone(),
        event_type: event.event_type,
        entry_status: entry.and_then(|e| e.entry_status.clone()),
        entry_stage: entry.and_then(|e| e.entry_stage),
        entry_position: entry.and_then(|e| e.entry_position),
        seed_value: seeding.seed_value.clone(),
        seed_assignments: seeding.seed_assignments.clone(),
        draw_ids: Vec::new(),
        entry_extensions: entry.map(entry_extensions).unwrap_or_default(),
    }
}

/// Draw record written the first time a participant is seen for a draw.
pub fn new_draw_record(
    info: Option<&DerivedDrawInfo>,
    draw_id: &str,
    event: &Event,
    participant_id: &str,
    entry: Option<&Entry>,
    seeding: Seeding,
) -> DrawRecord {
    DrawRecord {
        draw_id: draw_id.to_string(),
        event_id: event.event_id.clone(),
        draw_name: info.and_then(|i| i.draw_name.clone()),
        draw_type: info.and_then(|i| i.draw_type.clone()),
        entry_status: entry.and_then(|e| e.entry_status.clone()),
        entry_stage: entry.and_then(|e| e.entry_stage),
        entry_position: entry.and_then(|e| e.entry_position),
        seed_value: seeding.seed_value,
        seed_assignments: seeding.seed_assignments,
        draw_positions: info.map(|i| i.draw_positions(participant_id)).unwrap_or_default(),
        finishing_position_range: None,
        structure_participation: Vec::new(),
    }
}

/// Event-level then draw-level seeding, combined under the draw precedence rule.
pub fn seeding_for_draw(
    participant: Option<&Participant>,
    event: &Event,
    draw: Option<&DrawDefinition>,
    draw_id: &str,
    options: AnnotationOptions,
) -> Seeding {
    let Some(participant) = participant.filter(|_| options.with_seeding) else {
        return Seeding::default();
    };
    let event_level = event_seeding(participant, event, None, options.use_publish_state);
    let draw_level = draw_seeding(participant, event, draw, options.use_publish_state);
    let visible = draw_seeding_visible(event, draw_id, options.use_publish_state);
    resolve_draw_seeding(&event_level, draw_level, visible)
}

/// Writes event and draw entry context for every relevant participant id.
pub fn annotate_entries(
    tournament: &Tournament,
    participants: &ParticipantIndex<'_>,
    relevant_ids: &RelevantParticipantIds,
    draw_info: &BTreeMap<String, DerivedDrawInfo>,
    store: &mut ParticipantStore,
    options: AnnotationOptions,
) {
    for event in &tournament.events {
        annotate_event_entries(event, participants, relevant_ids, store, options);

        for source in draw_sources(event) {
            let flight_entries;
            let entries: &[Entry] = if source.entries.is_empty() {
                flight_entries = flight_entries_for(event, source.draw_id);
                &flight_entries
            } else {
                source.entries
            };
            annotate_draw_entries(
                event,
                source.draw_id,
                source.draw_definition,
                entries,
                participants,
                relevant_ids,
                draw_info,
                store,
                options,
            );
        }

        for flight in pending_flights(event) {
            annotate_draw_entries(
                event,
                &flight.draw_id,
                None,
                &flight.draw_entries,
                participants,
                relevant_ids,
                draw_info,
                store,
                options,
            );
        }
    }
}

fn annotate_event_entries(
    event: &Event,
    participants: &ParticipantIndex<'_>,
    relevant_ids: &RelevantParticipantIds,
    store: &mut ParticipantStore,
    options: AnnotationOptions,
) {
    for entry in &event.entries {
        let Some(participant_id) = entry.participant_id.as_deref() else {
            continue;
        };
        let seeding = match participants.get(participant_id) {
            Some(participant) if options.with_seeding => {
                event_seeding(participant, event, None, options.use_publish_state)
            }
            _ => Seeding::default(),
        };
        for relevant in relevant_ids.for_participant(participant_id) {
            let Some(aggregate) = store.get_mut(&relevant.relevant_participant_id) else {
                if options.diagnostics {
                    debug!(
                        "event {} entry references unknown participant {}",
                        event.event_id, relevant.relevant_participant_id
                    );
                }
                continue;
            };
            aggregate
                .events
                .entry(event.event_id.clone())
                .or_insert_with(|| new_event_record(event, Some(entry), &seeding));
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn annotate_draw_entries(
    event: &Event,
    draw_id: &str,
    draw: Option<&DrawDefinition>,
    entries: &[Entry],
    participants: &ParticipantIndex<'_>,
    relevant_ids: &RelevantParticipantIds,
    draw_info: &BTreeMap<String, DerivedDrawInfo>,
    store: &mut ParticipantStore,
    options: AnnotationOptions,
) {
    let info = draw_info.get(draw_id);
    for entry in entries {
        if entry.is_grouping_pending() {
            continue;
        }
        let Some(participant_id) = entry.participant_id.as_deref() else {
            continue;
        };
        let seeding = seeding_for_draw(
            participants.get(participant_id).copied(),
            event,
            draw,
            draw_id,
            options,
        );
        for relevant in relevant_ids.for_participant(participant_id) {
            let relevant_id = relevant.relevant_participant_id.as_str();
            let Some(aggregate) = store.get_mut(relevant_id) else {
                if options.diagnostics {
                    debug!("draw {draw_id} entry references unknown participant {relevant_id}");
                }
                continue;
            };
            aggregate
                .events
                .entry(event.event_id.clone())
                .or_insert_with(|| new_event_record(event, None, &Seeding::default()))
                .add_draw_id(draw_id);
            aggregate.draws.entry(draw_id.to_string()).or_insert_with(|| {
                new_draw_record(info, draw_id, event, participant_id, Some(entry), seeding.clone())
            });
        }
    }
}
