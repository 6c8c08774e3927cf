use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use crate::draws::{flight_entries_for, pending_flights, DerivedDrawInfo};
use crate::error::{ParticipantsError, Result};
use crate::identity::RelevantParticipantIds;
use crate::types::{Entry, Participant, ParticipantType, Tournament};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessorValue {
    /// Dot-separated path into the participant view, e.g. `person.sex`.
    pub accessor: String,
    pub value: Value,
}

/// Declarative participant predicate; each present group is one condition.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ParticipantFilters {
    pub participant_ids: Option<Vec<String>>,
    pub participant_types: Option<Vec<ParticipantType>>,
    pub participant_roles: Option<Vec<String>>,
    pub participant_role_responsibilities: Option<Vec<String>>,
    pub sign_in_status: Option<String>,
    pub positioned_participants: Option<bool>,
    pub draw_entry_statuses: Option<Vec<String>>,
    pub event_entry_statuses: Option<Vec<String>>,
    pub accessor_values: Option<Vec<AccessorValue>>,
    pub genders: Option<Vec<String>>,
    pub enable_or_filtering: bool,
}

impl ParticipantFilters {
    pub fn from_value(value: &Value) -> Result<Self> {
        if !value.is_object() {
            return Err(ParticipantsError::InvalidObject {
                context: "participantFilters".to_string(),
            });
        }
        serde_json::from_value(value.clone()).map_err(|e| ParticipantsError::InvalidObject {
            context: format!("participantFilters: {e}"),
        })
    }
}

/// Participant-id sets the filter needs, computed once per query.
#[derive(Debug, Default)]
pub struct FilterIndex {
    positioned: HashSet<String>,
    draw_entered: HashSet<String>,
    event_entered: HashSet<String>,
}

fn entries_with_status<'a>(entries: &'a [Entry], statuses: &'a [String]) -> impl Iterator<Item = &'a str> {
    entries
        .iter()
        .filter(|entry| {
            entry
                .entry_status
                .as_ref()
                .map(|status| statuses.contains(status))
                .unwrap_or(false)
        })
        .filter_map(|entry| entry.participant_id.as_deref())
}

impl FilterIndex {
    pub fn build(
        filters: &ParticipantFilters,
        tournament: &Tournament,
        relevant_ids: &RelevantParticipantIds,
        draw_info: &BTreeMap<String, DerivedDrawInfo>,
    ) -> Self {
        let mut index = FilterIndex::default();
        if filters.positioned_participants.is_some() {
            for info in draw_info.values() {
                index
                    .positioned
                    .extend(info.positioned_participant_ids().map(str::to_string));
            }
        }

        for event in &tournament.events {
            if let Some(statuses) = &filters.event_entry_statuses {
                index
                    .event_entered
                    .extend(relevant_ids.expand(entries_with_status(&event.entries, statuses)));
            }

            if let Some(statuses) = &filters.draw_entry_statuses {
                for draw in &event.draw_definitions {
                    let flight_entries;
                    let entries: &[Entry] = if draw.entries.is_empty() {
                        flight_entries = flight_entries_for(event, &draw.draw_id);
                        &flight_entries
                    } else {
                        &draw.entries
                    };
                    index
                        .draw_entered
                        .extend(relevant_ids.expand(entries_with_status(entries, statuses)));
                }
                for flight in pending_flights(event) {
                    index
                        .draw_entered
                        .extend(relevant_ids.expand(entries_with_status(&flight.draw_entries, statuses)));
                }
            }
        }
        index
    }
}

fn contains_any(haystack: &[String], needles: &[String]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Walks `path` from `value`; arrays fan out so any element may match.
fn accessor_matches(value: &Value, path: &[&str], target: &Value) -> bool {
    if let Value::Array(items) = value {
        return items.iter().any(|item| accessor_matches(item, path, target));
    }
    match path.split_first() {
        None => value == target,
        Some((key, rest)) => value
            .get(*key)
            .map(|next| accessor_matches(next, rest, target))
            .unwrap_or(false),
    }
}

impl ParticipantFilters {
    fn groups(&self, participant: &Participant, view: &Value, index: &FilterIndex) -> Vec<bool> {
        let mut results = Vec::new();
        if let Some(ids) = &self.participant_ids {
            results.push(ids.contains(&participant.participant_id));
        }
        if let Some(types) = &self.participant_types {
            results.push(types.contains(&participant.participant_type));
        }
        if let Some(roles) = &self.participant_roles {
            results.push(
                participant
                    .participant_role
                    .as_ref()
                    .map(|role| roles.contains(role))
                    .unwrap_or(false),
            );
        }
        if let Some(responsibilities) = &self.participant_role_responsibilities {
            results.push(contains_any(
                &participant.participant_role_responsibilities,
                responsibilities,
            ));
        }
        if let Some(status) = &self.sign_in_status {
            results.push(participant.sign_in_status() == status.as_str());
        }
        if let Some(positioned) = self.positioned_participants {
            results.push(index.positioned.contains(&participant.participant_id) == positioned);
        }
        if self.draw_entry_statuses.is_some() {
            results.push(index.draw_entered.contains(&participant.participant_id));
        }
        if self.event_entry_statuses.is_some() {
            results.push(index.event_entered.contains(&participant.participant_id));
        }
        if let Some(accessors) = &self.accessor_values {
            results.push(accessors.iter().all(|accessor| {
                let path: Vec<&str> = accessor.accessor.split('.').collect();
                accessor_matches(view, &path, &accessor.value)
            }));
        }
        if let Some(genders) = &self.genders {
            results.push(
                participant
                    .person
                    .as_ref()
                    .and_then(|person| person.sex.as_ref())
                    .map(|sex| genders.contains(sex))
                    .unwrap_or(false),
            );
        }
        results
    }

    /// AND composition passes when every present group holds; OR composition
    /// when any does. With no groups present every participant passes.
    pub fn matches(&self, participant: &Participant, view: &Value, index: &FilterIndex) -> bool {
        let results = self.groups(participant, view, index);
        // No groups: everyone passes, in OR mode too.
        if results.is_empty() {
            return true;
        }
        if self.enable_or_filtering {
            results.iter().any(|passed| *passed)
        } else {
            results.iter().all(|passed| *passed)
        }
    }
}
