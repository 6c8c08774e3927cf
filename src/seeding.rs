use serde_json::Value;
use std::collections::BTreeMap;

use crate::store::SeedAssignment;
use crate::types::{
    Category, DrawDefinition, Event, Participant, PublishState, Stage, SEEDING_SCALE_PREFIX,
};

/// Seed visible for one participant in one event or draw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Seeding {
    pub seed_value: Option<Value>,
    pub seed_assignments: BTreeMap<Stage, SeedAssignment>,
}

impl Seeding {
    pub fn is_empty(&self) -> bool {
        self.seed_value.is_none() && self.seed_assignments.is_empty()
    }
}

/// Seeding scale values keyed by scale name for the event's type. Later time
/// items overwrite earlier ones.
pub fn seeding_scale_values(participant: &Participant, event: &Event) -> BTreeMap<String, Value> {
    let prefix = format!("{SEEDING_SCALE_PREFIX}.{}.", event.event_type.as_str());
    let mut out = BTreeMap::new();
    for item in &participant.time_items {
        if let Some(scale_name) = item.item_type.strip_prefix(&prefix) {
            if !scale_name.is_empty() && !item.item_value.is_null() {
                out.insert(scale_name.to_string(), item.item_value.clone());
            }
        }
    }
    out
}

/// Event-level seeding for a participant.
///
/// With the publish gate active only published scale names are visible, one
/// value per stage when the event publishes per-stage scale names. Without the
/// gate the first scale matching age category code, event id, or category name
/// wins.
pub fn event_seeding(
    participant: &Participant,
    event: &Event,
    category: Option<&Category>,
    use_publish_state: bool,
) -> Seeding {
    let scales = seeding_scale_values(participant, event);
    if scales.is_empty() {
        return Seeding::default();
    }

    if use_publish_state {
        return published_seeding(&scales, event.publish_state().as_ref(), event, category);
    }

    Seeding {
        seed_value: fallback_scale_value(&scales, event, category),
        seed_assignments: BTreeMap::new(),
    }
}

fn published_seeding(
    scales: &BTreeMap<String, Value>,
    publish_state: Option<&PublishState>,
    event: &Event,
    category: Option<&Category>,
) -> Seeding {
    let Some(seeding) = publish_state.and_then(|state| state.seeding.as_ref()) else {
        return Seeding::default();
    };
    if !seeding.published {
        return Seeding::default();
    }

    if let Some(stage_names) = &seeding.stage_seeding_scale_names {
        let mut seed_assignments = BTreeMap::new();
        for (stage_key, scale_name) in stage_names {
            let Some(stage) = parse_stage(stage_key) else {
                continue;
            };
            if let Some(value) = scales.get(scale_name) {
                seed_assignments.insert(
                    stage,
                    SeedAssignment {
                        seed_number: None,
                        seed_value: Some(value.clone()),
                    },
                );
            }
        }
        return Seeding {
            seed_value: None,
            seed_assignments,
        };
    }

    let seed_value = match &seeding.seeding_scale_names {
        Some(names) => names.iter().find_map(|name| scales.get(name).cloned()),
        None => fallback_scale_value(scales, event, category),
    };
    Seeding {
        seed_value,
        seed_assignments: BTreeMap::new(),
    }
}

fn fallback_scale_value(
    scales: &BTreeMap<String, Value>,
    event: &Event,
    category: Option<&Category>,
) -> Option<Value> {
    let category = category.or(event.category.as_ref());
    let candidates = [
        category.and_then(|c| c.age_category_code.as_deref()),
        Some(event.event_id.as_str()),
        category.and_then(|c| c.category_name.as_deref()),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|name| scales.get(name).cloned())
}

fn parse_stage(raw: &str) -> Option<Stage> {
    serde_json::from_value(Value::String(raw.to_string())).ok()
}

/// Whether draw-level seeding may be shown for `draw_id`.
pub fn draw_seeding_visible(event: &Event, draw_id: &str, use_publish_state: bool) -> bool {
    if !use_publish_state {
        return true;
    }
    let Some(state) = event.publish_state() else {
        return false;
    };
    let published = state.seeding.as_ref().map(|s| s.published).unwrap_or(false);
    if !published {
        return false;
    }
    match &state.draw_ids {
        Some(draw_ids) => draw_ids.iter().any(|id| id == draw_id),
        None => true,
    }
}

/// Draw-level seeding computed from the draw's category scale and the
/// structures' seed assignments.
pub fn draw_seeding(
    participant: &Participant,
    event: &Event,
    draw: Option<&DrawDefinition>,
    use_publish_state: bool,
) -> Seeding {
    let draw_category = draw.and_then(|d| d.category.as_ref());
    let mut seeding = if draw_category.is_some() {
        event_seeding(participant, event, draw_category, use_publish_state)
    } else {
        Seeding::default()
    };

    if let Some(draw) = draw {
        for structure in &draw.structures {
            for assignment in &structure.seed_assignments {
                if assignment.participant_id.as_deref() != Some(participant.participant_id.as_str()) {
                    continue;
                }
                seeding.seed_assignments.entry(structure.stage).or_insert(SeedAssignment {
                    seed_number: Some(assignment.seed_number),
                    seed_value: assignment.seed_value.clone(),
                });
            }
        }
        if seeding.seed_value.is_none() {
            seeding.seed_value = seeding
                .seed_assignments
                .get(&Stage::Main)
                .and_then(|assignment| {
                    assignment
                        .seed_value
                        .clone()
                        .or_else(|| assignment.seed_number.map(Value::from))
                });
        }
    }
    seeding
}

/// Draw seed precedence: the event-level value is written first, a computed
/// draw-level value then replaces it, and a draw hidden by the publish gate
/// shows no seed at all.
pub fn resolve_draw_seeding(event_level: &Seeding, draw_level: Seeding, visible: bool) -> Seeding {
    if !visible {
        return Seeding::default();
    }
    let mut resolved = event_level.clone();
    if draw_level.seed_value.is_some() {
        resolved.seed_value = draw_level.seed_value;
    }
    for (stage, assignment) in draw_level.seed_assignments {
        resolved.seed_assignments.insert(stage, assignment);
    }
    resolved
}
