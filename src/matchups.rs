use std::collections::HashMap;

use crate::types::{
    DrawDefinition, Event, FinishingPositionRange, MatchUp, MatchUpSchedule, MatchUpStatus,
    MatchUpType, PositionAssignment, Score, Side, Stage, Structure, Tournament,
};

/// A matchUp flattened out of its draw with sides resolved to participants.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextMatchUp {
    pub match_up_id: String,
    pub event_id: String,
    pub draw_id: String,
    pub structure_id: String,
    pub stage: Stage,
    pub match_up_type: MatchUpType,
    pub match_up_status: MatchUpStatus,
    pub round_number: Option<u32>,
    pub sides: Vec<Side>,
    pub winning_side: Option<u8>,
    pub score: Option<Score>,
    pub finishing_position_range: Option<FinishingPositionRange>,
    pub finishing_round: Option<u32>,
    pub schedule: MatchUpSchedule,
    pub collection_id: Option<String>,
    /// Parent team matchUp for tie matchUps.
    pub match_up_tie_id: Option<String>,
    pub winner_match_up_id: Option<String>,
    pub loser_match_up_id: Option<String>,
    pub potential_participant_ids: Vec<String>,
}

impl ContextMatchUp {
    pub fn is_decided(&self) -> bool {
        self.winning_side.is_some()
    }

    pub fn side(&self, side_number: u8) -> Option<&Side> {
        self.sides.iter().find(|side| side.side_number == side_number)
    }

    pub fn opposing_side(&self, side_number: u8) -> Option<&Side> {
        self.sides
            .iter()
            .find(|side| side.side_number != side_number && side.side_number > 0)
    }

    pub fn participant_ids(&self) -> impl Iterator<Item = &str> {
        self.sides.iter().filter_map(|side| side.participant_id.as_deref())
    }

    pub fn has_open_side(&self) -> bool {
        self.sides.len() < 2 || self.sides.iter().any(|side| side.participant_id.is_none() && !side.bye)
    }

    pub fn score_has_value(&self) -> bool {
        self.score.as_ref().map(Score::has_value).unwrap_or(false)
    }

    /// Finishing range for whichever side won or lost, once decided.
    pub fn range_for_side(&self, side_number: u8) -> Option<[u32; 2]> {
        let range = self.finishing_position_range?;
        let winning_side = self.winning_side?;
        Some(if winning_side == side_number { range.winner } else { range.loser })
    }
}

struct DrawScope<'a> {
    event: &'a Event,
    draw_id: &'a str,
}

/// Every matchUp in the tournament, tie matchUps following their team matchUp.
pub fn all_match_ups_in_context(tournament: &Tournament) -> Vec<ContextMatchUp> {
    let mut out = Vec::new();
    for event in &tournament.events {
        for draw in &event.draw_definitions {
            out.extend(draw_match_ups_in_context(event, draw));
        }
    }
    out
}

pub fn draw_match_ups_in_context(event: &Event, draw: &DrawDefinition) -> Vec<ContextMatchUp> {
    let scope = DrawScope {
        event,
        draw_id: &draw.draw_id,
    };
    let mut out = Vec::new();
    for structure in &draw.structures {
        collect_structure(&scope, structure, &[], &mut out);
    }
    project_potential_participants(&mut out);
    out
}

fn collect_structure(
    scope: &DrawScope<'_>,
    structure: &Structure,
    parent_assignments: &[&PositionAssignment],
    out: &mut Vec<ContextMatchUp>,
) {
    let mut assignments: Vec<&PositionAssignment> = structure.position_assignments.iter().collect();
    assignments.extend(parent_assignments.iter().copied());

    for match_up in &structure.match_ups {
        let context = build_context(scope, structure, match_up, &assignments, None, None);
        let parent_schedule = context.schedule.clone();
        let parent_id = context.match_up_id.clone();
        out.push(context);
        for tie in &match_up.tie_match_ups {
            out.push(build_context(
                scope,
                structure,
                tie,
                &[],
                Some(parent_id.as_str()),
                Some(&parent_schedule),
            ));
        }
    }
    for child in &structure.structures {
        collect_structure(scope, child, &assignments, out);
    }
}

fn build_context(
    scope: &DrawScope<'_>,
    structure: &Structure,
    match_up: &MatchUp,
    assignments: &[&PositionAssignment],
    match_up_tie_id: Option<&str>,
    parent_schedule: Option<&MatchUpSchedule>,
) -> ContextMatchUp {
    let match_up_type = match_up.match_up_type.unwrap_or(if match_up_tie_id.is_some() {
        MatchUpType::Singles
    } else {
        scope.event.event_type
    });
    let schedule = match (&match_up.schedule, parent_schedule) {
        (Some(own), _) if own.is_scheduled() => own.clone(),
        (_, Some(parent)) => parent.clone(),
        (own, None) => own.clone().unwrap_or_default(),
    };

    ContextMatchUp {
        match_up_id: match_up.match_up_id.clone(),
        event_id: scope.event.event_id.clone(),
        draw_id: scope.draw_id.to_string(),
        structure_id: structure.structure_id.clone(),
        stage: structure.stage,
        match_up_type,
        match_up_status: match_up.match_up_status,
        round_number: match_up.round_number,
        sides: resolve_sides(match_up, assignments),
        winning_side: match_up.winning_side,
        score: match_up.score.clone(),
        finishing_position_range: match_up.finishing_position_range,
        finishing_round: match_up.finishing_round,
        schedule,
        collection_id: match_up.collection_id.clone(),
        match_up_tie_id: match_up_tie_id.map(str::to_string),
        winner_match_up_id: match_up.winner_match_up_id.clone(),
        loser_match_up_id: match_up.loser_match_up_id.clone(),
        potential_participant_ids: Vec::new(),
    }
}

/// Explicit sides win; missing participants are filled from draw positions.
fn resolve_sides(match_up: &MatchUp, assignments: &[&PositionAssignment]) -> Vec<Side> {
    let by_position: HashMap<u32, &PositionAssignment> = assignments
        .iter()
        .map(|assignment| (assignment.draw_position, *assignment))
        .collect();

    let fill = |side: &mut Side| {
        if side.participant_id.is_some() {
            return;
        }
        if let Some(assignment) = side.draw_position.and_then(|pos| by_position.get(&pos)) {
            side.participant_id = assignment.participant_id.clone();
            side.bye = side.bye || assignment.bye;
        }
    };

    if !match_up.sides.is_empty() {
        let mut sides = match_up.sides.clone();
        for (idx, side) in sides.iter_mut().enumerate() {
            if side.draw_position.is_none() {
                side.draw_position = match_up.draw_positions.get(idx).copied().flatten();
            }
            fill(side);
        }
        return sides;
    }

    match_up
        .draw_positions
        .iter()
        .enumerate()
        .take(2)
        .map(|(idx, draw_position)| {
            let mut side = Side {
                side_number: (idx + 1) as u8,
                draw_position: *draw_position,
                ..Side::default()
            };
            fill(&mut side);
            side
        })
        .collect()
}

/// Participants of an undecided feeder become potential participants of the
/// matchUp its winner or loser advances into, while that target has an open side.
fn project_potential_participants(match_ups: &mut [ContextMatchUp]) {
    let index: HashMap<String, usize> = match_ups
        .iter()
        .enumerate()
        .filter(|(_, m)| m.match_up_tie_id.is_none())
        .map(|(idx, m)| (m.match_up_id.clone(), idx))
        .collect();

    let mut projections: Vec<(usize, Vec<String>)> = Vec::new();
    for feeder in match_ups.iter() {
        if feeder.is_decided()
            || feeder.match_up_tie_id.is_some()
            || feeder.match_up_status == MatchUpStatus::Bye
        {
            continue;
        }
        let feeder_participants: Vec<String> = feeder.participant_ids().map(str::to_string).collect();
        if feeder_participants.is_empty() {
            continue;
        }
        let targets = [&feeder.winner_match_up_id, &feeder.loser_match_up_id];
        for target_id in targets.into_iter().flatten() {
            if let Some(&target_idx) = index.get(target_id) {
                projections.push((target_idx, feeder_participants.clone()));
            }
        }
    }

    for (target_idx, participant_ids) in projections {
        let target = &mut match_ups[target_idx];
        if target.is_decided() || !target.has_open_side() {
            continue;
        }
        for participant_id in participant_ids {
            let already_placed = target.participant_ids().any(|id| id == participant_id);
            if !already_placed && !target.potential_participant_ids.contains(&participant_id) {
                target.potential_participant_ids.push(participant_id);
            }
        }
    }
}
