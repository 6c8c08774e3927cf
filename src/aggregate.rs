use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::draws::DerivedDrawInfo;
use crate::entries::{new_draw_record, seeding_for_draw, AnnotationOptions, ParticipantIndex};
use crate::identity::{RelevantParticipant, RelevantParticipantIds};
use crate::matchups::ContextMatchUp;
use crate::schedule::scheduled_date_of;
use crate::store::{
    EventRecord, MatchUpScheduleSummary, MatchUpSummary, OpponentEncounter, OpponentInfo, ParticipantAggregate,
    ParticipantStore, ScheduleItem, StructureParticipation,
};
use crate::types::{Event, MatchUpType, ParticipantType, Tournament};

#[derive(Debug, Clone, Copy, Default)]
pub struct AggregationOptions {
    pub with_ranking_profile: bool,
    pub annotation: AnnotationOptions,
}

/// Width of a finishing position range; narrower is a more specific finish.
pub fn range_diff(range: [u32; 2]) -> u32 {
    range[0].abs_diff(range[1])
}

/// Replaces `current` only with a strictly narrower range.
pub fn narrow_range(current: &mut Option<[u32; 2]>, candidate: [u32; 2]) {
    match current {
        Some(existing) if range_diff(candidate) >= range_diff(*existing) => {}
        _ => *current = Some(candidate),
    }
}

/// Folds one decided matchUp into a structure participation record.
///
/// Finishing round 1 is the final of the structure, so the smallest finishing
/// round is the deepest run; winning that final marks `participant_won`.
pub fn add_structure_participation(
    participation: &mut StructureParticipation,
    match_up: &ContextMatchUp,
    side_number: u8,
) {
    let Some(winning_side) = match_up.winning_side else {
        return;
    };
    let won = winning_side == side_number;
    if won {
        participation.win_count += 1;
        if match_up.match_up_status.is_walkover() {
            participation.walkover_win_count += 1;
        }
        if match_up.match_up_status.is_default() {
            participation.default_win_count += 1;
        }
    }

    if let Some(range) = match_up.range_for_side(side_number) {
        narrow_range(&mut participation.finishing_position_range, range);
    }

    if let Some(finishing_round) = match_up.finishing_round {
        let deeper = participation
            .finishing_round
            .map(|current| finishing_round < current)
            .unwrap_or(true);
        if deeper {
            participation.finishing_round = Some(finishing_round);
            participation.round_number = match_up.round_number;
        }
        if finishing_round == 1 && won {
            participation.participant_won = true;
        }
    }
}

struct Traversal<'a> {
    events: HashMap<&'a str, &'a Event>,
    participants: &'a ParticipantIndex<'a>,
    relevant_ids: &'a RelevantParticipantIds,
    draw_info: &'a BTreeMap<String, DerivedDrawInfo>,
    options: AggregationOptions,
}

/// Folds every in-context matchUp into the aggregates of its relevant participants.
pub fn aggregate_match_ups(
    tournament: &Tournament,
    match_ups: &[ContextMatchUp],
    participants: &ParticipantIndex<'_>,
    relevant_ids: &RelevantParticipantIds,
    draw_info: &BTreeMap<String, DerivedDrawInfo>,
    store: &mut ParticipantStore,
    options: AggregationOptions,
) {
    let traversal = Traversal {
        events: tournament
            .events
            .iter()
            .map(|event| (event.event_id.as_str(), event))
            .collect(),
        participants,
        relevant_ids,
        draw_info,
        options,
    };
    for match_up in match_ups {
        traversal.process_match_up(match_up, store);
        traversal.process_potential(match_up, store);
    }
}

impl<'a> Traversal<'a> {
    fn accepted(&self, match_up: &ContextMatchUp, side_number: u8) -> Vec<RelevantParticipant> {
        match_up
            .side(side_number)
            .map(|side| self.relevant_ids.for_side(side))
            .unwrap_or_default()
            .into_iter()
            .filter(|relevant| match_up.match_up_type.accepts(relevant.participant_type))
            .collect()
    }

    fn aggregate_for<'s>(
        &self,
        store: &'s mut ParticipantStore,
        match_up: &ContextMatchUp,
        relevant_id: &str,
    ) -> Option<&'s mut ParticipantAggregate> {
        let aggregate = store.get_mut(relevant_id);
        if aggregate.is_none() && self.options.annotation.diagnostics {
            debug!(
                "matchUp {} references unknown participant {relevant_id}",
                match_up.match_up_id
            );
        }
        aggregate
    }

    /// Draw and event context for a participant first seen through a matchUp.
    /// Seeding and positions come from the side's entered participant, as they
    /// would for a draw entry.
    fn ensure_draw_context(
        &self,
        aggregate: &mut ParticipantAggregate,
        match_up: &ContextMatchUp,
        entered_id: &str,
    ) {
        let Some(event) = self.events.get(match_up.event_id.as_str()) else {
            return;
        };
        if !aggregate.draws.contains_key(&match_up.draw_id) {
            let seeding = seeding_for_draw(
                self.participants.get(entered_id).copied(),
                event,
                event.draw_definition(&match_up.draw_id),
                &match_up.draw_id,
                self.options.annotation,
            );
            let record = new_draw_record(
                self.draw_info.get(&match_up.draw_id),
                &match_up.draw_id,
                event,
                entered_id,
                None,
                seeding,
            );
            aggregate.draws.insert(match_up.draw_id.clone(), record);
        }
        aggregate
            .events
            .entry(match_up.event_id.clone())
            .or_insert_with(|| EventRecord {
                event_id: event.event_id.clone(),
                event_name: event.event_name.clone(),
                event_type: event.event_type,
                ..Default::default()
            })
            .add_draw_id(&match_up.draw_id);
    }

    fn summary(
        &self,
        match_up: &ContextMatchUp,
        side_number: Option<u8>,
        opponents: &[RelevantParticipant],
        partner: Option<&RelevantParticipant>,
        potential: bool,
    ) -> MatchUpSummary {
        let schedule = match_up.schedule.is_scheduled().then(|| MatchUpScheduleSummary {
            scheduled_date: scheduled_date_of(&match_up.schedule),
            scheduled_time: match_up.schedule.scheduled_time.clone(),
            court_id: match_up.schedule.court_id.clone(),
            schedule_conflict: None,
        });
        MatchUpSummary {
            match_up_id: match_up.match_up_id.clone(),
            event_id: match_up.event_id.clone(),
            draw_id: match_up.draw_id.clone(),
            structure_id: match_up.structure_id.clone(),
            match_up_type: match_up.match_up_type,
            match_up_status: match_up.match_up_status,
            round_number: match_up.round_number,
            collection_id: match_up.collection_id.clone(),
            match_up_tie_id: match_up.match_up_tie_id.clone(),
            side_number,
            participant_won: side_number
                .and_then(|side| match_up.winning_side.map(|winning| winning == side)),
            finishing_position_range: side_number.and_then(|side| match_up.range_for_side(side)),
            finishing_round: match_up.finishing_round,
            perspective_score_string: side_number
                .and_then(|side| match_up.score.as_ref().and_then(|score| score.for_side(side))),
            opponent_participant_info: opponents
                .iter()
                .map(|opponent| OpponentInfo {
                    participant_id: opponent.relevant_participant_id.clone(),
                    participant_type: opponent.participant_type,
                })
                .collect(),
            partner_participant_id: partner.map(|p| p.relevant_participant_id.clone()),
            schedule,
            potential,
        }
    }

    fn schedule_item(&self, match_up: &ContextMatchUp, potential: bool) -> Option<ScheduleItem> {
        if !match_up.schedule.is_scheduled() {
            return None;
        }
        Some(ScheduleItem {
            scheduled_date: scheduled_date_of(&match_up.schedule),
            scheduled_time: match_up.schedule.scheduled_time.clone(),
            time_after_recovery: match_up.schedule.time_after_recovery.clone(),
            type_change_time_after_recovery: match_up.schedule.type_change_time_after_recovery.clone(),
            match_up_type: match_up.match_up_type,
            match_up_status: match_up.match_up_status,
            match_up_id: match_up.match_up_id.clone(),
            match_up_tie_id: match_up.match_up_tie_id.clone(),
            draw_id: match_up.draw_id.clone(),
            structure_id: match_up.structure_id.clone(),
            potential,
            score_has_value: match_up.score_has_value(),
        })
    }

    fn process_match_up(&self, match_up: &ContextMatchUp, store: &mut ParticipantStore) {
        for side in &match_up.sides {
            let Some(entered_id) = side.participant_id.as_deref() else {
                continue;
            };
            if side.side_number == 0 {
                continue;
            }
            let side_number = side.side_number;
            let relevant = self.accepted(match_up, side_number);
            let opposing = match_up
                .opposing_side(side_number)
                .map(|opposing| self.accepted(match_up, opposing.side_number))
                .unwrap_or_default();
            let won = match_up.winning_side.map(|winning| winning == side_number);

            for participant in &relevant {
                let relevant_id = participant.relevant_participant_id.as_str();
                let partner = (match_up.match_up_type == MatchUpType::Doubles
                    && participant.participant_type == ParticipantType::Individual)
                    .then(|| {
                        relevant.iter().find(|other| {
                            other.participant_type == ParticipantType::Individual
                                && other.relevant_participant_id != relevant_id
                        })
                    })
                    .flatten();
                let opponents: Vec<RelevantParticipant> = opposing
                    .iter()
                    .filter(|opponent| opponent.participant_type == participant.participant_type)
                    .cloned()
                    .collect();

                let summary = self.summary(match_up, Some(side_number), &opponents, partner, false);
                let schedule_item = self.schedule_item(match_up, false);
                let Some(aggregate) = self.aggregate_for(store, match_up, relevant_id) else {
                    continue;
                };

                self.ensure_draw_context(aggregate, match_up, entered_id);

                for opponent in &opponents {
                    aggregate
                        .opponents
                        .entry(opponent.relevant_participant_id.clone())
                        .or_default()
                        .push(OpponentEncounter {
                            match_up_id: match_up.match_up_id.clone(),
                            event_id: match_up.event_id.clone(),
                            draw_id: match_up.draw_id.clone(),
                            structure_id: match_up.structure_id.clone(),
                            participant_won: won,
                        });
                }

                aggregate.match_ups.insert(match_up.match_up_id.clone(), summary);
                if let Some(item) = schedule_item {
                    aggregate.schedule_items.push(item);
                }

                if let Some(won) = won {
                    aggregate
                        .counters
                        .record(match_up.match_up_type, won, match_up.match_up_status);
                }

                if let Some(range) = match_up.range_for_side(side_number) {
                    if let Some(draw) = aggregate.draws.get_mut(&match_up.draw_id) {
                        narrow_range(&mut draw.finishing_position_range, range);
                    }
                }

                if self.options.with_ranking_profile && match_up.is_decided() {
                    let participation = aggregate
                        .structure_participation
                        .entry(match_up.structure_id.clone())
                        .or_insert_with(|| {
                            StructureParticipation::new(
                                &match_up.structure_id,
                                &match_up.draw_id,
                                match_up.stage,
                            )
                        });
                    add_structure_participation(participation, match_up, side_number);
                }
            }
        }
    }

    fn process_potential(&self, match_up: &ContextMatchUp, store: &mut ParticipantStore) {
        if match_up.potential_participant_ids.is_empty() {
            return;
        }
        let placed: Vec<RelevantParticipant> = match_up
            .sides
            .iter()
            .flat_map(|side| self.relevant_ids.for_side(side))
            .filter(|relevant| match_up.match_up_type.accepts(relevant.participant_type))
            .collect();

        for potential_id in &match_up.potential_participant_ids {
            for participant in self.relevant_ids.for_participant(potential_id) {
                if !match_up.match_up_type.accepts(participant.participant_type) {
                    continue;
                }
                let relevant_id = participant.relevant_participant_id.as_str();
                let opponents: Vec<RelevantParticipant> = placed
                    .iter()
                    .filter(|opponent| opponent.participant_type == participant.participant_type)
                    .cloned()
                    .collect();
                let summary = self.summary(match_up, None, &opponents, None, true);
                let schedule_item = self.schedule_item(match_up, true);
                let Some(aggregate) = self.aggregate_for(store, match_up, relevant_id) else {
                    continue;
                };
                aggregate
                    .potential_match_ups
                    .insert(match_up.match_up_id.clone(), summary);
                if let Some(item) = schedule_item {
                    aggregate.schedule_items.push(item);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draws::derive_draw_info;
    use crate::entries::participant_index;
    use crate::matchups::all_match_ups_in_context;
    use crate::test_support::*;
    use crate::types::{
        DrawDefinition, FinishingPositionRange, MatchUpSchedule, MatchUpStatus, Side, Stage,
    };
    use serde_json::json;

    fn run(tournament: &Tournament, options: AggregationOptions) -> ParticipantStore {
        let participants = participant_index(tournament);
        let relevant = RelevantParticipantIds::build(tournament.participants());
        let info = derive_draw_info(tournament);
        let match_ups = all_match_ups_in_context(tournament);
        let mut store = ParticipantStore::initialize(tournament.participants());
        aggregate_match_ups(tournament, &match_ups, &participants, &relevant, &info, &mut store, options);
        store
    }

    fn side(side_number: u8, participant_id: &str, members: &[&str]) -> Side {
        Side {
            side_number,
            participant_id: Some(participant_id.to_string()),
            individual_participant_ids: members.iter().map(|id| id.to_string()).collect(),
            ..Side::default()
        }
    }

    fn team_fixture() -> Tournament {
        let mut team_match = match_up("TM1");
        team_match.match_up_type = Some(MatchUpType::Team);
        team_match.sides = vec![side(1, "T1", &[]), side(2, "T2", &[])];
        team_match.winning_side = Some(1);

        let mut doubles = match_up("TM1-D");
        doubles.match_up_type = Some(MatchUpType::Doubles);
        doubles.sides = vec![side(1, "XY", &["X", "Y"]), side(2, "ZW", &["Z", "W"])];
        doubles.winning_side = Some(1);
        doubles.score = Some(crate::types::Score {
            score_string_side1: Some("6-3 6-4".to_string()),
            score_string_side2: Some("3-6 4-6".to_string()),
        });

        let mut singles = match_up("TM1-S");
        singles.match_up_type = Some(MatchUpType::Singles);
        singles.sides = vec![side(1, "X", &[]), side(2, "Z", &[])];
        singles.winning_side = Some(2);
        singles.match_up_status = MatchUpStatus::Walkover;
        team_match.tie_match_ups = vec![doubles, singles];

        let mut s = structure("S1");
        s.match_ups.push(team_match);
        let mut ev = event("E1", MatchUpType::Team);
        ev.draw_definitions.push(DrawDefinition {
            draw_id: "D1".to_string(),
            draw_name: None,
            draw_type: None,
            category: None,
            entries: Vec::new(),
            structures: vec![s],
        });
        tournament(
            vec![
                individual("X"),
                individual("Y"),
                individual("Z"),
                individual("W"),
                composite("T1", ParticipantType::Team, &["X", "Y"]),
                composite("T2", ParticipantType::Team, &["Z", "W"]),
                composite("XY", ParticipantType::Pair, &["X", "Y"]),
            ],
            vec![ev],
        )
    }

    #[test]
    fn test_doubles_tie_records_partners() {
        let store = run(&team_fixture(), AggregationOptions::default());
        let x = store.get("X").unwrap();
        let y = store.get("Y").unwrap();
        assert_eq!(x.match_ups["TM1-D"].partner_participant_id.as_deref(), Some("Y"));
        assert_eq!(y.match_ups["TM1-D"].partner_participant_id.as_deref(), Some("X"));
        assert_eq!(x.match_ups["TM1-D"].perspective_score_string.as_deref(), Some("6-3 6-4"));
    }

    #[test]
    fn test_team_match_up_summarised_only_for_team() {
        let store = run(&team_fixture(), AggregationOptions::default());
        assert!(store.get("T1").unwrap().match_ups.contains_key("TM1"));
        assert!(!store.get("X").unwrap().match_ups.contains_key("TM1"));
        assert!(!store.get("T1").unwrap().match_ups.contains_key("TM1-D"));

        let pair = store.get("XY").unwrap();
        assert_eq!(pair.match_ups["TM1-D"].match_up_type, MatchUpType::Doubles);
        assert_eq!(pair.counters.doubles.wins, 1);
        assert_eq!(store.get("T1").unwrap().counters.team.wins, 1);
        assert_eq!(store.get("T2").unwrap().counters.team.losses, 1);
        assert_eq!(store.get("X").unwrap().counters.team, Default::default());
    }

    #[test]
    fn test_opponents_match_perspective_type() {
        let store = run(&team_fixture(), AggregationOptions::default());
        let x = store.get("X").unwrap();
        assert!(x.opponents.contains_key("Z"));
        assert!(x.opponents.contains_key("W"));
        assert!(!x.opponents.contains_key("ZW"));
        let t1 = store.get("T1").unwrap();
        assert_eq!(t1.opponents.keys().collect::<Vec<_>>(), vec!["T2"]);
        // ZW has no participant record; encounters against it are still keyed.
        assert!(store.get("XY").unwrap().opponents.contains_key("ZW"));
    }

    #[test]
    fn test_walkover_win_counters_mirrored() {
        let store = run(&team_fixture(), AggregationOptions::default());
        let z = store.get("Z").unwrap();
        assert_eq!(z.counters.singles.wins, 1);
        assert_eq!(z.counters.singles.walkover_wins, 1);
        assert_eq!(z.counters.total.walkover_wins, 1);
        assert_eq!(z.counters.total.wins, 1);
        assert_eq!(z.counters.total.losses, 1);
        assert_eq!(store.get("X").unwrap().counters.singles.losses, 1);
    }

    #[test]
    fn test_dynamic_pair_draw_context_created_on_first_sight() {
        let store = run(&team_fixture(), AggregationOptions::default());
        let xy = store.get("XY").unwrap();
        assert_eq!(xy.draws["D1"].event_id, "E1");
        assert_eq!(xy.events["E1"].draw_ids, vec!["D1"]);
    }

    #[test]
    fn test_members_first_seen_in_match_up_take_pair_seeding() {
        let mut t = team_fixture();
        if let Some(participants) = t.participants.as_mut() {
            for participant in participants.iter_mut() {
                let seed = if participant.participant_id == "XY" { 2 } else { 7 };
                participant
                    .time_items
                    .push(seeding_item(MatchUpType::Team, "E1", json!(seed)));
            }
        }
        let options = AggregationOptions {
            with_ranking_profile: false,
            annotation: AnnotationOptions {
                with_seeding: true,
                use_publish_state: false,
                diagnostics: false,
            },
        };
        let store = run(&t, options);
        assert_eq!(store.get("XY").unwrap().draws["D1"].seed_value, Some(json!(2)));
        assert_eq!(store.get("X").unwrap().draws["D1"].seed_value, Some(json!(2)));
        assert_eq!(store.get("Y").unwrap().draws["D1"].seed_value, Some(json!(2)));
    }

    fn elimination_fixture() -> Tournament {
        let mut s = structure("S1");
        s.position_assignments = vec![
            assignment(1, Some("A")),
            assignment(2, Some("B")),
            assignment(3, Some("C")),
            assignment(4, Some("D")),
        ];
        let mut sf1 = match_up("SF1");
        sf1.round_number = Some(1);
        sf1.finishing_round = Some(2);
        sf1.draw_positions = vec![Some(1), Some(2)];
        sf1.winning_side = Some(1);
        sf1.winner_match_up_id = Some("F".to_string());
        sf1.finishing_position_range = Some(FinishingPositionRange {
            winner: [1, 2],
            loser: [3, 4],
        });
        let mut sf2 = match_up("SF2");
        sf2.round_number = Some(1);
        sf2.finishing_round = Some(2);
        sf2.draw_positions = vec![Some(3), Some(4)];
        sf2.winner_match_up_id = Some("F".to_string());
        sf2.schedule = Some(MatchUpSchedule {
            scheduled_date: Some("2024-05-01".to_string()),
            scheduled_time: Some("10:00".to_string()),
            ..MatchUpSchedule::default()
        });
        let mut final_match = match_up("F");
        final_match.round_number = Some(2);
        final_match.finishing_round = Some(1);
        final_match.sides = vec![
            serde_json::from_value(json!({ "sideNumber": 1, "participantId": "A" })).unwrap(),
            serde_json::from_value(json!({ "sideNumber": 2 })).unwrap(),
        ];
        final_match.finishing_position_range = Some(FinishingPositionRange {
            winner: [1, 1],
            loser: [2, 2],
        });
        final_match.schedule = Some(MatchUpSchedule {
            scheduled_date: Some("2024-05-01".to_string()),
            scheduled_time: Some("14:00".to_string()),
            ..MatchUpSchedule::default()
        });
        s.match_ups = vec![sf1, sf2, final_match];

        let mut ev = event("E1", MatchUpType::Singles);
        ev.draw_definitions.push(DrawDefinition {
            draw_id: "D1".to_string(),
            draw_name: None,
            draw_type: None,
            category: None,
            entries: Vec::new(),
            structures: vec![s],
        });
        tournament(
            vec![individual("A"), individual("B"), individual("C"), individual("D")],
            vec![ev],
        )
    }

    #[test]
    fn test_potential_match_ups_recorded_separately() {
        let store = run(&elimination_fixture(), AggregationOptions::default());
        let c = store.get("C").unwrap();
        assert!(c.potential_match_ups["F"].potential);
        assert!(!c.match_ups.contains_key("F"));
        let potential_items: Vec<_> = c.schedule_items.iter().filter(|item| item.potential).collect();
        assert_eq!(potential_items.len(), 1);
        assert_eq!(potential_items[0].match_up_id, "F");
        assert!(store.get("A").unwrap().potential_match_ups.is_empty());
    }

    #[test]
    fn test_structure_participation_narrowing() {
        let mut t = elimination_fixture();
        let final_match = &mut t.events[0].draw_definitions[0].structures[0].match_ups[2];
        final_match.sides[1].participant_id = Some("C".to_string());
        final_match.winning_side = Some(1);
        let options = AggregationOptions {
            with_ranking_profile: true,
            ..AggregationOptions::default()
        };
        let store = run(&t, options);

        let a = &store.get("A").unwrap().structure_participation["S1"];
        assert_eq!(a.win_count, 2);
        assert_eq!(a.finishing_position_range, Some([1, 1]));
        assert_eq!(a.finishing_round, Some(1));
        assert_eq!(a.round_number, Some(2));
        assert!(a.participant_won);
        assert_eq!(a.ranking_stage, Stage::Main);

        let b = &store.get("B").unwrap().structure_participation["S1"];
        assert_eq!(b.finishing_position_range, Some([3, 4]));
        assert!(!b.participant_won);

        let c = &store.get("C").unwrap().structure_participation["S1"];
        assert_eq!(c.finishing_position_range, Some([2, 2]));
        assert!(!c.participant_won);
        assert_eq!(store.get("A").unwrap().draws["D1"].finishing_position_range, Some([1, 1]));
    }

    #[test]
    fn test_narrowing_is_monotonic() {
        let mut current = None;
        let mut last_diff = u32::MAX;
        for range in [[1, 8], [1, 4], [5, 8], [1, 16], [2, 2], [1, 2]] {
            narrow_range(&mut current, range);
            let diff = range_diff(current.unwrap());
            assert!(diff <= last_diff);
            last_diff = diff;
        }
        assert_eq!(current, Some([2, 2]));
    }
}
