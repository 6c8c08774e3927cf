use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::aggregate::{aggregate_match_ups, AggregationOptions};
use crate::draws::{derive_draw_info, DerivedDrawInfo};
use crate::entries::{annotate_entries, participant_index, AnnotationOptions, ParticipantIndex};
use crate::error::{ParticipantsError, Result};
use crate::filter::{FilterIndex, ParticipantFilters};
use crate::identity::RelevantParticipantIds;
use crate::matchups::all_match_ups_in_context;
use crate::schedule::apply_schedule_conflicts;
use crate::store::{
    Counters, DrawRecord, EventRecord, MatchUpSummary, OpponentEncounter, ParticipantAggregate,
    ParticipantStore, ScheduleConflict, ScheduleItem, StructureParticipation, Tally,
};
use crate::types::{MatchUpType, Participant, Tournament};

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleAnalysis {
    pub scheduled_minutes_difference: Option<f64>,
}

/// Inclusion flags and options for one participants query.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ParticipantsQuery {
    pub with_events: bool,
    pub with_draws: bool,
    pub with_match_ups: bool,
    pub with_opponents: bool,
    pub with_potential_match_ups: bool,
    pub with_statistics: bool,
    pub with_seeding: bool,
    pub with_schedule_items: bool,
    pub with_ranking_profile: bool,
    pub with_individual_participants: bool,
    pub use_publish_state: bool,
    pub diagnostics: bool,
    pub schedule_analysis: Option<ScheduleAnalysis>,
    pub participant_filters: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistic {
    pub stat_code: String,
    pub numerator: u32,
    pub denominator: u32,
    pub stat_value: f64,
}

impl Statistic {
    fn win_ratio(stat_code: String, tally: &Tally) -> Self {
        let denominator = tally.decided();
        let stat_value = if denominator == 0 {
            0.0
        } else {
            f64::from(tally.wins) / f64::from(denominator)
        };
        Statistic {
            stat_code,
            numerator: tally.wins,
            denominator,
            stat_value,
        }
    }
}

/// Overall win ratio, then one per discipline that has decided matchUps.
pub fn win_ratios(counters: &Counters) -> Vec<Statistic> {
    let mut stats = vec![Statistic::win_ratio("winRatio".to_string(), &counters.total)];
    for match_up_type in [MatchUpType::Singles, MatchUpType::Doubles, MatchUpType::Team] {
        let tally = counters.discipline(match_up_type);
        if tally.decided() > 0 {
            stats.push(Statistic::win_ratio(
                format!("winRatio.{}", match_up_type.as_str()),
                tally,
            ));
        }
    }
    stats
}

/// Denormalized participant as returned to callers; each optional section is
/// gated by a query flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    #[serde(flatten)]
    pub participant: Participant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub individual_participants: Option<Vec<Participant>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<EventRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draws: Option<Vec<DrawRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_ups: Option<Vec<MatchUpSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub potential_match_ups: Option<Vec<MatchUpSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opponents: Option<BTreeMap<String, Vec<OpponentEncounter>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counters: Option<Counters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Vec<Statistic>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_items: Option<Vec<ScheduleItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_conflicts: Option<Vec<ScheduleConflict>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantsResult {
    pub participants: Vec<ParticipantView>,
    pub participant_map: BTreeMap<String, ParticipantAggregate>,
    pub derived_draw_info: BTreeMap<String, DerivedDrawInfo>,
    pub match_ups_count: usize,
}

/// Copies each participant's structure participation into its draw records in
/// the draw's structure order.
fn attach_structure_participation(
    store: &mut ParticipantStore,
    draw_info: &BTreeMap<String, DerivedDrawInfo>,
) {
    for aggregate in store.iter_mut() {
        let mut by_draw: BTreeMap<String, Vec<StructureParticipation>> = BTreeMap::new();
        for participation in aggregate.structure_participation.values() {
            by_draw
                .entry(participation.draw_id.clone())
                .or_default()
                .push(participation.clone());
        }
        for (draw_id, mut participation) in by_draw {
            if let Some(info) = draw_info.get(&draw_id) {
                participation.sort_by_key(|p| info.structure_order(&p.structure_id));
            }
            if let Some(draw) = aggregate.draws.get_mut(&draw_id) {
                draw.structure_participation = participation;
            }
        }
    }
}

fn build_view(
    participant: &Participant,
    aggregate: Option<&ParticipantAggregate>,
    participants: &ParticipantIndex<'_>,
    query: &ParticipantsQuery,
) -> ParticipantView {
    let section = |flag: bool| aggregate.filter(|_| flag);
    let individual_participants = (query.with_individual_participants
        && participant.participant_type.is_composite())
    .then(|| {
        participant
            .individual_participant_ids
            .iter()
            .filter_map(|id| participants.get(id.as_str()).map(|p| (*p).clone()))
            .collect()
    });

    ParticipantView {
        participant: participant.clone(),
        individual_participants,
        events: section(query.with_events).map(|agg| agg.events.values().cloned().collect()),
        draws: section(query.with_draws || query.with_ranking_profile)
            .map(|agg| agg.draws.values().cloned().collect()),
        match_ups: section(query.with_match_ups).map(|agg| agg.match_ups.values().cloned().collect()),
        potential_match_ups: section(query.with_potential_match_ups)
            .map(|agg| agg.potential_match_ups.values().cloned().collect()),
        opponents: section(query.with_opponents).map(|agg| agg.opponents.clone()),
        counters: section(query.with_statistics).map(|agg| agg.counters.clone()),
        statistics: section(query.with_statistics).map(|agg| win_ratios(&agg.counters)),
        schedule_items: section(query.with_schedule_items).map(|agg| agg.schedule_items.clone()),
        schedule_conflicts: section(query.schedule_analysis.is_some())
            .map(|agg| agg.schedule_conflicts.clone()),
    }
}

/// Derives per-participant views from a competition snapshot.
///
/// The pass is read-only over `tournament`; every aggregate is freshly
/// allocated, so repeated calls over the same snapshot return identical results.
pub fn get_participants(
    tournament: Option<&Tournament>,
    query: &ParticipantsQuery,
) -> Result<ParticipantsResult> {
    let tournament = tournament.ok_or(ParticipantsError::MissingTournamentRecord)?;
    let participant_list = tournament
        .participants
        .as_deref()
        .ok_or(ParticipantsError::MissingParticipants)?;
    let filters = query
        .participant_filters
        .as_ref()
        .map(ParticipantFilters::from_value)
        .transpose()?;

    let participants = participant_index(tournament);
    let relevant_ids = RelevantParticipantIds::build(participant_list);
    let derived_draw_info = derive_draw_info(tournament);
    let mut store = ParticipantStore::initialize(participant_list);

    let annotation = AnnotationOptions {
        with_seeding: query.with_seeding,
        use_publish_state: query.use_publish_state,
        diagnostics: query.diagnostics,
    };
    annotate_entries(
        tournament,
        &participants,
        &relevant_ids,
        &derived_draw_info,
        &mut store,
        annotation,
    );

    let match_ups = all_match_ups_in_context(tournament);
    aggregate_match_ups(
        tournament,
        &match_ups,
        &participants,
        &relevant_ids,
        &derived_draw_info,
        &mut store,
        AggregationOptions {
            with_ranking_profile: query.with_ranking_profile,
            annotation,
        },
    );

    if query.with_ranking_profile {
        attach_structure_participation(&mut store, &derived_draw_info);
    }

    if let Some(analysis) = &query.schedule_analysis {
        let threshold = analysis.scheduled_minutes_difference;
        for aggregate in store.iter_mut() {
            apply_schedule_conflicts(aggregate, threshold);
        }
    }

    let filter_index = filters
        .as_ref()
        .map(|filters| FilterIndex::build(filters, tournament, &relevant_ids, &derived_draw_info));

    let mut views = Vec::with_capacity(participant_list.len());
    for participant in participant_list {
        let view = build_view(
            participant,
            store.get(&participant.participant_id),
            &participants,
            query,
        );
        if let (Some(filters), Some(index)) = (&filters, &filter_index) {
            let view_value = serde_json::to_value(&view).unwrap_or(Value::Null);
            if !filters.matches(participant, &view_value, index) {
                continue;
            }
        }
        views.push(view);
    }

    if query.diagnostics {
        debug!(
            "relevant ids: {}, aggregates: {}, derived draws: {}",
            relevant_ids.len(),
            store.len(),
            derived_draw_info.len()
        );
    }
    info!(
        "Derived {} participants ({} returned) from {} matchUps",
        store.len(),
        views.len(),
        match_ups.len()
    );

    Ok(ParticipantsResult {
        participants: views,
        participant_map: store.into_map(),
        derived_draw_info,
        match_ups_count: match_ups.len(),
    })
}

/// Targeted lookup of one participant's view.
pub fn get_participant(
    tournament: Option<&Tournament>,
    participant_id: &str,
    query: &ParticipantsQuery,
) -> Result<ParticipantView> {
    let tournament = tournament.ok_or(ParticipantsError::MissingTournamentRecord)?;
    if participant_id.trim().is_empty() {
        return Err(ParticipantsError::MissingParticipantId);
    }
    if tournament.participants.is_some() && tournament.find_participant(participant_id).is_none() {
        return Err(ParticipantsError::ParticipantNotFound {
            participant_id: participant_id.to_string(),
        });
    }

    let query = ParticipantsQuery {
        participant_filters: None,
        ..query.clone()
    };
    let result = get_participants(Some(tournament), &query)?;
    result
        .participants
        .into_iter()
        .find(|view| view.participant.participant_id == participant_id)
        .ok_or_else(|| ParticipantsError::ParticipantNotFound {
            participant_id: participant_id.to_string(),
        })
}
