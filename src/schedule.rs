use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::collections::BTreeMap;

use crate::store::{ParticipantAggregate, ScheduleConflict, ScheduleItem};
use crate::types::{MatchUpSchedule, MatchUpStatus};

const DATE_FORMAT: &str = "%Y-%m-%d";

fn parse_date_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

/// Clock time of a schedule value: `HH:MM`, `HH:MM:SS` or a date-time.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    ["%H:%M:%S", "%H:%M"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
        .or_else(|| parse_date_time(trimmed).map(|dt| dt.time()))
}

fn minutes_of_day(time: NaiveTime) -> f64 {
    f64::from(time.num_seconds_from_midnight()) / 60.0
}

/// Calendar date of a schedule; a date-time `scheduledTime` supplies it when
/// `scheduledDate` is absent.
pub fn scheduled_date_of(schedule: &MatchUpSchedule) -> Option<String> {
    if let Some(date) = schedule.scheduled_date.as_deref() {
        let normalized = date
            .get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, DATE_FORMAT).ok())
            .map(|d| d.format(DATE_FORMAT).to_string());
        return normalized.or_else(|| Some(date.to_string()));
    }
    schedule
        .scheduled_time
        .as_deref()
        .and_then(parse_date_time)
        .map(|dt| dt.date().format(DATE_FORMAT).to_string())
}

/// Byes and unscored walkovers/defaults never occupied a court.
fn occupies_court(item: &ScheduleItem) -> bool {
    match item.match_up_status {
        MatchUpStatus::Bye => false,
        status if status.is_walkover() || status.is_default() => item.score_has_value,
        _ => true,
    }
}

const MINUTES_PER_DAY: f64 = 1440.0;

struct Timed<'a> {
    item: &'a ScheduleItem,
    minutes: f64,
}

/// Minutes after the start of the earlier item's day before which the later
/// item may not start. A bare clock time earlier than the start rolls into
/// the next day; a date-time is measured from the item's own date.
fn not_before(earlier: &Timed<'_>, later: &ScheduleItem) -> Option<f64> {
    let raw = if earlier.item.match_up_type != later.match_up_type {
        earlier
            .item
            .type_change_time_after_recovery
            .as_deref()
            .or(earlier.item.time_after_recovery.as_deref())
    } else {
        earlier.item.time_after_recovery.as_deref()
    };
    let raw = raw?;

    if let Some(recovery) = parse_date_time(raw) {
        let days = earlier
            .item
            .scheduled_date
            .as_deref()
            .and_then(|date| NaiveDate::parse_from_str(date, DATE_FORMAT).ok())
            .map(|date| (recovery.date() - date).num_days())
            .unwrap_or(0);
        return Some(days as f64 * MINUTES_PER_DAY + minutes_of_day(recovery.time()));
    }
    let minutes = parse_time(raw).map(minutes_of_day)?;
    Some(if minutes < earlier.minutes {
        minutes + MINUTES_PER_DAY
    } else {
        minutes
    })
}

fn overlaps(earlier: &Timed<'_>, later: &Timed<'_>, threshold: Option<f64>) -> bool {
    match threshold {
        Some(threshold) => later.minutes - earlier.minutes <= threshold,
        None => not_before(earlier, later.item)
            .map(|limit| later.minutes < limit)
            .unwrap_or(false),
    }
}

/// Ties of one team matchUp share its court commitment.
fn same_team_match_up(a: &ScheduleItem, b: &ScheduleItem) -> bool {
    a.match_up_tie_id.is_some() && a.match_up_tie_id == b.match_up_tie_id
}

/// Pairwise schedule overlaps for one participant's items.
///
/// Pairs are only compared forward in time within a date, so the prior id of
/// each conflict is always the earlier matchUp.
pub fn detect_conflicts(items: &[ScheduleItem], threshold: Option<f64>) -> Vec<ScheduleConflict> {
    let mut by_date: BTreeMap<Option<&str>, Vec<Timed<'_>>> = BTreeMap::new();
    for item in items {
        if !occupies_court(item) {
            continue;
        }
        let Some(time) = item.scheduled_time.as_deref().and_then(parse_time) else {
            continue;
        };
        by_date
            .entry(item.scheduled_date.as_deref())
            .or_default()
            .push(Timed {
                item,
                minutes: minutes_of_day(time),
            });
    }

    let mut conflicts = Vec::new();
    for timed in by_date.values_mut() {
        timed.sort_by(|a, b| a.minutes.total_cmp(&b.minutes));
        for (idx, earlier) in timed.iter().enumerate() {
            for later in &timed[idx + 1..] {
                if earlier.item.match_up_id == later.item.match_up_id
                    || same_team_match_up(earlier.item, later.item)
                {
                    continue;
                }
                let same_draw_futures = earlier.item.potential
                    && later.item.potential
                    && earlier.item.draw_id == later.item.draw_id;
                if same_draw_futures || !overlaps(earlier, later, threshold) {
                    continue;
                }
                let conflict = ScheduleConflict {
                    prior_scheduled_match_up_id: earlier.item.match_up_id.clone(),
                    match_up_id_with_conflict: later.item.match_up_id.clone(),
                };
                if !conflicts.contains(&conflict) {
                    conflicts.push(conflict);
                }
            }
        }
    }
    conflicts
}

/// Records conflicts on the aggregate and marks each conflicted matchUp summary.
pub fn apply_schedule_conflicts(aggregate: &mut ParticipantAggregate, threshold: Option<f64>) {
    let conflicts = detect_conflicts(&aggregate.schedule_items, threshold);
    for conflict in &conflicts {
        let summary = aggregate
            .match_ups
            .get_mut(&conflict.match_up_id_with_conflict)
            .or_else(|| aggregate.potential_match_ups.get_mut(&conflict.match_up_id_with_conflict));
        if let Some(schedule) = summary.and_then(|summary| summary.schedule.as_mut()) {
            schedule.schedule_conflict = Some(conflict.prior_scheduled_match_up_id.clone());
        }
    }
    aggregate.schedule_conflicts = conflicts;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MatchUpType;

    fn item(match_up_id: &str, time: &str) -> ScheduleItem {
        ScheduleItem {
            scheduled_date: Some("2024-05-01".to_string()),
            scheduled_time: Some(time.to_string()),
            time_after_recovery: None,
            type_change_time_after_recovery: None,
            match_up_type: MatchUpType::Singles,
            match_up_status: MatchUpStatus::ToBePlayed,
            match_up_id: match_up_id.to_string(),
            match_up_tie_id: None,
            draw_id: "D1".to_string(),
            structure_id: "S1".to_string(),
            potential: false,
            score_has_value: false,
        }
    }

    fn with_recovery(mut item: ScheduleItem, recovery: &str) -> ScheduleItem {
        item.time_after_recovery = Some(recovery.to_string());
        item
    }

    #[test]
    fn test_overlap_before_recovery_is_conflict() {
        let items = vec![
            with_recovery(item("matchUp1", "10:00"), "11:00"),
            item("matchUp2", "10:30"),
        ];
        let conflicts = detect_conflicts(&items, None);
        assert_eq!(
            conflicts,
            vec![ScheduleConflict {
                prior_scheduled_match_up_id: "matchUp1".to_string(),
                match_up_id_with_conflict: "matchUp2".to_string(),
            }]
        );
    }

    #[test]
    fn test_bye_never_conflicts() {
        let mut bye = item("matchUp2", "10:30");
        bye.match_up_status = MatchUpStatus::Bye;
        let items = vec![with_recovery(item("matchUp1", "10:00"), "11:00"), bye];
        assert!(detect_conflicts(&items, None).is_empty());
    }

    #[test]
    fn test_unscored_walkover_excluded_but_scored_default_kept() {
        let mut walkover = item("matchUp2", "10:30");
        walkover.match_up_status = MatchUpStatus::Walkover;
        let items = vec![with_recovery(item("matchUp1", "10:00"), "11:00"), walkover.clone()];
        assert!(detect_conflicts(&items, None).is_empty());

        let mut defaulted = walkover;
        defaulted.match_up_status = MatchUpStatus::Defaulted;
        defaulted.score_has_value = true;
        let items = vec![with_recovery(item("matchUp1", "10:00"), "11:00"), defaulted];
        assert_eq!(detect_conflicts(&items, None).len(), 1);
    }

    #[test]
    fn test_threshold_mode_ignores_recovery() {
        let items = vec![item("matchUp1", "10:00"), item("matchUp2", "11:00")];
        assert_eq!(detect_conflicts(&items, Some(60.0)).len(), 1);
        assert!(detect_conflicts(&items, Some(59.0)).is_empty());
        assert!(detect_conflicts(&items, None).is_empty());
    }

    #[test]
    fn test_type_change_uses_type_change_recovery() {
        let mut singles = with_recovery(item("matchUp1", "10:00"), "10:30");
        singles.type_change_time_after_recovery = Some("11:30".to_string());
        let mut doubles = item("matchUp2", "11:00");
        doubles.match_up_type = MatchUpType::Doubles;
        assert_eq!(detect_conflicts(&[singles.clone(), doubles], None).len(), 1);

        let same_type = item("matchUp3", "11:00");
        assert!(detect_conflicts(&[singles, same_type], None).is_empty());
    }

    #[test]
    fn test_same_draw_potential_items_never_conflict() {
        let mut first = with_recovery(item("F1", "10:00"), "12:00");
        first.potential = true;
        let mut second = item("F2", "10:30");
        second.potential = true;
        assert!(detect_conflicts(&[first.clone(), second.clone()], None).is_empty());

        second.draw_id = "D2".to_string();
        assert_eq!(detect_conflicts(&[first, second], None).len(), 1);
    }

    #[test]
    fn test_pairs_reported_forward_in_time() {
        let items = vec![
            item("late", "15:00"),
            with_recovery(item("early", "09:00"), "16:00"),
            with_recovery(item("middle", "12:00"), "16:00"),
        ];
        let conflicts = detect_conflicts(&items, None);
        assert_eq!(conflicts.len(), 3);
        let minutes = |id: &str| {
            let found = items.iter().find(|i| i.match_up_id == id).unwrap();
            parse_time(found.scheduled_time.as_deref().unwrap()).unwrap()
        };
        for conflict in &conflicts {
            assert!(
                minutes(&conflict.prior_scheduled_match_up_id)
                    <= minutes(&conflict.match_up_id_with_conflict)
            );
        }
    }

    #[test]
    fn test_items_on_other_dates_are_independent() {
        let mut next_day = item("matchUp2", "10:30");
        next_day.scheduled_date = Some("2024-05-02".to_string());
        let items = vec![with_recovery(item("matchUp1", "10:00"), "11:00"), next_day];
        assert!(detect_conflicts(&items, None).is_empty());
    }

    #[test]
    fn test_recovery_past_midnight_carries_over() {
        let items = vec![
            with_recovery(item("late", "23:00"), "00:30"),
            item("later", "23:45"),
        ];
        assert_eq!(detect_conflicts(&items, None).len(), 1);

        let items = vec![
            with_recovery(item("late", "23:00"), "2024-05-02T00:30"),
            item("later", "23:45"),
        ];
        assert_eq!(detect_conflicts(&items, None).len(), 1);

        let items = vec![
            with_recovery(item("late", "22:00"), "2024-05-01T23:00"),
            item("later", "23:45"),
        ];
        assert!(detect_conflicts(&items, None).is_empty());
    }

    #[test]
    fn test_ties_of_one_team_match_up_never_conflict() {
        let mut doubles = with_recovery(item("TM1-D", "10:00"), "11:30");
        doubles.match_up_tie_id = Some("TM1".to_string());
        let mut singles = item("TM1-S", "10:00");
        singles.match_up_tie_id = Some("TM1".to_string());
        assert!(detect_conflicts(&[doubles.clone(), singles.clone()], None).is_empty());
        assert!(detect_conflicts(&[doubles.clone(), singles.clone()], Some(30.0)).is_empty());

        singles.match_up_tie_id = Some("TM2".to_string());
        assert_eq!(detect_conflicts(&[doubles, singles], Some(30.0)).len(), 1);
    }

    #[test]
    fn test_date_time_values_parse() {
        assert_eq!(parse_time("2024-05-01T10:15"), NaiveTime::from_hms_opt(10, 15, 0));
        assert_eq!(parse_time("2024-05-01T10:15:00Z"), NaiveTime::from_hms_opt(10, 15, 0));
        assert_eq!(parse_time("09:05:30"), NaiveTime::from_hms_opt(9, 5, 30));
        assert_eq!(parse_time(""), None);

        let schedule = MatchUpSchedule {
            scheduled_time: Some("2024-05-01T10:15".to_string()),
            ..MatchUpSchedule::default()
        };
        assert_eq!(scheduled_date_of(&schedule).as_deref(), Some("2024-05-01"));
    }

    #[test]
    fn test_conflicts_mark_match_up_summary() {
        use crate::store::{MatchUpScheduleSummary, MatchUpSummary};

        let mut aggregate = ParticipantAggregate::new("A");
        aggregate.schedule_items = vec![
            with_recovery(item("matchUp1", "10:00"), "11:00"),
            item("matchUp2", "10:30"),
        ];
        aggregate.match_ups.insert(
            "matchUp2".to_string(),
            MatchUpSummary {
                match_up_id: "matchUp2".to_string(),
                event_id: "E1".to_string(),
                draw_id: "D1".to_string(),
                structure_id: "S1".to_string(),
                match_up_type: MatchUpType::Singles,
                match_up_status: MatchUpStatus::ToBePlayed,
                round_number: None,
                collection_id: None,
                match_up_tie_id: None,
                side_number: Some(1),
                participant_won: None,
                finishing_position_range: None,
                finishing_round: None,
                perspective_score_string: None,
                opponent_participant_info: Vec::new(),
                partner_participant_id: None,
                schedule: Some(MatchUpScheduleSummary::default()),
                potential: false,
            },
        );
        apply_schedule_conflicts(&mut aggregate, None);
        assert_eq!(aggregate.schedule_conflicts.len(), 1);
        let schedule = aggregate.match_ups["matchUp2"].schedule.as_ref().unwrap();
        assert_eq!(schedule.schedule_conflict.as_deref(), Some("matchUp1"));
    }
}
