//! Slot normalization.
//!
//! Turns the backend's schedule containers into a flat list of uniform slot
//! records. Containers keep their source order, nested slots keep theirs; the
//! result is not sorted by time. A malformed slot is dropped and logged, it
//! never fails the batch.

use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{RawSlot, ScheduleContainer, ScheduleShape};

/// Day used when a slot carries neither a day field nor an ISO timestamp.
pub const UNKNOWN_DAY: &str = "TBD";

/// Time used when a slot with an explicit day has no start or end.
pub const DEFAULT_TIME: &str = "00:00";

/// A slot in its canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSlot {
    pub id: String,
    pub schedule_id: String,
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
    pub label: String,
}

/// Why a single slot could not be normalized.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("slot entry is not an object: {message}")]
    NotAnObject { message: String },

    #[error("unparseable timestamp {value:?}")]
    BadTimestamp { value: String },

    #[error("ISO start time {start:?} has no end time")]
    MissingEnd { start: String },
}

/// Day and clock times after resolving the slot's time encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SlotTimes {
    day: String,
    start: String,
    end: String,
}

/// Parses a list payload into containers, dropping entries that are not
/// container objects.
pub fn parse_containers(items: &[Value]) -> Vec<ScheduleContainer> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            serde_json::from_value::<ScheduleContainer>(item.clone())
                .inspect_err(|e| {
                    warn!(index, error = %e, "Dropping malformed schedule container");
                })
                .ok()
        })
        .collect()
}

/// Normalizes every slot of every container.
pub fn normalize_slots(containers: &[ScheduleContainer]) -> Vec<NormalizedSlot> {
    let slots: Vec<NormalizedSlot> = containers
        .iter()
        .enumerate()
        .flat_map(|(index, container)| normalize_container(index, container))
        .collect();

    let duplicates = duplicate_slot_ids(&slots);
    if !duplicates.is_empty() {
        warn!(
            count = duplicates.len(),
            ids = ?duplicates,
            "Normalized slots share ids; selection keys will collide"
        );
    }

    debug!(
        containers = containers.len(),
        slots = slots.len(),
        "Normalized schedule slots"
    );
    slots
}

/// Normalizes only the slots of containers for the given course. Containers
/// keep their position in the full list, so ids match [`normalize_slots`].
pub fn normalize_slots_for_course(
    containers: &[ScheduleContainer],
    course_id: &str,
) -> Vec<NormalizedSlot> {
    containers
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_for_course(course_id))
        .flat_map(|(index, c)| normalize_container(index, c))
        .collect()
}

/// Returns ids that appear more than once, in first-seen order.
///
/// Synthetic ids are derived from `(scheduleId, start, end)`, so two
/// identical slots in one container (or two id-less containers) collide.
pub fn duplicate_slot_ids(slots: &[NormalizedSlot]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut duplicates = Vec::new();

    for slot in slots {
        let count = seen.entry(slot.id.as_str()).or_insert(0);
        *count += 1;
        if *count == 2 {
            duplicates.push(slot.id.clone());
        }
    }

    duplicates
}

/// Slots of one container; `index` is its position in the source list and
/// names containers that have no id.
pub(crate) fn normalize_container(index: usize, container: &ScheduleContainer) -> Vec<NormalizedSlot> {
    let schedule_id = container
        .id
        .clone()
        .unwrap_or_else(|| format!("schedule-{index}"));

    match container.shape() {
        ScheduleShape::Nested(entries) => entries
            .iter()
            .enumerate()
            .filter_map(|(slot_index, entry)| {
                let result = serde_json::from_value::<RawSlot>(entry.clone())
                    .map_err(|e| SlotError::NotAnObject {
                        message: e.to_string(),
                    })
                    .and_then(|raw| normalize_raw_slot(&schedule_id, &raw));
                log_dropped(&schedule_id, slot_index, result)
            })
            .collect(),
        ScheduleShape::Flat(raw) => {
            log_dropped(&schedule_id, 0, normalize_raw_slot(&schedule_id, &raw))
                .into_iter()
                .collect()
        }
        ScheduleShape::Empty => Vec::new(),
    }
}

fn log_dropped(
    schedule_id: &str,
    slot_index: usize,
    result: Result<NormalizedSlot, SlotError>,
) -> Option<NormalizedSlot> {
    match result {
        Ok(slot) => Some(slot),
        Err(e) => {
            warn!(
                schedule_id = %schedule_id,
                slot_index,
                error = %e,
                "Dropping malformed slot"
            );
            None
        }
    }
}

/// Normalizes one raw slot belonging to `schedule_id`.
pub fn normalize_raw_slot(schedule_id: &str, raw: &RawSlot) -> Result<NormalizedSlot, SlotError> {
    let times = resolve_times(raw)?;
    let id = raw.id.clone().unwrap_or_else(|| {
        synthetic_slot_id(
            schedule_id,
            raw.start().unwrap_or(DEFAULT_TIME),
            raw.end().unwrap_or(DEFAULT_TIME),
        )
    });
    let label = slot_label(&times.day, &times.start, &times.end);

    Ok(NormalizedSlot {
        id,
        schedule_id: schedule_id.to_string(),
        day_of_week: times.day,
        start_time: times.start,
        end_time: times.end,
        label,
    })
}

/// Deterministic id for slots the backend sent without one.
///
/// Built from the times as the backend sent them, so ISO slots at the same
/// hour on different dates get different ids.
pub fn synthetic_slot_id(schedule_id: &str, start: &str, end: &str) -> String {
    format!("{schedule_id}-{start}-{end}")
}

pub fn slot_label(day: &str, start: &str, end: &str) -> String {
    format!("{day} {start} - {end}")
}

fn resolve_times(raw: &RawSlot) -> Result<SlotTimes, SlotError> {
    if let Some(day) = raw.day_name() {
        return Ok(SlotTimes {
            day: day.to_string(),
            start: raw.start().unwrap_or(DEFAULT_TIME).to_string(),
            end: raw.end().unwrap_or(DEFAULT_TIME).to_string(),
        });
    }

    match raw.start() {
        Some(start) if is_iso_datetime(start) => {
            let end = raw.end().ok_or_else(|| SlotError::MissingEnd {
                start: start.to_string(),
            })?;
            let (day, start) = wall_clock(start)?;
            let (_, end) = wall_clock(end)?;
            Ok(SlotTimes { day, start, end })
        }
        start => Ok(SlotTimes {
            day: UNKNOWN_DAY.to_string(),
            start: start.unwrap_or(DEFAULT_TIME).to_string(),
            end: raw.end().unwrap_or(DEFAULT_TIME).to_string(),
        }),
    }
}

fn is_iso_datetime(value: &str) -> bool {
    value.contains('T')
}

/// Weekday name and `HH:MM` of a timestamp in its own offset. Timestamps
/// without an offset are taken as wall-clock already.
fn wall_clock(value: &str) -> Result<(String, String), SlotError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok((dt.format("%A").to_string(), dt.format("%H:%M").to_string()));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| (dt.format("%A").to_string(), dt.format("%H:%M").to_string()))
        .ok_or_else(|| SlotError::BadTimestamp {
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn containers(value: Value) -> Vec<ScheduleContainer> {
        parse_containers(value.as_array().unwrap())
    }

    #[test]
    fn test_iso_slot_derives_weekday_and_time() {
        let input = containers(json!([{
            "id": "s1",
            "course_id": "c1",
            "slots": [{
                "start_time": "2024-01-15T14:00:00+00:00",
                "end_time": "2024-01-15T14:30:00+00:00"
            }]
        }]));

        let slots = normalize_slots(&input);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].label, "Monday 14:00 - 14:30");
        assert_eq!(slots[0].day_of_week, "Monday");
        assert_eq!(slots[0].schedule_id, "s1");
    }

    #[test]
    fn test_iso_slot_keeps_its_own_offset() {
        let raw = RawSlot {
            start_time: Some("2024-01-14T23:30:00-05:00".into()),
            end_time: Some("2024-01-15T00:15:00-05:00".into()),
            ..RawSlot::default()
        };

        let slot = normalize_raw_slot("s1", &raw).unwrap();
        assert_eq!(slot.label, "Sunday 23:30 - 00:15");
    }

    #[test]
    fn test_legacy_day_passes_through_verbatim() {
        let input = containers(json!([{
            "id": "s2",
            "timings": [{"day_of_week": "tuesday", "start_time": "09:00", "end_time": "09:30"}]
        }]));

        let slots = normalize_slots(&input);
        assert_eq!(slots[0].label, "tuesday 09:00 - 09:30");
    }

    #[test]
    fn test_day_field_with_time_of_day_variants_and_defaults() {
        let raw = RawSlot {
            day: Some("Friday".into()),
            start_time_of_day: Some("16:00".into()),
            ..RawSlot::default()
        };

        let slot = normalize_raw_slot("s3", &raw).unwrap();
        assert_eq!(slot.start_time, "16:00");
        assert_eq!(slot.end_time, "00:00");
        assert_eq!(slot.id, "s3-16:00-00:00");
    }

    #[test]
    fn test_bare_times_fall_back_to_tbd() {
        let input = containers(json!([{"id": "s4", "start_time": "10:00", "end_time": "11:00"}]));

        let slots = normalize_slots(&input);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].id, "s4");
        assert_eq!(slots[0].label, "TBD 10:00 - 11:00");
    }

    #[test]
    fn test_malformed_slots_are_dropped_not_fatal() {
        let input = containers(json!([
            {
                "id": "s1",
                "slots": [
                    {"id": "ok", "day_of_week": "monday", "start_time": "09:00", "end_time": "10:00"},
                    {"start_time": "2024-13-45T99:00:00", "end_time": "2024-01-15T14:30:00Z"},
                    "not a slot",
                    {"start_time": "2024-01-15T14:00:00Z"}
                ]
            },
            42,
            {"id": "s2"}
        ]));

        let slots = normalize_slots(&input);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].id, "ok");
    }

    #[test]
    fn test_order_follows_containers_then_slots() {
        let input = containers(json!([
            {"id": "b", "slots": [
                {"id": "b2", "day": "Wed", "start_time": "12:00", "end_time": "13:00"},
                {"id": "b1", "day": "Mon", "start_time": "08:00", "end_time": "09:00"}
            ]},
            {"id": "a", "slots": [{"id": "a1", "day": "Mon", "start_time": "07:00", "end_time": "08:00"}]}
        ]));

        let ids: Vec<_> = normalize_slots(&input).into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["b2", "b1", "a1"]);
    }

    #[test]
    fn test_synthetic_ids_are_stable_across_runs() {
        let input = containers(json!([{
            "id": "s1",
            "slots": [
                {"day_of_week": "monday", "start_time": "09:00", "end_time": "09:30"},
                {"start_time": "2024-01-16T10:00:00Z", "end_time": "2024-01-16T10:45:00Z"}
            ]
        }]));

        let first = normalize_slots(&input);
        let second = normalize_slots(&input);
        assert_eq!(first, second);
        assert_eq!(first[0].id, "s1-09:00-09:30");
        assert_eq!(first[1].id, "s1-2024-01-16T10:00:00Z-2024-01-16T10:45:00Z");
    }

    #[test]
    fn test_weekly_iso_slots_at_same_hour_get_distinct_ids() {
        let input = containers(json!([{
            "id": "s1",
            "slots": [
                {"start_time": "2024-01-15T10:00:00Z", "end_time": "2024-01-15T10:45:00Z"},
                {"start_time": "2024-01-16T10:00:00Z", "end_time": "2024-01-16T10:45:00Z"}
            ]
        }]));

        let slots = normalize_slots(&input);
        assert_eq!(slots[0].label, "Monday 10:00 - 10:45");
        assert_eq!(slots[1].label, "Tuesday 10:00 - 10:45");
        assert_ne!(slots[0].id, slots[1].id);
        assert!(duplicate_slot_ids(&slots).is_empty());
    }

    #[test]
    fn test_identical_slots_collide_and_are_reported() {
        let input = containers(json!([{
            "id": "s1",
            "slots": [
                {"day": "monday", "start_time": "09:00", "end_time": "09:30"},
                {"day": "monday", "start_time": "09:00", "end_time": "09:30"}
            ]
        }]));

        let slots = normalize_slots(&input);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].id, slots[1].id);
        assert_eq!(duplicate_slot_ids(&slots), vec!["s1-09:00-09:30".to_string()]);
    }

    #[test]
    fn test_empty_input_is_empty_output() {
        assert!(normalize_slots(&[]).is_empty());
        assert!(parse_containers(&[]).is_empty());
    }

    #[test]
    fn test_course_filter() {
        let input = containers(json!([
            {"id": "s1", "course_id": "c1", "start_time": "09:00", "end_time": "10:00"},
            {"id": "s2", "course_id": 2, "start_time": "11:00", "end_time": "12:00"}
        ]));

        let slots = normalize_slots_for_course(&input, "2");
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].schedule_id, "s2");
        assert!(normalize_slots_for_course(&input, "c9").is_empty());
    }

    #[test]
    fn test_course_filter_keeps_ids_of_unnamed_containers() {
        let input = containers(json!([
            {"id": "s1", "course_id": "c0", "start_time": "08:00", "end_time": "08:30"},
            {"course_id": "c1", "slots": [
                {"day_of_week": "monday", "start_time": "09:00", "end_time": "09:30"}
            ]}
        ]));

        let all = normalize_slots(&input);
        let for_course = normalize_slots_for_course(&input, "c1");
        assert_eq!(for_course.len(), 1);
        assert_eq!(for_course[0].id, "schedule-1-09:00-09:30");
        assert_eq!(for_course[0].schedule_id, "schedule-1");
        assert_eq!(all[1], for_course[0]);
    }
}
