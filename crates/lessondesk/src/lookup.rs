//! Id-to-label lookup maps for display joins.
//!
//! Tables show foreign keys (student, course, instructor, room) by label
//! without a server-side join. Maps are rebuilt from the current entity list
//! whenever it changes and never persisted.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::models::de;

/// A label field an entity may carry, depending on entity and API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelField {
    FullName,
    Name,
    Title,
    Email,
    School,
    RoomNumber,
}

/// Default chain: first non-empty of these wins, then the id itself.
pub const DEFAULT_CHAIN: &[LabelField] = &[
    LabelField::FullName,
    LabelField::Name,
    LabelField::Title,
    LabelField::Email,
];

pub const USER_CHAIN: &[LabelField] = &[LabelField::FullName, LabelField::Name, LabelField::Email];
pub const SCHOOL_CHAIN: &[LabelField] = &[LabelField::School];
pub const COURSE_CHAIN: &[LabelField] = &[LabelField::Title, LabelField::Name];
pub const INSTRUCTOR_CHAIN: &[LabelField] =
    &[LabelField::FullName, LabelField::Name, LabelField::Email];
pub const ROOM_CHAIN: &[LabelField] = &[LabelField::Name, LabelField::Title, LabelField::RoomNumber];

/// The label-bearing subset of any entity record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelRecord {
    #[serde(default, deserialize_with = "de::opt_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub email: Option<String>,
    #[serde(default, alias = "school_name", deserialize_with = "de::opt_text")]
    pub school: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub room_number: Option<String>,
}

impl LabelRecord {
    pub fn field(&self, field: LabelField) -> Option<&str> {
        match field {
            LabelField::FullName => self.full_name.as_deref(),
            LabelField::Name => self.name.as_deref(),
            LabelField::Title => self.title.as_deref(),
            LabelField::Email => self.email.as_deref(),
            LabelField::School => self.school.as_deref(),
            LabelField::RoomNumber => self.room_number.as_deref(),
        }
    }

    /// First non-empty field of `chain`, if any.
    pub fn label(&self, chain: &[LabelField]) -> Option<&str> {
        chain
            .iter()
            .filter_map(|f| self.field(*f))
            .find(|s| !s.trim().is_empty())
    }
}

/// One element of an entity list: older API versions sent bare strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EntityEntry {
    Bare(String),
    Record(LabelRecord),
}

/// Transient `id -> label` mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LookupMap(HashMap<String, String>);

impl LookupMap {
    pub fn get(&self, id: &str) -> Option<&str> {
        self.0.get(id).map(String::as_str)
    }

    /// Label for `id`, or the id itself when unknown.
    pub fn label_or_id(&self, id: &str) -> String {
        self.get(id).unwrap_or(id).to_string()
    }

    /// Resolves an optional foreign key.
    pub fn resolve(&self, id: Option<&str>) -> Option<String> {
        id.map(|id| self.label_or_id(id))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> HashMap<String, String> {
        self.0
    }
}

/// Builds a lookup map using [`DEFAULT_CHAIN`].
pub fn build_lookup_map(input: Option<&Value>) -> LookupMap {
    build_lookup_map_with(input, DEFAULT_CHAIN)
}

/// Builds a lookup map with an explicit label chain.
///
/// Never fails: a missing or non-array input gives an empty map, and entries
/// that are neither strings nor objects are skipped. Bare strings get the
/// synthetic id `entity-{index}`; objects without an id get the same.
pub fn build_lookup_map_with(input: Option<&Value>, chain: &[LabelField]) -> LookupMap {
    let Some(items) = input.and_then(Value::as_array) else {
        return LookupMap::default();
    };

    let map = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let entry = EntityEntry::deserialize(item).ok()?;
            Some(entry_pair(index, entry, chain))
        })
        .collect();

    LookupMap(map)
}

fn entry_pair(index: usize, entry: EntityEntry, chain: &[LabelField]) -> (String, String) {
    match entry {
        EntityEntry::Bare(label) => (format!("entity-{index}"), label),
        EntityEntry::Record(record) => {
            let id = record
                .id
                .clone()
                .unwrap_or_else(|| format!("entity-{index}"));
            let label = record.label(chain).map(str::to_string).unwrap_or_else(|| id.clone());
            (id, label)
        }
    }
}

/// Every lookup the dashboard tables join against.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Lookups {
    pub users: LookupMap,
    pub schools: LookupMap,
    pub courses: LookupMap,
    pub instructors: LookupMap,
    pub rooms: LookupMap,
}

impl Lookups {
    pub fn build(
        users: Option<&Value>,
        courses: Option<&Value>,
        instructors: Option<&Value>,
        rooms: Option<&Value>,
    ) -> Self {
        Self {
            users: build_lookup_map_with(users, USER_CHAIN),
            schools: build_school_map(users),
            courses: build_lookup_map_with(courses, COURSE_CHAIN),
            instructors: build_lookup_map_with(instructors, INSTRUCTOR_CHAIN),
            rooms: build_lookup_map_with(rooms, ROOM_CHAIN),
        }
    }
}

/// Users without a school are left out, so a missing school renders empty
/// instead of falling back to the user id.
fn build_school_map(users: Option<&Value>) -> LookupMap {
    let Some(items) = users.and_then(Value::as_array) else {
        return LookupMap::default();
    };

    let map = items
        .iter()
        .filter_map(|item| {
            let record = LabelRecord::deserialize(item).ok()?;
            let school = record.label(SCHOOL_CHAIN)?.to_string();
            Some((record.id?, school))
        })
        .collect();

    LookupMap(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fallback_chain_applies_per_entry() {
        let users = json!([
            {"id": "u1", "full_name": "Jane"},
            {"id": "u2", "email": "a@b.com"}
        ]);

        let map = build_lookup_map(Some(&users)).into_inner();
        assert_eq!(map.len(), 2);
        assert_eq!(map["u1"], "Jane");
        assert_eq!(map["u2"], "a@b.com");
    }

    #[test]
    fn test_non_array_input_gives_empty_map() {
        assert!(build_lookup_map(None).is_empty());
        assert!(build_lookup_map(Some(&json!({}))).is_empty());
        assert!(build_lookup_map(Some(&json!("users"))).is_empty());
    }

    #[test]
    fn test_bare_strings_get_index_ids() {
        let input = json!(["Piano 101", {"id": 5, "title": "Violin"}, 17, null]);

        let map = build_lookup_map(Some(&input));
        assert_eq!(map.get("entity-0"), Some("Piano 101"));
        assert_eq!(map.get("5"), Some("Violin"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_empty_labels_are_skipped_and_id_is_last_resort() {
        let input = json!([
            {"id": "u1", "full_name": "  ", "name": "Sam"},
            {"id": "u2", "full_name": ""}
        ]);

        let map = build_lookup_map(Some(&input));
        assert_eq!(map.get("u1"), Some("Sam"));
        assert_eq!(map.get("u2"), Some("u2"));
    }

    #[test]
    fn test_lookups_join_schools_and_rooms() {
        let users = json!([
            {"id": "u1", "full_name": "Jane", "school": "Northside"},
            {"id": "u2", "name": "Ali"}
        ]);
        let rooms = json!([{"id": "r1", "room_number": "B12"}]);

        let lookups = Lookups::build(Some(&users), None, None, Some(&rooms));
        assert_eq!(lookups.schools.get("u1"), Some("Northside"));
        assert_eq!(lookups.schools.get("u2"), None);
        assert_eq!(lookups.rooms.get("r1"), Some("B12"));
        assert_eq!(lookups.courses.label_or_id("c1"), "c1");
    }
}
