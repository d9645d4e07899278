//! Backend record types.
//!
//! The backend has gone through several API versions and still returns a mix
//! of shapes, so every field is optional and ids accept strings or numbers.
//! Shape ambiguity is resolved here, right after deserialization, so the rest
//! of the crate sees one canonical form.

pub(crate) mod de;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A schedule container: one or more bookable slots for a course, instructor
/// and room combination.
///
/// Nested slots live under `slots`, `schedule` or `timings` depending on the
/// API version. Older records carry the slot fields on the container itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleContainer {
    #[serde(default, deserialize_with = "de::opt_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_id")]
    pub course_id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_id")]
    pub instructor_id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_id")]
    pub room_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slots: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timings: Option<Value>,

    #[serde(default, deserialize_with = "de::opt_text")]
    pub day_of_week: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub day: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub end_time: Option<String>,
}

/// Where a container's slots come from.
#[derive(Debug, Clone)]
pub enum ScheduleShape<'a> {
    /// Slots nested under one of the legacy array fields.
    Nested(&'a [Value]),
    /// The container itself is the slot.
    Flat(RawSlot),
    /// Nothing extractable.
    Empty,
}

impl ScheduleContainer {
    /// Resolves the slot source, preferring a nested array in field order
    /// `slots`, `schedule`, `timings`.
    pub fn shape(&self) -> ScheduleShape<'_> {
        let nested = [&self.slots, &self.schedule, &self.timings]
            .into_iter()
            .find_map(|field| field.as_ref().and_then(Value::as_array));

        if let Some(slots) = nested {
            return ScheduleShape::Nested(slots.as_slice());
        }

        if self.start_time.is_some() && self.end_time.is_some() {
            return ScheduleShape::Flat(RawSlot {
                id: self.id.clone(),
                day_of_week: self.day_of_week.clone(),
                day: self.day.clone(),
                start_time: self.start_time.clone(),
                end_time: self.end_time.clone(),
                start_time_of_day: None,
                end_time_of_day: None,
            });
        }

        ScheduleShape::Empty
    }

    /// True if this container belongs to the given course.
    pub fn is_for_course(&self, course_id: &str) -> bool {
        self.course_id.as_deref() == Some(course_id)
    }
}

/// A single slot as the backend sent it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSlot {
    #[serde(default, deserialize_with = "de::opt_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub day_of_week: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub day: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub start_time_of_day: Option<String>,
    #[serde(default, deserialize_with = "de::opt_text")]
    pub end_time_of_day: Option<String>,
}

impl RawSlot {
    pub fn day_name(&self) -> Option<&str> {
        self.day_of_week.as_deref().or(self.day.as_deref())
    }

    pub fn start(&self) -> Option<&str> {
        self.start_time.as_deref().or(self.start_time_of_day.as_deref())
    }

    pub fn end(&self) -> Option<&str> {
        self.end_time.as_deref().or(self.end_time_of_day.as_deref())
    }
}

/// Lifecycle of a booking request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

/// A student's request for a course, with two slot preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
    #[serde(default, alias = "user_id", deserialize_with = "de::opt_id")]
    pub student_id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_id")]
    pub course_id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_id")]
    pub first_choice_slot_id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_id")]
    pub second_choice_slot_id: Option<String>,
    #[serde(default, alias = "assigned_slot_id", deserialize_with = "de::opt_id")]
    pub confirmed_slot_id: Option<String>,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Read-only revenue summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialReport {
    #[serde(default)]
    pub period_start: Option<String>,
    #[serde(default)]
    pub period_end: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub total_revenue: f64,
    #[serde(default)]
    pub total_outstanding: f64,
    #[serde(default)]
    pub total_refunded: f64,
    #[serde(default)]
    pub by_course: Vec<CourseRevenue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseRevenue {
    #[serde(default, deserialize_with = "de::opt_id")]
    pub course_id: Option<String>,
    #[serde(default)]
    pub revenue: f64,
    #[serde(default)]
    pub bookings: u32,
}

/// Body of `POST /booking/admin/bookings/{id}/assign-slot`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignSlotRequest {
    pub slot_id: String,
    pub schedule_id: String,
}

/// Body of `POST /admin/rooms/{id}/availability`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomAvailabilityRequest {
    pub availability: Vec<AvailabilityWindow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token pair returned by login and refresh. Refresh may omit a new refresh token.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(alias = "token", alias = "accessToken")]
    pub access_token: String,
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<Value>,
}
