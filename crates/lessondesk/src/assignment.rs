//! Slot-to-booking matching for the "assign slot" action.

use serde::Serialize;
use thiserror::Error;

use crate::models::{AssignSlotRequest, Booking, ScheduleContainer};
use crate::slots::{normalize_slots_for_course, NormalizedSlot};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssignmentError {
    #[error("booking {booking_id} has no course")]
    NoCourse { booking_id: String },

    #[error("no slots available for course {course_id}")]
    NoCandidates { course_id: String },

    #[error("slot {slot_id} is not a candidate for booking {booking_id}")]
    UnknownSlot { booking_id: String, slot_id: String },
}

/// Slots a booking may be assigned to.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentCandidates {
    pub booking_id: String,
    pub course_id: Option<String>,
    pub slots: Vec<NormalizedSlot>,
    pub can_assign: bool,
}

impl AssignmentCandidates {
    /// Normalizes the slots of containers whose course matches the booking's.
    pub fn for_booking(booking: &Booking, containers: &[ScheduleContainer]) -> Self {
        let slots = booking
            .course_id
            .as_deref()
            .map(|course_id| normalize_slots_for_course(containers, course_id))
            .unwrap_or_default();
        let can_assign = !slots.is_empty();

        Self {
            booking_id: booking.id.clone(),
            course_id: booking.course_id.clone(),
            slots,
            can_assign,
        }
    }

    /// Builds the assign request for `slot_id`.
    ///
    /// The schedule id comes from the normalized record; synthetic slot ids
    /// cannot be mapped back to their container on their own.
    pub fn request_for(&self, slot_id: &str) -> Result<AssignSlotRequest, AssignmentError> {
        if !self.can_assign {
            return Err(match &self.course_id {
                Some(course_id) => AssignmentError::NoCandidates {
                    course_id: course_id.clone(),
                },
                None => AssignmentError::NoCourse {
                    booking_id: self.booking_id.clone(),
                },
            });
        }

        self.slots
            .iter()
            .find(|slot| slot.id == slot_id)
            .map(|slot| AssignSlotRequest {
                slot_id: slot.id.clone(),
                schedule_id: slot.schedule_id.clone(),
            })
            .ok_or_else(|| AssignmentError::UnknownSlot {
                booking_id: self.booking_id.clone(),
                slot_id: slot_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::parse_containers;
    use serde_json::json;

    fn booking(course_id: Option<&str>) -> Booking {
        serde_json::from_value(json!({
            "id": "b1",
            "student_id": "u1",
            "course_id": course_id,
            "status": "pending",
        }))
        .unwrap()
    }

    fn containers() -> Vec<ScheduleContainer> {
        parse_containers(
            json!([
                {"id": "s1", "course_id": "c1", "slots": [
                    {"day_of_week": "monday", "start_time": "09:00", "end_time": "09:30"}
                ]},
                {"id": "s2", "course_id": "c2", "slots": [
                    {"id": "x", "day_of_week": "friday", "start_time": "15:00", "end_time": "16:00"}
                ]}
            ])
            .as_array()
            .unwrap(),
        )
    }

    #[test]
    fn test_no_matching_course_disables_assign() {
        let candidates = AssignmentCandidates::for_booking(&booking(Some("c9")), &containers());

        assert!(candidates.slots.is_empty());
        assert!(!candidates.can_assign);
        assert_eq!(
            candidates.request_for("anything"),
            Err(AssignmentError::NoCandidates {
                course_id: "c9".into()
            })
        );
    }

    #[test]
    fn test_booking_without_course_has_no_candidates() {
        let candidates = AssignmentCandidates::for_booking(&booking(None), &containers());
        assert!(!candidates.can_assign);
        assert!(matches!(
            candidates.request_for("x"),
            Err(AssignmentError::NoCourse { .. })
        ));
    }

    #[test]
    fn test_request_resolves_schedule_from_synthetic_slot() {
        let candidates = AssignmentCandidates::for_booking(&booking(Some("c1")), &containers());
        assert!(candidates.can_assign);

        let request = candidates.request_for("s1-09:00-09:30").unwrap();
        assert_eq!(request.slot_id, "s1-09:00-09:30");
        assert_eq!(request.schedule_id, "s1");
    }

    #[test]
    fn test_slot_from_other_course_is_rejected() {
        let candidates = AssignmentCandidates::for_booking(&booking(Some("c1")), &containers());
        assert!(matches!(
            candidates.request_for("x"),
            Err(AssignmentError::UnknownSlot { .. })
        ));
    }
}
