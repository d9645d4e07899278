//! Table rows with foreign keys joined to display labels.

use serde::Serialize;
use std::collections::HashMap;

use crate::lookup::Lookups;
use crate::models::{Booking, BookingStatus, FinancialReport, ScheduleContainer};
use crate::slots::{normalize_container, NormalizedSlot};

/// Actions a booking's status allows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BookingActions {
    pub can_confirm: bool,
    pub can_cancel: bool,
    pub can_assign: bool,
}

impl BookingActions {
    pub fn for_status(status: BookingStatus) -> Self {
        match status {
            BookingStatus::Pending => Self {
                can_confirm: true,
                can_cancel: true,
                can_assign: true,
            },
            BookingStatus::Confirmed => Self {
                can_cancel: true,
                ..Self::default()
            },
            BookingStatus::Cancelled | BookingStatus::Unknown => Self::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingRow {
    pub id: String,
    pub student_id: Option<String>,
    pub student_name: Option<String>,
    pub school: Option<String>,
    pub course_id: Option<String>,
    pub course_title: Option<String>,
    pub first_choice: Option<String>,
    pub second_choice: Option<String>,
    pub confirmed_slot: Option<String>,
    pub status: BookingStatus,
    pub actions: BookingActions,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleRow {
    pub id: Option<String>,
    pub course_title: Option<String>,
    pub instructor_name: Option<String>,
    pub room_name: Option<String>,
    pub slots: Vec<NormalizedSlot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseRevenueRow {
    pub course_id: Option<String>,
    pub course_title: Option<String>,
    pub revenue: f64,
    pub bookings: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinancialReportView {
    pub period_start: Option<String>,
    pub period_end: Option<String>,
    pub currency: Option<String>,
    pub total_revenue: f64,
    pub total_outstanding: f64,
    pub total_refunded: f64,
    pub by_course: Vec<CourseRevenueRow>,
}

/// Joins bookings with student, course and slot labels.
pub fn booking_rows(
    bookings: &[Booking],
    lookups: &Lookups,
    slots: &[NormalizedSlot],
) -> Vec<BookingRow> {
    let slot_labels: HashMap<&str, &str> = slots
        .iter()
        .map(|s| (s.id.as_str(), s.label.as_str()))
        .collect();
    let slot_label = |id: Option<&str>| {
        id.map(|id| slot_labels.get(id).copied().unwrap_or(id).to_string())
    };

    bookings
        .iter()
        .map(|b| {
            let student = b.student_id.as_deref();
            BookingRow {
                id: b.id.clone(),
                student_id: b.student_id.clone(),
                student_name: lookups.users.resolve(student),
                school: student.and_then(|id| lookups.schools.get(id)).map(str::to_string),
                course_id: b.course_id.clone(),
                course_title: lookups.courses.resolve(b.course_id.as_deref()),
                first_choice: slot_label(b.first_choice_slot_id.as_deref()),
                second_choice: slot_label(b.second_choice_slot_id.as_deref()),
                confirmed_slot: slot_label(b.confirmed_slot_id.as_deref()),
                status: b.status,
                actions: BookingActions::for_status(b.status),
                created_at: b.created_at.clone(),
            }
        })
        .collect()
}

/// Joins schedule containers with course, instructor and room labels.
pub fn schedule_rows(containers: &[ScheduleContainer], lookups: &Lookups) -> Vec<ScheduleRow> {
    containers
        .iter()
        .enumerate()
        .map(|(index, c)| ScheduleRow {
            id: c.id.clone(),
            course_title: lookups.courses.resolve(c.course_id.as_deref()),
            instructor_name: lookups.instructors.resolve(c.instructor_id.as_deref()),
            room_name: lookups.rooms.resolve(c.room_id.as_deref()),
            slots: normalize_container(index, c),
        })
        .collect()
}

pub fn financial_report_view(report: FinancialReport, lookups: &Lookups) -> FinancialReportView {
    let by_course = report
        .by_course
        .into_iter()
        .map(|line| CourseRevenueRow {
            course_title: lookups.courses.resolve(line.course_id.as_deref()),
            course_id: line.course_id,
            revenue: line.revenue,
            bookings: line.bookings,
        })
        .collect();

    FinancialReportView {
        period_start: report.period_start,
        period_end: report.period_end,
        currency: report.currency,
        total_revenue: report.total_revenue,
        total_outstanding: report.total_outstanding,
        total_refunded: report.total_refunded,
        by_course,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::{normalize_slots, parse_containers};
    use serde_json::json;

    #[test]
    fn test_actions_follow_status() {
        assert_eq!(
            BookingActions::for_status(BookingStatus::Pending),
            BookingActions {
                can_confirm: true,
                can_cancel: true,
                can_assign: true
            }
        );
        let confirmed = BookingActions::for_status(BookingStatus::Confirmed);
        assert!(confirmed.can_cancel && !confirmed.can_confirm && !confirmed.can_assign);
        assert_eq!(
            BookingActions::for_status(BookingStatus::Cancelled),
            BookingActions::default()
        );
    }

    #[test]
    fn test_booking_rows_join_labels() {
        let users = json!([{"id": "u1", "full_name": "Jane", "school": "Northside"}]);
        let courses = json!([{"id": "c1", "title": "Piano I"}]);
        let lookups = Lookups::build(Some(&users), Some(&courses), None, None);

        let containers = parse_containers(
            json!([{"id": "s1", "course_id": "c1", "slots": [
                {"id": "sl1", "day_of_week": "monday", "start_time": "09:00", "end_time": "09:30"}
            ]}])
            .as_array()
            .unwrap(),
        );
        let slots = normalize_slots(&containers);

        let bookings: Vec<Booking> = serde_json::from_value(json!([{
            "id": "b1",
            "student_id": "u1",
            "course_id": "c1",
            "first_choice_slot_id": "sl1",
            "second_choice_slot_id": "gone",
            "status": "confirmed",
            "confirmed_slot_id": "sl1"
        }]))
        .unwrap();

        let rows = booking_rows(&bookings, &lookups, &slots);
        let row = &rows[0];
        assert_eq!(row.student_name.as_deref(), Some("Jane"));
        assert_eq!(row.school.as_deref(), Some("Northside"));
        assert_eq!(row.course_title.as_deref(), Some("Piano I"));
        assert_eq!(row.first_choice.as_deref(), Some("monday 09:00 - 09:30"));
        assert_eq!(row.second_choice.as_deref(), Some("gone"));
        assert_eq!(row.confirmed_slot.as_deref(), Some("monday 09:00 - 09:30"));
        assert!(!row.actions.can_assign);
    }

    #[test]
    fn test_schedule_rows_and_report() {
        let courses = json!([{"id": "c1", "name": "Guitar"}]);
        let instructors = json!([{"id": "i1", "email": "t@school.org"}]);
        let lookups = Lookups::build(None, Some(&courses), Some(&instructors), None);

        let containers = parse_containers(
            json!([{"id": "s1", "course_id": "c1", "instructor_id": "i1", "room_id": "r1",
                    "start_time": "10:00", "end_time": "10:45"}])
            .as_array()
            .unwrap(),
        );
        let rows = schedule_rows(&containers, &lookups);
        assert_eq!(rows[0].course_title.as_deref(), Some("Guitar"));
        assert_eq!(rows[0].instructor_name.as_deref(), Some("t@school.org"));
        assert_eq!(rows[0].room_name.as_deref(), Some("r1"));
        assert_eq!(rows[0].slots.len(), 1);

        let report: FinancialReport = serde_json::from_value(json!({
            "total_revenue": 1250.5,
            "by_course": [{"course_id": "c1", "revenue": 1250.5, "bookings": 4}]
        }))
        .unwrap();
        let view = financial_report_view(report, &lookups);
        assert_eq!(view.by_course[0].course_title.as_deref(), Some("Guitar"));
        assert_eq!(view.total_outstanding, 0.0);
    }
}
