//! Dashboard service: cached fetches, derived views, mutations.
//!
//! Lists are fetched through the [`QueryCache`] and normalized before they are
//! cached. Views (lookups, slots, joined rows) are derived again on every call
//! from the current lists. Every mutation invalidates the lists it affects.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::api::endpoints::{parse_financial_report, FINANCIAL_REPORT_PATH};
use crate::api::{ApiClient, ApiError, Resource};
use crate::assignment::AssignmentCandidates;
use crate::cache::QueryCache;
use crate::lookup::Lookups;
use crate::models::{Booking, RoomAvailabilityRequest, ScheduleContainer};
use crate::slots::{normalize_slots, parse_containers, NormalizedSlot};
use crate::views::{
    booking_rows, financial_report_view, schedule_rows, BookingRow, FinancialReportView,
    ScheduleRow,
};

/// Outcome of a mutation, for the caller's notification.
#[derive(Debug, Clone, Serialize)]
pub struct MutationOutcome {
    pub message: String,
    pub data: Value,
}

pub struct Dashboard {
    api: ApiClient,
    cache: QueryCache,
}

impl Dashboard {
    pub fn new(api: ApiClient, cache: QueryCache) -> Self {
        Self { api, cache }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// A resource list, from cache when fresh.
    pub async fn list(&self, resource: Resource) -> Result<Vec<Value>, ApiError> {
        let api = &self.api;
        let payload = self
            .cache
            .fetch(&resource.list_path(), move || async move {
                api.list(resource).await.map(Value::Array)
            })
            .await?;

        Ok(match payload {
            Value::Array(items) => items,
            _ => Vec::new(),
        })
    }

    /// A lookup source that failed to load degrades to an empty map.
    async fn lookup_source(&self, resource: Resource) -> Option<Value> {
        self.list(resource)
            .await
            .inspect_err(|e| {
                warn!(resource = %resource, error = %e, "Lookup source unavailable");
            })
            .ok()
            .map(Value::Array)
    }

    pub async fn lookups(&self) -> Lookups {
        let (users, courses, instructors, rooms) = futures::join!(
            self.lookup_source(Resource::Users),
            self.lookup_source(Resource::Courses),
            self.lookup_source(Resource::Instructors),
            self.lookup_source(Resource::Rooms),
        );

        Lookups::build(
            users.as_ref(),
            courses.as_ref(),
            instructors.as_ref(),
            rooms.as_ref(),
        )
    }

    pub async fn schedule_containers(&self) -> Result<Vec<ScheduleContainer>, ApiError> {
        let items = self.list(Resource::Schedules).await?;
        Ok(parse_containers(&items))
    }

    pub async fn slots(&self) -> Result<Vec<NormalizedSlot>, ApiError> {
        let containers = self.schedule_containers().await?;
        Ok(normalize_slots(&containers))
    }

    /// Bookings that deserialize; malformed records are dropped and logged.
    pub async fn bookings(&self) -> Result<Vec<Booking>, ApiError> {
        let items = self.list(Resource::Bookings).await?;
        Ok(items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| {
                serde_json::from_value::<Booking>(item)
                    .inspect_err(|e| warn!(index, error = %e, "Dropping malformed booking"))
                    .ok()
            })
            .collect())
    }

    pub async fn booking(&self, booking_id: &str) -> Result<Booking, ApiError> {
        self.bookings()
            .await?
            .into_iter()
            .find(|b| b.id == booking_id)
            .ok_or_else(|| ApiError::NotFound {
                what: format!("booking {booking_id}"),
            })
    }

    pub async fn booking_table(&self) -> Result<Vec<BookingRow>, ApiError> {
        let (bookings, slots, lookups) =
            futures::join!(self.bookings(), self.slots(), self.lookups());
        Ok(booking_rows(&bookings?, &lookups, &slots?))
    }

    pub async fn schedule_table(&self) -> Result<Vec<ScheduleRow>, ApiError> {
        let (containers, lookups) = futures::join!(self.schedule_containers(), self.lookups());
        Ok(schedule_rows(&containers?, &lookups))
    }

    pub async fn slot_candidates(&self, booking_id: &str) -> Result<AssignmentCandidates, ApiError> {
        let (booking, containers) =
            futures::join!(self.booking(booking_id), self.schedule_containers());
        Ok(AssignmentCandidates::for_booking(&booking?, &containers?))
    }

    /// Assigns `slot_id` to the booking, sending the slot's owning schedule id
    /// as resolved from its normalized record.
    pub async fn assign_slot(
        &self,
        booking_id: &str,
        slot_id: &str,
    ) -> Result<MutationOutcome, ApiError> {
        let candidates = self.slot_candidates(booking_id).await?;
        let request = candidates.request_for(slot_id)?;

        let data = self.api.assign_slot(booking_id, &request).await?;
        self.invalidate(&[Resource::Bookings, Resource::Schedules]);
        info!(
            booking_id,
            slot_id = %request.slot_id,
            schedule_id = %request.schedule_id,
            "Assigned slot"
        );
        Ok(outcome("Slot assigned", data))
    }

    pub async fn confirm_booking(&self, booking_id: &str) -> Result<MutationOutcome, ApiError> {
        let data = self.api.confirm_booking(booking_id).await?;
        self.invalidate(&[Resource::Bookings]);
        Ok(outcome("Booking confirmed", data))
    }

    pub async fn cancel_booking(&self, booking_id: &str) -> Result<MutationOutcome, ApiError> {
        let data = self.api.cancel_booking(booking_id).await?;
        self.invalidate(&[Resource::Bookings]);
        Ok(outcome("Booking cancelled", data))
    }

    pub async fn create(&self, resource: Resource, body: &Value) -> Result<MutationOutcome, ApiError> {
        let data = self.api.create(resource, body).await?;
        self.invalidate(&[resource]);
        Ok(outcome(format!("Created {}", singular(resource)), data))
    }

    pub async fn update(
        &self,
        resource: Resource,
        id: &str,
        body: &Value,
    ) -> Result<MutationOutcome, ApiError> {
        let data = self.api.update(resource, id, body).await?;
        self.invalidate(&[resource]);
        Ok(outcome(format!("Updated {}", singular(resource)), data))
    }

    pub async fn delete(&self, resource: Resource, id: &str) -> Result<MutationOutcome, ApiError> {
        self.api.remove(resource, id).await?;
        self.invalidate(&[resource]);
        Ok(outcome(format!("Deleted {}", singular(resource)), Value::Null))
    }

    pub async fn set_room_availability(
        &self,
        room_id: &str,
        request: &RoomAvailabilityRequest,
    ) -> Result<MutationOutcome, ApiError> {
        let data = self.api.set_room_availability(room_id, request).await?;
        self.invalidate(&[Resource::Rooms]);
        Ok(outcome("Room availability updated", data))
    }

    pub async fn financial_report(&self) -> Result<FinancialReportView, ApiError> {
        let payload = self
            .cache
            .fetch(FINANCIAL_REPORT_PATH, || self.api.get(FINANCIAL_REPORT_PATH))
            .await?;
        let report = parse_financial_report(payload)?;
        let lookups = self.lookups().await;
        Ok(financial_report_view(report, &lookups))
    }

    fn invalidate(&self, resources: &[Resource]) {
        for resource in resources {
            self.cache.invalidate_prefix(&resource.list_path());
        }
        // The report aggregates every list.
        self.cache.invalidate(FINANCIAL_REPORT_PATH);
    }
}

fn outcome(message: impl Into<String>, data: Value) -> MutationOutcome {
    MutationOutcome {
        message: message.into(),
        data,
    }
}

fn singular(resource: Resource) -> &'static str {
    match resource {
        Resource::Users => "user",
        Resource::Students => "student",
        Resource::Instructors => "instructor",
        Resource::Rooms => "room",
        Resource::Courses => "course",
        Resource::Schedules => "schedule",
        Resource::Bookings => "booking",
    }
}
