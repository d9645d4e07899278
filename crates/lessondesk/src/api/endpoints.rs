//! Typed backend operations.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::client::ApiClient;
use super::envelope::{list_items, DataEnvelope};
use super::error::ApiError;
use crate::models::{AssignSlotRequest, FinancialReport, RoomAvailabilityRequest};

pub const FINANCIAL_REPORT_PATH: &str = "/admin/reports/financial";

/// Admin-managed collections, each under `/admin/{resource}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Users,
    Students,
    Instructors,
    Rooms,
    Courses,
    Schedules,
    Bookings,
}

impl Resource {
    pub const ALL: [Resource; 7] = [
        Resource::Users,
        Resource::Students,
        Resource::Instructors,
        Resource::Rooms,
        Resource::Courses,
        Resource::Schedules,
        Resource::Bookings,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Users => "users",
            Resource::Students => "students",
            Resource::Instructors => "instructors",
            Resource::Rooms => "rooms",
            Resource::Courses => "courses",
            Resource::Schedules => "schedules",
            Resource::Bookings => "bookings",
        }
    }

    /// List path, also the cache key of the list.
    pub fn list_path(self) -> String {
        format!("/admin/{}", self.as_str())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ApiError::NotFound {
                what: format!("resource {s:?}"),
            })
    }
}

/// Unwraps `{data: ...}` around a single object.
fn unwrap_data(payload: Value) -> Value {
    serde_json::from_value::<DataEnvelope<Value>>(payload)
        .map(DataEnvelope::into_inner)
        .unwrap_or(Value::Null)
}

impl ApiClient {
    /// Fetches a resource list and unwraps whichever list shape came back.
    pub async fn list(&self, resource: Resource) -> Result<Vec<Value>, ApiError> {
        let payload = self.get(&resource.list_path()).await?;
        Ok(list_items(payload))
    }

    pub async fn create(&self, resource: Resource, body: &Value) -> Result<Value, ApiError> {
        self.post(&resource.list_path(), body).await.map(unwrap_data)
    }

    pub async fn update(
        &self,
        resource: Resource,
        id: &str,
        body: &Value,
    ) -> Result<Value, ApiError> {
        let url = self.segments_url(&["admin", resource.as_str(), id])?;
        self.request_url(Method::PUT, url, Some(body))
            .await
            .map(unwrap_data)
    }

    pub async fn remove(&self, resource: Resource, id: &str) -> Result<(), ApiError> {
        let url = self.segments_url(&["admin", resource.as_str(), id])?;
        self.request_url(Method::DELETE, url, None).await.map(|_| ())
    }

    pub async fn confirm_booking(&self, booking_id: &str) -> Result<Value, ApiError> {
        let url = self.segments_url(&["booking", booking_id, "confirm"])?;
        self.request_url(Method::POST, url, None)
            .await
            .map(unwrap_data)
    }

    pub async fn cancel_booking(&self, booking_id: &str) -> Result<Value, ApiError> {
        let url = self.segments_url(&["booking", booking_id, "cancel"])?;
        self.request_url(Method::POST, url, None)
            .await
            .map(unwrap_data)
    }

    pub async fn assign_slot(
        &self,
        booking_id: &str,
        request: &AssignSlotRequest,
    ) -> Result<Value, ApiError> {
        let body = to_body(request)?;
        let url =
            self.segments_url(&["booking", "admin", "bookings", booking_id, "assign-slot"])?;
        self.request_url(Method::POST, url, Some(&body))
            .await
            .map(unwrap_data)
    }

    pub async fn set_room_availability(
        &self,
        room_id: &str,
        request: &RoomAvailabilityRequest,
    ) -> Result<Value, ApiError> {
        let body = to_body(request)?;
        let url = self.segments_url(&["admin", "rooms", room_id, "availability"])?;
        self.request_url(Method::POST, url, Some(&body))
            .await
            .map(unwrap_data)
    }
}

pub fn parse_financial_report(payload: Value) -> Result<FinancialReport, ApiError> {
    serde_json::from_value(unwrap_data(payload)).map_err(|e| ApiError::UnexpectedResponse {
        message: format!("financial report: {e}"),
    })
}

fn to_body<T: Serialize>(request: &T) -> Result<Value, ApiError> {
    serde_json::to_value(request).map_err(|e| ApiError::UnexpectedResponse {
        message: format!("failed to encode request body: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_paths() {
        assert_eq!(Resource::Bookings.list_path(), "/admin/bookings");
        assert_eq!("courses".parse::<Resource>().unwrap(), Resource::Courses);
        assert!("payments".parse::<Resource>().is_err());
    }

    #[test]
    fn test_financial_report_in_either_envelope() {
        let wrapped = parse_financial_report(json!({"data": {"total_revenue": 10.0}})).unwrap();
        let bare = parse_financial_report(json!({"total_revenue": 12.5})).unwrap();
        assert_eq!(wrapped.total_revenue, 10.0);
        assert_eq!(bare.total_revenue, 12.5);
    }

    #[test]
    fn test_assign_body_shape() {
        let body = to_body(&AssignSlotRequest {
            slot_id: "s1-09:00-09:30".into(),
            schedule_id: "s1".into(),
        })
        .unwrap();
        assert_eq!(body, json!({"slot_id": "s1-09:00-09:30", "schedule_id": "s1"}));
    }
}
