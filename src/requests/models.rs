//! Request data models

use crate::auth::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl Default for RequestStatus {
    fn default() -> Self {
        RequestStatus::Pending
    }
}

/// Who is asking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requester {
    pub name: String,
    pub email: String,
    pub student_id: Option<String>,
}

/// Per-type request payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum RequestPayload {
    /// Borrow a library book
    Borrow(BorrowRequest),
    /// Return a borrowed book
    Return(ReturnRequest),
    /// Enroll in a course
    Enroll(EnrollRequest),
    /// Drop a course
    Unenroll(UnenrollRequest),
    /// Free-form question for the office
    Support(SupportRequest),
    /// Approve a self-registered account
    NewUser(NewUserRequest),
}

impl RequestPayload {
    /// The tag value, for filtering and audit records
    pub fn kind(&self) -> &'static str {
        match self {
            RequestPayload::Borrow(_) => "borrow",
            RequestPayload::Return(_) => "return",
            RequestPayload::Enroll(_) => "enroll",
            RequestPayload::Unenroll(_) => "unenroll",
            RequestPayload::Support(_) => "support",
            RequestPayload::NewUser(_) => "new_user",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    pub book_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    pub borrowing_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    pub course_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnenrollRequest {
    pub course_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportRequest {
    pub subject: String,
    pub message: String,
}

/// Filed automatically when someone registers; points at the pending account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserRequest {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalRequest {
    pub id: Uuid,
    pub requester: Requester,
    #[serde(flatten)]
    pub payload: RequestPayload,
    pub status: RequestStatus,
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
}

impl PortalRequest {
    pub fn new(requester: Requester, payload: RequestPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            requester,
            payload,
            status: RequestStatus::Pending,
            admin_note: None,
            created_at: Utc::now(),
            resolved_at: None,
            resolved_by: None,
        }
    }
}

/// List filters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    /// Tag value: "borrow", "return", "enroll", "unenroll", "support", "new_user"
    pub kind: Option<String>,
    /// Case-insensitive substring over requester name and email
    pub search: Option<String>,
}

impl RequestFilter {
    pub(crate) fn matches(&self, request: &PortalRequest) -> bool {
        let status_ok = self.status.map_or(true, |s| request.status == s);
        let kind_ok = self
            .kind
            .as_deref()
            .map_or(true, |k| request.payload.kind() == k);
        let search_ok = self.search.as_deref().map_or(true, |q| {
            let q = q.to_lowercase();
            request.requester.name.to_lowercase().contains(&q)
                || request.requester.email.to_lowercase().contains(&q)
        });

        status_ok && kind_ok && search_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requester() -> Requester {
        Requester {
            name: "Asha Verma".to_string(),
            email: "asha@students.campus.local".to_string(),
            student_id: Some("STU-1042".to_string()),
        }
    }

    #[test]
    fn test_wire_shape_is_tagged_at_top_level() {
        let book_id = Uuid::new_v4();
        let request = PortalRequest::new(
            requester(),
            RequestPayload::Borrow(BorrowRequest { book_id }),
        );

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["type"], "borrow");
        assert_eq!(json["bookId"], book_id.to_string());
        assert_eq!(json["status"], "pending");
        assert_eq!(json["requester"]["studentId"], "STU-1042");
    }

    #[test]
    fn test_payload_round_trips_through_json() {
        let request = PortalRequest::new(
            requester(),
            RequestPayload::Support(SupportRequest {
                subject: "Library card".to_string(),
                message: "Card reader rejects my card".to_string(),
            }),
        );

        let json = serde_json::to_string(&request).unwrap();
        let back: PortalRequest = serde_json::from_str(&json).unwrap();
        match back.payload {
            RequestPayload::Support(support) => {
                assert_eq!(support.subject, "Library card");
            }
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_kind_matches_tag() {
        let payload = RequestPayload::NewUser(NewUserRequest {
            user_id: Uuid::new_v4(),
            name: "N".to_string(),
            email: "n@campus.local".to_string(),
            role: Role::Student,
            department: None,
        });
        assert_eq!(payload.kind(), "new_user");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "new_user");
    }
}
