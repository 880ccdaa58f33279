//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use gate_entity::VisitPurpose;

/// Check-in request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CheckinRequest {
    /// Visitor display name.
    #[validate(length(min = 1, max = 80, message = "Display name is required"))]
    pub display_name: String,
    /// Optional contact email.
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    /// Stated purpose of the visit.
    pub purpose: Option<VisitPurpose>,
    /// Honeypot field. Real clients never fill this in.
    #[serde(default)]
    pub website: Option<String>,
}

impl CheckinRequest {
    /// Whether the honeypot field was filled in.
    pub fn is_bot(&self) -> bool {
        self.website.as_deref().is_some_and(|w| !w.is_empty())
    }
}
