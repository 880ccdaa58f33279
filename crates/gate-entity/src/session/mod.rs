//! Gate session domain types.

pub mod model;
pub mod status;

pub use model::{GateSession, NewGateSession, NewVisitor};
pub use status::SessionStatus;

use serde::{Deserialize, Serialize};

/// Why the visitor says they are here. Free-form input is rejected;
/// the check-in form offers exactly these choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "visit_purpose", rename_all = "lowercase")]
#[serde(rename_all = "PascalCase")]
pub enum VisitPurpose {
    /// Hiring-related visit.
    Recruiter,
    /// Prospective or existing client.
    Client,
    /// Fellow builder.
    Collaborator,
    /// Just looking around.
    Curious,
}
