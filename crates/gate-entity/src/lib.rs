//! Domain entities for the Atrium Gate service.

pub mod session;
pub mod token;

pub use session::{GateSession, NewGateSession, NewVisitor, SessionStatus, VisitPurpose};
pub use token::TokenPayload;
