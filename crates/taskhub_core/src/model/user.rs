//! User identity references.
//!
//! Identities are owned by an external identity/session collaborator; core
//! code references them by id and never creates or mutates them.

use uuid::Uuid;

/// Stable identifier of an externally managed user.
pub type UserId = Uuid;
