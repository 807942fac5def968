use crate::types::DbId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The price chart store was unreachable or failed mid-request.
    #[error("Store unavailable: {0}")]
    Transport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a missing price chart.
    pub fn chart_not_found(id: DbId) -> Self {
        Self::NotFound {
            entity: "price_chart",
            id,
        }
    }
}
