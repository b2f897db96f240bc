use thiserror::Error;

/// First rule an order violated. `Display` is the human-readable reason that
/// ends up in ingestion logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("date_created is required and must be valid")]
    MissingDateCreated,

    #[error("date_created cannot be in the future")]
    DateCreatedInFuture,

    #[error("{field} must be positive")]
    NotPositive { field: &'static str },

    #[error("items must not be empty")]
    NoItems,

    #[error("invalid item at index {index}: {violation}")]
    Item {
        index: usize,
        violation: ItemViolation,
    },

    #[error("duplicate chrt_id {chrt_id} at index {index}")]
    DuplicateChrtId { index: usize, chrt_id: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ItemViolation {
    #[error("item.track_number is required")]
    MissingTrackNumber,

    #[error("item.track_number must match order.track_number")]
    TrackNumberMismatch,

    #[error("item.chrt_id is required and must be non-zero")]
    ZeroChrtId,
}

impl ItemViolation {
    pub fn field(&self) -> &'static str {
        match self {
            ItemViolation::MissingTrackNumber | ItemViolation::TrackNumberMismatch => {
                "item.track_number"
            }
            ItemViolation::ZeroChrtId => "item.chrt_id",
        }
    }
}

impl ValidationError {
    /// Dotted path of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Required { field } | ValidationError::NotPositive { field } => *field,
            ValidationError::MissingDateCreated | ValidationError::DateCreatedInFuture => {
                "date_created"
            }
            ValidationError::NoItems => "items",
            ValidationError::Item { violation, .. } => violation.field(),
            ValidationError::DuplicateChrtId { .. } => "item.chrt_id",
        }
    }

    /// Index of the failing item, for item-level violations.
    pub fn item_index(&self) -> Option<usize> {
        match self {
            ValidationError::Item { index, .. } | ValidationError::DuplicateChrtId { index, .. } => {
                Some(*index)
            }
            _ => None,
        }
    }
}
