use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("trip length must be between 1 and 7 days, got {0}")]
    InvalidTripLength(u8),
    #[error("insufficient data: the {dataset} dataset is empty")]
    InsufficientData { dataset: &'static str },
}

impl PlanError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidTripLength(_) => "InvalidTripLength",
            Self::InsufficientData { .. } => "InsufficientDataError",
        }
    }
}
