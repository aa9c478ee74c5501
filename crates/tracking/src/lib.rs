use std::{error::Error, fmt};

use model::{vehicle::Vehicle, ValidationError};
use utility::id::Id;

pub mod catalog;
pub mod client;
pub mod config;
pub mod database;
pub mod deadline;
pub mod eta;
pub mod events;
pub mod history;
pub mod liveness;
pub mod memory;
pub mod nearby;
pub mod retention;
pub mod server;

#[cfg(test)]
mod testing;

#[derive(Debug)]
pub enum TrackingError {
    Validation(ValidationError),
    NotFound(String),
    OutOfRegion { latitude: f64, longitude: f64 },
    Timeout,
    StorageFault(Box<dyn Error + Send + Sync>),
}

impl TrackingError {
    pub fn storage<T: Error + Send + Sync + 'static>(why: T) -> Self {
        Self::StorageFault(Box::new(why))
    }

    pub fn vehicle_not_found(id: &Id<Vehicle>) -> Self {
        Self::NotFound(format!("vehicle {id}"))
    }

    pub fn no_position(id: &Id<Vehicle>) -> Self {
        Self::NotFound(format!("position of vehicle {id}"))
    }
}

impl fmt::Display for TrackingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(why) => write!(f, "{why}"),
            Self::NotFound(what) => write!(f, "{what} not found"),
            Self::OutOfRegion {
                latitude,
                longitude,
            } => write!(
                f,
                "position ({latitude}, {longitude}) is outside the operating region"
            ),
            Self::Timeout => write!(f, "operation timed out"),
            Self::StorageFault(why) => write!(f, "storage fault: {why}"),
        }
    }
}

impl Error for TrackingError {}

impl From<ValidationError> for TrackingError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<database::DatabaseError> for TrackingError {
    fn from(value: database::DatabaseError) -> Self {
        match value {
            database::DatabaseError::NotFound => Self::NotFound("record".to_owned()),
            database::DatabaseError::Validation(why) => Self::Validation(why),
            database::DatabaseError::Other(why) => Self::StorageFault(why),
        }
    }
}

impl From<catalog::CatalogError> for TrackingError {
    fn from(value: catalog::CatalogError) -> Self {
        match value {
            catalog::CatalogError::NotFound => {
                Self::NotFound("catalog entry".to_owned())
            }
            catalog::CatalogError::Other(why) => Self::StorageFault(why),
        }
    }
}

impl From<tokio::time::error::Elapsed> for TrackingError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::Timeout
    }
}

pub type TrackingResult<O> = Result<O, TrackingError>;
