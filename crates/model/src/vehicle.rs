use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::HasId;

use crate::ExampleData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Active,
    Inactive,
    Maintenance,
    #[serde(alias = "out-of-service")]
    OutOfService,
}

/// Vehicle metadata as provided by the vehicle catalog.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub registration: String,
    pub capacity: u32,
    pub status: VehicleStatus,
    pub model: Option<String>,
}

impl HasId for Vehicle {
    type IdType = String;
}

impl Vehicle {
    pub fn is_active(&self) -> bool {
        self.status == VehicleStatus::Active
    }
}

impl ExampleData for Vehicle {
    fn example_data() -> Self {
        Self {
            registration: "NB-1234".to_owned(),
            capacity: 54,
            status: VehicleStatus::Active,
            model: Some("Ashok Leyland Viking".to_owned()),
        }
    }
}
