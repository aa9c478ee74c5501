use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::HasId;

use crate::ExampleData;

/// Route metadata as provided by the route catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub name: String,
    pub number: String,
    pub origin: String,
    pub destination: String,
}

impl HasId for Route {
    type IdType = String;
}

impl ExampleData for Route {
    fn example_data() -> Self {
        Self {
            name: "Kottawa - Pettah".to_owned(),
            number: "138".to_owned(),
            origin: "Kottawa".to_owned(),
            destination: "Pettah".to_owned(),
        }
    }
}
