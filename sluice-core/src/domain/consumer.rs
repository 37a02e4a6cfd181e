//! Consumer domain model
//!
//! The authenticated actor behind a request.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::project::Group;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
    pub id: Uuid,
    pub username: String,
    pub groups: Vec<Group>,
}
