//! The authenticated actor on whose behalf a permission check runs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity supplied by the external authentication layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}
