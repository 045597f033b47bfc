use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, EnumIter, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn ensure(&self, required: Role) -> Result<(), RightsError> {
        if *self == Role::Admin || *self == required {
            Ok(())
        } else {
            Err(RightsError { role: *self, required })
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("role `{role}` may not perform `{required}` actions")]
pub struct RightsError {
    pub role: Role,
    pub required: Role,
}
