use serde::{Deserialize, Serialize};

use crate::role_config::null_as_default;

/// The slice of a form record the access policy reads.
///
/// Forms carry many more fields (questions, answers, styling); none of them
/// influence access and they are ignored on deserialization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormAccess {
    pub id: String,
    /// Creator of the form.
    pub user_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub owner_ids: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_private: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub allowed_users: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub allowed_sectors: Vec<String>,
}

impl FormAccess {
    pub fn new(id: impl Into<String>, creator: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_id: creator.into(),
            ..Self::default()
        }
    }

    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }

    pub fn with_owners<I, S>(mut self, owners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.owner_ids.extend(owners.into_iter().map(Into::into));
        self
    }

    pub fn with_allowed_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_users.extend(users.into_iter().map(Into::into));
        self
    }

    pub fn with_allowed_sectors<I, S>(mut self, sectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_sectors
            .extend(sectors.into_iter().map(Into::into));
        self
    }

    pub fn is_creator(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    pub fn is_co_owner(&self, user_id: &str) -> bool {
        self.owner_ids.iter().any(|owner| owner == user_id)
    }

    pub fn allows_user(&self, user_id: &str) -> bool {
        self.allowed_users.iter().any(|allowed| allowed == user_id)
    }

    pub fn allows_sector(&self, sector: Option<&str>) -> bool {
        sector.is_some_and(|sector| self.allowed_sectors.iter().any(|allowed| allowed == sector))
    }
}
