use async_graphql::{InputObject, SimpleObject};
use platform_authz::{Decision, FormAccess, PermissionSummary};

#[derive(Clone, Debug, SimpleObject)]
pub struct PermissionsPayload {
    pub user_id: Option<String>,
    pub sector: Option<String>,
    pub sudo: bool,
    pub totem: bool,
    pub capabilities: Vec<String>,
    pub areas: Vec<String>,
    pub admin_routes: Vec<String>,
}

impl From<PermissionSummary> for PermissionsPayload {
    fn from(summary: PermissionSummary) -> Self {
        Self {
            user_id: summary.user_id,
            sector: summary.sector,
            sudo: summary.sudo,
            totem: summary.totem,
            capabilities: summary
                .capabilities
                .iter()
                .map(|c| c.key().to_string())
                .collect(),
            areas: summary.areas.iter().map(|a| a.as_str().to_string()).collect(),
            admin_routes: summary
                .admin_routes
                .iter()
                .map(|r| r.to_string())
                .collect(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct DecisionPayload {
    pub allowed: bool,
    pub reason: String,
}

impl From<Decision> for DecisionPayload {
    fn from(decision: Decision) -> Self {
        Self {
            allowed: decision.is_allowed(),
            reason: decision.code().to_string(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct FormAccessPayload {
    pub form_id: String,
    pub view: DecisionPayload,
    pub edit: DecisionPayload,
}

/// Access-relevant fields of a form as sent by the client.
#[derive(Clone, Debug, InputObject)]
pub struct FormInput {
    pub id: String,
    pub user_id: String,
    pub owner_ids: Option<Vec<String>>,
    pub is_private: Option<bool>,
    pub allowed_users: Option<Vec<String>>,
    pub allowed_sectors: Option<Vec<String>>,
}

impl From<FormInput> for FormAccess {
    fn from(input: FormInput) -> Self {
        Self {
            id: input.id,
            user_id: input.user_id,
            owner_ids: input.owner_ids.unwrap_or_default(),
            is_private: input.is_private.unwrap_or(false),
            allowed_users: input.allowed_users.unwrap_or_default(),
            allowed_sectors: input.allowed_sectors.unwrap_or_default(),
        }
    }
}
