use std::fmt;

use serde::Serialize;

use crate::{AuthzError, Capability};

/// Why a check succeeded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowReason {
    Sudo,
    Capability(Capability),
    /// Route covered by the DRE report grant.
    DreReport,
    RouteGranted,
    OpenArea,
    /// The shop is open to every identified caller.
    Shop,
    Creator,
    CoOwner,
    /// Create-capable users may edit any form.
    FormEditor,
    PublicForm,
    AllowedUser,
    AllowedSector,
    /// Whole-collection listing without per-item checks.
    Listing,
}

impl AllowReason {
    pub fn code(self) -> &'static str {
        match self {
            AllowReason::Sudo => "sudo",
            AllowReason::Capability(_) => "capability",
            AllowReason::DreReport => "dre_report",
            AllowReason::RouteGranted => "route_granted",
            AllowReason::OpenArea => "open_area",
            AllowReason::Shop => "shop",
            AllowReason::Creator => "creator",
            AllowReason::CoOwner => "co_owner",
            AllowReason::FormEditor => "form_editor",
            AllowReason::PublicForm => "public_form",
            AllowReason::AllowedUser => "allowed_user",
            AllowReason::AllowedSector => "allowed_sector",
            AllowReason::Listing => "listing",
        }
    }
}

/// Why a check failed. Denials are ordinary outcomes, not errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// No role configuration was available for the caller.
    NoProfile,
    /// The caller has no user id.
    NoIdentity,
    TotemAccount,
    MissingCapability(Capability),
    RouteNotGranted,
    HiddenForm,
    NotAllowListed,
    UnsupportedAction,
}

impl DenyReason {
    pub fn code(self) -> &'static str {
        match self {
            DenyReason::NoProfile => "no_profile",
            DenyReason::NoIdentity => "no_identity",
            DenyReason::TotemAccount => "totem_account",
            DenyReason::MissingCapability(_) => "missing_capability",
            DenyReason::RouteNotGranted => "route_not_granted",
            DenyReason::HiddenForm => "hidden_form",
            DenyReason::NotAllowListed => "not_allow_listed",
            DenyReason::UnsupportedAction => "unsupported_action",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::MissingCapability(capability) => {
                write!(f, "{} ({capability})", self.code())
            }
            other => f.write_str(other.code()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    Allowed(AllowReason),
    Denied(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed(_))
    }

    /// Stable code of the deciding rule, for logs and API payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Decision::Allowed(reason) => reason.code(),
            Decision::Denied(reason) => reason.code(),
        }
    }

    /// Turn a denial into an [`AuthzError::Denied`] at an enforcement point.
    pub fn ensure(
        self,
        action: impl Into<String>,
        resource: impl Into<String>,
    ) -> Result<AllowReason, AuthzError> {
        match self {
            Decision::Allowed(reason) => Ok(reason),
            Decision::Denied(reason) => Err(AuthzError::Denied {
                action: action.into(),
                resource: resource.into(),
                reason,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ensure_carries_the_denial() {
        let err = Decision::Denied(DenyReason::HiddenForm)
            .ensure("view", "form:f1")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "action view denied for resource form:f1: hidden_form"
        );
    }

    #[test]
    fn missing_capability_names_the_flag() {
        let reason = DenyReason::MissingCapability(Capability::LocateCars);
        assert_eq!(reason.to_string(), "missing_capability (can_locate_cars)");
    }

    #[test]
    fn serializes_with_outcome_tag() {
        let value = serde_json::to_value(Decision::Allowed(AllowReason::Creator)).unwrap();
        assert_eq!(value, json!({"outcome": "allowed", "reason": "creator"}));
    }
}
