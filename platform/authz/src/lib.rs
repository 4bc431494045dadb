//! Access policy for the portal.
//!
//! Every check in this crate is a pure function of a [`Subject`] (the caller's
//! role configuration, user id and sector) and a [`Resource`]. Nothing here
//! performs I/O or raises on a denial: callers receive a [`Decision`] and the
//! enforcement layer decides whether a denial rejects the request or just
//! hides a UI element.

mod capability;
mod decision;
mod engine;
mod filter;
mod form;
mod role_config;
pub mod routes;

pub use capability::{Area, Capability};
pub use decision::{AllowReason, Decision, DenyReason};
pub use engine::{
    Action, PolicyEngine, Resource, Subject, can_access_form, can_create_booking, can_create_event,
    can_create_flyer, can_create_form, can_create_solicitacoes, can_edit_form, can_locate_cars,
    can_manage_extensions, can_manage_produtos, can_manage_quality_management, can_view_area,
    can_view_cars, can_view_chat, can_view_dre_report, can_view_events, can_view_flyers,
    can_view_forms, can_view_rooms, can_view_shop, has_admin_access,
};
pub use filter::{
    FormListing, PermissionSummary, accessible_admin_routes, get_accessible_forms, listed_forms,
    visible_forms,
};
pub use form::FormAccess;
pub use role_config::{RoleConfig, null_as_default};
pub use routes::{DRE_REPORT_ROUTES, RouteRegistry, route_is_granted};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("action {action} denied for resource {resource}: {reason}")]
    Denied {
        action: String,
        resource: String,
        reason: DenyReason,
    },
    #[error("invalid role configuration: {0}")]
    InvalidRoleConfig(#[from] serde_json::Error),
    #[error("unknown capability `{0}`")]
    UnknownCapability(String),
    #[error("unknown form listing mode `{0}`")]
    UnknownListing(String),
}
