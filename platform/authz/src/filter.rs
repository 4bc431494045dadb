use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    Action, Area, AuthzError, Capability, FormAccess, PolicyEngine, Resource, RoleConfig,
    RouteRegistry, Subject,
};

/// Whole-collection form listing.
///
/// Only kiosk accounts and callers without a profile get an empty list; every
/// other caller receives the input untouched. Per-form privacy is enforced when
/// a single form is opened, not here. Use [`visible_forms`] for a listing that
/// applies the per-form check.
pub fn get_accessible_forms<'f>(
    cfg: Option<&RoleConfig>,
    forms: &'f [FormAccess],
) -> Vec<&'f FormAccess> {
    match cfg {
        Some(cfg) if cfg.sudo || !cfg.is_totem => forms.iter().collect(),
        _ => Vec::new(),
    }
}

/// Forms the subject may open, one view check per form.
pub fn visible_forms<'f>(subject: &Subject<'_>, forms: &'f [FormAccess]) -> Vec<&'f FormAccess> {
    let engine = PolicyEngine;
    forms
        .iter()
        .filter(|form| {
            engine
                .evaluate(subject, &Resource::form(form), Action::View)
                .is_allowed()
        })
        .collect()
}

/// How form collections are narrowed before they reach a listing page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormListing {
    /// Same result as [`get_accessible_forms`].
    #[default]
    PassThrough,
    /// Same result as [`visible_forms`].
    PerItem,
}

impl FormListing {
    pub fn as_str(self) -> &'static str {
        match self {
            FormListing::PassThrough => "pass-through",
            FormListing::PerItem => "per-item",
        }
    }
}

impl fmt::Display for FormListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormListing {
    type Err = AuthzError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pass-through" | "passthrough" => Ok(FormListing::PassThrough),
            "per-item" | "peritem" => Ok(FormListing::PerItem),
            _ => Err(AuthzError::UnknownListing(value.to_string())),
        }
    }
}

pub fn listed_forms<'f>(
    subject: &Subject<'_>,
    forms: &'f [FormAccess],
    mode: FormListing,
) -> Vec<&'f FormAccess> {
    match mode {
        FormListing::PassThrough => get_accessible_forms(subject.config(), forms),
        FormListing::PerItem => visible_forms(subject, forms),
    }
}

/// Registered admin routes the subject may open, in catalog order.
pub fn accessible_admin_routes(
    subject: &Subject<'_>,
    registry: &RouteRegistry,
) -> Vec<&'static str> {
    let engine = PolicyEngine;
    registry
        .routes()
        .filter(|route| {
            engine
                .evaluate(subject, &Resource::AdminRoute(*route), Action::View)
                .is_allowed()
        })
        .collect()
}

/// Everything a client needs to gate its navigation for one caller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PermissionSummary {
    pub user_id: Option<String>,
    pub sector: Option<String>,
    pub sudo: bool,
    pub totem: bool,
    pub capabilities: Vec<Capability>,
    pub areas: Vec<Area>,
    pub admin_routes: Vec<&'static str>,
}

impl PermissionSummary {
    pub fn resolve(subject: &Subject<'_>, registry: &RouteRegistry) -> Self {
        let engine = PolicyEngine;
        let capabilities = Capability::ALL
            .into_iter()
            .filter(|capability| {
                engine
                    .evaluate(subject, &Resource::Capability(*capability), Action::Use)
                    .is_allowed()
            })
            .collect();
        let areas = Area::ALL
            .into_iter()
            .filter(|area| {
                engine
                    .evaluate(subject, &Resource::Area(*area), Action::View)
                    .is_allowed()
            })
            .collect();
        Self {
            user_id: subject.user_id().map(str::to_string),
            sector: subject.sector().map(str::to_string),
            sudo: subject.config().is_some_and(|cfg| cfg.sudo),
            totem: subject.config().is_some_and(|cfg| cfg.is_totem),
            capabilities,
            areas,
            admin_routes: accessible_admin_routes(subject, registry),
        }
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn can_view(&self, area: Area) -> bool {
        self.areas.contains(&area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::{ADMIN, ADMIN_FOOD, ADMIN_FOOD_DRE, ADMIN_ROOMS};

    fn forms() -> Vec<FormAccess> {
        vec![
            FormAccess::new("public", "u9"),
            FormAccess::new("secret", "u9").private(),
            FormAccess::new("team", "u9").private().with_allowed_sectors(["TI"]),
            FormAccess::new("mine", "u1").private(),
        ]
    }

    fn ids(forms: Vec<&FormAccess>) -> Vec<&str> {
        forms.into_iter().map(|form| form.id.as_str()).collect()
    }

    #[test]
    fn pass_through_listing_keeps_private_forms() {
        let forms = forms();
        let cfg = RoleConfig::default();
        assert_eq!(get_accessible_forms(Some(&cfg), &forms).len(), 4);
        assert!(get_accessible_forms(None, &forms).is_empty());
        assert!(get_accessible_forms(Some(&RoleConfig::totem()), &forms).is_empty());
    }

    #[test]
    fn per_item_listing_applies_view_check() {
        let forms = forms();
        let cfg = RoleConfig::default();
        let subject = Subject::user(&cfg, "u1", Some("TI"));
        assert_eq!(ids(visible_forms(&subject, &forms)), vec!["public", "team", "mine"]);
        assert_eq!(
            ids(listed_forms(&subject, &forms, FormListing::PerItem)),
            vec!["public", "team", "mine"]
        );
        assert_eq!(listed_forms(&subject, &forms, FormListing::PassThrough).len(), 4);
    }

    #[test]
    fn listing_mode_parses_config_values() {
        assert_eq!("per-item".parse::<FormListing>().unwrap(), FormListing::PerItem);
        assert_eq!(" Pass-Through ".parse::<FormListing>().unwrap(), FormListing::PassThrough);
        assert!("strict".parse::<FormListing>().is_err());
    }

    #[test]
    fn admin_routes_for_dre_viewer() {
        let cfg = RoleConfig {
            can_view_dre_report: true,
            ..RoleConfig::default()
        }
        .with_admin_pages([ADMIN_ROOMS]);
        let routes = accessible_admin_routes(&Subject::from_config(&cfg), &RouteRegistry::portal());
        assert_eq!(routes, vec![ADMIN, ADMIN_ROOMS, ADMIN_FOOD, ADMIN_FOOD_DRE]);
    }

    #[test]
    fn summary_for_kiosk() {
        let cfg = RoleConfig {
            can_locate_cars: true,
            ..RoleConfig::totem()
        };
        let subject = Subject::user(&cfg, "kiosk", None);
        let summary = PermissionSummary::resolve(&subject, &RouteRegistry::portal());
        assert!(summary.totem);
        assert_eq!(summary.areas, vec![Area::Shop]);
        assert!(summary.has(Capability::LocateCars));
        assert!(summary.admin_routes.is_empty());
    }

    #[test]
    fn summary_for_sudo_covers_everything() {
        let cfg = RoleConfig::sudo();
        let registry = RouteRegistry::portal();
        let summary = PermissionSummary::resolve(&Subject::user(&cfg, "root", None), &registry);
        assert_eq!(summary.capabilities, Capability::ALL.to_vec());
        assert_eq!(summary.areas, Area::ALL.to_vec());
        assert_eq!(summary.admin_routes.len(), registry.len());
    }
}
