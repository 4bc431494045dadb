use std::fmt;

use tracing::{debug, trace};

use crate::{
    AllowReason, Area, Capability, Decision, DenyReason, FormAccess, RoleConfig,
    routes::{DRE_REPORT_ROUTES, route_is_granted},
};

/// The caller as seen by the policy: profile, user id and sector.
///
/// Any part may be missing. Empty strings count as missing so an
/// unauthenticated request can never match an empty creator or sector.
#[derive(Clone, Copy, Debug, Default)]
pub struct Subject<'a> {
    config: Option<&'a RoleConfig>,
    user_id: Option<&'a str>,
    sector: Option<&'a str>,
}

impl<'a> Subject<'a> {
    pub fn new(
        config: Option<&'a RoleConfig>,
        user_id: Option<&'a str>,
        sector: Option<&'a str>,
    ) -> Self {
        Self {
            config,
            user_id: user_id.filter(|id| !id.is_empty()),
            sector: sector.filter(|sector| !sector.is_empty()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A subject known only by its profile, enough for route and capability checks.
    pub fn from_config(config: &'a RoleConfig) -> Self {
        Self::new(Some(config), None, None)
    }

    pub fn user(config: &'a RoleConfig, user_id: &'a str, sector: Option<&'a str>) -> Self {
        Self::new(Some(config), Some(user_id), sector)
    }

    pub fn config(&self) -> Option<&'a RoleConfig> {
        self.config
    }

    pub fn user_id(&self) -> Option<&'a str> {
        self.user_id
    }

    pub fn sector(&self) -> Option<&'a str> {
        self.sector
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Resource<'a> {
    AdminRoute(&'a str),
    Capability(Capability),
    Area(Area),
    /// `id` is the identifier checked against `hidden_forms`.
    Form { id: &'a str, form: &'a FormAccess },
}

impl<'a> Resource<'a> {
    pub fn form(form: &'a FormAccess) -> Self {
        Resource::Form { id: &form.id, form }
    }
}

impl fmt::Display for Resource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::AdminRoute(route) => write!(f, "route:{route}"),
            Resource::Capability(capability) => write!(f, "capability:{capability}"),
            Resource::Area(area) => write!(f, "area:{area}"),
            Resource::Form { id, .. } => write!(f, "form:{id}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    View,
    Edit,
    /// Exercise a capability (create, locate, manage).
    Use,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Edit => "edit",
            Action::Use => "use",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single entry point for every access decision in the portal.
#[derive(Clone, Copy, Default, Debug)]
pub struct PolicyEngine;

impl PolicyEngine {
    pub fn evaluate(
        &self,
        subject: &Subject<'_>,
        resource: &Resource<'_>,
        action: Action,
    ) -> Decision {
        let decision = match (resource, action) {
            (Resource::AdminRoute(route), Action::View) => admin_route(subject, route),
            (Resource::Capability(capability), Action::Use) => {
                capability_grant(subject, *capability)
            }
            (Resource::Area(area), Action::View) => area_view(subject, *area),
            (Resource::Form { id, form }, Action::View) => form_view(subject, id, form),
            (Resource::Form { id, form }, Action::Edit) => form_edit(subject, id, form),
            _ => Decision::Denied(DenyReason::UnsupportedAction),
        };
        match decision {
            Decision::Denied(reason) => debug!(
                user = subject.user_id().unwrap_or("-"),
                %action,
                %resource,
                reason = %reason,
                "access denied"
            ),
            Decision::Allowed(reason) => trace!(
                user = subject.user_id().unwrap_or("-"),
                %action,
                %resource,
                reason = reason.code(),
                "access allowed"
            ),
        }
        decision
    }
}

fn admin_route(subject: &Subject<'_>, route: &str) -> Decision {
    let Some(cfg) = subject.config() else {
        return Decision::Denied(DenyReason::NoProfile);
    };
    if cfg.sudo {
        return Decision::Allowed(AllowReason::Sudo);
    }
    if cfg.can_view_dre_report && DRE_REPORT_ROUTES.contains(&route) {
        return Decision::Allowed(AllowReason::DreReport);
    }
    if route_is_granted(&cfg.admin_pages, route) {
        Decision::Allowed(AllowReason::RouteGranted)
    } else {
        Decision::Denied(DenyReason::RouteNotGranted)
    }
}

fn capability_grant(subject: &Subject<'_>, capability: Capability) -> Decision {
    let Some(cfg) = subject.config() else {
        return Decision::Denied(DenyReason::NoProfile);
    };
    if cfg.sudo {
        Decision::Allowed(AllowReason::Sudo)
    } else if capability.flag(cfg) {
        Decision::Allowed(AllowReason::Capability(capability))
    } else {
        Decision::Denied(DenyReason::MissingCapability(capability))
    }
}

fn area_view(subject: &Subject<'_>, area: Area) -> Decision {
    if area.totem_exempt() {
        return match subject.user_id() {
            Some(_) => Decision::Allowed(AllowReason::Shop),
            None => Decision::Denied(DenyReason::NoIdentity),
        };
    }
    let Some(cfg) = subject.config() else {
        return Decision::Denied(DenyReason::NoProfile);
    };
    if cfg.sudo {
        Decision::Allowed(AllowReason::Sudo)
    } else if cfg.is_totem {
        Decision::Denied(DenyReason::TotemAccount)
    } else {
        Decision::Allowed(AllowReason::OpenArea)
    }
}

/// Shared prologue of the form checks: profile, identity, sudo, kiosk veto.
fn form_gate<'a>(subject: &Subject<'a>) -> Result<(&'a RoleConfig, &'a str), Decision> {
    let Some(cfg) = subject.config() else {
        return Err(Decision::Denied(DenyReason::NoProfile));
    };
    let Some(user_id) = subject.user_id() else {
        return Err(Decision::Denied(DenyReason::NoIdentity));
    };
    if cfg.sudo {
        return Err(Decision::Allowed(AllowReason::Sudo));
    }
    if cfg.is_totem {
        return Err(Decision::Denied(DenyReason::TotemAccount));
    }
    Ok((cfg, user_id))
}

fn form_view(subject: &Subject<'_>, form_id: &str, form: &FormAccess) -> Decision {
    let (cfg, user_id) = match form_gate(subject) {
        Ok(pair) => pair,
        Err(decision) => return decision,
    };
    if form.is_creator(user_id) {
        return Decision::Allowed(AllowReason::Creator);
    }
    if form.is_co_owner(user_id) {
        return Decision::Allowed(AllowReason::CoOwner);
    }
    private_access(cfg, user_id, subject.sector(), form_id, form)
}

fn form_edit(subject: &Subject<'_>, form_id: &str, form: &FormAccess) -> Decision {
    let (cfg, user_id) = match form_gate(subject) {
        Ok(pair) => pair,
        Err(decision) => return decision,
    };
    if form.is_creator(user_id) {
        return Decision::Allowed(AllowReason::Creator);
    }
    if form.is_co_owner(user_id) {
        return Decision::Allowed(AllowReason::CoOwner);
    }
    if cfg.can_create_form {
        return Decision::Allowed(AllowReason::FormEditor);
    }
    private_access(cfg, user_id, subject.sector(), form_id, form)
}

/// Tail shared by view and edit: public forms are open, private ones consult
/// the hidden list and then the allow-lists.
fn private_access(
    cfg: &RoleConfig,
    user_id: &str,
    sector: Option<&str>,
    form_id: &str,
    form: &FormAccess,
) -> Decision {
    if !form.is_private {
        Decision::Allowed(AllowReason::PublicForm)
    } else if cfg.hides(form_id) {
        Decision::Denied(DenyReason::HiddenForm)
    } else if form.allows_user(user_id) {
        Decision::Allowed(AllowReason::AllowedUser)
    } else if form.allows_sector(sector) {
        Decision::Allowed(AllowReason::AllowedSector)
    } else {
        Decision::Denied(DenyReason::NotAllowListed)
    }
}

pub fn has_admin_access(cfg: Option<&RoleConfig>, route: &str) -> bool {
    PolicyEngine
        .evaluate(
            &Subject::new(cfg, None, None),
            &Resource::AdminRoute(route),
            Action::View,
        )
        .is_allowed()
}

fn capability_check(cfg: Option<&RoleConfig>, capability: Capability) -> bool {
    PolicyEngine
        .evaluate(
            &Subject::new(cfg, None, None),
            &Resource::Capability(capability),
            Action::Use,
        )
        .is_allowed()
}

pub fn can_create_form(cfg: Option<&RoleConfig>) -> bool {
    capability_check(cfg, Capability::CreateForm)
}

pub fn can_create_event(cfg: Option<&RoleConfig>) -> bool {
    capability_check(cfg, Capability::CreateEvent)
}

pub fn can_create_flyer(cfg: Option<&RoleConfig>) -> bool {
    capability_check(cfg, Capability::CreateFlyer)
}

pub fn can_create_booking(cfg: Option<&RoleConfig>) -> bool {
    capability_check(cfg, Capability::CreateBooking)
}

pub fn can_create_solicitacoes(cfg: Option<&RoleConfig>) -> bool {
    capability_check(cfg, Capability::CreateSolicitacoes)
}

pub fn can_locate_cars(cfg: Option<&RoleConfig>) -> bool {
    capability_check(cfg, Capability::LocateCars)
}

pub fn can_view_dre_report(cfg: Option<&RoleConfig>) -> bool {
    capability_check(cfg, Capability::ViewDreReport)
}

pub fn can_manage_extensions(cfg: Option<&RoleConfig>) -> bool {
    capability_check(cfg, Capability::ManageExtensions)
}

pub fn can_manage_quality_management(cfg: Option<&RoleConfig>) -> bool {
    capability_check(cfg, Capability::ManageQualityManagement)
}

pub fn can_manage_produtos(cfg: Option<&RoleConfig>) -> bool {
    capability_check(cfg, Capability::ManageProdutos)
}

pub fn can_view_area(subject: &Subject<'_>, area: Area) -> bool {
    PolicyEngine
        .evaluate(subject, &Resource::Area(area), Action::View)
        .is_allowed()
}

fn view(cfg: Option<&RoleConfig>, area: Area) -> bool {
    can_view_area(&Subject::new(cfg, None, None), area)
}

pub fn can_view_forms(cfg: Option<&RoleConfig>) -> bool {
    view(cfg, Area::Forms)
}

pub fn can_view_events(cfg: Option<&RoleConfig>) -> bool {
    view(cfg, Area::Events)
}

pub fn can_view_flyers(cfg: Option<&RoleConfig>) -> bool {
    view(cfg, Area::Flyers)
}

pub fn can_view_rooms(cfg: Option<&RoleConfig>) -> bool {
    view(cfg, Area::Rooms)
}

pub fn can_view_cars(cfg: Option<&RoleConfig>) -> bool {
    view(cfg, Area::Cars)
}

pub fn can_view_chat(cfg: Option<&RoleConfig>) -> bool {
    view(cfg, Area::Chat)
}

/// The shop only needs an identified caller; the profile is not consulted.
pub fn can_view_shop(user_id: Option<&str>) -> bool {
    can_view_area(&Subject::new(None, user_id, None), Area::Shop)
}

pub fn can_access_form(
    cfg: Option<&RoleConfig>,
    form_id: &str,
    user_id: Option<&str>,
    form: &FormAccess,
    sector: Option<&str>,
) -> bool {
    PolicyEngine
        .evaluate(
            &Subject::new(cfg, user_id, sector),
            &Resource::Form { id: form_id, form },
            Action::View,
        )
        .is_allowed()
}

pub fn can_edit_form(
    cfg: Option<&RoleConfig>,
    user_id: Option<&str>,
    form_id: &str,
    form: &FormAccess,
    sector: Option<&str>,
) -> bool {
    PolicyEngine
        .evaluate(
            &Subject::new(cfg, user_id, sector),
            &Resource::Form { id: form_id, form },
            Action::Edit,
        )
        .is_allowed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::{ADMIN, ADMIN_FOOD, ADMIN_FOOD_DRE, ADMIN_FOOD_MENU, ADMIN_ROOMS};

    fn eval(subject: &Subject<'_>, resource: Resource<'_>, action: Action) -> Decision {
        PolicyEngine.evaluate(subject, &resource, action)
    }

    #[test]
    fn admin_route_reasons() {
        let dre = RoleConfig {
            can_view_dre_report: true,
            ..RoleConfig::default()
        }
        .with_admin_pages([ADMIN_ROOMS]);
        let subject = Subject::from_config(&dre);
        assert_eq!(
            eval(&subject, Resource::AdminRoute(ADMIN_FOOD), Action::View),
            Decision::Allowed(AllowReason::DreReport)
        );
        assert_eq!(
            eval(&subject, Resource::AdminRoute("/admin/rooms/7"), Action::View),
            Decision::Allowed(AllowReason::RouteGranted)
        );
        assert_eq!(
            eval(&subject, Resource::AdminRoute(ADMIN_FOOD_MENU), Action::View),
            Decision::Denied(DenyReason::RouteNotGranted)
        );
    }

    #[test]
    fn dre_grant_is_exactly_three_routes() {
        let dre = RoleConfig {
            can_view_dre_report: true,
            ..RoleConfig::default()
        };
        for route in [ADMIN, ADMIN_FOOD, ADMIN_FOOD_DRE] {
            assert!(has_admin_access(Some(&dre), route), "{route}");
        }
        assert!(!has_admin_access(Some(&dre), "/admin/food/dre/2024"));
        assert!(!has_admin_access(Some(&dre), ADMIN_ROOMS));
    }

    #[test]
    fn capability_denial_names_the_capability() {
        let cfg = RoleConfig::default();
        assert_eq!(
            eval(
                &Subject::from_config(&cfg),
                Resource::Capability(Capability::ManageExtensions),
                Action::Use
            ),
            Decision::Denied(DenyReason::MissingCapability(Capability::ManageExtensions))
        );
    }

    #[test]
    fn mismatched_action_is_denied_even_for_sudo() {
        let cfg = RoleConfig::sudo();
        let subject = Subject::user(&cfg, "u1", None);
        assert_eq!(
            eval(&subject, Resource::Area(Area::Forms), Action::Edit),
            Decision::Denied(DenyReason::UnsupportedAction)
        );
        assert_eq!(
            eval(&subject, Resource::AdminRoute(ADMIN), Action::Use),
            Decision::Denied(DenyReason::UnsupportedAction)
        );
    }

    #[test]
    fn empty_user_id_is_no_identity() {
        let cfg = RoleConfig::default();
        let form = FormAccess::new("f1", "");
        let subject = Subject::new(Some(&cfg), Some(""), None);
        assert_eq!(
            eval(&subject, Resource::form(&form), Action::View),
            Decision::Denied(DenyReason::NoIdentity)
        );
        assert!(!can_view_shop(Some("")));
    }

    #[test]
    fn sudo_beats_totem() {
        let cfg = RoleConfig {
            sudo: true,
            is_totem: true,
            ..RoleConfig::default()
        };
        assert!(can_view_forms(Some(&cfg)));
        let form = FormAccess::new("f1", "u9").private();
        assert!(can_access_form(Some(&cfg), "f1", Some("u1"), &form, None));
        assert!(can_edit_form(Some(&cfg), Some("u1"), "f1", &form, None));
    }

    #[test]
    fn co_owner_views_and_edits_hidden_private_form() {
        let cfg = RoleConfig::default().with_hidden_forms(["f1"]);
        let form = FormAccess::new("f1", "u9").private().with_owners(["u2"]);
        let subject = Subject::user(&cfg, "u2", None);
        assert_eq!(
            eval(&subject, Resource::form(&form), Action::View),
            Decision::Allowed(AllowReason::CoOwner)
        );
        assert_eq!(
            eval(&subject, Resource::form(&form), Action::Edit),
            Decision::Allowed(AllowReason::CoOwner)
        );
    }

    #[test]
    fn form_editor_may_edit_but_not_view_private_form() {
        let cfg = RoleConfig {
            can_create_form: true,
            ..RoleConfig::default()
        };
        let form = FormAccess::new("f1", "u9").private();
        assert!(can_edit_form(Some(&cfg), Some("u1"), "f1", &form, None));
        assert!(!can_access_form(Some(&cfg), "f1", Some("u1"), &form, None));
    }

    #[test]
    fn stranger_may_edit_public_form() {
        let cfg = RoleConfig::default();
        let form = FormAccess::new("f1", "u9");
        assert!(can_access_form(Some(&cfg), "f1", Some("u1"), &form, None));
        assert!(can_edit_form(Some(&cfg), Some("u1"), "f1", &form, None));
        assert_eq!(
            eval(&Subject::user(&cfg, "u1", None), Resource::form(&form), Action::Edit),
            Decision::Allowed(AllowReason::PublicForm)
        );
    }

    #[test]
    fn hidden_list_only_restricts_private_forms() {
        let cfg = RoleConfig::default().with_hidden_forms(["f1"]);
        let public = FormAccess::new("f1", "u9");
        assert!(can_edit_form(Some(&cfg), Some("u1"), "f1", &public, None));
        let private = public.clone().private().with_allowed_users(["u1"]);
        assert!(!can_edit_form(Some(&cfg), Some("u1"), "f1", &private, None));
    }

    #[test]
    fn hidden_list_uses_the_given_form_id() {
        let cfg = RoleConfig::default().with_hidden_forms(["legacy-7"]);
        let form = FormAccess::new("f7", "u9").private().with_allowed_users(["u1"]);
        assert!(can_access_form(Some(&cfg), "f7", Some("u1"), &form, None));
        assert!(!can_access_form(Some(&cfg), "legacy-7", Some("u1"), &form, None));
        assert!(!can_edit_form(Some(&cfg), Some("u1"), "legacy-7", &form, None));
    }
}
