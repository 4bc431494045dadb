//! Admin route catalog and grant matching.
//!
//! Route identifiers are plain slash-delimited paths rooted at [`ADMIN`].
//! A grant on a route covers the route itself and every strict descendant
//! (`/admin/food` covers `/admin/food/dre`); containment never flows upward.

pub const ADMIN: &str = "/admin";
pub const ADMIN_USERS: &str = "/admin/users";
pub const ADMIN_SECTORS: &str = "/admin/sectors";
pub const ADMIN_ROOMS: &str = "/admin/rooms";
pub const ADMIN_VEHICLES: &str = "/admin/vehicles";
pub const ADMIN_FORMS: &str = "/admin/forms";
pub const ADMIN_EVENTS: &str = "/admin/events";
pub const ADMIN_FLYERS: &str = "/admin/flyers";
pub const ADMIN_SHOP: &str = "/admin/shop";
pub const ADMIN_SHOP_ORDERS: &str = "/admin/shop/orders";
pub const ADMIN_FOOD: &str = "/admin/food";
pub const ADMIN_FOOD_MENU: &str = "/admin/food/menu";
pub const ADMIN_FOOD_DRE: &str = "/admin/food/dre";
pub const ADMIN_QUALITY: &str = "/admin/quality";
pub const ADMIN_EXTENSIONS: &str = "/admin/extensions";
pub const ADMIN_NOTIFICATIONS: &str = "/admin/notifications";

/// Routes implied by `can_view_dre_report`, root first.
pub const DRE_REPORT_ROUTES: [&str; 3] = [ADMIN, ADMIN_FOOD, ADMIN_FOOD_DRE];

/// `(route, parent)` rows of the built-in catalog.
const PORTAL_ROUTES: &[(&str, Option<&str>)] = &[
    (ADMIN, None),
    (ADMIN_USERS, Some(ADMIN)),
    (ADMIN_SECTORS, Some(ADMIN)),
    (ADMIN_ROOMS, Some(ADMIN)),
    (ADMIN_VEHICLES, Some(ADMIN)),
    (ADMIN_FORMS, Some(ADMIN)),
    (ADMIN_EVENTS, Some(ADMIN)),
    (ADMIN_FLYERS, Some(ADMIN)),
    (ADMIN_SHOP, Some(ADMIN)),
    (ADMIN_SHOP_ORDERS, Some(ADMIN_SHOP)),
    (ADMIN_FOOD, Some(ADMIN)),
    (ADMIN_FOOD_MENU, Some(ADMIN_FOOD)),
    (ADMIN_FOOD_DRE, Some(ADMIN_FOOD)),
    (ADMIN_QUALITY, Some(ADMIN)),
    (ADMIN_EXTENSIONS, Some(ADMIN)),
    (ADMIN_NOTIFICATIONS, Some(ADMIN)),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouteEntry {
    pub path: &'static str,
    pub parent: Option<&'static str>,
}

/// Static, hierarchical catalog of admin route identifiers.
#[derive(Clone, Debug)]
pub struct RouteRegistry {
    entries: Vec<RouteEntry>,
}

impl Default for RouteRegistry {
    fn default() -> Self {
        Self::portal()
    }
}

impl RouteRegistry {
    /// The catalog shipped with the portal.
    pub fn portal() -> Self {
        Self::from_rows(PORTAL_ROUTES)
    }

    pub fn from_rows(rows: &[(&'static str, Option<&'static str>)]) -> Self {
        Self {
            entries: rows
                .iter()
                .map(|&(path, parent)| RouteEntry { path, parent })
                .collect(),
        }
    }

    /// Routes in declaration order.
    pub fn routes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.path)
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, route: &str) -> bool {
        self.entry(route).is_some()
    }

    pub fn parent(&self, route: &str) -> Option<&'static str> {
        self.entry(route).and_then(|entry| entry.parent)
    }

    pub fn children<'a>(&'a self, route: &'a str) -> impl Iterator<Item = &'static str> + 'a {
        self.entries
            .iter()
            .filter(move |entry| entry.parent == Some(route))
            .map(|entry| entry.path)
    }

    /// Chain from the root down to `route`, inclusive. Empty for unknown routes.
    pub fn ancestors(&self, route: &str) -> Vec<&'static str> {
        let mut chain = Vec::new();
        let mut current = self.entry(route);
        while let Some(entry) = current {
            // A malformed catalog could loop; a chain never exceeds the catalog.
            if chain.len() == self.entries.len() {
                break;
            }
            chain.push(entry.path);
            current = entry.parent.and_then(|parent| self.entry(parent));
        }
        chain.reverse();
        chain
    }

    fn entry(&self, route: &str) -> Option<&RouteEntry> {
        self.entries.iter().find(|entry| entry.path == route)
    }
}

/// Whether `requested` is covered by any of the `granted` routes.
///
/// A grant matches its exact path and any path below it (`g + "/" + ...`).
/// Matching is case-sensitive with no wildcard syntax. Empty grants match
/// nothing.
pub fn route_is_granted<I, S>(granted: I, requested: &str) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    granted
        .into_iter()
        .any(|grant| covers(grant.as_ref(), requested))
}

fn covers(grant: &str, requested: &str) -> bool {
    match requested.strip_prefix(grant) {
        Some("") => true,
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}
