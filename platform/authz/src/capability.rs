use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{AuthzError, RoleConfig};

/// Independent grants carried by a [`RoleConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    CreateForm,
    CreateEvent,
    CreateFlyer,
    CreateBooking,
    CreateSolicitacoes,
    LocateCars,
    ViewDreReport,
    ManageExtensions,
    ManageQualityManagement,
    ManageProdutos,
}

struct CapabilityEntry {
    capability: Capability,
    key: &'static str,
    flag: fn(&RoleConfig) -> bool,
}

// One row per stored flag. `sudo` is applied by the engine, not here.
static CAPABILITIES: [CapabilityEntry; 10] = [
    CapabilityEntry {
        capability: Capability::CreateForm,
        key: "can_create_form",
        flag: |cfg| cfg.can_create_form,
    },
    CapabilityEntry {
        capability: Capability::CreateEvent,
        key: "can_create_event",
        flag: |cfg| cfg.can_create_event,
    },
    CapabilityEntry {
        capability: Capability::CreateFlyer,
        key: "can_create_flyer",
        flag: |cfg| cfg.can_create_flyer,
    },
    CapabilityEntry {
        capability: Capability::CreateBooking,
        key: "can_create_booking",
        flag: |cfg| cfg.can_create_booking,
    },
    CapabilityEntry {
        capability: Capability::CreateSolicitacoes,
        key: "can_create_solicitacoes",
        flag: |cfg| cfg.can_create_solicitacoes,
    },
    CapabilityEntry {
        capability: Capability::LocateCars,
        key: "can_locate_cars",
        flag: |cfg| cfg.can_locate_cars,
    },
    CapabilityEntry {
        capability: Capability::ViewDreReport,
        key: "can_view_dre_report",
        flag: |cfg| cfg.can_view_dre_report,
    },
    CapabilityEntry {
        capability: Capability::ManageExtensions,
        key: "can_manage_extensions",
        flag: |cfg| cfg.can_manage_extensions,
    },
    CapabilityEntry {
        capability: Capability::ManageQualityManagement,
        key: "can_manage_quality_management",
        flag: |cfg| cfg.can_manage_quality_management,
    },
    CapabilityEntry {
        capability: Capability::ManageProdutos,
        key: "can_manage_produtos",
        flag: |cfg| cfg.can_manage_produtos,
    },
];

impl Capability {
    pub const ALL: [Capability; 10] = [
        Capability::CreateForm,
        Capability::CreateEvent,
        Capability::CreateFlyer,
        Capability::CreateBooking,
        Capability::CreateSolicitacoes,
        Capability::LocateCars,
        Capability::ViewDreReport,
        Capability::ManageExtensions,
        Capability::ManageQualityManagement,
        Capability::ManageProdutos,
    ];

    fn entry(self) -> &'static CapabilityEntry {
        // ALL and CAPABILITIES share the declaration order of the enum.
        &CAPABILITIES[self as usize]
    }

    /// Field name of the flag in the stored role configuration.
    pub fn key(self) -> &'static str {
        self.entry().key
    }

    /// Whether the flag itself is set, ignoring `sudo`.
    pub fn flag(self, cfg: &RoleConfig) -> bool {
        (self.entry().flag)(cfg)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Capability {
    type Err = AuthzError;

    /// Accepts the stored key (`can_create_form`) or the bare name (`create_form`).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let bare = value.strip_prefix("can_").unwrap_or(value);
        CAPABILITIES
            .iter()
            .find(|entry| entry.key.strip_prefix("can_") == Some(bare))
            .map(|entry| entry.capability)
            .ok_or_else(|| AuthzError::UnknownCapability(value.to_string()))
    }
}

/// Portal sections gated by a view check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Area {
    Forms,
    Events,
    Flyers,
    Rooms,
    Cars,
    Shop,
    Chat,
}

impl Area {
    pub const ALL: [Area; 7] = [
        Area::Forms,
        Area::Events,
        Area::Flyers,
        Area::Rooms,
        Area::Cars,
        Area::Shop,
        Area::Chat,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Area::Forms => "forms",
            Area::Events => "events",
            Area::Flyers => "flyers",
            Area::Rooms => "rooms",
            Area::Cars => "cars",
            Area::Shop => "shop",
            Area::Chat => "chat",
        }
    }

    /// Kiosk accounts keep access to exempt areas.
    pub fn totem_exempt(self) -> bool {
        matches!(self, Area::Shop)
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
