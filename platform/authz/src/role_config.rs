use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::AuthzError;

/// Per-user permission record as stored by the profile service.
///
/// Every field is optional in the stored blob. A missing key and an explicit
/// `null` both resolve to `false` / an empty set, so an incomplete profile can
/// only ever narrow access.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RoleConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub sudo: bool,
    #[serde(rename = "isTotem", default, deserialize_with = "null_as_default")]
    pub is_totem: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub admin_pages: BTreeSet<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub can_create_form: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub can_create_event: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub can_create_flyer: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub can_create_booking: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub can_locate_cars: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub can_view_dre_report: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub can_manage_extensions: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub can_manage_quality_management: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub can_manage_produtos: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub can_create_solicitacoes: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hidden_forms: BTreeSet<String>,
}

impl RoleConfig {
    pub fn from_json(raw: &str) -> Result<Self, AuthzError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, AuthzError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Super-user profile, mostly useful for fixtures and bootstrap accounts.
    pub fn sudo() -> Self {
        Self {
            sudo: true,
            ..Self::default()
        }
    }

    pub fn totem() -> Self {
        Self {
            is_totem: true,
            ..Self::default()
        }
    }

    pub fn with_admin_pages<I, S>(mut self, pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.admin_pages.extend(pages.into_iter().map(Into::into));
        self
    }

    pub fn with_hidden_forms<I, S>(mut self, forms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hidden_forms.extend(forms.into_iter().map(Into::into));
        self
    }

    pub fn hides(&self, form_id: &str) -> bool {
        self.hidden_forms.contains(form_id)
    }
}

/// Serde helper: an explicit `null` reads as `T::default()`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_object_is_the_default_profile() {
        let cfg = RoleConfig::from_json("{}").unwrap();
        assert_eq!(cfg, RoleConfig::default());
        assert!(!cfg.sudo);
        assert!(cfg.admin_pages.is_empty());
    }

    #[test]
    fn explicit_nulls_collapse_to_defaults() {
        let cfg = RoleConfig::from_value(json!({
            "sudo": null,
            "isTotem": null,
            "admin_pages": null,
            "can_manage_extensions": null,
            "hidden_forms": null,
        }))
        .unwrap();
        assert_eq!(cfg, RoleConfig::default());
    }

    #[test]
    fn reads_stored_blob_shape() {
        let cfg = RoleConfig::from_value(json!({
            "sudo": false,
            "isTotem": true,
            "admin_pages": ["/admin", "/admin/rooms"],
            "can_create_form": true,
            "can_view_dre_report": true,
            "hidden_forms": ["f1", "f2"],
            "theme": "dark",
        }))
        .unwrap();
        assert!(cfg.is_totem);
        assert!(cfg.can_create_form);
        assert!(cfg.can_view_dre_report);
        assert!(cfg.admin_pages.contains("/admin/rooms"));
        assert!(cfg.hides("f2"));
        assert!(!cfg.hides("f3"));
    }

    #[test]
    fn totem_flag_keeps_its_wire_name() {
        let raw = serde_json::to_value(RoleConfig::totem()).unwrap();
        assert_eq!(raw["isTotem"], json!(true));
        assert!(raw.get("is_totem").is_none());
    }

    #[test]
    fn malformed_blob_is_reported() {
        let err = RoleConfig::from_json(r#"{"sudo": "yes"}"#).unwrap_err();
        assert!(matches!(err, AuthzError::InvalidRoleConfig(_)));
    }
}
