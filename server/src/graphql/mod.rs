mod permissions;

use std::sync::Arc;

use async_graphql::{Context, EmptyMutation, EmptySubscription, ErrorExtensions, Object, Schema};
use platform_api::{ApiError, ApiResult, ensure_allowed, internal_error};
use platform_authz::{
    Action, Capability, FormAccess, FormListing, PermissionSummary, PolicyEngine, Resource,
    RouteRegistry, listed_forms,
};
use tracing::instrument;

use permissions::{DecisionPayload, FormAccessPayload, FormInput, PermissionsPayload};

use crate::profiles::Caller;

pub type SchemaType = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

/// Process-wide data shared by every resolver.
#[derive(Clone)]
pub struct GraphqlData {
    pub registry: Arc<RouteRegistry>,
    pub form_listing: FormListing,
}

pub fn build_schema(data: GraphqlData) -> SchemaType {
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        .data(data)
        .finish()
}

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    #[instrument(name = "graphql.version", skip_all)]
    async fn version(&self) -> ApiResult<String> {
        Ok(env!("CARGO_PKG_VERSION").to_string())
    }

    /// Everything the caller may see or do, for building navigation.
    #[instrument(name = "graphql.permissions", skip_all)]
    async fn permissions(&self, ctx: &Context<'_>) -> async_graphql::Result<PermissionsPayload> {
        let caller = caller(ctx);
        let data = graphql_data(ctx)?;
        let summary = PermissionSummary::resolve(&caller.subject(), &data.registry);
        Ok(summary.into())
    }

    #[instrument(name = "graphql.admin_access", skip(self, ctx))]
    async fn admin_access(&self, ctx: &Context<'_>, route: String) -> DecisionPayload {
        let caller = caller(ctx);
        PolicyEngine
            .evaluate(&caller.subject(), &Resource::AdminRoute(&route), Action::View)
            .into()
    }

    #[instrument(name = "graphql.capability", skip(self, ctx))]
    async fn capability(
        &self,
        ctx: &Context<'_>,
        name: String,
    ) -> async_graphql::Result<DecisionPayload> {
        let capability = name
            .parse::<Capability>()
            .map_err(|err| ApiError::InvalidInput(err.to_string()).extend())?;
        let caller = caller(ctx);
        Ok(PolicyEngine
            .evaluate(&caller.subject(), &Resource::Capability(capability), Action::Use)
            .into())
    }

    #[instrument(name = "graphql.form_access", skip_all)]
    async fn form_access(&self, ctx: &Context<'_>, form: FormInput) -> FormAccessPayload {
        let caller = caller(ctx);
        let subject = caller.subject();
        let form = FormAccess::from(form);
        let engine = PolicyEngine;
        let resource = Resource::form(&form);
        FormAccessPayload {
            form_id: form.id.clone(),
            view: engine.evaluate(&subject, &resource, Action::View).into(),
            edit: engine.evaluate(&subject, &resource, Action::Edit).into(),
        }
    }

    /// Ids of the forms the caller's listing page shows.
    #[instrument(name = "graphql.visible_forms", skip_all)]
    async fn visible_forms(
        &self,
        ctx: &Context<'_>,
        forms: Vec<FormInput>,
    ) -> async_graphql::Result<Vec<String>> {
        let caller = caller(ctx);
        let data = graphql_data(ctx)?;
        let forms: Vec<FormAccess> = forms.into_iter().map(FormAccess::from).collect();
        Ok(listed_forms(&caller.subject(), &forms, data.form_listing)
            .into_iter()
            .map(|form| form.id.clone())
            .collect())
    }

    /// Guard used before a form update; fails with `FORBIDDEN` when denied.
    #[instrument(name = "graphql.require_form_edit", skip_all)]
    async fn require_form_edit(
        &self,
        ctx: &Context<'_>,
        form: FormInput,
    ) -> async_graphql::Result<String> {
        let caller = caller(ctx);
        let form = FormAccess::from(form);
        let decision =
            PolicyEngine.evaluate(&caller.subject(), &Resource::form(&form), Action::Edit);
        let reason = ensure_allowed(decision, "You do not have permission to edit this form")
            .map_err(|err| err.extend())?;
        Ok(reason.code().to_string())
    }
}

fn caller(ctx: &Context<'_>) -> Caller {
    ctx.data_opt::<Caller>().cloned().unwrap_or_default()
}

fn graphql_data<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a GraphqlData> {
    ctx.data::<GraphqlData>()
        .map_err(|_| internal_error(anyhow::anyhow!("missing graphql data")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::{Request, Value};
    use platform_authz::RoleConfig;
    use serde_json::json;

    fn schema(listing: FormListing) -> SchemaType {
        build_schema(GraphqlData {
            registry: Arc::new(RouteRegistry::portal()),
            form_listing: listing,
        })
    }

    fn caller(user: &str, sector: Option<&str>, cfg: RoleConfig) -> Caller {
        Caller {
            user_id: Some(user.to_string()),
            sector: sector.map(str::to_string),
            role_config: Some(cfg),
        }
    }

    #[tokio::test]
    async fn permissions_for_dre_viewer() {
        let cfg = RoleConfig {
            can_view_dre_report: true,
            ..RoleConfig::default()
        };
        let request = Request::new("{ permissions { userId capabilities adminRoutes } }")
            .data(caller("u1", None, cfg));
        let response = schema(FormListing::PassThrough).execute(request).await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let body = response.data.into_json().unwrap();
        assert_eq!(
            body,
            json!({"permissions": {
                "userId": "u1",
                "capabilities": ["can_view_dre_report"],
                "adminRoutes": ["/admin", "/admin/food", "/admin/food/dre"],
            }})
        );
    }

    #[tokio::test]
    async fn missing_schema_data_is_masked_as_internal() {
        let bare = Schema::build(QueryRoot, EmptyMutation, EmptySubscription).finish();
        let request =
            Request::new("{ permissions { sudo } }").data(caller("u1", None, RoleConfig::sudo()));
        let response = bare.execute(request).await;
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].message, "internal server error");
        let code = response.errors[0]
            .extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .cloned();
        assert_eq!(code, Some(Value::from("INTERNAL")));
    }

    #[tokio::test]
    async fn anonymous_admin_access_is_denied() {
        let response = schema(FormListing::PassThrough)
            .execute(Request::new(r#"{ adminAccess(route: "/admin") { allowed reason } }"#))
            .await;
        let body = response.data.into_json().unwrap();
        assert_eq!(
            body,
            json!({"adminAccess": {"allowed": false, "reason": "no_profile"}})
        );
    }

    #[tokio::test]
    async fn unknown_capability_is_bad_input() {
        let request = Request::new(r#"{ capability(name: "fly") { allowed } }"#)
            .data(caller("u1", None, RoleConfig::sudo()));
        let response = schema(FormListing::PassThrough).execute(request).await;
        assert_eq!(response.errors.len(), 1);
        let code = response.errors[0]
            .extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .cloned();
        assert_eq!(code, Some(Value::from("INVALID_INPUT")));
    }

    #[tokio::test]
    async fn form_access_reports_view_and_edit() {
        let cfg = RoleConfig::default().with_hidden_forms(["f1"]);
        let request = Request::new(
            r#"{ formAccess(form: {id: "f1", userId: "u9", isPrivate: true, allowedUsers: ["u2"]}) {
                formId view { allowed reason } edit { allowed reason }
            } }"#,
        )
        .data(caller("u2", None, cfg));
        let response = schema(FormListing::PassThrough).execute(request).await;
        let body = response.data.into_json().unwrap();
        assert_eq!(
            body,
            json!({"formAccess": {
                "formId": "f1",
                "view": {"allowed": false, "reason": "hidden_form"},
                "edit": {"allowed": false, "reason": "hidden_form"},
            }})
        );
    }

    #[tokio::test]
    async fn listing_mode_controls_visible_forms() {
        let query = r#"{ visibleForms(forms: [
            {id: "open", userId: "u9"},
            {id: "closed", userId: "u9", isPrivate: true}
        ]) }"#;
        let pass = schema(FormListing::PassThrough)
            .execute(Request::new(query).data(caller("u1", None, RoleConfig::default())))
            .await;
        assert_eq!(
            pass.data.into_json().unwrap(),
            json!({"visibleForms": ["open", "closed"]})
        );
        let per_item = schema(FormListing::PerItem)
            .execute(Request::new(query).data(caller("u1", None, RoleConfig::default())))
            .await;
        assert_eq!(
            per_item.data.into_json().unwrap(),
            json!({"visibleForms": ["open"]})
        );
    }

    #[tokio::test]
    async fn require_form_edit_rejects_with_forbidden() {
        let request = Request::new(
            r#"{ requireFormEdit(form: {id: "f1", userId: "u9", isPrivate: true}) }"#,
        )
        .data(caller("u1", None, RoleConfig::default()));
        let response = schema(FormListing::PassThrough).execute(request).await;
        assert_eq!(response.errors.len(), 1);
        let ext = response.errors[0].extensions.as_ref().unwrap();
        assert_eq!(ext.get("code").cloned(), Some(Value::from("FORBIDDEN")));
        assert_eq!(ext.get("reason").cloned(), Some(Value::from("not_allow_listed")));
    }

    #[tokio::test]
    async fn require_form_edit_passes_for_co_owner() {
        let request = Request::new(
            r#"{ requireFormEdit(form: {
                id: "f1", userId: "u9", ownerIds: ["u1"], isPrivate: true
            }) }"#,
        )
        .data(caller("u1", None, RoleConfig::default()));
        let response = schema(FormListing::PassThrough).execute(request).await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({"requireFormEdit": "co_owner"})
        );
    }
}
