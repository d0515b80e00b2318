//! Google Cloud REST client backing [`InventorySource`] and [`MembershipSource`].

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::errors::InventoryError;
use crate::model::{Principal, PrincipalKind, Role};
use crate::normalize::identity::{
    normalize_custom_role, HierarchyAssetType, CUSTOM_ROLE_ASSET_TYPE, SERVICE_ACCOUNT_ASSET_TYPE,
};
use crate::settings::Endpoints;
use crate::sources::{InventorySource, MembershipSource, RawAsset, RawMembership, RawPolicyRecord};

/// Restricts policy search to bindings whose members an operator manages.
pub const IAM_POLICY_QUERY: &str =
    "memberTypes=(group OR user OR allUsers OR serviceAccount) OR memberTypes:deleted";

const QUOTA_PROJECT_HEADER: &str = "x-goog-user-project";

type Query = Vec<(&'static str, String)>;

/// A paginated list response.
trait Page: DeserializeOwned {
    type Item;
    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

macro_rules! page {
    ($name:ident, $field:ident, $item:ty) => {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct $name {
            #[serde(default)]
            $field: Vec<$item>,
            #[serde(default)]
            next_page_token: Option<String>,
        }

        impl Page for $name {
            type Item = $item;
            fn into_parts(self) -> (Vec<$item>, Option<String>) {
                (self.$field, self.next_page_token)
            }
        }
    };
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredefinedRole {
    name: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    included_permissions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectoryGroup {
    name: String,
    #[serde(default)]
    group_key: GroupKey,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct GroupKey {
    #[serde(default)]
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectoryUser {
    id: String,
    #[serde(default)]
    primary_email: String,
}

page!(ResourceSearchPage, results, RawAsset);
page!(PolicySearchPage, results, RawPolicyRecord);
page!(RolesPage, roles, PredefinedRole);
page!(GroupsPage, groups, DirectoryGroup);
page!(MembershipsPage, memberships, RawMembership);
page!(UsersPage, users, DirectoryUser);

#[derive(Clone)]
pub struct GcpClient {
    http: Client,
    access_token: String,
    quota_project_id: Option<String>,
    endpoints: Endpoints,
}

impl GcpClient {
    pub fn new(
        access_token: String,
        quota_project_id: Option<String>,
        endpoints: Endpoints,
    ) -> Result<Self, InventoryError> {
        let http = Client::builder()
            .user_agent(concat!("iam-inventory/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            access_token,
            quota_project_id,
            endpoints,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        query: &Query,
        bill_quota_project: bool,
    ) -> Result<T, InventoryError> {
        let mut request = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .query(query);
        if bill_quota_project {
            if let Some(project) = &self.quota_project_id {
                request = request.header(QUOTA_PROJECT_HEADER, project);
            }
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InventoryError::Remote {
                operation: operation.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }

    /// Follow `nextPageToken` until the listing is exhausted.
    async fn list_all<P: Page>(
        &self,
        operation: &str,
        url: &str,
        query: Query,
        bill_quota_project: bool,
    ) -> Result<Vec<P::Item>, InventoryError> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut page_query = query.clone();
            if let Some(token) = &page_token {
                page_query.push(("pageToken", token.clone()));
            }

            let page: P = self
                .get_json(operation, url, &page_query, bill_quota_project)
                .await?;
            let (batch, next) = page.into_parts();
            debug!(operation, fetched = batch.len(), "Fetched page");
            items.extend(batch);

            match next {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(items)
    }

    async fn search_resources(
        &self,
        scope: &str,
        asset_types: &[&str],
    ) -> Result<Vec<RawAsset>, InventoryError> {
        let url = format!("{}/{}:searchAllResources", self.endpoints.cloud_asset, scope);
        let query: Query = asset_types
            .iter()
            .map(|t| ("assetTypes", t.to_string()))
            .collect();
        self.list_all::<ResourceSearchPage>("search resources", &url, query, false)
            .await
    }

    async fn fetch_predefined_roles(&self) -> Result<Vec<Role>, InventoryError> {
        let url = format!("{}/roles", self.endpoints.iam);
        let query: Query = vec![("view", "FULL".to_string()), ("pageSize", "1000".to_string())];
        let roles = self
            .list_all::<RolesPage>("list predefined roles", &url, query, false)
            .await?;
        Ok(roles
            .into_iter()
            .map(|r| Role {
                id: r.name,
                title: r.title,
                permissions: r.included_permissions,
            })
            .collect())
    }

    async fn fetch_custom_roles(&self, scope: &str) -> Result<Vec<Role>, InventoryError> {
        let assets = self
            .search_resources(scope, &[CUSTOM_ROLE_ASSET_TYPE])
            .await?;
        Ok(assets.iter().map(normalize_custom_role).collect())
    }
}

#[async_trait]
impl InventorySource for GcpClient {
    async fn fetch_roles(&self, scope: &str) -> Result<Vec<Role>, InventoryError> {
        let mut roles = self.fetch_predefined_roles().await?;
        roles.extend(self.fetch_custom_roles(scope).await?);
        Ok(roles)
    }

    async fn fetch_hierarchy_assets(&self, scope: &str) -> Result<Vec<RawAsset>, InventoryError> {
        let asset_types: Vec<&str> = HierarchyAssetType::ALL
            .iter()
            .map(|t| t.asset_type())
            .collect();
        self.search_resources(scope, &asset_types).await
    }

    async fn fetch_service_account_assets(
        &self,
        scope: &str,
    ) -> Result<Vec<RawAsset>, InventoryError> {
        self.search_resources(scope, &[SERVICE_ACCOUNT_ASSET_TYPE])
            .await
    }

    async fn fetch_groups(&self, customer_id: &str) -> Result<Vec<Principal>, InventoryError> {
        let url = format!("{}/groups", self.endpoints.cloud_identity);
        let query: Query = vec![("parent", format!("customers/{customer_id}"))];
        let groups = self
            .list_all::<GroupsPage>("list groups", &url, query, true)
            .await?;
        Ok(groups
            .into_iter()
            .map(|g| Principal::new(g.name, g.group_key.id, PrincipalKind::Group))
            .collect())
    }

    async fn fetch_users(&self, customer_id: &str) -> Result<Vec<Principal>, InventoryError> {
        let url = format!("{}/users", self.endpoints.admin_directory);
        let query: Query = vec![
            ("customer", customer_id.to_string()),
            ("maxResults", "500".to_string()),
        ];
        let users = self
            .list_all::<UsersPage>("list users", &url, query, true)
            .await?;
        Ok(users
            .into_iter()
            .map(|u| Principal::new(u.id, u.primary_email, PrincipalKind::User))
            .collect())
    }

    async fn fetch_iam_policies(
        &self,
        scope: &str,
    ) -> Result<Vec<RawPolicyRecord>, InventoryError> {
        let url = format!(
            "{}/{}:searchAllIamPolicies",
            self.endpoints.cloud_asset, scope
        );
        let query: Query = vec![("query", IAM_POLICY_QUERY.to_string())];
        self.list_all::<PolicySearchPage>("search IAM policies", &url, query, false)
            .await
    }
}

#[async_trait]
impl MembershipSource for GcpClient {
    async fn list_memberships(
        &self,
        group_id: &str,
    ) -> Result<Vec<RawMembership>, InventoryError> {
        let url = format!("{}/{}/memberships", self.endpoints.cloud_identity, group_id);
        self.list_all::<MembershipsPage>(
            &format!("list memberships of {group_id}"),
            &url,
            Vec::new(),
            true,
        )
        .await
    }
}
