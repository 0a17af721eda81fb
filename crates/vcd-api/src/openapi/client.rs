// Hand-crafted async HTTP client for the Cloud Director OpenAPI.
//
// Base path: /cloudapi/1.0.0/
// Auth: Authorization: Bearer <token>
// Versioning: Accept: application/json;version=<major.minor>

use std::future::Future;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, LOCATION};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

use super::types;
use crate::auth::{ACCESS_TOKEN_HEADER, Credentials, SessionScope};
use crate::transport::TransportConfig;
use crate::version::ApiVersion;
use crate::Error;

const OPENAPI_PREFIX: &str = "cloudapi/1.0.0/";

/// Scopes a provider session's request to one tenant organization.
const TENANT_CONTEXT_HEADER: &str = "X-VMWARE-VCLOUD-TENANT-CONTEXT";

// ── Error response shape from the OpenAPI ────────────────────────────

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    minor_error_code: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the Cloud Director OpenAPI.
///
/// Every request carries the bearer token and the negotiated API version.
/// Mutations that the server runs asynchronously (HTTP 202 + `Location`)
/// are awaited by polling the task before the call returns.
pub struct OpenApiClient {
    http: reqwest::Client,
    base_url: Url,
    version: ApiVersion,
    transport: TransportConfig,
}

impl OpenApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Negotiate a version, authenticate, and build the client.
    ///
    /// `ceiling` caps the version the client will speak; `None` accepts the
    /// newest version the server offers.
    pub async fn connect(
        base_url: &str,
        credentials: &Credentials,
        scope: SessionScope,
        transport: &TransportConfig,
        ceiling: Option<ApiVersion>,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        let anonymous = transport.build_client()?;

        let version = Self::negotiate_version(&anonymous, &base_url, ceiling).await?;
        debug!(%version, "negotiated API version");

        let token = match credentials {
            Credentials::Token { token } => token.clone(),
            Credentials::Password {
                username,
                org,
                password,
            } => {
                Self::login(
                    &anonymous,
                    &base_url,
                    scope,
                    version,
                    &format!("{username}@{org}"),
                    password,
                )
                .await?
            }
        };

        let http = transport.build_client_with_headers(Self::bearer_headers(&token)?)?;
        info!(url = %base_url, %version, "authenticated OpenAPI session");

        Ok(Self {
            http,
            base_url,
            version,
            transport: transport.clone(),
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    ///
    /// The version's `Accept` header is still added per request.
    pub fn from_reqwest(
        base_url: &str,
        http: reqwest::Client,
        version: ApiVersion,
        transport: TransportConfig,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            version,
            transport,
        })
    }

    /// Ensure the server root URL ends with a slash so relative joins work.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        // Accept URLs pasted with the `/api` or `/cloudapi` suffix.
        let root = path
            .strip_suffix("/cloudapi")
            .or_else(|| path.strip_suffix("/api"))
            .unwrap_or(&path)
            .to_owned();
        url.set_path(&format!("{root}/"));
        Ok(url)
    }

    fn bearer_headers(token: &SecretString) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|e| Error::Authentication {
                message: format!("invalid bearer token header value: {e}"),
            })?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    fn accept_value(version: ApiVersion) -> Result<HeaderValue, Error> {
        HeaderValue::from_str(&version.accept_header())
            .map_err(|e| Error::MalformedVersion(format!("{version}: {e}")))
    }

    // ── Session bootstrap ────────────────────────────────────────────

    /// Pick the highest non-deprecated version at or below `ceiling`.
    pub async fn negotiate_version(
        http: &reqwest::Client,
        base_url: &Url,
        ceiling: Option<ApiVersion>,
    ) -> Result<ApiVersion, Error> {
        let url = base_url.join("api/versions")?;
        debug!("GET {url}");

        let resp = http
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(parse_error(status, resp).await);
        }
        let body = resp.text().await?;
        let versions: types::SupportedVersions = deserialize_body(body)?;

        select_version(&versions, ceiling)
    }

    async fn login(
        http: &reqwest::Client,
        base_url: &Url,
        scope: SessionScope,
        version: ApiVersion,
        login_name: &str,
        password: &SecretString,
    ) -> Result<SecretString, Error> {
        let url = base_url.join(scope.login_path())?;
        debug!("POST {url} (login as {login_name})");

        let resp = http
            .post(url)
            .header(ACCEPT, Self::accept_value(version)?)
            .basic_auth(login_name, Some(password.expose_secret()))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(match parse_error(status, resp).await {
                Error::OpenApi { message, .. } => Error::Authentication { message },
                other => other,
            });
        }

        resp.headers()
            .get(ACCESS_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| SecretString::from(v.to_owned()))
            .ok_or(Error::MissingHeader(ACCESS_TOKEN_HEADER))
    }

    /// The API version this client speaks.
    pub fn version(&self) -> ApiVersion {
        self.version
    }

    /// The server root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join an OpenAPI-relative path (e.g. `"vdcGroups/{id}"`) onto the base.
    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(OPENAPI_PREFIX)?.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    fn request(&self, method: reqwest::Method, url: Url) -> Result<reqwest::RequestBuilder, Error> {
        Ok(self
            .http
            .request(method, url)
            .header(ACCEPT, Self::accept_value(self.version)?))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.request(reqwest::Method::GET, url)?.send().await?;
        handle_response(resp).await
    }

    async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self
            .request(reqwest::Method::GET, url)?
            .query(params)
            .send()
            .await?;
        handle_response(resp).await
    }

    async fn put<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<types::Task>, Error> {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let resp = self
            .request(reqwest::Method::PUT, url)?
            .json(body)
            .send()
            .await?;
        self.handle_mutation(resp).await
    }

    async fn delete(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let resp = self.request(reqwest::Method::DELETE, url)?.send().await?;
        self.handle_mutation(resp).await.map(|_| ())
    }

    /// POST a create body and return the new entity's ID, taken from the
    /// task owner (asynchronous create) or the response body (synchronous).
    async fn create<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<String, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self
            .request(reqwest::Method::POST, url)?
            .json(body)
            .send()
            .await?;

        if resp.status() == StatusCode::ACCEPTED {
            let task = self
                .handle_mutation(resp)
                .await?
                .ok_or(Error::MissingHeader("Location"))?;
            return task
                .owner
                .map(|owner| owner.id)
                .ok_or_else(|| Error::Task {
                    task: task.id.unwrap_or_default(),
                    status: task.status,
                    message: "task finished without an owner reference".into(),
                });
        }

        let created: types::CreatedEntity = handle_response(resp).await?;
        Ok(created.id)
    }

    // ── Response handling ────────────────────────────────────────────

    /// Accept 2xx; for 202 with a `Location` header, wait for the task.
    async fn handle_mutation(
        &self,
        resp: reqwest::Response,
    ) -> Result<Option<types::Task>, Error> {
        let status = resp.status();
        if !status.is_success() {
            return Err(parse_error(status, resp).await);
        }
        if status != StatusCode::ACCEPTED {
            return Ok(None);
        }

        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        match location {
            Some(href) => self.wait_for_task(&href).await.map(Some),
            None => Ok(None),
        }
    }

    /// Poll a task until it settles, bounded by the transport's budget.
    pub async fn wait_for_task(&self, href: &str) -> Result<types::Task, Error> {
        let url = self.base_url.join(href)?;

        for attempt in 1..=self.transport.task_max_polls {
            debug!(attempt, "GET {url} (task)");
            let resp = self.request(reqwest::Method::GET, url.clone())?.send().await?;
            let task: types::Task = handle_response(resp).await?;

            match task.status.as_str() {
                "success" => return Ok(task),
                "error" | "aborted" | "canceled" => {
                    let message = task
                        .error
                        .as_ref()
                        .and_then(|e| e.message.clone())
                        .unwrap_or_else(|| format!("task {}", task.status));
                    return Err(Error::Task {
                        task: task.id.unwrap_or_else(|| url.to_string()),
                        status: task.status,
                        message,
                    });
                }
                _ => tokio::time::sleep(self.transport.task_poll_interval).await,
            }
        }

        Err(Error::TaskTimeout {
            task: url.to_string(),
            attempts: self.transport.task_max_polls,
        })
    }

    // ── Pagination helper ────────────────────────────────────────────

    /// Collect all pages into a single `Vec<T>`.
    pub async fn paginate_all<T, F, Fut>(&self, page_size: i32, fetch: F) -> Result<Vec<T>, Error>
    where
        F: Fn(i32, i32) -> Fut,
        Fut: Future<Output = Result<types::ResultsPage<T>, Error>>,
    {
        let mut all = Vec::new();
        let mut page_number = 1;

        loop {
            let page = fetch(page_number, page_size).await?;
            let received = page.values.len();
            all.extend(page.values);

            if received == 0
                || page_number >= page.page_count
                || i64::try_from(all.len()).unwrap_or(i64::MAX) >= page.result_total
            {
                break;
            }

            page_number += 1;
        }

        Ok(all)
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── VDC Groups ───────────────────────────────────────────────────

    pub async fn get_vdc_group(&self, group_id: &str) -> Result<types::VdcGroup, Error> {
        self.get(&format!("vdcGroups/{group_id}")).await
    }

    pub async fn create_vdc_group(&self, body: &types::VdcGroupCreate) -> Result<String, Error> {
        self.create("vdcGroups", body).await
    }

    pub async fn delete_vdc_group(&self, group_id: &str) -> Result<(), Error> {
        self.delete(&format!("vdcGroups/{group_id}")).await
    }

    // ── DFW Policies ─────────────────────────────────────────────────

    pub async fn get_dfw_policies(&self, group_id: &str) -> Result<types::DfwPolicies, Error> {
        self.get(&format!("vdcGroups/{group_id}/dfwPolicies"))
            .await
    }

    pub async fn update_dfw_policies(
        &self,
        group_id: &str,
        body: &types::DfwPolicies,
    ) -> Result<(), Error> {
        self.put(&format!("vdcGroups/{group_id}/dfwPolicies"), body)
            .await
            .map(|_| ())
    }

    pub async fn update_default_dfw_policy(
        &self,
        group_id: &str,
        body: &types::DfwPolicy,
    ) -> Result<(), Error> {
        self.put(&format!("vdcGroups/{group_id}/dfwPolicies/default"), body)
            .await
            .map(|_| ())
    }

    // ── DFW Rules ────────────────────────────────────────────────────

    pub async fn get_dfw_rules(
        &self,
        group_id: &str,
    ) -> Result<types::DistributedFirewallRules, Error> {
        self.get(&format!("vdcGroups/{group_id}/dfwPolicies/default/rules"))
            .await
    }

    /// Replace the whole ordered rule list of the default policy.
    ///
    /// The `default` alias resolves whether or not the DFW is active, so the
    /// retained list of a deactivated group stays readable.
    pub async fn put_dfw_rules(
        &self,
        group_id: &str,
        body: &types::DistributedFirewallRules,
    ) -> Result<(), Error> {
        self.put(
            &format!("vdcGroups/{group_id}/dfwPolicies/default/rules"),
            body,
        )
        .await
        .map(|_| ())
    }

    // ── Firewall Groups ──────────────────────────────────────────────

    pub async fn create_firewall_group(
        &self,
        body: &types::FirewallGroupCreate,
    ) -> Result<String, Error> {
        self.create("firewallGroups", body).await
    }

    pub async fn delete_firewall_group(&self, group_id: &str) -> Result<(), Error> {
        self.delete(&format!("firewallGroups/{group_id}")).await
    }

    // ── Users and roles ──────────────────────────────────────────────

    /// Look up a role by name as seen from inside `org_id`.
    pub async fn find_role(&self, org_id: &str, name: &str) -> Result<Option<types::Role>, Error> {
        let url = self.url("roles")?;
        debug!("GET {url} role={name:?} org={org_id}");

        let resp = self
            .request(reqwest::Method::GET, url)?
            .header(TENANT_CONTEXT_HEADER, org_uuid(org_id))
            .query(&[
                ("filter", format!("name=={name}")),
                ("pageSize", "1".to_owned()),
            ])
            .send()
            .await?;
        let page: types::ResultsPage<types::Role> = handle_response(resp).await?;
        Ok(page.values.into_iter().next())
    }

    pub async fn create_user(&self, body: &types::UserCreate) -> Result<String, Error> {
        self.create("users", body).await
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<(), Error> {
        self.delete(&format!("users/{user_id}")).await
    }

    // ── Profiles ─────────────────────────────────────────────────────

    pub async fn list_application_port_profiles(
        &self,
        page: i32,
        page_size: i32,
    ) -> Result<types::ResultsPage<types::ApplicationPortProfile>, Error> {
        self.get_with_params(
            "applicationPortProfiles",
            &[("page", page.to_string()), ("pageSize", page_size.to_string())],
        )
        .await
    }

    pub async fn list_network_context_profiles(
        &self,
        page: i32,
        page_size: i32,
    ) -> Result<types::ResultsPage<types::NetworkContextProfile>, Error> {
        self.get_with_params(
            "networkContextProfiles",
            &[("page", page.to_string()), ("pageSize", page_size.to_string())],
        )
        .await
    }
}

// ── Free helpers ─────────────────────────────────────────────────────

fn select_version(
    versions: &types::SupportedVersions,
    ceiling: Option<ApiVersion>,
) -> Result<ApiVersion, Error> {
    versions
        .version_info
        .iter()
        .filter(|info| !info.deprecated)
        .filter_map(|info| info.version.parse::<ApiVersion>().ok())
        .filter(|v| ceiling.is_none_or(|c| *v <= c))
        .max()
        .ok_or_else(|| Error::NoCompatibleVersion {
            ceiling: ceiling.map_or_else(|| "any".into(), |c| c.to_string()),
        })
}

/// `urn:vcloud:org:<uuid>` -> `<uuid>`; bare UUIDs pass through.
fn org_uuid(org_id: &str) -> &str {
    org_id.rsplit(':').next().unwrap_or(org_id)
}

fn deserialize_body<T: DeserializeOwned>(body: String) -> Result<T, Error> {
    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body,
        }
    })
}

async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    if status.is_success() {
        let body = resp.text().await?;
        deserialize_body(body)
    } else {
        Err(parse_error(status, resp).await)
    }
}

async fn parse_error(status: StatusCode, resp: reqwest::Response) -> Error {
    let raw = resp.text().await.unwrap_or_default();
    let parsed = serde_json::from_str::<ErrorResponse>(&raw).ok();
    let message = parsed
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| {
            if raw.is_empty() {
                status.to_string()
            } else {
                raw.clone()
            }
        });

    match status {
        StatusCode::UNAUTHORIZED => Error::Authentication { message },
        StatusCode::FORBIDDEN => Error::Forbidden { message },
        _ => Error::OpenApi {
            status: status.as_u16(),
            message,
            code: parsed.and_then(|e| e.minor_error_code),
        },
    }
}
