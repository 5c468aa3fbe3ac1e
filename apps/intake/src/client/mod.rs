//! # Backend Client
//!
//! Typed wrapper around the use-case backend's REST API.
//!
//! Every write carries `editorEmail`. There are no retries: a failure is
//! returned to the caller, who logs and surfaces it.

pub mod directory;

use intake_core::payload::{PlanItem, StakeholderItem, SubmissionPayload};
use intake_core::reference::{
    BusinessUnitRow, Items, MetricCategoryItem, NamedItem, PhaseItem, QuestionItem, RoleItem,
    SubTeamRow, UnitOfMeasureItem, VendorModelItem,
};
use intake_core::{
    MetricChangeSet, MetricSuggestionResponse, ReferenceData, TimelineSuggestionResponse,
    UseCaseDraft, UseCaseId, UseCaseSuggestion,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Mapping types requested in one `GET /api/mappings` call.
pub const MAPPING_TYPES: &str = "businessUnits,roles,phases,metricCategories,unitOfMeasure,status,themes,personas,vendorModels,knowledgeSources,aiProductQuestions";

/// Errors from the HTTP client layer.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Cannot connect to {0}")]
    ConnectionFailed(String),

    #[error("Request to {0} timed out")]
    Timeout(String),

    #[error("Unauthorized: invalid or missing credentials")]
    Unauthorized,

    #[error("Rate limited: too many requests")]
    RateLimited,

    /// 4xx other than 401/429, with the backend's message when it sent one.
    #[error("Request rejected ({0}): {1}")]
    Rejected(u16, String),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Client setup failed: {0}")]
    Setup(String),
}

/// `{ "message": "..." }` error body used by the backend.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Build the shared reqwest client with a request timeout.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ClientError::Setup(e.to_string()))
}

/// Map a transport failure.
pub(crate) fn transport_error(url: &str, e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout(url.to_string())
    } else {
        ClientError::ConnectionFailed(format!("{url}: {e}"))
    }
}

/// Check the status and parse the JSON body.
pub(crate) async fn handle_response<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(ClientError::Unauthorized);
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(ClientError::RateLimited);
    }
    if status.is_client_error() || status.is_server_error() {
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);
        return Err(if status.is_server_error() {
            ClientError::ServerError(status.as_u16(), message)
        } else {
            ClientError::Rejected(status.as_u16(), message)
        });
    }
    resp.json::<T>()
        .await
        .map_err(|e| ClientError::ParseError(e.to_string()))
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Response of `GET /api/mappings?types=...`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MappingsResponse {
    pub business_units: Items<BusinessUnitRow>,
    pub roles: Items<RoleItem>,
    pub phases: Items<PhaseItem>,
    pub metric_categories: Items<MetricCategoryItem>,
    pub unit_of_measure: Items<UnitOfMeasureItem>,
    pub status: Items<NamedItem>,
    pub themes: Items<NamedItem>,
    pub personas: Items<NamedItem>,
    pub vendor_models: Items<VendorModelItem>,
    pub knowledge_sources: Items<NamedItem>,
    pub ai_product_questions: Items<QuestionItem>,
}

impl MappingsResponse {
    #[must_use]
    pub fn into_reference(self, sub_teams: Vec<SubTeamRow>) -> ReferenceData {
        ReferenceData {
            business_units: self.business_units.items,
            sub_teams,
            roles: self.roles.items,
            phases: self.phases.items,
            metric_categories: self.metric_categories.items,
            unit_of_measure: self.unit_of_measure.items,
            status: self.status.items,
            themes: self.themes.items,
            personas: self.personas.items,
            vendor_models: self.vendor_models.items,
            knowledge_sources: self.knowledge_sources.items,
            ai_product_questions: self.ai_product_questions.items,
        }
    }
}

/// Response of `POST /api/usecases`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedUseCase {
    pub id: UseCaseId,
    #[serde(default)]
    pub approvals: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StakeholderBody<'a> {
    #[serde(flatten)]
    item: &'a StakeholderItem,
    editor_email: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanBody<'a> {
    items: &'a [PlanItem],
    editor_email: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateBody<'a> {
    meaningful_update: &'a str,
    editor_email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MetricsBody<'a> {
    #[serde(flatten)]
    changes: &'a MetricChangeSet,
    editor_email: Option<&'a str>,
}

// =============================================================================
// CLIENT
// =============================================================================

/// HTTP client for the use-case backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<T, ClientError> {
        let resp = req
            .send()
            .await
            .map_err(|e| transport_error(&self.url(path), e))?;
        handle_response(resp).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let req = self.http.get(self.url(path));
        self.send(req, path).await
    }

    async fn write<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        tracing::debug!(%method, path, "Backend write");
        let req = self.http.request(method, self.url(path)).json(body);
        self.send(req, path).await
    }

    /// Load every mapping list plus the sub-teams.
    pub async fn fetch_reference(&self) -> Result<ReferenceData, ClientError> {
        let mappings: MappingsResponse = self
            .get(&format!("/api/mappings?types={MAPPING_TYPES}"))
            .await?;
        let sub_teams: Items<SubTeamRow> = self.get("/api/mappings/subteams").await?;
        Ok(mappings.into_reference(sub_teams.items))
    }

    /// `POST /api/usecases`
    pub async fn create_use_case(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<CreatedUseCase, ClientError> {
        self.write(reqwest::Method::POST, "/api/usecases", payload)
            .await
    }

    /// `POST /api/usecases/{id}/stakeholders`
    pub async fn add_stakeholder(
        &self,
        use_case: UseCaseId,
        item: &StakeholderItem,
        editor_email: Option<&str>,
    ) -> Result<serde_json::Value, ClientError> {
        let body = StakeholderBody { item, editor_email };
        let path = format!("/api/usecases/{use_case}/stakeholders");
        self.write(reqwest::Method::POST, &path, &body).await
    }

    /// `PATCH /api/usecases/{id}/plan`
    pub async fn update_plan(
        &self,
        use_case: UseCaseId,
        items: &[PlanItem],
        editor_email: Option<&str>,
    ) -> Result<serde_json::Value, ClientError> {
        let body = PlanBody {
            items,
            editor_email,
        };
        let path = format!("/api/usecases/{use_case}/plan");
        self.write(reqwest::Method::PATCH, &path, &body).await
    }

    /// `POST /api/usecases/{id}/updates`
    pub async fn post_update(
        &self,
        use_case: UseCaseId,
        text: &str,
        editor_email: &str,
    ) -> Result<serde_json::Value, ClientError> {
        let body = UpdateBody {
            meaningful_update: text,
            editor_email,
        };
        let path = format!("/api/usecases/{use_case}/updates");
        self.write(reqwest::Method::POST, &path, &body).await
    }

    /// `PATCH /api/usecases/{id}/metrics`
    pub async fn sync_metrics(
        &self,
        use_case: UseCaseId,
        changes: &MetricChangeSet,
        editor_email: Option<&str>,
    ) -> Result<serde_json::Value, ClientError> {
        let body = MetricsBody {
            changes,
            editor_email,
        };
        let path = format!("/api/usecases/{use_case}/metrics");
        self.write(reqwest::Method::PATCH, &path, &body).await
    }

    // ===== AI SUGGESTIONS =====

    /// `POST /api/ai/suggestions/usecase`
    pub async fn suggest_use_case(
        &self,
        draft: &UseCaseDraft,
    ) -> Result<UseCaseSuggestion, ClientError> {
        self.write(reqwest::Method::POST, "/api/ai/suggestions/usecase", draft)
            .await
    }

    /// `POST /api/ai/suggestions/metric`
    pub async fn suggest_metrics(
        &self,
        draft: &UseCaseDraft,
    ) -> Result<MetricSuggestionResponse, ClientError> {
        self.write(reqwest::Method::POST, "/api/ai/suggestions/metric", draft)
            .await
    }

    /// `POST /api/ai/suggestions/phase`
    pub async fn suggest_timeline(
        &self,
        draft: &UseCaseDraft,
    ) -> Result<TimelineSuggestionResponse, ClientError> {
        self.write(reqwest::Method::POST, "/api/ai/suggestions/phase", draft)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intake_core::{PhaseId, RoleId};

    #[test]
    fn mappings_response_fills_reference() {
        let mappings: MappingsResponse = serde_json::from_str(
            r#"{
                "businessUnits": {"items": [{"id": 1, "businessUnitName": "Finance", "teamName": "AP"}]},
                "roles": {"items": [{"id": 2, "name": "Owner"}]},
                "status": {"items": []}
            }"#,
        )
        .expect("parse");
        let reference = mappings.into_reference(Vec::new());
        assert_eq!(reference.business_units.len(), 1);
        assert_eq!(reference.roles[0].name, "Owner");
        assert!(reference.phases.is_empty());
    }

    #[test]
    fn stakeholder_body_flattens_item() {
        let item = StakeholderItem {
            role_id: RoleId(3),
            role: "Sponsor".to_string(),
            stakeholder_email: "bo@contoso.com".to_string(),
        };
        let body = StakeholderBody {
            item: &item,
            editor_email: Some("me@contoso.com"),
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["roleId"], 3);
        assert_eq!(json["stakeholderEmail"], "bo@contoso.com");
        assert_eq!(json["editorEmail"], "me@contoso.com");
    }

    #[test]
    fn plan_body_shape() {
        let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).expect("date");
        let end = chrono::NaiveDate::from_ymd_opt(2024, 2, 1).expect("date");
        let items = [PlanItem::new(PhaseId(1), start, end)];
        let body = PlanBody {
            items: &items,
            editor_email: None,
        };
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["items"][0]["startdate"], "2024-01-01");
        assert_eq!(json["editorEmail"], serde_json::Value::Null);
    }

    #[test]
    fn created_use_case_parses_backend_reply() {
        let created: CreatedUseCase =
            serde_json::from_str(r#"{"id": 42, "approvals": false}"#).expect("parse");
        assert_eq!(created.id, UseCaseId(42));
        assert_eq!(created.approvals, Some(false));
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let client =
            BackendClient::new("http://localhost:8000/", Duration::from_secs(5)).expect("client");
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.url("/api/usecases"), "http://localhost:8000/api/usecases");
    }
}
