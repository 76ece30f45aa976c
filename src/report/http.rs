use serde::Deserialize;

use crate::model::status::Status;
use crate::report::backend::{
    FinishItemRequest, LogRequest, ReportingBackend, StartItemRequest, StartLaunchRequest,
};
use crate::report::error::ReportError;
use crate::track::footprint::{ItemId, LaunchId};

// ============================================================================
// HTTP backend — JSON over REST to a reporting server
// ============================================================================

/// Reporting server client. One blocking client per instance; requests
/// carry a bearer token when configured. Paths are scoped by project:
/// `POST {endpoint}/api/v1/{project}/launch`, `POST .../item[/{parent}]`,
/// `PUT .../item/{id}/finish`, `POST .../item/{id}/log`,
/// `PUT .../launch/{id}/finish`.
pub struct HttpBackend {
    client: reqwest::blocking::Client,
    endpoint: String,
    project: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(serde::Serialize)]
struct FinishLaunchBody {
    end_time_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<Status>,
}

impl HttpBackend {
    pub fn new(endpoint: &str, project: &str, token: Option<&str>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project: project.to_string(),
            token: token.map(|t| t.to_string()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}/{}", self.endpoint, self.project, path)
    }

    fn post_for_id<B: serde::Serialize>(
        &self,
        context: &str,
        url: &str,
        body: &B,
    ) -> Result<String, ReportError> {
        let mut request = self.client.post(url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().map_err(|e| ReportError::Http {
            context: context.to_string(),
            source: e,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ReportError::Server {
                context: context.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().map_err(|e| ReportError::Http {
            context: context.to_string(),
            source: e,
        })?;
        let parsed: IdResponse =
            serde_json::from_str(&text).map_err(|e| ReportError::Json {
                context: context.to_string(),
                source: e,
            })?;
        Ok(parsed.id)
    }

    fn send_fire_and_check<B: serde::Serialize>(
        &self,
        context: &str,
        put: bool,
        url: &str,
        body: &B,
    ) -> Result<(), ReportError> {
        let mut request = if put {
            self.client.put(url)
        } else {
            self.client.post(url)
        };
        request = request.json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().map_err(|e| ReportError::Http {
            context: context.to_string(),
            source: e,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ReportError::Server {
                context: context.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

impl ReportingBackend for HttpBackend {
    fn start_launch(&self, req: &StartLaunchRequest) -> Result<LaunchId, ReportError> {
        let id = self.post_for_id("start_launch", &self.url("launch"), req)?;
        Ok(LaunchId::new(id))
    }

    fn finish_launch(&self, id: &LaunchId, status: Option<Status>) -> Result<(), ReportError> {
        let body = FinishLaunchBody {
            end_time_ms: crate::model::status::now_ms(),
            status,
        };
        self.send_fire_and_check(
            "finish_launch",
            true,
            &self.url(&format!("launch/{}/finish", id)),
            &body,
        )
    }

    fn start_item(
        &self,
        parent: Option<&ItemId>,
        req: &StartItemRequest,
    ) -> Result<ItemId, ReportError> {
        let url = match parent {
            Some(parent) => self.url(&format!("item/{}", parent)),
            None => self.url("item"),
        };
        let id = self.post_for_id("start_item", &url, req)?;
        Ok(ItemId::new(id))
    }

    fn finish_item(&self, id: &ItemId, req: &FinishItemRequest) -> Result<(), ReportError> {
        self.send_fire_and_check(
            "finish_item",
            true,
            &self.url(&format!("item/{}/finish", id)),
            req,
        )
    }

    fn log(&self, item: &ItemId, req: &LogRequest) -> Result<(), ReportError> {
        self.send_fire_and_check(
            "log",
            false,
            &self.url(&format!("item/{}/log", item)),
            req,
        )
    }
}
