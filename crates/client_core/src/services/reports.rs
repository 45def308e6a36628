use async_trait::async_trait;
use serde::Serialize;
use shared::{
    domain::{Report, ReportId},
    protocol::{ExportFormat, ReportFilters, ReportRequest},
};

use super::{CrudService, ListService};
use crate::{
    error::RequestError,
    transport::{ApiClient, Method},
};

#[derive(Serialize)]
struct FormatQuery {
    format: ExportFormat,
}

#[derive(Clone)]
pub struct ReportService {
    api: ApiClient,
}

impl ReportService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Asks the server to compute a report; the stored record comes back.
    pub async fn generate(&self, request: &ReportRequest) -> Result<Report, RequestError> {
        self.api
            .send_json(Method::Post, "/reports/generate", request)
            .await
    }

    pub async fn export(&self, id: &ReportId, format: ExportFormat) -> Result<Vec<u8>, RequestError> {
        self.api
            .get_blob(&format!("{}/export", self.item_path(id)), &FormatQuery { format })
            .await
    }
}

#[async_trait]
impl ListService for ReportService {
    type Entity = Report;
    type Filters = ReportFilters;

    fn api(&self) -> &ApiClient {
        &self.api
    }
}

#[async_trait]
impl CrudService for ReportService {
    type Create = ReportRequest;
}
