use shared::{
    domain::{Report, ReportId},
    protocol::{ExportFormat, ReportRequest},
};

use super::Orchestrator;
use crate::{error::ClientResult, services::ReportService};

pub type ReportDesk = Orchestrator<ReportService>;

impl Orchestrator<ReportService> {
    pub async fn generate(&self, request: &ReportRequest) -> ClientResult<Report> {
        self.mutate("generate", self.service().generate(request), |state, report| {
            state.append(report.clone())
        })
        .await
    }

    pub async fn export(&self, id: &ReportId, format: ExportFormat) -> ClientResult<Vec<u8>> {
        self.track("export", self.service().export(id, format), |_, _| {})
            .await
    }
}
