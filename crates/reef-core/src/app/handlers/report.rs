//! report queue. Concurrency 1 keeps report generation serialized.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::email::ReportReadyEmail;
use crate::app::producer::JobProducer;
use crate::domain::{QueueName, TenantId};
use crate::error::JobError;
use crate::ports::{Clock, ReportPeriod, ReportStore};
use crate::typed::{Handler, JobPayload};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReport {
    pub tenant_id: TenantId,
    pub period: ReportPeriod,
    /// Send the finished report here. Without one the report is only built.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
}

impl JobPayload for GenerateReport {
    const NAME: &'static str = "generate-report";
    const QUEUE: QueueName = QueueName::Report;
}

pub struct GenerateReportHandler {
    reports: Arc<dyn ReportStore>,
    producer: JobProducer,
    clock: Arc<dyn Clock>,
}

impl GenerateReportHandler {
    pub fn new(reports: Arc<dyn ReportStore>, producer: JobProducer, clock: Arc<dyn Clock>) -> Self {
        Self {
            reports,
            producer,
            clock,
        }
    }
}

#[async_trait]
impl Handler<GenerateReport> for GenerateReportHandler {
    async fn handle(&self, job: GenerateReport) -> Result<(), JobError> {
        let summary = self
            .reports
            .build_report(job.tenant_id, job.period, self.clock.now())
            .await?;

        info!(
            tenant_id = %job.tenant_id,
            period = job.period.as_str(),
            lines = summary.lines.len(),
            "report generated"
        );

        if let Some(to) = job.recipient {
            self.producer
                .enqueue(&ReportReadyEmail {
                    to,
                    shop_name: summary.shop_name,
                    title: summary.title,
                    lines: summary.lines,
                })
                .await?;
        }
        Ok(())
    }
}
