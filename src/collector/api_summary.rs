// API summary collector - engine version and topline counters
//
// Not cached: the engine root document is fetched on every call. It doubles
// as the liveness metric of the engine, so it always runs.

use tracing::debug;

use super::Collector;
use crate::error::CollectError;
use crate::metrics::records::ApiSummaryMetric;
use crate::metrics::{Accumulator, Measurement};
use crate::ovirt::model::ApiSummaryItem;
use crate::session::SessionManager;

const CLASS: &str = "API summary";

impl Collector {
    /// Emits one `ovirtstat_apisummary` record
    pub async fn collect_api_summary(
        &mut self,
        session: &SessionManager,
        acc: &mut dyn Accumulator,
    ) -> Result<(), CollectError> {
        let api = session.api().map_err(|e| e.in_class(CLASS))?;
        let root = api
            .api()
            .await
            .map_err(|source| CollectError::Fetch { class: "API", source }.in_class(CLASS))?;
        let timestamp = self.timestamp();

        let version = root.full_version().unwrap_or_default().to_string();
        let summary = root.summary.unwrap_or_default();
        let total = |item: Option<ApiSummaryItem>| item.and_then(|item| item.total).unwrap_or(0);
        let metric = ApiSummaryMetric {
            engine: self.engine.clone(),
            version,
            hosts: total(summary.hosts),
            storagedomains: total(summary.storage_domains),
            users: total(summary.users),
            vms: summary
                .vms
                .map(|vms| (vms.active.unwrap_or(0), vms.total.unwrap_or(0))),
        };

        debug!("Engine version {}", metric.version);
        acc.add_record(metric.into_record(timestamp));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use crate::filter::FilterSet;
    use crate::metrics::{Batch, FieldValue};
    use crate::ovirt::fake;
    use crate::ovirt::model::Api;

    #[tokio::test]
    async fn test_api_summary_record() {
        let (session, _engine) = open_session(fake::small_engine()).await;
        let mut collector = collector(FilterSet::default());
        let mut batch = Batch::new();

        collector.collect_api_summary(&session, &mut batch).await.unwrap();

        let record = &batch.records()[0];
        assert_eq!(record.measurement, "ovirtstat_apisummary");
        assert_eq!(record.tag("ovirt-engine"), Some("engine.test"));
        assert_eq!(
            record.field("version"),
            Some(&FieldValue::Str("4.5.4-1.el8".to_string()))
        );
        assert_eq!(record.field("hosts"), Some(&FieldValue::Int(2)));
        assert_eq!(record.field("storagedomains"), Some(&FieldValue::Int(1)));
        assert_eq!(record.field("users"), Some(&FieldValue::Int(3)));
        assert_eq!(record.field("vms_active"), Some(&FieldValue::Int(2)));
        assert_eq!(record.field("vms_total"), Some(&FieldValue::Int(3)));
    }

    #[tokio::test]
    async fn test_sparse_root_document() {
        let mut data = fake::small_engine();
        data.api = Api::default();
        let (session, _engine) = open_session(data).await;
        let mut collector = collector(FilterSet::default());
        let mut batch = Batch::new();

        collector.collect_api_summary(&session, &mut batch).await.unwrap();

        let record = &batch.records()[0];
        assert_eq!(record.field("hosts"), Some(&FieldValue::Int(0)));
        assert!(record.field("vms_active").is_none());
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts() {
        let (session, engine) = open_session(fake::small_engine()).await;
        engine.fail("api");
        let mut collector = collector(FilterSet::default());
        let mut batch = Batch::new();

        let err = collector.collect_api_summary(&session, &mut batch).await.unwrap_err();
        assert!(err.to_string().starts_with("could not collect API summary"));
        assert!(batch.records().is_empty());
    }
}
