// Datacenter collector

use std::time::Instant;

use super::Collector;
use crate::error::CollectError;
use crate::metrics::records::DatacenterMetric;
use crate::metrics::{Accumulator, Measurement};
use crate::session::SessionManager;
use crate::status::DatacenterStatus;

const CLASS: &str = "Datacenters";
const ENTITY: &str = "datacenter";

impl Collector {
    /// Emits one `ovirtstat_datacenter` record per cached datacenter
    pub async fn collect_datacenters(
        &mut self,
        session: &SessionManager,
        acc: &mut dyn Accumulator,
    ) -> Result<(), CollectError> {
        let api = session.api().map_err(|e| e.in_class(CLASS))?;
        self.cache
            .refresh_datacenters_and_clusters(api, Instant::now())
            .await
            .map_err(|e| e.in_class(CLASS))?;
        let timestamp = self.timestamp();

        for dc in self.cache.datacenters() {
            let Some(id) = dc.id.as_deref() else {
                acc.add_error(CollectError::missing(ENTITY, "Id", None));
                continue;
            };
            let Some(name) = dc.name.as_deref() else {
                acc.add_error(CollectError::missing(ENTITY, "Name", None));
                continue;
            };
            let Some(status) = dc.status.as_deref() else {
                acc.add_error(CollectError::missing(ENTITY, "status", Some(name)));
                continue;
            };

            let metric = DatacenterMetric {
                engine: self.engine.clone(),
                id: id.to_string(),
                name: name.to_string(),
                clusters: self.cache.count_clusters_in(id),
                local: dc.local.unwrap_or(false),
                status: status.to_string(),
                status_code: DatacenterStatus::code_of(Some(status)),
            };
            acc.add_record(metric.into_record(timestamp));
        }

        Ok(())
    }
}
