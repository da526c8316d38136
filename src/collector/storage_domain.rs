// Storage domain collector
//
// Storage domains are not name-filtered. Attached external storage may not
// report a status, so a missing status only maps to the fallback code.

use std::time::Instant;

use super::Collector;
use crate::error::CollectError;
use crate::metrics::records::StorageDomainMetric;
use crate::metrics::{Accumulator, Measurement};
use crate::session::SessionManager;
use crate::status::{ExternalStatus, StorageDomainStatus};

const CLASS: &str = "StorageDomains";
const ENTITY: &str = "storage domain";

impl Collector {
    /// Emits one `ovirtstat_storagedomain` record per cached storage domain
    pub async fn collect_storage_domains(
        &mut self,
        session: &SessionManager,
        acc: &mut dyn Accumulator,
    ) -> Result<(), CollectError> {
        let api = session.api().map_err(|e| e.in_class(CLASS))?;
        self.cache
            .refresh_storage_domains(api, Instant::now())
            .await
            .map_err(|e| e.in_class(CLASS))?;
        let timestamp = self.timestamp();

        for sd in self.cache.storage_domains() {
            let Some(id) = sd.id.as_deref() else {
                acc.add_error(CollectError::missing(ENTITY, "Id", None));
                continue;
            };
            let Some(name) = sd.name.as_deref() else {
                acc.add_error(CollectError::missing(ENTITY, "Name", None));
                continue;
            };

            let status = sd.status.as_deref();
            // the engine omits capacity figures of detached domains
            let unattached =
                status.and_then(StorageDomainStatus::parse) == Some(StorageDomainStatus::Unattached);
            let (used, available, committed) = if unattached {
                (0, 0, 0)
            } else {
                let Some(used) = sd.used else {
                    acc.add_error(CollectError::missing(ENTITY, "used", Some(name)));
                    continue;
                };
                let Some(available) = sd.available else {
                    acc.add_error(CollectError::missing(ENTITY, "available", Some(name)));
                    continue;
                };
                (used, available, sd.committed.unwrap_or(0))
            };

            let (storage_type, logical_units) = sd.backend_info();
            let external_status = sd.external_status.as_deref();
            let metric = StorageDomainMetric {
                engine: self.engine.clone(),
                id: id.to_string(),
                name: name.to_string(),
                domain_type: sd.domain_type.clone().unwrap_or_default(),
                storage_type,
                available,
                committed,
                used,
                connections: sd.connection_count(),
                logical_units,
                master: sd.master.unwrap_or(false),
                status: status.unwrap_or_default().to_string(),
                status_code: StorageDomainStatus::code_of(status),
                external_status: external_status.unwrap_or_default().to_string(),
                external_status_code: ExternalStatus::code_of(external_status),
            };
            acc.add_record(metric.into_record(timestamp));
        }

        Ok(())
    }
}
