// Session manager - owns the connection to the oVirt Engine
//
// The collector asks it for the live `EngineApi`; the scheduler uses
// `is_active` once per cycle and reopens the session when the probe fails.

use std::time::Duration;
use tracing::{debug, info};

use crate::error::CollectError;
use crate::ovirt::{Connector, EngineApi};

pub struct SessionManager {
    connector: Box<dyn Connector>,
    conn: Option<Box<dyn EngineApi>>,
}

impl SessionManager {
    pub fn new(connector: Box<dyn Connector>) -> Self {
        SessionManager {
            connector,
            conn: None,
        }
    }

    /// Opens a new session, closing the current one first
    ///
    /// # Errors
    /// `CollectError::Connection` when authentication or the transport fails
    pub async fn open(&mut self, timeout: Duration) -> Result<(), CollectError> {
        self.close().await;

        let conn = self
            .connector
            .connect(timeout)
            .await
            .map_err(|source| CollectError::Connection {
                url: self.connector.endpoint().to_string(),
                source,
            })?;
        self.conn = Some(conn);
        info!("oVirt session established with {}", self.connector.endpoint());
        Ok(())
    }

    /// Probes the session with a test call; any failure reads as inactive
    pub async fn is_active(&self) -> bool {
        match &self.conn {
            Some(conn) => match conn.test().await {
                Ok(()) => true,
                Err(e) => {
                    debug!("oVirt session test failed: {}", e);
                    false
                }
            },
            None => false,
        }
    }

    /// Releases the session; does nothing when already closed
    pub async fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.close().await;
            debug!("oVirt session closed");
        }
    }

    /// The live engine API
    ///
    /// # Errors
    /// `CollectError::NoSession` when no session has been opened
    pub fn api(&self) -> Result<&dyn EngineApi, CollectError> {
        self.conn.as_deref().ok_or(CollectError::NoSession)
    }
}
