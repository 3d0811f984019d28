//! Session: one run against one target device

use futures::StreamExt;

use crate::config::SweepConfig;
use crate::discovery::DiscoveryFilter;
use crate::error::SweepError;
use crate::handshake::{Baseline, HandshakeSequencer};
use crate::link::{Connection, DeviceIdentity, PeripheralLink};
use crate::search::{SearchController, SearchOutcome};
use crate::store::ProgressStore;

/// Result of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub device: DeviceIdentity,
    pub baseline: Baseline,
    pub outcome: SearchOutcome,
}

pub struct Session<L, S> {
    config: SweepConfig,
    link: L,
    store: S,
}

impl<L: PeripheralLink, S: ProgressStore> Session<L, S> {
    pub fn new(config: SweepConfig, link: L, store: S) -> Self {
        Self { config, link, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Scan for the target, engage it, and sweep until halt or exhaustion
    ///
    /// The connection is closed on every path out of here once it exists.
    pub async fn run(&mut self) -> Result<RunReport, SweepError> {
        self.config.validate()?;
        let device = self.acquire_target().await?;

        tracing::info!(%device, "connecting");
        let mut conn = self
            .link
            .connect(&device)
            .await
            .map_err(|source| SweepError::Connect { identity: device.clone(), source })?;
        tracing::info!(%device, "connected");

        let result = self.engage(&mut conn).await;

        match conn.close().await {
            Ok(()) => tracing::info!(%device, "disconnected"),
            Err(error) => tracing::warn!(%device, %error, "disconnect failed"),
        }

        let (baseline, outcome) = result?;
        Ok(RunReport { device, baseline, outcome })
    }

    async fn acquire_target(&mut self) -> Result<DeviceIdentity, SweepError> {
        let mut filter = DiscoveryFilter::load(self.config.target_name.clone(), &self.store)?;
        tracing::info!(
            target = %self.config.target_name,
            excluded = filter.excluded_count(),
            "starting scan"
        );

        let mut advertisements = self.link.scan().await.map_err(SweepError::Scan)?;
        let mut found = None;
        while let Some(adv) = advertisements.next().await {
            if filter.should_process(&adv.identity, &mut self.store)? {
                found = Some(adv.identity);
                break;
            }
        }
        drop(advertisements);

        if let Err(error) = self.link.stop_scan().await {
            tracing::warn!(%error, "failed to stop scan");
        }

        found.ok_or(SweepError::ScanEnded)
    }

    async fn engage<C: Connection>(
        &mut self,
        conn: &mut C,
    ) -> Result<(Baseline, SearchOutcome), SweepError> {
        let baseline = HandshakeSequencer::new(self.config.strict_handshake).run(conn).await?;

        let mut search =
            SearchController::resume(&self.config, &mut self.store, baseline.response.clone())?;
        let outcome = search.run(conn).await?;
        Ok((baseline, outcome))
    }
}
