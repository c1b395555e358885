use crate::error::Result;
use crate::models::ingest::{Ingest, IngestStatus};
use crate::services::ingest_service::IngestService;
use reqwest::Client;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub const NOTIFICATION_TEXT: &str = "We have an ingest task for project-2-sdt !";

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyCycle {
    pub pending: usize,
    pub failed: usize,
}

/// Nags the push channel about every ingest still waiting for an operator.
/// Sending never changes an ingest's status, so a pending ingest is announced
/// again on every cycle until someone accepts it.
#[derive(Clone)]
pub struct NotificationService {
    ingests: IngestService,
    client: Client,
    target_url: String,
}

impl NotificationService {
    pub fn new(ingests: IngestService, client: Client, target_url: String) -> Self {
        Self {
            ingests,
            client,
            target_url,
        }
    }

    pub fn message_for(ingest: &Ingest) -> String {
        format!(
            "{}\n\nIngest ID: {}\nEmail: {}\nURL: {}",
            NOTIFICATION_TEXT, ingest.id, ingest.email, ingest.url
        )
    }

    pub async fn send(&self, message: String) -> std::result::Result<(), reqwest::Error> {
        self.client
            .post(&self.target_url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(message)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn run_once(&self) -> Result<NotifyCycle> {
        let pending = self.ingests.list_by_status(IngestStatus::Pending).await?;

        let mut cycle = NotifyCycle {
            pending: pending.len(),
            failed: 0,
        };

        for ingest in &pending {
            match self.send(Self::message_for(ingest)).await {
                Ok(()) => info!(ingest_id = ingest.id, "Notification sent"),
                Err(e) => {
                    cycle.failed += 1;
                    warn!(ingest_id = ingest.id, error = ?e, "Notification failed");
                }
            }
        }

        Ok(cycle)
    }

    /// Runs a cycle every `period` until `shutdown` fires. A slow cycle pushes
    /// the next tick back instead of overlapping it.
    pub async fn run(self, period: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        error!(error = ?e, "Notification poller error");
                    }
                }
            }
        }

        info!("Notification poller stopped");
    }

    pub fn spawn(self, period: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(period, shutdown))
    }
}
