use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::crawler::{spawn_run, Crawler};

/// Time left until the next 00:00 UTC. Exactly at midnight this is a full day.
pub fn until_next_midnight(now: DateTime<Utc>) -> Duration {
    let next = now
        .date_naive()
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive));
    match next {
        Some(next) => (next - now).to_std().unwrap_or(Duration::ZERO),
        None => {
            warn!("No next midnight after {}", now);
            Duration::from_secs(24 * 60 * 60)
        }
    }
}

/// Start a crawl every day at 00:00 UTC for as long as the runtime lives.
pub fn spawn_daily(crawler: Arc<Crawler>, pages: u32, section: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let wait = until_next_midnight(Utc::now());
            info!(secs = wait.as_secs(), "Next scheduled crawl");
            tokio::time::sleep(wait).await;
            info!("Scheduled crawl starting");
            spawn_run(Arc::clone(&crawler), pages, section.clone());
            // Step past midnight so the next wait is a full day.
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    })
}
