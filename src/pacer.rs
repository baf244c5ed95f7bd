//! Process-global outbound rate pacer for the Upstream Client (§4.A, §5).
//!
//! A single mutex-guarded sliding window of request timestamps, shared by
//! every user's sync. This is distinct from (and unrelated to) any inbound
//! API-consumer rate limiting — it exists purely to keep this process under
//! WHOOP's per-account quota.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

pub struct RatePacer {
    per_minute: u32,
    per_day: u32,
    minute_window: Mutex<VecDeque<Instant>>,
    day_window: Mutex<VecDeque<Instant>>,
}

impl RatePacer {
    pub fn new(per_minute: u32, per_day: u32) -> Self {
        Self {
            per_minute,
            per_day,
            minute_window: Mutex::new(VecDeque::new()),
            day_window: Mutex::new(VecDeque::new()),
        }
    }

    /// Blocks until issuing another request would not exceed either ceiling,
    /// then records the request as taken.
    pub async fn acquire(&self) {
        loop {
            let now = Instant::now();
            let wait = {
                let mut minute = self.minute_window.lock().await;
                let mut day = self.day_window.lock().await;

                prune(&mut minute, now, Duration::from_secs(60));
                prune(&mut day, now, Duration::from_secs(86_400));

                if minute.len() < self.per_minute as usize && day.len() < self.per_day as usize {
                    minute.push_back(now);
                    day.push_back(now);
                    None
                } else if minute.len() >= self.per_minute as usize {
                    minute.front().map(|oldest| {
                        Duration::from_secs(60).saturating_sub(now.duration_since(*oldest))
                    })
                } else {
                    day.front().map(|oldest| {
                        Duration::from_secs(86_400).saturating_sub(now.duration_since(*oldest))
                    })
                }
            };

            match wait {
                None => return,
                Some(duration) => tokio::time::sleep(duration.max(Duration::from_millis(10))).await,
            }
        }
    }
}

fn prune(window: &mut VecDeque<Instant>, now: Instant, horizon: Duration) {
    while let Some(oldest) = window.front() {
        if now.duration_since(*oldest) > horizon {
            window.pop_front();
        } else {
            break;
        }
    }
}
