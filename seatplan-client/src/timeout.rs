//! Edit countdown and release gating
//!
//! # 发布时间
//!
//! 客户端时钟可能不准：从时间服务获取服务器时间，偏差超过 2 秒才修正，
//! 然后每 2 秒检查一次是否已过发布时间，过了即停止轮询。
//!
//! # 编辑倒计时
//!
//! 加锁后 4 分钟自动超时，倒计时每秒减一。

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::helper::{format_date_time, now_ms};
use crate::{ClientError, ClientResult};

pub const ONE_MINUTE: Duration = Duration::from_secs(60);
/// 编辑锁超时
pub const EDIT_TIMEOUT: Duration = Duration::from_secs(4 * 60);
/// 发布时间检查间隔
pub const RELEASE_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Offsets up to this many ms are treated as noise
pub const CLOCK_SKEW_TOLERANCE_MS: i64 = 2000;

/// Time reference payload: RFC 3339 timestamp plus microseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTime {
    pub atom: String,
    pub micro: i64,
}

impl ServerTime {
    pub fn from_datetime(now: DateTime<Utc>) -> Self {
        Self {
            atom: now.to_rfc3339_opts(chrono::SecondsFormat::Secs, false),
            micro: i64::from(now.timestamp_subsec_micros()),
        }
    }

    /// `atom` in ms plus `round(micro / 1000)`
    pub fn server_now_ms(&self) -> ClientResult<i64> {
        let atom = DateTime::parse_from_rfc3339(&self.atom)
            .map_err(|e| ClientError::InvalidResponse(format!("invalid atom '{}': {}", self.atom, e)))?;
        let micro_ms = (self.micro as f64 / 1000.0).round() as i64;
        Ok(atom.timestamp_millis() + micro_ms)
    }
}

/// Client offset to apply, or 0 when within tolerance
pub fn measure_offset(server_now_ms: i64, client_now_ms: i64) -> i64 {
    let offset = server_now_ms - client_now_ms;
    if offset.abs() > CLOCK_SKEW_TOLERANCE_MS {
        offset
    } else {
        0
    }
}

/// Millisecond wall clock
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

struct GateInner {
    release_time_ms: Option<i64>,
    client_offset: AtomicI64,
    released: watch::Sender<bool>,
    client_time: Mutex<String>,
    server_time: Mutex<String>,
    poll_token: Mutex<Option<CancellationToken>>,
    http: reqwest::Client,
    clock: Clock,
}

impl GateInner {
    fn is_released_now(&self) -> bool {
        match self.release_time_ms {
            Some(release) => release <= (self.clock)() + self.client_offset.load(Ordering::SeqCst),
            None => true,
        }
    }
}

impl Drop for GateInner {
    fn drop(&mut self) {
        if let Some(token) = self.poll_token.get_mut().take() {
            token.cancel();
        }
    }
}

/// Clock-skew aware "has the release time passed" flag
#[derive(Clone)]
pub struct ReleaseGate {
    inner: Arc<GateInner>,
}

impl std::fmt::Debug for ReleaseGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseGate")
            .field("release_time_ms", &self.inner.release_time_ms)
            .field("client_offset", &self.client_offset())
            .field("released", &self.is_released())
            .finish()
    }
}

impl ReleaseGate {
    /// `release_time = None` means released from the start
    pub fn new(release_time: Option<DateTime<Utc>>, http: reqwest::Client) -> Self {
        Self::with_clock(release_time, http, Arc::new(now_ms))
    }

    /// Use a custom millisecond clock instead of the system time
    pub fn with_clock(
        release_time: Option<DateTime<Utc>>,
        http: reqwest::Client,
        clock: Clock,
    ) -> Self {
        let release_time_ms = release_time.map(|t| t.timestamp_millis());
        let (released, _) = watch::channel(release_time_ms.is_none());
        Self {
            inner: Arc::new(GateInner {
                release_time_ms,
                client_offset: AtomicI64::new(0),
                released,
                client_time: Mutex::new(String::new()),
                server_time: Mutex::new(String::new()),
                poll_token: Mutex::new(None),
                http,
                clock,
            }),
        }
    }

    pub fn client_offset(&self) -> i64 {
        self.inner.client_offset.load(Ordering::SeqCst)
    }

    /// Last flag value; see [`Self::subscribe`] to wait for changes
    pub fn is_released(&self) -> bool {
        *self.inner.released.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.released.subscribe()
    }

    /// Client time of the last sync, formatted
    pub fn client_time(&self) -> String {
        self.inner.client_time.lock().clone()
    }

    /// Server time of the last sync, formatted
    pub fn server_time(&self) -> String {
        self.inner.server_time.lock().clone()
    }

    /// release_time <= now + offset
    pub fn is_released_now(&self) -> bool {
        self.inner.is_released_now()
    }

    /// Fetch the time reference, correct the offset, then gate
    pub async fn fetch_time(&self, url: &str) -> ClientResult<()> {
        let result = async {
            let response = self.inner.http.get(url).send().await?;
            if !response.status().is_success() {
                return Err(ClientError::InvalidResponse(format!(
                    "could not retrieve server time: {}",
                    response.status()
                )));
            }
            let client_now = (self.inner.clock)();
            let time: ServerTime = response.json().await?;
            Ok::<_, ClientError>((time, client_now))
        }
        .await;

        match result {
            Ok((time, client_now)) => self.sync_with(&time, client_now),
            Err(e) => {
                tracing::error!(error = %e, "Time reference request failed");
                Err(e)
            }
        }
    }

    /// Apply a time reference measured at `client_now_ms`
    pub fn sync_with(&self, time: &ServerTime, client_now_ms: i64) -> ClientResult<()> {
        let server_now = time.server_now_ms()?;
        *self.inner.client_time.lock() = format_date_time(Some(client_now_ms));
        *self.inner.server_time.lock() = format_date_time(Some(server_now));

        let offset = measure_offset(server_now, client_now_ms);
        if offset != 0 {
            tracing::info!(offset_ms = offset, "Client clock is off, applying offset");
            self.inner.client_offset.store(offset, Ordering::SeqCst);
        }

        if self.is_released_now() {
            self.inner.released.send_replace(true);
        } else {
            self.start_polling();
        }
        Ok(())
    }

    /// Check every 2 s until the release time has passed
    pub fn start_polling(&self) {
        let mut slot = self.inner.poll_token.lock();
        if slot.is_some() || self.is_released() {
            return;
        }
        let token = CancellationToken::new();
        *slot = Some(token.clone());
        drop(slot);

        // 任务只持有弱引用，最后一个句柄释放时 Drop 会取消轮询
        let inner = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(Instant::now() + RELEASE_POLL_INTERVAL, RELEASE_POLL_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = ticker.tick() => {
                        let Some(inner) = inner.upgrade() else { return };
                        if inner.is_released_now() {
                            inner.poll_token.lock().take();
                            inner.released.send_replace(true);
                            tracing::info!("Release time reached");
                            return;
                        }
                    }
                }
            }
        });
    }

    pub fn clear_release_interval(&self) {
        if let Some(token) = self.inner.poll_token.lock().take() {
            token.cancel();
        }
    }

    pub fn is_polling(&self) -> bool {
        self.inner.poll_token.lock().is_some()
    }
}

/// Four-minute edit countdown
#[derive(Debug)]
pub struct EditTimer {
    duration: Duration,
    countdown: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    token: Mutex<Option<CancellationToken>>,
}

impl EditTimer {
    pub fn new() -> Self {
        Self::with_duration(EDIT_TIMEOUT)
    }

    pub fn with_duration(duration: Duration) -> Self {
        Self {
            duration,
            countdown: Arc::new(AtomicU64::new(0)),
            running: Arc::new(AtomicBool::new(false)),
            token: Mutex::new(None),
        }
    }

    /// Start the countdown; `on_timeout` runs once it reaches zero
    ///
    /// 已在运行的计时器会先被清除。
    pub fn set_timer<F>(&self, on_timeout: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.clear_timer();

        let token = CancellationToken::new();
        *self.token.lock() = Some(token.clone());
        self.countdown.store(self.duration.as_secs(), Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);

        let countdown = self.countdown.clone();
        let running = self.running.clone();
        let deadline = Instant::now() + self.duration;
        tokio::spawn(async move {
            let second = Duration::from_secs(1);
            let mut ticker = tokio::time::interval_at(Instant::now() + second, second);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep_until(deadline) => break,
                    _ = ticker.tick() => {
                        let _ = countdown.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                            Some(n.saturating_sub(1))
                        });
                    }
                }
            }
            countdown.store(0, Ordering::SeqCst);
            running.store(false, Ordering::SeqCst);
            on_timeout.await;
        });
    }

    pub fn clear_timer(&self) {
        if let Some(token) = self.token.lock().take() {
            token.cancel();
        }
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Remaining seconds
    pub fn countdown(&self) -> u64 {
        self.countdown.load(Ordering::SeqCst)
    }

    /// Remaining time as `mm:ss`
    pub fn countdown_to_time(&self) -> String {
        countdown_to_time(self.countdown())
    }
}

impl Default for EditTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EditTimer {
    fn drop(&mut self) {
        self.clear_timer();
    }
}

/// Seconds as `mm:ss`
pub fn countdown_to_time(seconds: u64) -> String {
    format!("{:02}:{:02}", (seconds / 60) % 60, seconds % 60)
}
