//! Cron-driven execution of the automation engine.
//!
//! Runs two kinds of jobs on one `JobScheduler`: a fixed-cadence sweep that
//! checks every enabled user for calendar changes, and one daily-summary job
//! per user, registered at that user's configured local time. Join handles
//! are tracked, cancellation is explicit, and every asynchronous operation is
//! wrapped in a timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use cadence_core::ports::UserConfigSource;
use cadence_core::AutomationEngine;
use cadence_domain::constants::CHANGE_POLL_CRON;
use cadence_domain::{AutomationStatus, CadenceError, UserAutomationConfig};
use chrono_tz::Tz;
use parking_lot::Mutex;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Configuration for the automation scheduler.
#[derive(Debug, Clone)]
pub struct AutomationSchedulerConfig {
    /// Cron expression for the change-detection sweep.
    pub sweep_cron: String,
    /// Timeout applied to a single job execution.
    pub job_timeout: Duration,
    /// Timeout for starting the underlying scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
    /// Timeout for awaiting the monitor task join handle.
    pub join_timeout: Duration,
}

impl Default for AutomationSchedulerConfig {
    fn default() -> Self {
        Self {
            sweep_cron: CHANGE_POLL_CRON.into(),
            job_timeout: Duration::from_secs(300),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Automation scheduler with explicit lifecycle management.
pub struct AutomationScheduler {
    scheduler: Arc<RwLock<JobScheduler>>,
    config: AutomationSchedulerConfig,
    engine: Arc<AutomationEngine>,
    users: Arc<dyn UserConfigSource>,
    daily_jobs: Mutex<HashMap<String, Uuid>>,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
}

impl AutomationScheduler {
    /// Create a scheduler with the default configuration.
    pub async fn new(
        engine: Arc<AutomationEngine>,
        users: Arc<dyn UserConfigSource>,
    ) -> SchedulerResult<Self> {
        Self::with_config(AutomationSchedulerConfig::default(), engine, users).await
    }

    /// Create a scheduler with a custom configuration.
    ///
    /// The change-detection sweep is registered here; daily-summary jobs are
    /// registered per user on [`start`](Self::start) and
    /// [`start_user`](Self::start_user).
    pub async fn with_config(
        config: AutomationSchedulerConfig,
        engine: Arc<AutomationEngine>,
        users: Arc<dyn UserConfigSource>,
    ) -> SchedulerResult<Self> {
        let raw_scheduler = JobScheduler::new()
            .await
            .map_err(|e| SchedulerError::CreationFailed(e.to_string()))?;

        Self::register_sweep_job(&raw_scheduler, &config, engine.clone(), users.clone()).await?;

        Ok(Self {
            scheduler: Arc::new(RwLock::new(raw_scheduler)),
            config,
            engine,
            users,
            daily_jobs: Mutex::new(HashMap::new()),
            monitor_handle: None,
            cancellation: CancellationToken::new(),
        })
    }

    /// Start the scheduler, registering a daily-summary job for every
    /// currently enabled user and spawning the monitoring task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let enabled = self
            .users
            .get_enabled_users()
            .await
            .map_err(|e| SchedulerError::JobRegistrationFailed(e.to_string()))?;
        for config in &enabled {
            self.register_daily_job(config).await?;
        }

        let scheduler = self.scheduler.clone();
        let start_timeout = self.config.start_timeout;
        let start_result = tokio::time::timeout(start_timeout, async move {
            let guard = scheduler.write().await;
            guard.start().await
        })
        .await
        .map_err(|_| SchedulerError::Timeout { seconds: start_timeout.as_secs() })?;

        start_result.map_err(|e| SchedulerError::StartFailed(e.to_string()))?;

        let cancel = self.cancellation.clone();
        let handle = tokio::spawn(async move {
            Self::monitor_task(cancel).await;
        });

        self.monitor_handle = Some(handle);
        info!(users = enabled.len(), "Automation scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for the monitor task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        let scheduler = self.scheduler.clone();
        let stop_timeout = self.config.stop_timeout;
        let stop_result = tokio::time::timeout(stop_timeout, async move {
            let mut guard = scheduler.write().await;
            guard.shutdown().await
        })
        .await
        .map_err(|_| SchedulerError::Timeout { seconds: stop_timeout.as_secs() })?;

        stop_result.map_err(|e| SchedulerError::StopFailed(e.to_string()))?;

        self.daily_jobs.lock().clear();

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|e| SchedulerError::TaskJoinFailed(e.to_string()))?;
        }

        info!("Automation scheduler stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    /// Returns true when the monitor task is active.
    pub fn is_running(&self) -> bool {
        self.monitor_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Register (or re-register) the daily-summary job for one user.
    ///
    /// Returns `Ok(false)` without touching the schedule when the user is
    /// unknown or has automation disabled. Calling this for a user with an
    /// active job replaces the job, so a config change takes effect by
    /// calling `start_user` again.
    #[instrument(skip(self))]
    pub async fn start_user(&self, user_id: &str) -> SchedulerResult<bool> {
        let config = self
            .users
            .get_config(user_id)
            .await
            .map_err(|e| SchedulerError::JobRegistrationFailed(e.to_string()))?;

        let config = match config {
            Some(config) if config.enabled => config,
            _ => {
                debug!(user_id, "No enabled config; daily job not registered");
                return Ok(false);
            }
        };

        self.register_daily_job(&config).await?;
        Ok(true)
    }

    /// Remove the daily-summary job for one user.
    ///
    /// Idempotent: returns `Ok(false)` when no job was registered.
    #[instrument(skip(self))]
    pub async fn stop_user(&self, user_id: &str) -> SchedulerResult<bool> {
        let removed = self.daily_jobs.lock().remove(user_id);
        let Some(job_id) = removed else {
            return Ok(false);
        };

        let scheduler = self.scheduler.write().await;
        scheduler
            .remove(&job_id)
            .await
            .map_err(|e| SchedulerError::JobRemovalFailed(e.to_string()))?;
        debug!(user_id, job_id = %job_id, "Removed daily summary job");
        Ok(true)
    }

    /// Report the scheduling state for one user without side effects.
    pub async fn status(&self, user_id: &str) -> cadence_domain::Result<AutomationStatus> {
        let config = self
            .users
            .get_config(user_id)
            .await?
            .ok_or_else(|| CadenceError::NotFound(format!("no automation config for {user_id}")))?;

        let job_active = self.daily_jobs.lock().contains_key(user_id);
        Ok(AutomationStatus {
            enabled: config.enabled,
            daily_summary_time: config.daily_summary_time,
            timezone: config.timezone,
            job_active,
            change_detection_active: self.is_running(),
        })
    }

    async fn register_daily_job(&self, config: &UserAutomationConfig) -> SchedulerResult<()> {
        let (hour, minute) = config
            .summary_time()
            .map_err(|e| SchedulerError::InvalidConfig(e.to_string()))?;
        let timezone: Tz = config.timezone.parse().map_err(|_| {
            SchedulerError::InvalidConfig(format!("unknown timezone: {}", config.timezone))
        })?;

        // Second-resolution cron, fired once a day in the user's timezone
        let cron_expr = format!("0 {minute} {hour} * * *");
        let engine = self.engine.clone();
        let user_id = config.user_id.clone();
        let job_timeout = self.config.job_timeout;

        let job_definition = Job::new_async_tz(cron_expr.as_str(), timezone, move |_id, _lock| {
            let engine = engine.clone();
            let user_id = user_id.clone();

            Box::pin(async move {
                match tokio::time::timeout(job_timeout, engine.run_daily_summary(&user_id)).await
                {
                    Ok(Ok(report)) if report.skipped => {
                        debug!(user_id = %user_id, "Daily summary skipped");
                    }
                    Ok(Ok(report)) => {
                        info!(
                            user_id = %user_id,
                            events = report.event_count,
                            delivered = %report.dispatch.ratio(),
                            "Daily summary delivered"
                        );
                    }
                    Ok(Err(err)) => {
                        error!(user_id = %user_id, error = ?err, "Daily summary failed");
                    }
                    Err(_) => {
                        warn!(
                            user_id = %user_id,
                            timeout_secs = job_timeout.as_secs(),
                            "Daily summary timed out"
                        );
                    }
                }
            })
        })
        .map_err(|e| SchedulerError::JobRegistrationFailed(e.to_string()))?;

        let job_id = job_definition.guid();
        {
            let scheduler = self.scheduler.write().await;
            scheduler
                .add(job_definition)
                .await
                .map_err(|e| SchedulerError::JobRegistrationFailed(e.to_string()))?;
        }

        // Replace any previous job for this user so re-registration never
        // leaves two daily jobs firing.
        let previous = self.daily_jobs.lock().insert(config.user_id.clone(), job_id);
        if let Some(stale) = previous {
            let scheduler = self.scheduler.write().await;
            scheduler
                .remove(&stale)
                .await
                .map_err(|e| SchedulerError::JobRemovalFailed(e.to_string()))?;
        }

        debug!(
            user_id = %config.user_id,
            cron = %cron_expr,
            timezone = %config.timezone,
            job_id = %job_id,
            "Registered daily summary job"
        );
        Ok(())
    }

    async fn register_sweep_job(
        scheduler: &JobScheduler,
        config: &AutomationSchedulerConfig,
        engine: Arc<AutomationEngine>,
        users: Arc<dyn UserConfigSource>,
    ) -> SchedulerResult<()> {
        let job_timeout = config.job_timeout;

        let job_definition = Job::new_async(config.sweep_cron.as_str(), move |_id, _lock| {
            let engine = engine.clone();
            let users = users.clone();

            Box::pin(async move {
                match tokio::time::timeout(job_timeout, Self::run_sweep(engine, users)).await {
                    Ok(()) => debug!("Change sweep finished"),
                    Err(_) => {
                        warn!(timeout_secs = job_timeout.as_secs(), "Change sweep timed out")
                    }
                }
            })
        })
        .map_err(|e| SchedulerError::JobRegistrationFailed(e.to_string()))?;

        let job_id = job_definition.guid();
        scheduler
            .add(job_definition)
            .await
            .map_err(|e| SchedulerError::JobRegistrationFailed(e.to_string()))?;

        debug!(cron = %config.sweep_cron, job_id = %job_id, "Registered change sweep job");
        Ok(())
    }

    /// One pass over every enabled user. Failures are isolated per user so a
    /// single broken calendar never stalls the sweep.
    async fn run_sweep(engine: Arc<AutomationEngine>, users: Arc<dyn UserConfigSource>) {
        let configs = match users.get_enabled_users().await {
            Ok(configs) => configs,
            Err(err) => {
                error!(error = ?err, "Failed to load enabled users for change sweep");
                return;
            }
        };

        if configs.is_empty() {
            debug!("No enabled users for change sweep");
            return;
        }

        let mut changes = 0;
        let mut errors = 0;

        for config in &configs {
            match engine.run_change_check(&config.user_id).await {
                Ok(report) if report.skipped => {
                    debug!(user_id = %config.user_id, "Change check skipped");
                }
                Ok(report) => {
                    changes += report.changes_detected;
                    debug!(
                        user_id = %config.user_id,
                        fetched = report.events_fetched,
                        changes = report.changes_detected,
                        "Change check finished"
                    );
                }
                Err(err) => {
                    errors += 1;
                    warn!(user_id = %config.user_id, error = ?err, "Change check failed");
                    if let Some(recipient) = config.recipients.first() {
                        engine.notify_error(recipient, &err.to_string()).await;
                    }
                }
            }
        }

        info!(total_users = configs.len(), changes, errors, "Change sweep completed");
    }

    async fn monitor_task(cancel: CancellationToken) {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Automation scheduler monitor cancelled");
            }
        }
    }
}

impl Drop for AutomationScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("AutomationScheduler dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cadence_domain::{CalendarEvent, RawRemoteEvent, Result as DomainResult};
    use chrono::{DateTime, Utc};

    struct EmptySource;

    #[async_trait]
    impl cadence_core::ports::EventSource for EmptySource {
        async fn fetch_events(
            &self,
            _user_id: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> DomainResult<Vec<RawRemoteEvent>> {
            Ok(Vec::new())
        }
    }

    struct NullRepo;

    #[async_trait]
    impl cadence_core::ports::SnapshotRepository for NullRepo {
        async fn find_by_user_and_range(
            &self,
            _user_id: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> DomainResult<Vec<CalendarEvent>> {
            Ok(Vec::new())
        }

        async fn upsert(&self, event: &CalendarEvent) -> DomainResult<CalendarEvent> {
            Ok(event.clone())
        }

        async fn mark_cancelled(
            &self,
            user_id: &str,
            event_id: &str,
        ) -> DomainResult<CalendarEvent> {
            Err(CadenceError::NotFound(format!("no snapshot for {user_id}/{event_id}")))
        }
    }

    struct StaticUsers(Vec<UserAutomationConfig>);

    #[async_trait]
    impl UserConfigSource for StaticUsers {
        async fn get_enabled_users(&self) -> DomainResult<Vec<UserAutomationConfig>> {
            Ok(self.0.iter().filter(|c| c.enabled).cloned().collect())
        }

        async fn get_config(&self, user_id: &str) -> DomainResult<Option<UserAutomationConfig>> {
            Ok(self.0.iter().find(|c| c.user_id == user_id).cloned())
        }
    }

    struct SilentChannel;

    #[async_trait]
    impl cadence_core::ports::MessageChannel for SilentChannel {
        async fn send(&self, _recipient: &str, _text: &str) -> DomainResult<bool> {
            Ok(true)
        }
    }

    fn user(user_id: &str, enabled: bool) -> UserAutomationConfig {
        UserAutomationConfig {
            user_id: user_id.to_string(),
            enabled,
            daily_summary_time: "08:00".to_string(),
            timezone: "America/New_York".to_string(),
            recipients: vec!["chat:alice".to_string()],
        }
    }

    async fn scheduler_with(configs: Vec<UserAutomationConfig>) -> AutomationScheduler {
        let users = Arc::new(StaticUsers(configs));
        let engine = Arc::new(AutomationEngine::new(
            Arc::new(EmptySource),
            Arc::new(NullRepo),
            users.clone(),
            Arc::new(SilentChannel),
        ));
        let config = AutomationSchedulerConfig {
            job_timeout: Duration::from_secs(2),
            start_timeout: Duration::from_secs(2),
            stop_timeout: Duration::from_secs(2),
            join_timeout: Duration::from_secs(2),
            ..Default::default()
        };
        AutomationScheduler::with_config(config, engine, users).await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn lifecycle_registers_enabled_users() {
        let mut scheduler = scheduler_with(vec![user("u1", true), user("u2", false)]).await;

        scheduler.start().await.unwrap();
        assert!(scheduler.is_running());
        assert_eq!(scheduler.daily_jobs.lock().len(), 1);
        assert!(scheduler.daily_jobs.lock().contains_key("u1"));

        scheduler.stop().await.unwrap();
        assert!(!scheduler.is_running());
        assert!(scheduler.daily_jobs.lock().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn double_start_and_stray_stop_are_rejected() {
        let mut scheduler = scheduler_with(vec![user("u1", true)]).await;

        assert!(matches!(scheduler.stop().await, Err(SchedulerError::NotRunning)));

        scheduler.start().await.unwrap();
        assert!(matches!(scheduler.start().await, Err(SchedulerError::AlreadyRunning)));

        scheduler.stop().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn restarting_a_user_replaces_the_existing_job() {
        let mut scheduler = scheduler_with(vec![user("u1", true)]).await;
        scheduler.start().await.unwrap();

        let first = scheduler.daily_jobs.lock().get("u1").copied().unwrap();
        assert!(scheduler.start_user("u1").await.unwrap());
        let second = scheduler.daily_jobs.lock().get("u1").copied().unwrap();

        assert_ne!(first, second);
        assert_eq!(scheduler.daily_jobs.lock().len(), 1);

        scheduler.stop().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn disabled_or_unknown_users_get_no_job() {
        let mut scheduler = scheduler_with(vec![user("u2", false)]).await;
        scheduler.start().await.unwrap();

        assert!(!scheduler.start_user("u2").await.unwrap());
        assert!(!scheduler.start_user("nobody").await.unwrap());
        assert!(scheduler.daily_jobs.lock().is_empty());

        scheduler.stop().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_user_is_idempotent() {
        let mut scheduler = scheduler_with(vec![user("u1", true)]).await;
        scheduler.start().await.unwrap();

        assert!(scheduler.stop_user("u1").await.unwrap());
        assert!(!scheduler.stop_user("u1").await.unwrap());

        scheduler.stop().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn status_reflects_job_and_sweep_state() {
        let mut scheduler = scheduler_with(vec![user("u1", true)]).await;

        let status = scheduler.status("u1").await.unwrap();
        assert!(status.enabled);
        assert!(!status.job_active);
        assert!(!status.change_detection_active);

        scheduler.start().await.unwrap();
        let status = scheduler.status("u1").await.unwrap();
        assert!(status.job_active);
        assert!(status.change_detection_active);
        assert_eq!(status.daily_summary_time, "08:00");
        assert_eq!(status.timezone, "America/New_York");

        scheduler.stop().await.unwrap();

        let err = scheduler.status("nobody").await.unwrap_err();
        assert!(matches!(err, CadenceError::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn malformed_summary_time_is_an_invalid_config() {
        let mut bad = user("u1", true);
        bad.daily_summary_time = "25:99".to_string();
        let scheduler = scheduler_with(vec![bad]).await;

        let err = scheduler.start_user("u1").await.unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidConfig(_)));
    }
}
