use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;

use super::JobStatus;
use crate::utils::format_duration;
use crate::Result;

/// Polls a job's status until it reaches a terminal state
pub struct JobPoller {
    poll_interval: Duration,
    max_poll_interval: Duration,
    show_progress: bool,
}

impl JobPoller {
    pub fn new(poll_interval: Duration, max_poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            max_poll_interval: max_poll_interval.max(poll_interval),
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Delay before the next check; grows by 2s per check up to the maximum
    pub fn delay_for(&self, check_count: u32) -> Duration {
        let grown = self.poll_interval + Duration::from_secs(2 * u64::from(check_count.saturating_sub(1)));
        grown.min(self.max_poll_interval)
    }

    /// Call `fetch_status` until it returns a terminal job state. There is no overall timeout.
    pub async fn wait_for_completion<F, Fut>(&self, job_id: &str, mut fetch_status: F) -> Result<JobStatus>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<JobStatus>>,
    {
        let progress = self.spinner();
        progress.set_message(format!("Waiting for job {}...", job_id));

        let start_time = Instant::now();
        let mut check_count = 0u32;

        loop {
            check_count += 1;

            let status = match fetch_status().await {
                Ok(status) => status,
                Err(e) => {
                    progress.finish_with_message("Status check failed");
                    return Err(e);
                }
            };

            if status.job_state.is_terminal() {
                progress.finish_with_message(format!(
                    "Job {} after {}",
                    status.job_state,
                    format_duration(start_time.elapsed().as_secs_f64())
                ));
                tracing::debug!("Job {} reached {} after {} checks", job_id, status.job_state, check_count);
                return Ok(status);
            }

            progress.set_message(format!(
                "Transcribing... {} ({}s elapsed, check #{})",
                status.job_state,
                start_time.elapsed().as_secs(),
                check_count
            ));

            sleep(self.delay_for(check_count)).await;
        }
    }

    fn spinner(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            progress.set_style(style);
        }
        progress.enable_steady_tick(Duration::from_millis(120));
        progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcribe::JobState;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn status(state: JobState) -> JobStatus {
        JobStatus {
            job_id: "job".to_string(),
            job_state: state,
            error_message: None,
            job_details: Vec::new(),
        }
    }

    #[test]
    fn delay_grows_and_caps() {
        let poller = JobPoller::new(Duration::from_secs(5), Duration::from_secs(30));
        assert_eq!(poller.delay_for(1), Duration::from_secs(5));
        assert_eq!(poller.delay_for(2), Duration::from_secs(7));
        assert_eq!(poller.delay_for(10), Duration::from_secs(23));
        assert_eq!(poller.delay_for(50), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn polls_until_terminal() {
        let poller = JobPoller::new(Duration::from_millis(1), Duration::from_millis(3)).with_progress(false);
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let final_status = poller
            .wait_for_completion("job", move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    Ok(match n {
                        0 => status(JobState::Accepted),
                        1 | 2 => status(JobState::Running),
                        _ => status(JobState::Completed),
                    })
                }
            })
            .await
            .unwrap();

        assert_eq!(final_status.job_state, JobState::Completed);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn failure_is_terminal_and_errors_propagate() {
        let poller = JobPoller::new(Duration::from_millis(1), Duration::from_millis(1)).with_progress(false);

        let failed = poller
            .wait_for_completion("job", || async { Ok(status(JobState::Failed)) })
            .await
            .unwrap();
        assert!(failed.is_failed());

        let err = poller
            .wait_for_completion("job", || async { Err(anyhow::anyhow!("503 Service Unavailable")) })
            .await;
        assert!(err.is_err());
    }
}
