//! Submission handler for the prediction form.
//!
//! The handler is bound to a form, a result container and a transport at
//! construction time. For every submit event it suppresses the default
//! navigation, snapshots the form, posts it once, decodes the reply and
//! replaces the container content with exactly one message. It never
//! returns an error: every failure ends as a rendered error block and a
//! `SubmissionReport` describing it.
//!
//! Overlapping submissions are not queued or de-duplicated. Each one carries
//! a generation number; `ConcurrencyPolicy` decides whether a reply from an
//! older generation may still overwrite the container.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::LoanformConfig;
use crate::error::{ConfigError, SubmitError};
use crate::payload::FormPayload;
use crate::page::{FormSource, PageEvent, ResultContainer, SubmitEvent};
use crate::render::{RenderedMessage, StylePolicy, render_result};
use crate::response::{Outcome, PredictionResponse};
use crate::transport::PredictionTransport;

/// What happens when replies to overlapping submissions arrive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyPolicy {
    /// Replies from a submission older than the newest one are discarded.
    #[default]
    LatestWins,
    /// Every reply is rendered; whichever resolves last stays on screen.
    LastResolvedWins,
}

/// Result of handling one submit event.
#[derive(Debug, Clone)]
pub struct SubmissionReport {
    pub submission_id: Uuid,
    pub generation: u64,
    pub default_prevented: bool,
    pub result: Result<Outcome, SubmitError>,
    pub message: RenderedMessage,
    /// Whether the message was written to the container. False only for a
    /// stale reply under `ConcurrencyPolicy::LatestWins`.
    pub applied: bool,
    pub completed_at: DateTime<Utc>,
}

impl SubmissionReport {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// The standing submit listener for one form.
pub struct SubmissionHandler {
    form: Arc<dyn FormSource>,
    container: Arc<dyn ResultContainer>,
    transport: Arc<dyn PredictionTransport>,
    style_policy: StylePolicy,
    concurrency: ConcurrencyPolicy,
    /// Last generation handed out.
    generation: AtomicU64,
    in_flight: AtomicUsize,
    /// Serializes the staleness check with the container write.
    render_lock: Mutex<()>,
}

impl SubmissionHandler {
    pub fn new(
        form: Arc<dyn FormSource>,
        container: Arc<dyn ResultContainer>,
        transport: Arc<dyn PredictionTransport>,
    ) -> Self {
        Self {
            form,
            container,
            transport,
            style_policy: StylePolicy::default(),
            concurrency: ConcurrencyPolicy::default(),
            generation: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            render_lock: Mutex::new(()),
        }
    }

    /// Install a handler on the elements named in the config.
    ///
    /// Fails if the given form or container does not carry the configured id.
    pub fn install(
        config: &LoanformConfig,
        form: Arc<dyn FormSource>,
        container: Arc<dyn ResultContainer>,
        transport: Arc<dyn PredictionTransport>,
    ) -> Result<Self, ConfigError> {
        if form.id() != config.page.form_id {
            return Err(ConfigError::Invalid {
                message: format!(
                    "no form with id '{}' (got '{}')",
                    config.page.form_id,
                    form.id()
                ),
            });
        }
        if container.id() != config.page.result_id {
            return Err(ConfigError::Invalid {
                message: format!(
                    "no result container with id '{}' (got '{}')",
                    config.page.result_id,
                    container.id()
                ),
            });
        }
        info!(
            form = form.id(),
            result = container.id(),
            endpoint = transport.endpoint(),
            "Submission handler installed"
        );
        Ok(Self::new(form, container, transport)
            .with_style_policy(config.render.style_policy)
            .with_concurrency(config.handler.concurrency))
    }

    pub fn with_style_policy(mut self, policy: StylePolicy) -> Self {
        self.style_policy = policy;
        self
    }

    pub fn with_concurrency(mut self, policy: ConcurrencyPolicy) -> Self {
        self.concurrency = policy;
        self
    }

    /// Number of submissions currently awaiting a reply.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Number of submissions started so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Raise a fresh submit event and handle it.
    pub async fn submit(&self) -> SubmissionReport {
        let mut event = SubmitEvent::new();
        self.handle(&mut event).await
    }

    /// Handle one submit event to completion.
    pub async fn handle(&self, event: &mut SubmitEvent) -> SubmissionReport {
        let dispatched = self.begin(event);
        self.complete(dispatched).await
    }

    /// The synchronous part of a submission: suppress the default action,
    /// take a generation and capture the form as it is right now.
    fn begin(&self, event: &mut SubmitEvent) -> Dispatched {
        event.prevent_default();

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let payload = self.form.snapshot();
        debug!(
            submission = %event.id,
            generation,
            fields = payload.len(),
            endpoint = self.transport.endpoint(),
            "Submitting form"
        );
        Dispatched {
            submission_id: event.id,
            default_prevented: event.default_prevented(),
            generation,
            payload,
        }
    }

    async fn complete(&self, dispatched: Dispatched) -> SubmissionReport {
        let Dispatched {
            submission_id,
            default_prevented,
            generation,
            payload,
        } = dispatched;

        let result = {
            let _guard = InFlightGuard::enter(&self.in_flight);
            self.transport
                .submit(&payload)
                .await
                .and_then(PredictionResponse::into_outcome)
        };

        match &result {
            Ok(outcome) => info!(
                submission = %submission_id,
                generation,
                prediction = outcome.label(),
                "Prediction received"
            ),
            Err(err) => warn!(
                submission = %submission_id,
                generation,
                kind = err.kind(),
                error = %err,
                "Submission failed"
            ),
        }

        let message = render_result(&result, self.style_policy);
        let applied = self.apply(generation, &message);

        SubmissionReport {
            submission_id,
            generation,
            default_prevented,
            result,
            message,
            applied,
            completed_at: Utc::now(),
        }
    }

    fn apply(&self, generation: u64, message: &RenderedMessage) -> bool {
        let _lock = self
            .render_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.concurrency == ConcurrencyPolicy::LatestWins {
            let latest = self.generation.load(Ordering::SeqCst);
            if generation < latest {
                debug!(generation, latest, "Discarding stale reply");
                return false;
            }
        }
        self.container.replace_inner_html(&message.to_html());
        true
    }

    /// Listen for page events until the sender side closes.
    ///
    /// Events are taken in order: input is applied to the form at once, and
    /// a submit captures the form before the next event is looked at. The
    /// request itself runs concurrently with later events, so the listener
    /// re-arms immediately. Returns the reports of all submissions once the
    /// in-flight ones have finished.
    pub async fn listen(self: Arc<Self>, mut events: mpsc::Receiver<PageEvent>) -> Vec<SubmissionReport> {
        let mut tasks = JoinSet::new();
        let mut reports = Vec::new();

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(PageEvent::Input { name, value }) => self.form.input(&name, value),
                    Some(PageEvent::Submit(mut event)) => {
                        let dispatched = self.begin(&mut event);
                        let handler = Arc::clone(&self);
                        tasks.spawn(async move { handler.complete(dispatched).await });
                    }
                    None => break,
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    collect(joined, &mut reports);
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            collect(joined, &mut reports);
        }
        debug!(handled = reports.len(), "Submit listener stopped");
        reports
    }
}

fn collect(
    joined: Result<SubmissionReport, tokio::task::JoinError>,
    reports: &mut Vec<SubmissionReport>,
) {
    match joined {
        Ok(report) => reports.push(report),
        Err(e) => error!(error = %e, "Submission task failed"),
    }
}

/// A submission that has been captured but not yet sent.
struct Dispatched {
    submission_id: Uuid,
    default_prevented: bool,
    generation: u64,
    payload: FormPayload,
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
