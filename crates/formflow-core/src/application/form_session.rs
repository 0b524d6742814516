//! Form session controller
//!
//! A [`FormSession`] binds one [`FormDefinition`] to its data, step sequencer,
//! validation dispatch, OTP state and submission lifecycle. The handle is
//! cheap to clone; all clones drive the same session.
//!
//! State lives behind a single `tokio::sync::Mutex` that is never held across
//! a network await. Each network call records the session `generation` (and,
//! for OTP requests, the `otp_epoch`) before suspending; a completion that
//! finds a different value is discarded without touching state.

use crate::config::EngineConfig;
use crate::domain::context::{Selection, SessionContext};
use crate::domain::events::{FormEvent, FormEventHandler, FormEventKind, TracingEventHandler};
use crate::domain::form_definition::{FormDefinition, FormId};
use crate::domain::form_state::FormData;
use crate::domain::otp::OtpSession;
use crate::domain::ports::{OtpDispatch, OtpProvider, SelectionStore, SubmissionEndpoint};
use crate::domain::sequencer::{Advance, StepSequencer};
use crate::domain::submission::{SubmissionLifecycle, SubmissionStatus};
use crate::domain::validation::{ErrorMap, ValidationRuleSet, ValidatorDispatch};
use crate::error::TransportError;
use crate::types::{SessionId, SubmissionReceipt};
use crate::FormError;
use std::fmt::Debug;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};

/// Result of [`FormSession::next`]
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The current step has errors; nothing moved
    Blocked(ErrorMap),
    /// Moved to the given step
    Moved(usize),
    /// The last step is valid; the host should call `submit`
    ReadyToSubmit,
}

/// Result of [`FormSession::resend_otp`]
#[derive(Debug, Clone, PartialEq)]
pub enum ResendOutcome {
    /// A new code was dispatched
    Sent(OtpDispatch),
    /// Resend ignored; the cooldown has not elapsed
    CoolingDown {
        /// Ticks left
        remaining: u32,
    },
}

/// Point-in-time view of a session, for rendering
#[derive(Debug, Clone)]
pub struct SessionSnapshot<D, R> {
    pub session_id: SessionId,
    pub form_id: FormId,
    pub current_step: usize,
    pub total_steps: usize,
    pub is_first_step: bool,
    pub is_last_step: bool,
    pub data: D,
    pub errors: ErrorMap,
    pub status: SubmissionStatus,
    /// The single status message currently shown
    pub message: Option<String>,
    pub otp_sent: bool,
    pub otp_cooldown: u32,
    pub can_resend: bool,
    pub context: SessionContext,
    pub receipt: Option<R>,
    pub ended: bool,
}

struct SessionState<D, R> {
    data: D,
    sequencer: StepSequencer,
    errors: ErrorMap,
    otp: OtpSession,
    lifecycle: SubmissionLifecycle,
    context: SessionContext,
    receipt: Option<R>,
    generation: u64,
    otp_epoch: u64,
    ended: bool,
    ticker: Option<JoinHandle<()>>,
}

impl<D, R> SessionState<D, R> {
    fn ensure_live(&self) -> Result<(), FormError> {
        if self.ended {
            return Err(FormError::SessionEnded);
        }
        Ok(())
    }

    fn stop_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }

    /// Discard OTP progress; any in-flight OTP completion becomes stale
    fn reset_otp(&mut self) {
        self.otp.reset();
        self.otp_epoch += 1;
        self.lifecycle.cancel_otp();
        self.stop_ticker();
    }

    /// Step moves clear validation errors and the status message
    fn clear_feedback(&mut self) {
        self.errors.clear();
        self.lifecycle.clear_message();
    }
}

struct SessionInner<D: FormData, R> {
    id: SessionId,
    definition: Arc<FormDefinition>,
    dispatch: ValidatorDispatch<D>,
    config: EngineConfig,
    otp_provider: Option<Arc<dyn OtpProvider>>,
    endpoint: Arc<dyn SubmissionEndpoint<D, Receipt = R>>,
    store: Option<Arc<dyn SelectionStore>>,
    event_handler: Arc<dyn FormEventHandler>,
    state: Mutex<SessionState<D, R>>,
}

impl<D: FormData, R> Drop for SessionInner<D, R> {
    fn drop(&mut self) {
        self.state.get_mut().stop_ticker();
    }
}

/// Handle to one multi-step form session
pub struct FormSession<D: FormData, R = SubmissionReceipt> {
    inner: Arc<SessionInner<D, R>>,
}

impl<D: FormData, R> Clone for FormSession<D, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: FormData, R> Debug for FormSession<D, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormSession")
            .field("id", &self.inner.id)
            .field("form_id", &self.inner.definition.id)
            .finish()
    }
}

/// Builder for [`FormSession`]
pub struct FormSessionBuilder<D: FormData, R> {
    definition: FormDefinition,
    data: D,
    rules: ValidationRuleSet<D>,
    endpoint: Option<Arc<dyn SubmissionEndpoint<D, Receipt = R>>>,
    otp_provider: Option<Arc<dyn OtpProvider>>,
    store: Option<Arc<dyn SelectionStore>>,
    event_handler: Option<Arc<dyn FormEventHandler>>,
    config: EngineConfig,
    session_id: Option<SessionId>,
}

impl<D, R> FormSessionBuilder<D, R>
where
    D: FormData,
    R: Clone + Debug + Send + Sync + 'static,
{
    /// Start building a session over `definition` with initial `data`
    pub fn new(definition: FormDefinition, data: D) -> Self {
        Self {
            definition,
            data,
            rules: ValidationRuleSet::new(),
            endpoint: None,
            otp_provider: None,
            store: None,
            event_handler: None,
            config: EngineConfig::default(),
            session_id: None,
        }
    }

    pub fn rules(mut self, rules: ValidationRuleSet<D>) -> Self {
        self.rules = rules;
        self
    }

    /// Where the completed form is sent; required
    pub fn submission_endpoint(mut self, endpoint: Arc<dyn SubmissionEndpoint<D, Receipt = R>>) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Required when the definition asks for an OTP
    pub fn otp_provider(mut self, provider: Arc<dyn OtpProvider>) -> Self {
        self.otp_provider = Some(provider);
        self
    }

    /// Source of the cached account and branch selection
    pub fn selection_store(mut self, store: Arc<dyn SelectionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Defaults to [`TracingEventHandler`]
    pub fn event_handler(mut self, handler: Arc<dyn FormEventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn session_id(mut self, id: SessionId) -> Self {
        self.session_id = Some(id);
        self
    }

    /// Validate the configuration, load the session context and start the
    /// session on step 0
    pub async fn build(self) -> Result<FormSession<D, R>, FormError> {
        self.definition.validate()?;
        self.config.validate()?;

        let endpoint = self.endpoint.ok_or_else(|| {
            FormError::Configuration("A submission endpoint is required".to_string())
        })?;

        if self.definition.requires_otp && self.otp_provider.is_none() {
            return Err(FormError::Configuration(format!(
                "Form {} requires an OTP provider",
                self.definition.id
            )));
        }

        let context = match &self.store {
            Some(store) => SessionContext::load(store.as_ref()).await?,
            None => SessionContext::default(),
        };

        let sequencer = StepSequencer::new(self.definition.total_steps())?;
        let definition = Arc::new(self.definition);
        let dispatch = ValidatorDispatch::new(definition.steps.clone(), self.rules);
        let id = self.session_id.unwrap_or_else(SessionId::generate);

        let session = FormSession {
            inner: Arc::new(SessionInner {
                id,
                definition,
                dispatch,
                config: self.config,
                otp_provider: self.otp_provider,
                endpoint,
                store: self.store,
                event_handler: self
                    .event_handler
                    .unwrap_or_else(|| Arc::new(TracingEventHandler)),
                state: Mutex::new(SessionState {
                    data: self.data,
                    sequencer,
                    errors: ErrorMap::new(),
                    otp: OtpSession::new(),
                    lifecycle: SubmissionLifecycle::new(),
                    context,
                    receipt: None,
                    generation: 0,
                    otp_epoch: 0,
                    ended: false,
                    ticker: None,
                }),
            }),
        };

        info!(
            session_id = %session.inner.id,
            form_id = %session.inner.definition.id,
            steps = session.inner.definition.total_steps(),
            "Form session started"
        );
        session
            .emit(vec![FormEventKind::SessionStarted {
                form_id: session.inner.definition.id.clone(),
            }])
            .await;

        Ok(session)
    }
}

impl<D, R> FormSession<D, R>
where
    D: FormData,
    R: Clone + Debug + Send + Sync + 'static,
{
    /// Start building a session
    pub fn builder(definition: FormDefinition, data: D) -> FormSessionBuilder<D, R> {
        FormSessionBuilder::new(definition, data)
    }

    pub fn id(&self) -> &SessionId {
        &self.inner.id
    }

    pub fn definition(&self) -> &FormDefinition {
        &self.inner.definition
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Shallow-merge a patch into the form data.
    ///
    /// When the current step is already showing errors they are recomputed
    /// against the new data. Changing one of the definition's
    /// `otp_reset_fields` discards any OTP already requested.
    pub async fn update(&self, patch: D::Patch) -> Result<(), FormError> {
        let mut events = vec![FormEventKind::DataUpdated];
        {
            let mut state = self.inner.state.lock().await;
            state.ensure_live()?;

            let reset_fields = &self.inner.definition.otp_reset_fields;
            let before: Vec<_> = reset_fields.iter().map(|f| state.data.field(f)).collect();
            state.data.merge(patch);

            let otp_started = state.otp.is_sent()
                || state.lifecycle.status() == SubmissionStatus::OtpRequested;
            let changed = reset_fields
                .iter()
                .zip(&before)
                .any(|(field, old)| state.data.field(field) != *old);
            if otp_started && changed {
                debug!(session_id = %self.inner.id, "OTP target changed; resetting OTP");
                state.reset_otp();
                events.push(FormEventKind::OtpReset);
            }

            if !state.errors.is_empty() {
                let step = state.sequencer.current();
                state.errors = self.inner.dispatch.validate_step(step, &state.data)?;
            }
        }

        self.emit(events).await;
        Ok(())
    }

    /// Copy of the current form data
    pub async fn data(&self) -> D {
        self.inner.state.lock().await.data.clone()
    }

    pub async fn current_step(&self) -> usize {
        self.inner.state.lock().await.sequencer.current()
    }

    pub async fn status(&self) -> SubmissionStatus {
        self.inner.state.lock().await.lifecycle.status()
    }

    pub async fn errors(&self) -> ErrorMap {
        self.inner.state.lock().await.errors.clone()
    }

    /// Receipt of a successful submission
    pub async fn receipt(&self) -> Option<R> {
        self.inner.state.lock().await.receipt.clone()
    }

    pub async fn snapshot(&self) -> SessionSnapshot<D, R> {
        let state = self.inner.state.lock().await;
        SessionSnapshot {
            session_id: self.inner.id.clone(),
            form_id: self.inner.definition.id.clone(),
            current_step: state.sequencer.current(),
            total_steps: state.sequencer.total(),
            is_first_step: state.sequencer.is_first_step(),
            is_last_step: state.sequencer.is_last_step(),
            data: state.data.clone(),
            errors: state.errors.clone(),
            status: state.lifecycle.status(),
            message: state.lifecycle.message().map(str::to_string),
            otp_sent: state.otp.is_sent(),
            otp_cooldown: state.otp.cooldown(),
            can_resend: state.otp.can_resend(),
            context: state.context.clone(),
            receipt: state.receipt.clone(),
            ended: state.ended,
        }
    }

    /// Validate the current step and advance only if it has no errors
    pub async fn next(&self) -> Result<StepOutcome, FormError> {
        let (outcome, event) = {
            let mut state = self.inner.state.lock().await;
            state.ensure_live()?;

            let step = state.sequencer.current();
            let errors = self.inner.dispatch.validate_step(step, &state.data)?;

            if !errors.is_empty() {
                debug!(
                    session_id = %self.inner.id,
                    step,
                    fields = %errors,
                    "Step blocked by validation"
                );
                state.errors = errors.clone();
                let event = FormEventKind::StepBlocked {
                    step,
                    errors: errors.clone(),
                };
                (StepOutcome::Blocked(errors), event)
            } else {
                match state.sequencer.advance() {
                    Advance::Moved { from, to } => {
                        state.clear_feedback();
                        debug!(session_id = %self.inner.id, from, to, "Step advanced");
                        (StepOutcome::Moved(to), FormEventKind::StepChanged { from, to })
                    }
                    Advance::SubmitRequested => {
                        state.errors.clear();
                        debug!(session_id = %self.inner.id, step, "Last step valid");
                        (StepOutcome::ReadyToSubmit, FormEventKind::ReadyToSubmit { step })
                    }
                }
            }
        };

        self.emit(vec![event]).await;
        Ok(outcome)
    }

    /// Move back one step; never validated. Returns the new index.
    pub async fn back(&self) -> Result<usize, FormError> {
        let (from, to) = {
            let mut state = self.inner.state.lock().await;
            state.ensure_live()?;
            let from = state.sequencer.current();
            let to = state.sequencer.retreat();
            state.clear_feedback();
            (from, to)
        };

        if from != to {
            debug!(session_id = %self.inner.id, from, to, "Step retreated");
            self.emit(vec![FormEventKind::StepChanged { from, to }]).await;
        }
        Ok(to)
    }

    /// Jump to a step, clamped to the form; never validated
    pub async fn go_to(&self, index: usize) -> Result<usize, FormError> {
        let (from, to) = {
            let mut state = self.inner.state.lock().await;
            state.ensure_live()?;
            let from = state.sequencer.current();
            let to = state.sequencer.go_to(index);
            state.clear_feedback();
            (from, to)
        };

        if from != to {
            debug!(session_id = %self.inner.id, from, to, requested = index, "Step jumped");
            self.emit(vec![FormEventKind::StepChanged { from, to }]).await;
        }
        Ok(to)
    }

    /// Recompute the current step's errors without moving
    pub async fn validate_current(&self) -> Result<ErrorMap, FormError> {
        let mut state = self.inner.state.lock().await;
        state.ensure_live()?;
        let step = state.sequencer.current();
        state.errors = self.inner.dispatch.validate_step(step, &state.data)?;
        Ok(state.errors.clone())
    }

    /// Ask the OTP provider to send a code to `target`
    pub async fn request_otp(&self, target: impl Into<String>) -> Result<OtpDispatch, FormError> {
        let target = target.into();
        let provider = self.inner.otp_provider.clone().ok_or_else(|| {
            FormError::Configuration("No OTP provider configured".to_string())
        })?;

        let (generation, epoch) = {
            let mut state = self.inner.state.lock().await;
            state.ensure_live()?;
            let cooldown = state.otp.cooldown();
            state.lifecycle.begin_otp_request(cooldown)?;
            (state.generation, state.otp_epoch)
        };

        debug!(session_id = %self.inner.id, phone = %target, "Requesting OTP");
        let result = self.bounded(provider.request_otp(&target)).await;

        let (outcome, event) = {
            let mut state = self.inner.state.lock().await;
            self.ensure_current(&state, generation)?;
            if state.otp_epoch != epoch {
                warn!(session_id = %self.inner.id, "Discarding OTP completion after reset");
                return Err(FormError::StaleCompletion(
                    "OTP request superseded by a reset".to_string(),
                ));
            }

            match result {
                Ok(dispatch) => {
                    let cooldown = self.inner.config.otp_cooldown_ticks;
                    state
                        .otp
                        .start(dispatch.target.clone(), cooldown, dispatch.message.clone());
                    state.lifecycle.otp_sent(dispatch.message.clone())?;

                    state.stop_ticker();
                    if self.inner.config.auto_tick && cooldown > 0 {
                        state.ticker = Some(spawn_ticker(
                            Arc::downgrade(&self.inner),
                            self.inner.config.tick_interval(),
                        ));
                    }

                    info!(session_id = %self.inner.id, phone = %dispatch.target, cooldown, "OTP sent");
                    let event = FormEventKind::OtpSent {
                        target: dispatch.target.clone(),
                        cooldown,
                    };
                    (Ok(dispatch), event)
                }
                Err(e) => {
                    let message = e.user_message();
                    state.lifecycle.otp_failed(message.clone())?;
                    state.otp.set_message(message.clone());

                    warn!(session_id = %self.inner.id, error = %e, "OTP request failed");
                    (Err(e), FormEventKind::OtpFailed { message })
                }
            }
        };

        self.emit(vec![event]).await;
        outcome
    }

    /// Resend the code; ignored while the cooldown is running
    pub async fn resend_otp(&self, target: impl Into<String>) -> Result<ResendOutcome, FormError> {
        {
            let state = self.inner.state.lock().await;
            state.ensure_live()?;
            if !state.otp.can_resend() {
                debug!(
                    session_id = %self.inner.id,
                    remaining = state.otp.cooldown(),
                    "Resend ignored during cooldown"
                );
                return Ok(ResendOutcome::CoolingDown {
                    remaining: state.otp.cooldown(),
                });
            }
        }

        self.request_otp(target).await.map(ResendOutcome::Sent)
    }

    /// Advance the cooldown by one tick. Returns the remaining ticks.
    pub async fn tick(&self) -> Result<u32, FormError> {
        let (before, remaining) = {
            let mut state = self.inner.state.lock().await;
            state.ensure_live()?;
            let before = state.otp.cooldown();
            (before, state.otp.tick())
        };

        if before > 0 && remaining == 0 {
            debug!(session_id = %self.inner.id, "OTP cooldown elapsed");
            self.emit(vec![FormEventKind::OtpCooldownElapsed]).await;
        }
        Ok(remaining)
    }

    /// Discard OTP state. Account selection and the definition's
    /// `otp_reset_fields` call this implicitly; hosts call it for any other
    /// change that invalidates a sent code.
    pub async fn reset_otp(&self) -> Result<(), FormError> {
        {
            let mut state = self.inner.state.lock().await;
            state.ensure_live()?;
            state.reset_otp();
        }

        debug!(session_id = %self.inner.id, "OTP reset");
        self.emit(vec![FormEventKind::OtpReset]).await;
        Ok(())
    }

    /// Validate every step and send the form to the submission endpoint.
    ///
    /// Only one submission may be in flight. On failure the lifecycle moves
    /// to `Failed` with the user-facing message and the step is unchanged.
    pub async fn submit(&self) -> Result<R, FormError> {
        let (generation, data) = {
            let mut state = self.inner.state.lock().await;
            state.ensure_live()?;
            state.lifecycle.check_submit()?;

            let errors = self.inner.dispatch.validate_all(&state.data);
            if !errors.is_empty() {
                debug!(session_id = %self.inner.id, fields = %errors, "Submission blocked by validation");
                state.errors = errors.clone();
                return Err(FormError::Validation(errors));
            }

            let otp_satisfied = !self.inner.definition.requires_otp || state.otp.is_sent();
            state.lifecycle.begin_submit(otp_satisfied)?;
            state.errors.clear();
            (state.generation, state.data.clone())
        };

        info!(session_id = %self.inner.id, form_id = %self.inner.definition.id, "Submitting form");
        self.emit(vec![FormEventKind::SubmissionStarted]).await;

        let result = self.bounded(self.inner.endpoint.submit(&data)).await;

        let (outcome, event) = {
            let mut state = self.inner.state.lock().await;
            self.ensure_current(&state, generation)?;

            match result {
                Ok(receipt) => {
                    state.lifecycle.succeed("Form submitted successfully")?;
                    state.receipt = Some(receipt.clone());
                    state.stop_ticker();

                    info!(session_id = %self.inner.id, "Form submitted");
                    (Ok(receipt), FormEventKind::SubmissionSucceeded)
                }
                Err(e) => {
                    let message = e.user_message();
                    state.lifecycle.fail(message.clone())?;

                    warn!(session_id = %self.inner.id, error = %e, "Form submission failed");
                    (Err(e), FormEventKind::SubmissionFailed { message })
                }
            }
        };

        self.emit(vec![event]).await;
        outcome
    }

    /// Select the account the form operates on. A changed account resets the
    /// OTP session.
    pub async fn select_account(&self, account: impl Into<String>) -> Result<(), FormError> {
        self.select(Selection::Account(account.into())).await
    }

    /// Select the branch the request is addressed to
    pub async fn select_branch(&self, branch: impl Into<String>) -> Result<(), FormError> {
        self.select(Selection::Branch(branch.into())).await
    }

    async fn select(&self, selection: Selection) -> Result<(), FormError> {
        self.inner.state.lock().await.ensure_live()?;

        if let Some(store) = &self.inner.store {
            selection.persist(store.as_ref()).await?;
        }

        let mut events = Vec::new();
        {
            let mut state = self.inner.state.lock().await;
            state.ensure_live()?;
            if !state.context.apply(&selection) {
                return Ok(());
            }

            events.push(FormEventKind::SelectionChanged {
                key: selection.key().to_string(),
                value: selection.value().to_string(),
            });

            if matches!(selection, Selection::Account(_)) {
                state.reset_otp();
                events.push(FormEventKind::OtpReset);
            }
        }

        debug!(
            session_id = %self.inner.id,
            key = selection.key(),
            value = selection.value(),
            "Selection changed"
        );
        self.emit(events).await;
        Ok(())
    }

    /// End the session. Pending completions are discarded and every later
    /// operation fails with `SessionEnded`. Idempotent.
    pub async fn abandon(&self) {
        {
            let mut state = self.inner.state.lock().await;
            if state.ended {
                return;
            }
            state.ended = true;
            state.generation += 1;
            state.reset_otp();
        }

        info!(session_id = %self.inner.id, "Form session abandoned");
        self.emit(vec![FormEventKind::SessionAbandoned]).await;
    }

    fn ensure_current(&self, state: &SessionState<D, R>, generation: u64) -> Result<(), FormError> {
        if state.ended || state.generation != generation {
            warn!(session_id = %self.inner.id, "Discarding completion for ended session");
            return Err(FormError::SessionEnded);
        }
        Ok(())
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, FormError>
    where
        F: Future<Output = Result<T, FormError>>,
    {
        let limit = self.inner.config.network_timeout();
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(FormError::Transport(TransportError::Timeout(limit))),
        }
    }

    async fn emit(&self, kinds: Vec<FormEventKind>) {
        for kind in kinds {
            let event = FormEvent::new(self.inner.id.clone(), kind);
            let event_type = event.event_type();
            if let Err(e) = self.inner.event_handler.handle_event(event).await {
                warn!(session_id = %self.inner.id, event_type, error = %e, "Event handler failed");
            }
        }
    }
}

/// Drives the OTP cooldown until it reaches zero. Holds only a weak
/// reference so a dropped session stops the task.
fn spawn_ticker<D, R>(session: Weak<SessionInner<D, R>>, period: Duration) -> JoinHandle<()>
where
    D: FormData,
    R: Clone + Debug + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        loop {
            interval.tick().await;
            let Some(inner) = session.upgrade() else {
                break;
            };
            let session = FormSession { inner };
            match session.tick().await {
                Ok(remaining) if remaining > 0 => {}
                _ => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::ChannelEventHandler;
    use crate::domain::form_state::FormState;
    use crate::domain::ports::MockOtpProvider;
    use crate::domain::rules;
    use async_trait::async_trait;

    struct AcceptAll;

    #[async_trait]
    impl SubmissionEndpoint<FormState> for AcceptAll {
        type Receipt = String;

        async fn submit(&self, _data: &FormState) -> Result<String, FormError> {
            Ok("REF-1".to_string())
        }
    }

    fn definition() -> FormDefinition {
        FormDefinition::new(
            "three-step",
            "Three step form",
            vec![("One", vec!["x"]), ("Two", vec!["y"]), ("Three", vec![])],
        )
    }

    fn rules() -> ValidationRuleSet<FormState> {
        ValidationRuleSet::new().rule("x", rules::required("x is required"))
    }

    async fn session() -> FormSession<FormState, String> {
        FormSession::<FormState, String>::builder(definition(), FormState::new())
            .rules(rules())
            .submission_endpoint(Arc::new(AcceptAll))
            .config(EngineConfig::manual_ticks())
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_build_requires_endpoint() {
        let result = FormSession::<FormState, String>::builder(definition(), FormState::new())
            .build()
            .await;
        assert!(matches!(result, Err(FormError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_build_requires_otp_provider_for_otp_forms() {
        let result = FormSession::<FormState, String>::builder(definition().with_otp(), FormState::new())
            .submission_endpoint(Arc::new(AcceptAll))
            .build()
            .await;
        match result {
            Err(FormError::Configuration(msg)) => assert!(msg.contains("OTP provider")),
            other => panic!("Expected Configuration error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_next_blocks_then_advances() {
        let session = session().await;

        match session.next().await.unwrap() {
            StepOutcome::Blocked(errors) => assert_eq!(errors.get("x"), Some("x is required")),
            other => panic!("Expected Blocked, got {:?}", other),
        }
        assert_eq!(session.current_step().await, 0);

        session.update(FormState::new().with("x", "1")).await.unwrap();
        assert!(session.errors().await.is_empty());
        assert_eq!(session.next().await.unwrap(), StepOutcome::Moved(1));
    }

    #[tokio::test]
    async fn test_update_does_not_validate_clean_step() {
        let session = session().await;
        session.update(FormState::new().with("y", "2")).await.unwrap();
        assert!(session.errors().await.is_empty());
    }

    #[tokio::test]
    async fn test_back_and_go_to_clear_errors() {
        let session = session().await;
        session.next().await.unwrap();
        assert!(!session.errors().await.is_empty());

        assert_eq!(session.go_to(10).await.unwrap(), 2);
        assert!(session.errors().await.is_empty());
        assert_eq!(session.back().await.unwrap(), 1);
        assert_eq!(session.back().await.unwrap(), 0);
        assert_eq!(session.back().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_request_otp_starts_cooldown() {
        let mut provider = MockOtpProvider::new();
        provider.expect_request_otp().times(1).returning(|phone| {
            Ok(OtpDispatch {
                target: phone.to_string(),
                message: "Code sent".to_string(),
            })
        });

        let session: FormSession<FormState, String> =
            FormSession::<FormState, String>::builder(definition().with_otp(), FormState::new())
                .submission_endpoint(Arc::new(AcceptAll))
                .otp_provider(Arc::new(provider))
                .config(EngineConfig::manual_ticks())
                .build()
                .await
                .unwrap();

        session.request_otp("+251911223344").await.unwrap();

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.status, SubmissionStatus::OtpVerifying);
        assert_eq!(snapshot.otp_cooldown, 30);
        assert!(!snapshot.can_resend);
        assert_eq!(snapshot.message.as_deref(), Some("Code sent"));

        assert_eq!(
            session.resend_otp("+251911223344").await.unwrap(),
            ResendOutcome::CoolingDown { remaining: 30 }
        );
    }

    #[tokio::test]
    async fn test_events_are_emitted_in_order() {
        let (handler, mut receiver) = ChannelEventHandler::channel();
        let session: FormSession<FormState, String> =
            FormSession::<FormState, String>::builder(definition(), FormState::new().with("x", "1"))
                .rules(rules())
                .submission_endpoint(Arc::new(AcceptAll))
                .event_handler(Arc::new(handler))
                .config(EngineConfig::manual_ticks())
                .build()
                .await
                .unwrap();

        session.next().await.unwrap();
        session.abandon().await;

        let types: Vec<&str> = std::iter::from_fn(|| receiver.try_recv().ok())
            .map(|event| event.event_type())
            .collect();
        assert_eq!(
            types,
            vec![
                "form.session_started",
                "form.step_changed",
                "form.session_abandoned"
            ]
        );
    }

    #[tokio::test]
    async fn test_dropped_event_receiver_does_not_fail_operations() {
        let (handler, receiver) = ChannelEventHandler::channel();
        drop(receiver);

        let session: FormSession<FormState, String> =
            FormSession::<FormState, String>::builder(definition(), FormState::new().with("x", "1"))
                .submission_endpoint(Arc::new(AcceptAll))
                .event_handler(Arc::new(handler))
                .config(EngineConfig::manual_ticks())
                .build()
                .await
                .unwrap();

        assert_eq!(session.next().await.unwrap(), StepOutcome::Moved(1));
    }

    #[tokio::test]
    async fn test_abandon_is_idempotent_and_final() {
        let session = session().await;
        session.abandon().await;
        session.abandon().await;

        assert_eq!(session.next().await, Err(FormError::SessionEnded));
        assert_eq!(session.tick().await, Err(FormError::SessionEnded));
        assert!(session.snapshot().await.ended);
    }
}
