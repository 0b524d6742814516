use formflow_core::{
    EngineConfig, FormError, FormSession, FormState, ResendOutcome, SubmissionReceipt,
    SubmissionStatus, TransportError,
};
use formflow_test_utils::fixtures::{stop_payment_data, stop_payment_form, TEST_PHONE};
use formflow_test_utils::mocks::MockSelectionStore;
use formflow_test_utils::{RecordingEventHandler, ScriptedEndpoint, ScriptedOtpProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

struct Harness {
    session: FormSession<FormState>,
    provider: Arc<ScriptedOtpProvider>,
    handler: Arc<RecordingEventHandler>,
}

fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn harness(provider: ScriptedOtpProvider, config: EngineConfig) -> Harness {
    harness_with_endpoint(provider, ScriptedEndpoint::accepting(), config).await
}

async fn harness_with_endpoint(
    provider: ScriptedOtpProvider,
    endpoint: ScriptedEndpoint,
    config: EngineConfig,
) -> Harness {
    init_test_tracing();
    let (definition, rules) = stop_payment_form();
    let provider = Arc::new(provider);
    let handler = Arc::new(RecordingEventHandler::new());

    let session = FormSession::<FormState, SubmissionReceipt>::builder(definition, stop_payment_data())
        .rules(rules)
        .submission_endpoint(Arc::new(endpoint))
        .otp_provider(provider.clone())
        .event_handler(handler.clone())
        .config(config)
        .build()
        .await
        .unwrap();

    Harness {
        session,
        provider,
        handler,
    }
}

#[tokio::test]
async fn test_resend_is_noop_during_cooldown() {
    let h = harness(ScriptedOtpProvider::sending(), EngineConfig::manual_ticks()).await;

    let dispatch = h.session.request_otp(TEST_PHONE).await.unwrap();
    assert_eq!(dispatch.target, TEST_PHONE);

    for _ in 0..29 {
        h.session.tick().await.unwrap();
        let outcome = h.session.resend_otp(TEST_PHONE).await.unwrap();
        assert!(matches!(outcome, ResendOutcome::CoolingDown { .. }));
    }
    assert_eq!(h.provider.calls(), 1);

    // The 30th tick re-enables resend
    assert_eq!(h.session.tick().await.unwrap(), 0);
    assert!(h.session.snapshot().await.can_resend);
    assert_eq!(h.handler.count("form.otp_cooldown_elapsed"), 1);

    let outcome = h.session.resend_otp(TEST_PHONE).await.unwrap();
    assert!(matches!(outcome, ResendOutcome::Sent(_)));
    assert_eq!(h.provider.calls(), 2);
    assert_eq!(h.session.snapshot().await.otp_cooldown, 30);
}

#[tokio::test]
async fn test_request_during_cooldown_is_rejected() {
    let h = harness(ScriptedOtpProvider::sending(), EngineConfig::manual_ticks()).await;
    assert_ok!(h.session.request_otp(TEST_PHONE).await);

    assert_eq!(
        h.session.request_otp(TEST_PHONE).await,
        Err(FormError::CooldownActive { remaining: 30 })
    );
    assert_eq!(h.provider.calls(), 1);
}

#[tokio::test]
async fn test_failed_submission_does_not_reopen_resend() {
    let h = harness_with_endpoint(
        ScriptedOtpProvider::sending(),
        ScriptedEndpoint::rejecting("Insufficient funds"),
        EngineConfig::manual_ticks(),
    )
    .await;

    h.session.request_otp(TEST_PHONE).await.unwrap();
    assert_eq!(h.session.tick().await.unwrap(), 29);
    assert_err!(h.session.submit().await);

    let snapshot = h.session.snapshot().await;
    assert_eq!(snapshot.status, SubmissionStatus::Failed);
    assert_eq!(snapshot.otp_cooldown, 29);
    assert!(!snapshot.can_resend);

    assert_eq!(
        h.session.resend_otp(TEST_PHONE).await.unwrap(),
        ResendOutcome::CoolingDown { remaining: 29 }
    );
    assert_eq!(
        h.session.request_otp(TEST_PHONE).await,
        Err(FormError::CooldownActive { remaining: 29 })
    );
    assert_eq!(h.provider.calls(), 1);

    let snapshot = h.session.snapshot().await;
    assert_eq!(snapshot.status, SubmissionStatus::Failed);
    assert_eq!(snapshot.otp_cooldown, 29);
    assert_eq!(snapshot.message.as_deref(), Some("Insufficient funds"));

    for _ in 0..29 {
        h.session.tick().await.unwrap();
    }
    assert!(matches!(
        h.session.resend_otp(TEST_PHONE).await.unwrap(),
        ResendOutcome::Sent(_)
    ));
    assert_eq!(h.provider.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_otp_request_timeout_fails_and_allows_retry() {
    let h = harness(ScriptedOtpProvider::hanging(), EngineConfig::manual_ticks()).await;

    let error = h.session.request_otp(TEST_PHONE).await.unwrap_err();
    assert_eq!(
        error,
        FormError::Transport(TransportError::Timeout(Duration::from_secs(8)))
    );
    assert!(error.is_retryable());

    let snapshot = h.session.snapshot().await;
    assert_eq!(snapshot.status, SubmissionStatus::Failed);
    assert!(snapshot.message.unwrap_or_default().contains("timed out"));
    assert!(!snapshot.otp_sent);
    assert_eq!(snapshot.otp_cooldown, 0);
    assert_eq!(h.handler.count("form.otp_failed"), 1);

    assert_ok!(h.session.request_otp(TEST_PHONE).await);
    assert_eq!(h.session.status().await, SubmissionStatus::OtpVerifying);
    assert_eq!(h.provider.calls(), 2);
}

#[tokio::test]
async fn test_tick_saturates_at_zero() {
    let h = harness(ScriptedOtpProvider::sending(), EngineConfig::manual_ticks()).await;
    assert_eq!(h.session.tick().await.unwrap(), 0);
    assert_eq!(h.session.tick().await.unwrap(), 0);
    assert_eq!(h.handler.count("form.otp_cooldown_elapsed"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_background_ticker_drives_cooldown() {
    let h = harness(ScriptedOtpProvider::sending(), EngineConfig::default()).await;
    h.session.request_otp(TEST_PHONE).await.unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;
    let remaining = h.session.snapshot().await.otp_cooldown;
    assert!((20..=21).contains(&remaining), "remaining = {}", remaining);

    tokio::time::sleep(Duration::from_secs(21)).await;
    let snapshot = h.session.snapshot().await;
    assert_eq!(snapshot.otp_cooldown, 0);
    assert!(snapshot.can_resend);
    assert_eq!(h.handler.count("form.otp_cooldown_elapsed"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reset_stops_background_ticker() {
    let h = harness(ScriptedOtpProvider::sending(), EngineConfig::default()).await;
    h.session.request_otp(TEST_PHONE).await.unwrap();
    h.session.reset_otp().await.unwrap();

    tokio::time::sleep(Duration::from_secs(40)).await;
    assert_eq!(h.handler.count("form.otp_cooldown_elapsed"), 0);

    let snapshot = h.session.snapshot().await;
    assert!(!snapshot.otp_sent);
    assert_eq!(snapshot.status, SubmissionStatus::Idle);
}

#[tokio::test]
async fn test_failed_otp_request_surfaces_backend_message() {
    let h = harness(
        ScriptedOtpProvider::rejecting("Phone number is not registered"),
        EngineConfig::manual_ticks(),
    )
    .await;

    let error = assert_err!(h.session.request_otp(TEST_PHONE).await);
    assert_eq!(error.user_message(), "Phone number is not registered");

    let snapshot = h.session.snapshot().await;
    assert_eq!(snapshot.status, SubmissionStatus::Failed);
    assert_eq!(snapshot.message.as_deref(), Some("Phone number is not registered"));
    assert!(!snapshot.otp_sent);

    // Retry is allowed after a failure
    assert_ok!(h.session.request_otp(TEST_PHONE).await);
    assert_eq!(h.session.status().await, SubmissionStatus::OtpVerifying);
}

#[tokio::test]
async fn test_reset_mid_flight_discards_completion() {
    let (provider, gate) = ScriptedOtpProvider::sending().gated();
    let h = harness(provider, EngineConfig::manual_ticks()).await;

    let pending = {
        let session = h.session.clone();
        tokio::spawn(async move { session.request_otp(TEST_PHONE).await })
    };
    while h.provider.calls() == 0 {
        tokio::task::yield_now().await;
    }

    h.session.reset_otp().await.unwrap();
    gate.notify_one();

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(FormError::StaleCompletion(_))));

    let snapshot = h.session.snapshot().await;
    assert!(!snapshot.otp_sent);
    assert_eq!(snapshot.otp_cooldown, 0);
    assert_eq!(snapshot.status, SubmissionStatus::Idle);
    assert_eq!(h.handler.count("form.otp_sent"), 0);
}

#[tokio::test]
async fn test_concurrent_otp_request_rejected() {
    let (provider, gate) = ScriptedOtpProvider::sending().gated();
    let h = harness(provider, EngineConfig::manual_ticks()).await;

    let pending = {
        let session = h.session.clone();
        tokio::spawn(async move { session.request_otp(TEST_PHONE).await })
    };
    while h.provider.calls() == 0 {
        tokio::task::yield_now().await;
    }

    assert!(matches!(
        h.session.request_otp(TEST_PHONE).await,
        Err(FormError::AlreadyInFlight(_))
    ));

    gate.notify_one();
    assert_ok!(pending.await.unwrap());
    assert_eq!(h.provider.calls(), 1);
}

#[tokio::test]
async fn test_mode_change_resets_otp() {
    let h = harness(ScriptedOtpProvider::sending(), EngineConfig::manual_ticks()).await;
    h.session.request_otp(TEST_PHONE).await.unwrap();

    // Unrelated fields keep the code
    h.session
        .update(FormState::new().with("reason", "Lost cheque book"))
        .await
        .unwrap();
    assert!(h.session.snapshot().await.otp_sent);

    // Writing the same mode is not a change
    h.session.update(FormState::new().with("mode", "spo")).await.unwrap();
    assert!(h.session.snapshot().await.otp_sent);
    assert_eq!(h.handler.count("form.otp_reset"), 0);

    h.session.update(FormState::new().with("mode", "rspo")).await.unwrap();
    let snapshot = h.session.snapshot().await;
    assert!(!snapshot.otp_sent);
    assert_eq!(snapshot.otp_cooldown, 0);
    assert_eq!(snapshot.status, SubmissionStatus::Idle);
    assert_eq!(h.handler.count("form.otp_reset"), 1);
    assert_eq!(h.session.submit().await, Err(FormError::OtpRequired));

    // A new code can be requested straight away
    assert_ok!(h.session.request_otp(TEST_PHONE).await);
    assert_eq!(h.provider.calls(), 2);
}

#[tokio::test]
async fn test_account_change_resets_otp_and_persists() {
    let (definition, rules) = stop_payment_form();
    let mut store = MockSelectionStore::new();
    store.expect_get().returning(|_| Ok(None));
    store
        .expect_set()
        .withf(|key, value| key == "selectedAccount" && value == "2000555111")
        .times(1)
        .returning(|_, _| Ok(()));

    let handler = Arc::new(RecordingEventHandler::new());
    let session = FormSession::<FormState, SubmissionReceipt>::builder(definition, stop_payment_data())
        .rules(rules)
        .submission_endpoint(Arc::new(ScriptedEndpoint::accepting()))
        .otp_provider(Arc::new(ScriptedOtpProvider::sending()))
        .selection_store(Arc::new(store))
        .event_handler(handler.clone())
        .config(EngineConfig::manual_ticks())
        .build()
        .await
        .unwrap();

    session.request_otp(TEST_PHONE).await.unwrap();
    session.select_account("2000555111").await.unwrap();

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.context.selected_account.as_deref(), Some("2000555111"));
    assert!(!snapshot.otp_sent);
    assert_eq!(snapshot.status, SubmissionStatus::Idle);
    assert_eq!(handler.count("form.otp_reset"), 1);

    // OTP forms cannot be submitted until a new code is requested
    assert_eq!(session.submit().await, Err(FormError::OtpRequired));
}
