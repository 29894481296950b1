use interpose::{
    Capabilities, ConfigError, ErrorType, Event, FnInterceptor, InterceptedProcessor, Interceptor, InterceptorManager,
    LoggingInterceptor, RegistryBuilder, shared,
    testing::{Journal, RecordingInterceptor, RecordingProcessor, RecordingSink},
};
use serde_json::json;

mod common;
use common::{Around, Scripted, expect_err, expect_ok, location, payload};

// ============================================================================
// Notifications
// ============================================================================

#[tokio::test]
async fn test_sink_sees_start_and_completion() {
    let journal = Journal::new();
    let sink = RecordingSink::new();
    let registry = RegistryBuilder::new()
        .register(shared(
            Scripted::new("I1", &journal).around(Around::FailWithType(ErrorType::new("APP", "DENIED"))),
        ))
        .freeze();
    let chain = InterceptedProcessor::builder(location(), RecordingProcessor::new(journal.clone()))
        .notification_sink(sink.clone())
        .build(&registry);

    let ok = Event::builder().correlation_id("ok-1").build();
    let denied = Event::builder().correlation_id("denied-1").build();
    let bare = InterceptedProcessor::builder(location(), RecordingProcessor::new(journal))
        .notification_sink(sink.clone())
        .build_bare();

    expect_ok(bare.invoke(ok).await);
    expect_err(chain.invoke(denied).await);

    assert_eq!(
        sink.lines(),
        ["started ok-1", "completed ok-1", "started denied-1", "completed denied-1 APP:DENIED"]
    );
}

// ============================================================================
// Closure Interceptors
// ============================================================================

#[tokio::test]
async fn test_closure_interceptor_gates_by_session() {
    let journal = Journal::new();
    let processor = RecordingProcessor::new(journal).returning("processed");
    let registry = RegistryBuilder::new()
        .register(|| {
            FnInterceptor::named("gate").around(|_, _, event, action| {
                if event.session().get("allowed") == Some(&json!(true)) {
                    action.proceed()
                } else {
                    action.fail_with_type(ErrorType::new("APP", "FORBIDDEN"))
                }
            })
        })
        .freeze();
    let chain = InterceptedProcessor::builder(location(), processor.clone()).build(&registry);

    let mut allowed = interpose::Session::new();
    allowed.set("allowed", true);
    let event = expect_ok(chain.invoke(Event::builder().message("in").session(allowed).build()).await);
    assert_eq!(payload(&event), json!("processed"));

    let failure = expect_err(chain.invoke(Event::new("in")).await);
    assert_eq!(failure.error_type(), &ErrorType::new("APP", "FORBIDDEN"));
    assert_eq!(processor.calls(), 1);
}

#[tokio::test]
async fn test_logging_interceptor_is_transparent() {
    let journal = Journal::new();
    let processor = RecordingProcessor::new(journal.clone()).returning("processed");
    let registry = RegistryBuilder::new()
        .register(|| LoggingInterceptor)
        .register(shared(RecordingInterceptor::new("I2", journal.clone())))
        .freeze();
    let chain = InterceptedProcessor::builder(location(), processor).build(&registry);

    assert_eq!(LoggingInterceptor.capabilities(), Capabilities::BEFORE | Capabilities::AFTER);
    let event = expect_ok(chain.invoke(Event::new("in")).await);

    assert_eq!(payload(&event), json!("processed"));
    assert_eq!(journal.entries(), ["I2.before", "I2.around", "P", "I2.after"]);
}

// ============================================================================
// Manager
// ============================================================================

#[test]
fn test_manager_rejects_configuration_after_freeze() {
    let journal = Journal::new();
    let manager = InterceptorManager::new();
    manager
        .register(shared(RecordingInterceptor::new("I1", journal.clone())))
        .expect("accepts registrations before freeze");
    assert_eq!(
        manager.set_group_order(["audit", "audit"]),
        Err(ConfigError::DuplicateGroup("audit".to_owned()))
    );
    assert!(!manager.is_frozen());
    assert!(manager.registry().is_none());

    let registry = manager.freeze();
    assert_eq!(registry.len(), 1);
    assert!(manager.is_frozen());

    let late = manager.register(shared(RecordingInterceptor::new("late", journal)));
    assert!(matches!(late, Err(ConfigError::Frozen(_))));
    assert!(matches!(manager.set_group_order(["audit"]), Err(ConfigError::Frozen(_))));
    assert_eq!(manager.freeze().len(), 1);
}

// ============================================================================
// Tower
// ============================================================================

#[cfg(feature = "tower")]
#[tokio::test]
async fn test_chain_as_tower_service() {
    use interpose::{
        BoxError,
        tower::{ProcessorService, ServiceProcessor},
    };
    use tower::ServiceExt;

    let journal = Journal::new();
    let service = tower::service_fn(|event: Event| async move { Ok::<_, BoxError>(event.with_message("from service")) });
    let registry = RegistryBuilder::new()
        .register(shared(RecordingInterceptor::new("I1", journal.clone())))
        .freeze();
    let chain = InterceptedProcessor::builder(location(), ServiceProcessor::new(service)).build(&registry);

    let event = ProcessorService::new(chain)
        .oneshot(Event::new("in"))
        .await
        .expect("service call succeeds");

    assert_eq!(payload(&event), json!("from service"));
    assert_eq!(journal.entries(), ["I1.before", "I1.around", "I1.after"]);
}

// ============================================================================
// Timeout
// ============================================================================

#[cfg(feature = "timeout")]
#[tokio::test]
async fn test_timeout_fails_slow_invocations() {
    use interpose::{BoxError, FailureKind, Phase, TimeoutError, TimeoutInterceptor};
    use std::time::Duration;

    let journal = Journal::new();
    let registry = RegistryBuilder::new()
        .register(shared(RecordingInterceptor::new("outer", journal.clone())))
        .register(|| TimeoutInterceptor::new(Duration::from_millis(10)))
        .register(shared(RecordingInterceptor::new("inner", journal.clone())))
        .freeze();

    let slow = InterceptedProcessor::builder(location(), |_event: Event| {
        futures::future::pending::<Result<Event, BoxError>>()
    })
    .build(&registry);
    let failure = expect_err(slow.invoke(Event::new("in")).await);
    assert_eq!(failure.kind(), FailureKind::Interception(Phase::Around));
    assert_eq!(
        failure.find_cause::<TimeoutError>().map(|timeout| timeout.0),
        Some(Duration::from_millis(10))
    );
    // The abandoned inner layer never reaches its after.
    assert_eq!(
        journal.entries(),
        ["outer.before", "outer.around", "inner.before", "inner.around", "outer.after!"]
    );

    journal.clear();
    let fast = InterceptedProcessor::builder(location(), RecordingProcessor::new(journal.clone())).build(&registry);
    expect_ok(fast.invoke(Event::new("in")).await);
    assert_eq!(journal.count("inner.after"), 1);
}

// ============================================================================
// Link-time Registration
// ============================================================================

#[cfg(feature = "inventory")]
fn collected_logging() -> std::sync::Arc<dyn interpose::InterceptorFactory> {
    std::sync::Arc::new(|| LoggingInterceptor)
}

#[cfg(feature = "inventory")]
interpose::inventory::submit! {
    interpose::FactoryRegistration::new(collected_logging)
}

#[cfg(feature = "inventory")]
#[tokio::test]
async fn test_collected_factories_join_the_registry() {
    let journal = Journal::new();
    let registry = RegistryBuilder::new()
        .register(shared(RecordingInterceptor::new("I1", journal.clone())))
        .register_collected()
        .freeze();
    let chain = InterceptedProcessor::builder(location(), RecordingProcessor::new(journal.clone())).build(&registry);

    assert_eq!(chain.interceptor_names().collect::<Vec<_>>(), ["I1", "logging"]);
    expect_ok(chain.invoke(Event::new("in")).await);
    assert_eq!(journal.entries(), ["I1.before", "I1.around", "P", "I1.after"]);
}
