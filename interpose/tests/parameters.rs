use interpose::{
    Event, FailureKind, FnInterceptor, InterceptedProcessor, Parameters, RESOLVED_PARAMETERS_KEY, RegistryBuilder,
    shared,
    testing::{CountingResolver, Journal, RecordingProcessor, ResolutionToken},
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

mod common;
use common::{Around, Scripted, expect_err, expect_ok, location};

fn chain_with_resolver(
    processor: RecordingProcessor,
    resolver: &CountingResolver,
    interceptors: &[Scripted],
) -> InterceptedProcessor {
    let registry = interceptors
        .iter()
        .cloned()
        .fold(RegistryBuilder::new(), |builder, interceptor| builder.register(shared(interceptor)))
        .freeze();
    InterceptedProcessor::builder(location(), processor)
        .resolver(resolver.clone())
        .build(&registry)
}

#[tokio::test]
async fn test_parameters_resolve_and_dispose_once_on_every_path() {
    let scripts = [
        ("proceed", Scripted::new("I2", &Journal::new())),
        ("skip", Scripted::new("I2", &Journal::new()).around(Around::Skip)),
        ("fail", Scripted::new("I2", &Journal::new()).around(Around::Fail("denied".into()))),
        ("before throws", Scripted::new("I2", &Journal::new()).before_throws("not allowed")),
        ("after throws", Scripted::new("I2", &Journal::new()).after_throws("after failed")),
        (
            "error after proceed",
            Scripted::new("I2", &Journal::new()).around(Around::ErrorAfterProceed("late".into())),
        ),
    ];

    for (path, inner) in scripts {
        let journal = Journal::new();
        let resolver = CountingResolver::new();
        let chain = chain_with_resolver(
            RecordingProcessor::new(journal.clone()),
            &resolver,
            &[Scripted::new("I1", &journal), inner],
        );

        let _ = chain.invoke(Event::new("input")).await;

        assert_eq!(resolver.resolutions(), 1, "resolutions on {path}");
        assert_eq!(resolver.disposed(), [ResolutionToken(0)], "disposals on {path}");
    }
}

#[tokio::test]
async fn test_processor_failure_still_disposes() {
    let journal = Journal::new();
    let resolver = CountingResolver::new();
    let chain = chain_with_resolver(
        RecordingProcessor::new(journal.clone()).failing("boom"),
        &resolver,
        &[Scripted::new("I1", &journal)],
    );

    let failure = expect_err(chain.invoke(Event::new("input")).await);

    assert_eq!(failure.kind(), FailureKind::UnknownProcessing);
    assert_eq!(resolver.disposed(), [ResolutionToken(0)]);
}

#[tokio::test]
async fn test_each_invocation_gets_its_own_resolution() {
    let journal = Journal::new();
    let resolver = CountingResolver::new();
    let chain = chain_with_resolver(
        RecordingProcessor::new(journal.clone()),
        &resolver,
        &[Scripted::new("I1", &journal)],
    );

    for _ in 0..3 {
        expect_ok(chain.invoke(Event::new("input")).await);
    }

    assert_eq!(resolver.resolutions(), 3);
    assert_eq!(
        resolver.disposed(),
        [ResolutionToken(0), ResolutionToken(1), ResolutionToken(2)]
    );
}

#[tokio::test]
async fn test_resolution_failure_stops_before_any_layer() {
    let journal = Journal::new();
    let processor = RecordingProcessor::new(journal.clone());
    let resolver = CountingResolver::new().failing();
    let chain = chain_with_resolver(processor.clone(), &resolver, &[Scripted::new("I1", &journal)]);

    let failure = expect_err(chain.invoke(Event::new("input")).await);

    assert_eq!(failure.kind(), FailureKind::ParameterResolution);
    assert_eq!(failure.cause().to_string(), "parameter resolution failed");
    assert!(journal.entries().is_empty());
    assert_eq!(processor.calls(), 0);
    assert!(resolver.disposed().is_empty());

    let event = failure.event().expect("failure carries the event");
    assert!(!event.has_internal_parameters());
}

#[tokio::test]
async fn test_interceptors_see_the_resolved_parameters() {
    let journal = Journal::new();
    let seen: Arc<Mutex<Vec<(String, Option<Value>)>>> = Arc::default();
    let interceptor = {
        let seen = seen.clone();
        FnInterceptor::named("inspector").before(move |_, parameters: &Parameters, _| {
            let mut seen = seen.lock().unwrap();
            for parameter in parameters.iter() {
                let value = parameter.resolve_value().ok().cloned();
                seen.push((parameter.name().to_owned(), value));
            }
            Ok(())
        })
    };
    let processor = RecordingProcessor::new(journal);
    let resolver = CountingResolver::new().with_broken_parameter();
    let registry = RegistryBuilder::new().register(shared(interceptor)).freeze();
    let chain = InterceptedProcessor::builder(location(), processor.clone())
        .resolver(resolver.clone())
        .build(&registry);

    expect_ok(chain.invoke(Event::new("input")).await);

    // A parameter that fails to resolve does not block interception.
    let mut seen = seen.lock().unwrap().clone();
    seen.sort_by(|(left, _), (right, _)| left.cmp(right));
    assert_eq!(
        seen,
        [("broken".to_owned(), None), ("param".to_owned(), Some(json!("input")))]
    );
    assert_eq!(processor.calls(), 1);

    let received = processor.seen();
    let parameters = received[0]
        .internal_parameter_as::<Parameters>(RESOLVED_PARAMETERS_KEY)
        .expect("processor receives the resolved parameters");
    let broken = parameters.get("broken").expect("broken parameter is delivered");
    let error = broken.resolve_value().expect_err("broken parameter fails lazily");
    assert_eq!(error.name(), "broken");
    assert_eq!(broken.provided_value(), "#[broken]");
}

#[tokio::test]
async fn test_internal_parameters_never_leak_to_the_caller() {
    let journal = Journal::new();
    let resolver = CountingResolver::new();

    let succeeding = chain_with_resolver(
        RecordingProcessor::new(journal.clone()),
        &resolver,
        &[Scripted::new("I1", &journal)],
    );
    let event = expect_ok(succeeding.invoke(Event::new("input")).await);
    assert!(!event.has_internal_parameters());

    let failing = chain_with_resolver(
        RecordingProcessor::new(journal.clone()).failing("boom"),
        &resolver,
        &[Scripted::new("I1", &journal)],
    );
    let failure = expect_err(failing.invoke(Event::new("input")).await);
    let event = failure.event().expect("failure carries the event");
    assert!(!event.has_internal_parameters());
    assert!(event.internal_parameter(RESOLVED_PARAMETERS_KEY).is_none());
}
