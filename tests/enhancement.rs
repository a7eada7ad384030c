//! Enhancement merge scenarios against running machines.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use strand::builder::DefinitionBuilder;
use strand::context::{Context, Settings};
use strand::core::Definition;
use strand::effects::{ErrorKind, Machine, MachineError, MachineFactory};
use strand::logging::{BaseLevels, Level, MemorySink, Profile};

fn home() -> (Context, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let root = Context::root(
        "docs",
        Settings::new(BaseLevels::new(Level::Debug), Profile::Development, sink.clone()),
    );
    (root, sink)
}

fn review_flow() -> MachineFactory<()> {
    DefinitionBuilder::new()
        .state("draft", |s| s.default_state().to("submit", "review"))
        .state("review", |s| s.to("approve", "done"))
        .state("done", |s| s)
        .machine("document")
        .unwrap()
}

async fn started(factory: &MachineFactory<()>, home: &Context) -> Machine<()> {
    let machine = factory.instantiate_in((), home);
    machine.transition("default").await.unwrap();
    machine
}

#[tokio::test]
async fn enhancement_adds_states_and_transitions() {
    let (root, _sink) = home();
    let machine = review_flow().instantiate_in((), &root);
    let archiving: Definition<()> = DefinitionBuilder::new()
        .state("archived", |s| s)
        .state("review", |s| s.to("archive", "archived"))
        .build_fragment()
        .unwrap();
    machine
        .enhance(async move {
            tokio::task::yield_now().await;
            Ok(archiving)
        })
        .unwrap();

    machine.transition("default").await.unwrap();
    assert!(machine.is_enhanced());

    let err = machine.transition("archive").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    assert_eq!(machine.current_state(), "draft");

    machine.transition("submit").await.unwrap();
    assert_eq!(machine.valid_transitions(), vec!["approve", "archive"]);
    machine.transition("archive").await.unwrap();

    assert_eq!(machine.current_state(), "archived");
    assert!(machine.is_terminal());
}

#[tokio::test]
async fn redirecting_conflict_leaves_base_in_force() {
    let (root, sink) = home();
    let machine = review_flow().instantiate_in((), &root);
    let redirect: Definition<()> = DefinitionBuilder::new()
        .state("draft", |s| s.to("submit", "cancelled"))
        .state("cancelled", |s| s)
        .build_fragment()
        .unwrap();
    machine.enhance_with(redirect).unwrap();

    let err = machine.transition("default").await.unwrap_err();
    assert!(matches!(
        err,
        MachineError::MergeConflict { ref base, ref enhancement, .. }
            if base == "review" && enhancement == "cancelled"
    ));
    assert_eq!(sink.matching("enhancement of document failed").len(), 1);

    machine.transition("default").await.unwrap();
    machine.transition("submit").await.unwrap();
    assert_eq!(machine.current_state(), "review");
    assert!(!machine.definition().contains("cancelled"));
}

#[tokio::test]
async fn enhancement_can_only_be_triggered_once() {
    let (root, _sink) = home();
    let machine = started(&review_flow(), &root).await;

    machine.enhance_with(Definition::new()).unwrap();
    let err = machine.enhance_with(Definition::new()).unwrap_err();

    assert!(matches!(err, MachineError::EnhancementAlreadyTriggered { .. }));
}

#[tokio::test]
async fn composed_predicates_short_circuit() {
    let (root, _sink) = home();
    let open = Arc::new(AtomicUsize::new(0));
    let consulted = Arc::new(AtomicUsize::new(0));

    let gate = Arc::clone(&open);
    let factory = DefinitionBuilder::<()>::new()
        .state("draft", |s| {
            s.default_state().transition("submit", move |t| {
                t.to("review")
                    .when(move |_| gate.load(Ordering::SeqCst) > 0)
            })
        })
        .state("review", |s| s)
        .machine("document")
        .unwrap();
    let machine = started(&factory, &root).await;

    let counter = Arc::clone(&consulted);
    let stricter: Definition<()> = DefinitionBuilder::new()
        .state("draft", move |s| {
            s.transition("submit", move |t| {
                t.to("review").when(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    true
                })
            })
        })
        .build_fragment()
        .unwrap();
    machine.enhance_with(stricter).unwrap();

    assert!(!machine.optional_transition("submit").await.unwrap());
    assert_eq!(consulted.load(Ordering::SeqCst), 0);

    open.store(1, Ordering::SeqCst);
    assert!(machine.optional_transition("submit").await.unwrap());
    assert_eq!(consulted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failing_base_effect_does_not_block_enhancement_effect() {
    let (root, sink) = home();
    let ran = Arc::new(AtomicUsize::new(0));

    let factory = DefinitionBuilder::<()>::new()
        .state("draft", |s| {
            s.default_state().transition("submit", |t| {
                t.to("review")
                    .effect_sync(|_| Err(anyhow::anyhow!("mailer offline")))
            })
        })
        .state("review", |s| s)
        .machine("document")
        .unwrap();
    let machine = started(&factory, &root).await;

    let counter = Arc::clone(&ran);
    let notify: Definition<()> = DefinitionBuilder::new()
        .state("draft", move |s| {
            s.transition("submit", move |t| {
                t.to("review").effect_sync(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })
        })
        .build_fragment()
        .unwrap();
    machine.enhance_with(notify).unwrap();

    machine.transition("submit").await.unwrap();

    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert_eq!(machine.current_state(), "review");
    assert_eq!(sink.matching("base effect for submit failed").len(), 1);
}

#[tokio::test]
async fn base_entry_hook_runs_first_and_can_preempt() {
    let (root, _sink) = home();
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::default();

    let base_log = Arc::clone(&order);
    let factory = DefinitionBuilder::<()>::new()
        .state("draft", |s| s.default_state().to("submit", "review").to("escalate", "urgent"))
        .state("review", move |s| {
            let log = Arc::clone(&base_log);
            s.on_entry_sync(move |_| {
                log.lock().push("base review");
                Ok(())
            })
        })
        .state("urgent", |s| {
            s.on_entry(|ctx| async move {
                ctx.machine()
                    .transition("triage")
                    .await
                    .map_err(anyhow::Error::from)
            })
            .to("triage", "review")
        })
        .machine("document")
        .unwrap();

    let enh_log = Arc::clone(&order);
    let urgent_log = Arc::clone(&order);
    let extra: Definition<()> = DefinitionBuilder::new()
        .state("review", move |s| {
            s.on_entry_sync(move |_| {
                enh_log.lock().push("enhancement review");
                Ok(())
            })
        })
        .state("urgent", move |s| {
            s.on_entry_sync(move |_| {
                urgent_log.lock().push("enhancement urgent");
                Ok(())
            })
        })
        .build_fragment()
        .unwrap();

    let first = started(&factory, &root).await;
    first.enhance_with(extra.clone()).unwrap();
    first.transition("submit").await.unwrap();
    assert_eq!(*order.lock(), vec!["base review", "enhancement review"]);

    order.lock().clear();
    let second = started(&factory, &root).await;
    second.enhance_with(extra).unwrap();
    second.transition("escalate").await.unwrap();

    assert_eq!(second.current_state(), "review");
    assert_eq!(*order.lock(), vec!["base review", "enhancement review"]);
}
