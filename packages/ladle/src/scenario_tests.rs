//! End-to-end behavior of the bus over the in-memory backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::{Aggregate, EventLedger};
use crate::bus::MessageBus;
use crate::config::BusConfig;
use crate::core::Command;
use crate::error::BusError;
use crate::handler::{CommandHandler, EventHandler};
use crate::memory::InMemoryStore;
use crate::registry::{Registry, RegistryBuilder};
use crate::session::{Session, SessionFactory};
use crate::sink::FailureKind;
use crate::spawn::InlineSpawner;
use crate::testing::RecordingSink;
use crate::uow::{SessionUnitOfWork, SessionUnitOfWorkFactory, UnitOfWork, UnitOfWorkFactory};

type Uow = SessionUnitOfWork;

// =============================================================================
// Test Domain
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Widget {
    id: Uuid,
    name: String,
    indexed: bool,
    #[serde(skip)]
    ledger: EventLedger,
}

impl Widget {
    fn create(name: &str) -> Self {
        let mut widget = Self {
            id: Uuid::now_v7(),
            name: name.to_string(),
            indexed: false,
            ledger: EventLedger::new(),
        };
        widget.ledger.record(WidgetCreated {
            id: widget.id,
            name: widget.name.clone(),
        });
        widget
    }

    fn mark_indexed(&mut self) {
        self.indexed = true;
        self.ledger.record(WidgetIndexed { id: self.id });
    }

    fn ping(&mut self, n: usize) {
        self.ledger.record(Pinged { n });
    }
}

impl Aggregate for Widget {
    const KIND: &'static str = "widget";

    fn id(&self) -> Uuid {
        self.id
    }

    fn ledger_mut(&mut self) -> &mut EventLedger {
        &mut self.ledger
    }
}

#[derive(Debug, Clone)]
struct WidgetCreated {
    id: Uuid,
    name: String,
}

#[derive(Debug, Clone)]
struct WidgetIndexed {
    id: Uuid,
}

#[derive(Debug, Clone)]
struct Pinged {
    n: usize,
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("widget name is taken")]
struct NameTaken;

// =============================================================================
// Commands
// =============================================================================

struct CreateWidgets {
    names: Vec<&'static str>,
}

impl Command for CreateWidgets {
    type Output = Vec<Uuid>;
}

struct SlowCreateWidget {
    delay: Duration,
}

impl Command for SlowCreateWidget {
    type Output = Uuid;
}

struct RejectWidget;

impl Command for RejectWidget {
    type Output = ();
}

struct ExplodeWidget;

impl Command for ExplodeWidget {
    type Output = ();
}

struct Unregistered;

impl Command for Unregistered {
    type Output = ();
}

#[derive(Default, Clone)]
struct CreateWidgetsHandler {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl CommandHandler<CreateWidgets, Uow> for CreateWidgetsHandler {
    async fn handle(&self, command: CreateWidgets, uow: &mut Uow) -> Result<Vec<Uuid>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut ids = Vec::new();
        for name in command.names {
            let widget = Widget::create(name);
            ids.push(widget.id);
            uow.repository::<Widget>().add(widget).await?;
        }
        uow.commit().await?;
        Ok(ids)
    }
}

struct SlowCreateHandler;

#[async_trait]
impl CommandHandler<SlowCreateWidget, Uow> for SlowCreateHandler {
    async fn handle(&self, command: SlowCreateWidget, uow: &mut Uow) -> Result<Uuid> {
        let widget = Widget::create("slow");
        let id = widget.id;
        uow.repository::<Widget>().add(widget).await?;
        tokio::time::sleep(command.delay).await;
        uow.commit().await?;
        Ok(id)
    }
}

struct RejectHandler;

#[async_trait]
impl CommandHandler<RejectWidget, Uow> for RejectHandler {
    async fn handle(&self, _: RejectWidget, uow: &mut Uow) -> Result<()> {
        uow.repository::<Widget>().add(Widget::create("dup")).await?;
        Err(NameTaken.into())
    }
}

struct ExplodeHandler;

#[async_trait]
impl CommandHandler<ExplodeWidget, Uow> for ExplodeHandler {
    async fn handle(&self, _: ExplodeWidget, uow: &mut Uow) -> Result<()> {
        uow.repository::<Widget>().add(Widget::create("boom")).await?;
        panic!("kaboom");
    }
}

// =============================================================================
// Event Handlers
// =============================================================================

#[derive(Default, Clone)]
struct Spy {
    seen: Arc<Mutex<Vec<String>>>,
}

impl Spy {
    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventHandler<WidgetCreated, Uow> for Spy {
    async fn handle(&self, event: &WidgetCreated, _: &mut Uow) -> Result<()> {
        self.seen.lock().unwrap().push(event.name.clone());
        Ok(())
    }
}

#[async_trait]
impl EventHandler<WidgetIndexed, Uow> for Spy {
    async fn handle(&self, event: &WidgetIndexed, _: &mut Uow) -> Result<()> {
        self.seen.lock().unwrap().push(format!("indexed:{}", event.id));
        Ok(())
    }
}

struct Failing;

#[async_trait]
impl EventHandler<WidgetCreated, Uow> for Failing {
    async fn handle(&self, _: &WidgetCreated, _: &mut Uow) -> Result<()> {
        Err(anyhow!("search index offline"))
    }
}

struct Hanging;

#[async_trait]
impl EventHandler<WidgetCreated, Uow> for Hanging {
    async fn handle(&self, _: &WidgetCreated, _: &mut Uow) -> Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

struct Exploding;

#[async_trait]
impl EventHandler<WidgetCreated, Uow> for Exploding {
    async fn handle(&self, _: &WidgetCreated, _: &mut Uow) -> Result<()> {
        panic!("handler exploded");
    }
}

struct IndexWidget;

#[async_trait]
impl EventHandler<WidgetCreated, Uow> for IndexWidget {
    async fn handle(&self, event: &WidgetCreated, uow: &mut Uow) -> Result<()> {
        let mut widget = uow
            .repository::<Widget>()
            .get(event.id)
            .await?
            .ok_or_else(|| anyhow!("widget {} not found", event.id))?;
        widget.mark_indexed();
        uow.repository::<Widget>().add(widget).await?;
        uow.commit().await?;
        Ok(())
    }
}

/// Indexes and commits, then fails: the committed write stays, the events go.
struct IndexThenFail;

#[async_trait]
impl EventHandler<WidgetCreated, Uow> for IndexThenFail {
    async fn handle(&self, event: &WidgetCreated, uow: &mut Uow) -> Result<()> {
        IndexWidget.handle(event, uow).await?;
        Err(anyhow!("notification failed"))
    }
}

/// Renames without committing.
struct ForgetfulRenamer;

#[async_trait]
impl EventHandler<WidgetCreated, Uow> for ForgetfulRenamer {
    async fn handle(&self, event: &WidgetCreated, uow: &mut Uow) -> Result<()> {
        if let Some(mut widget) = uow.repository::<Widget>().get(event.id).await? {
            widget.name = "renamed".to_string();
            uow.repository::<Widget>().add(widget).await?;
        }
        Ok(())
    }
}

struct PingAgain;

#[async_trait]
impl EventHandler<Pinged, Uow> for PingAgain {
    async fn handle(&self, event: &Pinged, uow: &mut Uow) -> Result<()> {
        let mut widget = Widget::create("ping");
        widget.ledger.drain();
        widget.ping(event.n + 1);
        uow.repository::<Widget>().add(widget).await?;
        uow.commit().await?;
        Ok(())
    }
}

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    store: InMemoryStore,
    bus: MessageBus<SessionUnitOfWorkFactory>,
    sink: RecordingSink,
}

fn registry() -> RegistryBuilder<Uow> {
    Registry::builder()
        .command::<CreateWidgets, _>(CreateWidgetsHandler::default())
        .command::<SlowCreateWidget, _>(SlowCreateHandler)
        .command::<RejectWidget, _>(RejectHandler)
        .command::<ExplodeWidget, _>(ExplodeHandler)
}

fn harness(registry: RegistryBuilder<Uow>, config: BusConfig) -> Harness {
    let store = InMemoryStore::new();
    let sink = RecordingSink::new();
    let factory = SessionUnitOfWorkFactory::new(Arc::new(store.clone()));
    let bus = MessageBus::builder(factory, registry.build().unwrap())
        .with_config(config)
        .with_failure_sink(sink.clone())
        .build();
    Harness { store, bus, sink }
}

async fn load_widget(store: &InMemoryStore, id: Uuid) -> Option<Widget> {
    store
        .committed("widget", id)
        .map(|doc| serde_json::from_value(doc).unwrap())
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn create_command_runs_once_and_reaches_every_event_handler() {
    let spy = Spy::default();
    let handler = CreateWidgetsHandler::default();
    let calls = handler.calls.clone();
    let h = harness(
        Registry::builder()
            .command::<CreateWidgets, _>(handler)
            .event::<WidgetCreated, _>(spy.clone()),
        BusConfig::default(),
    );

    let ids = h
        .bus
        .handle(CreateWidgets { names: vec!["bolt"] })
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(spy.seen(), vec!["bolt"]);
    assert_eq!(load_widget(&h.store, ids[0]).await.unwrap().name, "bolt");
    assert!(h.sink.is_empty());
}

#[tokio::test]
async fn failing_event_handler_does_not_affect_siblings_or_caller() {
    let spy = Spy::default();
    let h = harness(
        registry()
            .event::<WidgetCreated, _>(Failing)
            .event::<WidgetCreated, _>(spy.clone()),
        BusConfig::default(),
    );

    let result = h.bus.handle(CreateWidgets { names: vec!["nut"] }).await;

    assert!(result.is_ok());
    assert_eq!(spy.seen(), vec!["nut"]);

    let failures = h.sink.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].handler.ends_with("Failing"));
    assert_eq!(failures[0].message_type.short_name(), "WidgetCreated");
    assert!(!failures[0].correlation_id.is_none());
    assert_eq!(
        failures[0].kind,
        FailureKind::Error("search index offline".to_string())
    );
}

#[tokio::test]
async fn command_timeout_rolls_back_uncommitted_writes() {
    let h = harness(
        registry(),
        BusConfig::default().with_command_timeout(Duration::from_millis(10)),
    );

    let err = h
        .bus
        .handle(SlowCreateWidget {
            delay: Duration::from_millis(100),
        })
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(matches!(
        err,
        BusError::CommandTimeout { timeout, .. } if timeout == Duration::from_millis(10)
    ));

    // The handler future was dropped; its commit never runs.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(h.store.committed_len("widget"), 0);
}

#[tokio::test]
async fn business_error_is_returned_unchanged_after_rollback() {
    let spy = Spy::default();
    let h = harness(
        registry().event::<WidgetCreated, _>(spy.clone()),
        BusConfig::default(),
    );

    let err = h.bus.handle(RejectWidget).await.unwrap_err();

    assert_eq!(err.handler_error::<NameTaken>(), Some(&NameTaken));
    assert!(!err.is_timeout());
    assert_eq!(h.store.committed_len("widget"), 0);
    // Events recorded before the failure are never dispatched.
    assert!(spy.seen().is_empty());
}

#[tokio::test]
async fn events_produced_by_event_handlers_are_drained() {
    let spy = Spy::default();
    let h = harness(
        registry()
            .event::<WidgetCreated, _>(IndexWidget)
            .event::<WidgetIndexed, _>(spy.clone()),
        BusConfig::default(),
    );

    let ids = h
        .bus
        .handle(CreateWidgets { names: vec!["gear"] })
        .await
        .unwrap();

    assert_eq!(spy.seen(), vec![format!("indexed:{}", ids[0])]);
    assert!(load_widget(&h.store, ids[0]).await.unwrap().indexed);
}

// =============================================================================
// Properties
// =============================================================================

#[tokio::test]
async fn unregistered_command_is_a_configuration_error() {
    let h = harness(registry(), BusConfig::default());

    let err = h.bus.handle(Unregistered).await.unwrap_err();

    assert!(matches!(err, BusError::UnregisteredCommand { type_name } if type_name.ends_with("Unregistered")));
}

#[tokio::test]
async fn panicking_command_handler_is_reported_and_rolled_back() {
    let h = harness(registry(), BusConfig::default());

    let err = h.bus.handle(ExplodeWidget).await.unwrap_err();

    assert!(matches!(err, BusError::HandlerPanicked { ref message, .. } if message == "kaboom"));
    assert_eq!(h.store.committed_len("widget"), 0);
}

#[tokio::test]
async fn hanging_event_handler_times_out_alone() {
    let spy = Spy::default();
    let h = harness(
        registry()
            .event::<WidgetCreated, _>(Hanging)
            .event::<WidgetCreated, _>(spy.clone()),
        BusConfig::default().with_event_timeout(Duration::from_millis(30)),
    );

    let ids = h
        .bus
        .handle(CreateWidgets { names: vec!["cog"] })
        .await
        .unwrap();

    assert_eq!(ids.len(), 1);
    assert_eq!(spy.seen(), vec!["cog"]);
    let failures = h.sink.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].kind,
        FailureKind::TimedOut(Duration::from_millis(30))
    );
}

#[tokio::test]
async fn panicking_event_handler_is_isolated() {
    let spy = Spy::default();
    let h = harness(
        registry()
            .event::<WidgetCreated, _>(Exploding)
            .event::<WidgetCreated, _>(spy.clone()),
        BusConfig::default(),
    );

    h.bus
        .handle(CreateWidgets { names: vec!["spring"] })
        .await
        .unwrap();

    assert_eq!(spy.seen(), vec!["spring"]);
    assert_eq!(
        h.sink.failures()[0].kind,
        FailureKind::Panicked("handler exploded".to_string())
    );
}

#[tokio::test]
async fn inline_spawner_gives_the_same_isolation() {
    let store = InMemoryStore::new();
    let sink = RecordingSink::new();
    let spy = Spy::default();
    let registry = registry()
        .event::<WidgetCreated, _>(Exploding)
        .event::<WidgetCreated, _>(Failing)
        .event::<WidgetCreated, _>(spy.clone())
        .build()
        .unwrap();
    let bus = MessageBus::builder(
        SessionUnitOfWorkFactory::new(Arc::new(store.clone())),
        registry,
    )
    .with_spawner(InlineSpawner)
    .with_failure_sink(sink.clone())
    .build();

    bus.handle(CreateWidgets { names: vec!["pin"] })
        .await
        .unwrap();

    assert_eq!(spy.seen(), vec!["pin"]);
    assert_eq!(sink.len(), 2);
    let ids: Vec<_> = sink.failures().iter().map(|f| f.correlation_id).collect();
    assert_eq!(ids[0], ids[1]);
    assert_eq!(store.committed_len("widget"), 1);
}

#[tokio::test]
async fn events_are_dispatched_in_recording_order() {
    let spy = Spy::default();
    let h = harness(
        registry().event::<WidgetCreated, _>(spy.clone()),
        BusConfig::default(),
    );

    h.bus
        .handle(CreateWidgets {
            names: vec!["a", "b", "c", "d"],
        })
        .await
        .unwrap();

    assert_eq!(spy.seen(), vec!["a", "b", "c", "d"]);
}

#[tokio::test]
async fn event_handler_writes_need_their_own_commit() {
    let h = harness(
        registry().event::<WidgetCreated, _>(ForgetfulRenamer),
        BusConfig::default(),
    );

    let ids = h
        .bus
        .handle(CreateWidgets { names: vec!["washer"] })
        .await
        .unwrap();

    assert_eq!(load_widget(&h.store, ids[0]).await.unwrap().name, "washer");
    assert!(h.sink.is_empty());
}

#[tokio::test]
async fn failed_event_handler_events_are_not_dispatched() {
    let spy = Spy::default();
    let h = harness(
        registry()
            .event::<WidgetCreated, _>(IndexThenFail)
            .event::<WidgetIndexed, _>(spy.clone()),
        BusConfig::default(),
    );

    let ids = h
        .bus
        .handle(CreateWidgets { names: vec!["rivet"] })
        .await
        .unwrap();

    // Committed before failing, so the write survives.
    assert!(load_widget(&h.store, ids[0]).await.unwrap().indexed);
    assert!(spy.seen().is_empty());
    assert_eq!(h.sink.len(), 1);
}

#[tokio::test]
async fn published_event_runs_its_handlers() {
    let spy = Spy::default();
    let h = harness(
        registry().event::<WidgetCreated, _>(spy.clone()),
        BusConfig::default(),
    );

    h.bus
        .publish(WidgetCreated {
            id: Uuid::now_v7(),
            name: "external".to_string(),
        })
        .await
        .unwrap();
    h.bus.publish(WidgetIndexed { id: Uuid::now_v7() }).await.unwrap();

    assert_eq!(spy.seen(), vec!["external"]);
}

#[tokio::test]
async fn cyclic_event_graph_hits_the_message_limit() {
    let h = harness(
        registry().event::<Pinged, _>(PingAgain),
        BusConfig::default().with_max_messages(20),
    );

    let err = h.bus.publish(Pinged { n: 0 }).await.unwrap_err();

    assert!(matches!(err, BusError::QueueOverflow { limit: 20 }));
    assert_eq!(h.store.committed_len("widget"), 20);
}

#[tokio::test]
async fn event_handlers_never_share_a_unit_of_work() {
    // Two handlers stage conflicting renames; neither commits, neither sees
    // the other's staged write.
    struct Witness(Arc<Mutex<Vec<String>>>);

    #[async_trait]
    impl EventHandler<WidgetCreated, Uow> for Witness {
        async fn handle(&self, event: &WidgetCreated, uow: &mut Uow) -> Result<()> {
            let mut widget = uow
                .repository::<Widget>()
                .get(event.id)
                .await?
                .ok_or_else(|| anyhow!("missing"))?;
            self.0.lock().unwrap().push(widget.name.clone());
            widget.name.push_str("-touched");
            uow.repository::<Widget>().add(widget).await?;
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(())
        }
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let h = harness(
        registry()
            .event::<WidgetCreated, _>(Witness(seen.clone()))
            .event::<WidgetCreated, _>(Witness(seen.clone())),
        BusConfig::default(),
    );

    h.bus
        .handle(CreateWidgets { names: vec!["axle"] })
        .await
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec!["axle", "axle"]);
}

#[tokio::test]
async fn failed_call_leaves_nothing_staged_for_the_next() {
    let h = harness(registry(), BusConfig::default());

    let _ = h.bus.handle(RejectWidget).await;
    let ids = h
        .bus
        .handle(CreateWidgets { names: vec!["bracket"] })
        .await
        .unwrap();

    assert_eq!(h.store.committed_len("widget"), 1);
    assert!(load_widget(&h.store, ids[0]).await.is_some());

    let mut uow = h.bus.unit_of_work_factory().begin().await.unwrap();
    assert_eq!(uow.collect_new_events().len(), 0);
}

// =============================================================================
// Write conflicts
// =============================================================================

/// Indexes a widget, but the first time around another writer commits
/// between its read and its commit.
struct RacedIndexer {
    store: InMemoryStore,
    attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl EventHandler<WidgetCreated, Uow> for RacedIndexer {
    async fn handle(&self, event: &WidgetCreated, uow: &mut Uow) -> Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        let mut widget = uow
            .repository::<Widget>()
            .get(event.id)
            .await?
            .ok_or_else(|| anyhow!("widget {} not found", event.id))?;

        if attempt == 0 {
            let mut other = self.store.open().await?;
            let mut renamed = widget.clone();
            renamed.name = format!("{}-v2", renamed.name);
            other.load(Widget::KIND, event.id).await?;
            other
                .stage(Widget::KIND, event.id, serde_json::to_value(&renamed)?)
                .await?;
            other.commit().await?;
        }

        widget.mark_indexed();
        uow.repository::<Widget>().add(widget).await?;
        uow.commit().await?;
        Ok(())
    }
}

fn raced_harness(config: BusConfig) -> (Harness, Arc<AtomicUsize>) {
    let store = InMemoryStore::new();
    let sink = RecordingSink::new();
    let attempts = Arc::new(AtomicUsize::new(0));
    let registry = registry()
        .event::<WidgetCreated, _>(RacedIndexer {
            store: store.clone(),
            attempts: attempts.clone(),
        })
        .build()
        .unwrap();
    let bus = MessageBus::builder(
        SessionUnitOfWorkFactory::new(Arc::new(store.clone())),
        registry,
    )
    .with_config(config)
    .with_failure_sink(sink.clone())
    .build();
    (Harness { store, bus, sink }, attempts)
}

#[tokio::test]
async fn conflicting_event_handler_is_rerun_on_fresh_state() {
    let (h, attempts) = raced_harness(BusConfig::default());

    let ids = h
        .bus
        .handle(CreateWidgets { names: vec!["hinge"] })
        .await
        .unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert!(h.sink.is_empty());
    // The rerun saw the other writer's rename and kept it.
    let widget = load_widget(&h.store, ids[0]).await.unwrap();
    assert_eq!(widget.name, "hinge-v2");
    assert!(widget.indexed);
    assert_eq!(h.store.committed_version("widget", ids[0]), Some(3));
}

#[tokio::test]
async fn conflict_without_retries_is_reported_not_overwritten() {
    let (h, attempts) = raced_harness(BusConfig::default().with_conflict_retries(0));

    let ids = h
        .bus
        .handle(CreateWidgets { names: vec!["latch"] })
        .await
        .unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    let widget = load_widget(&h.store, ids[0]).await.unwrap();
    assert_eq!(widget.name, "latch-v2");
    assert!(!widget.indexed);

    let failures = h.sink.failures();
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        &failures[0].kind,
        FailureKind::Error(message) if message.contains("modified concurrently")
    ));
}

// =============================================================================
// Scope lifecycle
// =============================================================================

mod scope_lifecycle {
    use super::*;
    use crate::core::EventEnvelope;
    use crate::error::StoreError;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    /// Unit of work that only records which lifecycle calls it received.
    struct RecordingUow {
        log: Log,
        pending: Vec<EventEnvelope>,
    }

    impl RecordingUow {
        fn push(&self, call: &'static str) {
            self.log.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl UnitOfWork for RecordingUow {
        async fn commit(&mut self) -> Result<(), StoreError> {
            self.push("commit");
            Ok(())
        }

        async fn rollback(&mut self) -> Result<(), StoreError> {
            self.push("rollback");
            Ok(())
        }

        async fn close(&mut self) -> Result<(), StoreError> {
            self.push("close");
            Ok(())
        }

        fn collect_new_events(&mut self) -> Vec<EventEnvelope> {
            std::mem::take(&mut self.pending)
        }
    }

    #[derive(Clone, Default)]
    struct RecordingFactory {
        log: Log,
    }

    impl RecordingFactory {
        fn calls(&self) -> Vec<&'static str> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UnitOfWorkFactory for RecordingFactory {
        type UnitOfWork = RecordingUow;

        async fn begin(&self) -> Result<RecordingUow, StoreError> {
            self.log.lock().unwrap().push("begin");
            Ok(RecordingUow {
                log: self.log.clone(),
                pending: Vec::new(),
            })
        }
    }

    #[derive(Debug, Clone, Copy)]
    enum Outcome {
        Succeed,
        Fail,
        Panic,
        Stall,
    }

    struct Run(Outcome);

    impl Command for Run {
        type Output = ();
    }

    #[derive(Debug, Clone)]
    struct Ran;

    struct RunHandler;

    #[async_trait]
    impl CommandHandler<Run, RecordingUow> for RunHandler {
        async fn handle(&self, command: Run, uow: &mut RecordingUow) -> Result<()> {
            match command.0 {
                Outcome::Succeed => {
                    uow.pending.push(EventEnvelope::new(Ran));
                    uow.commit().await?;
                    Ok(())
                }
                Outcome::Fail => Err(anyhow!("rejected")),
                Outcome::Panic => panic!("boom"),
                Outcome::Stall => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    uow.commit().await?;
                    Ok(())
                }
            }
        }
    }

    struct Stuck;

    #[async_trait]
    impl EventHandler<Ran, RecordingUow> for Stuck {
        async fn handle(&self, _: &Ran, _: &mut RecordingUow) -> Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn bus(
        factory: &RecordingFactory,
        registry: RegistryBuilder<RecordingUow>,
    ) -> MessageBus<RecordingFactory> {
        MessageBus::builder(factory.clone(), registry.build().unwrap())
            .with_config(
                BusConfig::default()
                    .with_command_timeout(Duration::from_millis(20))
                    .with_event_timeout(Duration::from_millis(20)),
            )
            .with_failure_sink(RecordingSink::new())
            .build()
    }

    async fn calls_after(outcome: Outcome) -> Vec<&'static str> {
        let factory = RecordingFactory::default();
        let bus = bus(&factory, Registry::builder().command::<Run, _>(RunHandler));
        let _ = bus.handle(Run(outcome)).await;
        factory.calls()
    }

    #[tokio::test]
    async fn success_rolls_back_then_closes() {
        assert_eq!(
            calls_after(Outcome::Succeed).await,
            vec!["begin", "commit", "rollback", "close"]
        );
    }

    #[tokio::test]
    async fn handler_error_rolls_back_then_closes() {
        assert_eq!(
            calls_after(Outcome::Fail).await,
            vec!["begin", "rollback", "close"]
        );
    }

    #[tokio::test]
    async fn panic_rolls_back_then_closes() {
        assert_eq!(
            calls_after(Outcome::Panic).await,
            vec!["begin", "rollback", "close"]
        );
    }

    #[tokio::test]
    async fn command_timeout_rolls_back_then_closes() {
        assert_eq!(
            calls_after(Outcome::Stall).await,
            vec!["begin", "rollback", "close"]
        );
    }

    #[tokio::test]
    async fn event_timeout_rolls_back_then_closes() {
        let factory = RecordingFactory::default();
        let bus = bus(
            &factory,
            Registry::builder()
                .command::<Run, _>(RunHandler)
                .event::<Ran, _>(Stuck),
        );

        bus.handle(Run(Outcome::Succeed)).await.unwrap();

        assert_eq!(
            factory.calls(),
            vec!["begin", "commit", "rollback", "close", "begin", "rollback", "close"]
        );
    }
}
