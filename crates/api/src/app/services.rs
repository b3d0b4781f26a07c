use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};

use stayforge_core::{AggregateId, DomainError, PropertyId};
use stayforge_dining::{DiningOrderId, DiningOrderStatus};
use stayforge_events::{EventBus, EventEnvelope, InMemoryEventBus};
use stayforge_frontdesk::{
    AvailabilityChecker, BookingReceipt, ConfirmationNotice, FrontdeskError, GuestDirectory,
    LoggingNotifier, Notifier, NotifyError, OpenOrderRequest, OrderDesk, OrderReceipt,
    RegisterRoomRequest, ReservationDesk, ReserveStayRequest, RoomSummary,
};
use stayforge_guests::{ContactDetails, GuestId};
use stayforge_infra::{
    command_dispatcher::{CommandDispatcher, DispatchError},
    event_store::{
        EventFilter, EventQuery, EventQueryResult, EventStore, EventStoreError, InMemoryEventStore,
        Pagination, PostgresEventStore, StoredEvent,
    },
    jobs::{InMemoryJobStore, Job, JobExecutor, JobExecutorConfig, JobExecutorHandle, JobResult, JobStore},
    projections::{
        BookingReadModel, BookingsProjection, DiningOrderReadModel, DiningOrdersProjection,
        GuestReadModel, GuestsProjection, MenuItemReadModel, MenuItemsProjection,
        OccupancyReadModel, PaymentReadModel, PaymentsProjection, RoomOccupancyProjection,
        RoomReadModel, RoomsProjection,
    },
    read_model::{InMemoryPropertyStore, PostgresBookingStore, PropertyStore},
    saga::{CommandExecutor, PaymentConfirmationSaga, SagaRunner},
};
use stayforge_lodging::{BookingId, BookingStatus, RoomId, StayPeriod};
use stayforge_menu::MenuItemId;
use stayforge_payments::PaymentId;

/// Realtime message broadcast to per-property SSE subscribers.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RealtimeMessage {
    pub property_id: PropertyId,
    pub topic: String,
    pub payload: serde_json::Value,
}

type JsonBus = InMemoryEventBus<EventEnvelope<serde_json::Value>>;
type MemStore<K, V> = Arc<InMemoryPropertyStore<K, V>>;

type InMemoryDispatcher = CommandDispatcher<Arc<InMemoryEventStore>, Arc<JsonBus>>;
type PersistentDispatcher = CommandDispatcher<Arc<PostgresEventStore>, Arc<JsonBus>>;

type RoomCatalog = Arc<RoomsProjection<MemStore<RoomId, RoomReadModel>>>;
type RoomOccupancy = Arc<RoomOccupancyProjection<MemStore<RoomId, OccupancyReadModel>>>;
type GuestIndex = Arc<GuestsProjection<MemStore<GuestId, GuestReadModel>>>;
type MenuCatalog = Arc<MenuItemsProjection<MemStore<MenuItemId, MenuItemReadModel>>>;
type DiningIndex = Arc<DiningOrdersProjection<MemStore<DiningOrderId, DiningOrderReadModel>>>;
type PaymentIndex = Arc<PaymentsProjection<MemStore<PaymentId, PaymentReadModel>>>;

type Availability =
    AvailabilityChecker<MemStore<RoomId, RoomReadModel>, MemStore<RoomId, OccupancyReadModel>>;

type InMemoryReservationDesk = ReservationDesk<
    Arc<InMemoryEventStore>,
    Arc<JsonBus>,
    MemStore<RoomId, RoomReadModel>,
    MemStore<BookingId, BookingReadModel>,
    MemStore<GuestId, GuestReadModel>,
>;
type InMemoryOrderDesk =
    OrderDesk<Arc<InMemoryEventStore>, Arc<JsonBus>, MemStore<MenuItemId, MenuItemReadModel>>;
type InMemoryGuestDirectory =
    GuestDirectory<Arc<InMemoryEventStore>, Arc<JsonBus>, MemStore<GuestId, GuestReadModel>>;

type PersistentReservationDesk = ReservationDesk<
    Arc<PostgresEventStore>,
    Arc<JsonBus>,
    MemStore<RoomId, RoomReadModel>,
    Arc<PostgresBookingStore>,
    MemStore<GuestId, GuestReadModel>,
>;
type PersistentOrderDesk =
    OrderDesk<Arc<PostgresEventStore>, Arc<JsonBus>, MemStore<MenuItemId, MenuItemReadModel>>;
type PersistentGuestDirectory =
    GuestDirectory<Arc<PostgresEventStore>, Arc<JsonBus>, MemStore<GuestId, GuestReadModel>>;

/// Executes saga-issued commands through the reservation desk.
///
/// The payment confirmation saga names a booking; the desk resolves it to the
/// owning room and drives the regular transition path, so the saga gets the
/// same overlap re-validation and per-room serialization as a staff request.
struct DeskCommandExecutor<S, B, RS, BS, GS>
where
    S: EventStore,
    B: EventBus<EventEnvelope<serde_json::Value>>,
    RS: PropertyStore<RoomId, RoomReadModel>,
    BS: PropertyStore<BookingId, BookingReadModel>,
    GS: PropertyStore<GuestId, GuestReadModel>,
{
    desk: Arc<ReservationDesk<S, B, RS, BS, GS>>,
    bookings: Arc<BookingsProjection<BS>>,
}

impl<S, B, RS, BS, GS> CommandExecutor for DeskCommandExecutor<S, B, RS, BS, GS>
where
    S: EventStore + Send + Sync,
    B: EventBus<EventEnvelope<serde_json::Value>> + Send + Sync,
    RS: PropertyStore<RoomId, RoomReadModel> + Send + Sync,
    BS: PropertyStore<BookingId, BookingReadModel> + Send + Sync,
    GS: PropertyStore<GuestId, GuestReadModel> + Send + Sync,
{
    type Error = FrontdeskError;

    fn execute(
        &self,
        property_id: PropertyId,
        aggregate_type: &str,
        command_type: &str,
        payload: &serde_json::Value,
    ) -> Result<(), Self::Error> {
        match (aggregate_type, command_type) {
            ("lodging.room", "TransitionStay") => {
                let booking_id = payload
                    .get("booking_id")
                    .and_then(|v| serde_json::from_value::<AggregateId>(v.clone()).ok())
                    .map(BookingId::new)
                    .ok_or_else(|| {
                        FrontdeskError::Validation("saga command lacks booking_id".to_string())
                    })?;
                let target = payload
                    .get("to_status")
                    .and_then(|v| serde_json::from_value::<BookingStatus>(v.clone()).ok())
                    .ok_or_else(|| {
                        FrontdeskError::Validation("saga command lacks to_status".to_string())
                    })?;

                // A walk-in is already checked in when its payment settles,
                // and a completed stay is past confirming. Both satisfy the
                // saga's intent; only a cancelled booking is a real failure.
                if let Some(row) = self.bookings.get(property_id, &booking_id) {
                    let already_there = row.status == target
                        || (target == BookingStatus::Confirmed
                            && matches!(
                                row.status,
                                BookingStatus::CheckedIn | BookingStatus::Completed
                            ));
                    if already_there {
                        return Ok(());
                    }
                }

                self.desk.transition(property_id, booking_id, target).map(|_| ())
            }
            _ => Err(FrontdeskError::Validation(format!(
                "unsupported saga command {aggregate_type}/{command_type}"
            ))),
        }
    }
}

#[derive(Clone)]
pub enum AppServices {
    InMemory {
        dispatcher: Arc<InMemoryDispatcher>,
        event_store: Arc<InMemoryEventStore>,
        event_bus: Arc<JsonBus>,
        rooms_projection: RoomCatalog,
        occupancy_projection: RoomOccupancy,
        bookings_projection: Arc<BookingsProjection<MemStore<BookingId, BookingReadModel>>>,
        guests_projection: GuestIndex,
        menu_projection: MenuCatalog,
        dining_projection: DiningIndex,
        payments_projection: PaymentIndex,
        availability: Arc<Availability>,
        reservation_desk: Arc<InMemoryReservationDesk>,
        order_desk: Arc<InMemoryOrderDesk>,
        guest_directory: Arc<InMemoryGuestDirectory>,
        job_store: Arc<InMemoryJobStore>,
        jobs_executor: Arc<JobExecutorHandle>,
        realtime_tx: broadcast::Sender<RealtimeMessage>,
    },
    Persistent {
        dispatcher: Arc<PersistentDispatcher>,
        event_store: Arc<PostgresEventStore>,
        event_bus: Arc<JsonBus>,
        rooms_projection: RoomCatalog,
        occupancy_projection: RoomOccupancy,
        bookings_projection: Arc<BookingsProjection<Arc<PostgresBookingStore>>>,
        guests_projection: GuestIndex,
        menu_projection: MenuCatalog,
        dining_projection: DiningIndex,
        payments_projection: PaymentIndex,
        availability: Arc<Availability>,
        reservation_desk: Arc<PersistentReservationDesk>,
        order_desk: Arc<PersistentOrderDesk>,
        guest_directory: Arc<PersistentGuestDirectory>,
        job_store: Arc<InMemoryJobStore>,
        jobs_executor: Arc<JobExecutorHandle>,
        realtime_tx: broadcast::Sender<RealtimeMessage>,
    },
}

pub async fn build_services() -> AppServices {
    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    if use_persistent {
        return build_persistent_services().await;
    }

    build_in_memory_services()
}

/// Spawn the background notice worker: polls the job queue and hands
/// `notify.*` jobs to the delivery channel. Delivery failures retry or
/// dead-letter per the job's policy; the bookings that queued them are long
/// since committed.
fn spawn_notice_worker(
    job_store: Arc<InMemoryJobStore>,
    notifier: Arc<dyn Notifier>,
) -> JobExecutorHandle {
    let mut executor = JobExecutor::new(job_store);
    executor.register_handler("notify.*", move |job: &Job| {
        let notice: ConfirmationNotice = match serde_json::from_value(job.payload.clone()) {
            Ok(n) => n,
            Err(e) => return JobResult::Failure(format!("malformed notice payload: {e}")),
        };
        match notifier.deliver(&notice) {
            Ok(()) => JobResult::Success,
            Err(NotifyError::Unavailable(msg)) => {
                tracing::warn!(booking_id = %notice.booking_id.0, error = %msg, "notice channel unavailable");
                JobResult::RetryAfter(Duration::from_secs(1))
            }
            Err(NotifyError::Rejected(msg)) => JobResult::Failure(msg),
        }
    });
    executor.spawn(JobExecutorConfig::default().with_name("guest-notices"))
}

fn build_in_memory_services() -> AppServices {
    // In-memory infra wiring (dev/test): store + bus + projections.
    let store = Arc::new(InMemoryEventStore::new());
    let bus: Arc<JsonBus> = Arc::new(InMemoryEventBus::new());
    let dispatcher: Arc<InMemoryDispatcher> =
        Arc::new(CommandDispatcher::new(store.clone(), bus.clone()));

    let rooms_store: MemStore<RoomId, RoomReadModel> = Arc::new(InMemoryPropertyStore::new());
    let rooms_projection: RoomCatalog = Arc::new(RoomsProjection::new(rooms_store));

    let occupancy_store: MemStore<RoomId, OccupancyReadModel> =
        Arc::new(InMemoryPropertyStore::new());
    let occupancy_projection: RoomOccupancy =
        Arc::new(RoomOccupancyProjection::new(occupancy_store));

    let bookings_store: MemStore<BookingId, BookingReadModel> =
        Arc::new(InMemoryPropertyStore::new());
    let bookings_projection = Arc::new(BookingsProjection::new(bookings_store));

    let guests_store: MemStore<GuestId, GuestReadModel> = Arc::new(InMemoryPropertyStore::new());
    let guests_projection: GuestIndex = Arc::new(GuestsProjection::new(guests_store));

    let menu_store: MemStore<MenuItemId, MenuItemReadModel> = Arc::new(InMemoryPropertyStore::new());
    let menu_projection: MenuCatalog = Arc::new(MenuItemsProjection::new(menu_store));

    let dining_store: MemStore<DiningOrderId, DiningOrderReadModel> =
        Arc::new(InMemoryPropertyStore::new());
    let dining_projection: DiningIndex = Arc::new(DiningOrdersProjection::new(dining_store));

    let payments_store: MemStore<PaymentId, PaymentReadModel> =
        Arc::new(InMemoryPropertyStore::new());
    let payments_projection: PaymentIndex = Arc::new(PaymentsProjection::new(payments_store));

    let availability = Arc::new(AvailabilityChecker::new(
        rooms_projection.clone(),
        occupancy_projection.clone(),
    ));

    let job_store = Arc::new(InMemoryJobStore::new());
    let guest_directory = Arc::new(GuestDirectory::new(
        dispatcher.clone(),
        guests_projection.clone(),
    ));
    let reservation_desk = Arc::new(ReservationDesk::new(
        dispatcher.clone(),
        rooms_projection.clone(),
        bookings_projection.clone(),
        guest_directory.clone(),
        job_store.clone() as Arc<dyn JobStore>,
    ));
    let order_desk = Arc::new(OrderDesk::new(dispatcher.clone(), menu_projection.clone()));

    let notifier: Arc<dyn Notifier> = Arc::new(LoggingNotifier);
    let jobs_executor = Arc::new(spawn_notice_worker(job_store.clone(), notifier));

    // Realtime channel (SSE): lossy broadcast, property-filtered in handlers.
    let (realtime_tx, _realtime_rx) = broadcast::channel::<RealtimeMessage>(256);

    // Background subscriber: bus -> projections -> saga.
    {
        let sub = bus.subscribe();
        let rooms_projection = rooms_projection.clone();
        let occupancy_projection = occupancy_projection.clone();
        let bookings_projection = bookings_projection.clone();
        let guests_projection = guests_projection.clone();
        let menu_projection = menu_projection.clone();
        let dining_projection = dining_projection.clone();
        let payments_projection = payments_projection.clone();
        let realtime_tx = realtime_tx.clone();
        let saga_runner = SagaRunner::<PaymentConfirmationSaga, _, _>::new(
            store.clone(),
            DeskCommandExecutor {
                desk: reservation_desk.clone(),
                bookings: bookings_projection.clone(),
            },
        );
        tokio::task::spawn_blocking(move || loop {
            match sub.recv() {
                Ok(env) => {
                    let at = env.aggregate_type().to_string();

                    let apply_ok = match at.as_str() {
                        "lodging.room" => {
                            if let Err(e) = rooms_projection.apply_envelope(&env) {
                                Err(e.to_string())
                            } else if let Err(e) = occupancy_projection.apply_envelope(&env) {
                                Err(e.to_string())
                            } else if let Err(e) = bookings_projection.apply_envelope(&env) {
                                Err(e.to_string())
                            } else {
                                Ok(())
                            }
                        }
                        "guests.guest" => {
                            guests_projection.apply_envelope(&env).map_err(|e| e.to_string())
                        }
                        "menu.item" => {
                            menu_projection.apply_envelope(&env).map_err(|e| e.to_string())
                        }
                        "dining.order" => {
                            dining_projection.apply_envelope(&env).map_err(|e| e.to_string())
                        }
                        "payments.payment" => {
                            payments_projection.apply_envelope(&env).map_err(|e| e.to_string())
                        }
                        _ => Ok(()),
                    };

                    if let Err(e) = apply_ok {
                        tracing::warn!("projection apply failed: {e}");
                        continue;
                    }

                    // Broadcast projection update (lossy; no backpressure on core).
                    let _ = realtime_tx.send(RealtimeMessage {
                        property_id: env.property_id(),
                        topic: format!("{at}.projection_updated"),
                        payload: serde_json::json!({
                            "kind": "projection_update",
                            "aggregate_type": at,
                            "aggregate_id": env.aggregate_id().to_string(),
                            "sequence_number": env.sequence_number(),
                        }),
                    });

                    // Payment settlement drives booking confirmation.
                    if let Err(e) = saga_runner.handle_envelope(&env) {
                        tracing::warn!("payment confirmation saga failed: {e}");
                    }
                }
                Err(_) => break,
            }
        });
    }

    AppServices::InMemory {
        dispatcher,
        event_store: store,
        event_bus: bus,
        rooms_projection,
        occupancy_projection,
        bookings_projection,
        guests_projection,
        menu_projection,
        dining_projection,
        payments_projection,
        availability,
        reservation_desk,
        order_desk,
        guest_directory,
        job_store,
        jobs_executor,
        realtime_tx,
    }
}

async fn build_persistent_services() -> AppServices {
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set when USE_PERSISTENT_STORES=true");

    let pool = sqlx::PgPool::connect(&database_url)
        .await
        .expect("failed to connect to Postgres");

    let store = Arc::new(PostgresEventStore::new(pool.clone()));
    store.ensure_schema().await.expect("failed to ensure event store schema");

    let bus: Arc<JsonBus> = Arc::new(InMemoryEventBus::new());
    let dispatcher: Arc<PersistentDispatcher> =
        Arc::new(CommandDispatcher::new(store.clone(), bus.clone()));

    let rooms_store: MemStore<RoomId, RoomReadModel> = Arc::new(InMemoryPropertyStore::new());
    let rooms_projection: RoomCatalog = Arc::new(RoomsProjection::new(rooms_store));

    let occupancy_store: MemStore<RoomId, OccupancyReadModel> =
        Arc::new(InMemoryPropertyStore::new());
    let occupancy_projection: RoomOccupancy =
        Arc::new(RoomOccupancyProjection::new(occupancy_store));

    let bookings_store = Arc::new(PostgresBookingStore::new(pool));
    bookings_store
        .ensure_schema()
        .await
        .expect("failed to ensure booking read model schema");
    let bookings_projection = Arc::new(BookingsProjection::new(bookings_store));

    // Remaining read models stay in-memory; they rebuild from the durable
    // event log on restart.
    let guests_store: MemStore<GuestId, GuestReadModel> = Arc::new(InMemoryPropertyStore::new());
    let guests_projection: GuestIndex = Arc::new(GuestsProjection::new(guests_store));

    let menu_store: MemStore<MenuItemId, MenuItemReadModel> = Arc::new(InMemoryPropertyStore::new());
    let menu_projection: MenuCatalog = Arc::new(MenuItemsProjection::new(menu_store));

    let dining_store: MemStore<DiningOrderId, DiningOrderReadModel> =
        Arc::new(InMemoryPropertyStore::new());
    let dining_projection: DiningIndex = Arc::new(DiningOrdersProjection::new(dining_store));

    let payments_store: MemStore<PaymentId, PaymentReadModel> =
        Arc::new(InMemoryPropertyStore::new());
    let payments_projection: PaymentIndex = Arc::new(PaymentsProjection::new(payments_store));

    let availability = Arc::new(AvailabilityChecker::new(
        rooms_projection.clone(),
        occupancy_projection.clone(),
    ));

    let job_store = Arc::new(InMemoryJobStore::new());
    let guest_directory = Arc::new(GuestDirectory::new(
        dispatcher.clone(),
        guests_projection.clone(),
    ));
    let reservation_desk = Arc::new(ReservationDesk::new(
        dispatcher.clone(),
        rooms_projection.clone(),
        bookings_projection.clone(),
        guest_directory.clone(),
        job_store.clone() as Arc<dyn JobStore>,
    ));
    let order_desk = Arc::new(OrderDesk::new(dispatcher.clone(), menu_projection.clone()));

    let notifier: Arc<dyn Notifier> = Arc::new(LoggingNotifier);
    let jobs_executor = Arc::new(spawn_notice_worker(job_store.clone(), notifier));

    let (realtime_tx, _realtime_rx) = broadcast::channel::<RealtimeMessage>(256);

    {
        let sub = bus.subscribe();
        let rooms_projection = rooms_projection.clone();
        let occupancy_projection = occupancy_projection.clone();
        let bookings_projection = bookings_projection.clone();
        let guests_projection = guests_projection.clone();
        let menu_projection = menu_projection.clone();
        let dining_projection = dining_projection.clone();
        let payments_projection = payments_projection.clone();
        let realtime_tx = realtime_tx.clone();
        let saga_runner = SagaRunner::<PaymentConfirmationSaga, _, _>::new(
            store.clone(),
            DeskCommandExecutor {
                desk: reservation_desk.clone(),
                bookings: bookings_projection.clone(),
            },
        );
        tokio::task::spawn_blocking(move || loop {
            match sub.recv() {
                Ok(env) => {
                    let at = env.aggregate_type().to_string();

                    let apply_ok = match at.as_str() {
                        "lodging.room" => {
                            if let Err(e) = rooms_projection.apply_envelope(&env) {
                                Err(e.to_string())
                            } else if let Err(e) = occupancy_projection.apply_envelope(&env) {
                                Err(e.to_string())
                            } else if let Err(e) = bookings_projection.apply_envelope(&env) {
                                Err(e.to_string())
                            } else {
                                Ok(())
                            }
                        }
                        "guests.guest" => {
                            guests_projection.apply_envelope(&env).map_err(|e| e.to_string())
                        }
                        "menu.item" => {
                            menu_projection.apply_envelope(&env).map_err(|e| e.to_string())
                        }
                        "dining.order" => {
                            dining_projection.apply_envelope(&env).map_err(|e| e.to_string())
                        }
                        "payments.payment" => {
                            payments_projection.apply_envelope(&env).map_err(|e| e.to_string())
                        }
                        _ => Ok(()),
                    };

                    if let Err(e) = apply_ok {
                        tracing::warn!("projection apply failed: {e}");
                        continue;
                    }

                    let _ = realtime_tx.send(RealtimeMessage {
                        property_id: env.property_id(),
                        topic: format!("{at}.projection_updated"),
                        payload: serde_json::json!({
                            "kind": "projection_update",
                            "aggregate_type": at,
                            "aggregate_id": env.aggregate_id().to_string(),
                            "sequence_number": env.sequence_number(),
                        }),
                    });

                    if let Err(e) = saga_runner.handle_envelope(&env) {
                        tracing::warn!("payment confirmation saga failed: {e}");
                    }
                }
                Err(_) => break,
            }
        });
    }

    AppServices::Persistent {
        dispatcher,
        event_store: store,
        event_bus: bus,
        rooms_projection,
        occupancy_projection,
        bookings_projection,
        guests_projection,
        menu_projection,
        dining_projection,
        payments_projection,
        availability,
        reservation_desk,
        order_desk,
        guest_directory,
        job_store,
        jobs_executor,
        realtime_tx,
    }
}

impl AppServices {
    pub fn realtime_tx(&self) -> &broadcast::Sender<RealtimeMessage> {
        match self {
            AppServices::InMemory { realtime_tx, .. } => realtime_tx,
            AppServices::Persistent { realtime_tx, .. } => realtime_tx,
        }
    }

    pub fn dispatch<A>(
        &self,
        property_id: PropertyId,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        command: A::Command,
        make_aggregate: impl FnOnce(PropertyId, AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: stayforge_core::Aggregate<Error = DomainError>,
        A::Event: stayforge_events::Event + serde::Serialize + serde::de::DeserializeOwned,
    {
        match self {
            AppServices::InMemory { dispatcher, .. } => dispatcher.dispatch::<A>(
                property_id,
                aggregate_id,
                aggregate_type,
                command,
                make_aggregate,
            ),
            AppServices::Persistent { dispatcher, .. } => dispatcher.dispatch::<A>(
                property_id,
                aggregate_id,
                aggregate_type,
                command,
                make_aggregate,
            ),
        }
    }

    // ---- frontdesk operations ----

    pub fn find_available(&self, property_id: PropertyId, period: &StayPeriod) -> Vec<RoomSummary> {
        match self {
            AppServices::InMemory { availability, .. } => {
                availability.find_available(property_id, period)
            }
            AppServices::Persistent { availability, .. } => {
                availability.find_available(property_id, period)
            }
        }
    }

    pub fn register_room(
        &self,
        property_id: PropertyId,
        request: RegisterRoomRequest,
    ) -> Result<RoomId, FrontdeskError> {
        match self {
            AppServices::InMemory { reservation_desk, .. } => {
                reservation_desk.register_room(property_id, request)
            }
            AppServices::Persistent { reservation_desk, .. } => {
                reservation_desk.register_room(property_id, request)
            }
        }
    }

    pub fn reserve(
        &self,
        property_id: PropertyId,
        request: ReserveStayRequest,
    ) -> Result<BookingReceipt, FrontdeskError> {
        match self {
            AppServices::InMemory { reservation_desk, .. } => {
                reservation_desk.reserve(property_id, request)
            }
            AppServices::Persistent { reservation_desk, .. } => {
                reservation_desk.reserve(property_id, request)
            }
        }
    }

    pub fn transition_booking(
        &self,
        property_id: PropertyId,
        booking_id: BookingId,
        target: BookingStatus,
    ) -> Result<BookingReceipt, FrontdeskError> {
        match self {
            AppServices::InMemory { reservation_desk, .. } => {
                reservation_desk.transition(property_id, booking_id, target)
            }
            AppServices::Persistent { reservation_desk, .. } => {
                reservation_desk.transition(property_id, booking_id, target)
            }
        }
    }

    pub fn register_guest(
        &self,
        property_id: PropertyId,
        full_name: String,
        contact: Option<ContactDetails>,
        notes: Option<String>,
    ) -> Result<GuestId, FrontdeskError> {
        match self {
            AppServices::InMemory { guest_directory, .. } => {
                guest_directory.register(property_id, full_name, contact, notes)
            }
            AppServices::Persistent { guest_directory, .. } => {
                guest_directory.register(property_id, full_name, contact, notes)
            }
        }
    }

    pub fn open_order(
        &self,
        property_id: PropertyId,
        request: OpenOrderRequest,
    ) -> Result<OrderReceipt, FrontdeskError> {
        match self {
            AppServices::InMemory { order_desk, .. } => order_desk.open_order(property_id, request),
            AppServices::Persistent { order_desk, .. } => {
                order_desk.open_order(property_id, request)
            }
        }
    }

    pub fn transition_order(
        &self,
        property_id: PropertyId,
        order_id: DiningOrderId,
        target: DiningOrderStatus,
    ) -> Result<DiningOrderStatus, FrontdeskError> {
        match self {
            AppServices::InMemory { order_desk, .. } => {
                order_desk.transition_order(property_id, order_id, target)
            }
            AppServices::Persistent { order_desk, .. } => {
                order_desk.transition_order(property_id, order_id, target)
            }
        }
    }

    // ---- read models ----

    pub fn rooms_get(&self, property_id: PropertyId, room_id: &RoomId) -> Option<RoomReadModel> {
        match self {
            AppServices::InMemory { rooms_projection, .. } => {
                rooms_projection.get(property_id, room_id)
            }
            AppServices::Persistent { rooms_projection, .. } => {
                rooms_projection.get(property_id, room_id)
            }
        }
    }

    pub fn rooms_list(&self, property_id: PropertyId) -> Vec<RoomReadModel> {
        match self {
            AppServices::InMemory { rooms_projection, .. } => rooms_projection.list(property_id),
            AppServices::Persistent { rooms_projection, .. } => rooms_projection.list(property_id),
        }
    }

    pub fn bookings_get(
        &self,
        property_id: PropertyId,
        booking_id: &BookingId,
    ) -> Option<BookingReadModel> {
        match self {
            AppServices::InMemory { bookings_projection, .. } => {
                bookings_projection.get(property_id, booking_id)
            }
            AppServices::Persistent { bookings_projection, .. } => {
                bookings_projection.get(property_id, booking_id)
            }
        }
    }

    pub fn bookings_list(&self, property_id: PropertyId) -> Vec<BookingReadModel> {
        match self {
            AppServices::InMemory { bookings_projection, .. } => {
                bookings_projection.list(property_id)
            }
            AppServices::Persistent { bookings_projection, .. } => {
                bookings_projection.list(property_id)
            }
        }
    }

    pub fn guests_get(&self, property_id: PropertyId, guest_id: &GuestId) -> Option<GuestReadModel> {
        match self {
            AppServices::InMemory { guests_projection, .. } => {
                guests_projection.get(property_id, guest_id)
            }
            AppServices::Persistent { guests_projection, .. } => {
                guests_projection.get(property_id, guest_id)
            }
        }
    }

    pub fn guests_list(&self, property_id: PropertyId) -> Vec<GuestReadModel> {
        match self {
            AppServices::InMemory { guests_projection, .. } => guests_projection.list(property_id),
            AppServices::Persistent { guests_projection, .. } => {
                guests_projection.list(property_id)
            }
        }
    }

    pub fn menu_get(
        &self,
        property_id: PropertyId,
        item_id: &MenuItemId,
    ) -> Option<MenuItemReadModel> {
        match self {
            AppServices::InMemory { menu_projection, .. } => {
                menu_projection.get(property_id, item_id)
            }
            AppServices::Persistent { menu_projection, .. } => {
                menu_projection.get(property_id, item_id)
            }
        }
    }

    pub fn menu_list(&self, property_id: PropertyId) -> Vec<MenuItemReadModel> {
        match self {
            AppServices::InMemory { menu_projection, .. } => menu_projection.list(property_id),
            AppServices::Persistent { menu_projection, .. } => menu_projection.list(property_id),
        }
    }

    pub fn orders_get(
        &self,
        property_id: PropertyId,
        order_id: &DiningOrderId,
    ) -> Option<DiningOrderReadModel> {
        match self {
            AppServices::InMemory { dining_projection, .. } => {
                dining_projection.get(property_id, order_id)
            }
            AppServices::Persistent { dining_projection, .. } => {
                dining_projection.get(property_id, order_id)
            }
        }
    }

    pub fn orders_list(&self, property_id: PropertyId) -> Vec<DiningOrderReadModel> {
        match self {
            AppServices::InMemory { dining_projection, .. } => dining_projection.list(property_id),
            AppServices::Persistent { dining_projection, .. } => {
                dining_projection.list(property_id)
            }
        }
    }

    pub fn payments_get(
        &self,
        property_id: PropertyId,
        payment_id: &PaymentId,
    ) -> Option<PaymentReadModel> {
        match self {
            AppServices::InMemory { payments_projection, .. } => {
                payments_projection.get(property_id, payment_id)
            }
            AppServices::Persistent { payments_projection, .. } => {
                payments_projection.get(property_id, payment_id)
            }
        }
    }

    pub fn payments_list(&self, property_id: PropertyId) -> Vec<PaymentReadModel> {
        match self {
            AppServices::InMemory { payments_projection, .. } => {
                payments_projection.list(property_id)
            }
            AppServices::Persistent { payments_projection, .. } => {
                payments_projection.list(property_id)
            }
        }
    }

    // ---- event queries ----

    pub async fn query_events(
        &self,
        property_id: PropertyId,
        filter: EventFilter,
        pagination: Pagination,
    ) -> Result<EventQueryResult, EventStoreError> {
        match self {
            AppServices::InMemory { event_store, .. } => {
                event_store.query_events(property_id, filter, pagination).await
            }
            AppServices::Persistent { event_store, .. } => {
                event_store.query_events(property_id, filter, pagination).await
            }
        }
    }

    pub async fn get_aggregate_events(
        &self,
        property_id: PropertyId,
        aggregate_id: AggregateId,
        pagination: Option<Pagination>,
    ) -> Result<EventQueryResult, EventStoreError> {
        match self {
            AppServices::InMemory { event_store, .. } => {
                event_store
                    .get_aggregate_events(property_id, aggregate_id, pagination)
                    .await
            }
            AppServices::Persistent { event_store, .. } => {
                event_store
                    .get_aggregate_events(property_id, aggregate_id, pagination)
                    .await
            }
        }
    }

    pub async fn get_event_by_id(
        &self,
        property_id: PropertyId,
        event_id: uuid::Uuid,
    ) -> Result<Option<StoredEvent>, EventStoreError> {
        match self {
            AppServices::InMemory { event_store, .. } => {
                event_store.get_event_by_id(property_id, event_id).await
            }
            AppServices::Persistent { event_store, .. } => {
                event_store.get_event_by_id(property_id, event_id).await
            }
        }
    }
}

/// Build an SSE stream scoped to one property (used by `/stream`).
pub fn property_sse_stream(
    services: Arc<AppServices>,
    property_id: PropertyId,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(m) if m.property_id == property_id => {
            let data = serde_json::to_string(&m.payload).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(m.topic).data(data)))
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
