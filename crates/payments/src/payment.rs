use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stayforge_core::{Aggregate, AggregateRoot, AggregateId, DomainError, PropertyId};
use stayforge_dining::DiningOrderId;
use stayforge_events::Event;
use stayforge_lodging::BookingId;

/// Payment identifier (property-scoped via `property_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(pub AggregateId);

impl PaymentId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PaymentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// How the guest paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

/// Settlement status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Succeeded | PaymentStatus::Failed)
    }
}

/// Aggregate root: Payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    id: PaymentId,
    property_id: Option<PropertyId>,
    amount: u64,
    method: PaymentMethod,
    reference: Option<String>,
    booking_id: Option<BookingId>,
    order_id: Option<DiningOrderId>,
    status: PaymentStatus,
    version: u64,
    created: bool,
}

impl Payment {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PaymentId) -> Self {
        Self {
            id,
            property_id: None,
            amount: 0,
            method: PaymentMethod::Cash,
            reference: None,
            booking_id: None,
            order_id: None,
            status: PaymentStatus::Pending,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PaymentId {
        self.id
    }

    pub fn property_id(&self) -> Option<PropertyId> {
        self.property_id
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn booking_id(&self) -> Option<BookingId> {
        self.booking_id
    }

    pub fn order_id(&self) -> Option<DiningOrderId> {
        self.order_id
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }
}

impl AggregateRoot for Payment {
    type Id = PaymentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RecordPayment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayment {
    pub property_id: PropertyId,
    pub payment_id: PaymentId,
    pub amount: u64,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub booking_id: Option<BookingId>,
    pub order_id: Option<DiningOrderId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkPaymentSucceeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkPaymentSucceeded {
    pub property_id: PropertyId,
    pub payment_id: PaymentId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkPaymentFailed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkPaymentFailed {
    pub property_id: PropertyId,
    pub payment_id: PaymentId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentCommand {
    RecordPayment(RecordPayment),
    MarkPaymentSucceeded(MarkPaymentSucceeded),
    MarkPaymentFailed(MarkPaymentFailed),
}

/// Event: PaymentRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecorded {
    pub property_id: PropertyId,
    pub payment_id: PaymentId,
    pub amount: u64,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub booking_id: Option<BookingId>,
    pub order_id: Option<DiningOrderId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentSucceeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSucceeded {
    pub property_id: PropertyId,
    pub payment_id: PaymentId,
    pub booking_id: Option<BookingId>,
    pub order_id: Option<DiningOrderId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentFailed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailed {
    pub property_id: PropertyId,
    pub payment_id: PaymentId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentEvent {
    PaymentRecorded(PaymentRecorded),
    PaymentSucceeded(PaymentSucceeded),
    PaymentFailed(PaymentFailed),
}

impl Event for PaymentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PaymentEvent::PaymentRecorded(_) => "payments.payment.recorded",
            PaymentEvent::PaymentSucceeded(_) => "payments.payment.succeeded",
            PaymentEvent::PaymentFailed(_) => "payments.payment.failed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PaymentEvent::PaymentRecorded(e) => e.occurred_at,
            PaymentEvent::PaymentSucceeded(e) => e.occurred_at,
            PaymentEvent::PaymentFailed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Payment {
    type Command = PaymentCommand;
    type Event = PaymentEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PaymentEvent::PaymentRecorded(e) => {
                self.id = e.payment_id;
                self.property_id = Some(e.property_id);
                self.amount = e.amount;
                self.method = e.method;
                self.reference = e.reference.clone();
                self.booking_id = e.booking_id;
                self.order_id = e.order_id;
                self.status = PaymentStatus::Pending;
                self.created = true;
            }
            PaymentEvent::PaymentSucceeded(_) => {
                self.status = PaymentStatus::Succeeded;
            }
            PaymentEvent::PaymentFailed(_) => {
                self.status = PaymentStatus::Failed;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PaymentCommand::RecordPayment(cmd) => self.handle_record(cmd),
            PaymentCommand::MarkPaymentSucceeded(cmd) => self.handle_mark_succeeded(cmd),
            PaymentCommand::MarkPaymentFailed(cmd) => self.handle_mark_failed(cmd),
        }
    }
}

impl Payment {
    fn ensure_property(&self, property_id: PropertyId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.property_id != Some(property_id) {
            return Err(DomainError::invariant("property mismatch"));
        }
        Ok(())
    }

    fn ensure_payment_id(&self, payment_id: PaymentId) -> Result<(), DomainError> {
        if self.id != payment_id {
            return Err(DomainError::invariant("payment_id mismatch"));
        }
        Ok(())
    }

    fn ensure_settleable(&self) -> Result<(), DomainError> {
        if self.status != PaymentStatus::Pending {
            return Err(DomainError::invariant(
                "payment has already been settled",
            ));
        }
        Ok(())
    }

    fn handle_record(&self, cmd: &RecordPayment) -> Result<Vec<PaymentEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("payment already exists"));
        }

        if cmd.amount == 0 {
            return Err(DomainError::validation("payment amount must be positive"));
        }

        if cmd.booking_id.is_none() && cmd.order_id.is_none() {
            return Err(DomainError::validation(
                "payment must reference a booking or an order",
            ));
        }

        Ok(vec![PaymentEvent::PaymentRecorded(PaymentRecorded {
            property_id: cmd.property_id,
            payment_id: cmd.payment_id,
            amount: cmd.amount,
            method: cmd.method,
            reference: cmd.reference.clone(),
            booking_id: cmd.booking_id,
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_succeeded(
        &self,
        cmd: &MarkPaymentSucceeded,
    ) -> Result<Vec<PaymentEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_property(cmd.property_id)?;
        self.ensure_payment_id(cmd.payment_id)?;
        self.ensure_settleable()?;

        Ok(vec![PaymentEvent::PaymentSucceeded(PaymentSucceeded {
            property_id: cmd.property_id,
            payment_id: cmd.payment_id,
            booking_id: self.booking_id,
            order_id: self.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_failed(
        &self,
        cmd: &MarkPaymentFailed,
    ) -> Result<Vec<PaymentEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_property(cmd.property_id)?;
        self.ensure_payment_id(cmd.payment_id)?;
        self.ensure_settleable()?;

        Ok(vec![PaymentEvent::PaymentFailed(PaymentFailed {
            property_id: cmd.property_id,
            payment_id: cmd.payment_id,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
