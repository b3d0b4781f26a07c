//! Guest directory: registration and returning-guest lookup.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value as JsonValue;

use stayforge_core::{AggregateId, PropertyId};
use stayforge_events::{EventBus, EventEnvelope};
use stayforge_guests::{ContactDetails, Guest, GuestCommand, GuestId, RegisterGuest};
use stayforge_infra::command_dispatcher::CommandDispatcher;
use stayforge_infra::event_store::EventStore;
use stayforge_infra::projections::guests::{GuestReadModel, GuestsProjection};
use stayforge_infra::read_model::PropertyStore;

use crate::error::FrontdeskError;

/// Registers guests and recognises returning ones by contact details.
///
/// Contact details are not unique in the domain, so recognition is a
/// convenience: an exact email-and-phone match reuses the existing record,
/// anything else registers a fresh one. A lookup with neither email nor
/// phone always registers, since a contactless probe would otherwise match
/// every contactless guest on file.
pub struct GuestDirectory<S, B, GS>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    GS: PropertyStore<GuestId, GuestReadModel>,
{
    dispatcher: Arc<CommandDispatcher<S, B>>,
    guests: Arc<GuestsProjection<GS>>,
}

impl<S, B, GS> GuestDirectory<S, B, GS>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    GS: PropertyStore<GuestId, GuestReadModel>,
{
    pub fn new(
        dispatcher: Arc<CommandDispatcher<S, B>>,
        guests: Arc<GuestsProjection<GS>>,
    ) -> Self {
        Self { dispatcher, guests }
    }

    pub fn get(&self, property_id: PropertyId, guest_id: &GuestId) -> Option<GuestReadModel> {
        self.guests.get(property_id, guest_id)
    }

    pub fn list(&self, property_id: PropertyId) -> Vec<GuestReadModel> {
        self.guests.list(property_id)
    }

    /// Register a new guest record.
    pub fn register(
        &self,
        property_id: PropertyId,
        full_name: impl Into<String>,
        contact: Option<ContactDetails>,
        notes: Option<String>,
    ) -> Result<GuestId, FrontdeskError> {
        let guest_id = GuestId::new(AggregateId::new());
        let command = GuestCommand::RegisterGuest(RegisterGuest {
            property_id,
            guest_id,
            full_name: full_name.into(),
            contact,
            notes,
            occurred_at: Utc::now(),
        });
        self.dispatcher
            .dispatch(property_id, guest_id.0, "guests.guest", command, |_, id| {
                Guest::empty(GuestId::new(id))
            })?;
        Ok(guest_id)
    }

    /// Reuse the guest whose contact details match exactly, or register a
    /// new record under `full_name`.
    pub fn find_or_register(
        &self,
        property_id: PropertyId,
        full_name: &str,
        contact: &ContactDetails,
    ) -> Result<GuestId, FrontdeskError> {
        if contact.email.is_some() || contact.phone.is_some() {
            let existing = self
                .guests
                .list(property_id)
                .into_iter()
                .find(|g| g.email == contact.email && g.phone == contact.phone);
            if let Some(guest) = existing {
                return Ok(guest.guest_id);
            }
        }
        self.register(property_id, full_name, Some(contact.clone()), None)
    }
}
