use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stayforge_core::{Aggregate, AggregateRoot, AggregateId, DomainError, PropertyId};
use stayforge_events::Event;

/// Guest identifier (property-scoped via `property_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestId(pub AggregateId);

impl GuestId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for GuestId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Contact details for a guest.
///
/// Neither field is unique: repeat visitors may end up with several guest
/// records, and walk-ins may have no email at all. De-duplication is a
/// front-desk concern, not a domain invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Default for ContactDetails {
    fn default() -> Self {
        Self {
            email: None,
            phone: None,
        }
    }
}

/// Aggregate root: Guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guest {
    id: GuestId,
    property_id: Option<PropertyId>,
    full_name: String,
    contact: ContactDetails,
    notes: Option<String>,
    version: u64,
    created: bool,
}

impl Guest {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: GuestId) -> Self {
        Self {
            id,
            property_id: None,
            full_name: String::new(),
            contact: ContactDetails::default(),
            notes: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> GuestId {
        self.id
    }

    pub fn property_id(&self) -> Option<PropertyId> {
        self.property_id
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn contact(&self) -> &ContactDetails {
        &self.contact
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

impl AggregateRoot for Guest {
    type Id = GuestId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterGuest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterGuest {
    pub property_id: PropertyId,
    pub guest_id: GuestId,
    pub full_name: String,
    pub contact: Option<ContactDetails>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateGuestContact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateGuestContact {
    pub property_id: PropertyId,
    pub guest_id: GuestId,
    /// Optional new name (if None, keep existing).
    pub full_name: Option<String>,
    /// Optional new contact details (if None, keep existing).
    pub contact: Option<ContactDetails>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuestCommand {
    RegisterGuest(RegisterGuest),
    UpdateGuestContact(UpdateGuestContact),
}

/// Event: GuestRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestRegistered {
    pub property_id: PropertyId,
    pub guest_id: GuestId,
    pub full_name: String,
    pub contact: ContactDetails,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: GuestContactUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestContactUpdated {
    pub property_id: PropertyId,
    pub guest_id: GuestId,
    pub full_name: String,
    pub contact: ContactDetails,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuestEvent {
    GuestRegistered(GuestRegistered),
    GuestContactUpdated(GuestContactUpdated),
}

impl Event for GuestEvent {
    fn event_type(&self) -> &'static str {
        match self {
            GuestEvent::GuestRegistered(_) => "guests.guest.registered",
            GuestEvent::GuestContactUpdated(_) => "guests.guest.contact_updated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            GuestEvent::GuestRegistered(e) => e.occurred_at,
            GuestEvent::GuestContactUpdated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Guest {
    type Command = GuestCommand;
    type Event = GuestEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            GuestEvent::GuestRegistered(e) => {
                self.id = e.guest_id;
                self.property_id = Some(e.property_id);
                self.full_name = e.full_name.clone();
                self.contact = e.contact.clone();
                self.notes = e.notes.clone();
                self.created = true;
            }
            GuestEvent::GuestContactUpdated(e) => {
                self.full_name = e.full_name.clone();
                self.contact = e.contact.clone();
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            GuestCommand::RegisterGuest(cmd) => self.handle_register(cmd),
            GuestCommand::UpdateGuestContact(cmd) => self.handle_update_contact(cmd),
        }
    }
}

impl Guest {
    fn ensure_property(&self, property_id: PropertyId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.property_id != Some(property_id) {
            return Err(DomainError::invariant("property mismatch"));
        }
        Ok(())
    }

    fn ensure_guest_id(&self, guest_id: GuestId) -> Result<(), DomainError> {
        if self.id != guest_id {
            return Err(DomainError::invariant("guest_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterGuest) -> Result<Vec<GuestEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("guest already exists"));
        }

        if cmd.full_name.trim().is_empty() {
            return Err(DomainError::validation("guest name cannot be empty"));
        }

        let contact = cmd.contact.clone().unwrap_or_default();

        Ok(vec![GuestEvent::GuestRegistered(GuestRegistered {
            property_id: cmd.property_id,
            guest_id: cmd.guest_id,
            full_name: cmd.full_name.clone(),
            contact,
            notes: cmd.notes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_contact(
        &self,
        cmd: &UpdateGuestContact,
    ) -> Result<Vec<GuestEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_property(cmd.property_id)?;
        self.ensure_guest_id(cmd.guest_id)?;

        let new_name = cmd.full_name.clone().unwrap_or_else(|| self.full_name.clone());
        if new_name.trim().is_empty() {
            return Err(DomainError::validation("guest name cannot be empty"));
        }

        let new_contact = cmd.contact.clone().unwrap_or_else(|| self.contact.clone());

        Ok(vec![GuestEvent::GuestContactUpdated(GuestContactUpdated {
            property_id: cmd.property_id,
            guest_id: cmd.guest_id,
            full_name: new_name,
            contact: new_contact,
            occurred_at: cmd.occurred_at,
        })])
    }
}
