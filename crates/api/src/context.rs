use stayforge_core::{PropertyId, StaffId};

/// Property context for a request.
///
/// This is immutable and must be present for all domain routes. Identity and
/// authorization live in the gateway in front of this service; by the time a
/// request lands here the property scope has already been established.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PropertyContext {
    property_id: PropertyId,
}

impl PropertyContext {
    pub fn new(property_id: PropertyId) -> Self {
        Self { property_id }
    }

    pub fn property_id(&self) -> PropertyId {
        self.property_id
    }
}

/// Staff member acting on the request, when the gateway forwards one.
///
/// Purely informational: it is attached to logs, never used for access
/// decisions.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OperatorContext {
    staff_id: StaffId,
}

impl OperatorContext {
    pub fn new(staff_id: StaffId) -> Self {
        Self { staff_id }
    }

    pub fn staff_id(&self) -> StaffId {
        self.staff_id
    }
}
