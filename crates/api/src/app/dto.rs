use chrono::NaiveDate;
use serde::Deserialize;

use stayforge_frontdesk::{BookingReceipt, OrderReceipt, RoomSummary};
use stayforge_infra::projections::{
    BookingReadModel, DiningOrderReadModel, GuestReadModel, MenuItemReadModel, PaymentReadModel,
    RoomReadModel,
};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub room_number: String,
    pub room_type: String,
    pub nightly_rate: u64,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoomRequest {
    pub room_type: Option<String>,
    pub amenities: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRateRequest {
    pub nightly_rate: u64,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoomStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct RegisterGuestRequest {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

/// Inline guest block for walk-up reservations without a prior guest record.
#[derive(Debug, Deserialize)]
pub struct InlineGuestRequest {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub room_id: String,
    /// Either `guest_id` (existing guest) or `guest` (inline) is required.
    pub guest_id: Option<String>,
    pub guest: Option<InlineGuestRequest>,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    /// Walk-in: the stay starts checked-in instead of pending.
    #[serde(default)]
    pub immediate_check_in: bool,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct BookingListQuery {
    pub status: Option<String>,
    pub room_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddMenuItemRequest {
    pub name: String,
    pub category: String,
    pub price: u64,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeItemPriceRequest {
    pub price: u64,
}

#[derive(Debug, Deserialize)]
pub struct SetItemAvailabilityRequest {
    pub available: bool,
}

#[derive(Debug, Deserialize)]
pub struct OrderLineRequestBody {
    pub menu_item_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub guest_id: Option<String>,
    pub room_id: Option<String>,
    pub lines: Vec<OrderLineRequestBody>,
}

#[derive(Debug, Deserialize)]
pub struct RecordPaymentRequest {
    pub amount: u64,
    pub method: String,
    pub reference: Option<String>,
    pub booking_id: Option<String>,
    pub order_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentStatusRequest {
    pub status: String,
    pub reason: Option<String>,
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn room_to_json(rm: RoomReadModel) -> serde_json::Value {
    serde_json::json!({
        "id": rm.room_id.0.to_string(),
        "room_number": rm.room_number,
        "room_type": rm.room_type,
        "nightly_rate": rm.nightly_rate,
        "status": rm.status,
        "amenities": rm.amenities,
        "images": rm.images,
    })
}

pub fn room_summary_to_json(summary: RoomSummary) -> serde_json::Value {
    serde_json::json!({
        "id": summary.room_id.0.to_string(),
        "room_number": summary.room_number,
        "room_type": summary.room_type,
        "nightly_rate": summary.nightly_rate,
        "status": summary.status,
        "amenities": summary.amenities,
    })
}

pub fn guest_to_json(rm: GuestReadModel) -> serde_json::Value {
    serde_json::json!({
        "id": rm.guest_id.0.to_string(),
        "full_name": rm.full_name,
        "email": rm.email,
        "phone": rm.phone,
        "notes": rm.notes,
    })
}

pub fn booking_to_json(rm: BookingReadModel) -> serde_json::Value {
    serde_json::json!({
        "id": rm.booking_id.0.to_string(),
        "room_id": rm.room_id.0.to_string(),
        "guest_id": rm.guest_id.0.to_string(),
        "check_in": rm.check_in,
        "check_out": rm.check_out,
        "status": rm.status,
        "nightly_rate": rm.nightly_rate,
        "nights": rm.nights,
        "total_amount": rm.total_amount,
    })
}

pub fn booking_receipt_to_json(receipt: BookingReceipt) -> serde_json::Value {
    serde_json::json!({
        "id": receipt.booking_id.0.to_string(),
        "room_id": receipt.room_id.0.to_string(),
        "room_number": receipt.room_number,
        "guest_id": receipt.guest_id.0.to_string(),
        "check_in": receipt.check_in,
        "check_out": receipt.check_out,
        "nights": receipt.nights,
        "nightly_rate": receipt.nightly_rate,
        "total_amount": receipt.total_amount,
        "status": receipt.status,
    })
}

pub fn menu_item_to_json(rm: MenuItemReadModel) -> serde_json::Value {
    serde_json::json!({
        "id": rm.item_id.0.to_string(),
        "name": rm.name,
        "category": rm.category,
        "price": rm.price,
        "available": rm.available,
        "description": rm.description,
    })
}

pub fn order_to_json(rm: DiningOrderReadModel) -> serde_json::Value {
    serde_json::json!({
        "id": rm.order_id.0.to_string(),
        "guest_id": rm.guest_id.map(|g| g.0.to_string()),
        "room_id": rm.room_id.map(|r| r.0.to_string()),
        "status": rm.status,
        "lines": rm.lines.iter().map(|line| serde_json::json!({
            "line_no": line.line_no,
            "menu_item_id": line.menu_item_id.0.to_string(),
            "quantity": line.quantity,
            "unit_price": line.unit_price,
        })).collect::<Vec<_>>(),
        "total_amount": rm.total_amount,
    })
}

pub fn order_receipt_to_json(receipt: OrderReceipt) -> serde_json::Value {
    serde_json::json!({
        "id": receipt.order_id.0.to_string(),
        "guest_id": receipt.guest_id.map(|g| g.0.to_string()),
        "room_id": receipt.room_id.map(|r| r.0.to_string()),
        "status": receipt.status,
        "lines": receipt.lines.iter().map(|line| serde_json::json!({
            "line_no": line.line_no,
            "menu_item_id": line.menu_item_id.0.to_string(),
            "quantity": line.quantity,
            "unit_price": line.unit_price,
        })).collect::<Vec<_>>(),
        "total_amount": receipt.total_amount,
    })
}

pub fn payment_to_json(rm: PaymentReadModel) -> serde_json::Value {
    serde_json::json!({
        "id": rm.payment_id.0.to_string(),
        "amount": rm.amount,
        "method": rm.method,
        "reference": rm.reference,
        "booking_id": rm.booking_id.map(|b| b.0.to_string()),
        "order_id": rm.order_id.map(|o| o.0.to_string()),
        "status": rm.status,
    })
}
