use reqwest::StatusCode;
use serde_json::json;
use stayforge_core::{PropertyId, StaffId};

const PROPERTY_HEADER: &str = "X-Property-Id";
const STAFF_HEADER: &str = "X-Staff-Id";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Build app (same router as prod), but bind to an ephemeral port.
        let app = stayforge_api::app::build_app().await;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Poll a GET endpoint until it returns 200.
///
/// The API is intentionally eventual-consistent (command path vs projection
/// update), so freshly committed aggregates take a beat to show up in reads.
async fn get_ok_eventually(
    client: &reqwest::Client,
    base_url: &str,
    property: &str,
    path: &str,
) -> serde_json::Value {
    for _ in 0..50 {
        let res = client
            .get(format!("{}{}", base_url, path))
            .header(PROPERTY_HEADER, property)
            .send()
            .await
            .unwrap();

        if res.status() == StatusCode::OK {
            return res.json().await.unwrap();
        }

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    panic!("{path} did not become visible in projection within timeout");
}

async fn booking_status_eventually(
    client: &reqwest::Client,
    base_url: &str,
    property: &str,
    booking_id: &str,
    want: &str,
) -> serde_json::Value {
    for _ in 0..100 {
        let res = client
            .get(format!("{}/bookings/{}", base_url, booking_id))
            .header(PROPERTY_HEADER, property)
            .send()
            .await
            .unwrap();

        if res.status() == StatusCode::OK {
            let body: serde_json::Value = res.json().await.unwrap();
            if body["status"] == want {
                return body;
            }
        }

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    panic!("booking {booking_id} did not reach status {want} within timeout");
}

/// Register a room and wait until the catalog projection can serve it.
async fn create_room(
    client: &reqwest::Client,
    base_url: &str,
    property: &str,
    number: &str,
    nightly_rate: u64,
) -> String {
    let res = client
        .post(format!("{}/rooms", base_url))
        .header(PROPERTY_HEADER, property)
        .json(&json!({
            "room_number": number,
            "room_type": "double",
            "nightly_rate": nightly_rate,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    get_ok_eventually(client, base_url, property, &format!("/rooms/{}", id)).await;
    id
}

async fn reserve(
    client: &reqwest::Client,
    base_url: &str,
    property: &str,
    room_id: &str,
    guest_name: &str,
    check_in: &str,
    check_out: &str,
) -> reqwest::Response {
    client
        .post(format!("{}/bookings", base_url))
        .header(PROPERTY_HEADER, property)
        .json(&json!({
            "room_id": room_id,
            "guest": { "full_name": guest_name },
            "check_in": check_in,
            "check_out": check_out,
        }))
        .send()
        .await
        .unwrap()
}

async fn transition_booking(
    client: &reqwest::Client,
    base_url: &str,
    property: &str,
    booking_id: &str,
    status: &str,
) -> reqwest::Response {
    client
        .post(format!("{}/bookings/{}/transition", base_url, booking_id))
        .header(PROPERTY_HEADER, property)
        .json(&json!({ "status": status }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_endpoint_needs_no_property_header() {
    let srv = TestServer::spawn().await;

    let client = reqwest::Client::new();
    let res = client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn property_header_is_required_for_scoped_routes() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/whoami", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "missing_property");

    let res = client
        .get(format!("{}/whoami", srv.base_url))
        .header(PROPERTY_HEADER, "not-a-uuid")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_property");
}

#[tokio::test]
async fn whoami_echoes_property_and_operator_context() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let property = PropertyId::new().to_string();
    let staff = StaffId::new().to_string();

    let res = client
        .get(format!("{}/whoami", srv.base_url))
        .header(PROPERTY_HEADER, &property)
        .header(STAFF_HEADER, &staff)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["property_id"].as_str().unwrap(), property);
    assert_eq!(body["staff_id"].as_str().unwrap(), staff);

    // The operator header is optional.
    let res = client
        .get(format!("{}/whoami", srv.base_url))
        .header(PROPERTY_HEADER, &property)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["staff_id"].is_null());
}

#[tokio::test]
async fn booking_lifecycle_reserve_confirm_check_in_complete() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let property = PropertyId::new().to_string();

    let room_id = create_room(&client, &srv.base_url, &property, "101", 25_000).await;

    let res = reserve(
        &client,
        &srv.base_url,
        &property,
        &room_id,
        "Amina Yusuf",
        "2026-09-01",
        "2026-09-04",
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let receipt: serde_json::Value = res.json().await.unwrap();
    assert_eq!(receipt["nights"], 3);
    assert_eq!(receipt["nightly_rate"], 25_000);
    assert_eq!(receipt["total_amount"], 75_000);
    assert_eq!(receipt["status"], "pending");
    let booking_id = receipt["id"].as_str().unwrap().to_string();

    // Read model catches up with the committed reservation.
    let row = get_ok_eventually(
        &client,
        &srv.base_url,
        &property,
        &format!("/bookings/{}", booking_id),
    )
    .await;
    assert_eq!(row["room_id"].as_str().unwrap(), room_id);
    assert_eq!(row["check_in"], "2026-09-01");
    assert_eq!(row["check_out"], "2026-09-04");
    assert_eq!(row["total_amount"], 75_000);

    for status in ["confirmed", "checked-in", "completed"] {
        let res =
            transition_booking(&client, &srv.base_url, &property, &booking_id, status).await;
        assert_eq!(res.status(), StatusCode::OK, "transition to {status}");
        let receipt: serde_json::Value = res.json().await.unwrap();
        assert_eq!(receipt["status"], status);
    }

    // Terminal states admit no further transitions.
    let res =
        transition_booking(&client, &srv.base_url, &property, &booking_id, "cancelled").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Completing the stay flips the room into cleaning.
    for _ in 0..50 {
        let room = get_ok_eventually(
            &client,
            &srv.base_url,
            &property,
            &format!("/rooms/{}", room_id),
        )
        .await;
        if room["status"] == "cleaning" {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("room did not enter cleaning after checkout");
}

#[tokio::test]
async fn confirmed_stay_blocks_overlap_but_not_turnover() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let property = PropertyId::new().to_string();

    let room_id = create_room(&client, &srv.base_url, &property, "204", 20_000).await;

    let res = reserve(
        &client,
        &srv.base_url,
        &property,
        &room_id,
        "Bolanle Ade",
        "2026-09-10",
        "2026-09-14",
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let booking_id = res.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();
    get_ok_eventually(
        &client,
        &srv.base_url,
        &property,
        &format!("/bookings/{}", booking_id),
    )
    .await;
    let res =
        transition_booking(&client, &srv.base_url, &property, &booking_id, "confirmed").await;
    assert_eq!(res.status(), StatusCode::OK);

    // Any night in common collides.
    let res = reserve(
        &client,
        &srv.base_url,
        &property,
        &room_id,
        "Chidi Okafor",
        "2026-09-13",
        "2026-09-16",
    )
    .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "conflict");

    // Checkout day equals check-in day on a turnover: no collision.
    let res = reserve(
        &client,
        &srv.base_url,
        &property,
        &room_id,
        "Chidi Okafor",
        "2026-09-14",
        "2026-09-16",
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn competing_holds_first_confirmation_wins() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let property = PropertyId::new().to_string();

    let room_id = create_room(&client, &srv.base_url, &property, "317", 18_000).await;

    // Two overlapping pending holds may coexist; a hold blocks nothing.
    let res_a = reserve(
        &client,
        &srv.base_url,
        &property,
        &room_id,
        "Amina Yusuf",
        "2026-10-01",
        "2026-10-05",
    )
    .await;
    assert_eq!(res_a.status(), StatusCode::CREATED);
    let booking_a = res_a.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let res_b = reserve(
        &client,
        &srv.base_url,
        &property,
        &room_id,
        "Bolanle Ade",
        "2026-10-03",
        "2026-10-07",
    )
    .await;
    assert_eq!(res_b.status(), StatusCode::CREATED);
    let booking_b = res_b.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    get_ok_eventually(
        &client,
        &srv.base_url,
        &property,
        &format!("/bookings/{}", booking_b),
    )
    .await;

    // First confirmation claims the nights...
    let res = transition_booking(&client, &srv.base_url, &property, &booking_a, "confirmed").await;
    assert_eq!(res.status(), StatusCode::OK);

    // ...and the loser cannot follow.
    let res = transition_booking(&client, &srv.base_url, &property, &booking_b, "confirmed").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // The losing hold is still cancellable.
    let res = transition_booking(&client, &srv.base_url, &property, &booking_b, "cancelled").await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn walk_in_booking_starts_checked_in() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let property = PropertyId::new().to_string();

    let room_id = create_room(&client, &srv.base_url, &property, "112", 22_000).await;

    let res = client
        .post(format!("{}/bookings", srv.base_url))
        .header(PROPERTY_HEADER, &property)
        .json(&json!({
            "room_id": room_id,
            "guest": { "full_name": "Ngozi Eze", "phone": "+2348012345678" },
            "check_in": "2026-09-20",
            "check_out": "2026-09-22",
            "immediate_check_in": true,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let receipt: serde_json::Value = res.json().await.unwrap();
    assert_eq!(receipt["status"], "checked-in");
    let booking_id = receipt["id"].as_str().unwrap().to_string();

    booking_status_eventually(&client, &srv.base_url, &property, &booking_id, "checked-in").await;

    // The room goes occupied in the same commit.
    let room = get_ok_eventually(
        &client,
        &srv.base_url,
        &property,
        &format!("/rooms/{}", room_id),
    )
    .await;
    assert_eq!(room["status"], "occupied");
}

#[tokio::test]
async fn availability_hides_rooms_with_active_stays() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let property = PropertyId::new().to_string();

    let room_101 = create_room(&client, &srv.base_url, &property, "101", 20_000).await;
    let room_102 = create_room(&client, &srv.base_url, &property, "102", 30_000).await;

    let res = reserve(
        &client,
        &srv.base_url,
        &property,
        &room_101,
        "Amina Yusuf",
        "2026-09-10",
        "2026-09-13",
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let booking_id = res.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();
    get_ok_eventually(
        &client,
        &srv.base_url,
        &property,
        &format!("/bookings/{}", booking_id),
    )
    .await;
    let res =
        transition_booking(&client, &srv.base_url, &property, &booking_id, "confirmed").await;
    assert_eq!(res.status(), StatusCode::OK);

    // Overlapping window: only the free room comes back (occupancy
    // projection catches up asynchronously).
    let mut items = Vec::new();
    for _ in 0..50 {
        let body: serde_json::Value = client
            .get(format!(
                "{}/availability?check_in=2026-09-11&check_out=2026-09-12",
                srv.base_url
            ))
            .header(PROPERTY_HEADER, &property)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        items = body["items"].as_array().unwrap().clone();
        if items.len() == 1 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"].as_str().unwrap(), room_102);

    // Disjoint window: both rooms, in room-number order.
    let body: serde_json::Value = client
        .get(format!(
            "{}/availability?check_in=2026-09-20&check_out=2026-09-22",
            srv.base_url
        ))
        .header(PROPERTY_HEADER, &property)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["room_number"], "101");
    assert_eq!(items[1]["room_number"], "102");

    // Inverted window is rejected outright.
    let res = client
        .get(format!(
            "{}/availability?check_in=2026-09-12&check_out=2026-09-11",
            srv.base_url
        ))
        .header(PROPERTY_HEADER, &property)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn property_isolation_blocks_cross_property_access() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let property1 = PropertyId::new().to_string();
    let property2 = PropertyId::new().to_string();

    let room_id = create_room(&client, &srv.base_url, &property1, "500", 40_000).await;

    // Another property cannot read it (projection lookup is property-scoped).
    let res = client
        .get(format!("{}/rooms/{}", srv.base_url, room_id))
        .header(PROPERTY_HEADER, &property2)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Nor write to it (dispatch happens under the other property's context).
    let res = client
        .post(format!("{}/rooms/{}/rate", srv.base_url, room_id))
        .header(PROPERTY_HEADER, &property2)
        .json(&json!({ "nightly_rate": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let body: serde_json::Value = client
        .get(format!("{}/bookings", srv.base_url))
        .header(PROPERTY_HEADER, &property2)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn guests_can_be_registered_and_listed() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let property = PropertyId::new().to_string();

    let res = client
        .post(format!("{}/guests", srv.base_url))
        .header(PROPERTY_HEADER, &property)
        .json(&json!({
            "full_name": "Amina Yusuf",
            "email": "amina@example.com",
            "notes": "prefers a high floor",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let guest_id = res.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let guest = get_ok_eventually(
        &client,
        &srv.base_url,
        &property,
        &format!("/guests/{}", guest_id),
    )
    .await;
    assert_eq!(guest["full_name"], "Amina Yusuf");
    assert_eq!(guest["email"], "amina@example.com");

    let body: serde_json::Value = client
        .get(format!("{}/guests", srv.base_url))
        .header(PROPERTY_HEADER, &property)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let items = body["items"].as_array().unwrap();
    assert!(items.iter().any(|g| g["id"] == guest_id.as_str()));
}

#[tokio::test]
async fn successful_booking_payment_confirms_the_stay() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let property = PropertyId::new().to_string();

    let room_id = create_room(&client, &srv.base_url, &property, "205", 25_000).await;
    let res = reserve(
        &client,
        &srv.base_url,
        &property,
        &room_id,
        "Bolanle Ade",
        "2026-10-10",
        "2026-10-12",
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let receipt: serde_json::Value = res.json().await.unwrap();
    let booking_id = receipt["id"].as_str().unwrap().to_string();
    get_ok_eventually(
        &client,
        &srv.base_url,
        &property,
        &format!("/bookings/{}", booking_id),
    )
    .await;

    let res = client
        .post(format!("{}/payments", srv.base_url))
        .header(PROPERTY_HEADER, &property)
        .json(&json!({
            "amount": receipt["total_amount"],
            "method": "card",
            "reference": "PSP-2026-0042",
            "booking_id": booking_id,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let payment_id = res.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let res = client
        .post(format!("{}/payments/{}/status", srv.base_url, payment_id))
        .header(PROPERTY_HEADER, &property)
        .json(&json!({ "status": "succeeded" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Settlement confirms the pending stay without any further request.
    booking_status_eventually(&client, &srv.base_url, &property, &booking_id, "confirmed").await;

    let body: serde_json::Value = client
        .get(format!("{}/payments", srv.base_url))
        .header(PROPERTY_HEADER, &property)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let items = body["items"].as_array().unwrap();
    let payment = items
        .iter()
        .find(|p| p["id"] == payment_id.as_str())
        .expect("payment missing from list");
    assert_eq!(payment["status"], "succeeded");
    assert_eq!(payment["booking_id"].as_str().unwrap(), booking_id);
}

#[tokio::test]
async fn unlinked_payments_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let property = PropertyId::new().to_string();

    let res = client
        .post(format!("{}/payments", srv.base_url))
        .header(PROPERTY_HEADER, &property)
        .json(&json!({ "amount": 10_000, "method": "cash" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn order_lines_price_from_the_menu_at_open_time() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let property = PropertyId::new().to_string();

    let room_id = create_room(&client, &srv.base_url, &property, "408", 30_000).await;

    let res = client
        .post(format!("{}/menu/items", srv.base_url))
        .header(PROPERTY_HEADER, &property)
        .json(&json!({
            "name": "Club Sandwich",
            "category": "food",
            "price": 4_500,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let item_id = res.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    // Wait for the menu projection before ordering off it.
    for _ in 0..50 {
        let body: serde_json::Value = client
            .get(format!("{}/menu/items", srv.base_url))
            .header(PROPERTY_HEADER, &property)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if body["items"]
            .as_array()
            .unwrap()
            .iter()
            .any(|i| i["id"] == item_id.as_str())
        {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let res = client
        .post(format!("{}/orders", srv.base_url))
        .header(PROPERTY_HEADER, &property)
        .json(&json!({
            "room_id": room_id,
            "lines": [{ "menu_item_id": item_id, "quantity": 2 }],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let receipt: serde_json::Value = res.json().await.unwrap();
    assert_eq!(receipt["total_amount"], 9_000);
    assert_eq!(receipt["lines"][0]["unit_price"], 4_500);
    assert_eq!(receipt["status"], "pending");
    let order_id = receipt["id"].as_str().unwrap().to_string();

    // Reprice the item; committed orders keep their snapshot.
    let res = client
        .post(format!("{}/menu/items/{}/price", srv.base_url, item_id))
        .header(PROPERTY_HEADER, &property)
        .json(&json!({ "price": 5_000 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    for _ in 0..50 {
        let body: serde_json::Value = client
            .get(format!("{}/menu/items", srv.base_url))
            .header(PROPERTY_HEADER, &property)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if body["items"]
            .as_array()
            .unwrap()
            .iter()
            .any(|i| i["id"] == item_id.as_str() && i["price"] == 5_000)
        {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let old_order = get_ok_eventually(
        &client,
        &srv.base_url,
        &property,
        &format!("/orders/{}", order_id),
    )
    .await;
    assert_eq!(old_order["total_amount"], 9_000);
    assert_eq!(old_order["lines"][0]["unit_price"], 4_500);

    // A fresh order picks up the new price.
    let res = client
        .post(format!("{}/orders", srv.base_url))
        .header(PROPERTY_HEADER, &property)
        .json(&json!({
            "room_id": room_id,
            "lines": [{ "menu_item_id": item_id, "quantity": 2 }],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let fresh: serde_json::Value = res.json().await.unwrap();
    assert_eq!(fresh["total_amount"], 10_000);

    // Completing an order is final.
    let res = client
        .post(format!("{}/orders/{}/transition", srv.base_url, order_id))
        .header(PROPERTY_HEADER, &property)
        .json(&json!({ "status": "completed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "completed");

    let res = client
        .post(format!("{}/orders/{}/transition", srv.base_url, order_id))
        .header(PROPERTY_HEADER, &property)
        .json(&json!({ "status": "cancelled" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unavailable_menu_items_cannot_be_ordered() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let property = PropertyId::new().to_string();

    let room_id = create_room(&client, &srv.base_url, &property, "409", 30_000).await;

    let res = client
        .post(format!("{}/menu/items", srv.base_url))
        .header(PROPERTY_HEADER, &property)
        .json(&json!({ "name": "Chapman", "category": "drinks", "price": 2_000 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let item_id = res.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let res = client
        .post(format!(
            "{}/menu/items/{}/availability",
            srv.base_url, item_id
        ))
        .header(PROPERTY_HEADER, &property)
        .json(&json!({ "available": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Wait until the projection reflects the 86'd item.
    for _ in 0..50 {
        let body: serde_json::Value = client
            .get(format!("{}/menu/items", srv.base_url))
            .header(PROPERTY_HEADER, &property)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if body["items"]
            .as_array()
            .unwrap()
            .iter()
            .any(|i| i["id"] == item_id.as_str() && i["available"] == false)
        {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let res = client
        .post(format!("{}/orders", srv.base_url))
        .header(PROPERTY_HEADER, &property)
        .json(&json!({
            "room_id": room_id,
            "lines": [{ "menu_item_id": item_id, "quantity": 1 }],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn event_stream_records_the_reservation_paper_trail() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let property = PropertyId::new().to_string();

    let room_id = create_room(&client, &srv.base_url, &property, "606", 35_000).await;
    let res = reserve(
        &client,
        &srv.base_url,
        &property,
        &room_id,
        "Ngozi Eze",
        "2026-11-01",
        "2026-11-03",
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    // Events are written synchronously on dispatch; no projection lag here.
    let body: serde_json::Value = client
        .get(format!(
            "{}/events?aggregate_type=lodging.room",
            srv.base_url
        ))
        .header(PROPERTY_HEADER, &property)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let events = body["events"].as_array().unwrap();
    assert!(events
        .iter()
        .any(|e| e["event_type"] == "lodging.room.registered"));
    assert!(events
        .iter()
        .any(|e| e["event_type"] == "lodging.room.stay_reserved"));
    assert!(events
        .iter()
        .all(|e| e["property_id"] == property.as_str()));

    let body: serde_json::Value = client
        .get(format!("{}/events/aggregates/{}", srv.base_url, room_id))
        .header(PROPERTY_HEADER, &property)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let events = body["events"].as_array().unwrap();
    let sequences: Vec<u64> = events
        .iter()
        .map(|e| e["sequence_number"].as_u64().unwrap())
        .collect();
    let mut sorted = sequences.clone();
    sorted.sort_unstable();
    assert_eq!(sequences, sorted);
    assert_eq!(sequences.first(), Some(&1));

    // Single-event lookup round-trips.
    let event_id = events[0]["event_id"].as_str().unwrap();
    let single: serde_json::Value = client
        .get(format!("{}/events/{}", srv.base_url, event_id))
        .header(PROPERTY_HEADER, &property)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(single["event_id"], event_id);
    assert_eq!(single["event_type"], events[0]["event_type"]);

    // Another property sees an empty stream.
    let other = PropertyId::new().to_string();
    let body: serde_json::Value = client
        .get(format!("{}/events", srv.base_url))
        .header(PROPERTY_HEADER, &other)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 0);
}
