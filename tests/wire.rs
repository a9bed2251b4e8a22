use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, Config, NoTls, SimpleQueryMessage, SimpleQueryRow};

use fleetbook::engine::Engine;
use fleetbook::wire;

// ── Test infrastructure ──────────────────────────────────────

async fn start_test_server() -> (SocketAddr, Arc<Engine>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let engine = Arc::new(Engine::new());

    let engine2 = engine.clone();
    tokio::spawn(async move {
        loop {
            let (socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let engine = engine2.clone();
            tokio::spawn(async move {
                let _ = wire::process_connection(socket, engine).await;
            });
        }
    });

    (addr, engine)
}

async fn connect(addr: SocketAddr) -> Client {
    let mut config = Config::new();
    config
        .host(addr.ip().to_string())
        .port(addr.port())
        .dbname("fleet")
        .user("fleetbook");

    let (client, connection) = config.connect(NoTls).await.unwrap();
    tokio::spawn(async move {
        let _ = connection.await;
    });
    client
}

async fn rows(client: &Client, sql: &str) -> Vec<SimpleQueryRow> {
    client
        .simple_query(sql)
        .await
        .unwrap()
        .into_iter()
        .filter_map(|msg| match msg {
            SimpleQueryMessage::Row(row) => Some(row),
            _ => None,
        })
        .collect()
}

fn col<'a>(row: &'a SimpleQueryRow, name: &str) -> &'a str {
    row.get(name).unwrap()
}

async fn add_vehicle(client: &Client, model: &str, size: &str, price: f64) -> String {
    let inserted = rows(
        client,
        &format!(
            "INSERT INTO vehicles (model, size, price_per_day) VALUES ('{model}', '{size}', {price})"
        ),
    )
    .await;
    assert_eq!(inserted.len(), 1);
    col(&inserted[0], "id").to_string()
}

async fn reserve(client: &Client, id: &str, pickup: &str, ret: &str) -> Result<String, tokio_postgres::Error> {
    let messages = client
        .simple_query(&format!(
            "INSERT INTO reservations (vehicle_id, pickup_date, return_date) VALUES ('{id}', '{pickup}', '{ret}')"
        ))
        .await?;
    let row = messages
        .into_iter()
        .find_map(|msg| match msg {
            SimpleQueryMessage::Row(row) => Some(row),
            _ => None,
        })
        .unwrap();
    Ok(col(&row, "id").to_string())
}

// ── Catalog over the wire ────────────────────────────────────

#[tokio::test]
async fn insert_vehicle_returns_row() {
    let (addr, engine) = start_test_server().await;
    let client = connect(addr).await;

    let inserted = rows(
        &client,
        "INSERT INTO vehicles (model, size, price_per_day) VALUES ('hyundai', 'MIN', 100.5)",
    )
    .await;
    assert_eq!(inserted.len(), 1);
    assert_eq!(col(&inserted[0], "model"), "hyundai");
    assert_eq!(col(&inserted[0], "size"), "min");
    assert_eq!(col(&inserted[0], "price_per_day").parse::<f64>().unwrap(), 100.5);
    assert_eq!(engine.vehicle_count(), 1);
}

#[tokio::test]
async fn select_vehicles_all_and_by_size() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;

    let hyundai = add_vehicle(&client, "hyundai", "min", 100.0).await;
    let camaro = add_vehicle(&client, "camaro", "large", 250.0).await;

    let all = rows(&client, "SELECT * FROM vehicles").await;
    let ids: Vec<_> = all.iter().map(|r| col(r, "id")).collect();
    assert_eq!(ids, vec![hyundai.as_str(), camaro.as_str()]);

    let large = rows(&client, "SELECT * FROM vehicles WHERE size = 'large'").await;
    assert_eq!(large.len(), 1);
    assert_eq!(col(&large[0], "id"), camaro);

    let mid = rows(&client, "SELECT * FROM vehicles WHERE size = 'mid'").await;
    assert!(mid.is_empty());
}

#[tokio::test]
async fn update_price_and_delete() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;
    let id = add_vehicle(&client, "lada", "mid", 10.0).await;

    client
        .simple_query(&format!(
            "UPDATE vehicles SET price_per_day = 100 WHERE id = '{id}'"
        ))
        .await
        .unwrap();
    let listed = rows(&client, "SELECT * FROM vehicles").await;
    assert_eq!(col(&listed[0], "price_per_day").parse::<f64>().unwrap(), 100.0);

    client
        .simple_query(&format!("DELETE FROM vehicles WHERE id = '{id}'"))
        .await
        .unwrap();
    assert!(rows(&client, "SELECT * FROM vehicles").await.is_empty());
}

#[tokio::test]
async fn update_with_bound_parameters() {
    let (addr, engine) = start_test_server().await;
    let client = connect(addr).await;
    let id = add_vehicle(&client, "lada", "mid", 10.0).await;

    let updated = client
        .execute(
            "UPDATE vehicles SET price_per_day = $1 WHERE id = $2",
            &[&"42.5", &id.as_str()],
        )
        .await
        .unwrap();
    assert_eq!(updated, 1);

    let vehicle = engine.get_vehicle(&id.as_str().into()).unwrap();
    assert_eq!(vehicle.price_per_day, 42.5);
}

#[tokio::test]
async fn unknown_vehicle_is_no_data() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;

    let err = client
        .simple_query("UPDATE vehicles SET price_per_day = 1 WHERE id = 'ghost'")
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(&SqlState::NO_DATA));

    let err = client
        .simple_query("DELETE FROM vehicles WHERE id = 'ghost'")
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(&SqlState::NO_DATA));
}

#[tokio::test]
async fn negative_price_is_invalid_parameter() {
    let (addr, engine) = start_test_server().await;
    let client = connect(addr).await;

    let err = client
        .simple_query("INSERT INTO vehicles (model, size, price_per_day) VALUES ('lada', 'mid', -5)")
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(&SqlState::INVALID_PARAMETER_VALUE));
    assert_eq!(engine.vehicle_count(), 0);
}

#[tokio::test]
async fn malformed_statements_are_syntax_errors() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;

    for sql in [
        "SELECT * FROM cars",
        "INSERT INTO vehicles (model, size, price_per_day) VALUES ('truck', 'huge', 1)",
        "SELECT * FROM availability WHERE pickup_date >= '2024-02-22' AND return_date <= '2024-02-20'",
        "SELECT * FROM availability WHERE pickup_date >= '2024-02-20'",
    ] {
        let err = client.simple_query(sql).await.unwrap_err();
        assert_eq!(err.code(), Some(&SqlState::SYNTAX_ERROR), "{sql}");
    }
}

// ── Reservations over the wire ───────────────────────────────

#[tokio::test]
async fn reserve_then_conflict() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;
    let id = add_vehicle(&client, "hyundai", "min", 100.0).await;

    let window = "pickup_date >= '2024-02-20' AND return_date <= '2024-02-22'";
    let free = rows(&client, &format!("SELECT * FROM availability WHERE {window}")).await;
    assert_eq!(free.len(), 1);

    reserve(&client, &id, "2024-02-20", "2024-02-22").await.unwrap();

    let free = rows(&client, &format!("SELECT * FROM availability WHERE {window}")).await;
    assert!(free.is_empty());

    // Touching the return date still conflicts.
    let err = reserve(&client, &id, "2024-02-22", "2024-02-25")
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(&SqlState::EXCLUSION_VIOLATION));

    reserve(&client, &id, "2024-02-23", "2024-02-25").await.unwrap();

    let booked = rows(
        &client,
        &format!("SELECT * FROM reservations WHERE vehicle_id = '{id}'"),
    )
    .await;
    let pickups: Vec<_> = booked.iter().map(|r| col(r, "pickup_date")).collect();
    assert_eq!(pickups, vec!["2024-02-20", "2024-02-23"]);
    assert!(booked.iter().all(|r| col(r, "vehicle_id") == id));
}

#[tokio::test]
async fn availability_with_size_filter() {
    let (addr, _engine) = start_test_server().await;
    let client = connect(addr).await;
    let min_a = add_vehicle(&client, "hyundai", "min", 100.0).await;
    let min_b = add_vehicle(&client, "kia", "min", 90.0).await;
    add_vehicle(&client, "camaro", "large", 250.0).await;

    reserve(&client, &min_a, "2024-02-20", "2024-02-22").await.unwrap();

    let free = rows(
        &client,
        "SELECT * FROM availability WHERE size = 'min' AND pickup_date >= '2024-02-21' AND return_date <= '2024-02-21'",
    )
    .await;
    let ids: Vec<_> = free.iter().map(|r| col(r, "id")).collect();
    assert_eq!(ids, vec![min_b.as_str()]);
}

#[tokio::test]
async fn delete_vehicle_drops_its_reservations() {
    let (addr, engine) = start_test_server().await;
    let client = connect(addr).await;
    let id = add_vehicle(&client, "volvo", "large", 150.0).await;
    reserve(&client, &id, "2024-02-20", "2024-02-22").await.unwrap();

    client
        .simple_query(&format!("DELETE FROM vehicles WHERE id = '{id}'"))
        .await
        .unwrap();

    let booked = rows(
        &client,
        &format!("SELECT * FROM reservations WHERE vehicle_id = '{id}'"),
    )
    .await;
    assert!(booked.is_empty());
    assert!(engine.get_reservations(&id.as_str().into()).await.is_empty());
}

#[tokio::test]
async fn concurrent_clients_single_winner() {
    let (addr, engine) = start_test_server().await;
    let setup = connect(addr).await;
    let id = add_vehicle(&setup, "hyundai", "min", 100.0).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            let client = connect(addr).await;
            reserve(&client, &id, "2024-02-20", "2024-02-22").await
        }));
    }

    let mut wins = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => wins += 1,
            Err(e) => assert_eq!(e.code(), Some(&SqlState::EXCLUSION_VIOLATION)),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(engine.get_reservations(&id.as_str().into()).await.len(), 1);
}
