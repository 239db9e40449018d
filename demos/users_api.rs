//! Users API demo
//!
//! Declares a small set of routes with `#[route]`, then drives a few requests
//! through the route table with an in-memory response and prints the results.
//!
//! Run with: `cargo run --example users_api`
//! Set `RUST_LOG=routebind_server=debug` to see dispatch spans.

use routebind::route;
use routebind::server::{BufferedResponse, Error, ObjectId, Registrar, Request, Result, RouteTable};
use routebind::{init_telemetry, TelemetryConfig};
use serde_json::{json, Value};
use store::UserStore;

mod store {
    use parking_lot::Mutex;
    use routebind::server::ObjectId;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::OnceLock;

    /// Process-wide demo storage
    pub struct UserStore;

    fn users() -> &'static Mutex<HashMap<String, Value>> {
        static USERS: OnceLock<Mutex<HashMap<String, Value>>> = OnceLock::new();
        USERS.get_or_init(|| Mutex::new(HashMap::new()))
    }

    impl UserStore {
        pub fn insert(name: &str, age: f64) -> Value {
            let id = ObjectId::new().to_hex();
            let user = json!({ "id": &id, "name": name, "age": age });
            users().lock().insert(id, user.clone());
            user
        }

        pub fn get(id: &ObjectId) -> Option<Value> {
            users().lock().get(&id.to_hex()).cloned()
        }
    }
}

#[route(USE, output = "caller")]
async fn authenticate(authorization: String) -> Result<Value> {
    match authorization.strip_prefix("Bearer ") {
        Some(token) if !token.is_empty() => Ok(json!(token)),
        _ => Err(Error::status(401, "invalid authorization header")),
    }
}

#[route(POST)]
async fn create(caller: String, name: String, age: f64) -> Result<Value> {
    tracing::info!(caller = %caller, name = %name, "Creating user");
    Ok(UserStore::insert(&name, age))
}

#[route(GET)]
async fn find(id: ObjectId) -> Result<Value> {
    UserStore::get(&id).ok_or_else(|| Error::status(404, "user not found"))
}

async fn send(table: &RouteTable, label: &str, request: Request) -> Option<Value> {
    let (response, buffer) = BufferedResponse::handle();
    table.handle(request, response).await;
    println!(
        "{label:<24} {} {}",
        buffer.status_code(),
        String::from_utf8_lossy(&buffer.body_bytes())
    );
    buffer.body_json()
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_telemetry(TelemetryConfig::new("users-api").with_json_logs(false))?;

    let table = Registrar::new("users")
        .route(authenticate())
        .route(create())
        .route(find())
        .build()?;

    let created = send(
        &table,
        "create",
        Request::builder("POST", "/create")
            .header("Authorization", "Bearer admin")
            .body(json!({ "name": "ada", "age": "36" }))
            .build(),
    )
    .await;

    let id = created
        .as_ref()
        .and_then(|user| user.get("id"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    send(
        &table,
        "find",
        Request::builder("GET", "/find")
            .header("Authorization", "Bearer admin")
            .query("id", id)
            .build(),
    )
    .await;

    send(
        &table,
        "find (bad id)",
        Request::builder("GET", "/find")
            .header("Authorization", "Bearer admin")
            .query("id", "not-an-id")
            .build(),
    )
    .await;

    send(
        &table,
        "create (no auth)",
        Request::builder("POST", "/create")
            .body(json!({ "name": "bob", "age": 41 }))
            .build(),
    )
    .await;

    send(
        &table,
        "unknown route",
        Request::builder("GET", "/delete")
            .header("Authorization", "Bearer admin")
            .build(),
    )
    .await;

    Ok(())
}
