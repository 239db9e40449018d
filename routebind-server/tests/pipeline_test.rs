//! Request pipeline integration tests

use routebind_server::{
    from_fn, from_sync_fn, BoundArgs, BufferedResponse, DispatchMetrics, Error, ObjectId,
    ParamKind, ParamSource, Registrar, Request, ResponseHandle, Route, RouteTable,
};
use opentelemetry::metrics::MeterProvider;
use opentelemetry_sdk::metrics::data::{AggregatedMetrics, MetricData};
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, PeriodicReader, SdkMeterProvider};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

async fn send(table: &RouteTable, request: Request) -> BufferedResponse {
    let (response, buffer) = BufferedResponse::handle();
    table.handle(request, response).await;
    buffer
}

fn find_route(calls: Arc<AtomicUsize>) -> Route {
    Route::get("find")
        .param("param1", ParamKind::String)
        .param("param2", ParamKind::Number)
        .handler(from_fn(move |mut args: BoundArgs| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let param1: String = args.take(0)?;
                let param2: f64 = args.take(1)?;
                Ok(json!({"param1": param1, "param2": param2}))
            }
        }))
}

#[tokio::test]
async fn test_get_binds_and_coerces_query() {
    let calls = Arc::new(AtomicUsize::new(0));
    let table = Registrar::new("svc")
        .route(find_route(Arc::clone(&calls)))
        .build()
        .unwrap();

    let buffer = send(
        &table,
        Request::builder("GET", "/find")
            .query("param1", "a")
            .query("param2", "5")
            .build(),
    )
    .await;

    assert_eq!(buffer.status_code(), 200);
    assert_eq!(buffer.body_json(), Some(json!({"param1": "a", "param2": 5.0})));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_validation_failure_skips_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let table = Registrar::new("svc")
        .route(find_route(Arc::clone(&calls)))
        .build()
        .unwrap();

    let buffer = send(
        &table,
        Request::builder("GET", "/find")
            .query("param1", "a")
            .query("param2", "x")
            .build(),
    )
    .await;

    assert_eq!(buffer.status_code(), 400);
    assert_eq!(
        buffer.body_json(),
        Some(json!({"error": "Parameter param2 should be a number"}))
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_parameter_is_400() {
    let calls = Arc::new(AtomicUsize::new(0));
    let table = Registrar::new("svc")
        .route(find_route(Arc::clone(&calls)))
        .build()
        .unwrap();

    let buffer = send(&table, Request::builder("GET", "/find").query("param1", "a").build()).await;

    assert_eq!(buffer.status_code(), 400);
    assert_eq!(
        buffer.body_json(),
        Some(json!({"error": "Missing parameter param2 in svc.find"}))
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_middleware_merge_feeds_later_route() {
    let table = Registrar::new("svc")
        .route(
            Route::middleware("authenticate")
                .param("headerVal", ParamKind::String)
                .handler(from_fn(|mut args: BoundArgs| async move {
                    let token: String = args.take(0)?;
                    assert_eq!(token, "secret");
                    Ok(json!({"user": "u1"}))
                })),
        )
        .route(
            Route::get("profile")
                .param("user", ParamKind::String)
                .handler(from_fn(|mut args: BoundArgs| async move {
                    let user: String = args.take(0)?;
                    Ok(json!({"user": user}))
                })),
        )
        .build()
        .unwrap();

    // `user` is neither in the query nor in the headers
    let buffer = send(
        &table,
        Request::builder("GET", "/profile")
            .header("HeaderVal", "secret")
            .build(),
    )
    .await;

    assert_eq!(buffer.status_code(), 200);
    assert_eq!(buffer.body_json(), Some(json!({"user": "u1"})));
}

#[tokio::test]
async fn test_middleware_output_key() {
    let table = Registrar::new("svc")
        .route(
            Route::middleware("session")
                .output_key("session")
                .handler(from_sync_fn(|_| Ok(json!({"id": 7, "role": "admin"})))),
        )
        .route(
            Route::get("whoami")
                .param("session", ParamKind::Any)
                .handler(from_fn(|args: BoundArgs| async move {
                    Ok(args.value("session").unwrap_or_default())
                })),
        )
        .build()
        .unwrap();

    let buffer = send(&table, Request::builder("GET", "/whoami").build()).await;
    assert_eq!(buffer.body_json(), Some(json!({"id": 7, "role": "admin"})));
}

#[tokio::test]
async fn test_context_is_per_request() {
    let table = Registrar::new("svc")
        .route(
            Route::middleware("tag")
                .param("x-tag", ParamKind::String)
                .output_key("tag")
                .handler(from_fn(|args: BoundArgs| async move {
                    Ok(args.value("x-tag").unwrap_or_default())
                })),
        )
        .route(
            Route::get("tag")
                .param("tag", ParamKind::String)
                .handler(from_fn(|args: BoundArgs| async move {
                    Ok(args.value("tag").unwrap_or_default())
                })),
        )
        .build()
        .unwrap();

    let (first, second) = tokio::join!(
        send(&table, Request::builder("GET", "/tag").header("X-Tag", "one").build()),
        send(&table, Request::builder("GET", "/tag").header("X-Tag", "two").build()),
    );
    assert_eq!(first.body_json(), Some(json!("one")));
    assert_eq!(second.body_json(), Some(json!("two")));
}

#[tokio::test]
async fn test_middleware_failure_stops_pipeline() {
    let reached = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&reached);
    let table = Registrar::new("svc")
        .route(
            Route::middleware("deny")
                .handler(from_fn(|_| async { Err(Error::status(401, "unauthorized")) })),
        )
        .route(Route::get("secret").handler(from_fn(move |_| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!("secret"))
            }
        })))
        .build()
        .unwrap();

    let buffer = send(&table, Request::builder("GET", "/secret").build()).await;
    assert_eq!(buffer.status_code(), 401);
    assert_eq!(buffer.body_json(), Some(json!({"error": "unauthorized"})));
    assert_eq!(reached.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_handler_error_status() {
    let table = Registrar::new("svc")
        .route(
            Route::get("lookup")
                .handler(from_fn(|_| async { Err(Error::status(404, "not found")) })),
        )
        .route(Route::get("crash").handler(from_fn(|_| async { Err(Error::handler("boom")) })))
        .build()
        .unwrap();

    let buffer = send(&table, Request::builder("GET", "/lookup").build()).await;
    assert_eq!(buffer.status_code(), 404);
    assert_eq!(buffer.body_json(), Some(json!({"error": "not found"})));

    let buffer = send(&table, Request::builder("GET", "/crash").build()).await;
    assert_eq!(buffer.status_code(), 500);
    assert_eq!(buffer.body_json(), Some(json!({"error": "boom"})));
}

#[tokio::test]
async fn test_response_binding_suppresses_automatic_writes() {
    let table = Registrar::new("svc")
        .route(
            Route::get("download")
                .param("res", ParamKind::Any)
                .handler(from_fn(|mut args: BoundArgs| async move {
                    let res: ResponseHandle = args.take(0)?;
                    res.send_raw(b"file-bytes")?;
                    res.end()?;
                    Ok(json!({"ignored": true}))
                })),
        )
        .route(
            Route::get("silent")
                .param("res", ParamKind::Any)
                .handler(from_fn(|_| async { Err(Error::status(418, "teapot")) })),
        )
        .build()
        .unwrap();

    let buffer = send(&table, Request::builder("GET", "/download").build()).await;
    assert_eq!(buffer.body_bytes(), b"file-bytes".to_vec());
    assert_eq!(buffer.status_code(), 200);

    // Failure after taking `res` is only logged
    let buffer = send(&table, Request::builder("GET", "/silent").build()).await;
    assert!(!buffer.is_sent());
    assert!(buffer.body_bytes().is_empty());
}

#[tokio::test]
async fn test_error_after_partial_write_uses_raw_fallback() {
    let table = Registrar::new("svc")
        .route(
            Route::get("stream")
                .param("req", ParamKind::Any)
                .handler(from_fn(|_| async { Err(Error::handler("late failure")) })),
        )
        .build()
        .unwrap();

    let (response, buffer) = BufferedResponse::handle();
    response.send_raw(b"chunk;").unwrap();
    table
        .handle(Request::builder("GET", "/stream").build(), response)
        .await;

    assert_eq!(
        buffer.body_bytes(),
        b"chunk;{\"error\":\"late failure\"}".to_vec()
    );
    assert!(buffer.is_ended());
}

#[tokio::test]
async fn test_post_reads_body_and_typed_values() {
    let table = Registrar::new("users")
        .route(
            Route::post("create")
                .param("ownerId", ParamKind::ObjectId)
                .param("active", ParamKind::Boolean)
                .param("born", ParamKind::Date)
                .param("tags", ParamKind::JsonArray)
                .handler(from_fn(|mut args: BoundArgs| async move {
                    let owner: ObjectId = args.take(0)?;
                    let active: bool = args.take(1)?;
                    let born: chrono::DateTime<chrono::Utc> = args.take(2)?;
                    let tags: Vec<Value> = args.take(3)?;
                    Ok(json!({
                        "owner": owner.to_hex(),
                        "active": active,
                        "year": born.format("%Y").to_string(),
                        "tags": tags.len(),
                    }))
                })),
        )
        .build()
        .unwrap();

    let buffer = send(
        &table,
        Request::builder("POST", "/create")
            .body(json!({
                "ownerId": "507f1f77bcf86cd799439011",
                "active": "1",
                "born": "1990-05-17",
                "tags": "[\"a\",\"b\"]",
            }))
            .build(),
    )
    .await;

    assert_eq!(buffer.status_code(), 200);
    assert_eq!(
        buffer.body_json(),
        Some(json!({
            "owner": "507f1f77bcf86cd799439011",
            "active": true,
            "year": "1990",
            "tags": 2,
        }))
    );
}

#[tokio::test]
async fn test_invalid_object_id_is_400() {
    let table = Registrar::new("users")
        .route(
            Route::get("byId")
                .param("id", ParamKind::ObjectId)
                .handler(from_fn(|_| async { Ok(Value::Null) })),
        )
        .build()
        .unwrap();

    let buffer = send(&table, Request::builder("GET", "/byId").query("id", "xyz").build()).await;
    assert_eq!(buffer.status_code(), 400);
    assert_eq!(
        buffer.body_json(),
        Some(json!({"error": "Parameter id should be a valid ObjectId"}))
    );
}

#[tokio::test]
async fn test_configured_source_overrides_default() {
    let table = Registrar::new("svc")
        .route(
            Route::get("search")
                .source(ParamSource::Headers)
                .param("X-Query", ParamKind::String)
                .handler(from_fn(|args: BoundArgs| async move {
                    Ok(args.value("X-Query").unwrap_or_default())
                })),
        )
        .build()
        .unwrap();

    let buffer = send(
        &table,
        Request::builder("GET", "/search").header("x-query", "rust").build(),
    )
    .await;
    assert_eq!(buffer.body_json(), Some(json!("rust")));

    // The query string is not consulted
    let buffer = send(
        &table,
        Request::builder("GET", "/search").query("X-Query", "rust").build(),
    )
    .await;
    assert_eq!(buffer.status_code(), 400);
}

#[tokio::test]
async fn test_middleware_only_pipeline_ends_in_404() {
    let table = Registrar::new("svc")
        .route(Route::middleware("noop").handler(from_sync_fn(|_| Ok(Value::Null))))
        .build()
        .unwrap();

    let buffer = send(&table, Request::builder("GET", "/nowhere").build()).await;
    assert_eq!(buffer.status_code(), 404);
    assert_eq!(
        buffer.body_json(),
        Some(json!({"error": "Cannot GET /nowhere"}))
    );
}

fn counter_points(
    exporter: &InMemoryMetricExporter,
    name: &str,
    label: &str,
) -> Vec<(String, u64)> {
    let mut points = Vec::new();
    for resource in &exporter.get_finished_metrics().unwrap() {
        for scope in resource.scope_metrics() {
            for metric in scope.metrics().filter(|m| m.name() == name) {
                if let AggregatedMetrics::U64(MetricData::Sum(sum)) = metric.data() {
                    for point in sum.data_points() {
                        let value = point
                            .attributes()
                            .find(|kv| kv.key.as_str() == label)
                            .map(|kv| kv.value.to_string())
                            .unwrap_or_default();
                        points.push((value, point.value()));
                    }
                }
            }
        }
    }
    points.sort();
    points
}

#[tokio::test]
async fn test_metrics_record_outcomes_and_binding_failures() {
    let exporter = InMemoryMetricExporter::default();
    let provider = SdkMeterProvider::builder()
        .with_reader(PeriodicReader::builder(exporter.clone()).build())
        .build();
    let metrics = Arc::new(DispatchMetrics::new_with_meter(&provider.meter("pipeline-test")));

    let calls = Arc::new(AtomicUsize::new(0));
    let table = Registrar::new("svc")
        .with_metrics(metrics)
        .route(find_route(calls))
        .build()
        .unwrap();

    let ok = send(
        &table,
        Request::builder("GET", "/find")
            .query("param1", "a")
            .query("param2", "1")
            .build(),
    )
    .await;
    let missing = send(&table, Request::builder("GET", "/find").build()).await;
    let invalid = send(
        &table,
        Request::builder("GET", "/find")
            .query("param1", "a")
            .query("param2", "x")
            .build(),
    )
    .await;

    assert_eq!(ok.status_code(), 200);
    assert_eq!(missing.status_code(), 400);
    assert_eq!(invalid.status_code(), 400);

    provider.force_flush().unwrap();
    assert_eq!(
        counter_points(&exporter, "routebind.dispatch.requests.total", "outcome"),
        vec![("bad_request".to_string(), 2), ("ok".to_string(), 1)]
    );
    assert_eq!(
        counter_points(&exporter, "routebind.dispatch.binding_failures.total", "kind"),
        vec![("missing".to_string(), 1), ("validation".to_string(), 1)]
    );
    provider.shutdown().unwrap();
}
