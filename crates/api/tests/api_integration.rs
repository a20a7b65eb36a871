//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use common::Locale;
use metrics_exporter_prometheus::PrometheusHandle;
use notifier::{JobReceiver, StatusChangedJob};
use serde_json::{Value, json};
use store::{InMemoryStore, OrderStore, TravelOrderId, TravelOrderStatus, User, UserDirectory};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    store: InMemoryStore,
    jobs: JobReceiver,
    admin: User,
    ana: User,
    bruno: User,
}

async fn setup() -> TestApp {
    let store = InMemoryStore::new();
    let admin = User::admin("Root", "root@example.com");
    let ana = User::new("Ana", "ana@example.com");
    let bruno = User::new("Bruno", "bruno@example.com");
    for user in [&admin, &ana, &bruno] {
        store.upsert_user(user.clone()).await.unwrap();
    }

    let (state, jobs) = api::create_default_state(store.clone(), Locale::En);
    let app = api::create_app(state, get_metrics_handle());

    TestApp {
        app,
        store,
        jobs,
        admin,
        ana,
        bruno,
    }
}

fn days_from_today(days: i64) -> String {
    (Utc::now().date_naive() + Duration::days(days)).to_string()
}

fn order_payload(destination: &str) -> Value {
    json!({
        "requester_name": "Ana Dev",
        "destination": destination,
        "departure_date": days_from_today(5),
        "return_date": days_from_today(10),
    })
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    user: Option<&User>,
    body: Option<String>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user.id.to_string());
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn create_order(test: &TestApp, owner: &User, destination: &str) -> String {
    let (status, json) = send(
        &test.app,
        "POST",
        "/travel-orders",
        Some(owner),
        Some(order_payload(destination).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["data"]["id"].as_str().unwrap().to_string()
}

async fn patch_status(test: &TestApp, caller: &User, id: &str, status: &str) -> (StatusCode, Value) {
    send(
        &test.app,
        "PATCH",
        &format!("/travel-orders/{id}/status"),
        Some(caller),
        Some(json!({ "status": status }).to_string()),
    )
    .await
}

async fn stored_status(test: &TestApp, id: &str) -> TravelOrderStatus {
    let id = TravelOrderId::parse(id).unwrap();
    test.store.find(id).await.unwrap().unwrap().status
}

#[tokio::test]
async fn test_health_check() {
    let test = setup().await;

    let (status, json) = send(&test.app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let test = setup().await;

    let response = test
        .app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

mod authentication {
    use super::*;

    #[tokio::test]
    async fn test_missing_header_is_401() {
        let test = setup().await;

        let (status, json) = send(&test.app, "GET", "/travel-orders", None, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "Unauthenticated.");
    }

    #[tokio::test]
    async fn test_unknown_user_is_401() {
        let test = setup().await;
        let stranger = User::new("Ghost", "ghost@example.com");

        let (status, _) = send(&test.app, "GET", "/travel-orders", Some(&stranger), None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

mod create {
    use super::*;

    #[tokio::test]
    async fn test_creates_requested_order() {
        let test = setup().await;

        let (status, json) = send(
            &test.app,
            "POST",
            "/travel-orders",
            Some(&test.ana),
            Some(order_payload("Recife").to_string()),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["message"], "Your order has been created successfully.");
        assert_eq!(json["data"]["status"], "requested");
        assert_eq!(json["data"]["destination"], "Recife");
        assert_eq!(json["data"]["departure_date"], days_from_today(5));
        assert!(json["data"].get("user").is_none());
        assert_eq!(test.store.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_status_in_body_is_rejected() {
        let test = setup().await;
        let mut payload = order_payload("Recife");
        payload["status"] = json!("approved");

        let (status, json) = send(
            &test.app,
            "POST",
            "/travel-orders",
            Some(&test.ana),
            Some(payload.to_string()),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["errors"]["status"][0], "The status field is prohibited.");
        assert_eq!(test.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_dates_report_every_field() {
        let test = setup().await;
        let payload = json!({
            "requester_name": "Ana",
            "destination": "Recife",
            "departure_date": days_from_today(-1),
            "return_date": days_from_today(-2),
        });

        let (status, json) = send(
            &test.app,
            "POST",
            "/travel-orders",
            Some(&test.ana),
            Some(payload.to_string()),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json["errors"]["departure_date"].is_array());
        assert!(json["errors"]["return_date"].is_array());
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let test = setup().await;

        let (status, _) = send(
            &test.app,
            "POST",
            "/travel-orders",
            Some(&test.ana),
            Some("{not json".to_string()),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

mod show {
    use super::*;

    #[tokio::test]
    async fn test_owner_and_admin_can_view_but_others_cannot() {
        let test = setup().await;
        let id = create_order(&test, &test.ana, "Recife").await;
        let uri = format!("/travel-orders/{id}");

        let (status, json) = send(&test.app, "GET", &uri, Some(&test.ana), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["id"], id.as_str());

        let (status, _) = send(&test.app, "GET", &uri, Some(&test.admin), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = send(&test.app, "GET", &uri, Some(&test.bruno), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"], "This action is unauthorized.");
    }

    #[tokio::test]
    async fn test_missing_and_malformed_ids_are_404() {
        let test = setup().await;

        let uri = format!("/travel-orders/{}", TravelOrderId::new());
        let (status, _) = send(&test.app, "GET", &uri, Some(&test.admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&test.app, "GET", "/travel-orders/42", Some(&test.admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_deleted_orders_are_404() {
        let test = setup().await;
        let id = create_order(&test, &test.ana, "Recife").await;
        test.store
            .soft_delete(TravelOrderId::parse(&id).unwrap())
            .await
            .unwrap();

        let uri = format!("/travel-orders/{id}");
        let (status, _) = send(&test.app, "GET", &uri, Some(&test.ana), None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_include_user_embeds_owner() {
        let test = setup().await;
        let id = create_order(&test, &test.ana, "Recife").await;

        let uri = format!("/travel-orders/{id}?include=user");
        let (status, json) = send(&test.app, "GET", &uri, Some(&test.admin), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["user"]["email"], "ana@example.com");
        assert!(json["data"]["user"].get("is_admin").is_none());

        let uri = format!("/travel-orders/{id}?include=approver");
        let (status, _) = send(&test.app, "GET", &uri, Some(&test.admin), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

mod list {
    use super::*;

    async fn seeded() -> TestApp {
        let test = setup().await;
        create_order(&test, &test.ana, "Recife").await;
        create_order(&test, &test.ana, "Porto Alegre").await;
        create_order(&test, &test.bruno, "Recife").await;
        test
    }

    fn owners(json: &Value) -> Vec<String> {
        json["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["user"]["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_non_admin_only_sees_own_orders() {
        let test = seeded().await;

        let (status, json) = send(
            &test.app,
            "GET",
            "/travel-orders?include=user&filter%5Bdestination%5D=recife",
            Some(&test.ana),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(owners(&json), vec![test.ana.id.to_string()]);
        assert_eq!(json["meta"]["total"], 1);
    }

    #[tokio::test]
    async fn test_admin_sees_everyone() {
        let test = seeded().await;

        let (status, json) = send(
            &test.app,
            "GET",
            "/travel-orders?include=user",
            Some(&test.admin),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["meta"]["total"], 3);
        let owners = owners(&json);
        assert!(owners.contains(&test.ana.id.to_string()));
        assert!(owners.contains(&test.bruno.id.to_string()));
    }

    #[tokio::test]
    async fn test_pagination_meta_and_links() {
        let test = seeded().await;

        let (status, json) = send(
            &test.app,
            "GET",
            "/travel-orders?page=2&page.size=2&sort=destination",
            Some(&test.admin),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
        assert_eq!(json["meta"]["current_page"], 2);
        assert_eq!(json["meta"]["per_page"], 2);
        assert_eq!(json["meta"]["last_page"], 2);
        assert_eq!(json["meta"]["from"], 3);
        assert_eq!(json["meta"]["path"], "/travel-orders");
        assert_eq!(
            json["links"]["prev"],
            "/travel-orders?sort=destination&page.size=2&page=1"
        );
        assert!(json["links"]["next"].is_null());
    }

    #[tokio::test]
    async fn test_bracketed_page_size_and_extra_parameters_are_accepted() {
        let test = seeded().await;

        let (status, json) = send(
            &test.app,
            "GET",
            "/travel-orders?page%5Bsize%5D=2&page=1&_=1700000000",
            Some(&test.admin),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["meta"]["current_page"], 1);
        assert_eq!(json["meta"]["per_page"], 2);
        assert_eq!(json["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_filter_is_400_naming_it() {
        let test = seeded().await;

        let (status, json) = send(
            &test.app,
            "GET",
            "/travel-orders?filter%5Buser_id%5D=1",
            Some(&test.ana),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("`user_id`"));
    }

    #[tokio::test]
    async fn test_invalid_status_filter_is_422() {
        let test = seeded().await;

        let (status, json) = send(
            &test.app,
            "GET",
            "/travel-orders?filter%5Bstatus%5D=shipped",
            Some(&test.ana),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json["errors"]["filter.status"].is_array());
    }
}

mod update_status {
    use super::*;

    #[tokio::test]
    async fn test_admin_approves_and_job_is_enqueued() {
        let mut test = setup().await;
        let id = create_order(&test, &test.ana, "Recife").await;

        let (status, json) = patch_status(&test, &test.admin, &id, "approved").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json["message"],
            "Travel order status has been updated successfully."
        );
        assert_eq!(json["data"]["status"], "approved");
        assert_eq!(stored_status(&test, &id).await, TravelOrderStatus::Approved);

        let job = test.jobs.try_recv().unwrap();
        assert_eq!(
            job,
            StatusChangedJob::new(
                TravelOrderId::parse(&id).unwrap(),
                TravelOrderStatus::Requested,
                TravelOrderStatus::Approved,
            )
        );
    }

    #[tokio::test]
    async fn test_non_admin_is_forbidden() {
        let mut test = setup().await;
        let id = create_order(&test, &test.ana, "Recife").await;

        let (status, _) = patch_status(&test, &test.ana, &id, "approved").await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(stored_status(&test, &id).await, TravelOrderStatus::Requested);
        assert!(test.jobs.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_only_terminal_targets_are_accepted() {
        let test = setup().await;
        let id = create_order(&test, &test.ana, "Recife").await;

        let (status, json) = patch_status(&test, &test.admin, &id, "requested").await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json["errors"]["status"].is_array());
    }

    #[tokio::test]
    async fn test_cannot_cancel_approved_order() {
        let mut test = setup().await;
        let id = create_order(&test, &test.ana, "Recife").await;
        patch_status(&test, &test.admin, &id, "approved").await;
        test.jobs.try_recv().unwrap();

        let (status, json) = patch_status(&test, &test.admin, &id, "canceled").await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            json["errors"]["status"][0],
            "Cannot cancel an already-approved order."
        );
        assert_eq!(stored_status(&test, &id).await, TravelOrderStatus::Approved);
        assert!(test.jobs.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_repeating_a_status_is_a_noop_without_notification() {
        let mut test = setup().await;
        let id = create_order(&test, &test.ana, "Recife").await;
        patch_status(&test, &test.admin, &id, "canceled").await;
        test.jobs.try_recv().unwrap();

        let (status, json) = patch_status(&test, &test.admin, &id, "canceled").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "canceled");
        assert!(test.jobs.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_order_is_404_before_authorization() {
        let test = setup().await;
        let id = TravelOrderId::new().to_string();

        let (status, _) = patch_status(&test, &test.ana, &id, "approved").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
