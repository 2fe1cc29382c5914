mod helpers;

use axum::http::StatusCode;
use cashflow_storage::StorageOp;
use helpers::{api_path, setup_memory_app};
use serde_json::{json, Value};

#[tokio::test]
async fn create_without_receipt() {
    let app = setup_memory_app();

    let response = app
        .client()
        .post(&api_path("/transactions"))
        .json(&json!({
            "date": "2024-03-05",
            "amount": 42.5,
            "type": "spending",
            "description": "groceries"
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["type"], "spending");
    assert_eq!(body["date"], "2024-03-05");
    assert_eq!(body["amount"].as_f64(), Some(42.5));
    assert_eq!(body["description"], "groceries");
    assert!(body.get("image_url").is_none());
    assert!(body.get("image_key").is_none());
}

#[tokio::test]
async fn create_with_receipt_promotes_and_links_upload() {
    let app = setup_memory_app();
    let (upload_id, staging_key) = app.staged_receipt().await;

    let response = app
        .client()
        .post(&api_path("/transactions"))
        .json(&json!({
            "date": "2024-03-06",
            "amount": 12,
            "type": "spending",
            "upload_id": upload_id
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    let image_key = body["image_key"].as_str().unwrap();
    assert!(image_key.starts_with("transactions/"));
    assert_eq!(image_key, staging_key.replacen("staging/", "transactions/", 1));
    assert!(body["image_url"].as_str().unwrap().contains(image_key));
    assert_eq!(body["upload_id"], upload_id.as_str());

    let keys = app.storage.keys().await;
    assert!(keys.contains(&image_key.to_string()));
    assert!(!keys.contains(&staging_key));

    let status: Value = app
        .client()
        .get(&api_path(&format!("/uploads/{}", upload_id)))
        .await
        .json();
    assert_eq!(status["status"], "completed");
}

#[tokio::test]
async fn reusing_an_upload_is_rejected() {
    let app = setup_memory_app();
    let (upload_id, _) = app.staged_receipt().await;
    let request = json!({
        "date": "2024-03-06",
        "amount": 12,
        "type": "spending",
        "upload_id": upload_id
    });

    app.client()
        .post(&api_path("/transactions"))
        .json(&request)
        .await
        .assert_status(StatusCode::CREATED);

    let response = app
        .client()
        .post(&api_path("/transactions"))
        .json(&request)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("already linked"));

    let list: Value = app.client().get(&api_path("/transactions")).await.json();
    assert_eq!(list["total"], 1);
}

#[tokio::test]
async fn upload_that_never_arrived_is_rejected() {
    let app = setup_memory_app();
    let (upload_id, _) = app.request_upload("image/png", 100).await;

    let response = app
        .client()
        .post(&api_path("/transactions"))
        .json(&json!({
            "date": "2024-03-06",
            "amount": 5,
            "type": "spending",
            "upload_id": upload_id
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("uploaded file not found"));
}

#[tokio::test]
async fn receipt_stored_with_wrong_content_type_is_rejected() {
    let app = setup_memory_app();
    let (upload_id, staging_key) = app.request_upload("image/png", 100).await;
    app.put_object(&staging_key, 100, "text/html").await;

    let response = app
        .client()
        .post(&api_path("/transactions"))
        .json(&json!({
            "date": "2024-03-06",
            "amount": 5,
            "type": "spending",
            "upload_id": upload_id
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(app.storage.keys().await.is_empty());

    let status: Value = app
        .client()
        .get(&api_path(&format!("/uploads/{}", upload_id)))
        .await
        .json();
    assert_eq!(status["status"], "failed");

    let list: Value = app.client().get(&api_path("/transactions")).await.json();
    assert_eq!(list["total"], 0);
}

#[tokio::test]
async fn unknown_upload_id_is_rejected() {
    let app = setup_memory_app();

    let response = app
        .client()
        .post(&api_path("/transactions"))
        .json(&json!({
            "date": "2024-03-06",
            "amount": 5,
            "type": "earning",
            "upload_id": "0d4b1f4e-0000-0000-0000-000000000000"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("invalid upload_id"));
}

#[tokio::test]
async fn failed_copy_is_502_and_upload_stays_usable() {
    let app = setup_memory_app();
    let (upload_id, _) = app.staged_receipt().await;
    let request = json!({
        "date": "2024-03-06",
        "amount": 12,
        "type": "spending",
        "upload_id": upload_id
    });

    app.storage.fail(StorageOp::Copy).await;
    app.client()
        .post(&api_path("/transactions"))
        .json(&request)
        .await
        .assert_status(StatusCode::BAD_GATEWAY);

    app.storage.recover(StorageOp::Copy).await;
    app.client()
        .post(&api_path("/transactions"))
        .json(&request)
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn create_validates_fields() {
    let app = setup_memory_app();

    for body in [
        json!({ "date": "2024-03-05", "amount": 0, "type": "spending" }),
        json!({ "date": "2024-03-05", "amount": -3, "type": "earning" }),
        json!({ "date": "2024-03-05", "amount": 3, "type": "refund" }),
        json!({ "date": "05/03/2024", "amount": 3, "type": "spending" }),
        json!({ "date": "2024-03-05", "amount": 3, "type": "spending", "description": "x".repeat(1001) }),
    ] {
        let response = app
            .client()
            .post(&api_path("/transactions"))
            .json(&body)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn list_is_paginated_and_clamped() {
    let app = setup_memory_app();
    for day in 1..=3 {
        app.client()
            .post(&api_path("/transactions"))
            .json(&json!({
                "date": format!("2024-04-0{}", day),
                "amount": day,
                "type": "earning"
            }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let page: Value = app
        .client()
        .get(&api_path("/transactions"))
        .add_query_param("limit", 2)
        .await
        .json();
    assert_eq!(page["total"], 3);
    assert_eq!(page["limit"], 2);
    assert_eq!(page["offset"], 0);
    assert_eq!(page["transactions"].as_array().unwrap().len(), 2);
    assert_eq!(page["transactions"][0]["date"], "2024-04-03");

    let page: Value = app
        .client()
        .get(&api_path("/transactions"))
        .add_query_param("limit", 1000)
        .add_query_param("offset", 2)
        .await
        .json();
    assert_eq!(page["limit"], 100);
    assert_eq!(page["transactions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn monthly_aggregate_sums_one_month() {
    let app = setup_memory_app();
    for (date, amount, kind) in [
        ("2024-03-01", 100.0, "earning"),
        ("2024-03-15", 10.5, "spending"),
        ("2024-03-31", 20.0, "spending"),
        ("2024-04-01", 999.0, "spending"),
    ] {
        app.client()
            .post(&api_path("/transactions"))
            .json(&json!({ "date": date, "amount": amount, "type": kind }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let response = app
        .client()
        .get(&api_path("/transactions/aggregate"))
        .add_query_param("month", "2024-03")
        .await;
    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["month"], "2024-03");
    assert_eq!(body["income"].as_f64(), Some(100.0));
    assert_eq!(body["spending"].as_f64(), Some(30.5));
    assert_eq!(body["net_total"].as_f64(), Some(69.5));
}

#[tokio::test]
async fn aggregate_requires_a_valid_month() {
    let app = setup_memory_app();

    app.client()
        .get(&api_path("/transactions/aggregate"))
        .add_query_param("month", "2024-13")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.client()
        .get(&api_path("/transactions/aggregate"))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_removes_record_and_receipt() {
    let app = setup_memory_app();
    let (upload_id, _) = app.staged_receipt().await;

    let created: Value = app
        .client()
        .post(&api_path("/transactions"))
        .json(&json!({
            "date": "2024-05-01",
            "amount": 8,
            "type": "spending",
            "upload_id": upload_id
        }))
        .await
        .json();
    let id = created["id"].as_str().unwrap();
    let image_key = created["image_key"].as_str().unwrap().to_string();

    app.client()
        .get(&api_path(&format!("/transactions/{}", id)))
        .await
        .assert_status(StatusCode::OK);

    app.client()
        .delete(&api_path(&format!("/transactions/{}", id)))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    assert!(!app.storage.keys().await.contains(&image_key));
    app.client()
        .get(&api_path(&format!("/transactions/{}", id)))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.client()
        .delete(&api_path(&format!("/transactions/{}", id)))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_succeeds_when_receipt_delete_fails() {
    let app = setup_memory_app();
    let (upload_id, _) = app.staged_receipt().await;
    let created: Value = app
        .client()
        .post(&api_path("/transactions"))
        .json(&json!({
            "date": "2024-05-01",
            "amount": 8,
            "type": "spending",
            "upload_id": upload_id
        }))
        .await
        .json();
    let id = created["id"].as_str().unwrap();

    app.storage.fail(StorageOp::Delete).await;
    app.client()
        .delete(&api_path(&format!("/transactions/{}", id)))
        .await
        .assert_status(StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn receipt_url_is_omitted_when_signing_fails() {
    let app = setup_memory_app();
    let (upload_id, _) = app.staged_receipt().await;
    let created: Value = app
        .client()
        .post(&api_path("/transactions"))
        .json(&json!({
            "date": "2024-05-01",
            "amount": 8,
            "type": "spending",
            "upload_id": upload_id
        }))
        .await
        .json();
    let id = created["id"].as_str().unwrap();

    app.storage.fail(StorageOp::PresignGet).await;
    let response = app
        .client()
        .get(&api_path(&format!("/transactions/{}", id)))
        .await;
    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert!(body.get("image_url").is_none());
    assert!(body["image_key"].is_string());
}
