// tests/api_tests.rs

mod common;

use common::{spawn_app, token_for, user, wait_for_sync};
use exam_portal::{
    storage::{KeyValueStore, keys},
    utils::jwt::{now_secs, sign_token},
};
use serde_json::{Value, json};

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/api/results"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "not_logged_in");
}

#[tokio::test]
async fn malformed_token_is_rejected() {
    let app = spawn_app().await;

    for token in ["abc.def", "not.a.jwt", "a.b.c.d"] {
        let response = app.login(token).await;
        assert_eq!(response.status().as_u16(), 401, "token {:?}", token);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], "invalid_token");
    }

    assert!(app.state.sessions.current().await.is_none());
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let app = spawn_app().await;
    let expired = common::payload(user("42", false), &[], now_secs() - 10);
    let token = sign_token(&expired, common::SIGNING_KEY).unwrap();

    let response = app.login(&token).await;

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn login_returns_session_and_prices_apply_to_catalog() {
    let app = spawn_app().await;
    let mut payload = common::payload(user("42", false), &["CPC-CERT-EXAM"], now_secs() + 600);
    payload.exam_prices = Some(
        [(
            "CPC-CERT-EXAM".to_string(),
            exam_portal::models::session::ExamPrice {
                price: 99.0,
                regular_price: Some(175.0),
            },
        )]
        .into_iter()
        .collect(),
    );
    let token = sign_token(&payload, common::SIGNING_KEY).unwrap();

    let response = app.login(&token).await;
    assert_eq!(response.status().as_u16(), 200);
    let session: Value = response.json().await.unwrap();
    assert_eq!(session["user"]["id"], "42");
    assert_eq!(session["paidExamIds"], json!(["CPC-CERT-EXAM"]));

    let catalog: Value = app
        .client
        .get(app.url("/api/catalog"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let exams = catalog[0]["exams"].as_array().unwrap();
    let cpc = exams.iter().find(|e| e["id"] == "CPC-CERT-EXAM").unwrap();
    let cca = exams.iter().find(|e| e["id"] == "CCA-CERT-EXAM").unwrap();
    assert_eq!(cpc["price"], 99.0);
    assert_eq!(cca["price"], 120.0);
}

#[tokio::test]
async fn unpurchased_certification_exam_is_forbidden() {
    let app = spawn_app().await;
    app.login(&token_for(user("42", false), &[])).await;

    let response = app
        .client
        .post(app.url("/api/orgs/org-mco/exams/CPC-CERT-EXAM/attempts"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn practice_exam_flow() {
    // Arrange
    let app = spawn_app().await;
    let response = app.login(&token_for(user("42", false), &[])).await;
    assert_eq!(response.status().as_u16(), 200);

    // 1. Start a practice attempt
    let response = app
        .client
        .post(app.url("/api/orgs/org-mco/exams/exam-cpc-practice/attempts"))
        .send()
        .await
        .expect("Start attempt failed");
    assert_eq!(response.status().as_u16(), 201);
    let attempt: Value = response.json().await.unwrap();
    let questions = attempt["questions"].as_array().unwrap();
    assert!(!questions.is_empty());
    assert!(questions.iter().all(|q| q.get("correctAnswer").is_none()));

    // 2. Answer the first option everywhere
    let answers: Vec<Value> = questions
        .iter()
        .map(|q| json!({ "questionId": q["id"], "answer": 0 }))
        .collect();
    let response = app
        .client
        .post(app.url(&format!(
            "/api/attempts/{}/submit",
            attempt["attemptId"].as_str().unwrap()
        )))
        .json(&json!({ "answers": answers }))
        .send()
        .await
        .expect("Submit failed");
    assert_eq!(response.status().as_u16(), 200);
    let submitted: Value = response.json().await.unwrap();
    assert_eq!(submitted["sync"]["status"], "pending");
    let test_id = submitted["result"]["testId"].as_str().unwrap().to_string();
    assert!(test_id.starts_with("test-"));

    // 3. The result is readable locally
    let result: Value = app
        .client
        .get(app.url(&format!("/api/results/{}", test_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result["examId"], "exam-cpc-practice");

    // 4. The background push reaches WordPress
    let status = wait_for_sync(&app, &test_id).await;
    assert_eq!(status["sync"]["status"], "synced");
    assert_eq!(app.wordpress.lock().unwrap().submitted[0]["testId"], test_id.as_str());

    // 5. Practice attempts never earn a certificate
    let response = app
        .client
        .get(app.url(&format!("/api/orgs/org-mco/certificates/{}", test_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "not_earned");

    // 6. The dashboard lists it as the latest attempt
    let latest: Vec<Value> = app
        .client
        .get(app.url("/api/results/latest"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0]["testId"], test_id.as_str());
}

#[tokio::test]
async fn logout_clears_every_stored_key() {
    let app = spawn_app().await;
    app.login(&token_for(user("42", false), &[])).await;
    app.store.set(&keys::results("42"), "[]").await.unwrap();
    app.store.set(&keys::results("other"), "[]").await.unwrap();

    let response = app
        .client
        .post(app.url("/api/auth/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    assert!(app.store.keys_with_prefix(keys::NAMESPACE).await.unwrap().is_empty());
    let response = app
        .client
        .get(app.url("/api/auth/session"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // Logging out twice is harmless.
    let response = app
        .client
        .post(app.url("/api/auth/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn sample_certificate_is_always_available() {
    let app = spawn_app().await;
    app.login(&token_for(user("42", false), &[])).await;

    let cert: Value = app
        .client
        .get(app.url("/api/orgs/org-mco/certificates/sample"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(cert["finalScore"], 95.5);
    assert_eq!(cert["totalQuestions"], 100);
    assert_eq!(cert["candidateName"], "Jordan Smith");
    assert!(cert["certificateNumber"].as_str().unwrap().starts_with("SAMPLE-"));
    assert_eq!(cert["template"]["id"], "cert-mco-1");
}

#[tokio::test]
async fn sample_certificate_needs_no_session() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/api/orgs/org-mco/certificates/sample"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let cert: Value = response.json().await.unwrap();
    assert_eq!(cert["candidateName"], "Sample Candidate");
    assert_eq!(cert["finalScore"], 95.5);
}

#[tokio::test]
async fn name_change_goes_through_wordpress() {
    let app = spawn_app().await;
    app.login(&token_for(user("42", false), &[])).await;

    let response = app
        .client
        .post(app.url("/api/profile/name"))
        .json(&json!({ "fullName": "  Jordan A. Smith " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    assert_eq!(app.wordpress.lock().unwrap().name_updates, vec!["Jordan A. Smith"]);
    let session: Value = app
        .client
        .get(app.url("/api/auth/session"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(session["user"]["name"], "Jordan A. Smith");

    let response = app
        .client
        .post(app.url("/api/profile/name"))
        .json(&json!({ "fullName": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = spawn_app().await;

    let doc: Value = app
        .client
        .get(app.url("/api/openapi.json"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(doc["components"]["schemas"]["TestResult"].is_object());
}
