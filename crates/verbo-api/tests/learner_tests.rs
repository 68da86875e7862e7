use axum::http::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::common::{TestClient, test_app};

const AT: &str = "2024-03-04T09:00:00Z";

fn attempt(quality: i64, timestamp: &str) -> Value {
    json!({
        "verb": "hablar",
        "tense": "preterite",
        "mood": "indicative",
        "quality": quality,
        "timestamp": timestamp,
    })
}

async fn grade(client: &TestClient, learner: Uuid, item: &str, body: &Value) -> Value {
    let response = client
        .post_json(&format!("/learners/{learner}/items/{item}/attempts"), body)
        .await;
    response.assert_status(StatusCode::OK);
    response.json()
}

#[tokio::test]
async fn test_grade_fresh_item() {
    let (client, _, learner) = test_app();

    let outcome = grade(&client, learner, "hablar:pret:1s", &attempt(5, AT)).await;

    assert_eq!(outcome["previous_state"], "new");
    assert_eq!(outcome["success"], true);
    assert_eq!(outcome["lapsed"], false);
    assert_eq!(outcome["record"]["state"], "review");
    assert_eq!(outcome["record"]["repetition_count"], 1);
    assert_eq!(outcome["record"]["interval_days"], 1);
    assert_eq!(outcome["record"]["version"], 1);
    assert_eq!(outcome["record"]["topic"]["verb"], "hablar");

    let response = client
        .get(&format!("/learners/{learner}/items/hablar:pret:1s"))
        .await;
    response.assert_status(StatusCode::OK);
    let record: Value = response.json();
    assert_eq!(record, outcome["record"]);
}

#[tokio::test]
async fn test_grade_rejects_out_of_range_quality() {
    let (client, _, learner) = test_app();

    let response = client
        .post_json(
            &format!("/learners/{learner}/items/a/attempts"),
            &attempt(6, AT),
        )
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_QUALITY");

    let response = client.get(&format!("/learners/{learner}/items/a")).await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_grade_with_stale_version_conflicts() {
    let (client, _, learner) = test_app();
    grade(&client, learner, "a", &attempt(4, AT)).await;

    let mut body = attempt(4, "2024-03-05T09:00:00Z");
    body["expected_version"] = json!(0);
    let response = client
        .post_json(&format!("/learners/{learner}/items/a/attempts"), &body)
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let error: Value = response.json();
    assert_eq!(error["code"], "STALE_RECORD");

    body["expected_version"] = json!(1);
    let outcome = grade(&client, learner, "a", &body).await;
    assert_eq!(outcome["record"]["version"], 2);
    assert_eq!(outcome["record"]["interval_days"], 6);
}

#[tokio::test]
async fn test_grade_out_of_order_conflicts() {
    let (client, _, learner) = test_app();
    grade(&client, learner, "a", &attempt(4, AT)).await;

    let response = client
        .post_json(
            &format!("/learners/{learner}/items/a/attempts"),
            &attempt(4, "2024-03-03T09:00:00Z"),
        )
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_grade_validates_topic() {
    let (client, _, learner) = test_app();

    let mut body = attempt(3, AT);
    body["verb"] = json!("");
    let response = client
        .post_json(&format!("/learners/{learner}/items/a/attempts"), &body)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let error: Value = response.json();
    assert_eq!(error["code"], "VALIDATION_ERROR");

    let mut body = attempt(3, AT);
    body["tense"] = json!("pluperfect");
    let response = client
        .post_json(&format!("/learners/{learner}/items/a/attempts"), &body)
        .await;
    assert!(response.status.is_client_error());
}

#[tokio::test]
async fn test_failure_after_success_lapses() {
    let (client, _, learner) = test_app();
    grade(&client, learner, "a", &attempt(5, AT)).await;

    let outcome = grade(&client, learner, "a", &attempt(1, "2024-03-05T09:00:00Z")).await;
    assert_eq!(outcome["success"], false);
    assert_eq!(outcome["lapsed"], true);
    assert_eq!(outcome["record"]["state"], "learning");
    assert_eq!(outcome["record"]["lapse_count"], 1);
    assert_eq!(outcome["record"]["repetition_count"], 0);
}

#[tokio::test]
async fn test_preview_lists_every_quality() {
    let (client, _, learner) = test_app();

    let response = client
        .get(&format!(
            "/learners/{learner}/items/a/preview?verb=hablar&tense=present&mood=indicative&at={AT}"
        ))
        .await;
    response.assert_status(StatusCode::OK);
    let previews: Vec<Value> = response.json();
    assert_eq!(previews.len(), 6);

    let response = client.get(&format!("/learners/{learner}/items/a")).await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_due_items() {
    let (client, _, learner) = test_app();
    grade(&client, learner, "old", &attempt(5, AT)).await;
    grade(&client, learner, "older", &attempt(1, "2024-03-03T09:00:00Z")).await;

    let response = client
        .get(&format!(
            "/learners/{learner}/due?at=2024-03-10T00:00:00Z&candidates=fresh,old"
        ))
        .await;
    response.assert_status(StatusCode::OK);
    let due: Value = response.json();
    assert_eq!(due["items"], json!(["older", "old", "fresh"]));
    assert_eq!(due["count"], 3);

    let response = client
        .get(&format!(
            "/learners/{learner}/due?at=2024-03-10T00:00:00Z&candidates=fresh&new_items=exclude"
        ))
        .await;
    let due: Value = response.json();
    assert_eq!(due["items"], json!(["older", "old"]));

    let response = client
        .get(&format!("/learners/{learner}/due?at=2024-03-04T08:00:00Z"))
        .await;
    let due: Value = response.json();
    assert_eq!(due["count"], 0);
}

#[tokio::test]
async fn test_due_rejects_bad_limit() {
    let (client, _, learner) = test_app();

    let response = client.get(&format!("/learners/{learner}/due?limit=0")).await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mastery() {
    let (client, _, learner) = test_app();
    let uri = format!("/learners/{learner}/mastery/hablar/preterite/indicative?at={AT}");

    let response = client.get(&uri).await;
    response.assert_status(StatusCode::OK);
    let mastery: Value = response.json();
    assert_eq!(mastery["status"], "insufficient_data");
    assert_eq!(mastery["topic_key"]["tense"], "preterite");

    grade(&client, learner, "a", &attempt(5, AT)).await;

    let mastery: Value = client.get(&uri).await.json();
    assert_eq!(mastery["status"], "scored");
    assert_eq!(mastery["sample_size"], 1);
    let score = mastery["mastery_score"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&score));

    let overview: Vec<Value> = client
        .get(&format!("/learners/{learner}/mastery"))
        .await
        .json();
    assert_eq!(overview.len(), 1);

    let response = client
        .get(&format!("/learners/{learner}/mastery/hablar/someday/indicative"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_summary() {
    let (client, _, learner) = test_app();
    grade(&client, learner, "a", &attempt(5, AT)).await;
    grade(&client, learner, "b", &attempt(0, AT)).await;

    let response = client
        .get(&format!("/learners/{learner}/summary?at={AT}"))
        .await;
    response.assert_status(StatusCode::OK);
    let summary: Value = response.json();
    assert_eq!(summary["total"], 2);
    assert_eq!(summary["review"], 1);
    assert_eq!(summary["learning"], 1);
    assert_eq!(summary["due_now"], 0);
}

#[tokio::test]
async fn test_difficulty_tier() {
    let (client, _, learner) = test_app();
    let uri = format!("/learners/{learner}/difficulty");

    let advice: Value = client.get(&uri).await.json();
    assert_eq!(advice["current"], "beginner");
    assert_eq!(advice["adjustment"], "insufficient_data");

    let response = client.put_json(&uri, &json!({ "tier": "advanced" })).await;
    response.assert_status(StatusCode::NO_CONTENT);

    let advice: Value = client.get(&uri).await.json();
    assert_eq!(advice["current"], "advanced");

    let response = client.put_json(&uri, &json!({ "tier": "grandmaster" })).await;
    assert!(response.status.is_client_error());

    let response = client.get(&format!("{uri}?window=0")).await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_learner_id() {
    let (client, _, _) = test_app();

    let response = client.get("/learners/not-a-uuid/summary").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_graded_record_matches_later_read() {
    let (client, _, learner) = test_app();

    let outcome = grade(
        &client,
        learner,
        "a",
        &attempt(4, "2024-03-04T09:00:00.123456789Z"),
    )
    .await;
    assert_eq!(
        outcome["record"]["last_reviewed_at"],
        "2024-03-04T09:00:00.123456Z"
    );

    let record: Value = client.get(&format!("/learners/{learner}/items/a")).await.json();
    assert_eq!(record, outcome["record"]);
}
