//! Onboarding, plan generation and grocery lists over HTTP.

mod common;

use common::{onboarding_body, skip_mongo_tests, spawn_app, token_for};
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn new_user_has_empty_plan_context() {
    if skip_mongo_tests() {
        return;
    }

    let app = spawn_app().await;
    let token = token_for("plan-empty", "empty@grozen.app", "Empty");

    let body: Value = app
        .get("/v1/plan", &token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["onboarding"], Value::Null);
    assert_eq!(body["wellnessPlan"], Value::Null);
    assert_eq!(body["isLoading"], false);
}

#[tokio::test]
async fn generate_without_onboarding_is_bad_request() {
    if skip_mongo_tests() {
        return;
    }

    let app = spawn_app().await;
    let token = token_for("plan-no-onboarding", "no@grozen.app", "No");

    let response = app.post("/v1/plan/generate", &token).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_onboarding_is_unprocessable() {
    if skip_mongo_tests() {
        return;
    }

    let app = spawn_app().await;
    let token = token_for("plan-invalid", "invalid@grozen.app", "Invalid");

    let response = app
        .put("/v1/plan/onboarding", &token)
        .json(&json!({ "goals": " ", "dietPreferences": "none", "budget": "$10" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn onboarding_then_generate_twice_keeps_one_plan() {
    if skip_mongo_tests() {
        return;
    }

    let app = spawn_app().await;
    let token = token_for("plan-user", "plan@grozen.app", "Plan");

    let response = app
        .put("/v1/plan/onboarding", &token)
        .json(&onboarding_body())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut plans = Vec::new();
    for _ in 0..2 {
        let response = app.post("/v1/plan/generate", &token).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["notice"]["variant"], "success");
        assert_eq!(body["state"]["isLoading"], false);
        plans.push(body["state"]["wellnessPlan"].clone());
    }

    assert_eq!(plans[0], plans[1]);
    assert!(!plans[0]["meals"].as_array().unwrap().is_empty());
    assert!(!plans[0]["exercise"].as_array().unwrap().is_empty());
    assert!(!plans[0]["mindfulness"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn start_over_clears_everything() {
    if skip_mongo_tests() {
        return;
    }

    let app = spawn_app().await;
    let token = token_for("plan-reset", "reset@grozen.app", "Reset");

    app.put("/v1/plan/onboarding", &token)
        .json(&onboarding_body())
        .send()
        .await
        .unwrap();
    app.post("/v1/plan/generate", &token).send().await.unwrap();

    let response = app.delete("/v1/plan", &token).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let body: Value = app
        .get("/v1/plan", &token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["onboarding"], Value::Null);
    assert_eq!(body["wellnessPlan"], Value::Null);
}

#[tokio::test]
async fn grocery_list_comes_from_plan_meals() {
    if skip_mongo_tests() {
        return;
    }

    let app = spawn_app().await;
    let token = token_for("grocery-user", "grocery@grozen.app", "Grocery");

    let response = app.post("/v1/grocery-list", &token).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.put("/v1/plan/onboarding", &token)
        .json(&onboarding_body())
        .send()
        .await
        .unwrap();
    app.post("/v1/plan/generate", &token).send().await.unwrap();

    let response = app.post("/v1/grocery-list", &token).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let generated: Value = response.json().await.unwrap();
    let items = generated["items"].as_array().unwrap();
    assert!(!items.is_empty());
    for item in items {
        assert!(!item["name"].as_str().unwrap().is_empty());
        assert!(!item["category"].as_str().unwrap().is_empty());
    }

    let stored: Value = app
        .get("/v1/grocery-list", &token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored["items"], generated["items"]);
}

#[tokio::test]
async fn grocery_list_accepts_explicit_meals() {
    if skip_mongo_tests() {
        return;
    }

    let app = spawn_app().await;
    let token = token_for("grocery-explicit", "explicit@grozen.app", "Explicit");

    let response = app
        .post("/v1/grocery-list", &token)
        .json(&json!({
            "meals": [{
                "day": "Monday",
                "breakfast": "Oatmeal",
                "lunch": "Salad",
                "dinner": "Chicken and rice"
            }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
