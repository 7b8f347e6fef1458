//! Shared harness for integration tests.
//!
//! Spawns the service on a random port with mock model providers and a fresh
//! MongoDB database per test (`TEST_MONGODB_URI`, default localhost). Tests
//! return early when `SKIP_MONGO_TESTS` is set.

#![allow(dead_code)]

use grozen_service::config::{
    AuthConfig, GoogleConfig, GrozenConfig, ModelConfig, MongoConfig, ProviderKind,
};
use grozen_service::services::GrozenDb;
use grozen_service::startup::Application;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, RequestBuilder};
use serde_json::json;
use std::time::Duration;

pub const JWT_SECRET: &str = "integration-test-secret";
pub const ISSUER: &str = "grozen-auth";
pub const AUDIENCE: &str = "grozen";
pub const ADMIN_EMAIL: &str = "coach@grozen.app";

pub fn skip_mongo_tests() -> bool {
    if std::env::var("SKIP_MONGO_TESTS").is_ok() {
        eprintln!("Skipping test: SKIP_MONGO_TESTS is set");
        return true;
    }
    false
}

pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub db: GrozenDb,
}

impl TestApp {
    pub fn get(&self, path: &str, token: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .timeout(Duration::from_secs(10))
    }

    pub fn post(&self, path: &str, token: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .timeout(Duration::from_secs(10))
    }

    pub fn put(&self, path: &str, token: &str) -> RequestBuilder {
        self.client
            .put(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .timeout(Duration::from_secs(10))
    }

    pub fn delete(&self, path: &str, token: &str) -> RequestBuilder {
        self.client
            .delete(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .timeout(Duration::from_secs(10))
    }
}

fn test_config() -> GrozenConfig {
    GrozenConfig {
        common: service_core::config::Config {
            port: 0, // Random port
            log_level: "info".to_string(),
        },
        mongodb: MongoConfig {
            uri: std::env::var("TEST_MONGODB_URI")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            database: format!("grozen_test_{}", uuid::Uuid::new_v4().simple()),
        },
        models: ModelConfig {
            provider: ProviderKind::Mock,
            text_model: "mock-text".to_string(),
            image_model: "mock-image".to_string(),
        },
        google: GoogleConfig {
            api_key: String::new(),
        },
        auth: AuthConfig {
            jwt_secret: JWT_SECRET.to_string(),
            issuer: ISSUER.to_string(),
            audience: AUDIENCE.to_string(),
            admin_emails: vec![ADMIN_EMAIL.to_string()],
        },
        otlp_endpoint: None,
    }
}

/// Spawn the application on a random port.
pub async fn spawn_app() -> TestApp {
    let app = Application::build(test_config())
        .await
        .expect("Failed to build application");
    let port = app.port();
    let db = app.db().clone();

    tokio::spawn(async move {
        let _ = app.run_until_stopped().await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(100)).await;

    TestApp {
        address: format!("http://localhost:{}", port),
        client: Client::new(),
        db,
    }
}

/// ID token for `user_id`, signed the way the identity provider signs them.
pub fn token_for(user_id: &str, email: &str, name: &str) -> String {
    sign(json!({
        "sub": user_id,
        "email": email,
        "name": name,
        "iss": ISSUER,
        "aud": AUDIENCE,
        "exp": chrono::Utc::now().timestamp() + 3600,
    }))
}

pub fn sign(claims: serde_json::Value) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to sign token")
}

pub fn onboarding_body() -> serde_json::Value {
    json!({
        "goals": "Get stronger for basketball and sleep better",
        "dietPreferences": "vegetarian",
        "budget": "$40 per week"
    })
}
