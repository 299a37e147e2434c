#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use ride_core::config::{DispatchConfig, ServiceConfig};
use ride_core::model::Identity;
use ride_core::RideService;
use ride_server::auth::JwtValidator;
use ride_server::{build_router, AppState};
use serde_json::Value;
use tower::ServiceExt;

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn new(auto_dispatch: bool) -> Self {
        let config = ServiceConfig {
            dispatch: DispatchConfig {
                auto_dispatch,
                ..DispatchConfig::default()
            },
            ..ServiceConfig::default()
        };
        let state = AppState::new(RideService::in_memory(config), JwtValidator::new_dev());
        let router = build_router(state.clone());
        Self { state, router }
    }

    pub fn token(&self, identity: &Identity) -> String {
        self.state
            .auth
            .generate_token(identity)
            .expect("token")
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        caller: Option<&Identity>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(identity) = caller {
            request = request.header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.token(identity)),
            );
        }
        let request = match body {
            Some(json) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}
