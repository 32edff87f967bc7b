//! Scripted transport for unit tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::models::{Session, User};
use crate::transport::{ApiRequest, ApiResponse, Problem, Transport};

enum Scripted {
    Status(u16, Option<Value>),
    Failure(Problem),
}

/// Replays canned responses in order and records every request
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, status: u16, data: Value) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Scripted::Status(status, Some(data)));
    }

    pub fn push_empty(&self, status: u16) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Scripted::Status(status, None));
    }

    pub fn push_failure(&self, problem: Problem) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Scripted::Failure(problem));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: ApiRequest) -> ApiResponse {
        self.requests.lock().unwrap().push(request.clone());

        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Status(status, data)) => ApiResponse::from_status(request, status, data),
            Some(Scripted::Failure(problem)) => ApiResponse::failed(request, problem),
            None => panic!("unexpected request: {} {}", request.method, request.path),
        }
    }
}

pub fn sample_session() -> Session {
    Session {
        access_token: "access-1".to_string(),
        refresh_token: "refresh-1".to_string(),
        user: Some(User {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        }),
    }
}
