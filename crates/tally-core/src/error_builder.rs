//! Fluent construction of RFC 7807 problem responses

use crate::problemdetails;
use axum::http::StatusCode;
use serde::Serialize;
use std::collections::BTreeMap;

const PROBLEM_BASE_URL: &str = "https://tally.dev/probs";

pub struct ErrorBuilder {
    status: StatusCode,
    type_: String,
    title: String,
    detail: String,
    instance: String,
    values: BTreeMap<String, serde_json::Value>,
}

impl ErrorBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            type_: String::new(),
            title: String::new(),
            detail: String::new(),
            instance: String::new(),
            values: BTreeMap::new(),
        }
    }

    pub fn type_(mut self, type_: impl Into<String>) -> Self {
        self.type_ = type_.into();
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = instance.into();
        self
    }

    /// Attach an extension member. Values that fail to serialize are skipped.
    pub fn value<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.values.insert(key.to_string(), value);
        }
        self
    }

    pub fn build(self) -> problemdetails::Problem {
        let mut problem = problemdetails::new(self.status)
            .with_title(self.title)
            .with_value("timestamp", chrono::Utc::now().to_rfc3339());

        if !self.type_.is_empty() {
            problem = problem.with_type(self.type_);
        }
        if !self.detail.is_empty() {
            problem = problem.with_detail(self.detail);
        }
        if !self.instance.is_empty() {
            problem = problem.with_instance(self.instance);
        }

        for (key, value) in self.values {
            problem = problem.with_value(&key, value);
        }

        problem
    }
}

fn problem_type(slug: &str) -> String {
    format!("{}/{}", PROBLEM_BASE_URL, slug)
}

pub fn internal_server_error() -> ErrorBuilder {
    ErrorBuilder::new(StatusCode::INTERNAL_SERVER_ERROR)
        .type_(problem_type("internal-server-error"))
        .title("Internal Server Error")
        .detail("An unexpected error occurred while processing your request")
        .value("error_code", "INTERNAL_SERVER_ERROR")
}

pub fn not_found() -> ErrorBuilder {
    ErrorBuilder::new(StatusCode::NOT_FOUND)
        .type_(problem_type("not-found"))
        .title("Resource Not Found")
        .value("error_code", "NOT_FOUND")
}

pub fn bad_request() -> ErrorBuilder {
    ErrorBuilder::new(StatusCode::BAD_REQUEST)
        .type_(problem_type("bad-request"))
        .title("Bad Request")
        .detail("The request was malformed or invalid")
        .value("error_code", "BAD_REQUEST")
}

pub fn validation_failed() -> ErrorBuilder {
    ErrorBuilder::new(StatusCode::BAD_REQUEST)
        .type_(problem_type("validation-error"))
        .title("Validation Failed")
        .value("error_code", "VALIDATION_ERROR")
}

pub fn conflict() -> ErrorBuilder {
    ErrorBuilder::new(StatusCode::CONFLICT)
        .type_(problem_type("conflict"))
        .title("Conflict")
        .detail("The request could not be completed due to the current state of the resource")
        .value("error_code", "CONFLICT")
}
