//! Request and response bodies

use serde::{Deserialize, Serialize};

/// Fixed answer texts
pub mod messages {
    pub const NO_OBJECT: &str =
        "I don't know what object you are referring to. Please show me the object first.";
    pub const EMPTY_QUESTION: &str = "Please ask a question about the object.";
    pub const ANSWER_FAILED: &str = "Sorry, I couldn't answer that right now.";
}

/// `POST /detect` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectResponse {
    pub detected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DetectResponse {
    pub fn detected(object: impl Into<String>, desc: impl Into<String>, token: Option<String>) -> Self {
        Self {
            detected: true,
            object: Some(object.into()),
            desc: Some(desc.into()),
            token,
            error: None,
        }
    }

    pub fn not_detected() -> Self {
        Self {
            detected: false,
            object: None,
            desc: None,
            token: None,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::not_detected()
        }
    }
}

/// `POST /object_qa` request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QaRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub token: Option<String>,
}

/// `POST /object_qa` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaResponse {
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QaResponse {
    pub fn answered(answer: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            object: Some(object.into()),
            error: None,
        }
    }

    pub fn no_object() -> Self {
        Self {
            answer: messages::NO_OBJECT.to_string(),
            object: None,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            answer: messages::ANSWER_FAILED.to_string(),
            object: None,
            error: Some(error.into()),
        }
    }
}
