//! In-process vision model with canned replies

use super::image::ImageData;
use super::{ModelError, VisionModel};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// How the scripted model responds to one kind of call
#[derive(Debug, Clone)]
pub enum Reply {
    /// Return this text
    Text(String),
    /// Return `"<label>: <question>"` (answers only; `describe` returns an empty label)
    Echo,
    /// Fail with an upstream error carrying this message
    Fail(String),
}

/// A call observed by [`ScriptedModel`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelCall {
    Describe {
        image: ImageData,
    },
    Answer {
        label: String,
        image: ImageData,
        question: String,
    },
}

pub struct ScriptedModel {
    describe_reply: Mutex<Reply>,
    answer_reply: Mutex<Reply>,
    answer_delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<ModelCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedModel {
    pub fn new(describe_reply: Reply, answer_reply: Reply) -> Self {
        Self {
            describe_reply: Mutex::new(describe_reply),
            answer_reply: Mutex::new(answer_reply),
            answer_delay: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Identify every image as `label` and echo questions back
    pub fn labelling(label: impl Into<String>) -> Self {
        Self::new(Reply::Text(label.into()), Reply::Echo)
    }

    pub fn set_describe_reply(&self, reply: Reply) {
        *lock(&self.describe_reply) = reply;
    }

    pub fn set_answer_reply(&self, reply: Reply) {
        *lock(&self.answer_reply) = reply;
    }

    /// Hold each `answer` call for `delay` before replying
    pub fn set_answer_delay(&self, delay: Option<Duration>) {
        *lock(&self.answer_delay) = delay;
    }

    pub fn calls(&self) -> Vec<ModelCall> {
        lock(&self.calls).clone()
    }

    /// Questions sent to `answer`, in order
    pub fn questions(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                ModelCall::Answer { question, .. } => Some(question.clone()),
                ModelCall::Describe { .. } => None,
            })
            .collect()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    fn record(&self, call: ModelCall) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl VisionModel for ScriptedModel {
    async fn describe(&self, image: &ImageData) -> Result<String, ModelError> {
        self.record(ModelCall::Describe {
            image: image.clone(),
        });

        let reply = lock(&self.describe_reply).clone();
        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Echo => Ok(String::new()),
            Reply::Fail(message) => Err(ModelError::Upstream {
                status: 503,
                body: message,
            }),
        }
    }

    async fn answer(
        &self,
        label: &str,
        image: &ImageData,
        question: &str,
    ) -> Result<String, ModelError> {
        self.record(ModelCall::Answer {
            label: label.to_string(),
            image: image.clone(),
            question: question.to_string(),
        });

        let delay = *lock(&self.answer_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let reply = lock(&self.answer_reply).clone();
        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Echo => Ok(format!("{}: {}", label, question)),
            Reply::Fail(message) => Err(ModelError::Upstream {
                status: 503,
                body: message,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_replies_and_recording() {
        let model = ScriptedModel::labelling("stapler");
        let image = ImageData::new(&b"img"[..], None);

        assert_eq!(model.describe(&image).await.unwrap(), "stapler");
        assert_eq!(
            model.answer("stapler", &image, "what color?").await.unwrap(),
            "stapler: what color?"
        );
        assert_eq!(model.call_count(), 2);
        assert_eq!(model.questions(), vec!["what color?".to_string()]);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let model = ScriptedModel::labelling("stapler");
        model.set_answer_reply(Reply::Fail("down".to_string()));
        let image = ImageData::new(&b"img"[..], None);

        let err = model.answer("stapler", &image, "price?").await.unwrap_err();
        assert!(matches!(err, ModelError::Upstream { status: 503, .. }));
    }
}
