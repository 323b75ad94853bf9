use std::collections::HashMap;

/// Image reference delivered with a completed reply.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Attachment {
    pub url: String,
    #[serde(default)]
    pub alt_text: String,
}

impl Attachment {
    pub fn new(url: impl Into<String>, alt_text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            alt_text: alt_text.into(),
        }
    }
}

/// How a reply reached its terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Completion {
    /// The backend sent a payload with `done: true`.
    Flagged,
    /// The transport closed before any completion flag.
    EndOfStream,
}

/// Final result of one streamed assistant reply.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AssembledReply {
    /// Accumulated reply text.
    pub text: String,
    /// Last session identifier observed on the stream.
    pub session_id: Option<String>,
    /// Attachments declared by the terminal payload.
    pub attachments: Vec<Attachment>,
    /// Context similarity reported by the terminal payload.
    pub similarity: Option<f64>,
    pub completion: Completion,
}

impl AssembledReply {
    /// Returns true when the backend explicitly flagged the reply as done.
    pub fn completion_flagged(&self) -> bool {
        self.completion == Completion::Flagged
    }
}

/// Body returned by the non-streaming question endpoint.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Answer {
    #[serde(rename = "resposta", default)]
    pub text: String,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(rename = "sugestao", default)]
    pub suggestion: Option<String>,
    /// Help-desk pointer shown when the assistant could not answer well.
    #[serde(default)]
    pub central: Option<String>,
    /// Link to the full manual page backing the answer.
    #[serde(default)]
    pub manual: Option<String>,
    #[serde(rename = "similaridade", default)]
    pub similarity: Option<f64>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl Answer {
    /// Non-empty side notes in display order: feedback, suggestion, help desk.
    pub fn notes(&self) -> Vec<&str> {
        [&self.feedback, &self.suggestion, &self.central]
            .into_iter()
            .filter_map(|v| non_blank(v.as_deref()))
            .collect()
    }

    /// Manual link if the backend sent a non-blank one.
    pub fn manual_link(&self) -> Option<&str> {
        non_blank(self.manual.as_deref())
    }

    /// Audio URL if the backend sent a non-blank one.
    pub fn audio_link(&self) -> Option<&str> {
        non_blank(self.audio_url.as_deref())
    }
}

/// Body returned by the status endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ServiceStatus {
    pub status: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub endpoints: HashMap<String, String>,
    #[serde(default)]
    pub features: Vec<String>,
}

impl ServiceStatus {
    pub fn is_online(&self) -> bool {
        self.status.eq_ignore_ascii_case("online")
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
