use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("API key is missing")]
    MissingApiKey,
    #[error("request to {model} failed: {source}")]
    Transport {
        model: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("model API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("model returned no text")]
    EmptyResponse,
    #[error("model returned malformed JSON: {0}")]
    MalformedResponse(#[from] serde_json::Error),
    #[error("no scenario loaded")]
    NoScenario,
    #[error("{0} already in progress")]
    Busy(&'static str),
    #[error("superseded by a newer scenario")]
    Superseded,
    #[error("weight for {actor} must be within 0..=100, got {value}")]
    WeightOutOfRange { actor: String, value: i64 },
    #[error("unknown actor: {0}")]
    UnknownActor(String),
    #[error("unknown scenario category: {0}")]
    UnknownCategory(String),
}

impl Error {
    /// True for failures that came back from the model call itself, as opposed
    /// to local preconditions.
    pub fn is_model_failure(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Api { .. } | Self::EmptyResponse | Self::MalformedResponse(_)
        )
    }
}
