pub type CrossfadeResult<T> = Result<T, CrossfadeError>;

#[derive(thiserror::Error, Debug)]
pub enum CrossfadeError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("job error: {0}")]
    Job(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CrossfadeError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn job(msg: impl Into<String>) -> Self {
        Self::Job(msg.into())
    }
}
