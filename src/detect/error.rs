#[derive(Debug, Clone, thiserror::Error)]
pub enum DetectError {
    #[error("no Nvision API key configured (set NVISION_API_KEY)")]
    MissingApiKey,

    #[error("detection service returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("detection service unreachable: {0}")]
    Transport(String),

    #[error("invalid detection response: {0}")]
    Decode(String),

    #[error("detector unavailable: {0}")]
    Unavailable(String),
}

impl From<ureq::Error> for DetectError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, response) => {
                let body = response
                    .into_string()
                    .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
                DetectError::Status { code, body }
            }
            ureq::Error::Transport(transport) => DetectError::Transport(transport.to_string()),
        }
    }
}
