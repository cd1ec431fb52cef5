#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Board has no {0} column")]
    MissingColumn(&'static str),

    #[error("Board has no default swimlane")]
    MissingDefaultSwimlane,

    #[error("Malformed settings document: {0}")]
    MalformedSettings(String),
}
