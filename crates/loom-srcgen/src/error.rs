use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("method `{method}` of `{class}` has no body")]
    MissingBody { class: String, method: String },
    #[error("record `{record}` has no primary constructor")]
    MissingPrimaryConstructor { record: String },
}
