use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommonError {
    #[error("Invalid property selector '{0}': expected 'attribute:value'")]
    InvalidProperty(String),
    #[error("Empty composite selector")]
    EmptyComposite,
}
