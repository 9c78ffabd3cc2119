use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("discriminator value {0:?} is already registered")]
    DuplicateDiscriminator(String),
    #[error("discriminator value must be a non-empty string")]
    InvalidDiscriminatorValue,
    #[error("discriminator key must be a non-empty field name")]
    InvalidDiscriminatorKey,
    #[error("no discriminator mappings registered")]
    EmptyRegistry,
}
