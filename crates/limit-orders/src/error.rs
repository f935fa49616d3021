use {
    crate::interactions::{InteractionError, TransferError},
    model::{extension::ExtensionError, signature::SignatureError, traits::ArgsOutOfBounds},
};

/// Why a fill, a cancellation or an epoch update was rejected. Every
/// rejection leaves the ledger untouched.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("bad signature: {0}")]
    BadSignature(#[from] SignatureError),
    #[error("order expired")]
    OrderExpired,
    #[error("order is private to another sender")]
    PrivateOrder,
    #[error("order is invalidated or has no capacity left for the fill")]
    InvalidatedOrder,
    #[error("order must be filled in full")]
    PartialFillNotAllowed,
    #[error("zero amount")]
    ZeroAmount,
    #[error("fill amounts do not meet the taker threshold")]
    ThresholdNotMet,
    #[error("malformed extension: {0}")]
    MalformedExtension(#[from] Malformed),
    #[error("extension does not match the order")]
    InvalidExtension,
    #[error("order requires an extension")]
    MissingExtension,
    #[error("arithmetic overflow")]
    ArithmeticOverflow,
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Interaction(#[from] InteractionError),
}

#[derive(Debug, thiserror::Error)]
pub enum Malformed {
    #[error(transparent)]
    Extension(#[from] ExtensionError),
    #[error(transparent)]
    Args(#[from] ArgsOutOfBounds),
}

impl From<ExtensionError> for Error {
    fn from(err: ExtensionError) -> Self {
        Self::MalformedExtension(err.into())
    }
}

impl From<ArgsOutOfBounds> for Error {
    fn from(err: ArgsOutOfBounds) -> Self {
        Self::MalformedExtension(err.into())
    }
}
