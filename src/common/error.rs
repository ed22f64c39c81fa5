use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("a bridge is already bound to the plugin boundary")]
    AlreadyBound,

    #[error("no bridge is bound to the plugin boundary")]
    NotBound,

    #[error("router error: {0}")]
    Router(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl BridgeError {
    /// Whether the failure comes from how the process wired the bridge
    /// rather than from a single event.
    pub fn is_wiring(&self) -> bool {
        matches!(
            self,
            BridgeError::AlreadyBound | BridgeError::NotBound | BridgeError::Config(_)
        )
    }

    /// Try to extract a BridgeError from an anyhow::Error and return its kind.
    pub fn classify(err: &anyhow::Error) -> BridgeErrorKind {
        if let Some(be) = err.downcast_ref::<BridgeError>() {
            return be.kind();
        }
        if err.downcast_ref::<std::io::Error>().is_some() {
            return BridgeErrorKind::Io;
        }
        BridgeErrorKind::Other
    }

    /// Get the kind/category of this error.
    pub fn kind(&self) -> BridgeErrorKind {
        match self {
            BridgeError::AlreadyBound => BridgeErrorKind::AlreadyBound,
            BridgeError::NotBound => BridgeErrorKind::NotBound,
            BridgeError::Router(_) => BridgeErrorKind::Router,
            BridgeError::Config(_) => BridgeErrorKind::Config,
            BridgeError::Io(_) => BridgeErrorKind::Io,
            BridgeError::Other(_) => BridgeErrorKind::Other,
        }
    }
}

/// Lightweight error category for pattern matching without borrowing the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeErrorKind {
    AlreadyBound,
    NotBound,
    Router,
    Config,
    Io,
    Other,
}

impl BridgeErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BridgeErrorKind::AlreadyBound => "ALREADY_BOUND",
            BridgeErrorKind::NotBound => "NOT_BOUND",
            BridgeErrorKind::Router => "ROUTER",
            BridgeErrorKind::Config => "CONFIG",
            BridgeErrorKind::Io => "IO",
            BridgeErrorKind::Other => "OTHER",
        }
    }
}
