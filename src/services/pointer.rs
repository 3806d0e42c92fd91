//! Token URI classification by addressing scheme

/// Content-addressed scheme prefix
pub const IPFS_PREFIX: &str = "ipfs://";

/// How a token URI is dereferenced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    /// `ipfs://` - fetched through the gateway chain
    ContentAddressed,
    /// `https://` - fetched directly
    SecureWeb,
    /// `http://` - fetched directly
    PlainWeb,
    /// Anything else
    Unrecognized,
}

impl PointerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContentAddressed => "ipfs",
            Self::SecureWeb => "https",
            Self::PlainWeb => "http",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// Classify a token URI by prefix
pub fn classify(pointer: &str) -> PointerKind {
    if pointer.starts_with(IPFS_PREFIX) {
        PointerKind::ContentAddressed
    } else if pointer.starts_with("https://") {
        PointerKind::SecureWeb
    } else if pointer.starts_with("http://") {
        PointerKind::PlainWeb
    } else {
        PointerKind::Unrecognized
    }
}
