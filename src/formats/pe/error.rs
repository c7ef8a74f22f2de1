use thiserror::Error;

/// Why a buffer could not be read as a PE image
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeError {
    #[error("Missing MZ signature")]
    BadDosSignature,

    #[error("Missing PE signature at offset {0:#x}")]
    BadPeSignature(usize),

    #[error("Unknown optional header magic {0:#06x}")]
    BadMagic(u16),

    #[error("Image truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("RVA {0:#010x} is not backed by file content")]
    UnmappedRva(u32),

    #[error("Image has no CLI header")]
    NotManaged,
}

pub type Result<T> = std::result::Result<T, PeError>;

pub(crate) fn truncated(data: &[u8], needed: usize) -> PeError {
    PeError::Truncated {
        needed,
        available: data.len(),
    }
}
