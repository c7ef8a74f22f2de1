//! Signing-plan computation for build outputs.
//!
//! Given build artifacts and certificate tables, decide which files need
//! signing and with which certificate. Identical content is processed once,
//! and archive containers are unpacked recursively. The result is a
//! declarative [`SigningPlan`] for an external signing executor.

/// Crate-wide error type
pub mod error;

/// Structured logging setup
pub mod logging;

/// Run configuration and certificate tables
pub mod config;

/// Bounded file access
pub mod io;

/// Content fingerprints
pub mod hashing;

/// PE and CLI metadata parsers
pub mod formats;

/// Binary classification and identity extraction
pub mod inspect;

/// Resolution, tracking, unpacking and plan emission
pub mod signing;

pub use config::{CertificateTables, ExplicitCertificateKey, ExtensionPolicy, SignToolConfig};
pub use error::{Result, SignToolError};
pub use hashing::ContentHash;
pub use inspect::{inspect, AssemblyKind, BinaryInfo};
pub use signing::{
    BatchSigner, ContainerDescriptor, CopyInstruction, MissingCertificate, SignDecision,
    SigningPlan, TrackedFile, ZipPart,
};
