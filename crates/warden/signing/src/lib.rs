//! Warden signing
//!
//! The pure cryptographic half of the co-signed approval path: a
//! domain-separated structured digest over an operation and its
//! delegation parameters, and recoverable secp256k1 ECDSA over that
//! digest. No state lives here; the engine owns nonces and permissions.
#![deny(unsafe_code)]

pub mod digest;
pub mod domain;
pub mod recover;

pub use digest::meta_digest;
pub use domain::SigningDomain;
pub use recover::{address_of, recover_signer, sign_digest, SignatureError};
