//! Signature domain separation
//!
//! A digest signed for one deployment must be meaningless to every
//! other: the domain separator binds scheme name, scheme version, the
//! execution context and the verifying instance into every digest.

use alloy_primitives::{keccak256, Address, B256};
use serde::{Deserialize, Serialize};

/// Type preimage the separator commits to.
const DOMAIN_TYPE: &[u8] =
    b"SigningDomain(string name,string version,uint256 contextId,address instance)";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningDomain {
    /// Scheme name
    pub name: String,
    /// Scheme version
    pub version: String,
    /// Execution context identifier
    pub context_id: u64,
    /// The verifying instance
    pub instance: Address,
}

impl SigningDomain {
    pub const SCHEME_NAME: &'static str = "Warden";
    pub const SCHEME_VERSION: &'static str = "1";

    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        context_id: u64,
        instance: Address,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            context_id,
            instance,
        }
    }

    /// The standard scheme name and version with a caller-chosen context.
    pub fn standard(context_id: u64, instance: Address) -> Self {
        Self::new(Self::SCHEME_NAME, Self::SCHEME_VERSION, context_id, instance)
    }

    /// 32-byte separator mixed into every digest of this domain.
    pub fn separator(&self) -> B256 {
        let mut encoded = Vec::with_capacity(5 * 32);
        encoded.extend_from_slice(keccak256(DOMAIN_TYPE).as_slice());
        encoded.extend_from_slice(keccak256(self.name.as_bytes()).as_slice());
        encoded.extend_from_slice(keccak256(self.version.as_bytes()).as_slice());
        encoded.extend_from_slice(crate::digest::word_u64(self.context_id).as_slice());
        encoded.extend_from_slice(self.instance.into_word().as_slice());
        keccak256(&encoded)
    }
}
