//! Registry of chains the vault can sign for.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::signing::SignerFactory;

/// Chain the keyring backend signs for directly, no key export involved.
pub const NATIVE_CHAIN: &str = "ethereum";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainFamily {
    Evm,
    Other,
}

#[derive(Clone)]
pub struct ChainDescriptor {
    pub id: String,
    pub family: ChainFamily,
    pub signer: Arc<dyn SignerFactory>,
}

impl fmt::Debug for ChainDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainDescriptor")
            .field("id", &self.id)
            .field("family", &self.family)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct ChainRegistry {
    evm: BTreeMap<String, ChainDescriptor>,
    non_evm: BTreeMap<String, ChainDescriptor>,
}

#[derive(Debug, Default)]
pub struct ChainRegistryBuilder {
    registry: ChainRegistry,
}

impl ChainRegistryBuilder {
    pub fn register(
        mut self,
        id: impl Into<String>,
        family: ChainFamily,
        signer: Arc<dyn SignerFactory>,
    ) -> Self {
        let id = id.into();
        let descriptor = ChainDescriptor {
            id: id.clone(),
            family,
            signer,
        };
        match family {
            ChainFamily::Evm => self.registry.evm.insert(id, descriptor),
            ChainFamily::Other => self.registry.non_evm.insert(id, descriptor),
        };
        self
    }

    pub fn build(self) -> ChainRegistry {
        self.registry
    }
}

impl ChainRegistry {
    pub fn builder() -> ChainRegistryBuilder {
        ChainRegistryBuilder::default()
    }

    /// The native chain is always supported, registered or not.
    pub fn is_supported(&self, chain: &str) -> bool {
        chain == NATIVE_CHAIN || self.evm.contains_key(chain) || self.non_evm.contains_key(chain)
    }

    pub fn descriptor(&self, chain: &str) -> Option<&ChainDescriptor> {
        self.evm.get(chain).or_else(|| self.non_evm.get(chain))
    }

    /// Supported chain ids grouped by family, each group sorted.
    pub fn supported_chains(&self) -> SupportedChains {
        let mut evm: Vec<String> = self.evm.keys().cloned().collect();
        if !self.evm.contains_key(NATIVE_CHAIN) {
            evm.push(NATIVE_CHAIN.to_owned());
            evm.sort();
        }
        SupportedChains {
            evm,
            non_evm: self.non_evm.keys().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedChains {
    pub evm: Vec<String>,
    pub non_evm: Vec<String>,
}
