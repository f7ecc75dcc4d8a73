//! Soft-delete account ledger carried inside the vault payload.
//!
//! Deleted accounts stay in the list with `is_deleted` set so their history
//! remains attributable; `number_of_accounts` counts every account ever
//! derived and never decreases, which keeps HD re-derivation deterministic.

use eyre::Context as _;
use serde::{Deserialize, Serialize};

use crate::errors::VaultError;

/// Label given to the first account of a freshly generated vault.
pub const SEED_ACCOUNT_LABEL: &str = "Wallet 1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: String,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub is_imported: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Account {
    pub fn active(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            is_deleted: false,
            is_imported: false,
            label: None,
        }
    }

    pub fn inactive(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            is_deleted: true,
            is_imported: false,
            label: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLedger {
    accounts: Vec<Account>,
    number_of_accounts: u32,
}

impl AccountLedger {
    /// Ledger for a brand-new vault: one seed account, labeled.
    pub fn with_seed(address: impl Into<String>) -> Self {
        let mut seed = Account::active(address);
        seed.label = Some(SEED_ACCOUNT_LABEL.to_owned());
        Self {
            accounts: vec![seed],
            number_of_accounts: 1,
        }
    }

    /// Ledger rebuilt from a discovery scan. The list keeps scan order and
    /// must start with the seed account.
    pub fn from_discovered(accounts: Vec<Account>) -> eyre::Result<Self> {
        if accounts.is_empty() {
            eyre::bail!("discovered account list is empty");
        }
        let mut seen = std::collections::BTreeSet::new();
        for account in &accounts {
            if !seen.insert(account.address.as_str()) {
                eyre::bail!("duplicate discovered address: {}", account.address);
            }
        }
        let number_of_accounts =
            u32::try_from(accounts.len()).context("too many discovered accounts")?;
        Ok(Self {
            accounts,
            number_of_accounts,
        })
    }

    /// Record a newly derived account. The derivation counter moves by
    /// exactly one per successful call.
    pub fn add(&mut self, address: &str) -> eyre::Result<()> {
        if self.contains(address) {
            eyre::bail!("account address already present: {address}");
        }
        self.accounts.push(Account::active(address));
        self.number_of_accounts += 1;
        Ok(())
    }

    /// Mark an account deleted. Idempotent: deleting an already-deleted
    /// address succeeds and leaves it deleted. The derivation counter is
    /// untouched.
    pub fn soft_delete(&mut self, address: &str) -> eyre::Result<()> {
        let Some(account) = self.accounts.iter_mut().find(|a| a.address == address) else {
            return Err(VaultError::AddressNotPresent(address.to_owned()).into());
        };
        account.is_deleted = true;
        Ok(())
    }

    pub fn set_label(&mut self, address: &str, label: &str) -> eyre::Result<()> {
        let Some(account) = self.accounts.iter_mut().find(|a| a.address == address) else {
            return Err(VaultError::AddressNotPresent(address.to_owned()).into());
        };
        account.label = Some(label.to_owned());
        Ok(())
    }

    /// Membership over every entry, deleted ones included.
    pub fn contains(&self, address: &str) -> bool {
        self.accounts.iter().any(|a| a.address == address)
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn active_accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter().filter(|a| !a.is_deleted)
    }

    /// Total accounts ever derived, deleted ones included.
    pub const fn number_of_accounts(&self) -> u32 {
        self.number_of_accounts
    }

    pub fn visible_len(&self) -> usize {
        self.active_accounts().count()
    }
}
