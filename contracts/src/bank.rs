//! # Token Bank
//!
//! The fungible ledger that copy fees settle through. Two kinds of money
//! live here:
//!
//! - **Fungible tokens** — registered by an issuer, minted issuer-only,
//!   spendable by their holders directly or through allowances. A rule's
//!   fee token and its required-holding token are both ids into this
//!   table.
//! - **Native value** — the host chain's own denomination. It arrives
//!   attached to a call (`CallContext::value`) and is credited to an
//!   account here when a fee is collected, so creators accumulate a
//!   withdrawable balance.
//!
//! ## Security Model
//!
//! - **Mint gating**: only the registering issuer can mint supply. The
//!   caller identity comes from the host-authenticated [`CallContext`].
//! - **Allowances**: `transfer_from` spends someone else's balance only
//!   up to the amount that owner explicitly approved for the spender.
//!   This is the "pre-authorized balance" the validation module pulls
//!   fees from.
//! - **Overflow**: supply and balances are maintained with checked
//!   arithmetic on every operation.

use replica_protocol::env::CallContext;
use replica_protocol::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Identifier for a registered fungible token. Uppercased ticker symbol,
/// unique across the bank.
pub type FungibleId = String;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during bank operations.
#[derive(Debug, Error)]
pub enum BankError {
    /// The referenced token does not exist.
    #[error("token not found: {0}")]
    TokenNotFound(FungibleId),

    /// A token with this symbol is already registered.
    #[error("duplicate token: '{0}' is already registered")]
    DuplicateToken(FungibleId),

    /// The caller is not the issuer of this token.
    #[error("unauthorized mint: {caller} is not the issuer of {token}")]
    UnauthorizedMint {
        /// The address that attempted the mint.
        caller: Address,
        /// The token it tried to mint.
        token: FungibleId,
    },

    /// An arithmetic overflow would occur.
    #[error("balance overflow")]
    BalanceOverflow,

    /// The account does not hold enough of the token.
    #[error("insufficient balance: account has {balance}, needs {needed}")]
    InsufficientBalance {
        /// Current balance of the paying account.
        balance: u64,
        /// Amount the operation required.
        needed: u64,
    },

    /// The spender's allowance from the owner is too small.
    #[error("insufficient allowance: approved {allowance}, needs {needed}")]
    InsufficientAllowance {
        /// Amount currently approved for the spender.
        allowance: u64,
        /// Amount the operation required.
        needed: u64,
    },
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Metadata and supply for a registered fungible token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FungibleToken {
    /// Unique token id (uppercased symbol).
    pub id: FungibleId,
    /// Human-readable name.
    pub name: String,
    /// The identity allowed to mint supply.
    pub issuer: Address,
    /// Current total supply in the smallest denomination.
    pub total_supply: u64,
}

/// The bank — fungible balances, allowances, and native-value accounts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenBank {
    /// Registered tokens keyed by id.
    tokens: HashMap<FungibleId, FungibleToken>,
    /// Per-token, per-address balances: `token -> (address -> balance)`.
    balances: HashMap<FungibleId, HashMap<Address, u64>>,
    /// Per-token allowances: `token -> ((owner, spender) -> amount)`.
    allowances: HashMap<FungibleId, HashMap<(Address, Address), u64>>,
    /// Native-value accounts.
    native: HashMap<Address, u64>,
}

impl TokenBank {
    /// Creates a new, empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new fungible token and returns its id.
    ///
    /// The caller becomes the issuer. The token starts with zero supply.
    ///
    /// # Errors
    ///
    /// Returns [`BankError::DuplicateToken`] if the symbol is taken.
    pub fn register_token(
        &mut self,
        ctx: &CallContext,
        symbol: &str,
        name: &str,
    ) -> Result<FungibleId, BankError> {
        let id = symbol.to_uppercase();
        if self.tokens.contains_key(&id) {
            return Err(BankError::DuplicateToken(id));
        }
        self.tokens.insert(
            id.clone(),
            FungibleToken {
                id: id.clone(),
                name: name.to_string(),
                issuer: ctx.caller.clone(),
                total_supply: 0,
            },
        );
        self.balances.insert(id.clone(), HashMap::new());
        self.allowances.insert(id.clone(), HashMap::new());
        Ok(id)
    }

    /// Mints new tokens to `to`. Issuer-only.
    ///
    /// # Errors
    ///
    /// Returns [`BankError::TokenNotFound`] for an unknown token,
    /// [`BankError::UnauthorizedMint`] if the caller isn't the issuer, and
    /// [`BankError::BalanceOverflow`] if supply would overflow.
    pub fn mint(
        &mut self,
        ctx: &CallContext,
        token: &str,
        to: &str,
        amount: u64,
    ) -> Result<(), BankError> {
        let info = self
            .tokens
            .get_mut(token)
            .ok_or_else(|| BankError::TokenNotFound(token.to_string()))?;
        if info.issuer != ctx.caller {
            return Err(BankError::UnauthorizedMint {
                caller: ctx.caller.clone(),
                token: token.to_string(),
            });
        }
        info.total_supply = info
            .total_supply
            .checked_add(amount)
            .ok_or(BankError::BalanceOverflow)?;

        let balances = self.balances.entry(token.to_string()).or_default();
        let balance = balances.entry(to.to_string()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(BankError::BalanceOverflow)?;
        Ok(())
    }

    /// Approves `spender` to move up to `amount` of the caller's `token`
    /// balance. Overwrites any previous approval for that spender.
    pub fn approve(
        &mut self,
        ctx: &CallContext,
        token: &str,
        spender: &str,
        amount: u64,
    ) -> Result<(), BankError> {
        if !self.tokens.contains_key(token) {
            return Err(BankError::TokenNotFound(token.to_string()));
        }
        self.allowances
            .entry(token.to_string())
            .or_default()
            .insert((ctx.caller.clone(), spender.to_string()), amount);
        Ok(())
    }

    /// Moves `amount` of `token` from `from` to `to`, spending `spender`'s
    /// allowance.
    ///
    /// Allowance is checked and decremented before the balance moves, so a
    /// failure partway cannot leave the allowance spent without payment.
    ///
    /// # Errors
    ///
    /// [`BankError::InsufficientAllowance`] if the spender isn't approved
    /// for `amount`; [`BankError::InsufficientBalance`] if `from` can't
    /// cover it.
    pub fn transfer_from(
        &mut self,
        spender: &str,
        token: &str,
        from: &str,
        to: &str,
        amount: u64,
    ) -> Result<(), BankError> {
        if !self.tokens.contains_key(token) {
            return Err(BankError::TokenNotFound(token.to_string()));
        }

        let key = (from.to_string(), spender.to_string());
        let allowance = self
            .allowances
            .get(token)
            .and_then(|a| a.get(&key))
            .copied()
            .unwrap_or(0);
        if allowance < amount {
            return Err(BankError::InsufficientAllowance {
                allowance,
                needed: amount,
            });
        }

        let balances = self
            .balances
            .get_mut(token)
            .ok_or_else(|| BankError::TokenNotFound(token.to_string()))?;
        let from_balance = balances.get(from).copied().unwrap_or(0);
        if from_balance < amount {
            return Err(BankError::InsufficientBalance {
                balance: from_balance,
                needed: amount,
            });
        }

        balances.insert(from.to_string(), from_balance - amount);
        let to_balance = balances.entry(to.to_string()).or_insert(0);
        *to_balance = to_balance
            .checked_add(amount)
            .ok_or(BankError::BalanceOverflow)?;

        // Burn the spent allowance only after the transfer succeeded.
        if let Some(a) = self.allowances.get_mut(token) {
            a.insert(key, allowance - amount);
        }
        Ok(())
    }

    /// Credits native value to an account. Called when an attached-value
    /// fee is collected for a creator.
    pub fn credit_native(&mut self, to: &str, amount: u64) -> Result<(), BankError> {
        let balance = self.native.entry(to.to_string()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(BankError::BalanceOverflow)?;
        Ok(())
    }

    /// Returns the balance of `address` for the given token, or 0.
    pub fn balance_of(&self, token: &str, address: &str) -> u64 {
        self.balances
            .get(token)
            .and_then(|b| b.get(address))
            .copied()
            .unwrap_or(0)
    }

    /// Returns the remaining allowance from `owner` to `spender`, or 0.
    pub fn allowance(&self, token: &str, owner: &str, spender: &str) -> u64 {
        self.allowances
            .get(token)
            .and_then(|a| a.get(&(owner.to_string(), spender.to_string())))
            .copied()
            .unwrap_or(0)
    }

    /// Returns the native-value balance of `address`, or 0.
    pub fn native_balance_of(&self, address: &str) -> u64 {
        self.native.get(address).copied().unwrap_or(0)
    }

    /// Returns metadata for a token, or `None`.
    pub fn token(&self, token: &str) -> Option<&FungibleToken> {
        self.tokens.get(token)
    }

    /// True if the token id is registered.
    pub fn token_exists(&self, token: &str) -> bool {
        self.tokens.contains_key(token)
    }
}
