//! # Validation Modules
//!
//! Copy creation and extension are gated by pluggable validation modules:
//! a rule names exactly one module at registration time, and every mint
//! or extension under that rule passes through it. The module owns the
//! business conditions — when minting is open, how many copies may exist,
//! what it costs — while the rule registry owns the state machine.
//!
//! The seam is the [`ValidationModule`] trait; the allow-list of modules
//! an operator trusts is the [`ModuleTable`]. Only the hub ever calls
//! into a module, which is what makes `setup`/`validate_*` effectively
//! registry-only entry points.
//!
//! [`FeeGatedModule`] is the reference implementation: a mint window, a
//! mint limit, an optional required-holding gate, and a flat or
//! duration-proportional fee settled through the [`TokenBank`].

use chrono::{DateTime, Utc};
use replica_protocol::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::bank::{BankError, FungibleId, TokenBank};
use crate::rules::RuleHash;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from validation-module checks and fee settlement.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The module has no configuration for this rule.
    #[error("rule has no validation configuration: {0}")]
    RuleNotConfigured(RuleHash),

    /// The module's initialization payload could not be decoded.
    #[error("invalid module initialization data: {0}")]
    InvalidInitData(String),

    /// Minting attempted before the window opens.
    #[error("mint window not started: opens at {starts_at}")]
    WindowNotStarted {
        /// When minting opens.
        starts_at: DateTime<Utc>,
    },

    /// Minting attempted after the window closed.
    #[error("mint window closed")]
    WindowClosed,

    /// The rule's mint limit has been reached.
    #[error("mint limit reached: {limit} copies already created")]
    MintLimitReached {
        /// The configured ceiling.
        limit: u64,
    },

    /// The recipient does not hold the token this rule requires.
    #[error("recipient holds none of required token {token}")]
    MissingRequiredHolding {
        /// The fungible token the recipient must hold.
        token: FungibleId,
    },

    /// Not enough native value attached to cover the fee.
    #[error("insufficient attached value: attached {attached}, fee is {fee}")]
    InsufficientAttachedValue {
        /// Native value attached to the call.
        attached: u64,
        /// The computed fee.
        fee: u64,
    },

    /// Fee settlement through the bank failed.
    #[error(transparent)]
    Bank(#[from] BankError),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Per-rule configuration of the fee-gated module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationInfo {
    /// Fee denomination: a registered fungible token, or `None` for the
    /// native denomination settled from attached value.
    pub fee_token: Option<FungibleId>,
    /// The nominal copy duration in seconds. For fragmented fees this is
    /// the denominator the mint amount is quoted against.
    pub duration: u64,
    /// Fragmented pricing: the fee scales linearly with the requested
    /// duration. When false the mint amount is flat regardless of
    /// duration.
    pub fragmented: bool,
    /// Fee amount for a mint (at `duration`, if fragmented).
    pub mint_amount: u64,
    /// Fee amount for an extension (at `duration`, if fragmented).
    pub extend_amount: u64,
    /// If set, the recipient must hold a nonzero balance of this token.
    pub required_holding_token: Option<FungibleId>,
    /// Maximum number of copies ever minted under the rule.
    pub mint_limit: u64,
    /// When the mint window opens. Minting at exactly this instant is
    /// still closed; the window is open strictly after it.
    pub window_start: DateTime<Utc>,
    /// Window length in seconds from `window_start`.
    pub window_length: u64,
}

/// Everything a module needs to judge a mint, assembled by the hub.
#[derive(Debug, Clone)]
pub struct MintRequest {
    /// Who receives the copy and pays the fee.
    pub recipient: Address,
    /// The rule being minted under.
    pub rule_hash: RuleHash,
    /// Requested copy duration in seconds.
    pub duration: u64,
    /// Native value attached to the call.
    pub attached_value: u64,
    /// The shared clock.
    pub now: DateTime<Utc>,
    /// Current holder of the creator token — the fee beneficiary.
    pub creator_holder: Address,
    /// The registry's own address, used as the allowance spender when
    /// fees settle from pre-approved token balances.
    pub registry: Address,
}

/// The gate every rule's module must pass before the registry mutates
/// state.
///
/// Implementations are stateful per rule hash: `setup` installs a
/// configuration, `validate_mint`/`validate_extend` enforce it and settle
/// payment. A failed validation must leave the bank untouched.
pub trait ValidationModule {
    /// Installs the rule's configuration from the opaque payload supplied
    /// at rule registration.
    fn setup(&mut self, rule_hash: &str, init: serde_json::Value) -> Result<(), ValidationError>;

    /// Checks every mint condition and settles the mint fee. Called once
    /// per copy creation, before any registry mutation.
    fn validate_mint(&mut self, req: &MintRequest, bank: &mut TokenBank)
        -> Result<(), ValidationError>;

    /// Checks extension conditions and settles the extension fee.
    fn validate_extend(
        &mut self,
        req: &MintRequest,
        bank: &mut TokenBank,
    ) -> Result<(), ValidationError>;

    /// The rule's configuration, if installed. Cloned so the trait stays
    /// object-safe over heterogeneous module types.
    fn validation_info(&self, rule_hash: &str) -> Option<ValidationInfo>;

    /// Copies minted under the rule so far.
    fn mint_count(&self, rule_hash: &str) -> u64;
}

// ---------------------------------------------------------------------------
// Module table
// ---------------------------------------------------------------------------

/// The operator-curated allow-list of validation modules.
///
/// Registering an address here is what allows rules to name it; an
/// address not in the table cannot gate anything. The table owns the
/// module instances, so all calls into them are funneled through whoever
/// owns the table (the hub).
#[derive(Default)]
pub struct ModuleTable {
    modules: HashMap<Address, Box<dyn ValidationModule>>,
}

impl ModuleTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `module` under `address`, allow-listing it. Replaces any
    /// previous module at that address.
    pub fn allow(&mut self, address: &str, module: Box<dyn ValidationModule>) {
        self.modules.insert(address.to_string(), module);
    }

    /// True if the address is allow-listed.
    pub fn is_allowed(&self, address: &str) -> bool {
        self.modules.contains_key(address)
    }

    /// Mutable access to the module at `address`.
    pub fn get_mut(&mut self, address: &str) -> Option<&mut Box<dyn ValidationModule>> {
        self.modules.get_mut(address)
    }

    /// Shared access to the module at `address`.
    pub fn get(&self, address: &str) -> Option<&Box<dyn ValidationModule>> {
        self.modules.get(address)
    }
}

impl std::fmt::Debug for ModuleTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleTable")
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Fee-gated reference module
// ---------------------------------------------------------------------------

/// The reference validation module: window + limit + holding + fee.
///
/// Check order is fixed: window, then limit, then holding, then fee
/// computation and settlement, and only after settlement succeeds does
/// the mint count advance. Any failure leaves both the count and the bank
/// exactly as they were.
#[derive(Debug, Default)]
pub struct FeeGatedModule {
    infos: HashMap<RuleHash, ValidationInfo>,
    mint_counts: HashMap<RuleHash, u64>,
}

impl FeeGatedModule {
    /// Creates an empty module.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fee for a given requested duration.
    ///
    /// Flat pricing ignores the duration. Fragmented pricing scales the
    /// nominal amount linearly: `duration * amount / nominal_duration`,
    /// computed in u128 and truncated toward zero, so a third of the
    /// nominal duration costs a (rounded-down) third of the amount. A
    /// zero nominal duration degrades to flat pricing rather than
    /// dividing by zero.
    fn fee_for(info: &ValidationInfo, amount: u64, duration: u64) -> u64 {
        if !info.fragmented || info.duration == 0 {
            return amount;
        }
        let scaled = u128::from(duration) * u128::from(amount) / u128::from(info.duration);
        u64::try_from(scaled).unwrap_or(u64::MAX)
    }

    fn info_for(&self, rule_hash: &str) -> Result<&ValidationInfo, ValidationError> {
        self.infos
            .get(rule_hash)
            .ok_or_else(|| ValidationError::RuleNotConfigured(rule_hash.to_string()))
    }

    /// Settles `fee` from the recipient to the creator holder. Native fees
    /// come out of attached value; token fees pull from the recipient's
    /// pre-approved balance with the registry as spender.
    fn settle(
        fee: u64,
        info: &ValidationInfo,
        req: &MintRequest,
        bank: &mut TokenBank,
    ) -> Result<(), ValidationError> {
        if fee == 0 {
            return Ok(());
        }
        match &info.fee_token {
            None => {
                if req.attached_value < fee {
                    return Err(ValidationError::InsufficientAttachedValue {
                        attached: req.attached_value,
                        fee,
                    });
                }
                bank.credit_native(&req.creator_holder, fee)?;
            }
            Some(token) => {
                bank.transfer_from(
                    &req.registry,
                    token,
                    &req.recipient,
                    &req.creator_holder,
                    fee,
                )?;
            }
        }
        Ok(())
    }

    /// Shared pre-payment checks for a mint: window, limit, holding.
    fn check_mint_conditions(
        &self,
        info: &ValidationInfo,
        req: &MintRequest,
        bank: &TokenBank,
    ) -> Result<(), ValidationError> {
        // Strictly after the start instant. Checking the start first also
        // means the elapsed subtraction below cannot underflow.
        if req.now <= info.window_start {
            return Err(ValidationError::WindowNotStarted {
                starts_at: info.window_start,
            });
        }
        let elapsed = (req.now - info.window_start)
            .num_seconds()
            .unsigned_abs();
        if elapsed >= info.window_length {
            return Err(ValidationError::WindowClosed);
        }

        let minted = self.mint_counts.get(&req.rule_hash).copied().unwrap_or(0);
        if minted >= info.mint_limit {
            return Err(ValidationError::MintLimitReached {
                limit: info.mint_limit,
            });
        }

        if let Some(token) = &info.required_holding_token {
            if bank.balance_of(token, &req.recipient) == 0 {
                return Err(ValidationError::MissingRequiredHolding {
                    token: token.clone(),
                });
            }
        }
        Ok(())
    }
}

impl ValidationModule for FeeGatedModule {
    fn setup(&mut self, rule_hash: &str, init: serde_json::Value) -> Result<(), ValidationError> {
        let info: ValidationInfo = serde_json::from_value(init)
            .map_err(|e| ValidationError::InvalidInitData(e.to_string()))?;
        self.infos.insert(rule_hash.to_string(), info);
        self.mint_counts.entry(rule_hash.to_string()).or_insert(0);
        Ok(())
    }

    fn validate_mint(
        &mut self,
        req: &MintRequest,
        bank: &mut TokenBank,
    ) -> Result<(), ValidationError> {
        let info = self.info_for(&req.rule_hash)?.clone();
        self.check_mint_conditions(&info, req, bank)?;

        let fee = Self::fee_for(&info, info.mint_amount, req.duration);
        Self::settle(fee, &info, req, bank)?;

        // Count only after payment landed.
        *self.mint_counts.entry(req.rule_hash.clone()).or_insert(0) += 1;
        Ok(())
    }

    fn validate_extend(
        &mut self,
        req: &MintRequest,
        bank: &mut TokenBank,
    ) -> Result<(), ValidationError> {
        let info = self.info_for(&req.rule_hash)?.clone();
        // Extension is deliberately exempt from window, limit, and holding
        // checks: a paused or closed-out rule still lets existing holders
        // renew.
        let fee = Self::fee_for(&info, info.extend_amount, req.duration);
        Self::settle(fee, &info, req, bank)
    }

    fn validation_info(&self, rule_hash: &str) -> Option<ValidationInfo> {
        self.infos.get(rule_hash).cloned()
    }

    fn mint_count(&self, rule_hash: &str) -> u64 {
        self.mint_counts.get(rule_hash).copied().unwrap_or(0)
    }
}
