//! # Replica Hub
//!
//! The single entry point tying the contracts together: creator registry,
//! rule registry, validation modules, and the token bank behind one
//! serialized store. Each `&mut self` method is one atomic operation —
//! the host runtime serializes calls, so an operation either completes
//! fully or returns an error having changed nothing the caller can
//! observe.
//!
//! Every mutating path follows the same ordering: authorization and
//! precondition checks first, value movement second, state mutation last.
//! Fee settlement can therefore never happen for an operation that fails
//! its checks, and state never mutates for an operation that fails to
//! pay.
//!
//! The hub is also the "registry identity": the [`ModuleTable`] is a
//! private field, so validation-module entry points (`setup`,
//! `validate_mint`, `validate_extend`) are reachable only through hub
//! methods, never from arbitrary callers.

use chrono::{DateTime, Utc};
use replica_protocol::env::CallContext;
use replica_protocol::permit::CreationPermit;
use replica_protocol::Address;

use crate::bank::{BankError, FungibleId, FungibleToken, TokenBank};
use crate::creator_registry::{CreatorError, CreatorId, CreatorRegistry, CreatorToken};
use crate::events::{EventLog, ReplicaEvent};
use crate::rules::{
    compute_rule_hash, CopyId, CopyToken, RuleDescriptor, RuleError, RuleHash, RuleRecord,
    RuleRegistry, RuleState,
};
use crate::validation::{MintRequest, ModuleTable, ValidationInfo, ValidationModule};

/// The address fee allowances must be approved for. Token-denominated
/// fees are pulled with this identity as the spender.
pub const REGISTRY_ADDRESS: &str = "replica:rule-registry";

/// The aggregated contract state. See the module docs for the execution
/// model.
#[derive(Debug)]
pub struct ReplicaHub {
    /// The operator allowed to curate the module allow-list.
    owner: Address,
    creators: CreatorRegistry,
    rules: RuleRegistry,
    modules: ModuleTable,
    bank: TokenBank,
    events: EventLog,
}

impl ReplicaHub {
    /// Creates a hub administered by `owner`.
    pub fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            creators: CreatorRegistry::new(),
            rules: RuleRegistry::new(),
            modules: ModuleTable::new(),
            bank: TokenBank::new(),
            events: EventLog::new(),
        }
    }

    // -- administration ------------------------------------------------------

    /// Allow-lists a validation module under `address`. Owner-only.
    pub fn allow_module(
        &mut self,
        ctx: &CallContext,
        address: &str,
        module: Box<dyn ValidationModule>,
    ) -> Result<(), RuleError> {
        if ctx.caller != self.owner {
            return Err(RuleError::Unauthorized {
                caller: ctx.caller.clone(),
                action: "allow-list validation modules",
            });
        }
        self.modules.allow(address, module);
        Ok(())
    }

    /// True if `address` is an allow-listed module.
    pub fn is_module_allowed(&self, address: &str) -> bool {
        self.modules.is_allowed(address)
    }

    // -- creator tokens ------------------------------------------------------

    /// Mints a creator token for `recipient`, permit-gated.
    pub fn create_creator(
        &mut self,
        ctx: &CallContext,
        recipient: &str,
        content_pointer: &str,
        permit: &CreationPermit,
    ) -> Result<CreatorId, CreatorError> {
        let id = self.creators.create(ctx, recipient, content_pointer, permit)?;
        self.events.record(ReplicaEvent::CreatorCreated {
            id: id.clone(),
            holder: recipient.to_string(),
            content_pointer: content_pointer.to_string(),
        });
        Ok(id)
    }

    /// Mints a creator token and pre-authorizes `delegate` for it.
    pub fn create_creator_with_delegate(
        &mut self,
        ctx: &CallContext,
        recipient: &str,
        delegate: &str,
        content_pointer: &str,
        permit: &CreationPermit,
    ) -> Result<CreatorId, CreatorError> {
        let id = self
            .creators
            .create_with_delegate(ctx, recipient, delegate, content_pointer, permit)?;
        self.events.record(ReplicaEvent::CreatorCreated {
            id: id.clone(),
            holder: recipient.to_string(),
            content_pointer: content_pointer.to_string(),
        });
        Ok(id)
    }

    /// Re-points a creator token's content. Holder + fresh permit.
    pub fn update_creator(
        &mut self,
        ctx: &CallContext,
        id: &str,
        content_pointer: &str,
        permit: &CreationPermit,
    ) -> Result<(), CreatorError> {
        self.creators.update(ctx, id, content_pointer, permit)?;
        self.events.record(ReplicaEvent::CreatorUpdated {
            id: id.to_string(),
            content_pointer: content_pointer.to_string(),
        });
        Ok(())
    }

    /// Burns a creator token. Holder-only; existing copies are untouched.
    pub fn burn_creator(&mut self, ctx: &CallContext, id: &str) -> Result<(), CreatorError> {
        self.creators.burn(ctx, id)?;
        self.events
            .record(ReplicaEvent::CreatorBurned { id: id.to_string() });
        Ok(())
    }

    /// Full creator-token record.
    pub fn creator_token(&self, id: &str) -> Option<&CreatorToken> {
        self.creators.token(id)
    }

    /// True if the creator token exists (created and not burned).
    pub fn creator_exists(&self, id: &str) -> bool {
        self.creators.exists(id)
    }

    /// How many creator tokens have ever been minted for `recipient`.
    /// Monotonic; burns do not decrement it.
    pub fn creator_token_counter(&self, recipient: &str) -> u64 {
        self.creators.token_counter(recipient)
    }

    /// Pure preview of the id creation number `counter + offset` would
    /// assign for `recipient`.
    pub fn preview_creator_id(&self, recipient: &str, offset: u64) -> CreatorId {
        self.creators.new_token_id(recipient, offset)
    }

    // -- rules ---------------------------------------------------------------

    /// Registers (or reactivates) a rule and installs its validation
    /// configuration.
    ///
    /// The caller must be the creator token's holder or delegate, and the
    /// named module must be allow-listed. `init` is forwarded to the
    /// module's `setup` untouched.
    pub fn set_rule(
        &mut self,
        ctx: &CallContext,
        desc: RuleDescriptor,
        init: serde_json::Value,
    ) -> Result<RuleHash, RuleError> {
        // Surfaces NotFound for a burned or never-minted creator.
        self.creators.holder_of(&desc.creator_id)?;
        if !self.creators.is_authorized(&ctx.caller, &desc.creator_id) {
            return Err(RuleError::Unauthorized {
                caller: ctx.caller.clone(),
                action: "register rules for this creator",
            });
        }
        if !self.modules.is_allowed(&desc.module) {
            return Err(RuleError::ModuleNotAllowed(desc.module.clone()));
        }

        let creator_id = desc.creator_id.clone();
        let module_addr = desc.module.clone();
        let rule_hash = compute_rule_hash(&desc);

        // The module must accept its configuration before the registry
        // mutates: a rejected init leaves a NIL hash NIL and a PAUSED
        // hash PAUSED.
        let module = self
            .modules
            .get_mut(&module_addr)
            .ok_or_else(|| RuleError::ModuleNotAllowed(module_addr.clone()))?;
        module.setup(&rule_hash, init)?;
        self.rules.register(desc);

        self.events.record(ReplicaEvent::RuleSet {
            rule_hash: rule_hash.clone(),
            creator_id,
            module: module_addr,
        });
        Ok(rule_hash)
    }

    /// Pauses a rule. Creator holder/delegate only.
    pub fn pause_rule(&mut self, ctx: &CallContext, rule_hash: &str) -> Result<(), RuleError> {
        let record = self
            .rules
            .record(rule_hash)
            .ok_or_else(|| RuleError::RuleNotFound(rule_hash.to_string()))?;
        if !self.creators.is_authorized(&ctx.caller, &record.creator_id) {
            return Err(RuleError::Unauthorized {
                caller: ctx.caller.clone(),
                action: "pause this rule",
            });
        }
        self.rules.pause(rule_hash)?;
        self.events.record(ReplicaEvent::RulePaused {
            rule_hash: rule_hash.to_string(),
        });
        Ok(())
    }

    /// The state of a rule hash. NIL for unknown hashes.
    pub fn rule_state(&self, rule_hash: &str) -> RuleState {
        self.rules.state(rule_hash)
    }

    /// The rule record, if any has ever existed.
    pub fn rule_record(&self, rule_hash: &str) -> Option<&RuleRecord> {
        self.rules.record(rule_hash)
    }

    /// Every hash the creator has ever registered, in order.
    pub fn rule_hashes_for_creator(&self, creator_id: &str) -> &[RuleHash] {
        self.rules.rule_hashes_for_creator(creator_id)
    }

    /// Copies minted under the rule so far, as counted by its module.
    pub fn mint_count(&self, rule_hash: &str) -> Result<u64, RuleError> {
        let record = self
            .rules
            .record(rule_hash)
            .ok_or_else(|| RuleError::RuleNotFound(rule_hash.to_string()))?;
        let module = self
            .modules
            .get(&record.module)
            .ok_or_else(|| RuleError::ModuleNotAllowed(record.module.clone()))?;
        Ok(module.mint_count(rule_hash))
    }

    /// The rule's validation configuration, as reported by its module.
    pub fn validation_info(&self, rule_hash: &str) -> Result<Option<ValidationInfo>, RuleError> {
        let record = self
            .rules
            .record(rule_hash)
            .ok_or_else(|| RuleError::RuleNotFound(rule_hash.to_string()))?;
        let module = self
            .modules
            .get(&record.module)
            .ok_or_else(|| RuleError::ModuleNotAllowed(record.module.clone()))?;
        Ok(module.validation_info(rule_hash))
    }

    // -- copies --------------------------------------------------------------

    /// Mints a copy of `rule_hash` for `recipient` with the requested
    /// duration. The caller need not be the recipient — gifting and
    /// orchestrated mints pass a third party.
    ///
    /// Holding and token-fee checks gate on the recipient; native fees
    /// come out of the caller's attached value. Ordering: rule must be
    /// EXIST, the creator must still exist, the rule's module validates
    /// the mint and settles the fee, and only then does the registry
    /// mint. The copy's content pointer is a snapshot of the creator's
    /// at this instant.
    pub fn create_copy(
        &mut self,
        ctx: &CallContext,
        recipient: &str,
        rule_hash: &str,
        duration: u64,
    ) -> Result<(CopyId, DateTime<Utc>), RuleError> {
        let record = self
            .rules
            .record(rule_hash)
            .ok_or_else(|| RuleError::RuleNotFound(rule_hash.to_string()))?;
        if record.state != RuleState::Exist {
            return Err(RuleError::RuleNotActive {
                rule_hash: rule_hash.to_string(),
                state: record.state,
            });
        }
        let creator_id = record.creator_id.clone();
        let module_addr = record.module.clone();
        let creator_holder = self.creators.holder_of(&creator_id)?.clone();
        let snapshot = self.creators.content_pointer_of(&creator_id)?.to_string();

        let req = MintRequest {
            recipient: recipient.to_string(),
            rule_hash: rule_hash.to_string(),
            duration,
            attached_value: ctx.value,
            now: ctx.now,
            creator_holder,
            registry: REGISTRY_ADDRESS.to_string(),
        };
        let module = self
            .modules
            .get_mut(&module_addr)
            .ok_or(RuleError::ModuleNotAllowed(module_addr))?;
        module.validate_mint(&req, &mut self.bank)?;

        let (copy_id, expiry) =
            self.rules
                .mint_copy(recipient, rule_hash, duration, ctx.now, snapshot)?;
        self.events.record(ReplicaEvent::CopyCreated {
            id: copy_id.clone(),
            rule_hash: rule_hash.to_string(),
            recipient: recipient.to_string(),
            expiry,
        });
        Ok((copy_id, expiry))
    }

    /// Extends a copy's expiry by `duration` seconds, settling the
    /// extension fee.
    ///
    /// Requires the rule's extendable flag. The rule may be PAUSED —
    /// pausing cuts off new supply, not renewals. An expired copy
    /// restarts from now; an unexpired one stacks on its current expiry.
    pub fn extend_copy(
        &mut self,
        ctx: &CallContext,
        copy_id: &str,
        duration: u64,
    ) -> Result<DateTime<Utc>, RuleError> {
        let copy = self
            .rules
            .copy(copy_id)
            .ok_or_else(|| RuleError::CopyNotFound(copy_id.to_string()))?;
        let rule_hash = copy.rule_hash.clone();
        let record = self
            .rules
            .record(&rule_hash)
            .ok_or_else(|| RuleError::RuleNotFound(rule_hash.clone()))?;
        if !record.flags.extendable {
            return Err(RuleError::NotExtendable(copy_id.to_string()));
        }
        let creator_id = record.creator_id.clone();
        let module_addr = record.module.clone();
        let creator_holder = self.creators.holder_of(&creator_id)?.clone();

        let req = MintRequest {
            recipient: ctx.caller.clone(),
            rule_hash,
            duration,
            attached_value: ctx.value,
            now: ctx.now,
            creator_holder,
            registry: REGISTRY_ADDRESS.to_string(),
        };
        let module = self
            .modules
            .get_mut(&module_addr)
            .ok_or(RuleError::ModuleNotAllowed(module_addr))?;
        module.validate_extend(&req, &mut self.bank)?;

        let expiry = self.rules.extend_expiry(copy_id, duration, ctx.now)?;
        self.events.record(ReplicaEvent::CopyExtended {
            id: copy_id.to_string(),
            expiry,
        });
        Ok(expiry)
    }

    /// Re-points a copy's content. Holder/operator, updatable rule,
    /// unexpired copy.
    pub fn update_copy(
        &mut self,
        ctx: &CallContext,
        copy_id: &str,
        content_pointer: &str,
    ) -> Result<(), RuleError> {
        self.rules.update_copy(ctx, copy_id, content_pointer)?;
        self.events.record(ReplicaEvent::CopyUpdated {
            id: copy_id.to_string(),
            content_pointer: content_pointer.to_string(),
        });
        Ok(())
    }

    /// Revokes a copy from the creator side.
    ///
    /// The caller must be the creator's holder or delegate, and the copy
    /// must be revokable (flag set, or already expired).
    pub fn revoke_copy(&mut self, ctx: &CallContext, copy_id: &str) -> Result<(), RuleError> {
        let creator_id = self.rules.creator_of(copy_id)?.clone();
        if !self.creators.is_authorized(&ctx.caller, &creator_id) {
            return Err(RuleError::Unauthorized {
                caller: ctx.caller.clone(),
                action: "revoke copies of this creator",
            });
        }
        self.rules.revoke(copy_id, ctx.now)?;
        self.events.record(ReplicaEvent::CopyRevoked {
            id: copy_id.to_string(),
        });
        Ok(())
    }

    /// Destroys a copy at its holder's (or operator's) request.
    pub fn destroy_copy(&mut self, ctx: &CallContext, copy_id: &str) -> Result<(), RuleError> {
        self.rules.destroy(ctx, copy_id)?;
        self.events.record(ReplicaEvent::CopyDestroyed {
            id: copy_id.to_string(),
        });
        Ok(())
    }

    /// Transfers a copy to `to`. Transferable rule, unexpired copy,
    /// holder/operator caller.
    pub fn transfer_copy(
        &mut self,
        ctx: &CallContext,
        copy_id: &str,
        to: &str,
    ) -> Result<(), RuleError> {
        let from = self.rules.holder_of(copy_id)?.clone();
        self.rules.transfer(ctx, copy_id, to)?;
        self.events.record(ReplicaEvent::CopyTransferred {
            id: copy_id.to_string(),
            from,
            to: to.to_string(),
        });
        Ok(())
    }

    /// Approves or revokes `operator` for all of the caller's copies.
    pub fn approve_operator(&mut self, ctx: &CallContext, operator: &str, approved: bool) {
        self.rules.set_operator(ctx, operator, approved);
    }

    /// Full copy-token record.
    pub fn copy(&self, copy_id: &str) -> Option<&CopyToken> {
        self.rules.copy(copy_id)
    }

    /// Current holder of a copy.
    pub fn copy_holder(&self, copy_id: &str) -> Result<&Address, RuleError> {
        self.rules.holder_of(copy_id)
    }

    /// When a copy lapses.
    pub fn copy_expire_at(&self, copy_id: &str) -> Result<DateTime<Utc>, RuleError> {
        self.rules.expire_at(copy_id)
    }

    /// True if the copy has lapsed at `now`.
    pub fn is_copy_expired(&self, copy_id: &str, now: DateTime<Utc>) -> Result<bool, RuleError> {
        self.rules.is_expired(copy_id, now)
    }

    /// True if the copy can change hands at `now`.
    pub fn is_copy_transferable(
        &self,
        copy_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, RuleError> {
        self.rules.is_transferable(copy_id, now)
    }

    /// True if the copy's pointer can be re-pointed at `now`.
    pub fn is_copy_updatable(&self, copy_id: &str, now: DateTime<Utc>) -> Result<bool, RuleError> {
        self.rules.is_updatable(copy_id, now)
    }

    /// True if the creator side may revoke the copy at `now`.
    pub fn is_copy_revokable(&self, copy_id: &str, now: DateTime<Utc>) -> Result<bool, RuleError> {
        self.rules.is_revokable(copy_id, now)
    }

    /// True if the copy's rule allows extension.
    pub fn is_copy_extendable(&self, copy_id: &str) -> Result<bool, RuleError> {
        self.rules.is_extendable(copy_id)
    }

    /// True if `holder` holds at least one unexpired copy of `creator_id`.
    pub fn has_valid_copy(&self, holder: &str, creator_id: &str, now: DateTime<Utc>) -> bool {
        self.rules.has_valid_copy(holder, creator_id, now)
    }

    /// The creator's copy index.
    pub fn copies_of_creator(&self, creator_id: &str) -> &[CopyId] {
        self.rules.copies_of_creator(creator_id)
    }

    // -- fee tokens ----------------------------------------------------------

    /// Registers a fungible fee token; the caller becomes its issuer.
    pub fn register_fee_token(
        &mut self,
        ctx: &CallContext,
        symbol: &str,
        name: &str,
    ) -> Result<FungibleId, BankError> {
        self.bank.register_token(ctx, symbol, name)
    }

    /// Mints fee-token supply. Issuer-only.
    pub fn mint_fee_token(
        &mut self,
        ctx: &CallContext,
        token: &str,
        to: &str,
        amount: u64,
    ) -> Result<(), BankError> {
        self.bank.mint(ctx, token, to, amount)
    }

    /// Pre-authorizes the registry to pull up to `amount` of the caller's
    /// `token` balance for fees.
    pub fn approve_fee(
        &mut self,
        ctx: &CallContext,
        token: &str,
        amount: u64,
    ) -> Result<(), BankError> {
        self.bank.approve(ctx, token, REGISTRY_ADDRESS, amount)
    }

    /// Fee-token balance of `address`.
    pub fn fee_balance_of(&self, token: &str, address: &str) -> u64 {
        self.bank.balance_of(token, address)
    }

    /// Remaining fee allowance `owner` has granted the registry.
    pub fn fee_allowance_of(&self, token: &str, owner: &str) -> u64 {
        self.bank.allowance(token, owner, REGISTRY_ADDRESS)
    }

    /// Native-value balance accumulated by `address`.
    pub fn native_balance_of(&self, address: &str) -> u64 {
        self.bank.native_balance_of(address)
    }

    /// Fee-token metadata.
    pub fn fee_token(&self, token: &str) -> Option<&FungibleToken> {
        self.bank.token(token)
    }

    // -- events --------------------------------------------------------------

    /// Every event emitted so far, in order.
    pub fn events(&self) -> &[ReplicaEvent] {
        self.events.all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{PermissionFlags, Statement};
    use crate::validation::FeeGatedModule;
    use chrono::TimeDelta;
    use replica_protocol::ReplicaKeypair;

    const OWNER: &str = "hub-owner";
    const MODULE: &str = "fee-module";

    fn ctx(caller: &str, now: DateTime<Utc>) -> CallContext {
        CallContext::new(caller, now)
    }

    fn hub_with_module(now: DateTime<Utc>) -> ReplicaHub {
        let mut hub = ReplicaHub::new(OWNER);
        hub.allow_module(&ctx(OWNER, now), MODULE, Box::new(FeeGatedModule::new()))
            .unwrap();
        hub
    }

    fn mint_creator(hub: &mut ReplicaHub, kp: &ReplicaKeypair, now: DateTime<Utc>) -> CreatorId {
        let permit = CreationPermit::sign(kp, "ipfs://art", now + TimeDelta::hours(1));
        hub.create_creator(&ctx("anyone", now), &kp.address(), "ipfs://art", &permit)
            .unwrap()
    }

    fn open_init(now: DateTime<Utc>) -> serde_json::Value {
        serde_json::json!({
            "fee_token": null,
            "duration": 300,
            "fragmented": false,
            "mint_amount": 0,
            "extend_amount": 0,
            "required_holding_token": null,
            "mint_limit": 100,
            "window_start": now - TimeDelta::seconds(10),
            "window_length": 100_000,
        })
    }

    fn descriptor(creator_id: &str, flags: PermissionFlags) -> RuleDescriptor {
        RuleDescriptor {
            creator_id: creator_id.to_string(),
            module: MODULE.to_string(),
            flags,
            statement: Statement::Distribution,
            data: serde_json::Value::Null,
        }
    }

    #[test]
    fn allow_module_is_owner_only() {
        let now = Utc::now();
        let mut hub = ReplicaHub::new(OWNER);
        let result = hub.allow_module(&ctx("mallory", now), MODULE, Box::new(FeeGatedModule::new()));
        assert!(matches!(result, Err(RuleError::Unauthorized { .. })));
        assert!(!hub.is_module_allowed(MODULE));

        hub.allow_module(&ctx(OWNER, now), MODULE, Box::new(FeeGatedModule::new()))
            .unwrap();
        assert!(hub.is_module_allowed(MODULE));
    }

    #[test]
    fn set_rule_requires_creator_authority_and_allowed_module() {
        let now = Utc::now();
        let kp = ReplicaKeypair::generate();
        let mut hub = hub_with_module(now);
        let creator_id = mint_creator(&mut hub, &kp, now);

        let flags = PermissionFlags {
            transferable: false,
            updatable: false,
            revokable: false,
            extendable: false,
        };

        // Stranger can't register rules.
        let result = hub.set_rule(
            &ctx("stranger", now),
            descriptor(&creator_id, flags),
            open_init(now),
        );
        assert!(matches!(result, Err(RuleError::Unauthorized { .. })));

        // Unlisted module rejected.
        let mut desc = descriptor(&creator_id, flags);
        desc.module = "rogue-module".into();
        let result = hub.set_rule(&ctx(&kp.address(), now), desc, open_init(now));
        assert!(matches!(result, Err(RuleError::ModuleNotAllowed(_))));

        // Holder succeeds.
        let hash = hub
            .set_rule(
                &ctx(&kp.address(), now),
                descriptor(&creator_id, flags),
                open_init(now),
            )
            .unwrap();
        assert_eq!(hub.rule_state(&hash), RuleState::Exist);
    }

    #[test]
    fn delegate_can_register_and_pause_rules() {
        let now = Utc::now();
        let kp = ReplicaKeypair::generate();
        let mut hub = hub_with_module(now);
        let permit = CreationPermit::sign(&kp, "ipfs://art", now + TimeDelta::hours(1));
        let creator_id = hub
            .create_creator_with_delegate(
                &ctx("anyone", now),
                &kp.address(),
                "marketplace",
                "ipfs://art",
                &permit,
            )
            .unwrap();

        let flags = PermissionFlags {
            transferable: false,
            updatable: false,
            revokable: false,
            extendable: false,
        };
        let hash = hub
            .set_rule(
                &ctx("marketplace", now),
                descriptor(&creator_id, flags),
                open_init(now),
            )
            .unwrap();
        hub.pause_rule(&ctx("marketplace", now), &hash).unwrap();
        assert_eq!(hub.rule_state(&hash), RuleState::Paused);
    }

    #[test]
    fn create_copy_snapshots_pointer_and_counts() {
        let now = Utc::now();
        let kp = ReplicaKeypair::generate();
        let mut hub = hub_with_module(now);
        let creator_id = mint_creator(&mut hub, &kp, now);
        let flags = PermissionFlags {
            transferable: false,
            updatable: false,
            revokable: false,
            extendable: false,
        };
        let hash = hub
            .set_rule(
                &ctx(&kp.address(), now),
                descriptor(&creator_id, flags),
                open_init(now),
            )
            .unwrap();

        let (copy_id, expiry) = hub.create_copy(&ctx("bob", now), "bob", &hash, 600).unwrap();
        assert_eq!(expiry, now + TimeDelta::seconds(600));
        assert_eq!(hub.copy(&copy_id).unwrap().content_pointer, "ipfs://art");
        assert_eq!(hub.mint_count(&hash).unwrap(), 1);
        assert!(hub.has_valid_copy("bob", &creator_id, now));

        // Later creator update does not rewrite the copy's snapshot.
        let permit = CreationPermit::sign(&kp, "ipfs://v2", now + TimeDelta::hours(1));
        hub.update_creator(&ctx(&kp.address(), now), &creator_id, "ipfs://v2", &permit)
            .unwrap();
        assert_eq!(hub.copy(&copy_id).unwrap().content_pointer, "ipfs://art");
    }

    #[test]
    fn paused_rule_blocks_create_but_allows_extend() {
        let now = Utc::now();
        let kp = ReplicaKeypair::generate();
        let mut hub = hub_with_module(now);
        let creator_id = mint_creator(&mut hub, &kp, now);
        let flags = PermissionFlags {
            transferable: false,
            updatable: false,
            revokable: false,
            extendable: true,
        };
        let hash = hub
            .set_rule(
                &ctx(&kp.address(), now),
                descriptor(&creator_id, flags),
                open_init(now),
            )
            .unwrap();
        let (copy_id, first_expiry) = hub.create_copy(&ctx("bob", now), "bob", &hash, 600).unwrap();

        hub.pause_rule(&ctx(&kp.address(), now), &hash).unwrap();
        let result = hub.create_copy(&ctx("carol", now), "carol", &hash, 600);
        assert!(matches!(result, Err(RuleError::RuleNotActive { .. })));

        let new_expiry = hub.extend_copy(&ctx("bob", now), &copy_id, 300).unwrap();
        assert_eq!(new_expiry, first_expiry + TimeDelta::seconds(300));
    }

    #[test]
    fn extend_requires_flag() {
        let now = Utc::now();
        let kp = ReplicaKeypair::generate();
        let mut hub = hub_with_module(now);
        let creator_id = mint_creator(&mut hub, &kp, now);
        let flags = PermissionFlags {
            transferable: false,
            updatable: false,
            revokable: false,
            extendable: false,
        };
        let hash = hub
            .set_rule(
                &ctx(&kp.address(), now),
                descriptor(&creator_id, flags),
                open_init(now),
            )
            .unwrap();
        let (copy_id, _) = hub.create_copy(&ctx("bob", now), "bob", &hash, 600).unwrap();

        let result = hub.extend_copy(&ctx("bob", now), &copy_id, 300);
        assert!(matches!(result, Err(RuleError::NotExtendable(_))));
    }

    #[test]
    fn revoke_requires_creator_authority_and_revokability() {
        let now = Utc::now();
        let kp = ReplicaKeypair::generate();
        let mut hub = hub_with_module(now);
        let creator_id = mint_creator(&mut hub, &kp, now);
        let flags = PermissionFlags {
            transferable: false,
            updatable: false,
            revokable: false,
            extendable: false,
        };
        let hash = hub
            .set_rule(
                &ctx(&kp.address(), now),
                descriptor(&creator_id, flags),
                open_init(now),
            )
            .unwrap();
        let (copy_id, _) = hub.create_copy(&ctx("bob", now), "bob", &hash, 600).unwrap();

        // Holder of the copy is not the creator side.
        let result = hub.revoke_copy(&ctx("bob", now), &copy_id);
        assert!(matches!(result, Err(RuleError::Unauthorized { .. })));

        // Creator can't revoke a non-revokable, unexpired copy either.
        let result = hub.revoke_copy(&ctx(&kp.address(), now), &copy_id);
        assert!(matches!(result, Err(RuleError::NotRevokable(_))));

        // After expiry the creator may clean it up.
        let later = now + TimeDelta::seconds(1_000);
        hub.revoke_copy(&ctx(&kp.address(), later), &copy_id).unwrap();
        assert!(hub.copy(&copy_id).is_none());
    }

    #[test]
    fn native_fee_settles_to_creator() {
        let now = Utc::now();
        let kp = ReplicaKeypair::generate();
        let mut hub = hub_with_module(now);
        let creator_id = mint_creator(&mut hub, &kp, now);
        let flags = PermissionFlags {
            transferable: false,
            updatable: false,
            revokable: false,
            extendable: false,
        };
        let mut init = open_init(now);
        init["mint_amount"] = serde_json::json!(250);
        let hash = hub
            .set_rule(&ctx(&kp.address(), now), descriptor(&creator_id, flags), init)
            .unwrap();

        // Underfunded call fails and mints nothing.
        let result = hub.create_copy(&ctx("bob", now).with_value(100), "bob", &hash, 600);
        assert!(matches!(
            result,
            Err(RuleError::Validation(_))
        ));
        assert_eq!(hub.mint_count(&hash).unwrap(), 0);

        hub.create_copy(&ctx("bob", now).with_value(250), "bob", &hash, 600)
            .unwrap();
        assert_eq!(hub.native_balance_of(&kp.address()), 250);
    }

    #[test]
    fn burned_creator_stops_new_activity_but_not_copies() {
        let now = Utc::now();
        let kp = ReplicaKeypair::generate();
        let mut hub = hub_with_module(now);
        let creator_id = mint_creator(&mut hub, &kp, now);
        let flags = PermissionFlags {
            transferable: false,
            updatable: false,
            revokable: false,
            extendable: false,
        };
        let hash = hub
            .set_rule(
                &ctx(&kp.address(), now),
                descriptor(&creator_id, flags),
                open_init(now),
            )
            .unwrap();
        let (copy_id, _) = hub.create_copy(&ctx("bob", now), "bob", &hash, 600).unwrap();

        hub.burn_creator(&ctx(&kp.address(), now), &creator_id).unwrap();

        // The copy and its snapshot survive.
        assert_eq!(hub.copy(&copy_id).unwrap().content_pointer, "ipfs://art");
        // But new minting fails: no holder to pay.
        let result = hub.create_copy(&ctx("carol", now), "carol", &hash, 600);
        assert!(matches!(result, Err(RuleError::Creator(CreatorError::NotFound(_)))));
    }

    #[test]
    fn event_log_reflects_lifecycle() {
        let now = Utc::now();
        let kp = ReplicaKeypair::generate();
        let mut hub = hub_with_module(now);
        let creator_id = mint_creator(&mut hub, &kp, now);
        let flags = PermissionFlags {
            transferable: true,
            updatable: false,
            revokable: false,
            extendable: false,
        };
        let hash = hub
            .set_rule(
                &ctx(&kp.address(), now),
                descriptor(&creator_id, flags),
                open_init(now),
            )
            .unwrap();
        let (copy_id, _) = hub.create_copy(&ctx("bob", now), "bob", &hash, 600).unwrap();
        hub.transfer_copy(&ctx("bob", now), &copy_id, "carol").unwrap();

        let kinds: Vec<_> = hub.events().iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            ["creator_created", "rule_set", "copy_created", "copy_transferred"]
        );
    }

    #[test]
    fn rejected_init_leaves_rule_state_untouched() {
        let now = Utc::now();
        let kp = ReplicaKeypair::generate();
        let mut hub = hub_with_module(now);
        let creator_id = mint_creator(&mut hub, &kp, now);
        let flags = PermissionFlags {
            transferable: false,
            updatable: false,
            revokable: false,
            extendable: false,
        };

        // Malformed init on a fresh tuple: the hash must stay NIL and out
        // of the creator's rule index.
        let result = hub.set_rule(
            &ctx(&kp.address(), now),
            descriptor(&creator_id, flags),
            serde_json::json!({"bogus": 1}),
        );
        assert!(matches!(result, Err(RuleError::Validation(_))));
        let hash = compute_rule_hash(&descriptor(&creator_id, flags));
        assert_eq!(hub.rule_state(&hash), RuleState::Nil);
        assert!(hub.rule_hashes_for_creator(&creator_id).is_empty());

        // Malformed init on a PAUSED hash must not reactivate it.
        let hash = hub
            .set_rule(
                &ctx(&kp.address(), now),
                descriptor(&creator_id, flags),
                open_init(now),
            )
            .unwrap();
        hub.pause_rule(&ctx(&kp.address(), now), &hash).unwrap();
        let result = hub.set_rule(
            &ctx(&kp.address(), now),
            descriptor(&creator_id, flags),
            serde_json::json!({"bogus": 1}),
        );
        assert!(matches!(result, Err(RuleError::Validation(_))));
        assert_eq!(hub.rule_state(&hash), RuleState::Paused);
        assert!(matches!(
            hub.create_copy(&ctx("bob", now), "bob", &hash, 600),
            Err(RuleError::RuleNotActive { .. })
        ));
    }

    #[test]
    fn copy_can_be_minted_for_a_third_party() {
        let now = Utc::now();
        let kp = ReplicaKeypair::generate();
        let mut hub = hub_with_module(now);
        let creator_id = mint_creator(&mut hub, &kp, now);
        let flags = PermissionFlags {
            transferable: false,
            updatable: false,
            revokable: false,
            extendable: false,
        };
        let mut init = open_init(now);
        init["mint_amount"] = serde_json::json!(75);
        let hash = hub
            .set_rule(&ctx(&kp.address(), now), descriptor(&creator_id, flags), init)
            .unwrap();

        // An orchestrator pays and the giftee holds.
        let (copy_id, _) = hub
            .create_copy(&ctx("orchestrator", now).with_value(75), "giftee", &hash, 600)
            .unwrap();
        assert_eq!(hub.copy_holder(&copy_id).unwrap(), "giftee");
        assert!(hub.has_valid_copy("giftee", &creator_id, now));
        assert!(!hub.has_valid_copy("orchestrator", &creator_id, now));
    }

    #[test]
    fn creator_lookups_reachable_through_hub() {
        let now = Utc::now();
        let kp = ReplicaKeypair::generate();
        let mut hub = hub_with_module(now);
        let creator_id = mint_creator(&mut hub, &kp, now);

        assert!(hub.creator_exists(&creator_id));
        assert_eq!(hub.creator_token_counter(&kp.address()), 1);

        hub.burn_creator(&ctx(&kp.address(), now), &creator_id).unwrap();
        assert!(!hub.creator_exists(&creator_id));
        // The counter never rewinds, so burned ids are never reissued.
        assert_eq!(hub.creator_token_counter(&kp.address()), 1);
    }
}
