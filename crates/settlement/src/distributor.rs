//! The distribution settlement state machine.
//!
//! Composes the claim ledger, sale ledger, mint sequencer, and balance
//! ledger behind one mutex. Each operation runs as a single critical
//! section: all fallible checks happen before any mutation, so a rejected
//! call leaves every ledger untouched and captures no payment.

use parking_lot::Mutex;
use tracing::{debug, info};
use xpleb_merkle::{leaf_digest, verify, Digest, ZERO_DIGEST};
use xpleb_types::{Address, Amount, Quantity, SettlementError};

use crate::balances::BalanceLedger;
use crate::claims::ClaimLedger;
use crate::mint::{ItemId, MintSequencer};
use crate::sale::{split_revenue, BuyOptions, SaleLedger};

/// Identifiers assigned by one successful settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintReceipt {
    pub first_id: ItemId,
    pub quantity: Quantity,
}

impl MintReceipt {
    /// Iterator over the minted identifiers.
    pub fn ids(&self) -> std::ops::Range<ItemId> {
        self.first_id..self.first_id + self.quantity
    }
}

struct DistributorState<L> {
    airdrop_merkle_root: Digest,
    claims: ClaimLedger,
    sale: SaleLedger,
    mint: MintSequencer,
    balances: L,
}

/// Settlement entry points for the XPLEB distribution.
///
/// Configuration calls are restricted to the operator identity fixed at
/// construction. The commitment root may be republished; doing so
/// invalidates all pending proofs built against the prior tree.
pub struct Distributor<L: BalanceLedger> {
    operator: Address,
    state: Mutex<DistributorState<L>>,
}

impl<L: BalanceLedger> Distributor<L> {
    pub fn new(operator: Address, balances: L) -> Self {
        Self {
            operator,
            state: Mutex::new(DistributorState {
                airdrop_merkle_root: ZERO_DIGEST,
                claims: ClaimLedger::new(),
                sale: SaleLedger::new(),
                mint: MintSequencer::new(0),
                balances,
            }),
        }
    }

    pub fn operator(&self) -> Address {
        self.operator
    }

    fn ensure_operator(&self, caller: Address) -> Result<(), SettlementError> {
        if caller != self.operator {
            return Err(SettlementError::Unauthorized(caller));
        }
        Ok(())
    }

    /// Set the supply cap shared by both settlement channels. Operator only.
    pub fn set_token_options(
        &self,
        caller: Address,
        max_supply: u64,
    ) -> Result<(), SettlementError> {
        self.ensure_operator(caller)?;
        let mut state = self.state.lock();
        state.mint.set_max_supply(max_supply);
        info!(max_supply, "token options updated");
        Ok(())
    }

    /// Configure the public sale. Operator only; callable before or during
    /// the sale window.
    pub fn set_buy_options(
        &self,
        caller: Address,
        options: BuyOptions,
    ) -> Result<(), SettlementError> {
        self.ensure_operator(caller)?;
        let mut state = self.state.lock();
        state.sale.set_options(options)?;
        info!(
            unit_price = options.unit_price,
            max_buyable = options.max_buyable,
            artist_percent = options.artist_percent,
            "buy options updated"
        );
        Ok(())
    }

    /// Publish (or republish) the allow-list commitment. Operator only.
    pub fn set_airdrop_merkle_root(
        &self,
        caller: Address,
        root: Digest,
    ) -> Result<(), SettlementError> {
        self.ensure_operator(caller)?;
        let mut state = self.state.lock();
        state.airdrop_merkle_root = root;
        info!(root = %hex::encode(root), "airdrop merkle root updated");
        Ok(())
    }

    pub fn airdrop_merkle_root(&self) -> Digest {
        self.state.lock().airdrop_merkle_root
    }

    /// Redeem an allow-list entry. Free; mints `amount` items to the caller.
    pub fn claim_airdrop(
        &self,
        caller: Address,
        amount: Quantity,
        proof: &[Digest],
    ) -> Result<MintReceipt, SettlementError> {
        let mut state = self.state.lock();

        // Zero root is the "no commitment published" sentinel and rejects
        // every claim.
        if state.airdrop_merkle_root == ZERO_DIGEST {
            return Err(SettlementError::InvalidProof);
        }
        if !verify(
            &state.airdrop_merkle_root,
            &caller,
            amount as Amount,
            proof,
        ) {
            return Err(SettlementError::InvalidProof);
        }

        let leaf = leaf_digest(&caller, amount as Amount);
        if state.claims.is_claimed(&leaf) {
            return Err(SettlementError::AlreadyClaimed);
        }
        state.mint.ensure_capacity(amount)?;

        state.claims.mark_claimed(leaf);
        let first_id = state.mint.mint(&caller, amount)?;

        info!(claimant = %caller, amount, first_id, "airdrop claimed");
        Ok(MintReceipt {
            first_id,
            quantity: amount,
        })
    }

    /// Read-only probe mirroring claim eligibility: verifies the proof the
    /// same way `claim_airdrop` does, then reports the claim status without
    /// mutating anything.
    pub fn airdrop_is_claimed(
        &self,
        address: Address,
        amount: Quantity,
        proof: &[Digest],
    ) -> Result<bool, SettlementError> {
        let state = self.state.lock();
        if state.airdrop_merkle_root == ZERO_DIGEST
            || !verify(
                &state.airdrop_merkle_root,
                &address,
                amount as Amount,
                proof,
            )
        {
            return Err(SettlementError::InvalidProof);
        }
        Ok(state.claims.is_claimed(&leaf_digest(&address, amount as Amount)))
    }

    /// Purchase `quantity` items at the configured unit price, paying from
    /// the caller's balance. Open to any caller.
    pub fn buy(
        &self,
        caller: Address,
        quantity: Quantity,
        payment: Amount,
    ) -> Result<MintReceipt, SettlementError> {
        let mut state = self.state.lock();
        self.settle_sale(&mut state, caller, caller, quantity, payment)
    }

    /// Privileged purchase on behalf of `recipient`, paid from the
    /// operator's own balance. This is the entry point the batch
    /// distribution driver uses.
    pub fn owner_buy(
        &self,
        caller: Address,
        recipient: Address,
        quantity: Quantity,
    ) -> Result<MintReceipt, SettlementError> {
        self.ensure_operator(caller)?;
        let mut state = self.state.lock();
        let payment = state.sale.required_payment(quantity);
        self.settle_sale(&mut state, caller, recipient, quantity, payment)
    }

    /// Shared sale settlement: cap check, price check, supply check, then
    /// payment movement, sale accounting, and minting. Both entry points
    /// compete for the same `units_sold` cap.
    fn settle_sale(
        &self,
        state: &mut DistributorState<L>,
        payer: Address,
        recipient: Address,
        quantity: Quantity,
        payment: Amount,
    ) -> Result<MintReceipt, SettlementError> {
        state.sale.ensure_cap(quantity)?;

        let required = state.sale.required_payment(quantity);
        if payment < required {
            return Err(SettlementError::InsufficientPayment {
                required,
                paid: payment,
            });
        }
        state.mint.ensure_capacity(quantity)?;

        // All checks passed; the remaining steps cannot fail except the
        // payer debit, which must come before any ledger mutation.
        state.balances.debit(&payer, payment)?;

        let options = *state.sale.options();
        let (artist_share, burn_share) = split_revenue(payment, options.artist_percent);
        state.balances.credit(&options.artist_sink, artist_share);
        state.balances.credit(&options.burn_sink, burn_share);

        state.sale.record_sale(quantity);
        let first_id = state.mint.mint(&recipient, quantity)?;

        debug!(
            payer = %payer,
            recipient = %recipient,
            quantity,
            payment,
            artist_share,
            burn_share,
            first_id,
            units_sold = state.sale.units_sold(),
            "sale settled"
        );
        Ok(MintReceipt {
            first_id,
            quantity,
        })
    }

    // Read-only views.

    pub fn units_sold(&self) -> u64 {
        self.state.lock().sale.units_sold()
    }

    pub fn total_supply(&self) -> u64 {
        self.state.lock().mint.total_supply()
    }

    pub fn owner_of(&self, id: ItemId) -> Option<Address> {
        self.state.lock().mint.owner_of(id).copied()
    }

    pub fn item_balance_of(&self, owner: &Address) -> u64 {
        self.state.lock().mint.balance_of(owner)
    }

    pub fn funds_of(&self, account: &Address) -> Amount {
        self.state.lock().balances.balance_of(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balances::{InMemoryBalanceLedger, MockBalanceLedger};
    use xpleb_merkle::AllowListTree;

    fn addr(byte: u8) -> Address {
        Address([byte; 20])
    }

    const OPERATOR: Address = Address([0xEEu8; 20]);

    fn configured_distributor(funds: Amount) -> Distributor<InMemoryBalanceLedger> {
        let dist = Distributor::new(
            OPERATOR,
            InMemoryBalanceLedger::new()
                .with_balance(OPERATOR, funds)
                .with_balance(addr(4), funds)
                .with_balance(addr(5), funds)
                .with_balance(addr(6), funds),
        );
        dist.set_token_options(OPERATOR, 100).unwrap();
        dist.set_buy_options(
            OPERATOR,
            BuyOptions {
                unit_price: 1000,
                max_buyable: 40,
                burn_sink: addr(0xB),
                artist_sink: addr(0xA),
                artist_percent: 5,
            },
        )
        .unwrap();
        dist
    }

    #[test]
    fn config_calls_are_operator_only() {
        let dist = Distributor::new(OPERATOR, InMemoryBalanceLedger::new());
        assert!(matches!(
            dist.set_token_options(addr(1), 100),
            Err(SettlementError::Unauthorized(_))
        ));
        assert!(matches!(
            dist.set_buy_options(addr(1), BuyOptions::default()),
            Err(SettlementError::Unauthorized(_))
        ));
        assert!(matches!(
            dist.set_airdrop_merkle_root(addr(1), [1u8; 32]),
            Err(SettlementError::Unauthorized(_))
        ));
        assert!(matches!(
            dist.owner_buy(addr(1), addr(2), 1),
            Err(SettlementError::Unauthorized(_))
        ));
    }

    #[test]
    fn claim_rejected_before_root_is_published() {
        let dist = configured_distributor(0);
        let tree = AllowListTree::new(vec![(addr(1), 20)]).unwrap();
        let proof = tree.proof_for(&addr(1), 20).unwrap();

        assert_eq!(
            dist.claim_airdrop(addr(1), 20, &proof),
            Err(SettlementError::InvalidProof)
        );
        assert_eq!(
            dist.claim_airdrop(addr(1), 20, &[]),
            Err(SettlementError::InvalidProof)
        );
    }

    #[test]
    fn claim_succeeds_exactly_once() {
        let dist = configured_distributor(0);
        let tree =
            AllowListTree::new(vec![(addr(1), 10), (addr(2), 20), (addr(3), 30)]).unwrap();
        dist.set_airdrop_merkle_root(OPERATOR, tree.root()).unwrap();

        let proof = tree.proof_for(&addr(2), 20).unwrap();
        assert_eq!(dist.airdrop_is_claimed(addr(2), 20, &proof), Ok(false));

        let receipt = dist.claim_airdrop(addr(2), 20, &proof).unwrap();
        assert_eq!(receipt.first_id, 0);
        assert_eq!(receipt.quantity, 20);
        assert_eq!(dist.item_balance_of(&addr(2)), 20);
        assert_eq!(dist.total_supply(), 20);
        assert_eq!(dist.airdrop_is_claimed(addr(2), 20, &proof), Ok(true));

        assert_eq!(
            dist.claim_airdrop(addr(2), 20, &proof),
            Err(SettlementError::AlreadyClaimed)
        );
        assert_eq!(dist.total_supply(), 20);
    }

    #[test]
    fn claim_status_query_rejects_invalid_proofs() {
        let dist = configured_distributor(0);
        let tree = AllowListTree::new(vec![(addr(1), 10), (addr(2), 20)]).unwrap();
        let proof = tree.proof_for(&addr(2), 20).unwrap();

        // No commitment published yet.
        assert_eq!(
            dist.airdrop_is_claimed(addr(2), 20, &proof),
            Err(SettlementError::InvalidProof)
        );

        dist.set_airdrop_merkle_root(OPERATOR, tree.root()).unwrap();
        assert_eq!(dist.airdrop_is_claimed(addr(2), 20, &proof), Ok(false));

        // Wrong amount and a proof for another entry.
        assert_eq!(
            dist.airdrop_is_claimed(addr(2), 19, &proof),
            Err(SettlementError::InvalidProof)
        );
        let foreign = tree.proof_for(&addr(1), 10).unwrap();
        assert_eq!(
            dist.airdrop_is_claimed(addr(2), 20, &foreign),
            Err(SettlementError::InvalidProof)
        );

        // Republishing the root invalidates the old proof for the query too.
        let new_tree =
            AllowListTree::new(vec![(addr(1), 10), (addr(2), 20), (addr(3), 30)]).unwrap();
        dist.set_airdrop_merkle_root(OPERATOR, new_tree.root())
            .unwrap();
        assert_eq!(
            dist.airdrop_is_claimed(addr(2), 20, &proof),
            Err(SettlementError::InvalidProof)
        );
    }

    #[test]
    fn claim_with_wrong_amount_rejected() {
        let dist = configured_distributor(0);
        let tree = AllowListTree::new(vec![(addr(1), 10), (addr(2), 20)]).unwrap();
        dist.set_airdrop_merkle_root(OPERATOR, tree.root()).unwrap();

        let proof = tree.proof_for(&addr(2), 20).unwrap();
        assert_eq!(
            dist.claim_airdrop(addr(2), 19, &proof),
            Err(SettlementError::InvalidProof)
        );
    }

    #[test]
    fn claim_with_foreign_proof_rejected() {
        let dist = configured_distributor(0);
        let tree = AllowListTree::new(vec![(addr(1), 10), (addr(2), 20)]).unwrap();
        dist.set_airdrop_merkle_root(OPERATOR, tree.root()).unwrap();

        let proof = tree.proof_for(&addr(1), 10).unwrap();
        assert_eq!(
            dist.claim_airdrop(addr(2), 20, &proof),
            Err(SettlementError::InvalidProof)
        );
    }

    #[test]
    fn republished_root_invalidates_stale_proofs() {
        let dist = configured_distributor(0);
        let old_tree = AllowListTree::new(vec![(addr(1), 10), (addr(2), 20)]).unwrap();
        dist.set_airdrop_merkle_root(OPERATOR, old_tree.root())
            .unwrap();
        let stale_proof = old_tree.proof_for(&addr(2), 20).unwrap();

        let new_tree =
            AllowListTree::new(vec![(addr(1), 10), (addr(2), 20), (addr(3), 30)]).unwrap();
        dist.set_airdrop_merkle_root(OPERATOR, new_tree.root())
            .unwrap();

        assert_eq!(
            dist.claim_airdrop(addr(2), 20, &stale_proof),
            Err(SettlementError::InvalidProof)
        );

        let fresh_proof = new_tree.proof_for(&addr(2), 20).unwrap();
        assert!(dist.claim_airdrop(addr(2), 20, &fresh_proof).is_ok());
    }

    #[test]
    fn buy_enforces_cap_and_price() {
        let dist = configured_distributor(1_000_000);

        assert_eq!(
            dist.buy(addr(4), 41, 41_000),
            Err(SettlementError::MaxBoughtReached)
        );
        assert_eq!(
            dist.buy(addr(4), 1, 999),
            Err(SettlementError::InsufficientPayment {
                required: 1000,
                paid: 999
            })
        );
        assert_eq!(dist.units_sold(), 0);
        assert_eq!(dist.funds_of(&addr(4)), 1_000_000);

        let receipt = dist.buy(addr(4), 3, 3_000).unwrap();
        assert_eq!(receipt.ids().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(dist.units_sold(), 3);
    }

    #[test]
    fn revenue_split_is_exact() {
        let dist = configured_distributor(1_000_000);
        dist.buy(addr(4), 7, 7_000).unwrap();

        let (artist, burn) = split_revenue(7_000, 5);
        assert_eq!(dist.funds_of(&addr(0xA)), artist);
        assert_eq!(dist.funds_of(&addr(0xB)), burn);
        assert_eq!(artist + burn, 7_000);
        assert_eq!(dist.funds_of(&addr(4)), 1_000_000 - 7_000);
    }

    #[test]
    fn owner_buy_pays_from_operator_and_mints_to_recipient() {
        let dist = configured_distributor(1_000_000);

        let receipt = dist.owner_buy(OPERATOR, addr(9), 4).unwrap();
        assert_eq!(receipt.quantity, 4);
        assert_eq!(dist.item_balance_of(&addr(9)), 4);
        assert_eq!(dist.funds_of(&OPERATOR), 1_000_000 - 4_000);
        assert_eq!(dist.funds_of(&addr(9)), 0);
        assert_eq!(dist.units_sold(), 4);
    }

    #[test]
    fn both_channels_share_the_sale_cap() {
        let dist = configured_distributor(1_000_000);

        dist.buy(addr(4), 30, 30_000).unwrap();
        dist.owner_buy(OPERATOR, addr(9), 10).unwrap();
        assert_eq!(dist.units_sold(), 40);

        assert_eq!(
            dist.buy(addr(5), 1, 1_000),
            Err(SettlementError::MaxBoughtReached)
        );
        assert_eq!(
            dist.owner_buy(OPERATOR, addr(9), 1),
            Err(SettlementError::MaxBoughtReached)
        );
    }

    #[test]
    fn failed_buy_captures_no_payment() {
        let dist = Distributor::new(
            OPERATOR,
            MockBalanceLedger::new().with_balance(addr(4), 100_000),
        );
        dist.set_token_options(OPERATOR, 100).unwrap();
        dist.set_buy_options(
            OPERATOR,
            BuyOptions {
                unit_price: 1000,
                max_buyable: 40,
                burn_sink: addr(0xB),
                artist_sink: addr(0xA),
                artist_percent: 5,
            },
        )
        .unwrap();

        // Cap violation fails before the debit is ever attempted.
        assert!(dist.buy(addr(4), 41, 41_000).is_err());
        assert_eq!(dist.funds_of(&addr(4)), 100_000);
        assert_eq!(dist.funds_of(&addr(0xA)), 0);
        assert_eq!(dist.funds_of(&addr(0xB)), 0);
    }

    #[test]
    fn supply_cap_checked_independently_of_sale_cap() {
        // Inconsistent configuration: max_buyable > max_supply.
        let dist = Distributor::new(
            OPERATOR,
            InMemoryBalanceLedger::new().with_balance(addr(4), 100_000),
        );
        dist.set_token_options(OPERATOR, 5).unwrap();
        dist.set_buy_options(
            OPERATOR,
            BuyOptions {
                unit_price: 1000,
                max_buyable: 40,
                burn_sink: addr(0xB),
                artist_sink: addr(0xA),
                artist_percent: 5,
            },
        )
        .unwrap();

        let err = dist.buy(addr(4), 6, 6_000).unwrap_err();
        assert!(matches!(err, SettlementError::SupplyExceeded { .. }));
        assert_eq!(dist.units_sold(), 0);
        assert_eq!(dist.funds_of(&addr(4)), 100_000);
    }

    #[test]
    fn mint_ids_contiguous_across_channels() {
        let dist = configured_distributor(1_000_000);
        let tree = AllowListTree::new(vec![(addr(1), 10), (addr(2), 20)]).unwrap();
        dist.set_airdrop_merkle_root(OPERATOR, tree.root()).unwrap();

        let r1 = dist
            .claim_airdrop(addr(1), 10, &tree.proof_for(&addr(1), 10).unwrap())
            .unwrap();
        let r2 = dist.buy(addr(4), 5, 5_000).unwrap();
        let r3 = dist
            .claim_airdrop(addr(2), 20, &tree.proof_for(&addr(2), 20).unwrap())
            .unwrap();
        let r4 = dist.owner_buy(OPERATOR, addr(9), 2).unwrap();

        assert_eq!(r1.first_id, 0);
        assert_eq!(r2.first_id, 10);
        assert_eq!(r3.first_id, 15);
        assert_eq!(r4.first_id, 35);
        assert_eq!(dist.total_supply(), 37);
    }
}
