// 9.2 tokens.rs: MOCKED. in-memory token ledger, would be ERC20 contracts in prod.
// one flat balance map covers the settlement asset and every pool's long/short
// exposure tokens; the engine is the only writer.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::types::{PoolId, Side, UserId};

// What is being held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenId {
    Settlement,
    Pool(PoolId, Side),
}

// Who holds it. the engine-internal accounts are first-class holders so every
// unit of settlement asset is visible somewhere in the ledger at all times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Holder {
    User(UserId),
    PoolVault(PoolId),
    FeeAccount,
    AutoClaimEscrow,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("{holder:?} holds {available} of {token:?}, requested {requested}")]
    InsufficientBalance {
        holder: Holder,
        token: TokenId,
        requested: Decimal,
        available: Decimal,
    },
}

#[derive(Debug, Clone, Default)]
pub struct TokenLedger {
    balances: HashMap<(Holder, TokenId), Decimal>,
    supplies: HashMap<TokenId, Decimal>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, holder: Holder, token: TokenId) -> Decimal {
        self.balances
            .get(&(holder, token))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn total_supply(&self, token: TokenId) -> Decimal {
        self.supplies.get(&token).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn mint(&mut self, holder: Holder, token: TokenId, amount: Decimal) {
        debug_assert!(amount >= Decimal::ZERO);
        *self.balances.entry((holder, token)).or_insert(Decimal::ZERO) += amount;
        *self.supplies.entry(token).or_insert(Decimal::ZERO) += amount;
    }

    pub fn burn(&mut self, holder: Holder, token: TokenId, amount: Decimal) -> Result<(), LedgerError> {
        debug_assert!(amount >= Decimal::ZERO);
        let available = self.balance(holder, token);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                holder,
                token,
                requested: amount,
                available,
            });
        }
        *self.balances.entry((holder, token)).or_insert(Decimal::ZERO) -= amount;
        *self.supplies.entry(token).or_insert(Decimal::ZERO) -= amount;
        Ok(())
    }

    pub fn transfer(
        &mut self,
        from: Holder,
        to: Holder,
        token: TokenId,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        debug_assert!(amount >= Decimal::ZERO);
        let available = self.balance(from, token);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                holder: from,
                token,
                requested: amount,
                available,
            });
        }
        *self.balances.entry((from, token)).or_insert(Decimal::ZERO) -= amount;
        *self.balances.entry((to, token)).or_insert(Decimal::ZERO) += amount;
        Ok(())
    }

    // test hook: force a balance, keeping the supply total consistent
    pub fn set_balance(&mut self, holder: Holder, token: TokenId, amount: Decimal) {
        let old = self.balance(holder, token);
        self.balances.insert((holder, token), amount);
        *self.supplies.entry(token).or_insert(Decimal::ZERO) += amount - old;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn mint_and_balance() {
        let mut ledger = TokenLedger::new();
        let alice = Holder::User(UserId(1));

        ledger.mint(alice, TokenId::Settlement, dec!(1000));
        assert_eq!(ledger.balance(alice, TokenId::Settlement), dec!(1000));
        assert_eq!(ledger.total_supply(TokenId::Settlement), dec!(1000));
    }

    #[test]
    fn burn_reduces_balance_and_supply() {
        let mut ledger = TokenLedger::new();
        let alice = Holder::User(UserId(1));
        let token = TokenId::Pool(PoolId(1), Side::Long);

        ledger.mint(alice, token, dec!(500));
        ledger.burn(alice, token, dec!(200)).unwrap();

        assert_eq!(ledger.balance(alice, token), dec!(300));
        assert_eq!(ledger.total_supply(token), dec!(300));
    }

    #[test]
    fn burn_more_than_held_fails() {
        let mut ledger = TokenLedger::new();
        let alice = Holder::User(UserId(1));
        ledger.mint(alice, TokenId::Settlement, dec!(100));

        let err = ledger.burn(alice, TokenId::Settlement, dec!(150)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                holder: alice,
                token: TokenId::Settlement,
                requested: dec!(150),
                available: dec!(100),
            }
        );
        // nothing changed
        assert_eq!(ledger.balance(alice, TokenId::Settlement), dec!(100));
    }

    #[test]
    fn transfer_moves_between_holders() {
        let mut ledger = TokenLedger::new();
        let alice = Holder::User(UserId(1));
        let vault = Holder::PoolVault(PoolId(1));

        ledger.mint(alice, TokenId::Settlement, dec!(1000));
        ledger
            .transfer(alice, vault, TokenId::Settlement, dec!(400))
            .unwrap();

        assert_eq!(ledger.balance(alice, TokenId::Settlement), dec!(600));
        assert_eq!(ledger.balance(vault, TokenId::Settlement), dec!(400));
        // transfers never change supply
        assert_eq!(ledger.total_supply(TokenId::Settlement), dec!(1000));
    }

    #[test]
    fn transfer_without_funds_fails() {
        let mut ledger = TokenLedger::new();
        let alice = Holder::User(UserId(1));
        let bob = Holder::User(UserId(2));

        let result = ledger.transfer(alice, bob, TokenId::Settlement, dec!(1));
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn set_balance_hook_adjusts_supply() {
        let mut ledger = TokenLedger::new();
        let vault = Holder::PoolVault(PoolId(7));

        ledger.mint(vault, TokenId::Settlement, dec!(100));
        ledger.set_balance(vault, TokenId::Settlement, dec!(40));

        assert_eq!(ledger.balance(vault, TokenId::Settlement), dec!(40));
        assert_eq!(ledger.total_supply(TokenId::Settlement), dec!(40));
    }
}
