// 2.0: fixed-point pricing primitives. everything the settlement and aggregation
// paths need to convert between settlement asset and exposure tokens lives here,
// so both paths price tokens identically. total functions, no state.

use crate::types::{PoolTokens, Price, Quote};
use rust_decimal::Decimal;

// 2.1: ratio of the new price to the old. > 1 means the tracked market moved up
// (longs win), < 1 means down (shorts win). Price is positive by construction
// so this never divides by zero.
pub fn price_ratio(old_price: Price, new_price: Price) -> Decimal {
    new_price.value() / old_price.value()
}

// 2.2: settlement-asset value of one exposure token. effective supply includes
// the pending-burn shadow: tokens already burned at commit time still own their
// share of the side balance until their interval settles. an empty side prices
// at 1 so the first mint is par.
pub fn token_price(side_balance: Quote, effective_supply: PoolTokens) -> Decimal {
    if effective_supply.is_zero() {
        return Decimal::ONE;
    }
    side_balance.value() / effective_supply.value()
}

// 2.3: tokens issued for a settlement-asset deposit at a given token price.
// a zero price only occurs on a side whose balance was drained to exactly zero;
// mint at par there instead of dividing by zero.
pub fn tokens_for_settlement(amount: Quote, price: Decimal) -> PoolTokens {
    if price <= Decimal::ZERO {
        return PoolTokens::new(amount.value());
    }
    PoolTokens::new(amount.value() / price)
}

// 2.4: settlement-asset value released by retiring tokens at a given price.
pub fn settlement_for_tokens(tokens: PoolTokens, price: Decimal) -> Quote {
    Quote::new(tokens.value() * price)
}

// 2.5: instant-switch conversion: burn on one side, mint the proceeds on the
// other, both at the same interval's recorded prices. the value stays inside
// the pool the whole time.
pub fn switch_output(burn: PoolTokens, source_price: Decimal, dest_price: Decimal) -> PoolTokens {
    let value = settlement_for_tokens(burn, source_price);
    tokens_for_settlement(value, dest_price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn ratio_up_and_down() {
        let old = Price::new_unchecked(dec!(100));

        let up = price_ratio(old, Price::new_unchecked(dec!(101)));
        assert_eq!(up, dec!(1.01));

        let down = price_ratio(old, Price::new_unchecked(dec!(95)));
        assert_eq!(down, dec!(0.95));

        let flat = price_ratio(old, old);
        assert_eq!(flat, Decimal::ONE);
    }

    #[test]
    fn empty_side_prices_at_par() {
        let price = token_price(Quote::zero(), PoolTokens::zero());
        assert_eq!(price, Decimal::ONE);

        // balance with no supply is still par (first mint sets the supply)
        let price = token_price(Quote::new(dec!(500)), PoolTokens::zero());
        assert_eq!(price, Decimal::ONE);
    }

    #[test]
    fn token_price_tracks_balance_per_supply() {
        let price = token_price(Quote::new(dec!(2100)), PoolTokens::new(dec!(2000)));
        assert_eq!(price, dec!(1.05));

        let price = token_price(Quote::new(dec!(1800)), PoolTokens::new(dec!(2000)));
        assert_eq!(price, dec!(0.9));
    }

    #[test]
    fn burn_shadow_dilutes_price() {
        // 1000 balance, 800 live supply, 200 already committed to burn:
        // the 200 still own their share until they settle.
        let without_shadow = token_price(Quote::new(dec!(1000)), PoolTokens::new(dec!(800)));
        let with_shadow = token_price(Quote::new(dec!(1000)), PoolTokens::new(dec!(1000)));

        assert_eq!(without_shadow, dec!(1.25));
        assert_eq!(with_shadow, Decimal::ONE);
        assert!(with_shadow < without_shadow);
    }

    #[test]
    fn mint_and_burn_are_inverse_at_fixed_price() {
        let price = dec!(1.25);
        let deposit = Quote::new(dec!(500));

        let tokens = tokens_for_settlement(deposit, price);
        assert_eq!(tokens.value(), dec!(400));

        let back = settlement_for_tokens(tokens, price);
        assert_eq!(back.value(), dec!(500));
    }

    #[test]
    fn mint_at_zero_price_falls_back_to_par() {
        let tokens = tokens_for_settlement(Quote::new(dec!(250)), Decimal::ZERO);
        assert_eq!(tokens.value(), dec!(250));
    }

    #[test]
    fn switch_preserves_value_across_sides() {
        // burn 100 tokens worth 1.2 each, mint on a side priced at 0.8
        let out = switch_output(PoolTokens::new(dec!(100)), dec!(1.2), dec!(0.8));
        assert_eq!(out.value(), dec!(150));

        // 150 tokens at 0.8 = the 120 of value that left the source side
        let value = settlement_for_tokens(out, dec!(0.8));
        assert_eq!(value.value(), dec!(120));
    }
}
