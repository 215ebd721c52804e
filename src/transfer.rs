// 2.10: price-driven value transfer. once per interval the losing side pays the
// winning side a sigmoid-scaled fraction of its balance, after both sides are
// skimmed for the protocol fee. 2.10 has the params/result structs, 2.11+ the math.

use crate::math::price_ratio;
use crate::types::{Leverage, Price, Quote, Side};
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferParams {
    pub leverage: Leverage,
    // per-interval fraction skimmed from each side's balance before the transfer
    pub fee_rate: Decimal,
}

impl Default for TransferParams {
    fn default() -> Self {
        Self {
            leverage: Leverage::new_unchecked(dec!(3)),
            fee_rate: dec!(0.0005),
        }
    }
}

/// Outcome of settling one interval's price move: post-fee post-transfer
/// balances plus the fee and transfer components for event reporting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ValueTransfer {
    pub long_balance: Quote,
    pub short_balance: Quote,
    pub long_fee: Quote,
    pub short_fee: Quote,
    pub amount: Quote,
    pub winner: Option<Side>,
}

impl ValueTransfer {
    pub fn total_fee(&self) -> Quote {
        self.long_fee.add(self.short_fee)
    }
}

// 2.11: fraction of the losing side that moves, as a function of the leveraged
// price move: tanh(leverage * |ratio - 1|). zero at no move, saturating toward
// but never reaching 1, so the losing side always keeps a residue.
pub fn loss_fraction(leverage: Leverage, ratio: Decimal) -> Decimal {
    let x = leverage.value() * (ratio - Decimal::ONE).abs();
    // exp(-2x) evaluates exp(2x) internally; 2x above 28 would overflow the
    // 96-bit mantissa, and tanh(14) is already 1 to twelve decimal places.
    let x = x.min(dec!(14));
    let e = (-dec!(2) * x).exp();
    (Decimal::ONE - e) / (Decimal::ONE + e)
}

// 2.12: full interval settlement math: skim fees from both sides, then move the
// sigmoid fraction of the losing side's post-fee balance to the winner.
// conserves exactly: long' + short' = long + short - long_fee - short_fee.
pub fn value_transfer(
    long_balance: Quote,
    short_balance: Quote,
    old_price: Price,
    new_price: Price,
    params: &TransferParams,
) -> ValueTransfer {
    let long_fee = long_balance.mul(params.fee_rate);
    let short_fee = short_balance.mul(params.fee_rate);
    let long_after = long_balance.sub(long_fee);
    let short_after = short_balance.sub(short_fee);

    let ratio = price_ratio(old_price, new_price);
    let fraction = loss_fraction(params.leverage, ratio);

    if ratio > Decimal::ONE {
        let amount = short_after.mul(fraction);
        ValueTransfer {
            long_balance: long_after.add(amount),
            short_balance: short_after.sub(amount),
            long_fee,
            short_fee,
            amount,
            winner: Some(Side::Long),
        }
    } else if ratio < Decimal::ONE {
        let amount = long_after.mul(fraction);
        ValueTransfer {
            long_balance: long_after.sub(amount),
            short_balance: short_after.add(amount),
            long_fee,
            short_fee,
            amount,
            winner: Some(Side::Short),
        }
    } else {
        ValueTransfer {
            long_balance: long_after,
            short_balance: short_after,
            long_fee,
            short_fee,
            amount: Quote::zero(),
            winner: None,
        }
    }
}
