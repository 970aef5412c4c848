//! Dual-currency amount reconciliation.
//!
//! A fact may arrive with only one amount leg populated; once the FX rate
//! for its date is known, the other leg is derived (`local = usd × rate`,
//! rate expressed USD→local). Source-provided values always win: a
//! populated leg is never overwritten, so the sweep is idempotent.
//!
//! CRITICAL: rounding uses banker's rounding (round half to even) at the
//! warehouse amount scale to minimize cumulative errors.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places of the warehouse amount columns.
pub const AMOUNT_SCALE: u32 = 4;

/// The two amount legs of a fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amounts {
    /// Amount in USD.
    pub usd: Option<Decimal>,
    /// Amount in the local currency.
    pub local: Option<Decimal>,
}

/// Result of reconciling one fact against its date's FX rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing to derive: both legs populated, both empty with no basis, or
    /// no rate known for the date.
    Unchanged,
    /// The local leg was derived from USD.
    FilledLocal(Decimal),
    /// The USD leg was derived from local.
    FilledUsd(Decimal),
}

/// Derives the missing amount leg, if exactly one is populated and a
/// positive rate is known.
#[must_use]
pub fn reconcile(amounts: Amounts, rate: Option<Decimal>) -> ReconcileOutcome {
    let Some(rate) = rate.filter(|r| *r > Decimal::ZERO) else {
        return ReconcileOutcome::Unchanged;
    };

    match (amounts.usd, amounts.local) {
        (Some(usd), None) => ReconcileOutcome::FilledLocal(round_amount(usd * rate)),
        (None, Some(local)) => ReconcileOutcome::FilledUsd(round_amount(local / rate)),
        _ => ReconcileOutcome::Unchanged,
    }
}

/// Rounds to the warehouse amount scale with banker's rounding.
#[must_use]
pub fn round_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointNearestEven)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fills_local_from_usd() {
        let out = reconcile(
            Amounts {
                usd: Some(dec!(100)),
                local: None,
            },
            Some(dec!(530.0)),
        );
        assert_eq!(out, ReconcileOutcome::FilledLocal(dec!(53000.0000)));
    }

    #[test]
    fn test_fills_usd_from_local() {
        let out = reconcile(
            Amounts {
                usd: None,
                local: Some(dec!(53000)),
            },
            Some(dec!(530)),
        );
        assert_eq!(out, ReconcileOutcome::FilledUsd(dec!(100.0000)));
    }

    #[test]
    fn test_never_overwrites_populated_legs() {
        let both = Amounts {
            usd: Some(dec!(100)),
            local: Some(dec!(99999)),
        };
        assert_eq!(reconcile(both, Some(dec!(530))), ReconcileOutcome::Unchanged);
    }

    #[test]
    fn test_no_rate_is_a_deferred_gap_not_an_error() {
        let pending = Amounts {
            usd: Some(dec!(100)),
            local: None,
        };
        assert_eq!(reconcile(pending, None), ReconcileOutcome::Unchanged);
        assert_eq!(
            reconcile(pending, Some(Decimal::ZERO)),
            ReconcileOutcome::Unchanged
        );
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let rate = Some(dec!(530.0));
        let first = reconcile(
            Amounts {
                usd: Some(dec!(100)),
                local: None,
            },
            rate,
        );
        let ReconcileOutcome::FilledLocal(local) = first else {
            panic!("expected local fill");
        };
        // Re-running over the now-complete fact mutates nothing.
        let second = reconcile(
            Amounts {
                usd: Some(dec!(100)),
                local: Some(local),
            },
            rate,
        );
        assert_eq!(second, ReconcileOutcome::Unchanged);
    }

    #[test]
    fn test_bankers_rounding_at_warehouse_scale() {
        // 1 × 0.00005 rounds half-to-even at 4 dp.
        let out = reconcile(
            Amounts {
                usd: Some(dec!(1)),
                local: None,
            },
            Some(dec!(0.00005)),
        );
        assert_eq!(out, ReconcileOutcome::FilledLocal(dec!(0.0000)));
        let out = reconcile(
            Amounts {
                usd: Some(dec!(3)),
                local: None,
            },
            Some(dec!(0.00005)),
        );
        assert_eq!(out, ReconcileOutcome::FilledLocal(dec!(0.0002)));
    }
}
