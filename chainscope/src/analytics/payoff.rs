//! Expiration payoff of a single option position.
//!
//! `intrinsic = max(price - strike, 0)` for calls, `max(strike - price, 0)`
//! for puts; long P/L is `intrinsic - premium`, short P/L is its negation.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::PayoffConfig;
use crate::data::OptionType;

/// Side of the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Long,
    Short,
}

impl FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "long" => Ok(Self::Long),
            "short" => Ok(Self::Short),
            other => Err(format!("unknown position: {}", other)),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => f.write_str("long"),
            Self::Short => f.write_str("short"),
        }
    }
}

/// One point of a payoff curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoffPoint {
    pub price: Decimal,
    pub profit_loss: Decimal,
}

/// Profit/loss at expiration for one option position.
pub fn payoff(
    strike: Decimal,
    premium: Decimal,
    option_type: OptionType,
    position: Position,
    price: Decimal,
) -> Decimal {
    let intrinsic = match option_type {
        OptionType::Call => (price - strike).max(Decimal::ZERO),
        OptionType::Put => (strike - price).max(Decimal::ZERO),
    };
    let raw = intrinsic - premium;
    match position {
        Position::Long => raw,
        Position::Short => -raw,
    }
}

/// A hypothetical single-option position.
///
/// `strike` and `premium` are expected to be non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoffCalculator {
    pub strike: Decimal,
    pub premium: Decimal,
    pub option_type: OptionType,
    pub position: Position,
}

impl PayoffCalculator {
    pub fn new(
        strike: Decimal,
        premium: Decimal,
        option_type: OptionType,
        position: Position,
    ) -> Self {
        Self {
            strike,
            premium,
            option_type,
            position,
        }
    }

    pub fn payoff(&self, price: Decimal) -> Decimal {
        payoff(
            self.strike,
            self.premium,
            self.option_type,
            self.position,
            price,
        )
    }

    /// Lazily evaluate the payoff over `prices`, in input order.
    ///
    /// Cloning the returned iterator (or calling `curve` again) restarts it.
    pub fn curve<I>(&self, prices: I) -> impl Iterator<Item = PayoffPoint> + Clone
    where
        I: IntoIterator<Item = Decimal>,
        I::IntoIter: Clone,
    {
        let calc = *self;
        prices.into_iter().map(move |price| PayoffPoint {
            price,
            profit_loss: calc.payoff(price),
        })
    }

    /// Underlying price at which the position breaks even.
    pub fn breakeven(&self) -> Decimal {
        match self.option_type {
            OptionType::Call => self.strike + self.premium,
            OptionType::Put => self.strike - self.premium,
        }
    }

    /// Default grid around the strike.
    pub fn default_grid(&self, config: &PayoffConfig) -> PriceGrid {
        PriceGrid::around_strike(
            self.strike,
            config.low_multiple,
            config.high_multiple,
            config.points,
        )
    }

    /// Curve extremes and breakeven.
    pub fn summarize<I>(&self, prices: I) -> Option<PayoffSummary>
    where
        I: IntoIterator<Item = Decimal>,
        I::IntoIter: Clone,
    {
        let mut curve = self.curve(prices);
        let first = curve.next()?;
        let (max_profit, max_loss) = curve.fold(
            (first.profit_loss, first.profit_loss),
            |(hi, lo), p| (hi.max(p.profit_loss), lo.min(p.profit_loss)),
        );
        Some(PayoffSummary {
            breakeven: self.breakeven(),
            max_profit,
            max_loss,
        })
    }
}

/// Extremes of a payoff curve over a price range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoffSummary {
    pub breakeven: Decimal,
    /// Largest P/L on the evaluated range.
    pub max_profit: Decimal,
    /// Smallest P/L on the evaluated range.
    pub max_loss: Decimal,
}

/// Evenly spaced prices over `[low, high]`, endpoints included.
#[derive(Debug, Clone)]
pub struct PriceGrid {
    low: Decimal,
    step: Decimal,
    next: usize,
    points: usize,
}

impl PriceGrid {
    pub fn new(low: Decimal, high: Decimal, points: usize) -> Self {
        let step = if points > 1 {
            (high - low) / Decimal::from(points - 1)
        } else {
            Decimal::ZERO
        };
        Self {
            low,
            step,
            next: 0,
            points,
        }
    }

    /// Grid over `[low_multiple * strike, high_multiple * strike]`.
    pub fn around_strike(
        strike: Decimal,
        low_multiple: Decimal,
        high_multiple: Decimal,
        points: usize,
    ) -> Self {
        Self::new(strike * low_multiple, strike * high_multiple, points)
    }
}

impl Iterator for PriceGrid {
    type Item = Decimal;

    fn next(&mut self) -> Option<Decimal> {
        if self.next >= self.points {
            return None;
        }
        let price = self.low + self.step * Decimal::from(self.next);
        self.next += 1;
        Some(price)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.points - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PriceGrid {}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_long_call() {
        let calc = PayoffCalculator::new(dec!(100), dec!(5), OptionType::Call, Position::Long);
        assert_eq!(calc.payoff(dec!(100)), dec!(-5));
        assert_eq!(calc.payoff(dec!(110)), dec!(5));
        assert_eq!(calc.payoff(dec!(90)), dec!(-5));
    }

    #[test]
    fn test_short_call_flips_sign() {
        assert_eq!(
            payoff(dec!(100), dec!(5), OptionType::Call, Position::Short, dec!(110)),
            dec!(-5)
        );
        assert_eq!(
            payoff(dec!(100), dec!(5), OptionType::Call, Position::Short, dec!(90)),
            dec!(5)
        );
    }

    #[test]
    fn test_put_payoffs() {
        let long = PayoffCalculator::new(dec!(100), dec!(5), OptionType::Put, Position::Long);
        assert_eq!(long.payoff(dec!(80)), dec!(15));
        assert_eq!(long.payoff(dec!(100)), dec!(-5));
        assert_eq!(long.payoff(dec!(120)), dec!(-5));

        let short = PayoffCalculator {
            position: Position::Short,
            ..long
        };
        assert_eq!(short.payoff(dec!(80)), dec!(-15));
    }

    #[test]
    fn test_breakeven() {
        let call = PayoffCalculator::new(dec!(100), dec!(5), OptionType::Call, Position::Long);
        assert_eq!(call.breakeven(), dec!(105));
        assert_eq!(call.payoff(call.breakeven()), Decimal::ZERO);

        let put = PayoffCalculator::new(dec!(100), dec!(5), OptionType::Put, Position::Short);
        assert_eq!(put.breakeven(), dec!(95));
        assert_eq!(put.payoff(put.breakeven()), Decimal::ZERO);
    }

    #[test]
    fn test_price_grid() {
        let grid = PriceGrid::around_strike(dec!(100), dec!(0.7), dec!(1.3), 7);
        assert_eq!(grid.len(), 7);
        let prices: Vec<_> = grid.collect();
        assert_eq!(
            prices,
            vec![dec!(70), dec!(80), dec!(90), dec!(100), dec!(110), dec!(120), dec!(130)]
        );
    }

    #[test]
    fn test_default_grid_spans_range() {
        let calc = PayoffCalculator::new(dec!(100), dec!(5), OptionType::Call, Position::Long);
        let grid = calc.default_grid(&PayoffConfig::default());
        assert_eq!(grid.len(), 100);
        let prices: Vec<_> = grid.collect();
        assert_eq!(prices[0], dec!(70));
        assert!((prices[99] - dec!(130)).abs() < dec!(0.000001));
        assert!(prices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_curve_is_restartable_and_ordered() {
        let calc = PayoffCalculator::new(dec!(100), dec!(5), OptionType::Call, Position::Long);
        let prices = vec![dec!(120), dec!(90), dec!(110)];
        let curve = calc.curve(prices.clone());

        let first: Vec<_> = curve.clone().collect();
        let second: Vec<_> = curve.collect();
        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                PayoffPoint {
                    price: dec!(120),
                    profit_loss: dec!(15),
                },
                PayoffPoint {
                    price: dec!(90),
                    profit_loss: dec!(-5),
                },
                PayoffPoint {
                    price: dec!(110),
                    profit_loss: dec!(5),
                },
            ]
        );
    }

    #[test]
    fn test_summary() {
        let calc = PayoffCalculator::new(dec!(100), dec!(5), OptionType::Call, Position::Short);
        let summary = calc
            .summarize(PriceGrid::new(dec!(70), dec!(130), 7))
            .unwrap();
        assert_eq!(summary.max_profit, dec!(5));
        assert_eq!(summary.max_loss, dec!(-25));
        assert_eq!(summary.breakeven, dec!(105));

        assert!(calc.summarize(Vec::new()).is_none());
    }

    #[test]
    fn test_position_parsing() {
        assert_eq!("LONG".parse::<Position>(), Ok(Position::Long));
        assert_eq!("short".parse::<Position>(), Ok(Position::Short));
        assert!("flat".parse::<Position>().is_err());
    }
}
