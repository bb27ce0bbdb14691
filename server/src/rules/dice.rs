//! Dice expressions of the form `NdM`, `NdM+K`, `NdM-K`, or a bare integer.

use log::warn;
use rand::Rng;

/// Expressions asking for more dice than this are treated as malformed
const MAX_DICE_COUNT: i32 = 1000;

/// A parsed dice expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceExpr {
    pub count: i32,
    pub sides: i32,
    pub modifier: i32,
}

impl DiceExpr {
    /// A fixed value with no dice
    pub fn flat(value: i32) -> Self {
        Self { count: 0, sides: 0, modifier: value }
    }

    /// Parse an expression; `None` if it is neither dice nor an integer
    pub fn parse(expr: &str) -> Option<Self> {
        let expr = expr.trim().to_ascii_lowercase();
        if expr.is_empty() {
            return None;
        }

        if let Ok(value) = expr.parse::<i32>() {
            return Some(Self::flat(value));
        }

        let (count, rest) = expr.split_once('d')?;
        let (sides, modifier) = match rest.find(|c: char| c == '+' || c == '-') {
            Some(idx) => {
                let (sides, modifier) = rest.split_at(idx);
                let digits = &modifier[1..];
                if !is_digits(digits) {
                    return None;
                }
                (sides, modifier.parse::<i32>().ok()?)
            }
            None => (rest, 0),
        };

        if !is_digits(count) || !is_digits(sides) {
            return None;
        }

        let count = count.parse::<i32>().ok()?;
        let sides = sides.parse::<i32>().ok()?;
        if count > MAX_DICE_COUNT {
            return None;
        }

        Some(Self { count, sides, modifier })
    }

    /// Sum `count` draws in `[1, sides]` plus the modifier, saturating at the `i32` bounds
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> i32 {
        if self.count <= 0 || self.sides <= 0 {
            return self.modifier;
        }
        let total: i64 = (0..self.count).map(|_| i64::from(rng.gen_range(1..=self.sides))).sum();
        saturate(total + i64::from(self.modifier))
    }

    /// Smallest value the expression can produce
    pub fn min(&self) -> i32 {
        if self.count <= 0 || self.sides <= 0 {
            self.modifier
        } else {
            self.count.saturating_add(self.modifier)
        }
    }

    /// Largest value the expression can produce
    pub fn max(&self) -> i32 {
        if self.count <= 0 || self.sides <= 0 {
            self.modifier
        } else {
            self.count.saturating_mul(self.sides).saturating_add(self.modifier)
        }
    }
}

fn saturate(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Roll an expression; strings that are not dice resolve to 0
pub fn roll<R: Rng + ?Sized>(expr: &str, rng: &mut R) -> i32 {
    match DiceExpr::parse(expr) {
        Some(dice) => dice.roll(rng),
        None => {
            warn!("Unrecognised dice expression '{}', treating as 0", expr);
            0
        }
    }
}
