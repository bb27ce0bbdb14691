//! Pure game-rule helpers: dice rolling and bonus formulas.

mod bonus;
mod dice;

pub use bonus::{floor_div, primary_bonus, skill_bonus, stat_bonus, PRIMARY_BONUS_DIVISOR};
pub use dice::{roll, DiceExpr};
