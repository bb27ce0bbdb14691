//! Integer bonus formulas shared by combat, derived stats and experience.

/// Baseline divisor used for primary bonuses (`stat / 50`)
pub const PRIMARY_BONUS_DIVISOR: i32 = 50;

/// Integer division rounding toward negative infinity
pub fn floor_div(a: i32, b: i32) -> i32 {
    let q = a / b;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

/// `floor((value - baseline) / divisor)`, or 0 when the divisor is 0
pub fn stat_bonus(value: i32, baseline: i32, divisor: i32) -> i32 {
    if divisor == 0 {
        return 0;
    }
    floor_div(value - baseline, divisor)
}

/// `floor(rank / divisor)`, or 0 when the divisor is 0
pub fn skill_bonus(rank: i32, divisor: i32) -> i32 {
    if divisor == 0 {
        return 0;
    }
    floor_div(rank, divisor)
}

/// `floor(stat / 50)` plus the race's modifier for that stat
pub fn primary_bonus(stat: i32, race_mod: i32) -> i32 {
    floor_div(stat, PRIMARY_BONUS_DIVISOR) + race_mod
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_divisor_is_zero() {
        for value in [-100, -1, 0, 1, 50, 999] {
            for baseline in [-50, 0, 50, 100] {
                assert_eq!(stat_bonus(value, baseline, 0), 0);
            }
            assert_eq!(skill_bonus(value, 0), 0);
        }
    }

    #[test]
    fn test_stat_bonus_floors() {
        assert_eq!(stat_bonus(70, 50, 20), 1);
        assert_eq!(stat_bonus(50, 50, 10), 0);
        assert_eq!(stat_bonus(49, 50, 10), -1);
        assert_eq!(stat_bonus(30, 50, 20), -1);
        assert_eq!(stat_bonus(29, 50, 20), -2);
    }

    #[test]
    fn test_skill_bonus() {
        assert_eq!(skill_bonus(0, 50), 0);
        assert_eq!(skill_bonus(49, 50), 0);
        assert_eq!(skill_bonus(120, 50), 2);
    }

    #[test]
    fn test_primary_bonus() {
        assert_eq!(primary_bonus(10, 0), 0);
        assert_eq!(primary_bonus(10, 1), 1);
        assert_eq!(primary_bonus(100, 0), 2);
    }

    #[test]
    fn test_floor_div_signs() {
        assert_eq!(floor_div(7, 2), 3);
        assert_eq!(floor_div(-7, 2), -4);
        assert_eq!(floor_div(7, -2), -4);
        assert_eq!(floor_div(-7, -2), 3);
    }
}
