//! Time of day and weather.

use rand::Rng;

/// Phases of the day, in cycle order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Dawn,
    Day,
    Dusk,
    Night,
}

impl TimeOfDay {
    pub fn next(self) -> Self {
        match self {
            TimeOfDay::Dawn => TimeOfDay::Day,
            TimeOfDay::Day => TimeOfDay::Dusk,
            TimeOfDay::Dusk => TimeOfDay::Night,
            TimeOfDay::Night => TimeOfDay::Dawn,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TimeOfDay::Dawn => "dawn",
            TimeOfDay::Day => "day",
            TimeOfDay::Dusk => "dusk",
            TimeOfDay::Night => "night",
        }
    }

    /// Broadcast when the phase begins
    pub fn announcement(self) -> &'static str {
        match self {
            TimeOfDay::Dawn => "The first rays of dawn paint the eastern sky.",
            TimeOfDay::Day => "The sun climbs higher, bathing the land in light.",
            TimeOfDay::Dusk => "The sun dips below the horizon. Night approaches.",
            TimeOfDay::Night => "Darkness settles as stars pepper the sky.",
        }
    }
}

/// Weather from mildest to most severe
pub const WEATHER_SEVERITY: [&str; 7] = [
    "clear",
    "light clouds",
    "overcast",
    "light rain",
    "rain",
    "heavy rain",
    "storm",
];

const WORSEN_FROM_CLEAR_START: f64 = 0.10;
const WORSEN_ESCALATION: f64 = 0.03;
const WORSEN_FROM_CLEAR_MAX: f64 = 0.75;
const IMPROVE_CHANCE: f64 = 0.50;
const STAY_BAD_CHANCE: f64 = 0.40;

/// World-wide environment state, owned by the tick loop
#[derive(Debug, Clone)]
pub struct Environment {
    pub time_of_day: TimeOfDay,
    /// Index into [`WEATHER_SEVERITY`]
    weather: usize,
    consecutive_clear: u32,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            time_of_day: TimeOfDay::Dawn,
            weather: 0,
            consecutive_clear: 0,
        }
    }

    pub fn weather(&self) -> &'static str {
        WEATHER_SEVERITY[self.weather]
    }

    /// Advance to the next phase and return its announcement
    pub fn advance_time(&mut self) -> &'static str {
        self.time_of_day = self.time_of_day.next();
        self.time_of_day.announcement()
    }

    /// Roll for a weather change; returns the new weather when it changed
    pub fn roll_weather<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<&'static str> {
        let old = self.weather;
        let last = WEATHER_SEVERITY.len() - 1;

        if self.weather == 0 {
            let worsen = (WORSEN_FROM_CLEAR_START + WORSEN_ESCALATION * self.consecutive_clear as f64)
                .min(WORSEN_FROM_CLEAR_MAX);
            if rng.gen::<f64>() < worsen {
                self.weather = rng.gen_range(1..=2);
                self.consecutive_clear = 0;
            } else {
                self.consecutive_clear += 1;
            }
        } else {
            let draw: f64 = rng.gen();
            if draw < IMPROVE_CHANCE {
                self.weather -= 1;
            } else if draw >= IMPROVE_CHANCE + STAY_BAD_CHANCE {
                self.weather = (self.weather + 1).min(last);
            }
            if self.weather == 0 {
                self.consecutive_clear = 0;
            }
        }

        (self.weather != old).then(|| self.weather())
    }

    /// Room-description suffix for rooms open to the sky
    pub fn describe(&self) -> String {
        format!("It is {}. The weather is {}.", self.time_of_day.name(), self.weather())
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// Broadcast text for a weather change
pub fn weather_announcement(weather: &str) -> String {
    format!("The weather turns to {}.", weather)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_time_cycles_through_all_phases() {
        let mut env = Environment::new();
        let mut seen = vec![env.time_of_day];
        for _ in 0..4 {
            env.advance_time();
            seen.push(env.time_of_day);
        }
        assert_eq!(
            seen,
            vec![TimeOfDay::Dawn, TimeOfDay::Day, TimeOfDay::Dusk, TimeOfDay::Night, TimeOfDay::Dawn]
        );
    }

    #[test]
    fn test_weather_stays_in_range() {
        let mut env = Environment::new();
        let mut rng = StdRng::seed_from_u64(42);
        let mut changed = false;
        for _ in 0..2000 {
            if env.roll_weather(&mut rng).is_some() {
                changed = true;
            }
            assert!(WEATHER_SEVERITY.contains(&env.weather()));
        }
        assert!(changed);
    }

    #[test]
    fn test_leaving_clear_moves_one_or_two_steps() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let mut env = Environment::new();
            env.consecutive_clear = 100;
            // chance is capped at 0.75, so keep rolling until it leaves clear
            while env.roll_weather(&mut rng).is_none() {}
            assert!(env.weather == 1 || env.weather == 2);
        }
    }

    #[test]
    fn test_clear_streak_resets_on_change() {
        let mut env = Environment::new();
        let mut rng = StdRng::seed_from_u64(1);
        while env.roll_weather(&mut rng).is_none() {
            assert!(env.consecutive_clear > 0);
        }
        assert_ne!(env.weather(), "clear");
        assert_eq!(env.consecutive_clear, 0);
    }
}
