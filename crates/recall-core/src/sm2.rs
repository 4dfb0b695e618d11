// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The SM-2 transition function.
//!
//! Nothing in here reads the clock or touches storage: a state and a rating
//! go in, the next state comes out. Due dates are the caller's business.

use serde::Deserialize;
use serde::Serialize;

use crate::error::ErrorReport;

/// The ease factor never drops below this.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Ease factor of a card that has never been reviewed.
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

/// The maximum review interval in days.
pub const MAX_INTERVAL: u32 = 365;

const HARD_MULTIPLIER: f64 = 0.8;
const EASY_MULTIPLIER: f64 = 1.3;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    /// The SM-2 quality score on the 0-5 scale.
    pub fn quality(self) -> f64 {
        match self {
            Rating::Again => 0.0,
            Rating::Hard => 2.0,
            Rating::Good => 3.0,
            Rating::Easy => 5.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Again => "again",
            Rating::Hard => "hard",
            Rating::Good => "good",
            Rating::Easy => "easy",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rating::Again => "Again",
            Rating::Hard => "Hard",
            Rating::Good => "Good",
            Rating::Easy => "Easy",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Rating::Again => "I don't remember, show it again",
            Rating::Hard => "I remembered, but with difficulty",
            Rating::Good => "I remembered it well",
            Rating::Easy => "That was easy, I know it",
        }
    }
}

impl TryFrom<String> for Rating {
    type Error = ErrorReport;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rating::try_from(value.as_str())
    }
}

impl TryFrom<&str> for Rating {
    type Error = ErrorReport;

    /// Accepts the lowercase name or the numeric wire value (`0` to `3`).
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "again" | "0" => Ok(Rating::Again),
            "hard" | "1" => Ok(Rating::Hard),
            "good" | "2" => Ok(Rating::Good),
            "easy" | "3" => Ok(Rating::Easy),
            _ => Err(ErrorReport::invalid_rating(format!(
                "invalid rating: '{value}'."
            ))),
        }
    }
}

impl TryFrom<i64> for Rating {
    type Error = ErrorReport;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Rating::Again),
            1 => Ok(Rating::Hard),
            2 => Ok(Rating::Good),
            3 => Ok(Rating::Easy),
            _ => Err(ErrorReport::invalid_rating(format!(
                "invalid rating: {value}."
            ))),
        }
    }
}

/// Where a card is in its life. Never stored: always derived from the
/// repetition count and interval.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    /// Never successfully reviewed.
    New,
    /// At least one successful review since the last reset.
    Learning,
    /// Forgotten on the last review, to be relearned tomorrow.
    Lapsed,
}

/// The part of a card's schedule the transition function reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sm2State {
    pub ease_factor: f64,
    pub interval_days: u32,
    pub repetitions: u32,
}

impl Default for Sm2State {
    fn default() -> Self {
        Self {
            ease_factor: INITIAL_EASE_FACTOR,
            interval_days: 0,
            repetitions: 0,
        }
    }
}

impl Sm2State {
    pub fn phase(&self) -> Phase {
        match (self.repetitions, self.interval_days) {
            (0, 0) => Phase::New,
            (0, _) => Phase::Lapsed,
            _ => Phase::Learning,
        }
    }
}

/// EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)), floored at 1.3.
pub fn next_ease_factor(ease_factor: f64, rating: Rating) -> f64 {
    let d = 5.0 - rating.quality();
    let ef = ease_factor + (0.1 - d * (0.08 + d * 0.02));
    f64::max(MIN_EASE_FACTOR, ef)
}

/// Computes the state after reviewing a card with the given rating.
pub fn transition(state: Sm2State, rating: Rating) -> Sm2State {
    let ease_factor = next_ease_factor(state.ease_factor, rating);
    if rating == Rating::Again {
        return Sm2State {
            ease_factor,
            interval_days: 1,
            repetitions: 0,
        };
    }
    let repetitions = state.repetitions.saturating_add(1);
    let interval = match repetitions {
        1 => 1,
        2 => 6,
        _ => (f64::from(state.interval_days) * ease_factor).round() as u32,
    };
    // Hard is floored at one day, Easy is not. Keep it that way until
    // someone decides otherwise.
    let interval = match rating {
        Rating::Hard => u32::max(1, (f64::from(interval) * HARD_MULTIPLIER).floor() as u32),
        Rating::Easy => (f64::from(interval) * EASY_MULTIPLIER).floor() as u32,
        _ => interval,
    };
    Sm2State {
        ease_factor,
        interval_days: interval.min(MAX_INTERVAL),
        repetitions,
    }
}

/// The interval each rating would produce, in `Rating::ALL` order.
pub fn preview(state: Sm2State) -> [u32; 4] {
    Rating::ALL.map(|rating| transition(state, rating).interval_days)
}

#[cfg(test)]
mod tests {
    use std::iter::zip;

    use super::*;
    use crate::error::ErrorKind;
    use crate::error::Fallible;

    /// Approximate equality.
    fn feq(a: f64, b: f64) -> bool {
        f64::abs(a - b) < 1e-9
    }

    fn state(ease_factor: f64, interval_days: u32, repetitions: u32) -> Sm2State {
        Sm2State {
            ease_factor,
            interval_days,
            repetitions,
        }
    }

    /// A grid of plausible and implausible states.
    fn grid() -> Vec<Sm2State> {
        let eases = [1.3, 1.31, 1.5, 1.8, 2.5, 3.0, 4.2, 10.0];
        let intervals = [0, 1, 2, 6, 14, 21, 100, 300, 365];
        let reps = [0, 1, 2, 3, 10, u32::MAX];
        let mut out = vec![];
        for &e in &eases {
            for &i in &intervals {
                for &r in &reps {
                    out.push(state(e, i, r));
                }
            }
        }
        out
    }

    #[test]
    fn test_scenario_good_after_two_reviews() {
        let next = transition(state(2.5, 6, 2), Rating::Good);
        assert!(feq(next.ease_factor, 2.36));
        assert_eq!(next.repetitions, 3);
        assert_eq!(next.interval_days, 14);
    }

    #[test]
    fn test_scenario_again_after_two_reviews() {
        let next = transition(state(2.5, 6, 2), Rating::Again);
        assert!(feq(next.ease_factor, 1.7));
        assert_eq!(next.repetitions, 0);
        assert_eq!(next.interval_days, 1);
    }

    /// Three goods on a fresh card: 1, 6, round(6 * EF).
    #[test]
    fn test_fresh_card_three_goods() {
        let mut s = Sm2State::default();
        let mut intervals = vec![];
        for _ in 0..3 {
            s = transition(s, Rating::Good);
            intervals.push(s.interval_days);
        }
        assert!(feq(s.ease_factor, 2.08));
        assert_eq!(intervals, vec![1, 6, (6.0 * s.ease_factor).round() as u32]);
        assert_eq!(intervals, vec![1, 6, 12]);
    }

    #[test]
    fn test_hard_and_easy_modifiers() {
        // Second review: base interval 6.
        let hard = transition(state(2.5, 1, 1), Rating::Hard);
        assert_eq!(hard.interval_days, 4);
        let easy = transition(state(2.5, 1, 1), Rating::Easy);
        assert_eq!(easy.interval_days, 7);
        // First review: base interval 1, Hard is floored at one day.
        assert_eq!(transition(Sm2State::default(), Rating::Hard).interval_days, 1);
        assert_eq!(transition(Sm2State::default(), Rating::Easy).interval_days, 1);
    }

    /// Easy has no floor: a zero base interval stays zero.
    #[test]
    fn test_easy_keeps_zero_interval() {
        let next = transition(state(2.5, 0, 5), Rating::Easy);
        assert_eq!(next.interval_days, 0);
        let next = transition(state(2.5, 0, 5), Rating::Hard);
        assert_eq!(next.interval_days, 1);
    }

    #[test]
    fn test_interval_capped() {
        let next = transition(state(2.5, 300, 8), Rating::Good);
        assert_eq!(next.interval_days, MAX_INTERVAL);
        let next = transition(state(3.0, 365, 8), Rating::Easy);
        assert_eq!(next.interval_days, MAX_INTERVAL);
    }

    #[test]
    fn test_ease_floor_holds_everywhere() {
        for s in grid() {
            for rating in Rating::ALL {
                let next = transition(s, rating);
                assert!(next.ease_factor >= MIN_EASE_FACTOR, "{s:?} {rating:?}");
                assert!(next.interval_days <= MAX_INTERVAL, "{s:?} {rating:?}");
            }
        }
    }

    #[test]
    fn test_again_always_resets() {
        for s in grid() {
            let next = transition(s, Rating::Again);
            assert_eq!(next.repetitions, 0);
            assert_eq!(next.interval_days, 1);
            assert_eq!(next.phase(), Phase::Lapsed);
        }
    }

    #[test]
    fn test_deterministic() {
        for s in grid() {
            for rating in Rating::ALL {
                let a = transition(s, rating);
                let b = transition(s, rating);
                assert_eq!(a.ease_factor.to_bits(), b.ease_factor.to_bits());
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn test_repeated_again_bottoms_out() {
        let mut s = Sm2State::default();
        for _ in 0..10 {
            s = transition(s, Rating::Again);
        }
        assert_eq!(s.ease_factor, MIN_EASE_FACTOR);
    }

    #[test]
    fn test_phase() {
        assert_eq!(Sm2State::default().phase(), Phase::New);
        let s = transition(Sm2State::default(), Rating::Good);
        assert_eq!(s.phase(), Phase::Learning);
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview(state(2.5, 6, 2)), [1, 10, 14, 20]);
    }

    #[test]
    fn test_rating_parse() -> Fallible<()> {
        for rating in Rating::ALL {
            assert_eq!(rating, Rating::try_from(rating.as_str().to_string())?);
        }
        let wire: [i64; 4] = [0, 1, 2, 3];
        for (value, rating) in zip(wire, Rating::ALL) {
            assert_eq!(Rating::try_from(value)?, rating);
            assert_eq!(Rating::try_from(value.to_string())?, rating);
        }
        Ok(())
    }

    #[test]
    fn test_invalid_rating() {
        for s in ["", "Good", "forgot", "4", "-1"] {
            let err = Rating::try_from(s).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidRating);
        }
        for n in [-1i64, 4, 5] {
            let err = Rating::try_from(n).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidRating);
        }
    }

    /// Test the serialization format of Rating.
    #[test]
    fn test_rating_serialization_format() -> Fallible<()> {
        let expected = ["again", "hard", "good", "easy"];
        for (rating, expected) in zip(Rating::ALL, expected) {
            assert_eq!(serde_json::to_string(&rating)?, format!("\"{expected}\""));
            assert_eq!(rating.as_str(), expected);
            let back: Rating = serde_json::from_str(&format!("\"{expected}\""))?;
            assert_eq!(back, rating);
        }
        Ok(())
    }
}
