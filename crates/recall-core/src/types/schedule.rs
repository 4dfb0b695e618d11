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

use serde::Deserialize;
use serde::Serialize;

use crate::sm2::Rating;
use crate::sm2::Sm2State;
use crate::sm2::transition;
use crate::types::date::Date;
use crate::types::ids::CardId;
use crate::types::ids::MaterialId;
use crate::types::timestamp::Timestamp;

/// The scheduling record of a single card.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub ease_factor: f64,
    pub interval_days: u32,
    /// Consecutive non-Again reviews since the last reset.
    pub repetitions: u32,
    pub next_review_date: Date,
    pub last_reviewed_at: Option<Timestamp>,
}

impl Schedule {
    /// The schedule of a card created on the given date. New cards are due
    /// immediately.
    pub fn new(created_on: Date) -> Self {
        let Sm2State {
            ease_factor,
            interval_days,
            repetitions,
        } = Sm2State::default();
        Self {
            ease_factor,
            interval_days,
            repetitions,
            next_review_date: created_on,
            last_reviewed_at: None,
        }
    }

    pub fn sm2_state(&self) -> Sm2State {
        Sm2State {
            ease_factor: self.ease_factor,
            interval_days: self.interval_days,
            repetitions: self.repetitions,
        }
    }

    /// Whether the card should be studied on `today`.
    pub fn is_due(&self, today: Date) -> bool {
        self.next_review_date <= today
    }

    pub fn is_new(&self) -> bool {
        self.repetitions == 0
    }

    /// Cards whose interval has grown past three weeks.
    pub fn is_mature(&self) -> bool {
        self.interval_days > 21
    }

    pub fn reviewed_on(&self, day: Date) -> bool {
        self.last_reviewed_at.is_some_and(|ts| ts.date() == day)
    }

    /// The schedule after reviewing the card at `reviewed_at`. The due date
    /// counts from the date of the review.
    pub fn reviewed(&self, rating: Rating, reviewed_at: Timestamp) -> Schedule {
        let next = transition(self.sm2_state(), rating);
        Schedule {
            ease_factor: next.ease_factor,
            interval_days: next.interval_days,
            repetitions: next.repetitions,
            next_review_date: reviewed_at.date().add_days(next.interval_days),
            last_reviewed_at: Some(reviewed_at),
        }
    }
}

/// A schedule together with the card and material it belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduledCard {
    pub card_id: CardId,
    pub material_id: MaterialId,
    #[serde(flatten)]
    pub schedule: Schedule,
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;
    use crate::error::Fallible;
    use crate::sm2::INITIAL_EASE_FACTOR;

    fn make_timestamp(s: &str) -> Timestamp {
        let ndt = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.3f").unwrap();
        Timestamp::new(ndt)
    }

    #[test]
    fn test_new_card_is_due_on_creation() -> Fallible<()> {
        let today = Date::from_ymd(2024, 1, 1)?;
        let schedule = Schedule::new(today);
        assert_eq!(schedule.ease_factor, INITIAL_EASE_FACTOR);
        assert_eq!(schedule.interval_days, 0);
        assert_eq!(schedule.repetitions, 0);
        assert_eq!(schedule.last_reviewed_at, None);
        assert!(schedule.is_new());
        assert!(schedule.is_due(today));
        assert!(!schedule.is_due(Date::from_ymd(2023, 12, 31)?));
        Ok(())
    }

    #[test]
    fn test_reviewed_sets_due_date_from_review_day() -> Fallible<()> {
        let schedule = Schedule {
            ease_factor: 2.5,
            interval_days: 6,
            repetitions: 2,
            next_review_date: Date::from_ymd(2024, 1, 7)?,
            last_reviewed_at: Some(make_timestamp("2024-01-01T09:00:00.000")),
        };
        let reviewed_at = make_timestamp("2024-01-09T23:30:00.000");
        let next = schedule.reviewed(Rating::Good, reviewed_at);
        assert_eq!(next.repetitions, 3);
        assert_eq!(next.interval_days, 14);
        assert_eq!(next.next_review_date, Date::from_ymd(2024, 1, 23)?);
        assert_eq!(next.last_reviewed_at, Some(reviewed_at));
        assert!(next.reviewed_on(Date::from_ymd(2024, 1, 9)?));
        assert!(!next.reviewed_on(Date::from_ymd(2024, 1, 10)?));
        Ok(())
    }

    #[test]
    fn test_again_is_due_tomorrow() -> Fallible<()> {
        let schedule = Schedule::new(Date::from_ymd(2024, 3, 1)?);
        let next = schedule.reviewed(Rating::Again, make_timestamp("2024-03-01T10:00:00.000"));
        assert_eq!(next.next_review_date, Date::from_ymd(2024, 3, 2)?);
        assert!(next.is_new());
        Ok(())
    }

    #[test]
    fn test_serialize_scheduled_card() -> Fallible<()> {
        let card = ScheduledCard {
            card_id: CardId::new(3),
            material_id: MaterialId::new(1),
            schedule: Schedule::new(Date::from_ymd(2024, 1, 2)?),
        };
        let json = serde_json::to_value(card)?;
        assert_eq!(json["card_id"], 3);
        assert_eq!(json["next_review_date"], "2024-01-02");
        assert_eq!(json["ease_factor"], 2.5);
        assert!(json["last_reviewed_at"].is_null());
        Ok(())
    }
}
