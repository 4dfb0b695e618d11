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

//! Recording a single review.
//!
//! Load, transition and write form a compare-and-swap on the card's version:
//! if another review lands in between, the write is refused and the whole
//! cycle runs again against the fresh state, a bounded number of times.

use serde::Deserialize;
use serde::Serialize;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::sm2::Rating;
use crate::store::ScheduleStore;
use crate::types::date::Date;
use crate::types::ids::CardId;
use crate::types::schedule::Schedule;
use crate::types::timestamp::Timestamp;

pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// What a review changed, as reported back to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub card_id: CardId,
    pub ease_factor: f64,
    pub interval_days: u32,
    pub repetitions: u32,
    pub next_review_date: Date,
}

impl ReviewOutcome {
    fn new(card_id: CardId, schedule: &Schedule) -> Self {
        Self {
            card_id,
            ease_factor: schedule.ease_factor,
            interval_days: schedule.interval_days,
            repetitions: schedule.repetitions,
            next_review_date: schedule.next_review_date,
        }
    }
}

pub struct ReviewRecorder<'s, S: ScheduleStore + ?Sized> {
    store: &'s S,
    max_attempts: usize,
}

impl<'s, S: ScheduleStore + ?Sized> ReviewRecorder<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// How many load-compute-write cycles to try before giving up. At
    /// least one.
    pub fn with_max_attempts(self, max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..self
        }
    }

    /// Applies `rating` to the card's schedule, as of `reviewed_at`. The
    /// caller is trusted to own the card.
    pub fn record(
        &self,
        card: CardId,
        rating: Rating,
        reviewed_at: Timestamp,
    ) -> Fallible<ReviewOutcome> {
        for attempt in 1..=self.max_attempts {
            let current = match self.store.load_schedule(card)? {
                Some(current) => current,
                None => return Err(ErrorReport::not_found(format!("card {card} not found."))),
            };
            let next: Schedule = current.schedule.reviewed(rating, reviewed_at);
            if self.store.swap_schedule(card, current.version, &next)? {
                log::debug!(
                    "Card {card} rated {}: interval {} days, due {}",
                    rating.as_str(),
                    next.interval_days,
                    next.next_review_date
                );
                return Ok(ReviewOutcome::new(card, &next));
            }
            log::warn!(
                "Card {card} changed while being reviewed (attempt {attempt} of {}), retrying",
                self.max_attempts
            );
        }
        log::error!(
            "Giving up on review of card {card} after {} attempts",
            self.max_attempts
        );
        Err(ErrorReport::conflict(format!(
            "card {card} is being reviewed concurrently, try again."
        )))
    }
}
