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

//! Selecting the cards to study today.
//!
//! Due cards are ordered by due date, oldest first, and then by ease
//! factor, hardest first. The total is counted before the limit is applied.

use std::cmp::Ordering;

use serde::Deserialize;
use serde::Serialize;

use crate::types::date::Date;
use crate::types::ids::MaterialId;
use crate::types::ids::UserId;
use crate::types::schedule::Schedule;
use crate::types::schedule::ScheduledCard;

/// Which cards a query ranges over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    /// Every card in every material of the user.
    User(UserId),
    /// The cards of one material owned by the user.
    Material { user: UserId, material: MaterialId },
}

impl Scope {
    pub fn user(&self) -> UserId {
        match self {
            Scope::User(user) => *user,
            Scope::Material { user, .. } => *user,
        }
    }

    pub fn material(&self) -> Option<MaterialId> {
        match self {
            Scope::User(_) => None,
            Scope::Material { material, .. } => Some(*material),
        }
    }
}

/// The cards due in some scope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DueCards {
    /// At most `limit` due cards, in study order.
    pub cards: Vec<ScheduledCard>,
    /// How many cards are due in total, regardless of the limit.
    pub total_due: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub material_id: Option<MaterialId>,
}

/// Study order: earliest due date first, then lowest ease factor first.
pub fn study_order(a: &Schedule, b: &Schedule) -> Ordering {
    a.next_review_date
        .cmp(&b.next_review_date)
        .then_with(|| a.ease_factor.total_cmp(&b.ease_factor))
}

/// Filters a snapshot of cards already restricted to `scope` down to those
/// due on `today`, sorts them into study order, and keeps the first `limit`.
pub fn select_due(
    cards: impl IntoIterator<Item = ScheduledCard>,
    scope: Scope,
    today: Date,
    limit: usize,
) -> DueCards {
    let mut due: Vec<ScheduledCard> = cards
        .into_iter()
        .filter(|card| card.schedule.is_due(today))
        .collect();
    let total_due = due.len();
    due.sort_by(|a, b| study_order(&a.schedule, &b.schedule).then(a.card_id.cmp(&b.card_id)));
    due.truncate(limit);
    DueCards {
        cards: due,
        total_due,
        material_id: scope.material(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Fallible;
    use crate::types::ids::CardId;

    fn card(id: i64, due: Date, ease_factor: f64) -> ScheduledCard {
        let mut schedule = Schedule::new(due);
        schedule.ease_factor = ease_factor;
        ScheduledCard {
            card_id: CardId::new(id),
            material_id: MaterialId::new(1),
            schedule,
        }
    }

    fn ids(due: &DueCards) -> Vec<i64> {
        due.cards.iter().map(|c| c.card_id.get()).collect()
    }

    const USER: Scope = Scope::User(UserId::new(1));

    #[test]
    fn test_yesterday_today_tomorrow() -> Fallible<()> {
        let today = Date::from_ymd(2024, 5, 10)?;
        let yesterday = Date::from_ymd(2024, 5, 9)?;
        let tomorrow = Date::from_ymd(2024, 5, 11)?;
        let cards = vec![
            card(1, today, 2.5),
            card(2, tomorrow, 2.5),
            card(3, yesterday, 2.5),
        ];
        let first = select_due(cards.clone(), USER, today, 100);
        assert_eq!(ids(&first), vec![3, 1]);
        assert_eq!(first.total_due, 2);
        let second = select_due(cards, USER, today, 100);
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_lower_ease_first_on_same_day() -> Fallible<()> {
        let today = Date::from_ymd(2024, 5, 10)?;
        let cards = vec![card(1, today, 2.9), card(2, today, 1.8)];
        let due = select_due(cards, USER, today, 100);
        assert_eq!(ids(&due), vec![2, 1]);
        Ok(())
    }

    #[test]
    fn test_ties_by_card_id() -> Fallible<()> {
        let today = Date::from_ymd(2024, 5, 10)?;
        let cards = vec![card(7, today, 2.5), card(3, today, 2.5), card(5, today, 2.5)];
        assert_eq!(ids(&select_due(cards, USER, today, 100)), vec![3, 5, 7]);
        Ok(())
    }

    #[test]
    fn test_date_dominates_ease() -> Fallible<()> {
        let today = Date::from_ymd(2024, 5, 10)?;
        let cards = vec![
            card(1, today, 1.3),
            card(2, Date::from_ymd(2024, 5, 1)?, 3.0),
        ];
        let due = select_due(cards, USER, today, 100);
        assert_eq!(ids(&due), vec![2, 1]);
        Ok(())
    }

    #[test]
    fn test_total_ignores_limit() -> Fallible<()> {
        let today = Date::from_ymd(2024, 5, 10)?;
        let cards: Vec<ScheduledCard> = (0..10)
            .map(|i| card(i, today, 1.3 + (i as f64) * 0.1))
            .collect();
        let due = select_due(cards, USER, today, 3);
        assert_eq!(ids(&due), vec![0, 1, 2]);
        assert_eq!(due.total_due, 10);
        let none = select_due(Vec::new(), USER, today, 3);
        assert!(none.cards.is_empty());
        assert_eq!(none.total_due, 0);
        Ok(())
    }

    #[test]
    fn test_material_scope_is_echoed() -> Fallible<()> {
        let today = Date::from_ymd(2024, 5, 10)?;
        let scope = Scope::Material {
            user: UserId::new(1),
            material: MaterialId::new(4),
        };
        let due = select_due(vec![card(1, today, 2.5)], scope, today, 10);
        assert_eq!(due.material_id, Some(MaterialId::new(4)));
        let json = serde_json::to_value(&due)?;
        assert_eq!(json["material_id"], 4);
        assert_eq!(json["total_due"], 1);
        let json = serde_json::to_value(select_due(Vec::new(), USER, today, 10))?;
        assert!(json.get("material_id").is_none());
        Ok(())
    }
}
