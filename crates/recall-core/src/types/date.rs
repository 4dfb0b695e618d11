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

use std::fmt::Display;
use std::fmt::Formatter;

use chrono::Duration;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ErrorReport;
use crate::error::Fallible;

/// A calendar date. Scheduling works at day granularity: a card due on a
/// date is due for the whole of that date.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Date(NaiveDate);

impl Date {
    pub fn new(naive_date: NaiveDate) -> Self {
        Self(naive_date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Fallible<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Date)
            .ok_or_else(|| ErrorReport::new(format!("invalid date: {year}-{month}-{day}")))
    }

    /// The date `days` days after this one.
    pub fn add_days(self, days: u32) -> Self {
        Self(self.0 + Duration::days(i64::from(days)))
    }

    pub fn previous(self) -> Self {
        Self(self.0 - Duration::days(1))
    }
}

impl Display for Date {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl TryFrom<String> for Date {
    type Error = ErrorReport;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let date = NaiveDate::parse_from_str(&value, "%Y-%m-%d")
            .map_err(|_| ErrorReport::new(format!("invalid date: {}", value)))?;
        Ok(Date(date))
    }
}

impl From<Date> for String {
    fn from(date: Date) -> String {
        date.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize() -> Fallible<()> {
        let date = Date::from_ymd(2024, 1, 2)?;
        let serialized = serde_json::to_string(&date)?;
        assert_eq!(serialized, "\"2024-01-02\"");
        Ok(())
    }

    #[test]
    fn test_deserialize() -> Fallible<()> {
        let date: Date = serde_json::from_str("\"2024-01-02\"")?;
        assert_eq!(date, Date::from_ymd(2024, 1, 2)?);
        Ok(())
    }

    #[test]
    fn test_invalid() {
        assert!(Date::from_ymd(2024, 2, 30).is_err());
        assert!(Date::try_from("2024/01/02".to_string()).is_err());
    }

    #[test]
    fn test_add_days_crosses_month_and_year() -> Fallible<()> {
        let date = Date::from_ymd(2024, 12, 30)?;
        assert_eq!(date.add_days(0), date);
        assert_eq!(date.add_days(2), Date::from_ymd(2025, 1, 1)?);
        assert_eq!(date.add_days(365), Date::from_ymd(2025, 12, 30)?);
        Ok(())
    }

    #[test]
    fn test_previous() -> Fallible<()> {
        assert_eq!(Date::from_ymd(2024, 3, 1)?.previous(), Date::from_ymd(2024, 2, 29)?);
        assert_eq!(Date::from_ymd(2025, 1, 1)?.previous(), Date::from_ymd(2024, 12, 31)?);
        Ok(())
    }
}
