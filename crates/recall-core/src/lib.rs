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

//! recall-core: Core library for the recall spaced repetition scheduler.
//!
//! This library is free of I/O and provides:
//! - The SM-2 transition function
//! - Due card selection and study ordering
//! - Review statistics
//! - The review recorder, on top of a pluggable schedule store

pub mod due;
pub mod error;
pub mod recorder;
pub mod sm2;
pub mod stats;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use due::{DueCards, Scope, select_due};
pub use error::{ErrorKind, ErrorReport, Fallible, fail};
pub use recorder::{ReviewOutcome, ReviewRecorder};
pub use sm2::{Rating, Sm2State, transition};
pub use stats::{ReviewActivity, SrsStats, WeakMaterial, activity, project};
pub use store::{MemoryStore, ScheduleStore, Versioned};
pub use types::date::Date;
pub use types::ids::{CardId, MaterialId, UserId};
pub use types::schedule::{Schedule, ScheduledCard};
pub use types::timestamp::Timestamp;
