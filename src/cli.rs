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

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use recall_core::ErrorReport;
use recall_core::Fallible;
use recall_core::Rating;
use recall_core::ReviewRecorder;
use recall_core::ScheduleStore;
use recall_core::Scope;
use recall_core::Timestamp;
use recall_core::sm2::preview;
use recall_core::types::ids::CardId;
use recall_core::types::ids::MaterialId;
use recall_core::types::ids::UserId;
use serde::Serialize;

use crate::config::Config;
use crate::db::Database;

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
    /// Path to the config file. By default, `recall.toml` in the working directory is used if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Path to the database. Overrides the config file.
    #[arg(long, global = true)]
    database: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Create a user.
    AddUser { name: String },
    /// Create a study material owned by a user.
    AddMaterial {
        #[arg(long)]
        user: i64,
        title: String,
    },
    /// Add a flashcard to a material. The card is due immediately.
    AddCard {
        #[arg(long)]
        material: i64,
        question: String,
        answer: String,
    },
    /// Delete a flashcard and its schedule.
    DeleteCard { card: i64 },
    /// Record a review of a card.
    Review {
        card: i64,
        /// One of again, hard, good, easy, or 0 to 3.
        rating: String,
    },
    /// List the cards due today, in study order.
    Due {
        #[arg(long)]
        user: i64,
        /// Only list cards from this material.
        #[arg(long)]
        material: Option<i64>,
        /// Maximum number of cards to list. The total due is always reported.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print review statistics for a user.
    Stats {
        #[arg(long)]
        user: i64,
    },
    /// Print how many reviews a user made today and their current streak.
    Streak {
        #[arg(long)]
        user: i64,
    },
    /// List the materials a user is struggling with.
    Weak {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show the interval each rating would give a card.
    Preview { card: i64 },
}

#[derive(Serialize)]
struct Created {
    id: i64,
}

#[derive(Serialize)]
struct RatingPreview {
    rating: Rating,
    label: &'static str,
    description: &'static str,
    interval_days: u32,
}

pub fn entrypoint() -> Fallible<()> {
    let cli: Cli = Cli::parse();
    let output = run(cli, Timestamp::now())?;
    println!("{output}");
    Ok(())
}

/// Executes a command as of `now`, returning what to print.
pub fn run(cli: Cli, now: Timestamp) -> Fallible<String> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database = database;
    }
    let today = now.date();
    // Ratings are checked before the database is touched.
    let rating = match &cli.command {
        Command::Review { rating, .. } => Some(Rating::try_from(rating.as_str())?),
        _ => None,
    };
    let db = Database::open(&config.database)?;
    let json = match cli.command {
        Command::AddUser { name } => to_json(&Created {
            id: db.insert_user(&name)?.get(),
        })?,
        Command::AddMaterial { user, title } => to_json(&Created {
            id: db.insert_material(UserId::new(user), &title)?.get(),
        })?,
        Command::AddCard {
            material,
            question,
            answer,
        } => to_json(&Created {
            id: db
                .insert_card(MaterialId::new(material), &question, &answer, now)?
                .get(),
        })?,
        Command::DeleteCard { card } => {
            let card = CardId::new(card);
            if !db.delete_card(card)? {
                return Err(ErrorReport::not_found(format!("card {card} not found.")));
            }
            to_json(&Created { id: card.get() })?
        }
        Command::Review { card, .. } => {
            let rating = rating.ok_or_else(|| ErrorReport::new("missing rating."))?;
            let outcome = ReviewRecorder::new(&db)
                .with_max_attempts(config.max_review_attempts)
                .record(CardId::new(card), rating, now)?;
            to_json(&outcome)?
        }
        Command::Due {
            user,
            material,
            limit,
        } => {
            let user = UserId::new(user);
            let scope = match material {
                Some(material) => {
                    let material = MaterialId::new(material);
                    if db.material_owner(material)? != Some(user) {
                        return Err(ErrorReport::not_found(format!(
                            "material {material} not found."
                        )));
                    }
                    Scope::Material { user, material }
                }
                None => Scope::User(user),
            };
            let due = db.due_cards(scope, today, limit.unwrap_or(config.due_limit))?;
            to_json(&due)?
        }
        Command::Stats { user } => to_json(&db.stats(UserId::new(user), today)?)?,
        Command::Streak { user } => to_json(&db.activity(UserId::new(user), today)?)?,
        Command::Weak { user, limit } => to_json(&db.weak_materials(
            UserId::new(user),
            today,
            limit.unwrap_or(config.weak_material_limit),
        )?)?,
        Command::Preview { card } => {
            let card = CardId::new(card);
            let current = db
                .load_schedule(card)?
                .ok_or_else(|| ErrorReport::not_found(format!("card {card} not found.")))?;
            let intervals = preview(current.schedule.sm2_state());
            let previews: Vec<RatingPreview> = Rating::ALL
                .into_iter()
                .zip(intervals)
                .map(|(rating, interval_days)| RatingPreview {
                    rating,
                    label: rating.label(),
                    description: rating.description(),
                    interval_days,
                })
                .collect();
            to_json(&previews)?
        }
    };
    Ok(json)
}

fn to_json<T: Serialize>(value: &T) -> Fallible<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
