//! Daily stats and the user actions that feed the sync queue.
//!
//! Every action writes the local store first and then queues the matching
//! remote mutation, so the result is visible immediately even while offline.

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::queue::{OperationType, SyncService};
use crate::store::Partition;

/// Remote table for daily stats upserts
pub const STATS_TABLE: &str = "user_stats";
/// Remote table for individual water logs
pub const HYDRATION_TABLE: &str = "hydration_logs";
pub const MEALS_TABLE: &str = "meals";
pub const WORKOUTS_TABLE: &str = "workouts";

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Today's counters for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    /// Calories burned
    pub calories: u32,
    pub activity_min: u32,
    pub mind_min: u32,
    /// Liters
    pub hydration_current: f64,
    /// Liters
    pub hydration_goal: f64,
}

impl UserStats {
    pub fn with_goal(hydration_goal: f64) -> Self {
        Self {
            calories: 0,
            activity_min: 0,
            mind_min: 0,
            hydration_current: 0.0,
            hydration_goal,
        }
    }

    /// Add `amount` liters, rounded to centiliters and clamped to `[0, goal]`
    ///
    /// Returns the new current intake. Non-finite amounts are ignored.
    pub fn update_hydration(&mut self, amount: f64) -> f64 {
        if !amount.is_finite() {
            return self.hydration_current;
        }

        let next = round2(self.hydration_current + amount);
        self.hydration_current = next.clamp(0.0, self.hydration_goal.max(0.0));
        self.hydration_current
    }

    /// Progress towards the hydration goal, capped at 100
    pub fn hydration_percentage(&self) -> u8 {
        if self.hydration_goal <= 0.0 {
            return 0;
        }
        let pct = (self.hydration_current / self.hydration_goal * 100.0).round();
        pct.clamp(0.0, 100.0) as u8
    }

    pub fn hydration_goal_reached(&self) -> bool {
        self.hydration_current >= self.hydration_goal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl std::str::FromStr for MealType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snack" => Ok(MealType::Snack),
            other => bail!("Unknown meal type '{other}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub id: String,
    pub name: String,
    pub calories: u32,
    pub completed: bool,
    #[serde(rename = "type")]
    pub meal_type: MealType,
    /// `HH:MM`
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydrationLog {
    pub id: String,
    pub amount_liters: f64,
    pub date: NaiveDate,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutLog {
    pub id: String,
    pub exercise_name: String,
    pub duration_minutes: u32,
    pub calories_burned: u32,
    pub date: NaiveDate,
}

/// User actions for a single day
pub struct DailyTracker<'a> {
    sync: &'a mut SyncService,
    hydration_goal: f64,
    date: NaiveDate,
}

impl<'a> DailyTracker<'a> {
    pub fn new(sync: &'a mut SyncService, hydration_goal: f64) -> Self {
        Self::for_date(sync, hydration_goal, Local::now().date_naive())
    }

    pub fn for_date(sync: &'a mut SyncService, hydration_goal: f64, date: NaiveDate) -> Self {
        Self {
            sync,
            hydration_goal,
            date,
        }
    }

    fn stats_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Stats for the tracked day, fresh ones if nothing was logged yet
    pub fn stats(&self) -> Result<UserStats> {
        let stats = self
            .sync
            .store()
            .get_local::<UserStats>(Partition::UserStats, &self.stats_key())?;
        Ok(stats.unwrap_or_else(|| UserStats::with_goal(self.hydration_goal)))
    }

    fn save_stats(&mut self, stats: &UserStats) -> Result<()> {
        let key = self.stats_key();
        self.sync
            .store()
            .save_local(Partition::UserStats, &key, stats)
            .context("Failed to save daily stats")?;

        self.sync.queue_operation(
            OperationType::Update,
            STATS_TABLE,
            json!({
                "id": key,
                "calories": stats.calories,
                "activity_min": stats.activity_min,
                "mind_min": stats.mind_min,
                "hydration_current": stats.hydration_current,
                "hydration_goal": stats.hydration_goal,
                "updated_at": chrono::Utc::now(),
            }),
        )?;
        Ok(())
    }

    /// Log water intake; the daily total never exceeds the goal
    pub fn add_water(&mut self, liters: f64) -> Result<UserStats> {
        let mut stats = self.stats()?;
        stats.update_hydration(liters);
        self.save_stats(&stats)?;

        let log = HydrationLog {
            id: uuid::Uuid::new_v4().to_string(),
            amount_liters: liters,
            date: self.date,
            time: Local::now().format("%H:%M").to_string(),
        };
        self.sync
            .store()
            .save_local(Partition::Hydration, &log.id, &log)?;
        self.sync.queue_operation(
            OperationType::Create,
            HYDRATION_TABLE,
            json!({
                "id": log.id,
                "amount_liters": log.amount_liters,
                "date": log.date,
                "time": log.time,
            }),
        )?;

        Ok(stats)
    }

    pub fn log_meal(&mut self, name: &str, calories: u32, meal_type: MealType, time: &str) -> Result<Meal> {
        if name.trim().is_empty() {
            bail!("meal name cannot be empty");
        }

        let meal = Meal {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            calories,
            completed: false,
            meal_type,
            time: time.to_string(),
        };

        self.sync.store().save_local(Partition::Meals, &meal.id, &meal)?;
        self.sync
            .queue_operation(OperationType::Create, MEALS_TABLE, serde_json::to_value(&meal)?)?;
        Ok(meal)
    }

    pub fn set_meal_completed(&mut self, id: &str, completed: bool) -> Result<Meal> {
        let Some(mut meal) = self.sync.store().get_local::<Meal>(Partition::Meals, id)? else {
            bail!("No meal with id {id}");
        };

        meal.completed = completed;
        self.sync.store().save_local(Partition::Meals, id, &meal)?;
        self.sync
            .queue_operation(OperationType::Update, MEALS_TABLE, serde_json::to_value(&meal)?)?;
        Ok(meal)
    }

    pub fn delete_meal(&mut self, id: &str) -> Result<bool> {
        if !self.sync.store().delete_local(Partition::Meals, id)? {
            return Ok(false);
        }
        self.sync
            .queue_operation(OperationType::Delete, MEALS_TABLE, json!({ "id": id }))?;
        Ok(true)
    }

    /// Log a finished workout and add it to today's activity
    pub fn log_workout(&mut self, exercise_name: &str, minutes: u32, calories_burned: u32) -> Result<WorkoutLog> {
        if exercise_name.trim().is_empty() {
            bail!("exercise name cannot be empty");
        }

        let workout = WorkoutLog {
            id: uuid::Uuid::new_v4().to_string(),
            exercise_name: exercise_name.trim().to_string(),
            duration_minutes: minutes,
            calories_burned,
            date: self.date,
        };
        self.sync
            .store()
            .save_local(Partition::Workouts, &workout.id, &workout)?;
        self.sync.queue_operation(
            OperationType::Create,
            WORKOUTS_TABLE,
            json!({
                "id": workout.id,
                "exercise_name": workout.exercise_name,
                "duration_minutes": workout.duration_minutes,
                "calories_burned": workout.calories_burned,
                "date": workout.date,
            }),
        )?;

        let mut stats = self.stats()?;
        stats.activity_min = stats.activity_min.saturating_add(minutes);
        stats.calories = stats.calories.saturating_add(calories_burned);
        self.save_stats(&stats)?;

        Ok(workout)
    }

    /// Add mindfulness minutes to today's stats
    pub fn log_mind_minutes(&mut self, minutes: u32) -> Result<UserStats> {
        let mut stats = self.stats()?;
        stats.mind_min = stats.mind_min.saturating_add(minutes);
        self.save_stats(&stats)?;
        Ok(stats)
    }
}
