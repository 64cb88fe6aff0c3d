//! Daily tracking command handlers
//!
//! Water, meals, workouts and mindfulness minutes. Each action lands in the
//! local store first and is queued for the remote.

use anyhow::Result;
use colored::Colorize;

use super::session::Session;
use crate::store::Partition;
use crate::tracker::{DailyTracker, Meal, MealType, UserStats};

fn hydration_bar(stats: &UserStats) -> String {
    const WIDTH: usize = 20;
    let filled = usize::from(stats.hydration_percentage()) * WIDTH / 100;
    format!(
        "[{}{}] {}%",
        "█".repeat(filled).blue(),
        "░".repeat(WIDTH - filled).dimmed(),
        stats.hydration_percentage()
    )
}

fn print_stats(stats: &UserStats) {
    println!("  {} {} kcal", "Calories burned:".bold(), stats.calories);
    println!("  {} {} min", "Activity:".bold(), stats.activity_min);
    println!("  {} {} min", "Mindfulness:".bold(), stats.mind_min);
    println!(
        "  {} {:.2} / {:.2} L {}",
        "Hydration:".bold(),
        stats.hydration_current,
        stats.hydration_goal,
        hydration_bar(stats)
    );
}

/// Log water; the total is capped at the daily goal
pub fn handle_water(liters: f64) -> Result<()> {
    let session = Session::open()?;
    let goal = session.settings.hydration_goal_liters;
    {
        let mut service = session.lock()?;
        let mut tracker = DailyTracker::new(&mut service, goal);
        let stats = tracker.add_water(liters)?;

        println!(
            "{} {:.2} L of {:.2} L {}",
            "💧".blue(),
            stats.hydration_current,
            stats.hydration_goal,
            hydration_bar(&stats)
        );
        if stats.hydration_goal_reached() {
            println!("{}", "Daily hydration goal reached!".green().bold());
        }
    }
    session.finish()
}

pub fn handle_meal_add(name: &str, calories: u32, meal_type: MealType, time: &str) -> Result<()> {
    let session = Session::open()?;
    let goal = session.settings.hydration_goal_liters;
    {
        let mut service = session.lock()?;
        let meal = DailyTracker::new(&mut service, goal).log_meal(name, calories, meal_type, time)?;
        println!(
            "{} Added {} ({} kcal) {}",
            "✓".green(),
            meal.name.bold(),
            meal.calories,
            meal.id.dimmed()
        );
    }
    session.finish()
}

pub fn handle_meal_complete(id: &str, completed: bool) -> Result<()> {
    let session = Session::open()?;
    let goal = session.settings.hydration_goal_liters;
    {
        let mut service = session.lock()?;
        let meal = DailyTracker::new(&mut service, goal).set_meal_completed(id, completed)?;
        let state = if meal.completed { "eaten" } else { "not eaten" };
        println!("{} {} marked {}", "✓".green(), meal.name.bold(), state);
    }
    session.finish()
}

pub fn handle_meal_delete(id: &str) -> Result<()> {
    let session = Session::open()?;
    let goal = session.settings.hydration_goal_liters;
    {
        let mut service = session.lock()?;
        if DailyTracker::new(&mut service, goal).delete_meal(id)? {
            println!("{} Deleted meal {}", "✓".green(), id);
        } else {
            println!("{}", format!("No meal with id {id}").yellow());
        }
    }
    session.finish()
}

pub fn handle_meal_list() -> Result<()> {
    let session = Session::open()?;
    {
        let service = session.lock()?;
        let meals: Vec<Meal> = service.store().get_all_local(Partition::Meals)?;

        if meals.is_empty() {
            println!("{}", "No meals logged.".yellow());
        }
        for meal in &meals {
            let mark = if meal.completed { "✓".green() } else { "·".dimmed() };
            println!(
                "{} {} {} ({} kcal) {}",
                mark,
                meal.time,
                meal.name.bold(),
                meal.calories,
                meal.id.dimmed()
            );
        }
    }
    session.finish()
}

pub fn handle_workout(exercise: &str, minutes: u32, calories: u32) -> Result<()> {
    let session = Session::open()?;
    let goal = session.settings.hydration_goal_liters;
    {
        let mut service = session.lock()?;
        let workout = DailyTracker::new(&mut service, goal).log_workout(exercise, minutes, calories)?;
        println!(
            "{} {} for {} min, {} kcal",
            "💪".green(),
            workout.exercise_name.bold(),
            workout.duration_minutes,
            workout.calories_burned
        );
    }
    session.finish()
}

pub fn handle_mind(minutes: u32) -> Result<()> {
    let session = Session::open()?;
    let goal = session.settings.hydration_goal_liters;
    {
        let mut service = session.lock()?;
        let stats = DailyTracker::new(&mut service, goal).log_mind_minutes(minutes)?;
        println!("{} {} mindfulness minutes today", "🧘".cyan(), stats.mind_min);
    }
    session.finish()
}

/// Show today's stats
pub fn handle_stats(json: bool) -> Result<()> {
    let session = Session::open()?;
    let goal = session.settings.hydration_goal_liters;
    {
        let mut service = session.lock()?;
        let stats = DailyTracker::new(&mut service, goal).stats()?;

        if json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("{}", "Today".cyan().bold());
            println!("{}", "=".repeat(40).cyan());
            print_stats(&stats);
        }
    }
    session.finish()
}
