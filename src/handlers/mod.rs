//! Command handler modules
//!
//! This module contains all command handler functions called from main.rs,
//! organized by functionality area.

pub mod cache;
pub mod coach;
pub mod config;
pub mod history;
pub mod onboarding;
pub mod session;
pub mod sync;
pub mod tracker;

// Re-export all public handler functions for convenient use
pub use cache::{handle_cache_clear_expired, handle_cache_get, handle_cache_set};
pub use coach::handle_coach;
pub use config::handle_config_interactive;
pub use history::{handle_history_clear, handle_history_last, handle_history_list};
pub use onboarding::{handle_init, is_initialized};
pub use session::Session;
pub use sync::{
    handle_clear, handle_connectivity, handle_prune, handle_queue, handle_retry, handle_status,
    handle_sync, handle_watch,
};
pub use tracker::{
    handle_meal_add, handle_meal_complete, handle_meal_delete, handle_meal_list, handle_mind,
    handle_stats, handle_water, handle_workout,
};
