// Calc Records - Core Library
// Arithmetic calculation records tied to users, persisted in SQLite

pub mod calculation;
pub mod db;
pub mod user;

// Re-export commonly used types
pub use calculation::{Calculation, CalculationError, CalculationKind};
pub use db::{
    count_calculations, count_calculations_for_user, count_users, delete_user, get_calculation,
    get_calculations_for_user, get_user, insert_calculation, insert_user, setup_database,
    touch_calculation,
};
pub use user::User;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
