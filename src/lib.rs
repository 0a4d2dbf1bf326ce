pub mod cli;
pub mod clock;
pub mod config;
pub mod database;
pub mod engine;
pub mod models;
pub mod preferences;
pub mod query;
pub mod stats;
pub mod store;
pub mod time;
pub mod users;
pub mod utils;
pub mod view;

pub use config::Config;
pub use database::Database;
pub use engine::{EngineError, EngineOptions, TaskEngine};
pub use models::{Task, TaskPriority, User, UserWithTasks};
pub use preferences::{PreferenceStore, Preferences};
pub use store::{EntityStore, StoreSnapshot};
pub use utils::Profile;
pub use view::TaskView;
