// Terminal front end
pub mod app;
pub mod args;
pub mod display;
pub mod prompt;
pub mod state;
pub mod ui;

pub use app::App;
pub use args::{Action, Cli};
pub use display::AgentResponseDisplay;
