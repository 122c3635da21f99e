pub mod commands;
pub mod config;
pub mod session;
pub mod store;
pub mod view;

pub use commands::CommandStack;
pub use config::EditorConfig;
pub use session::{DesignSession, RegenerationRequest};
pub use store::{DesignMutation, DesignStore, ElementPatch};
pub use view::MarkerView;
