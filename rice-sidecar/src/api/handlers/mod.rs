pub mod groups;
pub mod health;
pub mod recording;
pub mod settings;
