// Player settings
// JSON file in the host application's data directory

mod settings;

pub use settings::{OutputSettings, PlaybackSettings, PlayerSettings};
