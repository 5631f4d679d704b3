pub mod play;
pub mod plot;
pub mod train;

pub use play::{InferenceSession, Notice, PlayConfig, PlayMode};
pub use plot::{PlotConfig, PlotMode};
pub use train::{TrainConfig, TrainMode};
