pub mod commands;
pub mod config;
pub mod events;
pub mod music;
pub mod store;
pub mod utils;

use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

pub struct Data {
    pub players: music::PlayerRegistry,
    pub store: store::Store,
    pub ytdlp: Arc<music::source::YtDlp>,
    pub progress_bars: Arc<music::progress::ProgressBars>,
    pub settings: music::PlayerSettings,
}
