pub mod components;
pub mod embed;
pub mod voice;
