// Playback module - One output voice per fragment

pub mod voice;

pub use voice::PlaybackVoice;
