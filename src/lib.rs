// Jupiter - Multi-track audio sequencer core
//
// Loads sound files as fragments on a timeline, plays them under a moving
// playhead and describes the arrangement to a drawing surface.

pub mod audio;
pub mod config;
pub mod fragment;
pub mod messaging;
pub mod playback;
pub mod render;
pub mod session;
pub mod timeline;
pub mod waveform;

// Re-export commonly used types for convenience
pub use audio::{AudioBackend, AudioDeviceError, CpalBackend, MemoryBackend, OutputFormat, OutputSink};
pub use config::{ConfigError, SequencerConfig};
pub use fragment::{Fragment, FragmentColor, FragmentId};
pub use messaging::{Notification, NotificationCategory, NotificationLevel, NotificationLog};
pub use playback::PlaybackVoice;
pub use render::{Canvas, DrawingSurface, RecordingSurface, SceneRenderer, render_scene};
pub use session::{ClickTarget, Command, OpenReport, Session, SessionError, TickReport};
pub use timeline::{Clock, ManualClock, SystemClock, Tempo, TimelineGeometry, Transport, TransportState};
pub use waveform::{DecodeError, SampleBuffer, WaveformCache};
