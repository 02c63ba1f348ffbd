// Timeline module - Geometry, tempo and transport

pub mod geometry;
pub mod tempo;
pub mod transport;

pub use geometry::{GeometryError, TimelineGeometry, format_play_position};
pub use tempo::Tempo;
pub use transport::{Clock, ManualClock, SystemClock, Transport, TransportState};
