// Audio module - Output devices, PCM conversion and metering

pub mod device;
pub mod format_conversion;
pub mod metering;
pub mod output;
pub mod parameters;

pub use device::{AudioDeviceInfo, CpalBackend};
pub use output::{AudioBackend, AudioDeviceError, MemoryBackend, OutputFormat, OutputSink};
pub use parameters::AtomicF32;
