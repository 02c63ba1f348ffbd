// Audio device - CPAL output backend
//
// Every sink owns a dedicated "cpal-output" thread holding the stream, since a CPAL
// stream cannot cross threads on every host. The voice pushes i16 chunks into a
// lock-free ring and the device callback drains it frame by frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Host, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use super::format_conversion::write_pcm_frame;
use super::output::{AudioBackend, AudioDeviceError, OutputFormat, OutputSink};

/// Widest source layout a sink accepts
const MAX_SOURCE_CHANNELS: usize = 32;

/// How much audio the ring holds ahead of the device
const RING_DURATION: Duration = Duration::from_millis(50);

/// Sleep between attempts to push into a full ring
const POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Clone, Debug)]
pub struct AudioDeviceInfo {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// Process-wide handle on the sound card
///
/// Created once with [`CpalBackend::init`] and shared by every voice. After
/// [`CpalBackend::shutdown`] no new stream can be opened; streams already open keep
/// draining until their voice closes them.
pub struct CpalBackend {
    device_name: Option<String>,
    shut_down: AtomicBool,
}

impl CpalBackend {
    /// Check that an output device exists and return the shared backend
    pub fn init(device_name: Option<String>) -> Result<Arc<Self>, AudioDeviceError> {
        let host = cpal::default_host();
        let device = resolve_device(&host, device_name.as_deref())?;
        log::info!(
            "Audio output device: {}",
            device.name().unwrap_or_else(|_| "<unnamed>".to_string())
        );

        Ok(Arc::new(Self {
            device_name,
            shut_down: AtomicBool::new(false),
        }))
    }

    /// Output devices of the default host
    pub fn list_output_devices() -> Vec<AudioDeviceInfo> {
        let host = cpal::default_host();
        let default_name = host
            .default_output_device()
            .and_then(|d| d.name().ok())
            .unwrap_or_default();

        let mut devices = Vec::new();
        if let Ok(output_devices) = host.output_devices() {
            for (index, device) in output_devices.enumerate() {
                if let Ok(name) = device.name() {
                    devices.push(AudioDeviceInfo {
                        id: format!("audio_out_{}", index),
                        is_default: name == default_name,
                        name,
                    });
                }
            }
        }
        devices
    }

    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    pub fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::SeqCst) {
            log::info!("Audio backend shut down");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

impl AudioBackend for CpalBackend {
    fn open(&self, format: OutputFormat) -> Result<Box<dyn OutputSink>, AudioDeviceError> {
        if self.is_shut_down() {
            return Err(AudioDeviceError::ShutDown);
        }
        if format.channels == 0 || format.channels as usize > MAX_SOURCE_CHANNELS {
            return Err(AudioDeviceError::UnsupportedFormat(format!(
                "{} channels",
                format.channels
            )));
        }
        if format.sample_width != 2 {
            return Err(AudioDeviceError::UnsupportedFormat(format!(
                "{}-byte samples",
                format.sample_width
            )));
        }

        let capacity = ring_capacity(format);
        let (producer, consumer) = HeapRb::<i16>::new(capacity).split();
        let failed = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel();
        let (close_tx, close_rx) = mpsc::channel();

        let device_name = self.device_name.clone();
        let stream_failed = Arc::clone(&failed);
        let thread = thread::Builder::new()
            .name("cpal-output".to_string())
            .spawn(move || {
                run_stream_thread(
                    device_name,
                    format,
                    consumer,
                    stream_failed,
                    ready_tx,
                    close_rx,
                )
            })
            .map_err(|e| AudioDeviceError::StreamOpen(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(AudioDeviceError::StreamOpen(
                    "output thread exited before the stream started".to_string(),
                ));
            }
        }

        log::debug!(
            "Opened output stream: {} ch @ {} Hz, ring of {} samples",
            format.channels,
            format.frame_rate,
            capacity
        );

        Ok(Box::new(CpalSink {
            producer,
            failed,
            close_tx: Some(close_tx),
            thread: Some(thread),
        }))
    }
}

fn ring_capacity(format: OutputFormat) -> usize {
    let samples_per_second = format.frame_rate as usize * format.channels as usize;
    let samples = samples_per_second * RING_DURATION.as_millis() as usize / 1000;
    samples.max(1024)
}

fn resolve_device(host: &Host, device_name: Option<&str>) -> Result<Device, AudioDeviceError> {
    match device_name {
        Some(wanted) => host
            .output_devices()
            .map_err(|e| AudioDeviceError::StreamOpen(e.to_string()))?
            .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
            .ok_or_else(|| AudioDeviceError::DeviceNotFound(wanted.to_string())),
        None => host.default_output_device().ok_or(AudioDeviceError::NoDevice),
    }
}

/// Pick a device configuration running at the source frame rate
///
/// The stream is never resampled. A configuration with the source channel count is
/// preferred; otherwise channels are mapped by `write_pcm_frame`.
fn select_config(
    device: &Device,
    format: OutputFormat,
) -> Result<(StreamConfig, SampleFormat), AudioDeviceError> {
    let rate = cpal::SampleRate(format.frame_rate);
    let usable = |f: SampleFormat| matches!(f, SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16);

    let ranges: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioDeviceError::UnsupportedFormat(e.to_string()))?
        .filter(|r| usable(r.sample_format()))
        .filter(|r| r.min_sample_rate() <= rate && rate <= r.max_sample_rate())
        .collect();

    let chosen = ranges
        .iter()
        .find(|r| r.channels() == format.channels)
        .or_else(|| ranges.first())
        .cloned()
        .ok_or_else(|| {
            AudioDeviceError::UnsupportedFormat(format!(
                "no output configuration at {} Hz",
                format.frame_rate
            ))
        })?;

    let supported = chosen.with_sample_rate(rate);
    let sample_format = supported.sample_format();
    Ok((supported.config(), sample_format))
}

fn run_stream_thread(
    device_name: Option<String>,
    format: OutputFormat,
    consumer: HeapCons<i16>,
    failed: Arc<AtomicBool>,
    ready_tx: Sender<Result<(), AudioDeviceError>>,
    close_rx: Receiver<()>,
) {
    let stream = match open_stream(device_name.as_deref(), format, consumer, failed) {
        Ok(stream) => stream,
        Err(e) => {
            log::error!("Failed to open output stream: {}", e);
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if ready_tx.send(Ok(())).is_err() {
        return;
    }

    // Either an explicit close or the sink being dropped ends the stream
    let _ = close_rx.recv();
    drop(stream);
}

fn open_stream(
    device_name: Option<&str>,
    format: OutputFormat,
    consumer: HeapCons<i16>,
    failed: Arc<AtomicBool>,
) -> Result<Stream, AudioDeviceError> {
    let host = cpal::default_host();
    let device = resolve_device(&host, device_name)?;
    let (config, sample_format) = select_config(&device, format)?;
    let source_channels = format.channels as usize;

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, source_channels, consumer, failed),
        SampleFormat::I16 => build_stream::<i16>(&device, &config, source_channels, consumer, failed),
        SampleFormat::U16 => build_stream::<u16>(&device, &config, source_channels, consumer, failed),
        other => Err(AudioDeviceError::UnsupportedFormat(format!(
            "sample format {:?}",
            other
        ))),
    }?;

    stream
        .play()
        .map_err(|e| AudioDeviceError::StreamOpen(e.to_string()))?;
    Ok(stream)
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    source_channels: usize,
    mut consumer: HeapCons<i16>,
    failed: Arc<AtomicBool>,
) -> Result<Stream, AudioDeviceError>
where
    T: SizedSample + FromSample<f32>,
{
    let device_channels = config.channels as usize;
    let mut frame = [0i16; MAX_SOURCE_CHANNELS];

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                // No allocations, no locks: whole frames only, silence on underrun
                let source = &mut frame[..source_channels];
                for out in data.chunks_mut(device_channels) {
                    if consumer.occupied_len() >= source_channels {
                        consumer.pop_slice(source);
                        write_pcm_frame(source, out);
                    } else {
                        write_pcm_frame::<T>(&[], out);
                    }
                }
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
                failed.store(true, Ordering::Relaxed);
            },
            None,
        )
        .map_err(|e| AudioDeviceError::StreamOpen(e.to_string()))
}

struct CpalSink {
    producer: HeapProd<i16>,
    failed: Arc<AtomicBool>,
    close_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl OutputSink for CpalSink {
    fn write(&mut self, samples: &[i16]) -> Result<(), AudioDeviceError> {
        if self.close_tx.is_none() {
            return Err(AudioDeviceError::Stream("sink closed".to_string()));
        }

        let mut offset = 0;
        while offset < samples.len() {
            if self.failed.load(Ordering::Relaxed) {
                return Err(AudioDeviceError::Stream(
                    "device reported an error".to_string(),
                ));
            }
            let pushed = self.producer.push_slice(&samples[offset..]);
            offset += pushed;
            if pushed == 0 {
                thread::sleep(POLL_INTERVAL);
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        self.release(true);
    }

    fn abort(&mut self) {
        self.release(false);
    }
}

impl CpalSink {
    /// Stop the stream thread, optionally letting the ring play out first
    fn release(&mut self, drain: bool) {
        let Some(close_tx) = self.close_tx.take() else {
            return;
        };

        if drain {
            let deadline = Instant::now() + RING_DURATION * 4;
            while !self.producer.is_empty()
                && !self.failed.load(Ordering::Relaxed)
                && Instant::now() < deadline
            {
                thread::sleep(POLL_INTERVAL);
            }
        }

        let _ = close_tx.send(());
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            log::error!("Output stream thread panicked");
        }
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.abort();
    }
}
