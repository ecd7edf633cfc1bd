//! Analog output seam between the coil driver and DAQ hardware

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("analog output task not initialized")]
    NotInitialized,

    #[error("waveform has {rows} rows for {channels} channels")]
    ChannelCount { channels: usize, rows: usize },

    #[error("device error: {0}")]
    Device(String),
}

/// A buffered analog output task, in the order a DAQ driver expects:
/// `init` configures channels and buffers the waveform, `run` starts
/// generation, `wait_until_done` blocks until the buffer is played out and
/// `stop` releases the task.
pub trait AnalogOutput {
    /// `waveform[i]` holds the samples for `channels[i]`
    fn init(&mut self, channels: &[String], waveform: &[Vec<f64>]) -> Result<(), OutputError>;
    fn run(&mut self) -> Result<(), OutputError>;
    fn wait_until_done(&mut self) -> Result<(), OutputError>;
    fn stop(&mut self) -> Result<(), OutputError>;
}

/// One completed write recorded by [`RecordingOutput`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedWrite {
    pub channels: Vec<String>,
    pub waveform: Vec<Vec<f64>>,
}

/// In-memory analog output that logs and keeps every write instead of
/// touching hardware.
#[derive(Debug, Default)]
pub struct RecordingOutput {
    pending: Option<RecordedWrite>,
    running: bool,
    writes: Vec<RecordedWrite>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes that were run to completion, oldest first
    pub fn writes(&self) -> &[RecordedWrite] {
        &self.writes
    }

    pub fn last_write(&self) -> Option<&RecordedWrite> {
        self.writes.last()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl AnalogOutput for RecordingOutput {
    fn init(&mut self, channels: &[String], waveform: &[Vec<f64>]) -> Result<(), OutputError> {
        if channels.len() != waveform.len() {
            return Err(OutputError::ChannelCount {
                channels: channels.len(),
                rows: waveform.len(),
            });
        }
        self.pending = Some(RecordedWrite {
            channels: channels.to_vec(),
            waveform: waveform.to_vec(),
        });
        Ok(())
    }

    fn run(&mut self) -> Result<(), OutputError> {
        let write = self.pending.as_ref().ok_or(OutputError::NotInitialized)?;
        for (channel, samples) in write.channels.iter().zip(&write.waveform) {
            tracing::info!("{} <- {:?} V", channel, samples);
        }
        self.running = true;
        Ok(())
    }

    fn wait_until_done(&mut self) -> Result<(), OutputError> {
        if !self.running {
            return Err(OutputError::NotInitialized);
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), OutputError> {
        if let Some(write) = self.pending.take() {
            if self.running {
                self.writes.push(write);
            }
        }
        self.running = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_requires_init() {
        let mut output = RecordingOutput::new();
        assert!(matches!(output.run(), Err(OutputError::NotInitialized)));
    }

    #[test]
    fn test_mismatched_waveform_rejected() {
        let mut output = RecordingOutput::new();
        let result = output.init(&["dev/ao0".to_string()], &[vec![1.0], vec![2.0]]);
        assert!(matches!(result, Err(OutputError::ChannelCount { channels: 1, rows: 2 })));
    }

    #[test]
    fn test_completed_write_is_recorded() {
        let mut output = RecordingOutput::new();
        output.init(&["dev/ao0".to_string()], &[vec![0.5, 0.5]]).unwrap();
        output.run().unwrap();
        assert!(output.is_running());
        output.wait_until_done().unwrap();
        output.stop().unwrap();
        assert!(!output.is_running());
        assert_eq!(output.writes().len(), 1);
        assert_eq!(output.last_write().unwrap().waveform, vec![vec![0.5, 0.5]]);
    }
}
