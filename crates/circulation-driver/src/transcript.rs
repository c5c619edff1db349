//! Line transcripts of a run.
//!
//! The input log holds exactly what the simulator read, the output log
//! exactly what it printed. Both are flushed after every line so a killed
//! run still leaves a usable record for `check`.

use std::{
    io,
    path::{Path, PathBuf},
};

use tokio::{
    fs::{self, File},
    io::{AsyncWriteExt, BufWriter},
};

use crate::{config::TranscriptPaths, error::DriverError};

struct Log {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl Log {
    fn create(path: &Path) -> Result<Self, DriverError> {
        let file = std::fs::File::create(path).map_err(|source| transcript_error(path, source))?;
        Ok(Self { path: path.to_owned(), writer: BufWriter::new(File::from_std(file)) })
    }

    async fn append(&mut self, line: &str) -> Result<(), DriverError> {
        let Self { path, writer } = self;
        let written = async {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        };
        written.await.map_err(|source| transcript_error(path, source))
    }
}

/// Recorder for both directions of a run.
#[derive(Default)]
pub struct Transcript {
    input: Option<Log>,
    output: Option<Log>,
}

impl Transcript {
    /// Recorder that drops everything.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Create (truncating) whichever logs are configured.
    pub fn create(paths: &TranscriptPaths) -> Result<Self, DriverError> {
        Ok(Self {
            input: paths.input.as_deref().map(Log::create).transpose()?,
            output: paths.output.as_deref().map(Log::create).transpose()?,
        })
    }

    /// Record a line sent to the simulator.
    pub async fn record_input(&mut self, line: &str) -> Result<(), DriverError> {
        match self.input.as_mut() {
            Some(log) => log.append(line).await,
            None => Ok(()),
        }
    }

    /// Record a line received from the simulator.
    pub async fn record_output(&mut self, line: &str) -> Result<(), DriverError> {
        match self.output.as_mut() {
            Some(log) => log.append(line).await,
            None => Ok(()),
        }
    }
}

/// Read a transcript back, one entry per line.
pub async fn read_log(path: &Path) -> Result<Vec<String>, DriverError> {
    let text = fs::read_to_string(path).await.map_err(|source| transcript_error(path, source))?;
    Ok(text.lines().map(str::to_owned).collect())
}

fn transcript_error(path: &Path, source: io::Error) -> DriverError {
    DriverError::Transcript { path: path.to_owned(), source }
}
