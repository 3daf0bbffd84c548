//! Append-only CSV record store.
//!
//! The file holds a `x,y` header followed by one `elapsed_seconds,phase` row
//! per recorded sample. A viewer may read the file while it is being written,
//! so every append is a single write of a whole row followed by a flush.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, SamplerError};
use crate::phase::SignalPhase;

/// Header row of the record store.
pub const HEADER: &str = "x,y";

/// One observation of the target signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Seconds since simulated midnight when the state was read.
    pub elapsed_seconds: u32,
    pub phase: SignalPhase,
}

impl Sample {
    fn to_row(self) -> String {
        format!("{},{}\n", self.elapsed_seconds, self.phase.ordinal())
    }
}

/// Writer side of the record store.
#[derive(Debug)]
pub struct SampleRecorder {
    path: PathBuf,
    rows_written: u64,
}

impl SampleRecorder {
    /// Creates or truncates the store at `path` and writes the header.
    pub fn initialize(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let store_err = |source| SamplerError::StoreWriteFailure {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(store_err)?;
        }

        let mut file = File::create(&path).map_err(store_err)?;
        file.write_all(format!("{HEADER}\n").as_bytes())
            .and_then(|()| file.flush())
            .map_err(store_err)?;

        tracing::debug!("Initialized record store at {}", path.display());

        Ok(Self {
            path,
            rows_written: 0,
        })
    }

    /// Appends one row.
    ///
    /// The file is opened and closed on every call, so an unclean exit loses
    /// at most the row in flight.
    pub fn append(&mut self, sample: Sample) -> Result<()> {
        let row = sample.to_row();

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|source| self.write_failure(source))?;

        file.write_all(row.as_bytes())
            .and_then(|()| file.flush())
            .and_then(|()| file.sync_data())
            .map_err(|source| self.write_failure(source))?;

        self.rows_written += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows appended since [`SampleRecorder::initialize`].
    pub const fn rows_written(&self) -> u64 {
        self.rows_written
    }

    fn write_failure(&self, source: std::io::Error) -> SamplerError {
        SamplerError::StoreWriteFailure {
            path: self.path.clone(),
            source,
        }
    }
}

/// Reads every sample from the store at `path`.
///
/// A trailing line without a newline is treated as an in-flight write and
/// ignored; any other malformed line is an error.
pub fn read_samples(path: impl AsRef<Path>) -> Result<Vec<Sample>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| SamplerError::StoreWriteFailure {
        path: path.to_path_buf(),
        source,
    })?;

    let corrupt = |line: usize, reason: String| SamplerError::CorruptStore {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let complete = contents
        .rsplit_once('\n')
        .map_or("", |(complete, _partial)| complete);

    let mut lines = complete.lines().enumerate();
    match lines.next() {
        Some((_, HEADER)) => {}
        Some((_, other)) => return Err(corrupt(1, format!("expected header `{HEADER}`, found `{other}`"))),
        None => return Ok(Vec::new()),
    }

    lines
        .map(|(idx, line)| parse_row(line).map_err(|reason| corrupt(idx + 1, reason)))
        .collect()
}

fn parse_row(line: &str) -> std::result::Result<Sample, String> {
    let (x, y) = line
        .split_once(',')
        .ok_or_else(|| format!("expected two fields, found `{line}`"))?;

    let elapsed_seconds = x
        .parse::<u32>()
        .map_err(|e| format!("bad elapsed seconds `{x}`: {e}"))?;
    let phase = y
        .parse::<u8>()
        .ok()
        .and_then(SignalPhase::from_ordinal)
        .ok_or_else(|| format!("bad phase `{y}`"))?;

    Ok(Sample {
        elapsed_seconds,
        phase,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample(elapsed_seconds: u32, phase: SignalPhase) -> Sample {
        Sample {
            elapsed_seconds,
            phase,
        }
    }

    #[test]
    fn initialize_writes_single_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");

        let recorder = SampleRecorder::initialize(&path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "x,y\n");
        assert_eq!(recorder.rows_written(), 0);
    }

    #[test]
    fn initialize_truncates_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "x,y\n0,1\n3,2\n").unwrap();

        SampleRecorder::initialize(&path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "x,y\n");
    }

    #[test]
    fn initialize_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/data.csv");

        SampleRecorder::initialize(&path).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn append_never_rewrites_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut recorder = SampleRecorder::initialize(&path).unwrap();

        recorder.append(sample(0, SignalPhase::Green)).unwrap();
        recorder.append(sample(3, SignalPhase::Red)).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "x,y\n0,1\n3,2\n");
        assert_eq!(contents.matches(HEADER).count(), 1);
        assert_eq!(recorder.rows_written(), 2);
    }

    #[test]
    fn reader_sees_only_whole_rows_after_each_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut recorder = SampleRecorder::initialize(&path).unwrap();

        for tick in 0..20u32 {
            let phase = if tick % 3 == 0 {
                SignalPhase::Red
            } else {
                SignalPhase::Green
            };
            recorder.append(sample(tick * 3, phase)).unwrap();

            let raw = fs::read_to_string(&path).unwrap();
            assert!(raw.ends_with('\n'), "row left unterminated: {raw:?}");
            for line in raw.lines().skip(1) {
                let fields: Vec<&str> = line.split(',').collect();
                assert_eq!(fields.len(), 2, "malformed row {line:?}");
                assert!(fields.iter().all(|f| !f.is_empty()), "empty field in {line:?}");
            }

            let samples = read_samples(&path).unwrap();
            assert_eq!(samples.len(), tick as usize + 1);
            assert_eq!(samples.last(), Some(&sample(tick * 3, phase)));
        }
    }

    #[test]
    fn append_to_removed_store_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut recorder = SampleRecorder::initialize(&path).unwrap();
        fs::remove_file(&path).unwrap();

        let err = recorder.append(sample(0, SignalPhase::Green)).unwrap_err();

        assert!(matches!(err, SamplerError::StoreWriteFailure { .. }));
        assert_eq!(recorder.rows_written(), 0);
    }

    #[test]
    fn read_treats_unterminated_header_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "x,y").unwrap();

        assert_eq!(read_samples(&path).unwrap(), Vec::new());
    }

    #[test]
    fn read_ignores_partial_trailing_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "x,y\n0,1\n3,").unwrap();

        let samples = read_samples(&path).unwrap();

        assert_eq!(samples, vec![sample(0, SignalPhase::Green)]);
    }

    #[test]
    fn read_rejects_bad_phase() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "x,y\n0,1\n3,9\n").unwrap();

        let err = read_samples(&path).unwrap_err();

        assert!(
            matches!(err, SamplerError::CorruptStore { line: 3, .. }),
            "unexpected error: {err}"
        );
    }
}
