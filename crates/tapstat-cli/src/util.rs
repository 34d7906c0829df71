use std::{
    fs::{self, File},
    io::{self, BufWriter, StdoutLock, Write as _},
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use tapstat_analysis::subject::{Cohort, Subject};
use tapstat_records::{
    frame::Frame,
    predicate::PredicateOptions,
    table::RecordTable,
};

#[derive(Debug)]
pub enum Output {
    Stdout {
        writer: StdoutLock<'static>,
    },
    File {
        writer: BufWriter<File>,
        path: PathBuf,
    },
}

impl Output {
    pub fn save_json<T>(value: &T, output_path: Option<&Path>) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        let mut output = Output::from_output_path(output_path)?;
        output.write_json(value)
    }

    pub fn from_output_path(output_path: Option<&Path>) -> anyhow::Result<Self> {
        match output_path {
            Some(path) => Output::open(path.to_owned()),
            None => Ok(Output::stdout()),
        }
    }

    pub fn stdout() -> Self {
        Output::Stdout {
            writer: io::stdout().lock(),
        }
    }

    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Output::File {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub fn display_path(&self) -> String {
        match self {
            Output::Stdout { .. } => "stdout".to_string(),
            Output::File { path, .. } => path.display().to_string(),
        }
    }

    pub fn write_json<T>(&mut self, value: T) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        serde_json::to_writer_pretty(&mut *self, &value)
            .with_context(|| format!("Failed to write JSON to {}", self.display_path()))?;
        writeln!(&mut *self).with_context(|| {
            format!(
                "Failed to write newline after JSON to {}",
                self.display_path()
            )
        })?;
        self.flush()
            .with_context(|| format!("Failed to flush output to {}", self.display_path()))?;
        if let Output::File { path, .. } = self {
            log::info!("Wrote {}", path.display());
        }
        Ok(())
    }
}

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout { writer } => writer.write(buf),
            Output::File { writer, .. } => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout { writer } => writer.flush(),
            Output::File { writer, .. } => writer.flush(),
        }
    }
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;

    let reader = io::BufReader::new(file);
    let value = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse {} JSON file: {}",
            file_kind,
            path.display()
        )
    })?;

    Ok(value)
}

/// Read a CSV file into a frame, inferring cell types
///
/// Short rows are padded with missing cells.
pub fn read_csv_frame<P>(file_kind: &str, path: P) -> anyhow::Result<Frame>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;
    let header = reader
        .headers()
        .with_context(|| format!("Failed to read {} header: {}", file_kind, path.display()))?
        .iter()
        .map(str::to_owned)
        .collect::<Vec<_>>();
    let mut rows = vec![];
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| {
            format!("Failed to parse {} row {} in {}", file_kind, idx + 1, path.display())
        })?;
        rows.push(record.iter().map(str::to_owned).collect::<Vec<_>>());
    }
    let frame = Frame::from_text_rows(&header, rows)
        .with_context(|| format!("Invalid {} file: {}", file_kind, path.display()))?;
    log::debug!("Read {} {} rows from {}", frame.len(), file_kind, path.display());
    Ok(frame)
}

/// Overwrite a CSV file with a frame, keeping its column order
///
/// The frame is written to a sibling temporary file first and renamed over
/// `path`, so the original file is left untouched if writing fails.
pub fn write_csv_frame<P>(frame: &Frame, path: P) -> anyhow::Result<()>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let staged = stage_csv_frame(frame, path)?;
    let result = replace_file(&staged, path);
    if result.is_err() {
        let _ = fs::remove_file(&staged);
    }
    result
}

/// `path` with `suffix` appended to its file name.
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_owned();
    name.push(suffix);
    path.with_file_name(name)
}

/// Writes `frame` to a temporary sibling of `path` and returns its path.
///
/// Nothing is left behind on failure.
fn stage_csv_frame(frame: &Frame, path: &Path) -> anyhow::Result<PathBuf> {
    let staged = sibling_path(path, ".tmp");
    if let Err(e) = write_csv_to(frame, &staged) {
        let _ = fs::remove_file(&staged);
        return Err(e);
    }
    Ok(staged)
}

fn replace_file(staged: &Path, path: &Path) -> anyhow::Result<()> {
    fs::rename(staged, path).with_context(|| {
        format!(
            "Failed to replace {} with {}",
            path.display(),
            staged.display()
        )
    })
}

fn write_csv_to(frame: &Frame, path: &Path) -> anyhow::Result<()> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer
        .write_record(frame.names())
        .with_context(|| format!("Failed to write header to {}", path.display()))?;
    for row in 0..frame.len() {
        writer
            .write_record(frame.row(row).map(|(_, value)| value.to_string()))
            .with_context(|| format!("Failed to write row {} to {}", row + 1, path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}

/// A subject given on the command line as `NAME=TRIALS.csv,SESSIONS.csv[,LAST_SESSION]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectSource {
    pub name: String,
    pub trials: PathBuf,
    pub sessions: PathBuf,
    /// Sessions after this one are dropped on load.
    pub last_session: Option<i64>,
}

impl FromStr for SubjectSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("expected NAME=TRIALS.csv,SESSIONS.csv[,LAST_SESSION], got `{s}`");
        let (name, files) = s.split_once('=').ok_or_else(invalid)?;
        let mut parts = files.split(',');
        let (Some(trials), Some(sessions)) = (parts.next(), parts.next()) else {
            return Err(invalid());
        };
        let last_session = parts
            .next()
            .map(|n| n.trim().parse::<i64>().map_err(|e| format!("invalid last session `{n}`: {e}")))
            .transpose()?;
        if name.is_empty() || trials.is_empty() || sessions.is_empty() || parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self {
            name: name.to_owned(),
            trials: PathBuf::from(trials),
            sessions: PathBuf::from(sessions),
            last_session,
        })
    }
}

impl SubjectSource {
    pub fn load(&self, options: &PredicateOptions) -> anyhow::Result<Subject> {
        let trials = read_csv_frame("trials", &self.trials)?;
        let sessions = read_csv_frame("sessions", &self.sessions)?;
        let mut table = RecordTable::new(trials, sessions)
            .with_context(|| format!("Failed to index records of subject '{}'", self.name))?
            .with_predicate_options(options.clone());
        if let Some(last) = self.last_session {
            table
                .drop_after(last)
                .with_context(|| format!("Failed to drop sessions of subject '{}'", self.name))?;
        }
        log::info!(
            "Loaded subject '{}': {} sessions, {} trials",
            self.name,
            table.session_count(),
            table.len()
        );
        Ok(Subject::new(self.name.clone(), table))
    }

    /// Overwrite this subject's CSV files with the table's current contents
    ///
    /// Both files are staged before either is replaced. If the sessions file
    /// cannot be replaced, the trials file is restored, so a failed save
    /// leaves both files as they were.
    pub fn save(&self, table: &RecordTable) -> anyhow::Result<()> {
        let staged_trials = stage_csv_frame(table.trials(), &self.trials)?;
        let staged_sessions = match stage_csv_frame(table.sessions(), &self.sessions) {
            Ok(staged) => staged,
            Err(e) => {
                let _ = fs::remove_file(&staged_trials);
                return Err(e);
            }
        };
        let result = self.commit(&staged_trials, &staged_sessions);
        let _ = fs::remove_file(&staged_trials);
        let _ = fs::remove_file(&staged_sessions);
        result?;
        log::info!(
            "Saved subject '{}' to {} and {}",
            self.name,
            self.trials.display(),
            self.sessions.display()
        );
        Ok(())
    }

    fn commit(&self, staged_trials: &Path, staged_sessions: &Path) -> anyhow::Result<()> {
        let backup = self.trials.exists().then(|| sibling_path(&self.trials, ".bak"));
        if let Some(backup) = &backup
            && let Err(e) = fs::copy(&self.trials, backup)
        {
            let _ = fs::remove_file(backup);
            return Err(e)
                .with_context(|| format!("Failed to back up {}", self.trials.display()));
        }
        let result = replace_file(staged_trials, &self.trials).and_then(|()| {
            replace_file(staged_sessions, &self.sessions)
                .inspect_err(|_| self.restore_trials(backup.as_deref()))
        });
        if let Some(backup) = &backup {
            let _ = fs::remove_file(backup);
        }
        result
    }

    fn restore_trials(&self, backup: Option<&Path>) {
        let restored = match backup {
            Some(backup) => fs::rename(backup, &self.trials),
            None => fs::remove_file(&self.trials),
        };
        if let Err(e) = restored {
            log::error!("Failed to restore {}: {e}", self.trials.display());
        }
    }
}

pub fn load_cohort(sources: &[SubjectSource], options: &PredicateOptions) -> anyhow::Result<Cohort> {
    let subjects = sources
        .iter()
        .map(|source| source.load(options))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Cohort::new(subjects))
}

#[cfg(test)]
mod tests {
    use tapstat_records::value::Value;
    use tempfile::TempDir;

    use super::*;

    const TRIALS: &str = "n_sess,n_in_sess,interval,tap_1_len\n\
                          1,1,700,70.5\n\
                          1,2,710,\n\
                          2,1,690,69\n";
    const SESSIONS: &str = "n_sess,target,sess_size\n1,700,2\n2,700,1\n";

    fn sample_subject(dir: &TempDir) -> SubjectSource {
        let source = SubjectSource {
            name: "r1".to_owned(),
            trials: dir.path().join("trials.csv"),
            sessions: dir.path().join("sessions.csv"),
            last_session: None,
        };
        fs::write(&source.trials, TRIALS).unwrap();
        fs::write(&source.sessions, SESSIONS).unwrap();
        source
    }

    /// The sample subject with its last session dropped in memory.
    fn edited_table(source: &SubjectSource) -> RecordTable {
        let mut table = source.load(&PredicateOptions::default()).unwrap().table;
        table.drop_after(1).unwrap();
        table
    }

    fn leftovers(dir: &TempDir) -> Vec<String> {
        let mut names = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp") || name.ends_with(".bak"))
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    #[test]
    fn test_parse_subject_source() {
        let source = "r1=presses.csv,sessions.csv".parse::<SubjectSource>().unwrap();
        assert_eq!(source.name, "r1");
        assert_eq!(source.trials, PathBuf::from("presses.csv"));
        assert_eq!(source.last_session, None);

        let source = "r2=a.csv,b.csv,40".parse::<SubjectSource>().unwrap();
        assert_eq!(source.last_session, Some(40));

        assert!("r1=presses.csv".parse::<SubjectSource>().is_err());
        assert!("presses.csv,sessions.csv".parse::<SubjectSource>().is_err());
        assert!("r1=a.csv,b.csv,x".parse::<SubjectSource>().is_err());
    }

    #[test]
    fn test_save_round_trips_files() {
        let dir = tempfile::tempdir().unwrap();
        let source = sample_subject(&dir);
        let subject = source.load(&PredicateOptions::default()).unwrap();
        assert_eq!(subject.table.cell(0, "session_id").unwrap(), &Value::Int(1));
        assert!(subject.table.cell(1, "tap_1_len").unwrap().is_missing());

        source.save(&subject.table).unwrap();
        assert_eq!(fs::read_to_string(&source.trials).unwrap(), TRIALS);
        assert_eq!(fs::read_to_string(&source.sessions).unwrap(), SESSIONS);
        assert!(leftovers(&dir).is_empty());

        let mut table = subject.table;
        table.compute_loss().unwrap();
        source.save(&table).unwrap();
        let reloaded = source.load(&PredicateOptions::default()).unwrap();
        assert_eq!(
            reloaded.table.trials().names(),
            ["n_sess", "n_in_sess", "interval", "tap_1_len", "loss"]
        );
        let loss = reloaded.table.column("loss").unwrap().to_f64();
        assert!((loss[1] - 10.0 / 700.0).abs() < 1e-12);
        let tap = reloaded.table.column("tap_1_len").unwrap().to_f64();
        assert!((tap[0] - 70.5).abs() < 1e-12);
        assert!(tap[1].is_nan());
    }

    #[test]
    fn test_failed_write_keeps_original_and_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.csv");
        fs::create_dir(&target).unwrap();
        let frame = Frame::from_columns([("a".to_owned(), vec![Value::Int(1)])]).unwrap();

        assert!(write_csv_frame(&frame, &target).is_err());
        assert!(target.is_dir());
        assert!(leftovers(&dir).is_empty());

        let missing = dir.path().join("missing").join("out.csv");
        assert!(write_csv_frame(&frame, &missing).is_err());
        assert!(!missing.exists());
    }

    #[test]
    fn test_save_keeps_trials_when_sessions_cannot_be_written() {
        let dir = tempfile::tempdir().unwrap();
        let source = sample_subject(&dir);
        let table = edited_table(&source);
        let broken = SubjectSource {
            sessions: dir.path().join("missing").join("sessions.csv"),
            ..source.clone()
        };

        assert!(broken.save(&table).is_err());
        assert_eq!(fs::read_to_string(&source.trials).unwrap(), TRIALS);
        assert!(leftovers(&dir).is_empty());
    }

    #[test]
    fn test_save_restores_trials_when_sessions_cannot_be_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let source = sample_subject(&dir);
        let table = edited_table(&source);
        let sessions_dir = dir.path().join("sessions_dir");
        fs::create_dir(&sessions_dir).unwrap();
        let broken = SubjectSource {
            sessions: sessions_dir.clone(),
            ..source.clone()
        };

        assert!(broken.save(&table).is_err());
        assert_eq!(fs::read_to_string(&source.trials).unwrap(), TRIALS);
        assert!(sessions_dir.is_dir());
        assert!(leftovers(&dir).is_empty());
    }
}
