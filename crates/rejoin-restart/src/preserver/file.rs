use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, info, warn};

use crate::error::{RestartError, RestartResult};
use crate::id::EvaluatorId;
use crate::preserver::EvaluatorPreserver;

const ADD_ENTRY_PREFIX: &str = "ADD:";
const REMOVE_ENTRY_PREFIX: &str = "REMOVE:";

/// An evaluator preserver backed by an append-only change log on a file system
/// that outlives the driver process.
///
/// Each line of the log records either an allocated evaluator (`ADD:<id>`)
/// or a removed evaluator (`REMOVE:<id>`). The roster is recovered by replaying the log.
/// A final line without a line terminator was not completely written before the
/// previous driver instance exited. It is ignored during recovery and discarded
/// before the first write.
#[derive(Debug)]
pub struct FileEvaluatorPreserver {
    path: PathBuf,
    writer: Mutex<Option<File>>,
}

impl FileEvaluatorPreserver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, prefix: &str, id: &EvaluatorId) -> RestartResult<()> {
        let value = id.as_str();
        if value.is_empty() || value.contains(['\n', '\r']) || value.trim() != value {
            return Err(RestartError::collaborator(format!(
                "cannot record evaluator ID {id:?} in the evaluator log"
            )));
        }
        let mut writer = self.writer.lock()?;
        if writer.is_none() {
            *writer = Some(self.open_log()?);
        }
        let Some(file) = writer.as_mut() else {
            return Err(RestartError::InternalError(
                "evaluator log is not open".to_string(),
            ));
        };
        // A single write per entry.
        file.write_all(format!("{prefix}{id}\n").as_bytes())?;
        file.sync_data()?;
        debug!("recorded {prefix}{id} in {}", self.path.display());
        Ok(())
    }

    /// Opens the log for appending, after discarding a partial entry at the end of the log.
    fn open_log(&self) -> RestartResult<File> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        let mut content = vec![];
        file.read_to_end(&mut content)?;
        if !matches!(content.last(), None | Some(b'\n')) {
            let len = content
                .iter()
                .rposition(|x| *x == b'\n')
                .map_or(0, |i| i + 1);
            warn!(
                "discarding partial entry at the end of evaluator log {}",
                self.path.display()
            );
            file.set_len(len as u64)?;
            file.sync_data()?;
        }
        Ok(file)
    }
}

impl EvaluatorPreserver for FileEvaluatorPreserver {
    fn recover_roster(&self) -> RestartResult<HashSet<EvaluatorId>> {
        let file = match File::open(&self.path) {
            Ok(x) => x,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(
                    "evaluator log {} does not exist, no evaluators to recover",
                    self.path.display()
                );
                return Ok(HashSet::new());
            }
            Err(e) => return Err(e.into()),
        };
        let mut reader = BufReader::new(file);
        let mut evaluators = HashSet::new();
        let mut line = String::new();
        let mut index = 0;
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            index += 1;
            let Some(entry) = line.strip_suffix('\n') else {
                warn!(
                    "ignoring partial entry at line {index} of evaluator log {}",
                    self.path.display()
                );
                break;
            };
            if entry.is_empty() {
                continue;
            }
            match (
                entry.strip_prefix(ADD_ENTRY_PREFIX),
                entry.strip_prefix(REMOVE_ENTRY_PREFIX),
            ) {
                (Some(id), _) if !id.is_empty() => {
                    evaluators.insert(EvaluatorId::from(id));
                }
                (_, Some(id)) if !id.is_empty() => {
                    evaluators.remove(id);
                }
                _ => {
                    return Err(RestartError::InvalidLogEntry {
                        line: index,
                        entry: entry.to_string(),
                    })
                }
            }
        }
        info!(
            "recovered {} evaluators from {}",
            evaluators.len(),
            self.path.display()
        );
        Ok(evaluators)
    }

    fn record_allocated(&self, id: &EvaluatorId) -> RestartResult<()> {
        self.append(ADD_ENTRY_PREFIX, id)
    }

    fn record_removed(&self, id: &EvaluatorId) -> RestartResult<()> {
        self.append(REMOVE_ENTRY_PREFIX, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_preserver_missing_log() -> RestartResult<()> {
        let dir = tempfile::tempdir()?;
        let preserver = FileEvaluatorPreserver::new(dir.path().join("evaluators.log"));
        assert!(preserver.recover_roster()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_file_preserver_replays_log() -> RestartResult<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("driver").join("evaluators.log");
        let preserver = FileEvaluatorPreserver::new(&path);
        preserver.record_allocated(&EvaluatorId::from("a"))?;
        preserver.record_allocated(&EvaluatorId::from("b"))?;
        preserver.record_allocated(&EvaluatorId::from("c"))?;
        preserver.record_removed(&EvaluatorId::from("b"))?;

        // A new driver instance reads the log written by the previous instance.
        let recovered = FileEvaluatorPreserver::new(&path).recover_roster()?;
        assert_eq!(
            recovered,
            HashSet::from([EvaluatorId::from("a"), EvaluatorId::from("c")])
        );
        assert_eq!(
            std::fs::read_to_string(&path)?,
            "ADD:a\nADD:b\nADD:c\nREMOVE:b\n"
        );
        Ok(())
    }

    #[test]
    fn test_file_preserver_invalid_entry() -> RestartResult<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("evaluators.log");
        std::fs::write(&path, "ADD:a\n\nUPDATE:a\n")?;
        let result = FileEvaluatorPreserver::new(&path).recover_roster();
        assert!(matches!(
            result,
            Err(RestartError::InvalidLogEntry { line: 3, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_file_preserver_rejects_invalid_id() -> RestartResult<()> {
        let dir = tempfile::tempdir()?;
        let preserver = FileEvaluatorPreserver::new(dir.path().join("evaluators.log"));
        for id in ["", "a\nADD:b", "a ", " a", "\ta"] {
            let result = preserver.record_allocated(&EvaluatorId::from(id));
            assert!(matches!(result, Err(RestartError::CollaboratorError(_))));
        }
        assert!(preserver.recover_roster()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_file_preserver_partial_entry() -> RestartResult<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("evaluators.log");
        std::fs::write(&path, "ADD:a\nADD:b")?;

        // The entry for `b` was not completely written and is not recovered.
        let preserver = FileEvaluatorPreserver::new(&path);
        assert_eq!(
            preserver.recover_roster()?,
            HashSet::from([EvaluatorId::from("a")])
        );
        preserver.record_allocated(&EvaluatorId::from("c"))?;
        assert_eq!(std::fs::read_to_string(&path)?, "ADD:a\nADD:c\n");
        assert_eq!(
            FileEvaluatorPreserver::new(&path).recover_roster()?,
            HashSet::from([EvaluatorId::from("a"), EvaluatorId::from("c")])
        );
        Ok(())
    }

    #[test]
    fn test_file_preserver_partial_prefix() -> RestartResult<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("evaluators.log");
        std::fs::write(&path, "ADD:a\nADD:")?;

        let preserver = FileEvaluatorPreserver::new(&path);
        assert_eq!(
            preserver.recover_roster()?,
            HashSet::from([EvaluatorId::from("a")])
        );
        preserver.record_removed(&EvaluatorId::from("a"))?;
        preserver.record_allocated(&EvaluatorId::from("b"))?;
        assert_eq!(
            std::fs::read_to_string(&path)?,
            "ADD:a\nREMOVE:a\nADD:b\n"
        );
        assert_eq!(
            FileEvaluatorPreserver::new(&path).recover_roster()?,
            HashSet::from([EvaluatorId::from("b")])
        );
        Ok(())
    }

    #[test]
    fn test_file_preserver_partial_first_entry() -> RestartResult<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("evaluators.log");
        std::fs::write(&path, "ADD")?;

        let preserver = FileEvaluatorPreserver::new(&path);
        assert!(preserver.recover_roster()?.is_empty());
        preserver.record_allocated(&EvaluatorId::from("a"))?;
        assert_eq!(std::fs::read_to_string(&path)?, "ADD:a\n");
        Ok(())
    }
}
