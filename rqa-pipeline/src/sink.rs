//! Output sinks: where finished output files are published

use rqa_common::config::DriveUpload;
use rqa_common::{Error, Result};
use std::path::{Component, Path, PathBuf};
use tracing::info;

/// Accepts finished files under a target path
pub trait FileSink {
    fn put(&self, local_path: &Path, target_path: &str) -> Result<()>;
}

/// Copies files into a local directory, keeping target paths relative to it
#[derive(Debug, Clone)]
pub struct LocalDirectorySink {
    root: PathBuf,
}

impl LocalDirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, target_path: &str) -> Result<PathBuf> {
        let relative = Path::new(target_path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(Error::Config(format!(
                "Upload path '{}' must stay inside the output directory",
                target_path
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl FileSink for LocalDirectorySink {
    fn put(&self, local_path: &Path, target_path: &str) -> Result<()> {
        let destination = self.resolve(target_path)?;
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(local_path, &destination)?;
        info!("Published {} to {}", local_path.display(), destination.display());
        Ok(())
    }
}

/// Local output files of one pipeline run
pub struct RunOutputs<'a> {
    pub production_csv: Option<&'a Path>,
    pub messages_csv: &'a Path,
    pub individuals_csv: &'a Path,
    pub messages_traced_data: &'a Path,
    pub individuals_traced_data: &'a Path,
}

/// Publish every output to its configured path
pub fn publish_outputs(sink: &dyn FileSink, paths: &DriveUpload, outputs: &RunOutputs<'_>) -> Result<()> {
    if let Some(production_csv) = outputs.production_csv {
        sink.put(production_csv, &paths.production_upload_path)?;
    }
    sink.put(outputs.messages_csv, &paths.messages_upload_path)?;
    sink.put(outputs.individuals_csv, &paths.individuals_upload_path)?;
    sink.put(outputs.messages_traced_data, &paths.messages_traced_data_upload_path)?;
    sink.put(outputs.individuals_traced_data, &paths.individuals_traced_data_upload_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_local_sink_copies_into_subdirectories() {
        let source_dir = tempfile::tempdir().unwrap();
        let target_dir = tempfile::tempdir().unwrap();
        let source = source_dir.path().join("messages.csv");
        std::fs::write(&source, "uid\nu1\n").unwrap();

        let sink = LocalDirectorySink::new(target_dir.path());
        sink.put(&source, "/analysis/s04/messages.csv").unwrap();

        let copied = std::fs::read_to_string(target_dir.path().join("analysis/s04/messages.csv")).unwrap();
        assert_eq!(copied, "uid\nu1\n");
    }

    #[test]
    fn test_local_sink_rejects_escaping_paths() {
        let target_dir = tempfile::tempdir().unwrap();
        let sink = LocalDirectorySink::new(target_dir.path());
        assert!(sink.put(Path::new("unused"), "../outside.csv").is_err());
    }

    struct RecordingSink(RefCell<Vec<String>>);

    impl FileSink for RecordingSink {
        fn put(&self, _local_path: &Path, target_path: &str) -> Result<()> {
            self.0.borrow_mut().push(target_path.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_publish_skips_missing_production_csv() {
        let paths = DriveUpload {
            drive_credentials_file_url: "gs://credentials/drive.json".to_string(),
            production_upload_path: "production.csv".to_string(),
            messages_upload_path: "messages.csv".to_string(),
            individuals_upload_path: "individuals.csv".to_string(),
            messages_traced_data_upload_path: "messages.jsonl".to_string(),
            individuals_traced_data_upload_path: "individuals.jsonl".to_string(),
        };
        let sink = RecordingSink(RefCell::new(Vec::new()));
        let outputs = RunOutputs {
            production_csv: None,
            messages_csv: Path::new("m.csv"),
            individuals_csv: Path::new("i.csv"),
            messages_traced_data: Path::new("m.jsonl"),
            individuals_traced_data: Path::new("i.jsonl"),
        };
        publish_outputs(&sink, &paths, &outputs).unwrap();
        assert_eq!(
            sink.0.into_inner(),
            vec!["messages.csv", "individuals.csv", "messages.jsonl", "individuals.jsonl"]
        );
    }
}
