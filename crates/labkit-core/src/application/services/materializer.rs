//! File Materializer - the create/skip/overwrite rule applied to one path.
//!
//! Exactly two inputs decide: does the path exist, and is `force` set. The
//! existing content is never compared against the payload, so operator edits
//! survive re-runs unless `force` is given.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::{
    application::ports::Filesystem,
    domain::WriteDecision,
    error::LabkitResult,
};

pub struct FileMaterializer {
    filesystem: Box<dyn Filesystem>,
}

impl FileMaterializer {
    pub fn new(filesystem: Box<dyn Filesystem>) -> Self {
        Self { filesystem }
    }

    pub fn filesystem(&self) -> &dyn Filesystem {
        self.filesystem.as_ref()
    }

    /// Write `payload` to `path` when absent or forced; otherwise leave it.
    ///
    /// Parent directories are created as needed. Filesystem errors propagate:
    /// without a writable target there is nothing to scaffold.
    #[instrument(skip(self, payload), fields(path = %path.display(), bytes = payload.len()))]
    pub fn materialize(
        &self,
        path: &Path,
        payload: &[u8],
        force: bool,
    ) -> LabkitResult<WriteDecision> {
        let existed = self.filesystem.exists(path);
        let decision = WriteDecision::decide(path, existed, force);

        if decision.written() {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    self.filesystem.create_dir_all(parent)?;
                }
            }
            self.filesystem.write_file(path, payload)?;
            info!(existed, forced = force, "Wrote file");
        } else {
            debug!("File exists, leaving untouched");
        }

        Ok(decision)
    }

    /// What [`Self::materialize`] would do, without touching anything.
    pub fn preview(&self, path: &Path, force: bool) -> WriteDecision {
        WriteDecision::decide(path, self.filesystem.exists(path), force)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::output::MockFilesystem;
    use crate::application::ApplicationError;
    use crate::domain::WriteAction;

    #[test]
    fn absent_path_is_written_with_parents() {
        let mut fs = MockFilesystem::new();
        fs.expect_exists().returning(|_| false);
        fs.expect_create_dir_all()
            .withf(|p| p == Path::new("/t/docs"))
            .times(1)
            .returning(|_| Ok(()));
        fs.expect_write_file()
            .withf(|p, c| p == Path::new("/t/docs/A.md") && c == b"hello")
            .times(1)
            .returning(|_, _| Ok(()));

        let m = FileMaterializer::new(Box::new(fs));
        let d = m.materialize(Path::new("/t/docs/A.md"), b"hello", false).unwrap();
        assert_eq!(d.action, WriteAction::Written);
        assert!(!d.existed_before);
    }

    #[test]
    fn existing_path_is_skipped_without_writing() {
        let mut fs = MockFilesystem::new();
        fs.expect_exists().returning(|_| true);
        fs.expect_create_dir_all().never();
        fs.expect_write_file().never();

        let m = FileMaterializer::new(Box::new(fs));
        let d = m.materialize(Path::new("/t/A.md"), b"new", false).unwrap();
        assert_eq!(d.action, WriteAction::Skipped);
        assert!(d.existed_before);
    }

    #[test]
    fn force_overwrites_existing_path() {
        let mut fs = MockFilesystem::new();
        fs.expect_exists().returning(|_| true);
        fs.expect_create_dir_all().returning(|_| Ok(()));
        fs.expect_write_file().times(1).returning(|_, _| Ok(()));

        let m = FileMaterializer::new(Box::new(fs));
        let d = m.materialize(Path::new("/t/A.md"), b"new", true).unwrap();
        assert_eq!(d.action, WriteAction::Written);
        assert!(d.existed_before && d.forced);
    }

    #[test]
    fn write_failure_propagates() {
        let mut fs = MockFilesystem::new();
        fs.expect_exists().returning(|_| false);
        fs.expect_create_dir_all().returning(|_| Ok(()));
        fs.expect_write_file().returning(|p, _| {
            Err(ApplicationError::FilesystemError {
                path: p.to_path_buf(),
                reason: "read-only filesystem".into(),
            }
            .into())
        });

        let m = FileMaterializer::new(Box::new(fs));
        assert!(m.materialize(Path::new("/ro/A.md"), b"x", false).is_err());
    }

    #[test]
    fn preview_does_not_write() {
        let mut fs = MockFilesystem::new();
        fs.expect_exists().returning(|_| true);
        fs.expect_write_file().never();

        let m = FileMaterializer::new(Box::new(fs));
        assert_eq!(
            m.preview(Path::new("/t/A.md"), false).action,
            WriteAction::Skipped
        );
        assert_eq!(
            m.preview(Path::new("/t/A.md"), true).action,
            WriteAction::Written
        );
    }
}
