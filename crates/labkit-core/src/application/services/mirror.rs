//! Mirror - copy named sources into the rules directory under new names.
//!
//! Each pair is independent and follows the materializer's rule using the
//! *destination's* existence. A destination is therefore not refreshed when
//! only its source was force-rewritten in an earlier step.

use std::path::Path;

use tracing::{instrument, warn};

use crate::{
    application::FileMaterializer,
    domain::{MirrorOutcome, MirrorPair, MirrorRecord},
    error::LabkitResult,
};

pub struct Mirror<'a> {
    materializer: &'a FileMaterializer,
}

impl<'a> Mirror<'a> {
    pub fn new(materializer: &'a FileMaterializer) -> Self {
        Self { materializer }
    }

    /// Mirror `pairs` in declared order. Missing sources are skipped with a
    /// warning; filesystem failures propagate.
    #[instrument(
        skip_all,
        fields(pairs = pairs.len(), source = %source_dir.display(), dest = %dest_dir.display())
    )]
    pub fn mirror(
        &self,
        pairs: &[MirrorPair],
        source_dir: &Path,
        dest_dir: &Path,
        force: bool,
    ) -> LabkitResult<Vec<MirrorRecord>> {
        let fs = self.materializer.filesystem();
        let mut records = Vec::with_capacity(pairs.len());

        for pair in pairs {
            let source = source_dir.join(&pair.source_name);
            if !fs.exists(&source) {
                warn!(
                    source = %source.display(),
                    dest = %pair.dest_name,
                    "Mirror source missing, skipping pair"
                );
                records.push(MirrorRecord {
                    pair: pair.clone(),
                    outcome: MirrorOutcome::SourceMissing,
                });
                continue;
            }

            let bytes = fs.read_file(&source)?;
            let decision =
                self.materializer
                    .materialize(&dest_dir.join(&pair.dest_name), &bytes, force)?;
            records.push(MirrorRecord {
                pair: pair.clone(),
                outcome: MirrorOutcome::Copied(decision),
            });
        }

        Ok(records)
    }
}
