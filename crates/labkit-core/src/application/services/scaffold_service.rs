//! Scaffold Service - the whole deliverable in one call.
//!
//! Order matters and is fixed:
//!
//! 1. validate the catalog, ensure the target directory
//! 2. materialize every artifact (rendered per [`RenderMode`])
//! 3. rewrite the resolved-defaults report, header only when nothing resolved
//! 4. mirror docs into the rules directory
//! 5. aggregate the rules directory into one document
//!
//! Only filesystem errors escape; everything else is an outcome value.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    application::{
        ApplicationError, FileMaterializer,
        ports::Filesystem,
        services::{Aggregator, Mirror},
    },
    domain::{
        Catalog, MirrorOutcome, MirrorRecord, RenderContext, RenderMode, ResolvedConfig,
        WriteDecision,
    },
    error::LabkitResult,
};

/// Everything one scaffold run did, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScaffoldReport {
    pub root: PathBuf,
    pub artifacts: Vec<WriteDecision>,
    /// Derived report, rewritten on every run; not counted by [`Self::decisions`].
    pub resolved_env: Option<WriteDecision>,
    pub mirrors: Vec<MirrorRecord>,
    pub aggregate: Option<WriteDecision>,
    pub aggregate_sections: Vec<String>,
}

impl ScaffoldReport {
    /// Every write decision for catalog outputs, artifacts first.
    pub fn decisions(&self) -> impl Iterator<Item = &WriteDecision> {
        self.artifacts
            .iter()
            .chain(self.mirrors.iter().filter_map(MirrorRecord::decision))
            .chain(self.aggregate.iter())
    }

    pub fn written(&self) -> usize {
        self.decisions().filter(|d| d.written()).count()
    }

    pub fn kept(&self) -> usize {
        self.decisions().filter(|d| !d.written()).count()
    }

    pub fn missing_sources(&self) -> Vec<&str> {
        self.mirrors
            .iter()
            .filter(|r| r.outcome == MirrorOutcome::SourceMissing)
            .map(|r| r.pair.source_name.as_str())
            .collect()
    }
}

pub struct ScaffoldService {
    materializer: FileMaterializer,
    catalog: Catalog,
    render_mode: RenderMode,
}

impl ScaffoldService {
    pub fn new(
        filesystem: Box<dyn Filesystem>,
        catalog: Catalog,
        render_mode: RenderMode,
    ) -> Self {
        Self {
            materializer: FileMaterializer::new(filesystem),
            catalog,
            render_mode,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    #[instrument(skip(self, config), fields(root = %root.display(), mode = %self.render_mode))]
    pub fn run(
        &self,
        root: &Path,
        config: &ResolvedConfig,
        force: bool,
    ) -> LabkitResult<ScaffoldReport> {
        self.catalog.validate()?;
        self.prepare_root(root)?;

        let layout = &self.catalog.layout;
        let ctx = RenderContext::from_config(config);
        let mut report = ScaffoldReport {
            root: root.to_path_buf(),
            ..Default::default()
        };

        let mut unfilled = Vec::new();
        for artifact in &self.catalog.artifacts {
            if self.render_mode == RenderMode::Literal && !ctx.is_empty() {
                let names = artifact.payload.fillable_placeholders(&ctx);
                if !names.is_empty() {
                    unfilled.push((artifact.relative_path.to_string(), names));
                }
            }
            let bytes = artifact.payload.render(&ctx, self.render_mode);
            let path = artifact.relative_path.under(root);
            let decision = self.materializer.materialize(&path, &bytes, force)?;
            report.artifacts.push(decision);
        }
        for (path, names) in &unfilled {
            warn!(
                artifact = %path,
                placeholders = %names.join(","),
                "Placeholders left literal although resolved values exist (use --render substitute)"
            );
        }

        // Always rewritten so values from an earlier run never outlive their source.
        let env = config.to_env_file();
        let env_path = layout.resolved_env_path.under(root);
        let env_decision = self.materializer.materialize(&env_path, env.as_bytes(), true)?;
        report.resolved_env = Some(env_decision);

        let docs = layout.docs_dir.under(root);
        let rules = layout.rules_dir.under(root);
        let pairs = &self.catalog.mirror_pairs;
        let mirror = Mirror::new(&self.materializer);
        report.mirrors = mirror.mirror(pairs, &docs, &rules, force)?;

        let (document, decision) = Aggregator::new(&self.materializer).aggregate(
            &self.catalog.mirror_destinations(),
            &rules,
            &layout.aggregate_path.under(root),
            force,
        )?;
        report.aggregate = Some(decision);
        report.aggregate_sections = document.sections;

        info!(
            written = report.written(),
            kept = report.kept(),
            missing_sources = report.missing_sources().len(),
            "Scaffold complete"
        );
        Ok(report)
    }

    /// Would-be decisions for every fixed output path. Touches nothing.
    pub fn plan(&self, root: &Path, force: bool) -> LabkitResult<Vec<WriteDecision>> {
        self.catalog.validate()?;
        let layout = &self.catalog.layout;
        let rules = layout.rules_dir.under(root);

        let mut decisions: Vec<WriteDecision> = self
            .catalog
            .artifacts
            .iter()
            .map(|a| a.relative_path.under(root))
            .map(|path| self.materializer.preview(&path, force))
            .collect();
        decisions.extend(
            self.catalog
                .mirror_destinations()
                .into_iter()
                .map(|dest| self.materializer.preview(&rules.join(dest), force)),
        );
        let aggregate = layout.aggregate_path.under(root);
        decisions.push(self.materializer.preview(&aggregate, force));
        Ok(decisions)
    }

    fn prepare_root(&self, root: &Path) -> LabkitResult<()> {
        let fs = self.materializer.filesystem();
        if fs.exists(root) && !fs.is_dir(root) {
            return Err(ApplicationError::TargetNotDirectory {
                path: root.to_path_buf(),
            }
            .into());
        }
        fs.create_dir_all(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ConfigResolver;
    use crate::domain::{ArtifactSpec, ConfigDocument, ConfigScalar, Layout, MirrorPair};
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Store {
        files: BTreeMap<PathBuf, Vec<u8>>,
        dirs: BTreeSet<PathBuf>,
    }

    #[derive(Clone, Default)]
    struct MemFs(Arc<Mutex<Store>>);

    impl MemFs {
        fn read(&self, path: &str) -> Option<String> {
            let store = self.0.lock().unwrap();
            store
                .files
                .get(Path::new(path))
                .map(|b| String::from_utf8_lossy(b).into_owned())
        }

        fn put(&self, path: &str, content: &str) {
            self.0
                .lock()
                .unwrap()
                .files
                .insert(PathBuf::from(path), content.as_bytes().to_vec());
        }

        fn remove(&self, path: &str) {
            self.0.lock().unwrap().files.remove(Path::new(path));
        }
    }

    impl Filesystem for MemFs {
        fn exists(&self, path: &Path) -> bool {
            let s = self.0.lock().unwrap();
            s.files.contains_key(path) || s.dirs.contains(path)
        }

        fn is_dir(&self, path: &Path) -> bool {
            self.0.lock().unwrap().dirs.contains(path)
        }

        fn create_dir_all(&self, path: &Path) -> LabkitResult<()> {
            let mut s = self.0.lock().unwrap();
            for ancestor in path.ancestors() {
                s.dirs.insert(ancestor.to_path_buf());
            }
            Ok(())
        }

        fn write_file(&self, path: &Path, content: &[u8]) -> LabkitResult<()> {
            self.0
                .lock()
                .unwrap()
                .files
                .insert(path.to_path_buf(), content.to_vec());
            Ok(())
        }

        fn read_file(&self, path: &Path) -> LabkitResult<Vec<u8>> {
            let store = self.0.lock().unwrap();
            store.files.get(path).cloned().ok_or_else(|| {
                ApplicationError::FilesystemError {
                    path: path.to_path_buf(),
                    reason: "not found".into(),
                }
                .into()
            })
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(
            vec![
                ArtifactSpec::doc(
                    "docs/ARCHITECTURE.md",
                    "# Architecture\r\nport $API_PORT\r\n",
                ),
                ArtifactSpec::doc("docs/CODING_RULES.md", "# Rules\n"),
                ArtifactSpec::config("config/app_config.yaml", "api:\n  port: 8010\n"),
            ],
            vec![
                MirrorPair::new("CODING_RULES.md", "00-coding-rules.md"),
                MirrorPair::new("ARCHITECTURE.md", "10-architecture.md"),
                MirrorPair::new("MISSING.md", "20-missing.md"),
            ],
            Layout {
                docs_dir: "docs".into(),
                rules_dir: "rules".into(),
                aggregate_path: "AGENT_RULES.md".into(),
                config_path: "config/app_config.yaml".into(),
                resolved_env_path: ".labkit/resolved.env".into(),
            },
        )
    }

    fn service(fs: &MemFs, mode: RenderMode) -> ScaffoldService {
        ScaffoldService::new(Box::new(fs.clone()), catalog(), mode)
    }

    fn config() -> ResolvedConfig {
        let port = ConfigScalar::Integer(9001);
        let doc = ConfigDocument::new().with("api.port", port);
        ConfigResolver::resolve_document(&doc, "x.yaml").config
    }

    fn run(svc: &ScaffoldService, config: &ResolvedConfig, force: bool) -> ScaffoldReport {
        svc.run(Path::new("/w"), config, force).unwrap()
    }

    #[test]
    fn fresh_run_writes_everything_in_order() {
        let fs = MemFs::default();
        let report = service(&fs, RenderMode::Literal)
            .run(Path::new("/w"), &ResolvedConfig::empty(), false)
            .unwrap();

        assert!(report.artifacts.iter().all(WriteDecision::written));
        let env = report.resolved_env.as_ref();
        assert!(env.is_some_and(WriteDecision::written));
        assert!(!fs.read("/w/.labkit/resolved.env").unwrap().contains('='));
        assert_eq!(report.missing_sources(), vec!["MISSING.md"]);
        assert_eq!(
            report.aggregate_sections,
            vec!["00-coding-rules.md", "10-architecture.md"]
        );
        let expected = "## 00-coding-rules.md\n# Rules\n\n\
                        ## 10-architecture.md\n# Architecture\nport $API_PORT\n\n";
        assert_eq!(fs.read("/w/AGENT_RULES.md").unwrap(), expected);
        assert_eq!(fs.read("/w/rules/20-missing.md"), None);
    }

    #[test]
    fn rerun_keeps_operator_edits() {
        let fs = MemFs::default();
        let svc = service(&fs, RenderMode::Literal);
        run(&svc, &ResolvedConfig::empty(), false);
        fs.put("/w/docs/CODING_RULES.md", "# Mine\n");

        let report = run(&svc, &ResolvedConfig::empty(), false);
        assert_eq!(report.written(), 0);
        assert_eq!(fs.read("/w/docs/CODING_RULES.md").unwrap(), "# Mine\n");
    }

    #[test]
    fn force_restores_payloads_but_mirror_copies_follow_sources() {
        let fs = MemFs::default();
        let svc = service(&fs, RenderMode::Literal);
        run(&svc, &ResolvedConfig::empty(), false);
        fs.put("/w/docs/CODING_RULES.md", "# Mine\n");

        run(&svc, &ResolvedConfig::empty(), true);
        assert_eq!(fs.read("/w/docs/CODING_RULES.md").unwrap(), "# Rules\n");
        assert_eq!(fs.read("/w/rules/00-coding-rules.md").unwrap(), "# Rules\n");
    }

    #[test]
    fn stale_mirror_destination_survives_unforced_rerun() {
        let fs = MemFs::default();
        let svc = service(&fs, RenderMode::Literal);
        run(&svc, &ResolvedConfig::empty(), false);
        fs.put("/w/rules/00-coding-rules.md", "# Stale\n");
        fs.remove("/w/AGENT_RULES.md");

        run(&svc, &ResolvedConfig::empty(), false);
        assert!(fs.read("/w/AGENT_RULES.md").unwrap().contains("# Stale"));
    }

    #[test]
    fn resolved_env_written_and_refreshed_when_config_present() {
        let fs = MemFs::default();
        let svc = service(&fs, RenderMode::Literal);
        let report = run(&svc, &config(), false);
        assert!(report.resolved_env.is_some_and(|d| d.written()));
        let env = fs.read("/w/.labkit/resolved.env").unwrap();
        assert!(env.contains("API_PORT=9001"));

        let again = run(&svc, &config(), false);
        let env = again.resolved_env.as_ref();
        assert!(env.is_some_and(|d| d.written() && d.existed_before));
        assert_eq!(again.written(), 0);
    }

    #[test]
    fn empty_config_clears_values_from_an_earlier_run() {
        let fs = MemFs::default();
        let svc = service(&fs, RenderMode::Literal);
        run(&svc, &config(), false);

        run(&svc, &ResolvedConfig::empty(), false);
        let env = fs.read("/w/.labkit/resolved.env").unwrap();
        assert!(env.starts_with('#'));
        assert!(!env.contains("API_PORT"));
    }

    #[test]
    fn substitute_mode_fills_placeholders() {
        let fs = MemFs::default();
        service(&fs, RenderMode::Substitute)
            .run(Path::new("/w"), &config(), false)
            .unwrap();
        let doc = fs.read("/w/docs/ARCHITECTURE.md").unwrap();
        assert!(doc.contains("port 9001"));
    }

    #[test]
    fn literal_mode_keeps_placeholders() {
        let fs = MemFs::default();
        service(&fs, RenderMode::Literal)
            .run(Path::new("/w"), &config(), false)
            .unwrap();
        let doc = fs.read("/w/docs/ARCHITECTURE.md").unwrap();
        assert!(doc.contains("$API_PORT"));
    }

    #[test]
    fn target_that_is_a_file_is_rejected() {
        let fs = MemFs::default();
        fs.put("/w", "not a dir");
        let err = service(&fs, RenderMode::Literal)
            .run(Path::new("/w"), &ResolvedConfig::empty(), false)
            .unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn plan_previews_without_writing() {
        let fs = MemFs::default();
        let svc = service(&fs, RenderMode::Literal);
        let decisions = svc.plan(Path::new("/w"), false).unwrap();
        assert_eq!(decisions.len(), 3 + 3 + 1);
        assert!(decisions.iter().all(WriteDecision::written));
        assert_eq!(fs.read("/w/docs/CODING_RULES.md"), None);
    }
}
