//! End-to-end runs of the pipeline against a scripted engine.

mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{Project, ScriptedEngine, description};
use xspec_core::{TestKind, XSPEC_NS};
use xspec_runner::engine::ProgramRole;
use xspec_runner::pipeline::{
    NullReporter, OutcomeStatus, PartialReports, ResultTally, ResultsCollector, RunCoordinator, RunError, RunOutcome,
    RunReporter, RunSummary, Specification,
};
use xspec_runner::xml::{Source, XmlReader};

fn run(project: &Project, config: xspec_runner::RunnerConfig) -> Result<RunSummary, RunError> {
    RunCoordinator::new(config, Arc::new(project.engine.clone())).run(&mut NullReporter)
}

fn only_outcome(summary: &RunSummary) -> &RunOutcome {
    assert_eq!(summary.outcomes.len(), 1, "{:?}", summary.outcomes);
    &summary.outcomes[0]
}

/// Tally of an archived report, read back from disk.
fn tally_of(report: &Path) -> ResultTally {
    let mut reader = XmlReader::from_file(report).unwrap();
    let mut collector = ResultsCollector::new();
    reader.pump(&mut collector).unwrap();
    collector.finish()
}

#[test]
fn test_clean_run_writes_every_output() {
    let project = Project::new();
    project.spec("sum.xspec", &[&["pass 1", "pass 2"], &["pass 3", "pass 4", "pass 5"]]);

    let summary = run(&project, project.config()).unwrap();
    let outcome = only_outcome(&summary);

    assert_eq!(outcome.status, OutcomeStatus::Passed);
    assert_eq!(outcome.missed, 0);
    insta::assert_snapshot!(outcome.summary_line(), @"sum.xspec results [Total/Passed/Failed/Missed] = [5/5/0/0]");

    let reports = project.reports_dir();
    assert!(reports.join("xslt/sum.xspec.xslt").is_file());
    assert!(reports.join("sum.xml").is_file());
    assert!(reports.join("sum.html").is_file());
    assert!(summary.check().is_ok());
}

#[test]
fn test_failed_assertions_are_counted_not_missed() {
    let project = Project::new();
    project.spec("sum.xspec", &[&["pass", "fail", "pass", "fail", "pass"]]);

    let summary = run(&project, project.config()).unwrap();
    let outcome = only_outcome(&summary);

    assert_eq!(outcome.status, OutcomeStatus::Failed);
    insta::assert_snapshot!(outcome.summary_line(), @"sum.xspec results [Total/Passed/Failed/Missed] = [5/3/2/0]");
    assert!(matches!(
        summary.check(),
        Err(RunError::TestsFailed { unsuccessful: 1, total: 1 })
    ));
}

#[test]
fn test_aborted_execution_reports_missed_assertions() {
    let project = Project::new();
    project.spec("sum.xspec", &[&["pass", "pass"], &["abort", "pass", "pass"]]);

    let summary = run(&project, project.config()).unwrap();
    let outcome = only_outcome(&summary);

    assert_eq!(outcome.status, OutcomeStatus::Error);
    assert_eq!(outcome.missed, 3);
    insta::assert_snapshot!(outcome.summary_line(), @"sum.xspec results [Total/Passed/Failed/Missed] = [5/2/0/3]");
    assert!(outcome.errors[0].contains("XTDE0555"), "{:?}", outcome.errors);

    // The partial archive is still well-formed and holds what was produced before the abort.
    let archived = tally_of(&project.reports_dir().join("sum.xml"));
    assert_eq!(archived.passed, 2);
    assert_eq!(archived.total(), 2);
}

#[test]
fn test_discarded_partial_reports() {
    let project = Project::new();
    project.spec("sum.xspec", &[&["pass", "abort"]]);
    let config = project.config().with_partial_reports(PartialReports::Discard);

    let summary = run(&project, config).unwrap();

    assert_eq!(only_outcome(&summary).missed, 1);
    let reports = project.reports_dir();
    assert!(!reports.join("sum.xml").exists());
    assert!(!reports.join("sum.html").exists());
    assert!(reports.join("xslt/sum.xspec.xslt").is_file());
}

#[test]
fn test_skipped_run_touches_nothing() {
    let project = Project::new();
    project.spec("sum.xspec", &[&["pass"]]);

    let summary = run(&project, project.config().with_skip_tests(true)).unwrap();

    assert!(summary.skipped);
    assert!(summary.success());
    assert_eq!(project.engine.calls.total(), 0);
    assert!(!project.reports_dir().exists());
}

#[test]
fn test_runs_are_repeatable() {
    let project = Project::new();
    project.spec("a.xspec", &[&["pass", "fail"]]);
    project.spec("nested/b.xspec", &[&["pass"], &["abort", "pass"]]);

    let first = run(&project, project.config()).unwrap();
    let archive = fs::read(project.reports_dir().join("b.xml")).unwrap();
    let second = run(&project, project.config()).unwrap();

    assert_eq!(first.outcomes, second.outcomes);
    assert_eq!(fs::read(project.reports_dir().join("b.xml")).unwrap(), archive);
}

#[test]
fn test_archive_matches_live_tally() {
    let project = Project::new();
    project.spec("mixed.xspec", &[&["pass", "fail"], &["pass", "pass"], &["fail"]]);
    project.write(
        "pending.xspec",
        &format!(
            r#"<x:description xmlns:x="{XSPEC_NS}" stylesheet="s.xsl">
                 <x:scenario label="now"><x:expect label="pass"/></x:scenario>
                 <x:scenario label="later" pending="not yet"><x:expect label="pass"/></x:scenario>
               </x:description>"#
        ),
    );

    let summary = run(&project, project.config()).unwrap();

    assert_eq!(summary.outcomes.len(), 2);
    for outcome in &summary.outcomes {
        let archived = tally_of(&project.reports_dir().join(format!("{}.xml", outcome.spec.stem(".xspec"))));
        assert_eq!(archived, outcome.tally, "{}", outcome.spec);
    }
}

#[test]
fn test_compile_failure_does_not_stop_the_run() {
    let project = Project::new();
    project.write("broken.xspec", r#"<x:description xmlns:x="urn:x"><x:scenario>"#);
    project.spec("sum.xspec", &[&["pass"]]);

    let summary = run(&project, project.config()).unwrap();

    assert_eq!(summary.outcomes.len(), 2);
    let broken = &summary.outcomes[0];
    assert!(!broken.compiled);
    assert_eq!(broken.status, OutcomeStatus::Error);
    insta::assert_snapshot!(broken.summary_line(), @"broken.xspec could not be compiled");
    assert_eq!(summary.outcomes[1].status, OutcomeStatus::Passed);
    assert!(matches!(
        summary.check(),
        Err(RunError::TestsFailed { unsuccessful: 1, total: 2 })
    ));
}

#[test]
fn test_missing_compiler_stops_before_any_transform() {
    let project = Project::new();
    project.spec("sum.xspec", &[&["pass"]]);
    let missing = project.dir.path().join("xspec/missing.xsl");
    let config = project.config().with_compiler(missing.display().to_string());

    let err = run(&project, config).unwrap_err();

    assert!(matches!(err, RunError::ProgramMissing { role: ProgramRole::Compiler, .. }), "{err:?}");
    assert_eq!(project.engine.calls.transforms.load(Ordering::SeqCst), 0);
    assert!(!project.reports_dir().exists());
}

#[test]
fn test_unloadable_compiler_stops_before_any_transform() {
    let mut project = Project::new();
    project.engine = ScriptedEngine::default().rejecting_compiler();
    project.spec("sum.xspec", &[&["pass"]]);

    let err = run(&project, project.config()).unwrap_err();

    assert!(matches!(err, RunError::ProgramLoad { role: ProgramRole::Compiler, .. }), "{err:?}");
    assert_eq!(project.engine.calls.loads.load(Ordering::SeqCst), 1);
    assert_eq!(project.engine.calls.transforms.load(Ordering::SeqCst), 0);
    assert!(!project.reports_dir().exists());
}

#[test]
fn test_compiler_error_is_confined_to_its_specification() {
    let mut project = Project::new();
    project.engine = ScriptedEngine::default().failing_compile("broken.xspec");
    project.spec("broken.xspec", &[&["pass", "pass"]]);
    project.spec("sum.xspec", &[&["pass", "fail"]]);

    let summary = run(&project, project.config()).unwrap();

    assert_eq!(summary.outcomes.len(), 2);
    let broken = &summary.outcomes[0];
    assert!(!broken.compiled);
    assert_eq!(broken.status, OutcomeStatus::Error);
    insta::assert_snapshot!(broken.errors.join("\n"), @"XSpec compiler failed: transformation failed (exit status: 2): XTSE0010: unknown XSpec element");
    assert!(!project.reports_dir().join("broken.xml").exists());

    let sum = &summary.outcomes[1];
    assert!(sum.compiled);
    insta::assert_snapshot!(sum.summary_line(), @"sum.xspec results [Total/Passed/Failed/Missed] = [2/1/1/0]");
    assert!(project.reports_dir().join("sum.html").exists());
    assert!(matches!(
        summary.check(),
        Err(RunError::TestsFailed { unsuccessful: 2, total: 2 })
    ));
}

#[test]
fn test_empty_test_directory_fails_the_run() {
    let project = Project::new();

    let summary = run(&project, project.config()).unwrap();

    assert!(summary.outcomes.is_empty());
    assert!(!summary.success());
    assert!(matches!(summary.check(), Err(RunError::NoSpecifications)));
}

#[test]
fn test_missing_test_directory_is_fatal() {
    let project = Project::new();
    let config = project.config().with_test_dir(project.dir.path().join("nowhere"));

    assert!(matches!(run(&project, config), Err(RunError::Discovery(_))));
}

const PENDING_SPEC: &str = r#"<x:description xmlns:x="http://www.jenitennison.com/xslt/xspec" stylesheet="s.xsl">
  <x:scenario label="ready"><x:call template="t"/><x:expect label="pass"/></x:scenario>
  <x:pending label="blocked">
    <x:scenario label="blocked"><x:call template="t"/><x:expect label="pass"/></x:scenario>
  </x:pending>
  <x:scenario label="todo" pending="needs data"><x:call template="t"/><x:expect label="fail"/></x:scenario>
</x:description>"#;

#[test]
fn test_pending_assertions_kept() {
    let project = Project::new();
    project.write("pending.xspec", PENDING_SPEC);

    let summary = run(&project, project.config()).unwrap();
    let outcome = only_outcome(&summary);

    assert_eq!(outcome.tally, ResultTally { passed: 1, failed: 0, pending: 2 });
    assert_eq!(outcome.status, OutcomeStatus::Passed);
    insta::assert_snapshot!(outcome.summary_line(), @"pending.xspec results [Total/Passed/Failed/Missed] = [3/1/0/0], 2 pending");
}

#[test]
fn test_pending_assertions_elided() {
    let project = Project::new();
    project.write("pending.xspec", PENDING_SPEC);
    let config = project.config().with_elided_pending(TestKind::Xslt);

    let summary = run(&project, config).unwrap();
    let outcome = only_outcome(&summary);

    assert_eq!(outcome.tally, ResultTally { passed: 1, failed: 0, pending: 0 });
    assert_eq!(outcome.elided, 2);
    assert_eq!(outcome.missed, 0);
    insta::assert_snapshot!(outcome.summary_line(), @"pending.xspec results [Total/Passed/Failed/Missed] = [3/1/0/0], 2 elided");

    let compiled = fs::read_to_string(project.reports_dir().join("xslt/pending.xspec.xslt")).unwrap();
    assert!(!compiled.contains("blocked"));
    assert!(!compiled.contains("needs data"));
}

#[test]
fn test_eliding_another_kind_keeps_pending() {
    let project = Project::new();
    project.write("pending.xspec", PENDING_SPEC);
    let config = project.config().with_elided_pending(TestKind::Schematron);

    let summary = run(&project, config).unwrap();

    assert_eq!(only_outcome(&summary).elided, 0);
    assert_eq!(only_outcome(&summary).tally.pending, 2);
}

#[test]
fn test_compiled_test_records_its_base_uri() {
    let project = Project::new();
    let spec = project.spec("sum.xspec", &[&["pass"]]);

    run(&project, project.config()).unwrap();

    let compiled = fs::read_to_string(project.reports_dir().join("xslt/sum.xspec.xslt")).unwrap();
    let uri = xspec_runner::pipeline::filter::file_uri(&spec).unwrap();
    assert!(compiled.contains(&format!(r#"xml:base="{uri}""#)), "{compiled}");
}

#[derive(Default)]
struct Recording {
    calls: Vec<String>,
}

impl RunReporter for Recording {
    fn on_discovered(&mut self, _root: &Path, specs: &[Specification]) {
        self.calls.push(format!("discovered {}", specs.len()));
    }

    fn on_spec_start(&mut self, spec: &Specification) {
        self.calls.push(format!("start {}", spec.name));
    }

    fn on_outcome(&mut self, outcome: &RunOutcome) {
        self.calls.push(format!("{} {}", outcome.status.as_str(), outcome.spec.name));
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        self.calls.push(format!("complete {}", summary.outcomes.len()));
    }
}

#[test]
fn test_reporter_sees_specs_in_discovery_order() {
    let project = Project::new();
    project.spec("z.xspec", &[&["pass"]]);
    project.spec("a/deep/b.xspec", &[&["fail"]]);
    project.write("notes.xml", &description(&[&["pass"]]));

    let mut reporter = Recording::default();
    RunCoordinator::new(project.config(), Arc::new(project.engine.clone()))
        .run(&mut reporter)
        .unwrap();

    assert_eq!(
        reporter.calls,
        vec![
            "discovered 2",
            "start b.xspec",
            "failed b.xspec",
            "start z.xspec",
            "passed z.xspec",
            "complete 2",
        ]
    );
}

#[test]
fn test_programs_are_loaded_once_per_run() {
    let project = Project::new();
    project.spec("a.xspec", &[&["pass"]]);
    project.spec("b.xspec", &[&["pass"]]);
    project.spec("c.xspec", &[&["pass"]]);

    run(&project, project.config()).unwrap();

    let calls = &project.engine.calls;
    // compiler + reporter + one compiled test per specification
    assert_eq!(calls.loads.load(Ordering::SeqCst), 2 + 3);
    assert_eq!(calls.reports.load(Ordering::SeqCst), 3);
}
