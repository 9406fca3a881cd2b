use std::collections::{BTreeMap, BTreeSet, HashMap};

use ldapsync_core::{
    fingerprint, AttributeMap, Directory, DirectoryError, Field, Fingerprint, IdentityKey,
    OperationResult, Record, RecordSource, SearchEntry, SourceError,
};
use ldapsync_sync::{
    driver::{self, Pass, PassOutcome, RunOptions, RunState, SyncDriver},
    snapshot, SyncError, WriteResult,
};
use tempfile::TempDir;

const BASE: &str = "ou=students,o=mlu,c=de";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Op {
    Add(String),
    Delete(String),
}

/// Directory kept in memory, with an operation log and optional rejections.
#[derive(Default)]
struct MemoryDirectory {
    entries: BTreeMap<String, AttributeMap>,
    ops: Vec<Op>,
    reject_adds: HashMap<String, OperationResult>,
}

impl MemoryDirectory {
    fn license_of(&self, dn: &str) -> Option<&str> {
        self.entries
            .get(dn)
            .and_then(|attrs| attrs.get("carlicense"))
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    fn writes(&self) -> usize {
        self.ops.len()
    }
}

impl Directory for MemoryDirectory {
    fn search(
        &mut self,
        base: &str,
        _filter: &str,
        attrs: &[&str],
    ) -> Result<Vec<SearchEntry>, DirectoryError> {
        Ok(self
            .entries
            .iter()
            .filter(|(dn, _)| dn.ends_with(base))
            .map(|(dn, stored)| SearchEntry {
                dn: dn.clone(),
                attrs: stored
                    .iter()
                    .filter(|(k, _)| attrs.iter().any(|a| a.eq_ignore_ascii_case(k)))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            })
            .collect())
    }

    fn add(&mut self, dn: &str, attrs: &AttributeMap) -> Result<OperationResult, DirectoryError> {
        self.ops.push(Op::Add(dn.to_string()));
        if let Some(rejection) = self.reject_adds.get(dn) {
            return Ok(rejection.clone());
        }
        if self.entries.contains_key(dn) {
            return Ok(OperationResult {
                code: 68,
                message: "Entry Already Exists".to_string(),
            });
        }
        self.entries.insert(dn.to_string(), attrs.clone());
        Ok(OperationResult::success())
    }

    fn delete(&mut self, dn: &str) -> Result<OperationResult, DirectoryError> {
        self.ops.push(Op::Delete(dn.to_string()));
        match self.entries.remove(dn) {
            Some(_) => Ok(OperationResult::success()),
            None => Ok(OperationResult {
                code: 32,
                message: "No Such Object".to_string(),
            }),
        }
    }
}

/// Returns a different batch on each fetch.
struct ChangingSource(Vec<Vec<Record>>);

impl RecordSource for ChangingSource {
    fn fetch_all(&mut self) -> Result<Vec<Record>, SourceError> {
        Ok(self.0.remove(0))
    }
}

struct BrokenSource;

impl RecordSource for BrokenSource {
    fn fetch_all(&mut self) -> Result<Vec<Record>, SourceError> {
        Err(SourceError::Query {
            source: "ORA-12541: no listener".into(),
        })
    }
}

fn student(identity: &str, semester: &str) -> Record {
    Record::new(identity)
        .with(Field::FirstName, "Ada")
        .with(Field::LastName, "Lovelace")
        .with(Field::Semester, semester)
}

fn uid_only(identity: &str) -> AttributeMap {
    AttributeMap::from([("uid".to_string(), vec![identity.to_string()])])
}

fn dn(identity: &str) -> String {
    format!("uid={identity},{BASE}")
}

fn done(outcome: PassOutcome) -> Vec<WriteResult> {
    match outcome {
        PassOutcome::Done(report) => report.writes,
        other => panic!("expected done, got {other:?}"),
    }
}

fn run_pass(pass: Pass, records: &[Record], directory: &mut MemoryDirectory) -> Vec<WriteResult> {
    let outcome = driver::run(pass, &mut records.to_vec(), directory, RunOptions::default())
        .expect("run");
    done(outcome)
}

#[test]
fn new_then_update_end_to_end() {
    let v1 = student("a", "1");
    let c1 = fingerprint(&v1);
    let mut directory = MemoryDirectory::default();

    let writes = run_pass(Pass::New, &[v1], &mut directory);
    assert_eq!(writes.len(), 1);
    assert_eq!(directory.license_of(&dn("a")), Some(c1.as_str()));

    let v2 = student("a", "2");
    let c2 = fingerprint(&v2);
    assert_ne!(c1, c2);
    directory.ops.clear();

    let mut source = vec![v2];
    let mut driver = SyncDriver::new(&mut source, &mut directory, RunOptions::default());
    let writes = done(driver.run(Pass::Update).unwrap());
    assert_eq!(driver.state(), RunState::Done);
    let stale = ldapsync_sync::compute_stale_fingerprints(
        &driver.snapshot().source,
        &driver.snapshot().directory,
    );
    let expected: BTreeSet<Fingerprint> = [c2.clone()].into_iter().collect();
    assert_eq!(stale, expected);
    drop(driver);

    assert_eq!(
        writes,
        vec![WriteResult::Replaced {
            identity: "a".into(),
            dn: dn("a"),
        }]
    );
    assert_eq!(directory.ops, vec![Op::Delete(dn("a")), Op::Add(dn("a"))]);
    assert_eq!(directory.license_of(&dn("a")), Some(c2.as_str()));
}

#[test]
fn second_new_pass_writes_nothing() {
    let records = vec![student("a", "1"), student("b", "1"), student("c", "3")];
    let mut directory = MemoryDirectory::default();

    let first = run_pass(Pass::New, &records, &mut directory);
    assert_eq!(first.len(), 3);
    let writes_after_first = directory.writes();

    let second = run_pass(Pass::New, &records, &mut directory);
    assert!(second.is_empty());
    assert_eq!(directory.writes(), writes_after_first);
}

#[test]
fn new_covers_every_source_identity() {
    let mut directory = MemoryDirectory::default();
    directory.entries.insert(dn("b"), uid_only("b"));
    let mut source = vec![student("a", "1"), student("b", "1"), student("c", "1")];

    let mut driver = SyncDriver::new(&mut source, &mut directory, RunOptions::default());
    done(driver.run(Pass::New).unwrap());
    drop(driver);

    for id in ["a", "b", "c"] {
        assert!(directory.entries.contains_key(&dn(id)), "{id} missing");
    }
    assert_eq!(directory.ops, vec![Op::Add(dn("a")), Op::Add(dn("c"))]);
}

#[test]
fn update_aborts_without_writing_while_entries_are_missing() {
    let mut directory = MemoryDirectory::default();
    let mut source = vec![student("a", "1")];

    let mut driver = SyncDriver::new(&mut source, &mut directory, RunOptions::default());
    let outcome = driver.run(Pass::Update).unwrap();
    assert_eq!(driver.state(), RunState::Aborted);
    drop(driver);

    match outcome {
        PassOutcome::Aborted { missing } => {
            let expected: BTreeSet<IdentityKey> = [IdentityKey::from("a")].into_iter().collect();
            assert_eq!(missing, expected);
        }
        other => panic!("expected abort, got {other:?}"),
    }
    assert!(directory.ops.is_empty(), "update must not write while aborted");
}

#[test]
fn update_refreshes_entries_without_fingerprint() {
    let record = student("a", "1");
    let mut directory = MemoryDirectory::default();
    directory.entries.insert(dn("a"), uid_only("a"));

    let writes = run_pass(Pass::Update, &[record.clone()], &mut directory);

    assert_eq!(writes.len(), 1);
    assert_eq!(
        directory.license_of(&dn("a")),
        Some(fingerprint(&record).as_str())
    );
}

#[test]
fn update_is_noop_when_directory_is_current() {
    let records = vec![student("a", "1"), student("b", "2")];
    let mut directory = MemoryDirectory::default();
    run_pass(Pass::New, &records, &mut directory);
    directory.ops.clear();

    let writes = run_pass(Pass::Update, &records, &mut directory);
    assert!(writes.is_empty());
    assert!(directory.ops.is_empty());
}

#[test]
fn rejected_create_does_not_stop_the_batch() {
    let mut directory = MemoryDirectory::default();
    directory.reject_adds.insert(
        dn("b"),
        OperationResult {
            code: 65,
            message: "Object Class Violation".to_string(),
        },
    );
    let mut source = vec![student("a", "1"), student("b", "1"), student("c", "1")];

    let outcome =
        driver::run(Pass::New, &mut source, &mut directory, RunOptions::default()).unwrap();
    let PassOutcome::Done(report) = outcome else {
        panic!("expected done");
    };

    assert_eq!(report.writes.len(), 3);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.succeeded(), 2);
    assert!(directory.entries.contains_key(&dn("c")));
}

#[test]
fn source_failure_is_fatal_and_touches_nothing() {
    let mut directory = MemoryDirectory::default();
    let err = driver::run(Pass::New, &mut BrokenSource, &mut directory, RunOptions::default())
        .unwrap_err();
    assert!(matches!(err, SyncError::Source(_)), "got: {err}");
    assert!(directory.ops.is_empty());
}

#[test]
fn each_run_starts_from_a_clean_snapshot() {
    let mut directory = MemoryDirectory::default();
    let mut source = ChangingSource(vec![
        vec![student("a", "1"), student("gone", "1")],
        vec![student("a", "1")],
    ]);
    let mut driver = SyncDriver::new(&mut source, &mut directory, RunOptions::default());

    done(driver.run(Pass::New).unwrap());
    done(driver.run(Pass::Update).unwrap());

    let ids: Vec<&str> = driver
        .snapshot()
        .source
        .identities()
        .iter()
        .map(|k| k.as_str())
        .collect();
    assert_eq!(ids, vec!["a"], "previous run's identities must not linger");
}

#[test]
fn staging_dir_holds_the_last_loaded_snapshot() {
    let staging = TempDir::new().unwrap();
    let options = RunOptions {
        staging_dir: Some(staging.path().to_path_buf()),
        ..RunOptions::default()
    };
    let mut directory = MemoryDirectory::default();

    let mut source = vec![student("a", "1")];
    done(driver::run(Pass::New, &mut source, &mut directory, options.clone()).unwrap());
    let staged = snapshot::load_at(staging.path()).unwrap();
    assert_eq!(staged.source.identities().len(), 1);
    assert!(staged.directory.identities().is_empty());
    assert!(staged.loaded_at.is_some());

    done(driver::run(Pass::New, &mut source, &mut directory, options).unwrap());
    let staged = snapshot::load_at(staging.path()).unwrap();
    assert_eq!(staged.directory.identities().len(), 1);
}
