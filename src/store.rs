use chrono::{Duration, NaiveDate, SubsecRound, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::board;
use crate::models::{Job, JobDraft, JobPatch, Moment, Settings, Snapshot, Status, Timestamp};
use crate::slots::SlotStore;
use crate::stats::Stats;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("content is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid data format: {0}")]
    InvalidFormat(String),
    #[error("failed to encode snapshot")]
    Encode(#[source] serde_json::Error),
    #[error("storage failure")]
    Storage(#[source] anyhow::Error),
    #[error("file access failed for {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub trait Clock {
    fn now(&self) -> Timestamp;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Owns the snapshot and rewrites it to its slot after every mutation.
pub struct Store<S: SlotStore> {
    slots: S,
    key: String,
    clock: Box<dyn Clock>,
    snapshot: Snapshot,
    loaded: bool,
}

impl<S: SlotStore> Store<S> {
    /// A store that has not read its slot yet. Mutations are held in memory
    /// and not written until `load` has run, so the empty default can never
    /// clobber stored data.
    pub fn new(slots: S, key: impl Into<String>) -> Self {
        Self {
            slots,
            key: key.into(),
            clock: Box::new(SystemClock),
            snapshot: Snapshot::default(),
            loaded: false,
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn open(slots: S, key: impl Into<String>) -> Result<Self, StoreError> {
        let mut store = Self::new(slots, key);
        store.load()?;
        Ok(store)
    }

    /// Reads the slot. A missing slot, or one that is not a JSON object, leaves
    /// the empty default in place; only a failure of the storage itself is
    /// returned. Jobs with fields of an unexpected shape load as they are.
    pub fn load(&mut self) -> Result<(), StoreError> {
        let stored = self.slots.read(&self.key).map_err(StoreError::Storage)?;
        self.snapshot = match stored {
            None => {
                debug!(key = %self.key, "No stored snapshot, starting empty");
                Snapshot::default()
            }
            Some(bytes) => match serde_json::from_slice::<Value>(&bytes) {
                Ok(Value::Object(root)) => {
                    let mut snapshot = Snapshot::from_object(root);
                    repair_ids(&mut snapshot);
                    debug!(key = %self.key, jobs = snapshot.jobs.len(), "Loaded snapshot");
                    snapshot
                }
                Ok(other) => {
                    error!(key = %self.key, found = %other, "Stored data is not an object, starting empty");
                    Snapshot::default()
                }
                Err(e) => {
                    error!(key = %self.key, error = %e, "Failed to parse stored data, starting empty");
                    Snapshot::default()
                }
            },
        };
        self.loaded = true;
        Ok(())
    }

    #[cfg(test)]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn jobs(&self) -> &[Job] {
        &self.snapshot.jobs
    }

    pub fn get(&self, id: &str) -> Option<&Job> {
        self.snapshot.jobs.iter().find(|j| j.id == id)
    }

    pub fn settings(&self) -> &Settings {
        &self.snapshot.settings
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    #[cfg(test)]
    pub fn slots(&self) -> &S {
        &self.slots
    }

    pub fn stats(&self, today: NaiveDate) -> Stats {
        Stats::compute(self.jobs(), today)
    }

    // --- Mutations ---

    pub fn create(&mut self, draft: JobDraft) -> Result<Job, StoreError> {
        let taken: HashSet<&str> = self.snapshot.jobs.iter().map(|j| j.id.as_str()).collect();
        let id = unique_id(&taken);
        let job = draft.into_job(id, self.stamp(None));

        info!(id = %job.id, company = %job.company, title = %job.title, "Created job");
        self.snapshot.jobs.push(job.clone());
        self.persist()?;
        Ok(job)
    }

    /// Merges `patch` into the job. Returns `false` without touching anything
    /// when no job has that id.
    pub fn update(&mut self, id: &str, patch: JobPatch) -> Result<bool, StoreError> {
        let Some(idx) = self.position(id) else {
            debug!(id, "Update of unknown job ignored");
            return Ok(false);
        };
        let stamp = self.stamp(self.updated_at(idx));
        let job = &mut self.snapshot.jobs[idx];
        patch.apply_to(job);
        job.touch(stamp);

        info!(id, "Updated job");
        self.persist()?;
        Ok(true)
    }

    pub fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
        let Some(idx) = self.position(id) else {
            debug!(id, "Delete of unknown job ignored");
            return Ok(false);
        };
        let job = self.snapshot.jobs.remove(idx);

        info!(id, company = %job.company, "Deleted job");
        self.persist()?;
        Ok(true)
    }

    /// Sets the job's status. Any stage may follow any other; moving to the
    /// status the job already has changes nothing. Returns whether the job moved.
    pub fn move_job(&mut self, id: &str, status: Status) -> Result<bool, StoreError> {
        let Some(idx) = self.position(id) else {
            debug!(id, "Move of unknown job ignored");
            return Ok(false);
        };
        if self.snapshot.jobs[idx].status == status {
            debug!(id, status = %status, "Job already has this status");
            return Ok(false);
        }
        let stamp = self.stamp(self.updated_at(idx));
        let job = &mut self.snapshot.jobs[idx];
        let from = job.set_status(status);
        job.touch(stamp);

        info!(id, from = %from, to = %job.status, "Moved job");
        self.persist()?;
        Ok(true)
    }

    /// A card was dropped on `target` (a column id, or `None` when it landed
    /// outside every column).
    pub fn drop_card(&mut self, id: &str, target: Option<&str>) -> Result<bool, StoreError> {
        let Some(job) = self.get(id) else {
            return Ok(false);
        };
        match board::drop_target(&job.status, target) {
            Some(stage) => self.move_job(id, stage.into()),
            None => Ok(false),
        }
    }

    // --- Backup ---

    pub fn export_json(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(&self.snapshot).map_err(StoreError::Encode)
    }

    pub fn backup_file_name(&self) -> String {
        backup_file_name(self.clock.now().date_naive())
    }

    /// Writes the pretty-printed snapshot to `jobboard_backup_<date>.json` in `dir`.
    pub fn export_to(&self, dir: &Path) -> Result<PathBuf, StoreError> {
        let path = dir.join(self.backup_file_name());
        let body = self.export_json()?;
        std::fs::write(&path, body).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), jobs = self.snapshot.jobs.len(), "Exported backup");
        Ok(path)
    }

    /// Replaces the whole snapshot with `contents`. Jobs without an id get one;
    /// job fields of an unexpected shape are kept as they are. Returns the
    /// number of imported jobs.
    pub fn import_str(&mut self, contents: &str) -> Result<usize, StoreError> {
        let value: Value = serde_json::from_str(contents)?;
        let mut snapshot = snapshot_from_import(value)?;
        repair_ids(&mut snapshot);

        let count = snapshot.jobs.len();
        self.snapshot = snapshot;
        info!(jobs = count, "Imported snapshot");
        self.persist()?;
        Ok(count)
    }

    pub fn import_file(&mut self, path: &Path) -> Result<usize, StoreError> {
        let contents = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.import_str(&contents)
    }

    // --- Internals ---

    fn position(&self, id: &str) -> Option<usize> {
        self.snapshot.jobs.iter().position(|j| j.id == id)
    }

    fn updated_at(&self, idx: usize) -> Option<Timestamp> {
        self.snapshot.jobs[idx].updated_at.as_ref().and_then(Moment::at)
    }

    /// Current time at millisecond precision, forced past `prev` so a job's
    /// `updatedAt` always moves forward.
    fn stamp(&self, prev: Option<Timestamp>) -> Timestamp {
        let now = self.clock.now().trunc_subsecs(3);
        match prev {
            Some(prev) if now <= prev => prev + Duration::milliseconds(1),
            _ => now,
        }
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        if !self.loaded {
            debug!(key = %self.key, "Store not loaded yet, skipping write");
            return Ok(());
        }
        let bytes = serde_json::to_vec(&self.snapshot).map_err(StoreError::Encode)?;
        self.slots
            .write(&self.key, &bytes)
            .map_err(StoreError::Storage)?;
        debug!(key = %self.key, bytes = bytes.len(), "Persisted snapshot");
        Ok(())
    }
}

pub fn backup_file_name(date: NaiveDate) -> String {
    format!("jobboard_backup_{}.json", date.format("%Y-%m-%d"))
}

/// The only shapes import refuses: anything but an object holding a `jobs`
/// array, and `jobs` entries that are not objects. Everything inside a job or
/// under `settings` is read leniently.
fn snapshot_from_import(value: Value) -> Result<Snapshot, StoreError> {
    let Value::Object(root) = value else {
        return Err(StoreError::InvalidFormat(
            "expected an object with a `jobs` array".to_string(),
        ));
    };
    let Some(Value::Array(jobs)) = root.get("jobs") else {
        return Err(StoreError::InvalidFormat(
            "missing `jobs` array".to_string(),
        ));
    };
    if let Some(pos) = jobs.iter().position(|job| !job.is_object()) {
        return Err(StoreError::InvalidFormat(format!(
            "job at index {} is not an object",
            pos
        )));
    }
    Ok(Snapshot::from_object(root))
}

/// Gives every job without an id, or with an id already used earlier in the
/// list, a fresh one.
fn repair_ids(snapshot: &mut Snapshot) {
    let mut taken: HashSet<String> = snapshot.jobs.iter().map(|j| j.id.clone()).collect();
    let mut seen: HashSet<String> = HashSet::new();
    for job in snapshot.jobs.iter_mut() {
        if !job.id.is_empty() && seen.insert(job.id.clone()) {
            continue;
        }
        if !job.id.is_empty() {
            warn!(id = %job.id, company = %job.company, "Duplicate job id, assigning a new one");
        }
        let id = {
            let refs: HashSet<&str> = taken.iter().map(String::as_str).collect();
            unique_id(&refs)
        };
        taken.insert(id.clone());
        seen.insert(id.clone());
        job.id = id;
    }
}

fn unique_id(taken: &HashSet<&str>) -> String {
    loop {
        let id = Uuid::new_v4().to_string();
        if !taken.contains(id.as_str()) {
            return id;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{parse_timestamp, Stage};
    use crate::slots::MemorySlots;
    use assert_matches::assert_matches;
    use std::cell::Cell;
    use std::rc::Rc;

    const KEY: &str = "jobboard_pro_data";

    #[derive(Clone)]
    pub(crate) struct ManualClock(Rc<Cell<Timestamp>>);

    impl ManualClock {
        pub(crate) fn at(raw: &str) -> Self {
            Self(Rc::new(Cell::new(parse_timestamp(raw).unwrap())))
        }

        pub(crate) fn advance_ms(&self, ms: i64) {
            self.0.set(self.0.get() + Duration::milliseconds(ms));
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Timestamp {
            self.0.get()
        }
    }

    fn store() -> (Store<MemorySlots>, ManualClock) {
        let clock = ManualClock::at("2025-03-10T12:00:00.000Z");
        let store = Store::open(MemorySlots::new(), KEY)
            .unwrap()
            .with_clock(clock.clone());
        (store, clock)
    }

    fn stored_snapshot(store: &Store<MemorySlots>) -> Snapshot {
        let bytes = store.slots().read(KEY).unwrap().unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn stored_value(store: &Store<MemorySlots>) -> Value {
        let bytes = store.slots().read(KEY).unwrap().unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_create_assigns_unique_ids_and_timestamps() {
        let (mut store, clock) = store();
        let mut ids = HashSet::new();
        for i in 0..20 {
            let job = store.create(JobDraft::new(format!("Co {}", i), "Eng")).unwrap();
            assert_eq!(Uuid::parse_str(&job.id).unwrap().get_version_num(), 4);
            assert!(job.created_at <= job.updated_at);
            assert!(ids.insert(job.id));
            clock.advance_ms(5);
        }
        assert_eq!(store.jobs().len(), 20);
        assert_eq!(store.slots().writes(), 20);
        assert_eq!(stored_snapshot(&store), *store.snapshot());
    }

    #[test]
    fn test_create_keeps_insertion_order() {
        let (mut store, _) = store();
        store.create(JobDraft::new("A", "1")).unwrap();
        store.create(JobDraft::new("B", "2")).unwrap();
        store.create(JobDraft::new("C", "3")).unwrap();
        let names: Vec<&str> = store.jobs().iter().map(|j| j.company.as_str()).collect();
        assert_eq!(names, ["A", "B", "C"]);
    }

    #[test]
    fn test_update_merges_and_bumps_updated_at() {
        let (mut store, _) = store();
        let job = store.create(JobDraft::new("Acme", "Eng")).unwrap();

        // clock does not move, updatedAt must still advance
        let found = store
            .update(&job.id, JobPatch { salary: Some("$180k".into()), ..JobPatch::default() })
            .unwrap();
        assert!(found);

        let after = store.get(&job.id).unwrap();
        assert_eq!(after.salary.as_deref(), Some("$180k"));
        assert!(after.updated_at > job.updated_at);
        assert_eq!(after.created_at, job.created_at);
        assert_eq!(after.company, job.company);
        assert_eq!(after.title, job.title);
        assert_eq!(after.status, job.status);
        assert_eq!(after.source, job.source);
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let (mut store, _) = store();
        store.create(JobDraft::new("Acme", "Eng")).unwrap();
        let before = store.snapshot().clone();

        assert!(!store.update("missing", JobPatch::status(Stage::Done)).unwrap());
        assert_eq!(*store.snapshot(), before);
        assert_eq!(store.slots().writes(), 1);
    }

    #[test]
    fn test_move_to_same_status_is_noop() {
        let (mut store, clock) = store();
        let job = store
            .create(JobDraft::new("Acme", "Eng").with_status(Stage::Applied))
            .unwrap();
        clock.advance_ms(1000);

        assert!(!store.move_job(&job.id, Stage::Applied.into()).unwrap());
        assert_eq!(store.get(&job.id).unwrap().updated_at, job.updated_at);
        assert_eq!(store.slots().writes(), 1);
    }

    #[test]
    fn test_move_skips_pipeline_order() {
        let (mut store, clock) = store();
        let job = store.create(JobDraft::new("Acme", "Eng")).unwrap();
        clock.advance_ms(1000);

        assert!(store.move_job(&job.id, Stage::Done.into()).unwrap());
        let moved = store.get(&job.id).unwrap();
        assert_eq!(moved.status, Status::Stage(Stage::Done));
        assert_eq!(
            moved.updated_at.as_ref().map(Moment::as_str),
            Some("2025-03-10T12:00:01.000Z")
        );

        // and back out of done
        assert!(store.move_job(&job.id, Stage::Todo.into()).unwrap());
        assert_eq!(store.get(&job.id).unwrap().status, Status::Stage(Stage::Todo));
    }

    #[test]
    fn test_move_accepts_unrecognized_status() {
        let (mut store, _) = store();
        let job = store.create(JobDraft::new("Acme", "Eng")).unwrap();

        let status = Status::admit("ghosted").unwrap();
        assert!(store.move_job(&job.id, status.clone()).unwrap());
        assert_eq!(stored_snapshot(&store).jobs[0].status, status);
    }

    #[test]
    fn test_delete() {
        let (mut store, _) = store();
        let a = store.create(JobDraft::new("A", "1")).unwrap();
        store.create(JobDraft::new("B", "2")).unwrap();

        assert!(store.delete(&a.id).unwrap());
        assert_eq!(store.jobs().len(), 1);
        assert!(store.get(&a.id).is_none());

        assert!(!store.delete(&a.id).unwrap());
        assert_eq!(store.jobs().len(), 1);
        assert_eq!(stored_snapshot(&store).jobs.len(), 1);
    }

    #[test]
    fn test_drop_card() {
        let (mut store, _) = store();
        let job = store.create(JobDraft::new("Acme", "Eng")).unwrap();

        assert!(!store.drop_card(&job.id, None).unwrap());
        assert!(!store.drop_card(&job.id, Some("todo")).unwrap());
        assert!(!store.drop_card(&job.id, Some("sidebar")).unwrap());
        assert!(!store.drop_card("missing", Some("done")).unwrap());
        assert_eq!(store.slots().writes(), 1);

        assert!(store.drop_card(&job.id, Some("interview")).unwrap());
        assert_eq!(
            store.get(&job.id).unwrap().status,
            Status::Stage(Stage::Interview)
        );
    }

    #[test]
    fn test_export_import_round_trip() {
        let (mut store, clock) = store();
        let a = store.create(JobDraft::new("Acme", "Eng")).unwrap();
        clock.advance_ms(10);
        store.create(JobDraft::new("Globex", "SRE").with_status(Stage::Interview)).unwrap();
        store.move_job(&a.id, Stage::Applied.into()).unwrap();
        let exported = store.export_json().unwrap();

        let (mut other, _) = super::tests::store();
        other.create(JobDraft::new("Stale", "Gone")).unwrap();
        assert_eq!(other.import_str(&exported).unwrap(), 2);
        assert_eq!(other.snapshot(), store.snapshot());
        assert_eq!(other.get(&a.id).unwrap().status, Status::Stage(Stage::Applied));
    }

    #[test]
    fn test_import_generates_missing_ids() {
        let (mut store, _) = store();
        let count = store
            .import_str(r#"{"jobs":[{"company":"Acme","title":"Eng"}]}"#)
            .unwrap();
        assert_eq!(count, 1);

        let job = &store.jobs()[0];
        assert_eq!(job.id.len(), 36);
        assert_eq!(job.company, "Acme");
        assert_eq!(store.settings(), &Settings::default());
        assert_eq!(stored_snapshot(&store).jobs[0].id, job.id);
    }

    #[test]
    fn test_import_rejects_bad_input() {
        let (mut store, _) = store();
        store.create(JobDraft::new("Keep", "Me")).unwrap();

        assert_matches!(store.import_str("not json"), Err(StoreError::Parse(_)));
        assert_matches!(store.import_str(r#"{"foo":1}"#), Err(StoreError::InvalidFormat(_)));
        assert_matches!(store.import_str(r#"{"jobs":{}}"#), Err(StoreError::InvalidFormat(_)));
        assert_matches!(store.import_str(r#"[1,2]"#), Err(StoreError::InvalidFormat(_)));
        // a job that is not an object has nowhere to hold an id
        assert_matches!(
            store.import_str(r#"{"jobs":["just a string"]}"#),
            Err(StoreError::InvalidFormat(_))
        );

        assert_eq!(store.jobs().len(), 1);
        assert_eq!(store.jobs()[0].company, "Keep");
    }

    #[test]
    fn test_import_replaces_and_keeps_unknown_keys() {
        let (mut store, _) = store();
        store.create(JobDraft::new("Old", "Job")).unwrap();

        let contents = r#"{
            "jobs": [
                {"id": 7, "company": "A", "title": "x", "status": "interview"},
                {"id": "dup", "company": "B", "title": "y"},
                {"id": "dup", "company": "C", "title": "z"},
                {"id": "", "company": "D", "title": "w"}
            ],
            "settings": {"theme": "light"},
            "exportedBy": "v2"
        }"#;
        assert_eq!(store.import_str(contents).unwrap(), 4);

        let jobs = store.jobs();
        assert_eq!(jobs[0].id, "7");
        assert_eq!(jobs[1].id, "dup");
        assert_ne!(jobs[2].id, "dup");
        assert!(!jobs[3].id.is_empty());
        assert!(jobs.iter().all(|j| j.company != "Old"));

        assert_eq!(store.settings().theme, "light");
        assert_eq!(store.settings().default_resume, "");
        let exported: Value = serde_json::from_str(&store.export_json().unwrap()).unwrap();
        assert_eq!(exported["exportedBy"], "v2");
    }

    #[test]
    fn test_import_accepts_loose_backups() {
        let (mut store, _) = store();
        let contents = r#"{
            "jobs": [
                {"id": "a", "company": "Acme", "title": "Eng", "createdAt": "2025-03-01"},
                {"id": 9, "company": "Globex", "title": "SRE", "salary": 95000, "url": null}
            ],
            "settings": null
        }"#;
        assert_eq!(store.import_str(contents).unwrap(), 2);
        assert_eq!(store.settings(), &Settings::default());

        let jobs = store.jobs();
        assert_eq!(
            jobs[0].created_at.as_ref().and_then(Moment::at),
            Some(parse_timestamp("2025-03-01T00:00:00.000Z").unwrap())
        );
        assert_eq!(jobs[1].id, "9");

        let exported: Value = serde_json::from_str(&store.export_json().unwrap()).unwrap();
        assert_eq!(exported["jobs"][0]["createdAt"], "2025-03-01");
        assert_eq!(exported["jobs"][1]["salary"], 95000);
        assert_eq!(exported["jobs"][1]["url"], Value::Null);
    }

    #[test]
    fn test_timestamps_written_elsewhere_round_trip_verbatim() {
        let (mut store, _) = store();
        let contents = r#"{"jobs":[{"id":"x","company":"A","title":"B","status":"todo","createdAt":"2025-03-10T00:30:00+02:00","updatedAt":"2025-03-10T00:31:00.5+02:00"}],"settings":{"theme":"dark","defaultResume":""}}"#;
        store.import_str(contents).unwrap();

        let bytes = store.slots().read(KEY).unwrap().unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), contents);

        // only the value the store stamps itself changes
        store.move_job("x", Stage::Applied.into()).unwrap();
        let job = store.get("x").unwrap();
        assert_eq!(
            job.created_at.as_ref().map(Moment::as_str),
            Some("2025-03-10T00:30:00+02:00")
        );
        assert_eq!(
            job.updated_at.as_ref().map(Moment::as_str),
            Some("2025-03-10T12:00:00.000Z")
        );
    }

    #[test]
    fn test_load_keeps_jobs_with_unexpected_field_types() {
        let slot = r#"{
            "jobs": [
                {"id": "a", "company": "Acme", "title": "Eng", "status": "applied"},
                {"id": "b", "company": "Globex", "title": "SRE", "salary": 120000,
                 "notes": null, "createdAt": "2025-03-01"},
                {"id": 42, "company": "Initech", "title": "Dev"}
            ],
            "settings": {"theme": "light"}
        }"#;
        let mut store = Store::open(MemorySlots::with_slot(KEY, slot), KEY).unwrap();
        assert_eq!(store.jobs().len(), 3);
        assert_eq!(store.get("b").unwrap().company, "Globex");
        assert_eq!(store.get("42").unwrap().company, "Initech");
        assert_eq!(store.settings().theme, "light");

        store.create(JobDraft::new("New", "Job")).unwrap();
        let stored = stored_value(&store);
        assert_eq!(stored["jobs"].as_array().unwrap().len(), 4);
        assert_eq!(stored["jobs"][1]["salary"], 120000);
        assert_eq!(stored["jobs"][1]["notes"], Value::Null);
        assert_eq!(stored["jobs"][1]["createdAt"], "2025-03-01");
        assert_eq!(stored["jobs"][2]["id"], "42");
        assert_eq!(stored["settings"]["theme"], "light");
    }

    #[test]
    fn test_load_preserves_unknown_keys_through_writes() {
        let slot = r#"{"jobs":[{"id":"a","company":"Acme","title":"Eng","starred":true}],"version":3}"#;
        let mut store = Store::open(MemorySlots::with_slot(KEY, slot), KEY).unwrap();
        assert_eq!(store.settings(), &Settings::default());

        store.create(JobDraft::new("Globex", "SRE")).unwrap();
        let stored = stored_value(&store);
        assert_eq!(stored["version"], 3);
        assert_eq!(stored["jobs"][0]["starred"], true);
        assert_eq!(stored["jobs"][0]["company"], "Acme");
        assert_eq!(stored["jobs"][1]["company"], "Globex");
        assert_eq!(stored["settings"]["theme"], "dark");
    }

    #[test]
    fn test_load_non_object_slot_starts_empty() {
        let store = Store::open(MemorySlots::with_slot(KEY, "[1,2,3]"), KEY).unwrap();
        assert!(store.is_loaded());
        assert!(store.jobs().is_empty());
    }

    #[test]
    fn test_load_corrupt_slot_starts_empty() {
        let mut store = Store::new(MemorySlots::with_slot(KEY, "{oops"), KEY);
        assert!(!store.is_loaded());
        store.load().unwrap();
        assert!(store.is_loaded());
        assert!(store.jobs().is_empty());
    }

    #[test]
    fn test_load_reads_previous_session() {
        let (mut store, _) = store();
        let job = store.create(JobDraft::new("Acme", "Eng")).unwrap();

        let reopened = Store::open(store.slots().clone(), KEY).unwrap();
        assert_eq!(reopened.get(&job.id), Some(&job));
    }

    #[test]
    fn test_no_write_before_load() {
        let mut store = Store::new(MemorySlots::with_slot(KEY, r#"{"jobs":[]}"#), KEY);
        store.create(JobDraft::new("Acme", "Eng")).unwrap();
        assert_eq!(store.slots().writes(), 0);
    }

    #[test]
    fn test_export_to_dated_file() {
        let (mut store, _) = store();
        store.create(JobDraft::new("Acme", "Eng")).unwrap();

        let dir = std::env::temp_dir().join(format!("jobboard-export-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = store.export_to(&dir).unwrap();
        assert_eq!(path.file_name().unwrap(), "jobboard_backup_2025-03-10.json");

        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.contains("\n  \"jobs\": ["));
        let snapshot: Snapshot = serde_json::from_str(&body).unwrap();
        assert_eq!(snapshot, *store.snapshot());

        let (mut restored, _) = super::tests::store();
        assert_eq!(restored.import_file(&path).unwrap(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_import_missing_file() {
        let (mut store, _) = store();
        let result = store.import_file(Path::new("/nonexistent/backup.json"));
        assert_matches!(result, Err(StoreError::Io { .. }));
    }

    #[test]
    fn test_stats_scenario() {
        let (mut store, _) = store();
        store.create(JobDraft::new("A", "1").with_status(Stage::Todo)).unwrap();
        store.create(JobDraft::new("B", "2").with_status(Stage::Applied)).unwrap();
        store.create(JobDraft::new("C", "3").with_status(Stage::Applied)).unwrap();

        let stats = store.stats(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(stats.counts.total, 3);
        assert_eq!(stats.counts.todo, 1);
        assert_eq!(stats.counts.applied, 2);
        assert_eq!(stats.counts.interview, 0);
        assert_eq!(stats.counts.done, 0);
        assert_eq!(stats.interview_rate, 0);
    }
}
