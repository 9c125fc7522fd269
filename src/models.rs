use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

pub type Timestamp = DateTime<Utc>;

/// Rejects status labels outside the four pipeline stages when set.
/// Kept off so that `move` persists whatever label the caller hands it.
pub const STRICT_STATUS: bool = false;

/// ISO-8601 with millisecond precision and a `Z` suffix, e.g. `2025-03-01T09:15:00.000Z`.
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(raw: &str) -> Result<Timestamp, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|t| t.with_timezone(&Utc))
}

/// A timestamp as it is stored. The text is kept as written so values that
/// came from elsewhere go back out byte for byte; `at` is the instant it
/// denotes, when it parses. A bare date counts as midnight UTC.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Moment {
    at: Option<Timestamp>,
    raw: String,
}

impl Moment {
    pub fn stamped(at: Timestamp) -> Self {
        Self {
            raw: format_timestamp(&at),
            at: Some(at),
        }
    }

    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let at = parse_timestamp(&raw).ok().or_else(|| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        });
        Self { at, raw }
    }

    pub fn at(&self) -> Option<Timestamp> {
        self.at
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Moment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Moves `key` out of `obj` when `decode` accepts its value. A value it
/// rejects stays in `obj`, and so travels on with the record's unknown fields.
fn take<T>(
    obj: &mut Map<String, Value>,
    key: &str,
    decode: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    let value = decode(obj.get(key)?)?;
    obj.shift_remove(key);
    Some(value)
}

fn text(v: &Value) -> Option<String> {
    v.as_str().map(str::to_string)
}

// --- Pipeline ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Todo,
    Applied,
    Interview,
    Done,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Todo, Stage::Applied, Stage::Interview, Stage::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Todo => "todo",
            Stage::Applied => "applied",
            Stage::Interview => "interview",
            Stage::Done => "done",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Stage::Todo => "To Apply",
            Stage::Applied => "Applied",
            Stage::Interview => "Interview",
            Stage::Done => "Done",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Stage::Todo => 0,
            Stage::Applied => 1,
            Stage::Interview => 2,
            Stage::Done => 3,
        }
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(Stage::Todo),
            "applied" => Ok(Stage::Applied),
            "interview" => Ok(Stage::Interview),
            "done" => Ok(Stage::Done),
            other => Err(format!(
                "unknown status '{}' (expected todo, applied, interview or done)",
                other
            )),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job's status as stored. Anything that is not one of the four stages is
/// kept verbatim so it survives a save/load cycle untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    Stage(Stage),
    Unrecognized(String),
}

impl Status {
    /// The one place a requested status label is checked.
    pub fn admit(raw: &str) -> Result<Status, String> {
        match raw.parse::<Stage>() {
            Ok(stage) => Ok(Status::Stage(stage)),
            Err(e) if STRICT_STATUS => Err(e),
            Err(_) => Ok(Status::Unrecognized(raw.to_string())),
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Status::Stage(stage) => Some(*stage),
            Status::Unrecognized(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Status::Stage(stage) => stage.as_str(),
            Status::Unrecognized(raw) => raw,
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Stage(Stage::Todo)
    }
}

impl From<Stage> for Status {
    fn from(stage: Stage) -> Self {
        Status::Stage(stage)
    }
}

impl From<String> for Status {
    fn from(raw: String) -> Self {
        match raw.parse::<Stage>() {
            Ok(stage) => Status::Stage(stage),
            Err(_) => Status::Unrecognized(raw),
        }
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        match status {
            Status::Stage(stage) => stage.as_str().to_string(),
            Status::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority '{}' (expected low, medium or high)", other)),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Records ---

/// One tracked application. Stored as a camelCase JSON object; known keys
/// whose value has an unexpected shape (a numeric salary, a null note) are
/// left in `extra` untouched and written back exactly as they came in.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: String,
    pub company: String,
    pub title: String,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub salary: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub source: Option<String>, // "LinkedIn", "Referral", ...
    pub resume_used: Option<String>,
    pub priority: Option<Priority>,
    pub status: Status,
    pub created_at: Option<Moment>,
    pub updated_at: Option<Moment>,
    /// Fields this version does not know about, carried through untouched.
    pub extra: Map<String, Value>,
}

impl Job {
    /// Never fails: whatever cannot be read into a typed field is kept in `extra`.
    pub fn from_object(mut obj: Map<String, Value>) -> Job {
        let id = take(&mut obj, "id", |v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_default();
        // an id of any other shape is replaced, never carried alongside
        obj.shift_remove("id");
        let status = match take(&mut obj, "status", text) {
            Some(raw) => Status::from(raw),
            None => match obj.get("status") {
                Some(odd) => Status::Unrecognized(odd.to_string()),
                None => Status::default(),
            },
        };

        Job {
            id,
            company: take(&mut obj, "company", text).unwrap_or_default(),
            title: take(&mut obj, "title", text).unwrap_or_default(),
            location: take(&mut obj, "location", text),
            job_type: take(&mut obj, "type", text),
            salary: take(&mut obj, "salary", text),
            url: take(&mut obj, "url", text),
            notes: take(&mut obj, "notes", text),
            source: take(&mut obj, "source", text),
            resume_used: take(&mut obj, "resumeUsed", text),
            priority: take(&mut obj, "priority", |v| v.as_str()?.parse().ok()),
            status,
            created_at: take(&mut obj, "createdAt", |v| v.as_str().map(Moment::parse)),
            updated_at: take(&mut obj, "updatedAt", |v| v.as_str().map(Moment::parse)),
            extra: obj,
        }
    }

    /// The stored form. A typed field is skipped when `extra` still holds the
    /// value that came in under its key.
    pub fn to_object(&self) -> Map<String, Value> {
        let mut obj = Map::new();
        let mut put = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                if !self.extra.contains_key(key) {
                    obj.insert(key.to_string(), value);
                }
            }
        };
        let opt = |v: &Option<String>| v.clone().map(Value::String);

        put("id", Some(self.id.clone().into()));
        put("company", Some(self.company.clone().into()));
        put("title", Some(self.title.clone().into()));
        put("location", opt(&self.location));
        put("type", opt(&self.job_type));
        put("salary", opt(&self.salary));
        put("url", opt(&self.url));
        put("notes", opt(&self.notes));
        put("source", opt(&self.source));
        put("resumeUsed", opt(&self.resume_used));
        put("priority", self.priority.map(|p| p.as_str().into()));
        put("status", Some(self.status.as_str().into()));
        put("createdAt", self.created_at.as_ref().map(|m| m.as_str().into()));
        put("updatedAt", self.updated_at.as_ref().map(|m| m.as_str().into()));

        for (key, value) in &self.extra {
            obj.insert(key.clone(), value.clone());
        }
        obj
    }

    pub fn set_status(&mut self, status: Status) -> Status {
        self.extra.shift_remove("status");
        std::mem::replace(&mut self.status, status)
    }

    pub(crate) fn touch(&mut self, at: Timestamp) {
        self.extra.shift_remove("updatedAt");
        self.updated_at = Some(Moment::stamped(at));
    }

    /// Case-insensitive substring match over company, title and source.
    pub fn matches_query(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let query = query.to_lowercase();
        self.company.to_lowercase().contains(&query)
            || self.title.to_lowercase().contains(&query)
            || self
                .source
                .as_deref()
                .is_some_and(|s| s.to_lowercase().contains(&query))
    }
}

impl Serialize for Job {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.to_object().serialize(s)
    }
}

impl<'de> Deserialize<'de> for Job {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Map::deserialize(d).map(Job::from_object)
    }
}

/// Everything the user fills in when adding a job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDraft {
    pub company: String,
    pub title: String,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub salary: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub source: Option<String>,
    pub resume_used: Option<String>,
    pub priority: Priority,
    pub status: Status,
}

impl JobDraft {
    pub fn new(company: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            title: title.into(),
            location: None,
            job_type: Some("Full-time".to_string()),
            salary: None,
            url: None,
            notes: None,
            source: Some("LinkedIn".to_string()),
            resume_used: Some("Resume - General".to_string()),
            priority: Priority::Medium,
            status: Status::default(),
        }
    }

    #[cfg(test)]
    pub fn with_status(mut self, status: impl Into<Status>) -> Self {
        self.status = status.into();
        self
    }

    #[cfg(test)]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[cfg(test)]
    pub fn with_resume(mut self, resume: impl Into<String>) -> Self {
        self.resume_used = Some(resume.into());
        self
    }

    pub(crate) fn into_job(self, id: String, now: Timestamp) -> Job {
        Job {
            id,
            company: self.company,
            title: self.title,
            location: self.location,
            job_type: self.job_type,
            salary: self.salary,
            url: self.url,
            notes: self.notes,
            source: self.source,
            resume_used: self.resume_used,
            priority: Some(self.priority),
            status: self.status,
            created_at: Some(Moment::stamped(now)),
            updated_at: Some(Moment::stamped(now)),
            extra: Map::new(),
        }
    }
}

/// A shallow partial update: every `Some` field overwrites the job's value.
/// For optional text fields an empty string clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    pub company: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub salary: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub source: Option<String>,
    pub resume_used: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
}

impl JobPatch {
    #[cfg(test)]
    pub fn status(status: impl Into<Status>) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub(crate) fn apply_to(self, job: &mut Job) {
        // A field the patch sets replaces whatever odd value sat under its key.
        fn set<T>(extra: &mut Map<String, Value>, key: &str, target: &mut T, value: Option<T>) {
            if let Some(v) = value {
                extra.shift_remove(key);
                *target = v;
            }
        }
        fn clearable(value: Option<String>) -> Option<Option<String>> {
            value.map(|v| if v.is_empty() { None } else { Some(v) })
        }

        let extra = &mut job.extra;
        set(extra, "company", &mut job.company, self.company);
        set(extra, "title", &mut job.title, self.title);
        set(extra, "location", &mut job.location, clearable(self.location));
        set(extra, "type", &mut job.job_type, clearable(self.job_type));
        set(extra, "salary", &mut job.salary, clearable(self.salary));
        set(extra, "url", &mut job.url, clearable(self.url));
        set(extra, "notes", &mut job.notes, clearable(self.notes));
        set(extra, "source", &mut job.source, clearable(self.source));
        set(extra, "resumeUsed", &mut job.resume_used, clearable(self.resume_used));
        set(extra, "priority", &mut job.priority, self.priority.map(Some));
        set(extra, "status", &mut job.status, self.status);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub theme: String,
    pub default_resume: String,
    pub extra: Map<String, Value>,
}

impl Settings {
    pub fn from_object(mut obj: Map<String, Value>) -> Settings {
        let defaults = Settings::default();
        Settings {
            theme: take(&mut obj, "theme", text).unwrap_or(defaults.theme),
            default_resume: take(&mut obj, "defaultResume", text).unwrap_or_default(),
            extra: obj,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            default_resume: String::new(),
            extra: Map::new(),
        }
    }
}

impl Serialize for Settings {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(None)?;
        for (key, value) in [("theme", &self.theme), ("defaultResume", &self.default_resume)] {
            if !self.extra.contains_key(key) {
                map.serialize_entry(key, value)?;
            }
        }
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// The whole persisted state. Missing keys fall back to defaults and unknown
/// top-level keys are kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub jobs: Vec<Job>,
    pub settings: Settings,
    pub extra: Map<String, Value>,
}

impl Snapshot {
    /// Builds a snapshot from any JSON object. A `settings` value that is not
    /// an object means defaults; `jobs` entries that are not objects cannot
    /// carry an id and are skipped.
    pub fn from_object(mut root: Map<String, Value>) -> Snapshot {
        let jobs = match root.shift_remove("jobs") {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(obj) => Some(Job::from_object(obj)),
                    other => {
                        warn!(entry = %other, "Skipping job entry that is not an object");
                        None
                    }
                })
                .collect(),
            Some(other) => {
                warn!(jobs = %other, "Stored `jobs` is not an array, starting with none");
                Vec::new()
            }
            None => Vec::new(),
        };
        let settings = match root.shift_remove("settings") {
            Some(Value::Object(obj)) => Settings::from_object(obj),
            Some(Value::Null) | None => Settings::default(),
            Some(other) => {
                warn!(settings = %other, "Ignoring `settings` that is not an object");
                Settings::default()
            }
        };
        Snapshot {
            jobs,
            settings,
            extra: root,
        }
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(2 + self.extra.len()))?;
        map.serialize_entry("jobs", &self.jobs)?;
        map.serialize_entry("settings", &self.settings)?;
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Map::deserialize(d).map(Snapshot::from_object)
    }
}
