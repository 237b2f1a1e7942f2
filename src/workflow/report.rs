use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Found,
    Inserted,
    Updated,
    Deleted,
    Skipped,
}

impl Action {
    fn past(&self) -> &'static str {
        match self {
            Action::Found => "Found",
            Action::Inserted => "Inserted",
            Action::Updated => "Updated",
            Action::Deleted => "Deleted",
            Action::Skipped => "Skipped",
        }
    }

    fn planned(&self) -> &'static str {
        match self {
            Action::Found => "Found",
            Action::Inserted => "Would insert",
            Action::Updated => "Would update",
            Action::Deleted => "Would delete",
            Action::Skipped => "Would skip",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    pub action: Action,
    pub collection: String,
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// What an operation changed, for the operator to eyeball.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub title: String,
    pub dry_run: bool,
    pub entries: Vec<Entry>,
    pub notes: Vec<String>,
}

impl Report {
    pub fn new(title: impl Into<String>, dry_run: bool) -> Self {
        Self {
            title: title.into(),
            dry_run,
            entries: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn record(&mut self, action: Action, collection: &str, count: u64) {
        self.push(action, collection, count, None);
    }

    pub fn record_detail(&mut self, action: Action, collection: &str, count: u64, detail: impl Into<String>) {
        self.push(action, collection, count, Some(detail.into()));
    }

    fn push(&mut self, action: Action, collection: &str, count: u64, detail: Option<String>) {
        tracing::info!(
            action = ?action,
            collection,
            count,
            detail = detail.as_deref().unwrap_or(""),
            dry_run = self.dry_run,
            "{}",
            self.title
        );
        self.entries.push(Entry {
            action,
            collection: collection.to_string(),
            count,
            detail,
        });
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn total(&self, action: Action, collection: &str) -> u64 {
        self.entries
            .iter()
            .filter(|e| e.action == action && e.collection == collection)
            .map(|e| e.count)
            .sum()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            writeln!(f, "{} (dry run, nothing written)", self.title)?;
        } else {
            writeln!(f, "{}", self.title)?;
        }

        for entry in &self.entries {
            let verb = if self.dry_run {
                entry.action.planned()
            } else {
                entry.action.past()
            };
            write!(f, "  {} {} {}", verb, entry.count, entry.collection)?;
            if let Some(detail) = &entry.detail {
                write!(f, ": {}", detail)?;
            }
            writeln!(f)?;
        }

        for note in &self.notes {
            writeln!(f, "  - {}", note)?;
        }
        Ok(())
    }
}
