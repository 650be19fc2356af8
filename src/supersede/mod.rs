//! Deprecation, cessation and supersession of records.
//!
//! Every operation runs in two phases. First all records are read, patched and
//! (for new records) exported to obtain their ids; nothing is written. Then the
//! touched records are exported once more and committed as a single [`Batch`].
//! Records touched more than once within an operation are patched in place, so
//! reciprocal links from several sources accumulate on the same copy.

mod batch;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

pub use batch::Batch;

use crate::edtf;
use crate::error::{Error, Result};
use crate::export::Exporter;
use crate::record::{DateField, Record};
use crate::relations::{merge_ids, RelationField};
use crate::store::{body_id, Reader, Writer};
use crate::update::PropertyUpdates;

/// What an operation wrote and which new records it created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub written: Vec<i64>,
    pub created: Vec<i64>,
}

/// Which link a clone gets back to its source, from a pair of CLI flags.
pub fn clone_relation(supersedes: bool, superseded_by: bool) -> Result<Option<RelationField>> {
    match (supersedes, superseded_by) {
        (true, true) => Err(Error::InvalidInput(
            "a clone cannot both supersede and be superseded by its source".to_string(),
        )),
        (true, false) => Ok(Some(RelationField::Supersedes)),
        (false, true) => Ok(Some(RelationField::SupersededBy)),
        (false, false) => Ok(None),
    }
}

/// Records patched during the first phase, in the order they were first touched.
#[derive(Default)]
struct Pending {
    order: Vec<i64>,
    records: HashMap<i64, Record>,
}

impl Pending {
    fn fetch(&self, id: i64, reader: &dyn Reader) -> Result<Record> {
        if let Some(record) = self.records.get(&id) {
            return Ok(record.clone());
        }
        Record::from_bytes(&reader.read(id)?)
    }

    fn put(&mut self, id: i64, record: Record) {
        if self.records.insert(id, record).is_none() {
            self.order.push(id);
        }
    }

    fn into_batch(mut self, exporter: &dyn Exporter) -> Result<Batch> {
        let mut batch = Batch::new();
        for id in self.order {
            if let Some(record) = self.records.remove(&id) {
                batch.stage(id, exporter.export(&record.to_bytes()?)?);
            }
        }
        Ok(batch)
    }
}

pub struct Coordinator {
    reader: Arc<dyn Reader>,
    parent_reader: Arc<dyn Reader>,
    writer: Arc<dyn Writer>,
    exporter: Arc<dyn Exporter>,
}

impl Coordinator {
    pub fn new(
        reader: Arc<dyn Reader>,
        writer: Arc<dyn Writer>,
        exporter: Arc<dyn Exporter>,
    ) -> Self {
        Self {
            parent_reader: Arc::clone(&reader),
            reader,
            writer,
            exporter,
        }
    }

    /// Read parent records from a different store than the records being changed.
    pub fn with_parent_reader(mut self, parent_reader: Arc<dyn Reader>) -> Self {
        self.parent_reader = parent_reader;
        self
    }

    /// Mark records deprecated as of `date` (today if absent), optionally naming
    /// the records that replace them.
    pub fn deprecate(
        &self,
        ids: &[i64],
        superseded_by: &[i64],
        date: Option<&str>,
    ) -> Result<Outcome> {
        require_ids(ids)?;
        reject_self_supersession(ids, superseded_by)?;
        let date = edtf::parse_or_today(date)?;

        let mut pending = Pending::default();
        for &id in ids {
            let stamp = Some((DateField::Deprecated, date.as_str()));
            self.retire(&mut pending, id, stamp, superseded_by)?;
            info!(id, date = %date, "deprecated record");
        }
        self.finish(pending, Vec::new())
    }

    /// Mark records as having ceased to exist as of `date` (today if absent).
    ///
    /// With `supersede_with_copy`, each record is replaced by a copy whose
    /// inception is `date` and whose cessation is open.
    pub fn cessate(
        &self,
        ids: &[i64],
        date: Option<&str>,
        superseded_by: &[i64],
        supersede_with_copy: bool,
    ) -> Result<Outcome> {
        require_ids(ids)?;
        if supersede_with_copy && !superseded_by.is_empty() {
            return Err(Error::InvalidInput(
                "--supersede-with-copy and --superseded-by are mutually exclusive".to_string(),
            ));
        }
        reject_self_supersession(ids, superseded_by)?;
        let date = edtf::parse_or_today(date)?;

        let mut pending = Pending::default();
        let mut created = Vec::new();

        for &id in ids {
            if !supersede_with_copy {
                let stamp = Some((DateField::Cessation, date.as_str()));
                self.retire(&mut pending, id, stamp, superseded_by)?;
                info!(id, date = %date, "cessated record");
                continue;
            }

            let mut old = pending.fetch(id, self.reader.as_ref())?;

            let mut copy = old.fresh_copy()?;
            copy.set_date(DateField::Inception, &date)?;
            copy.set_date(DateField::Cessation, edtf::OPEN)?;
            copy.mark_not_current()?;
            copy.replace_relations(RelationField::Supersedes, &[id])?;
            let (new_id, copy) = self.export_new(&copy)?;

            old.set_date(DateField::Cessation, &date)?;
            old.mark_not_current()?;
            old.merge_relations(RelationField::SupersededBy, &[new_id])?;

            pending.put(id, old);
            pending.put(new_id, copy);
            created.push(new_id);
            info!(id, new_id, date = %date, "cessated record and superseded it with a copy");
        }

        self.finish(pending, created)
    }

    /// Record that `ids` are superseded by `by`, without stamping any date.
    pub fn superseded_by(&self, ids: &[i64], by: &[i64]) -> Result<Outcome> {
        require_ids(ids)?;
        if by.is_empty() {
            return Err(Error::InvalidInput(
                "at least one superseding id is required".to_string(),
            ));
        }
        reject_self_supersession(ids, by)?;

        let mut pending = Pending::default();
        for &id in ids {
            self.retire(&mut pending, id, None, by)?;
            info!(id, superseded_by = ?merge_ids(&[], by), "marked record superseded");
        }
        self.finish(pending, Vec::new())
    }

    /// Replace each record with a copy reparented under `parent_id`.
    ///
    /// The old record ceases at the parent's inception; the copy takes the
    /// parent's hierarchy and lifespan.
    pub fn supersede_with_parent(&self, ids: &[i64], parent_id: i64) -> Result<Outcome> {
        require_ids(ids)?;

        let parent = self.read_parent(parent_id)?;
        let hierarchy = parent
            .hierarchy()
            .cloned()
            .ok_or(Error::MissingProperty {
                id: parent_id,
                property: "wof:hierarchy",
            })?;
        let inception = required_date(&parent, parent_id, DateField::Inception)?;
        let cessation = required_date(&parent, parent_id, DateField::Cessation)?;

        let mut pending = Pending::default();
        let mut created = Vec::new();

        for &id in ids {
            let mut old = pending.fetch(id, self.reader.as_ref())?;
            let name = old
                .name()
                .ok_or(Error::MissingProperty {
                    id,
                    property: "wof:name",
                })?
                .to_string();

            let mut new = old.fresh_copy()?;
            new.set_parent_id(parent_id)?;
            new.set_hierarchy(hierarchy.clone())?;
            new.set_date(DateField::Inception, &inception)?;
            new.set_date(DateField::Cessation, &cessation)?;
            new.set_label(&format!("{name} ({inception})"))?;
            new.replace_relations(RelationField::Supersedes, &[id])?;
            let (new_id, new) = self.export_new(&new)?;

            old.set_date(DateField::Cessation, &inception)?;
            old.mark_not_current()?;
            old.merge_relations(RelationField::SupersededBy, &[new_id])?;

            pending.put(id, old);
            pending.put(new_id, new);
            created.push(new_id);
            info!(id, new_id, parent_id, "{id} replaced by {new_id}");
        }

        self.finish(pending, created)
    }

    /// Create a new record from a copy of `source_id`.
    ///
    /// `relation` names the field on the clone that points back at the source;
    /// the source gets the inverse link and is only rewritten if that changed it.
    pub fn clone_feature(
        &self,
        source_id: i64,
        relation: Option<RelationField>,
        updates: &PropertyUpdates,
    ) -> Result<Outcome> {
        let mut pending = Pending::default();
        let mut source = pending.fetch(source_id, self.reader.as_ref())?;

        let mut clone = source.fresh_copy()?;
        updates.apply(&mut clone)?;
        if let Some(field) = relation {
            clone.replace_relations(field, &[source_id])?;
            if field == RelationField::SupersededBy {
                clone.mark_not_current()?;
            }
        }
        let (new_id, clone) = self.export_new(&clone)?;
        pending.put(new_id, clone);

        if let Some(field) = relation {
            let mut changed = source.merge_relations(field.inverse(), &[new_id])?;
            if field == RelationField::Supersedes && source.is_current() != Some(0) {
                source.mark_not_current()?;
                changed = true;
            }
            if changed {
                pending.put(source_id, source);
            }
        }

        info!(source_id, new_id, "created new record {new_id}");
        self.finish(pending, vec![new_id])
    }

    /// Deprecate each record today and replace it with a copy carrying `updates`.
    pub fn deprecate_and_supersede(
        &self,
        ids: &[i64],
        updates: &PropertyUpdates,
    ) -> Result<Outcome> {
        require_ids(ids)?;
        let today = edtf::today();

        let mut pending = Pending::default();
        let mut created = Vec::new();

        for &id in ids {
            let mut old = pending.fetch(id, self.reader.as_ref())?;

            let mut new = old.fresh_copy()?;
            new.replace_relations(RelationField::Supersedes, &[id])?;
            updates.apply(&mut new)?;
            let (new_id, new) = self.export_new(&new)?;

            old.set_date(DateField::Deprecated, &today)?;
            old.mark_not_current()?;
            old.merge_relations(RelationField::SupersededBy, &[new_id])?;

            pending.put(id, old);
            pending.put(new_id, new);
            created.push(new_id);
            info!(id, new_id, "{id} replaced by {new_id}");
        }

        self.finish(pending, created)
    }

    /// Stamp, retire and link `id` to its replacements, and link each replacement back.
    fn retire(
        &self,
        pending: &mut Pending,
        id: i64,
        stamp: Option<(DateField, &str)>,
        superseded_by: &[i64],
    ) -> Result<()> {
        let mut old = pending.fetch(id, self.reader.as_ref())?;
        if let Some((field, date)) = stamp {
            old.set_date(field, date)?;
        }
        old.mark_not_current()?;
        old.merge_relations(RelationField::SupersededBy, superseded_by)?;
        pending.put(id, old);

        for other_id in merge_ids(&[], superseded_by) {
            let mut other = pending.fetch(other_id, self.reader.as_ref())?;
            other.merge_relations(RelationField::Supersedes, &[id])?;
            pending.put(other_id, other);
        }
        Ok(())
    }

    pub(crate) fn read(&self, id: i64) -> Result<Record> {
        Record::from_bytes(&self.reader.read(id)?)
    }

    pub(crate) fn read_parent(&self, id: i64) -> Result<Record> {
        Record::from_bytes(&self.parent_reader.read(id)?)
    }

    /// Export a record, returning its (possibly newly assigned) id and the exported body.
    pub(crate) fn export(&self, record: &Record) -> Result<(i64, Vec<u8>)> {
        let body = self.exporter.export(&record.to_bytes()?)?;
        let id = body_id(&body)?;
        Ok((id, body))
    }

    pub(crate) fn commit(&self, batch: Batch) -> Result<Vec<i64>> {
        batch.commit(self.writer.as_ref())
    }

    /// Export a new record to assign its id.
    fn export_new(&self, record: &Record) -> Result<(i64, Record)> {
        let (id, body) = self.export(record)?;
        Ok((id, Record::from_bytes(&body)?))
    }

    fn finish(&self, pending: Pending, created: Vec<i64>) -> Result<Outcome> {
        let batch = pending.into_batch(self.exporter.as_ref())?;
        let written = self.commit(batch)?;
        Ok(Outcome { written, created })
    }
}

pub(crate) fn require_ids(ids: &[i64]) -> Result<()> {
    if ids.is_empty() {
        return Err(Error::InvalidInput("no record ids given".to_string()));
    }
    Ok(())
}

fn reject_self_supersession(ids: &[i64], superseded_by: &[i64]) -> Result<()> {
    match ids.iter().find(|id| superseded_by.contains(id)) {
        Some(id) => Err(Error::InvalidInput(format!(
            "record {id} cannot be superseded by itself"
        ))),
        None => Ok(()),
    }
}

/// The value of a lifecycle date that must be present. Scalars are taken as text.
fn required_date(record: &Record, id: i64, field: DateField) -> Result<String> {
    match record.get(field.path()) {
        None => Err(Error::MissingProperty {
            id,
            property: field.name(),
        }),
        Some(Value::String(date)) => Ok(date.clone()),
        Some(value @ (Value::Number(_) | Value::Bool(_))) => Ok(value.to_string()),
        Some(other) => Err(Error::Malformed(format!(
            "record {id} has a non-scalar {}: {other}",
            field.name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_relation_flags() {
        assert_eq!(clone_relation(false, false).unwrap(), None);
        assert_eq!(
            clone_relation(true, false).unwrap(),
            Some(RelationField::Supersedes)
        );
        assert_eq!(
            clone_relation(false, true).unwrap(),
            Some(RelationField::SupersededBy)
        );
        assert!(clone_relation(true, true).unwrap_err().is_usage());
    }

    #[test]
    fn self_supersession_is_an_input_error() {
        assert!(reject_self_supersession(&[1, 2], &[3]).is_ok());
        assert!(reject_self_supersession(&[1, 2], &[2]).unwrap_err().is_usage());
    }
}
