use std::collections::HashMap;
use std::ops;
use std::slice;
use std::sync::Arc;

use crate::error::{new_error, ErrorKind, Result};

/// The header of a parsed stream: the column names in order, plus a
/// name-to-column lookup.
///
/// Built once at parser construction and never mutated afterwards; the
/// parser and every record it produces share one instance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Headers {
    names: Vec<String>,
    index: HashMap<String, usize>,
    fold_case: bool,
}

impl Headers {
    /// Build the lookup from ordered names. Blank names keep their column
    /// but get no entry; among duplicates the last column wins.
    pub(crate) fn new(names: Vec<String>, fold_case: bool) -> Headers {
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                continue;
            }
            let key = if fold_case {
                name.to_lowercase()
            } else {
                name.clone()
            };
            index.insert(key, i);
        }
        Headers { names, index, fold_case }
    }

    /// The column names in column order, duplicates and blanks included.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The number of columns.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when the header has no columns.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The column a name maps to, honoring case folding.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        if self.fold_case {
            self.index.get(&name.to_lowercase()).copied()
        } else {
            self.index.get(name).copied()
        }
    }

    /// Whether a name maps to any column.
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }
}

/// One parsed row: its field values plus where it came from.
///
/// A record owns its data. The header lookup is shared with the parser
/// through an [`Arc`], so records stay usable after the parser (and its
/// reader) are gone.
///
/// A `None` field is the null value: the input matched the format's
/// null string.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    fields: Vec<Option<String>>,
    record_number: u64,
    char_offset: u64,
    comment: Option<String>,
    headers: Option<Arc<Headers>>,
}

impl Record {
    pub(crate) fn new(
        fields: Vec<Option<String>>,
        record_number: u64,
        char_offset: u64,
        comment: Option<String>,
        headers: Option<Arc<Headers>>,
    ) -> Record {
        Record { fields, record_number, char_offset, comment, headers }
    }

    /// The field at column `i`, or `None` when the column does not exist
    /// or holds the null value.
    pub fn get(&self, i: usize) -> Option<&str> {
        self.fields.get(i).and_then(|f| f.as_deref())
    }

    /// The field under a header name.
    ///
    /// Fails with [`ErrorKind::NoHeader`](crate::ErrorKind::NoHeader) when
    /// the format defines no header, and with
    /// [`ErrorKind::UnknownColumn`](crate::ErrorKind::UnknownColumn) when
    /// the name maps to no column. `Ok(None)` is a null field (or a column
    /// this record is too short for).
    pub fn get_by_name(&self, name: &str) -> Result<Option<&str>> {
        let headers = match self.headers {
            None => return Err(new_error(ErrorKind::NoHeader)),
            Some(ref headers) => headers,
        };
        match headers.index_of(name) {
            None => Err(new_error(ErrorKind::UnknownColumn {
                name: name.to_string(),
                known: headers.names().to_vec(),
            })),
            Some(i) => Ok(self.get(i)),
        }
    }

    /// Whether `name` maps to a column in the header, regardless of this
    /// record's length.
    pub fn is_mapped(&self, name: &str) -> bool {
        self.headers
            .as_ref()
            .map_or(false, |headers| headers.contains(name))
    }

    /// Whether `name` maps to a column this record actually has a field
    /// for.
    pub fn is_set(&self, name: &str) -> bool {
        self.headers
            .as_ref()
            .and_then(|headers| headers.index_of(name))
            .map_or(false, |i| i < self.fields.len())
    }

    /// Whether this record's field count matches the header length.
    /// Records of a headerless format are always consistent.
    pub fn is_consistent(&self) -> bool {
        self.headers
            .as_ref()
            .map_or(true, |headers| headers.len() == self.fields.len())
    }

    /// The number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate the fields in order; a `None` item is the null value.
    pub fn iter(&self) -> Iter {
        self.into_iter()
    }

    /// The fields as a vector of borrowed values.
    pub fn values(&self) -> Vec<Option<&str>> {
        self.fields.iter().map(|f| f.as_deref()).collect()
    }

    /// The comment attached to this record, lines joined with `\n`.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// The 1-based position of this record in the stream.
    pub fn record_number(&self) -> u64 {
        self.record_number
    }

    /// The absolute character position the record began at.
    pub fn char_offset(&self) -> u64 {
        self.char_offset
    }

    /// The shared header lookup, when the format defines one.
    pub fn headers(&self) -> Option<&Headers> {
        self.headers.as_deref()
    }
}

impl ops::Index<usize> for Record {
    type Output = str;

    /// Panics when the column does not exist or holds the null value; use
    /// [`Record::get`] for the checked form.
    fn index(&self, i: usize) -> &str {
        self.get(i).expect("column index out of range or null field")
    }
}

impl<'r> IntoIterator for &'r Record {
    type Item = Option<&'r str>;
    type IntoIter = Iter<'r>;

    fn into_iter(self) -> Iter<'r> {
        Iter(self.fields.iter())
    }
}

/// An iterator over the fields of a [`Record`].
#[derive(Debug)]
pub struct Iter<'r>(slice::Iter<'r, Option<String>>);

impl<'r> Iterator for Iter<'r> {
    type Item = Option<&'r str>;

    fn next(&mut self) -> Option<Option<&'r str>> {
        self.0.next().map(|f| f.as_deref())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<'r> ExactSizeIterator for Iter<'r> {}
