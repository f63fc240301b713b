use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use csv::StringRecord;

/// A CSV table whose columns aren't known until it's loaded. Rows are kept in file order.
#[derive(Clone, Debug)]
pub struct Table {
    name: String,
    headers: Vec<String>,
    rows: Vec<StringRecord>,
}

impl Table {
    pub fn new(name: &str, headers: Vec<String>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for header in &headers {
            if !seen.insert(header) {
                bail!("{name} has duplicate column {header}");
            }
        }
        Ok(Self {
            name: name.to_string(),
            headers,
            rows: Vec::new(),
        })
    }

    /// Reads a CSV file with a header row. A UTF-8 byte order mark is tolerated.
    pub fn load<R: std::io::Read>(name: &str, reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader
            .headers()
            .map_err(|err| anyhow!("{name}: {err}"))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let mut table = Self::new(name, headers)?;
        for rec in reader.records() {
            let rec = rec.map_err(|err| anyhow!("{name}: {err}"))?;
            table.push_row(rec)?;
        }
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    pub fn column(&self, column: &str) -> Result<usize> {
        match self.headers.iter().position(|h| h == column) {
            Some(idx) => Ok(idx),
            None => bail!("{} has no column {column}", self.name),
        }
    }

    pub fn push_row(&mut self, row: StringRecord) -> Result<()> {
        if row.len() != self.headers.len() {
            bail!(
                "{}: row has {} fields, but there are {} columns",
                self.name,
                row.len(),
                self.headers.len()
            );
        }
        self.rows.push(row);
        Ok(())
    }

    /// Removes every named column. Naming a column that isn't there is an error.
    pub fn drop_columns<S: AsRef<str>>(&mut self, columns: &[S]) -> Result<()> {
        let mut remove = BTreeSet::new();
        for column in columns {
            remove.insert(self.column(column.as_ref())?);
        }
        if remove.is_empty() {
            return Ok(());
        }

        let keep = |idx: &usize| !remove.contains(idx);
        self.headers = std::mem::take(&mut self.headers)
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| keep(idx))
            .map(|(_, h)| h)
            .collect();
        for row in &mut self.rows {
            *row = row
                .iter()
                .enumerate()
                .filter(|(idx, _)| keep(idx))
                .map(|(_, field)| field)
                .collect();
        }
        Ok(())
    }

    pub fn retain<F: FnMut(&StringRecord) -> bool>(&mut self, mut keep: F) {
        self.rows.retain(|row| keep(row));
    }

    /// Replaces each row with the result of `f`, dropping rows where it returns `None`. Returns
    /// the number of dropped rows.
    pub fn filter_map_rows<F: FnMut(&StringRecord) -> Option<StringRecord>>(
        &mut self,
        mut f: F,
    ) -> Result<usize> {
        let before = self.rows.len();
        let mut rows = Vec::with_capacity(before);
        for row in &self.rows {
            if let Some(row) = f(row) {
                if row.len() != self.headers.len() {
                    bail!("{}: a rewritten row changed its field count", self.name);
                }
                rows.push(row);
            }
        }
        self.rows = rows;
        Ok(before - self.rows.len())
    }

    /// Rewrites every row with `f`, stopping at the first error.
    pub fn try_map_rows<F: FnMut(&StringRecord) -> Result<StringRecord>>(
        &mut self,
        mut f: F,
    ) -> Result<()> {
        let mut rows = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let row = f(row)?;
            if row.len() != self.headers.len() {
                bail!("{}: a rewritten row changed its field count", self.name);
            }
            rows.push(row);
        }
        self.rows = rows;
        Ok(())
    }

    /// Appends a column. There must be exactly one value per row.
    pub fn push_column(&mut self, column: &str, values: Vec<String>) -> Result<()> {
        if self.has_column(column) {
            bail!("{} already has column {column}", self.name);
        }
        if values.len() != self.rows.len() {
            bail!(
                "{}: {} values for new column {column}, but there are {} rows",
                self.name,
                values.len(),
                self.rows.len()
            );
        }
        self.headers.push(column.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push_field(&value);
        }
        Ok(())
    }

    /// Inner join, where every row of `left` matches at most one row of `right`, so the result
    /// never has more rows than `left`. Rows stay in `left` order. Columns are all of `left`'s,
    /// then `right`'s except `key`; a name appearing on both sides gets `_x` and `_y` suffixes.
    pub fn join(left: &Table, right: &Table, key: &str) -> Result<Table> {
        let left_key = left.column(key)?;
        let right_key = right.column(key)?;

        let mut index: BTreeMap<&str, usize> = BTreeMap::new();
        for (idx, row) in right.rows.iter().enumerate() {
            let value = &row[right_key];
            if value.is_empty() {
                continue;
            }
            if index.insert(value, idx).is_some() {
                bail!("{} has duplicate {key} {value:?}", right.name);
            }
        }

        let shared: BTreeSet<&String> = left
            .headers
            .iter()
            .filter(|h| h.as_str() != key && right.has_column(h))
            .collect();
        let mut headers = Vec::new();
        for h in &left.headers {
            if shared.contains(h) {
                headers.push(format!("{h}_x"));
            } else {
                headers.push(h.clone());
            }
        }
        for (idx, h) in right.headers.iter().enumerate() {
            if idx == right_key {
                continue;
            }
            if shared.contains(h) {
                headers.push(format!("{h}_y"));
            } else {
                headers.push(h.clone());
            }
        }

        let mut joined = Table::new(&format!("{}+{}", left.name, right.name), headers)?;
        for row in &left.rows {
            if let Some(matched) = index.get(&row[left_key]) {
                let mut out = row.clone();
                for (idx, field) in right.rows[*matched].iter().enumerate() {
                    if idx != right_key {
                        out.push_field(field);
                    }
                }
                joined.rows.push(out);
            }
        }
        Ok(joined)
    }

    /// Writes a header row and then every row, with no index column.
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}
