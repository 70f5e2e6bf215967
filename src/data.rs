use crate::config::InputConfig;
use crate::error::DataError;
use crate::types::PharmacyRecord;
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Once-initialized, read-only view of the pharmacy dataset.
///
/// The first successful [`Dataset::load`] reads the CSV; every later call hands
/// back the same records without touching the file again.
pub struct Dataset {
    input: InputConfig,
    records: OnceLock<Arc<Vec<PharmacyRecord>>>,
}

impl Dataset {
    pub fn new(input: InputConfig) -> Self {
        Self { input, records: OnceLock::new() }
    }

    /// Dataset already populated with `records`; the source file is never read.
    #[cfg(test)]
    pub fn from_records(input: InputConfig, records: Vec<PharmacyRecord>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(Arc::new(records));
        Self { input, records: cell }
    }

    pub fn load(&self) -> Result<Arc<Vec<PharmacyRecord>>, DataError> {
        if let Some(records) = self.records.get() {
            return Ok(Arc::clone(records));
        }
        let loaded = Arc::new(load_data(&self.input)?);
        info!("Loaded {} pharmacies from {:?}", loaded.len(), self.input.data_csv);
        // A concurrent loader may have won the race; keep whichever landed first.
        Ok(Arc::clone(self.records.get_or_init(|| loaded)))
    }
}

/// Column positions resolved from the header row.
struct Columns {
    name: usize,
    address: usize,
    phone: usize,
    items: usize,
    latitude: Option<usize>,
    longitude: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord, input: &InputConfig, path: &Path) -> Result<Self, DataError> {
        let position = |column: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == column)
        };
        let required = |column: &str| {
            position(column)
                .ok_or_else(|| DataError::parse(path, format!("required column '{}' not found", column)))
        };

        Ok(Self {
            name: required(&input.name_column)?,
            address: required(&input.address_column)?,
            phone: required(&input.phone_column)?,
            items: required(&input.items_column)?,
            latitude: position(&input.latitude_column),
            longitude: position(&input.longitude_column),
        })
    }
}

pub fn load_data(input: &InputConfig) -> Result<Vec<PharmacyRecord>, DataError> {
    let path = input.data_csv.as_path();
    let file = File::open(path).map_err(|source| DataError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;
    // Short rows read as blank trailing cells
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(file);

    let headers = rdr
        .headers()
        .map_err(|e| DataError::parse(path, format!("unreadable header row: {}", e)))?
        .clone();
    let columns = Columns::resolve(&headers, input, path)?;
    if columns.latitude.is_none() || columns.longitude.is_none() {
        debug!("No coordinate columns in {:?}; map view will be empty", path);
    }

    let mut records = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        // Header is line 1
        let line = idx + 2;
        let row = result.map_err(|e| DataError::parse(path, format!("line {}: {}", line, e)))?;

        let text = |col: usize| row.get(col).unwrap_or("").trim().to_string();
        let coordinate = |col: Option<usize>| -> Result<Option<f64>, DataError> {
            let raw = match col.and_then(|c| row.get(c)).map(str::trim) {
                Some(raw) if !raw.is_empty() => raw,
                _ => return Ok(None),
            };
            let value = raw
                .parse::<f64>()
                .map_err(|_| DataError::parse(path, format!("line {}: invalid coordinate '{}'", line, raw)))?;
            // NaN and infinities are treated as missing
            Ok(Some(value).filter(|v| v.is_finite()))
        };

        let items = text(columns.items);
        records.push(PharmacyRecord {
            name: text(columns.name),
            address: text(columns.address),
            phone: text(columns.phone),
            collected_items: if items.is_empty() { None } else { Some(items) },
            latitude: coordinate(columns.latitude)?,
            longitude: coordinate(columns.longitude)?,
        });
    }

    Ok(records)
}
