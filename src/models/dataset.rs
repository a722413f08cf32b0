//! Dataset model - uploaded CSV files plus a JSON index

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::logic::{FlowObservation, Protocol};
use crate::{AppError, AppResult};

pub const ALLOWED_EXTENSIONS: [&str; 1] = ["csv"];

/// Rows counted for the upload preview
pub const PREVIEW_ROWS: usize = 2000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMeta {
    pub dataset_id: Uuid,
    pub filename: String,
    pub stored_name: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub columns: Vec<String>,
    pub preview_rows: usize,
    pub created_at: DateTime<Utc>,
}

/// One CSV row as header -> cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvRow(pub serde_json::Map<String, serde_json::Value>);

impl CsvRow {
    fn cell(&self, names: &[&str]) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| names.iter().any(|n| n.eq_ignore_ascii_case(key.trim())))
            .and_then(|(_, value)| value.as_str())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    fn number(&self, names: &[&str]) -> Option<u64> {
        let text = self.cell(names)?;
        text.parse::<u64>().ok().or_else(|| {
            text.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| v as u64)
        })
    }

    /// Features carried by the row, if it has all three columns
    pub fn observation(&self) -> Option<FlowObservation> {
        let protocol = self.cell(&["protocol", "proto", "protocol_type"])?;
        let bytes = self.number(&["bytes", "byte_count", "bytes_count", "src_bytes"])?;
        let duration = self.number(&["duration", "duration_seconds"])?;
        Some(FlowObservation::new(Protocol::parse(protocol), bytes, duration))
    }

    pub fn into_value(self) -> serde_json::Value {
        serde_json::Value::Object(self.0)
    }
}

/// Keep ASCII alphanumerics, dots, dashes and underscores
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    cleaned.trim_start_matches(['.', '_']).to_string()
}

/// Sanitized filename with an allowed extension
pub fn validate_filename(name: &str) -> AppResult<String> {
    if name.trim().is_empty() {
        return Err(AppError::ValidationError("Empty filename".to_string()));
    }

    let ext = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => {}
        _ => return Err(AppError::ValidationError("Only .csv allowed".to_string())),
    }

    let safe = sanitize_filename(name);
    if safe.is_empty() || !safe.contains('.') {
        return Err(AppError::ValidationError("Invalid filename".to_string()));
    }
    Ok(safe)
}

/// Header row and preview row count
fn preview_csv(bytes: &[u8]) -> AppResult<(Vec<String>, usize)> {
    let invalid = |e: csv::Error| AppError::ValidationError(format!("Cannot read CSV: {}", e));

    let mut reader = csv::Reader::from_reader(bytes);
    let columns: Vec<String> = reader.headers().map_err(invalid)?.iter().map(str::to_string).collect();
    if columns.is_empty() || columns.iter().all(|c| c.trim().is_empty()) {
        return Err(AppError::ValidationError("Cannot read CSV: no header row".to_string()));
    }

    let mut rows = 0;
    for record in reader.records().take(PREVIEW_ROWS) {
        record.map_err(invalid)?;
        rows += 1;
    }
    Ok((columns, rows))
}

/// Parse up to `limit` rows; nothing past the last row taken is read
pub fn parse_rows<R: std::io::Read>(source: R, limit: usize) -> Result<Vec<CsvRow>, csv::Error> {
    let mut reader = csv::Reader::from_reader(source);
    let headers = reader.headers()?.clone();

    reader
        .records()
        .take(limit)
        .map(|record| {
            let record = record?;
            let map = headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.to_string(), serde_json::Value::String(v.to_string())))
                .collect();
            Ok(CsvRow(map))
        })
        .collect()
}

/// Uploaded datasets on disk
#[derive(Debug)]
pub struct DatasetStore {
    upload_dir: PathBuf,
    index_path: PathBuf,
    max_bytes: usize,
    index_lock: Mutex<()>,
}

impl DatasetStore {
    pub async fn open(upload_dir: PathBuf, index_path: PathBuf, max_bytes: usize) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(&upload_dir).await?;
        if let Some(parent) = index_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        Ok(Self {
            upload_dir,
            index_path,
            max_bytes,
            index_lock: Mutex::new(()),
        })
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    async fn load_index(&self) -> AppResult<Vec<DatasetMeta>> {
        match tokio::fs::read(&self.index_path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_index(&self, items: &[DatasetMeta]) -> AppResult<()> {
        let json = serde_json::to_vec_pretty(items)?;
        let tmp = self.index_path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.index_path).await?;
        Ok(())
    }

    /// Newest first
    pub async fn list(&self) -> AppResult<Vec<DatasetMeta>> {
        let _guard = self.index_lock.lock().await;
        self.load_index().await
    }

    pub async fn get(&self, dataset_id: Uuid) -> AppResult<DatasetMeta> {
        self.list()
            .await?
            .into_iter()
            .find(|d| d.dataset_id == dataset_id)
            .ok_or_else(|| AppError::NotFound("Dataset not found".to_string()))
    }

    /// Validate and persist an upload
    ///
    /// Nothing is written unless the name, size and CSV preview all pass.
    pub async fn save(&self, filename: &str, bytes: Vec<u8>) -> AppResult<DatasetMeta> {
        let safe_name = validate_filename(filename)?;

        if bytes.len() > self.max_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "File too large (max {}MB)",
                self.max_bytes / (1024 * 1024)
            )));
        }

        let (columns, preview_rows) = preview_csv(&bytes)?;

        let dataset_id = Uuid::new_v4();
        let stored_name = format!("{}_{}", dataset_id, safe_name);
        let sha256 = format!("{:x}", Sha256::digest(&bytes));
        let size_bytes = bytes.len() as u64;

        tokio::fs::write(self.upload_dir.join(&stored_name), &bytes).await?;

        let meta = DatasetMeta {
            dataset_id,
            filename: safe_name,
            stored_name,
            size_bytes,
            sha256,
            columns,
            preview_rows,
            created_at: Utc::now(),
        };

        let _guard = self.index_lock.lock().await;
        let mut items = self.load_index().await?;
        items.insert(0, meta.clone());
        self.save_index(&items).await?;

        tracing::info!("Dataset stored: {} ({} bytes)", meta.stored_name, meta.size_bytes);
        Ok(meta)
    }

    /// Read up to `limit` rows of a stored dataset
    pub async fn read_rows(&self, meta: &DatasetMeta, limit: usize) -> AppResult<Vec<CsvRow>> {
        let path = self.upload_dir.join(&meta.stored_name);

        tokio::task::spawn_blocking(move || {
            let file = match std::fs::File::open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(AppError::NotFound("Dataset file is missing".to_string()));
                }
                Err(e) => return Err(e.into()),
            };

            parse_rows(file, limit).map_err(|e| AppError::ValidationError(format!("Cannot read CSV: {}", e)))
        })
        .await
        .map_err(|e| AppError::InternalError(format!("CSV reader task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = "protocol,bytes,duration\nTCP,500,0\nUDP,30000,20\nICMP,9000,12\n";

    async fn store(dir: &Path, max_bytes: usize) -> DatasetStore {
        DatasetStore::open(dir.join("uploads"), dir.join("datasets.json"), max_bytes)
            .await
            .unwrap()
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("my flows.csv"), "my_flows.csv");
        assert_eq!(sanitize_filename("../../etc/passwd.csv"), "passwd.csv");
        assert_eq!(sanitize_filename("C:\\data\\trafic.csv"), "trafic.csv");
        assert_eq!(sanitize_filename("..hidden.csv"), "hidden.csv");
        assert_eq!(sanitize_filename("дані.csv"), "csv");
    }

    #[test]
    fn test_validate_filename() {
        assert!(validate_filename("flows.CSV").is_ok());
        assert!(matches!(validate_filename(""), Err(AppError::ValidationError(_))));
        assert!(matches!(validate_filename("flows"), Err(AppError::ValidationError(_))));
        assert!(matches!(validate_filename("flows.json"), Err(AppError::ValidationError(_))));
        assert!(matches!(validate_filename("дані.csv"), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_row_observation() {
        let rows = parse_rows(SAMPLE.as_bytes(), 10).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].observation(), Some(FlowObservation::new(Protocol::Udp, 30_000, 20)));

        let aliased = parse_rows("Proto,Byte_Count,Duration_Seconds\nicmp,12.0,3\n".as_bytes(), 10).unwrap();
        assert_eq!(aliased[0].observation(), Some(FlowObservation::new(Protocol::Icmp, 12, 3)));

        let partial = parse_rows("protocol,bytes\nTCP,10\n".as_bytes(), 10).unwrap();
        assert_eq!(partial[0].observation(), None);
    }

    #[tokio::test]
    async fn test_save_list_and_get() {
        let dir = tempdir().unwrap();
        let store = store(dir.path(), 1024 * 1024).await;

        let first = store.save("first.csv", SAMPLE.as_bytes().to_vec()).await.unwrap();
        let second = store.save("second.csv", SAMPLE.as_bytes().to_vec()).await.unwrap();

        assert_eq!(first.columns, vec!["protocol", "bytes", "duration"]);
        assert_eq!(first.preview_rows, 3);
        assert_eq!(first.sha256.len(), 64);
        assert!(store.upload_dir().join(&first.stored_name).exists());

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].dataset_id, second.dataset_id);

        assert_eq!(store.get(first.dataset_id).await.unwrap(), first);
        assert!(matches!(store.get(Uuid::new_v4()).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rejected_uploads_leave_no_files() {
        let dir = tempdir().unwrap();
        let store = store(dir.path(), 16).await;

        let too_big = store.save("big.csv", SAMPLE.as_bytes().to_vec()).await;
        assert!(matches!(too_big, Err(AppError::PayloadTooLarge(_))));

        let wrong_ext = store.save("flows.txt", b"a\n1\n".to_vec()).await;
        assert!(matches!(wrong_ext, Err(AppError::ValidationError(_))));

        let files = std::fs::read_dir(store.upload_dir()).unwrap().count();
        assert_eq!(files, 0);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let store = store(dir.path(), 1024).await;
        let meta = store.save("flows.csv", SAMPLE.as_bytes().to_vec()).await.unwrap();

        std::fs::remove_file(store.upload_dir().join(&meta.stored_name)).unwrap();
        assert!(matches!(store.read_rows(&meta, 10).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_read_rows_stops_at_limit() {
        let dir = tempdir().unwrap();
        let store = store(dir.path(), 1024).await;
        let meta = store.save("flows.csv", SAMPLE.as_bytes().to_vec()).await.unwrap();

        // A ragged row after the third record is only hit when read
        let stored = store.upload_dir().join(&meta.stored_name);
        std::fs::write(&stored, format!("{SAMPLE}TCP,1\n")).unwrap();

        let rows = store.read_rows(&meta, 3).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].observation(), Some(FlowObservation::new(Protocol::Icmp, 9000, 12)));

        let rows = store.read_rows(&meta, 1).await.unwrap();
        assert_eq!(rows.len(), 1);

        assert!(matches!(store.read_rows(&meta, 10).await, Err(AppError::ValidationError(_))));
    }
}
