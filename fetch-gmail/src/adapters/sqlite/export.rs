//! CSV export of the catalog

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use csv::{QuoteStyle, Terminator, WriterBuilder};
use tracing::info;

use super::Catalog;
use crate::error::FetchError;

const HEADER: [&str; 6] = ["id", "from", "delivered_to", "subject", "timestamp", "labels"];

impl Catalog {
    /// Write every record as CSV with a header row, in catalog row order.
    ///
    /// Fails with `AlreadyExists` when `destination` exists and
    /// `allow_overwrite` is false.
    pub fn export<P: AsRef<Path>>(&self, destination: P, allow_overwrite: bool) -> Result<u64, FetchError> {
        let destination = destination.as_ref();
        let file = open_destination(destination, allow_overwrite)?;

        let written = self.write_csv(BufWriter::new(file))?;
        info!("Exported {} messages to {}", written, destination.display());
        Ok(written)
    }

    /// Stream the catalog as CSV into any writer
    pub fn write_csv<W: Write>(&self, out: W) -> Result<u64, FetchError> {
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Necessary)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(out);
        writer.write_record(HEADER)?;

        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, [from], delivered_to, subject, timestamp, labels
             FROM messages ORDER BY rowid",
        )?;
        let mut rows = stmt.query([])?;

        let mut written = 0;
        while let Some(row) = rows.next()? {
            let timestamp: Option<i64> = row.get(4)?;
            writer.write_record([
                row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                timestamp.unwrap_or(0).to_string(),
                row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            ])?;
            written += 1;
        }

        writer.flush()?;
        Ok(written)
    }
}

fn open_destination(destination: &Path, allow_overwrite: bool) -> Result<File, FetchError> {
    let mut options = OpenOptions::new();
    options.write(true);
    if allow_overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    options.open(destination).map_err(|e| match e.kind() {
        io::ErrorKind::AlreadyExists => FetchError::AlreadyExists(destination.to_path_buf()),
        _ => FetchError::Io(format!("Failed to open {}: {}", destination.display(), e)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordUpdate;

    fn export_to_string(catalog: &Catalog) -> String {
        let mut buf = Vec::new();
        catalog.write_csv(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_export_bare_records() {
        let catalog = Catalog::in_memory().unwrap();
        catalog.insert_identities(["123", "456"]).unwrap();

        assert_eq!(
            export_to_string(&catalog),
            "id,from,delivered_to,subject,timestamp,labels\n123,,,,0,\n456,,,,0,\n"
        );
    }

    #[test]
    fn test_export_quotes_fields_and_labels() {
        let catalog = Catalog::in_memory().unwrap();
        catalog.insert_identities(["123", "456"]).unwrap();
        catalog
            .update_record(&RecordUpdate {
                id: "456".to_string(),
                from: "Doe, Jane <jane@example.com>".to_string(),
                delivered_to: "me@example.com".to_string(),
                subject: "Say \"hi\"".to_string(),
                timestamp: 1_700_000_000_000,
                labels: vec!["INBOX".to_string(), "IMPORTANT".to_string()],
            })
            .unwrap();

        assert_eq!(
            export_to_string(&catalog),
            "id,from,delivered_to,subject,timestamp,labels\n\
             123,,,,0,\n\
             456,\"Doe, Jane <jane@example.com>\",me@example.com,\"Say \"\"hi\"\"\",1700000000000,\"INBOX,IMPORTANT\"\n"
        );
    }

    #[test]
    fn test_export_empty_catalog_writes_header() {
        let catalog = Catalog::in_memory().unwrap();
        assert_eq!(export_to_string(&catalog), "id,from,delivered_to,subject,timestamp,labels\n");
    }

    #[test]
    fn test_export_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("messages.csv");
        std::fs::write(&output, "keep me").unwrap();

        let catalog = Catalog::in_memory().unwrap();
        catalog.insert_identities(["123"]).unwrap();

        match catalog.export(&output, false) {
            Err(FetchError::AlreadyExists(path)) => assert_eq!(path, output),
            other => panic!("expected AlreadyExists, got {:?}", other),
        }
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "keep me");

        assert_eq!(catalog.export(&output, true).unwrap(), 1);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "id,from,delivered_to,subject,timestamp,labels\n123,,,,0,\n"
        );
    }

    #[test]
    fn test_export_to_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("fresh.csv");

        let catalog = Catalog::in_memory().unwrap();
        catalog.insert_identities(["1", "2", "3"]).unwrap();

        assert_eq!(catalog.export(&output, false).unwrap(), 3);
        let content = std::fs::read_to_string(&output).unwrap();
        assert_eq!(content.lines().count(), 4);
    }
}
