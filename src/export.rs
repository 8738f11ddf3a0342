// ============================================================================
// Export Service
// ============================================================================
//
// Read-only serialization of a filtered message set to CSV or JSON for
// offline use. The whole payload is built in memory before it is sent, so a
// failed export never surfaces as a truncated file.
//
// ============================================================================

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::message::Message;

/// Fixed CSV column order
pub const CSV_COLUMNS: [&str; 8] = [
    "id",
    "name",
    "email",
    "phone",
    "message",
    "status",
    "created_at",
    "ip_address",
];

/// Supported export formats. JSON is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Suggested download filename: `messages-export-<ISO-date>.<ext>`.
pub fn export_filename(format: ExportFormat, date: NaiveDate) -> String {
    format!(
        "messages-export-{}.{}",
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Serializes messages to CSV. Field values containing commas, quotes or
/// newlines are quoted with internal quotes doubled; an empty set still
/// yields a header-only file, never an empty byte stream.
pub fn to_csv(messages: &[Message]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(CSV_COLUMNS)
        .context("Failed to write CSV header")?;

    for m in messages {
        writer
            .write_record([
                m.id.to_string().as_str(),
                m.name.as_str(),
                m.email.as_str(),
                m.phone.as_deref().unwrap_or(""),
                m.message.as_str(),
                m.status.as_str(),
                m.created_at.to_rfc3339().as_str(),
                m.ip_address.as_deref().unwrap_or(""),
            ])
            .with_context(|| format!("Failed to write CSV row for message {}", m.id))?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV export buffer: {}", e))
}

/// Serializes messages as a pretty-printed JSON array.
pub fn to_json(messages: &[Message]) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(messages).context("Failed to serialize JSON export")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageStatus;
    use chrono::{TimeZone, Utc};

    fn sample(id: i64, name: &str, body: &str) -> Message {
        Message {
            id,
            name: name.to_string(),
            email: format!("user{}@example.com", id),
            phone: None,
            company: None,
            message: body.to_string(),
            service: None,
            preferred_date: None,
            preferred_time: None,
            ip_address: Some("203.0.113.9".to_string()),
            user_agent: None,
            status: MessageStatus::Unread,
            created_at: Utc.with_ymd_and_hms(2026, 8, 1, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn empty_export_is_header_only() {
        let bytes = to_csv(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.trim_end(), CSV_COLUMNS.join(","));
    }

    #[test]
    fn csv_quoting_round_trips() {
        let tricky = "Quote needed, for \"deep clean\"\nsecond line";
        let bytes = to_csv(&[sample(7, "Yamada, Taro", tricky)]).unwrap();

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers, csv::StringRecord::from(CSV_COLUMNS.to_vec()));

        let records: Vec<csv::StringRecord> =
            reader.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][1], "Yamada, Taro");
        assert_eq!(&records[0][4], tricky);
        assert_eq!(&records[0][5], "unread");
    }

    #[test]
    fn json_export_parses_back() {
        let bytes = to_json(&[sample(1, "A", "x"), sample(2, "B", "y")]).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let rows = parsed.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], 1);
        assert_eq!(rows[0]["status"], "unread");
        assert_eq!(rows[1]["name"], "B");
    }

    #[test]
    fn filename_embeds_date_and_extension() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 8).unwrap();
        assert_eq!(
            export_filename(ExportFormat::Csv, date),
            "messages-export-2026-08-08.csv"
        );
        assert_eq!(
            export_filename(ExportFormat::Json, date),
            "messages-export-2026-08-08.json"
        );
    }

    #[test]
    fn format_parsing() {
        assert_eq!(ExportFormat::parse("csv"), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::parse("json"), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::parse("xml"), None);
    }
}
