use crate::structs::{DataFormat, Document};
use crate::utils::{files_with_extension, progress_style};
use ahash::AHashSet;
use anyhow::{Context, Result, anyhow};
use indicatif::ParallelProgressIterator;
use log::{info, warn};
use mailparse::{
    DispositionType, MailAddr, MailHeader, MailHeaderMap, ParsedMail, addrparse_header, parse_mail,
};
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub trait DataReader {
    fn read_documents(&self) -> Result<Vec<Document>>;
}

pub fn open_reader(format: DataFormat, path: impl AsRef<Path>) -> Box<dyn DataReader> {
    let path = path.as_ref();
    match format {
        DataFormat::Eml => Box::new(EmlDataReader::new(path)),
        DataFormat::Csv => Box::new(CsvDataReader::new(path)),
        DataFormat::Json => Box::new(JsonDataReader::new(path)),
    }
}

pub struct CsvDataReader {
    paths: Vec<PathBuf>,
}

impl CsvDataReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            paths: files_with_extension(path.as_ref(), DataFormat::Csv.extension()),
        }
    }
}

impl DataReader for CsvDataReader {
    fn read_documents(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        for path in &self.paths {
            let mut reader = csv::Reader::from_path(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            let headers = reader.headers()?.clone();
            for record in reader.records() {
                let record = record.with_context(|| format!("bad row in {}", path.display()))?;
                let document: Document = headers
                    .iter()
                    .zip(record.iter())
                    .map(|(key, value)| (key.to_owned(), Value::String(value.to_owned())))
                    .collect();
                documents.push(document);
            }
        }
        Ok(documents)
    }
}

/// One JSON object per line.
pub struct JsonDataReader {
    paths: Vec<PathBuf>,
}

impl JsonDataReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            paths: files_with_extension(path.as_ref(), DataFormat::Json.extension()),
        }
    }

    pub fn write<'a>(documents: impl IntoIterator<Item = &'a Document>, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        for document in documents {
            serde_json::to_writer(&mut writer, document)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl DataReader for JsonDataReader {
    fn read_documents(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        for path in &self.paths {
            let file =
                File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            for (i, line) in BufReader::new(file).lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let document = serde_json::from_str(&line)
                    .with_context(|| format!("{}:{}: invalid document", path.display(), i + 1))?;
                documents.push(document);
            }
        }
        Ok(documents)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
struct Email {
    message_id: String,
    from: String,
    to: Vec<String>,
    date: String,
    subject: String,
    body: String,
    attachments: Vec<String>,
}

pub struct EmlDataReader {
    paths: Vec<PathBuf>,
}

impl EmlDataReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            paths: files_with_extension(path.as_ref(), DataFormat::Eml.extension()),
        }
    }
}

impl DataReader for EmlDataReader {
    /// Exports often contain the same message several times; only the
    /// first file carrying a given Message-ID is kept.
    fn read_documents(&self) -> Result<Vec<Document>> {
        let parsed: Vec<Option<Email>> = self
            .paths
            .par_iter()
            .progress_with_style(progress_style()?)
            .map(|path| match parse_eml_file(path) {
                Ok(email) => Some(email),
                Err(e) => {
                    warn!("Skipping {}: {e:?}", path.display());
                    None
                }
            })
            .collect();

        let mut seen_ids = AHashSet::new();
        let mut documents = Vec::new();
        for email in parsed.into_iter().flatten() {
            if !email.message_id.is_empty() && !seen_ids.insert(email.message_id.clone()) {
                continue;
            }
            if email.from.is_empty() || email.to.is_empty() {
                continue;
            }
            match serde_json::to_value(&email)? {
                Value::Object(document) => documents.push(document),
                other => return Err(anyhow!("email serialized to {other}")),
            }
        }
        info!(
            "Read {} messages from {} .eml files",
            documents.len(),
            self.paths.len()
        );
        Ok(documents)
    }
}

fn parse_eml_file(path: &Path) -> Result<Email> {
    let content = fs::read(path)?;
    parse_eml(&content)
}

fn parse_eml(content: &[u8]) -> Result<Email> {
    let parsed = parse_mail(content)?;
    let headers = &parsed.headers;
    let header = |name: &str| headers.get_first_value(name).unwrap_or_default();

    let from = header_addresses(headers, "From")?
        .into_iter()
        .next()
        .unwrap_or_default();
    let mut to = header_addresses(headers, "To")?;
    to.extend(header_addresses(headers, "Cc")?);

    let mut attachments = Vec::new();
    collect_attachment_names(&parsed, &mut attachments);

    Ok(Email {
        message_id: header("Message-ID").trim().to_owned(),
        from,
        to,
        date: header("Date").trim().to_owned(),
        subject: header("Subject"),
        body: clean_body(&plain_text_body(&parsed)?.unwrap_or_default()),
        attachments,
    })
}

/// Addresses only; display names are dropped.
fn header_addresses(headers: &[MailHeader<'_>], name: &str) -> Result<Vec<String>> {
    let Some(header) = headers.get_first_header(name) else {
        return Ok(Vec::new());
    };
    let addresses = addrparse_header(header)?;
    Ok(addresses
        .iter()
        .flat_map(|addr| match addr {
            MailAddr::Single(info) => vec![info.addr.clone()],
            MailAddr::Group(group) => group.addrs.iter().map(|info| info.addr.clone()).collect(),
        })
        .collect())
}

fn is_attachment(part: &ParsedMail<'_>) -> bool {
    part.get_content_disposition().disposition == DispositionType::Attachment
}

fn plain_text_body(part: &ParsedMail<'_>) -> Result<Option<String>> {
    if part.subparts.is_empty() {
        if !is_attachment(part) && part.ctype.mimetype.eq_ignore_ascii_case("text/plain") {
            return Ok(Some(part.get_body()?));
        }
        return Ok(None);
    }
    for subpart in &part.subparts {
        if let Some(body) = plain_text_body(subpart)? {
            return Ok(Some(body));
        }
    }
    Ok(None)
}

fn collect_attachment_names(part: &ParsedMail<'_>, names: &mut Vec<String>) {
    if is_attachment(part) {
        let disposition = part.get_content_disposition();
        if let Some(name) = disposition
            .params
            .get("filename")
            .or_else(|| part.ctype.params.get("name"))
        {
            names.push(name.clone());
        }
    }
    for subpart in &part.subparts {
        collect_attachment_names(subpart, names);
    }
}

const DAY: &str = "(?:Mon|Tue|Wed|Thu|Fri|Sat|Sun|Monday|Tuesday|Wednesday|Thursday|Friday|Saturday|Sunday)";
const MONTH: &str = "(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec|January|February|March|April|June|July|August|September|October|November|December)";
const YEAR: &str = "[0-9]{4}";
const NAME: &str = r#"[ a-zA-Z.\-"]+"#;
const ADDR: &str = r"<\n?(?:[\w._%+-]+@[\w._%+-]+\.\w{2,})\n?>";

// Markers where quoted replies, forwarded text or signatures begin.
static QUOTED_TEXT_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // names and addresses
        format!(r"On {DAY}, {MONTH} [0-9]+, {YEAR},? (?:at )?[0-9]+:[0-9][0-9] ?[AP]M,? {NAME}\s{ADDR}\s?wrote:"),
        format!(r"On {MONTH} [0-9]+, {YEAR},? (?:at )?[0-9]+:[0-9][0-9] (?:AM|PM)? ?,? {NAME}\s{ADDR}\s?wrote:"),
        format!(r"On {YEAR}-[0-9][0-9]-[0-9][0-9],? (?:at )?[0-2]?[0-9]:[0-9][0-9] ?, {NAME}\s{ADDR}\swrote:"),
        format!(r"On [0-9]?[0-9] {MONTH} {YEAR},? (?:at )?[0-9]+:[0-9][0-9] ?(?:AM|PM)? ?,? {NAME}\s{ADDR}\s?wrote:"),
        // names only
        format!(r"On {DAY}, {MONTH} [0-9]+, {YEAR},? (?:at )?[0-9]+:[0-9][0-9] [AP]M ?,? {NAME}\s*wrote:"),
        format!(r"On {DAY}, {MONTH} [0-9]+, {YEAR},? {NAME}\s{ADDR}\s?wrote:"),
        format!(r"On {MONTH} [0-9]+, {YEAR},? (?:at )?[0-9]+:[0-9][0-9] ?(?:AM|PM)? ?,? ?{NAME}\s*wrote:"),
        format!(r"On {YEAR}-[0-9][0-9]-[0-9][0-9],? (?:at )?[0-2]?[0-9]:[0-9][0-9] ?, ?{NAME}\s{ADDR}\swrote:"),
        format!(r"On [0-9]?[0-9] {MONTH} {YEAR},? (?:at )?[0-9]+:[0-9][0-9] ?(?:AM|PM)? ?,? {NAME}\swrote:"),
        // numeric dates
        format!(r"On [0-9]?[0-9]/[0-9]?[0-9]/{YEAR} (?:at )?[0-2]?[0-9]:[0-9][0-9] ?(?:AM|PM)?, {NAME}\s{ADDR}\swrote:"),
        format!(r"On [0-9]?[0-9]/[0-9]?[0-9]/{YEAR} (?:at )?[0-2]?[0-9]:[0-9][0-9] ?(?:AM|PM)?, {NAME}\swrote:"),
        // other boundaries
        "----- Original [Mm]essage -----".to_owned(),
        "--- mail_boundary ---".to_owned(),
        "[Ss]ent from my (?:iPhone|Windows|Android|mobile)".to_owned(),
        format!(r"[Ss]ent: {DAY},? {MONTH} [0-9]+, {YEAR},? (?:at )?[0-9]+:[0-9][0-9]"),
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Best-effort removal of quoted replies and signatures, then re-joins
/// hard-wrapped paragraphs. Not exhaustive.
pub fn clean_body(body: &str) -> String {
    let mut body = body.to_owned();
    for quoted in QUOTED_TEXT_RES.iter() {
        if let Some(m) = quoted.find(&body) {
            body.truncate(m.start());
        }
    }

    // a line of 65-75 chars was most likely wrapped by the mail client
    let lines: Vec<&str> = body.split('\n').collect();
    let mut chunks = Vec::with_capacity(lines.len());
    let mut active = lines[0].to_owned();
    for pair in lines.windows(2) {
        let (prev, curr) = (pair[0], pair[1]);
        if (65..=75).contains(&prev.chars().count()) {
            active.push(' ');
            active.push_str(curr);
        } else {
            chunks.push(std::mem::take(&mut active));
            active = curr.to_owned();
        }
    }
    chunks.push(active);
    chunks.join("\n").replace("    ", " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const EMAIL: &str = "Message-ID: <abc@example.com>\r\n\
From: Alice Smith <alice@example.com>\r\n\
To: bob@example.com, Carol <carol@example.com>\r\n\
Cc: dave@example.com\r\n\
Date: Mon, 5 Jan 2015 10:30:00 -0800\r\n\
Subject: Lunch\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Are we still on for lunch?\r\n\
\r\n\
Sent from my iPhone\r\n";

    #[test]
    fn test_clean_body_strips_quoted_reply() {
        let body = "Thanks, see you then.\n\nOn Mon, Jan 5, 2015 at 10:30 AM, John Smith <john@example.com> wrote:\n> earlier text";
        assert_eq!(clean_body(body), "Thanks, see you then.\n\n");
    }

    #[test]
    fn test_clean_body_strips_markers() {
        assert_eq!(
            clean_body("Short note\n----- Original Message -----\nFrom: x"),
            "Short note\n"
        );
        assert_eq!(clean_body("ok\n\nSent from my Android"), "ok\n\n");
        assert_eq!(clean_body("plain text"), "plain text");
    }

    #[test]
    fn test_clean_body_strips_every_reply_header_shape() {
        let headers = [
            "On Tue, Mar 3, 2020 at 9:15 PM, Jane Doe <jane@example.org> wrote:",
            "On Jan 5, 2015, at 10:30 AM, John Smith <john@example.com> wrote:",
            "On 2015-01-05, 10:30, John Smith <john@example.com> wrote:",
            "On 5 Jan 2015, at 10:30, John Smith wrote:",
            "On Mon, Jan 5, 2015 at 10:30 AM, John Smith wrote:",
            "On 1/5/2015 10:30 PM, John Smith <john@example.com> wrote:",
            "On 1/5/2015 at 10:30 AM, John Smith wrote:",
            "--- mail_boundary ---",
            "Sent: Mon, Jan 5, 2015 10:30",
            "sent from my Windows phone",
        ];
        for header in headers {
            let body = format!("Reply text\n{header}\n> quoted");
            assert_eq!(clean_body(&body), "Reply text\n", "header: {header}");
        }
    }

    #[test]
    fn test_clean_body_keeps_ordinary_lines() {
        let body = "On the 5th we met.\nSent: nothing yet\nwrote: a poem";
        assert_eq!(clean_body(body), body);
    }

    #[test]
    fn test_clean_body_rejoins_wrapped_lines() {
        let wrapped = "a".repeat(70);
        let body = format!("{wrapped}\ncontinued here\nshort\nnext");
        assert_eq!(clean_body(&body), format!("{wrapped} continued here\nshort\nnext"));
        assert_eq!(clean_body("a    b"), "a b");
    }

    #[test]
    fn test_parse_eml() {
        let email = parse_eml(EMAIL.as_bytes()).unwrap();
        assert_eq!(email.message_id, "<abc@example.com>");
        assert_eq!(email.from, "alice@example.com");
        assert_eq!(
            email.to,
            vec!["bob@example.com", "carol@example.com", "dave@example.com"]
        );
        assert_eq!(email.subject, "Lunch");
        assert!(email.body.starts_with("Are we still on for lunch?"));
        assert!(!email.body.contains("iPhone"));
        assert!(email.attachments.is_empty());
    }

    #[test]
    fn test_eml_reader_drops_duplicates_and_unaddressed() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("1.eml"), EMAIL).unwrap();
        fs::write(dir.path().join("2.eml"), EMAIL).unwrap();
        fs::write(
            dir.path().join("3.eml"),
            "Message-ID: <other@example.com>\r\nFrom: alice@example.com\r\nSubject: no recipients\r\n\r\nhello\r\n",
        )
        .unwrap();

        let documents = EmlDataReader::new(dir.path()).read_documents().unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0]["from"], "alice@example.com");
        assert_eq!(documents[0]["to"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_json_lines_round_trip_through_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out/docs.json");
        let docs: Vec<Document> = [r#"{"text":"hello","from":"a"}"#, r#"{"text":"bye","to":["b","c"]}"#]
            .iter()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        JsonDataReader::write(&docs, &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);

        let read = open_reader(DataFormat::Json, dir.path()).read_documents().unwrap();
        assert_eq!(read, docs);
    }

    #[test]
    fn test_json_reader_reports_bad_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{\"a\":1}\n\nnot json\n").unwrap();
        let err = JsonDataReader::new(&path).read_documents().unwrap_err();
        assert!(err.to_string().contains("bad.json:3"));
    }

    #[test]
    fn test_csv_reader() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "text,group\nhello there,x\nbye,y\n").unwrap();
        let documents = CsvDataReader::new(dir.path()).read_documents().unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0]["text"], "hello there");
        assert_eq!(documents[1]["group"], "y");
    }
}
