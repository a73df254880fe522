use deunicode::deunicode;
use serde::{de::DeserializeOwned, Deserialize};
use std::{fs::File, path::Path};

use crate::error::{Result, SotbError};

/// Charity secondary id marking the "choose your own charity" row.
pub const CYOC_SECONDARY_ID: &str = "cyoc";

/// One payee row of the splits sheet.
#[derive(Debug, Deserialize, PartialEq, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct SplitRow {
    /// Physical line the row starts on, header included.
    #[serde(skip)]
    pub line: usize,
    #[serde(default, deserialize_with = "trim_optional")]
    pub partner_payee: Option<String>,
    #[serde(default, deserialize_with = "ascii_optional")]
    pub partner_name: Option<String>,
    #[serde(default, deserialize_with = "trim_optional")]
    pub partner_secondary_id: Option<String>,
    #[serde(default, deserialize_with = "trim_optional")]
    pub charity_payee: Option<String>,
    #[serde(default, deserialize_with = "ascii_optional")]
    pub charity_name: Option<String>,
    #[serde(default, deserialize_with = "trim_optional")]
    pub charity_secondary_id: Option<String>,
    #[serde(default, rename = "mpa-bool", deserialize_with = "trim_flag")]
    pub mpa_only: bool,
    #[serde(default, rename = "initial-only-bool", deserialize_with = "trim_flag")]
    pub initial_only: bool,
    #[serde(default, rename = "cyoc-bool", deserialize_with = "trim_flag")]
    pub choose_your_own_charity: bool,
    #[serde(default, rename = "bundle-partners-bool", deserialize_with = "trim_flag")]
    pub bundle_partners: bool,
}

impl SplitRow {
    /// The charity cell points at the choose-your-own option rather than a
    /// real payee.
    pub fn is_choose_your_own(&self) -> bool {
        self.charity_secondary_id.as_deref() == Some(CYOC_SECONDARY_ID)
    }
}

/// One reward row of the tier sheet.
#[derive(Debug, Deserialize, PartialEq, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct TierRow {
    #[serde(skip)]
    pub line: usize,
    #[serde(default, deserialize_with = "trim_optional")]
    pub tier: Option<String>,
    #[serde(default, deserialize_with = "trim_optional")]
    pub game_name: Option<String>,
    #[serde(default, deserialize_with = "trim_lines")]
    pub subproducts: Vec<String>,
    #[serde(default, deserialize_with = "trim_lines")]
    pub android_subproducts: Vec<String>,
    #[serde(default, deserialize_with = "trim_lines")]
    pub soundtrack_subproducts: Vec<String>,
    #[serde(default, deserialize_with = "trim_lines")]
    pub tpkds: Vec<String>,
    #[serde(default, deserialize_with = "trim_lines")]
    pub coupondefinitions: Vec<String>,
    #[serde(default, deserialize_with = "trim_optional")]
    pub mpa_date: Option<String>,
    #[serde(default, deserialize_with = "trim_flag")]
    pub one_dollar_min: bool,
}

/// One display item row.
#[derive(Debug, Deserialize, PartialEq, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct DisplayItemRow {
    #[serde(skip)]
    pub line: usize,
    #[serde(default, deserialize_with = "trim_optional")]
    pub machine_name: Option<String>,
    #[serde(default, deserialize_with = "ascii_string")]
    pub human_name: String,
    #[serde(default, deserialize_with = "trim_optional")]
    pub r#override: Option<String>,
    #[serde(default, deserialize_with = "trim_flag")]
    pub background_image: bool,
    #[serde(default, deserialize_with = "trim_flag")]
    pub slideout_image: bool,
    #[serde(default, deserialize_with = "trim_flag")]
    pub pdf_preview: bool,
    #[serde(default, deserialize_with = "trim_flag")]
    pub audio: bool,
    #[serde(default, deserialize_with = "ascii_optional")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "trim_plus_list")]
    pub device: Vec<String>,
    #[serde(default, deserialize_with = "trim_plus_list")]
    pub drm: Vec<String>,
    #[serde(default, deserialize_with = "trim_plus_list")]
    pub platform: Vec<String>,
    #[serde(default, deserialize_with = "ascii_optional")]
    pub developer_name: Option<String>,
    #[serde(default, deserialize_with = "trim_optional")]
    pub developer_url: Option<String>,
    #[serde(default, deserialize_with = "ascii_optional")]
    pub publisher_name: Option<String>,
    #[serde(default, deserialize_with = "trim_optional")]
    pub publisher_url: Option<String>,
    #[serde(default, deserialize_with = "ascii_optional")]
    pub callout: Option<String>,
    #[serde(default, deserialize_with = "trim_optional")]
    pub youtube: Option<String>,
}

/// A sheet row that remembers where it came from.
pub trait SheetRow: DeserializeOwned {
    fn set_line(&mut self, line: usize);
}

impl SheetRow for SplitRow {
    fn set_line(&mut self, line: usize) {
        self.line = line;
    }
}

impl SheetRow for TierRow {
    fn set_line(&mut self, line: usize) {
        self.line = line;
    }
}

impl SheetRow for DisplayItemRow {
    fn set_line(&mut self, line: usize) {
        self.line = line;
    }
}

pub fn read_csv<T, P>(path: P) -> Result<Vec<T>>
where
    T: SheetRow,
    P: AsRef<Path>,
{
    let file = File::open(path)?;
    read_records(file)
}

pub fn read_records<T, R>(reader: R) -> Result<Vec<T>>
where
    T: SheetRow,
    R: std::io::Read,
{
    // The CSV reader is buffered automatically
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();

    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result?;
        // quoted cells can span lines, so the record index is not enough
        let line = record.position().map_or(0, |pos| pos.line() as usize);
        let mut row: T = record.deserialize(Some(&headers))?;
        row.set_line(line);
        records.push(row);
    }

    if records.is_empty() {
        return Err(SotbError::EmptyInput);
    }

    Ok(records)
}

/// Spreadsheet exports write `0` or nothing for an absent value.
fn absent(value: &str) -> bool {
    value.is_empty() || value == "0"
}

fn trim_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = String::deserialize(deserializer)?;
    Ok(s.trim().to_owned())
}

fn trim_optional<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = String::deserialize(deserializer)?;
    let trimmed = s.trim();
    if absent(trimmed) {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_owned()))
    }
}

/// The model importer only takes ASCII text.
fn ascii_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(deunicode(&trim_string(deserializer)?))
}

fn ascii_optional<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(trim_optional(deserializer)?.map(|s| deunicode(&s)))
}

fn trim_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = String::deserialize(deserializer)?;
    let trimmed = s.trim();
    match trimmed.to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "" | "0" | "false" | "no" => Ok(false),
        _ => Err(serde::de::Error::invalid_value(
            serde::de::Unexpected::Str(trimmed),
            &"one of 1, 0, true, false, yes, no",
        )),
    }
}

/// A cell holding several machine names, one per line.
fn trim_lines<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = String::deserialize(deserializer)?;
    if absent(s.trim()) {
        return Ok(Vec::new());
    }

    Ok(s.lines()
        .map(str::trim)
        .filter(|line| !absent(line))
        .map(str::to_owned)
        .collect())
}

/// A cell like `windows+mac+linux`.
fn trim_plus_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = String::deserialize(deserializer)?;
    Ok(s.split('+')
        .map(str::trim)
        .filter(|part| !absent(part))
        .map(str::to_owned)
        .collect())
}
