// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Monthly reward CSV import.
//!
//! Vendor exports differ in column labels (English or Japanese, with or
//! without units) so headers are matched heuristically:
//!
//! 1. exact match of the normalised header against a column alias
//! 2. an alias of five or more characters contained in the header
//! 3. Jaro-Winkler similarity of at least 0.90 to any alias
//!
//! Parsing is pure. Resolution against the roster, preview and import go
//! through `Persistence`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

use csv::StringRecord;
use liverdesk_audit::{AuditEvent, Cause};
use liverdesk_domain::{
    CommissionRate, DataMonth, Decimal, ExchangeRate, RewardLine, normalize_agency_code,
};
use liverdesk_persistence::{
    AgencyData, ImportOutcome, LiverData, NewReport, NewReportRow, Persistence, ReportData,
};
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auth::{AuthenticatedActor, AuthorizationService};
use crate::error::{ApiError, translate_domain_error, translate_persistence_error};
use crate::handlers::{checked_total_decimal, checked_total_jpy};
use crate::request_response::{
    ImportPreviewResponse, ImportReportResponse, PreviewRow, ReportImportRequest,
};

/// Minimum Jaro-Winkler similarity for a fuzzy header match.
pub const FUZZY_MATCH_THRESHOLD: f64 = 0.90;

/// Aliases shorter than this only match exactly.
const MIN_CONTAINED_ALIAS_CHARS: usize = 5;

/// Errors raised while reading a CSV file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CsvImportError {
    #[error("CSV file has no header row")]
    Empty,

    #[error("CSV is malformed near line {line}: {message}")]
    Malformed { line: u64, message: String },

    #[error("Missing required columns: {columns}")]
    MissingColumns { columns: String },

    #[error("Line {line}: invalid {column} value '{value}'")]
    InvalidNumber {
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("Line {line}: invalid data month '{value}'")]
    InvalidDataMonth { line: u64, value: String },

    #[error("File mixes data months {first} and {second}")]
    ConflictingDataMonths { first: DataMonth, second: DataMonth },

    #[error("No data month given and none found in the file")]
    NoDataMonth,

    #[error("CSV contains no importable rows")]
    NoRows,
}

/// Logical columns of a reward export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    CreatorId,
    Handle,
    CreatorName,
    Diamonds,
    RewardUsd,
    Agency,
    DataMonth,
}

impl Column {
    /// Matching order; earlier columns claim headers first.
    pub const ALL: [Self; 7] = [
        Self::CreatorId,
        Self::Handle,
        Self::RewardUsd,
        Self::Diamonds,
        Self::CreatorName,
        Self::Agency,
        Self::DataMonth,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CreatorId => "creator_id",
            Self::Handle => "handle",
            Self::CreatorName => "creator_name",
            Self::Diamonds => "diamonds",
            Self::RewardUsd => "reward_usd",
            Self::Agency => "agency",
            Self::DataMonth => "data_month",
        }
    }

    /// Header labels seen in vendor exports.
    #[must_use]
    pub const fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::CreatorId => &[
                "creator_id",
                "creator id",
                "creator user id",
                "tiktok user id",
                "user id",
                "uid",
                "クリエイターID",
                "ユーザーID",
                "クリエイターのID",
            ],
            Self::Handle => &[
                "handle",
                "username",
                "creator username",
                "tiktok handle",
                "tiktok username",
                "ユーザー名",
                "ハンドル",
                "ハンドルネーム",
            ],
            Self::CreatorName => &[
                "creator_name",
                "creator name",
                "creator nickname",
                "nickname",
                "display name",
                "name",
                "クリエイター名",
                "ニックネーム",
                "表示名",
                "名前",
            ],
            Self::Diamonds => &[
                "diamonds",
                "diamond",
                "total diamonds",
                "diamonds received",
                "ダイヤモンド",
                "ダイヤモンド数",
                "ダイヤ",
            ],
            Self::RewardUsd => &[
                "reward_usd",
                "reward (usd)",
                "reward usd",
                "estimated reward",
                "estimated rewards",
                "rewards",
                "reward",
                "revenue (usd)",
                "usd",
                "報酬(USD)",
                "推定報酬",
                "見込み報酬",
                "報酬",
            ],
            Self::Agency => &[
                "agency",
                "agency code",
                "agency name",
                "事務所",
                "所属事務所",
                "代理店",
                "エージェンシー",
            ],
            Self::DataMonth => &[
                "data_month",
                "data month",
                "month",
                "period",
                "対象月",
                "データ月",
                "年月",
                "期間",
            ],
        }
    }
}

impl Column {
    /// Whether a normalised header may hold this column at all.
    ///
    /// Yen amounts are never read as the USD reward, whatever else the
    /// header says.
    fn accepts(self, normalized_header: &str) -> bool {
        match self {
            Self::RewardUsd => !["jpy", "yen", "円"]
                .iter()
                .any(|marker| normalized_header.contains(marker)),
            _ => true,
        }
    }
}

/// Normalises a header or alias for comparison.
///
/// Lower-cases and drops the BOM, whitespace, `_`, `-` and both ASCII and
/// full-width parentheses.
#[must_use]
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|&c| {
            !c.is_whitespace() && !matches!(c, '\u{feff}' | '_' | '-' | '(' | ')' | '（' | '）')
        })
        .flat_map(char::to_lowercase)
        .collect()
}

/// Maps logical columns to header positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMap {
    positions: BTreeMap<Column, usize>,
    labels: BTreeMap<Column, String>,
}

impl HeaderMap {
    #[must_use]
    pub fn position(&self, column: Column) -> Option<usize> {
        self.positions.get(&column).copied()
    }

    /// Logical column to the header text it matched.
    #[must_use]
    pub const fn labels(&self) -> &BTreeMap<Column, String> {
        &self.labels
    }
}

/// Gives each unassigned column the first unclaimed header accepted by
/// `matches`.
fn assign_columns(
    normalized: &[String],
    aliases: &BTreeMap<Column, Vec<String>>,
    positions: &mut BTreeMap<Column, usize>,
    claimed: &mut HashSet<usize>,
    matches: impl Fn(&str, &str) -> bool,
) {
    for column in Column::ALL {
        if positions.contains_key(&column) {
            continue;
        }
        let Some(column_aliases) = aliases.get(&column) else {
            continue;
        };
        let found: Option<usize> = normalized.iter().enumerate().find_map(|(idx, header)| {
            let hit: bool = !header.is_empty()
                && !claimed.contains(&idx)
                && column.accepts(header)
                && column_aliases.iter().any(|alias| matches(header, alias));
            hit.then_some(idx)
        });
        if let Some(idx) = found {
            positions.insert(column, idx);
            claimed.insert(idx);
        }
    }
}

/// Matches headers to logical columns.
///
/// # Errors
///
/// Returns `CsvImportError::MissingColumns` unless a creator id or handle
/// column and a reward column are found.
pub fn match_headers(headers: &StringRecord) -> Result<HeaderMap, CsvImportError> {
    let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
    let aliases: BTreeMap<Column, Vec<String>> = Column::ALL
        .iter()
        .map(|c| (*c, c.aliases().iter().map(|a| normalize_header(a)).collect()))
        .collect();

    let mut positions: BTreeMap<Column, usize> = BTreeMap::new();
    let mut claimed: HashSet<usize> = HashSet::new();

    assign_columns(&normalized, &aliases, &mut positions, &mut claimed, |header, alias| {
        header == alias
    });
    assign_columns(&normalized, &aliases, &mut positions, &mut claimed, |header, alias| {
        alias.chars().count() >= MIN_CONTAINED_ALIAS_CHARS && header.contains(alias)
    });

    for column in Column::ALL {
        if positions.contains_key(&column) {
            continue;
        }
        let best: Option<(usize, f64)> = normalized
            .iter()
            .enumerate()
            .filter(|(idx, header)| {
                !header.is_empty() && !claimed.contains(idx) && column.accepts(header)
            })
            .map(|(idx, header)| {
                let score: f64 = aliases
                    .get(&column)
                    .into_iter()
                    .flatten()
                    .map(|alias| strsim::jaro_winkler(header, alias))
                    .fold(0.0, f64::max);
                (idx, score)
            })
            .filter(|(_, score)| *score >= FUZZY_MATCH_THRESHOLD)
            .max_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((idx, score)) = best {
            debug!(column = column.as_str(), header = %normalized[idx], score, "Fuzzy header match");
            positions.insert(column, idx);
            claimed.insert(idx);
        }
    }

    let mut missing: Vec<&str> = Vec::new();
    if !positions.contains_key(&Column::CreatorId) && !positions.contains_key(&Column::Handle) {
        missing.push("creator_id or handle");
    }
    if !positions.contains_key(&Column::RewardUsd) {
        missing.push("reward_usd");
    }
    if !missing.is_empty() {
        return Err(CsvImportError::MissingColumns {
            columns: missing.join(", "),
        });
    }

    let labels: BTreeMap<Column, String> = positions
        .iter()
        .map(|(column, idx)| {
            let label: String = headers.get(*idx).unwrap_or_default().trim().to_string();
            (*column, label.trim_start_matches('\u{feff}').to_string())
        })
        .collect();

    Ok(HeaderMap { positions, labels })
}

/// Parses a money-like cell. `$`, `,` and surrounding spaces are ignored
/// and an empty cell is zero.
fn parse_number(cell: &str) -> Option<Decimal> {
    let cleaned: String = cell
        .trim()
        .chars()
        .filter(|&c| !matches!(c, '$' | ',' | '＄' | '，'))
        .collect();
    let cleaned: &str = cleaned.trim();
    if cleaned.is_empty() {
        return Some(Decimal::ZERO);
    }
    Decimal::from_str(cleaned).ok()
}

/// One creator's reward line as read from the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    /// Physical line of the first occurrence.
    pub line: u64,
    pub creator_id: Option<String>,
    /// Handle without a leading `@`.
    pub creator_handle: Option<String>,
    pub creator_name: Option<String>,
    pub diamonds: i64,
    pub reward_usd: Decimal,
    /// Agency code or name as written in the file.
    pub agency: Option<String>,
    /// The original cells keyed by header.
    pub raw: serde_json::Value,
}

/// A parsed reward export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReport {
    pub headers: HeaderMap,
    pub rows: Vec<ParsedRow>,
    pub warnings: Vec<String>,
    /// The month written in the file, if it has a month column.
    pub file_month: Option<DataMonth>,
}

/// Parses a reward export.
///
/// Rows without any identifier are skipped with a warning. Rows sharing a
/// creator id (or, lacking one, a handle) are merged by summing diamonds
/// and rewards.
///
/// # Errors
///
/// Returns an error if the file has no header, required columns are
/// missing, a number does not parse, or rows disagree on the month.
pub fn parse_report_csv(input: &str) -> Result<ParsedReport, CsvImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input.as_bytes());

    let header_record: StringRecord = reader
        .headers()
        .map_err(|e| CsvImportError::Malformed {
            line: 1,
            message: e.to_string(),
        })?
        .clone();
    if header_record.iter().all(|h| normalize_header(h).is_empty()) {
        return Err(CsvImportError::Empty);
    }

    let headers: HeaderMap = match_headers(&header_record)?;
    let cell = |record: &StringRecord, column: Column| -> Option<String> {
        headers
            .position(column)
            .and_then(|idx| record.get(idx))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
    };

    let mut rows: Vec<ParsedRow> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();
    let mut warnings: Vec<String> = Vec::new();
    let mut file_month: Option<DataMonth> = None;

    for (index, result) in reader.records().enumerate() {
        let fallback_line: u64 = u64::try_from(index).unwrap_or(u64::MAX).saturating_add(2);
        let record: StringRecord = result.map_err(|e| CsvImportError::Malformed {
            line: e.position().map_or(fallback_line, csv::Position::line),
            message: e.to_string(),
        })?;
        let line: u64 = record.position().map_or(fallback_line, csv::Position::line);

        if record.iter().all(str::is_empty) {
            continue;
        }

        if let Some(value) = cell(&record, Column::DataMonth) {
            let month: DataMonth = DataMonth::parse(&value)
                .map_err(|_| CsvImportError::InvalidDataMonth { line, value })?;
            match file_month {
                Some(first) if first != month => {
                    return Err(CsvImportError::ConflictingDataMonths {
                        first,
                        second: month,
                    });
                }
                _ => file_month = Some(month),
            }
        }

        let creator_id: Option<String> = cell(&record, Column::CreatorId);
        let creator_handle: Option<String> = cell(&record, Column::Handle)
            .map(|h| h.trim_start_matches('@').to_string())
            .filter(|h| !h.is_empty());

        let key: String = match (&creator_id, &creator_handle) {
            (Some(id), _) => format!("id:{id}"),
            (None, Some(handle)) => format!("handle:{}", handle.to_lowercase()),
            (None, None) => {
                warnings.push(format!("Line {line}: no creator id or handle, row skipped"));
                continue;
            }
        };

        let reward_cell: String = cell(&record, Column::RewardUsd).unwrap_or_default();
        let reward_usd: Decimal = parse_number(&reward_cell)
            .filter(|v| !v.is_sign_negative() || v.is_zero())
            .ok_or_else(|| CsvImportError::InvalidNumber {
                line,
                column: Column::RewardUsd.as_str(),
                value: reward_cell.clone(),
            })?;

        let diamonds_cell: String = cell(&record, Column::Diamonds).unwrap_or_default();
        let diamonds: i64 = parse_number(&diamonds_cell)
            .and_then(|v| v.trunc().to_i64())
            .filter(|v| *v >= 0)
            .ok_or_else(|| CsvImportError::InvalidNumber {
                line,
                column: Column::Diamonds.as_str(),
                value: diamonds_cell.clone(),
            })?;

        if let Some(&existing) = by_key.get(&key) {
            let row: &mut ParsedRow = &mut rows[existing];
            row.diamonds = row.diamonds.saturating_add(diamonds);
            row.reward_usd = row.reward_usd.checked_add(reward_usd).ok_or_else(|| {
                CsvImportError::InvalidNumber {
                    line,
                    column: Column::RewardUsd.as_str(),
                    value: reward_cell.clone(),
                }
            })?;
            warnings.push(format!(
                "Line {line}: duplicate creator merged into line {}",
                row.line
            ));
            continue;
        }

        let raw: serde_json::Map<String, serde_json::Value> = header_record
            .iter()
            .zip(record.iter())
            .map(|(h, v)| {
                (
                    h.trim_start_matches('\u{feff}').to_string(),
                    serde_json::Value::String(v.to_string()),
                )
            })
            .collect();

        by_key.insert(key, rows.len());
        rows.push(ParsedRow {
            line,
            creator_id,
            creator_handle,
            creator_name: cell(&record, Column::CreatorName),
            diamonds,
            reward_usd,
            agency: cell(&record, Column::Agency),
            raw: serde_json::Value::Object(raw),
        });
    }

    debug!(rows = rows.len(), warnings = warnings.len(), "Parsed reward CSV");
    Ok(ParsedReport {
        headers,
        rows,
        warnings,
        file_month,
    })
}

/// Picks the month a report covers.
///
/// An explicit month wins; otherwise the file's month column is used.
///
/// # Errors
///
/// Returns an error if the explicit month is malformed or no month is
/// available.
pub fn resolve_data_month(
    explicit: Option<&str>,
    parsed: &ParsedReport,
) -> Result<DataMonth, ApiError> {
    match explicit.map(str::trim).filter(|m| !m.is_empty()) {
        Some(value) => DataMonth::parse(value).map_err(translate_domain_error),
        None => parsed
            .file_month
            .ok_or_else(|| CsvImportError::NoDataMonth.into()),
    }
}

/// Rows ready to store, with the roster links resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRows {
    pub rows: Vec<NewReportRow>,
    pub warnings: Vec<String>,
    /// Rows that matched no liver.
    pub unmatched_rows: usize,
}

/// Agencies indexed for lookups by code and by name.
struct AgencyIndex {
    by_id: HashMap<i64, AgencyData>,
    by_code: HashMap<String, i64>,
    by_name: HashMap<String, i64>,
}

impl AgencyIndex {
    fn new(agencies: Vec<AgencyData>) -> Self {
        let mut index = Self {
            by_id: HashMap::new(),
            by_code: HashMap::new(),
            by_name: HashMap::new(),
        };
        for agency in agencies {
            index.by_code.insert(agency.code.clone(), agency.agency_id);
            index
                .by_name
                .insert(agency.name.trim().to_lowercase(), agency.agency_id);
            index.by_id.insert(agency.agency_id, agency);
        }
        index
    }

    fn lookup(&self, label: &str) -> Option<i64> {
        normalize_agency_code(label)
            .ok()
            .and_then(|code| self.by_code.get(&code).copied())
            .or_else(|| self.by_name.get(&label.trim().to_lowercase()).copied())
    }

    fn commission_rate(&self, agency_id: Option<i64>) -> CommissionRate {
        agency_id
            .and_then(|id| self.by_id.get(&id))
            .map_or_else(CommissionRate::zero, |a| a.commission_rate)
    }
}

/// Links parsed rows to livers and agencies and computes yen figures.
///
/// Livers are found by TikTok user id, then by handle. The agency comes
/// from the liver, else from the file's agency column by code or name.
/// Rows without an agency carry a zero commission rate.
///
/// # Errors
///
/// Returns an error if a lookup fails or a computation overflows.
pub fn resolve_rows(
    persistence: &mut Persistence,
    parsed: &ParsedReport,
    exchange_rate: ExchangeRate,
) -> Result<ResolvedRows, ApiError> {
    let agencies: AgencyIndex = AgencyIndex::new(
        persistence
            .list_agencies()
            .map_err(|e| translate_persistence_error(e, "Agency"))?,
    );

    let mut rows: Vec<NewReportRow> = Vec::with_capacity(parsed.rows.len());
    let mut warnings: Vec<String> = Vec::new();
    let mut unmatched_rows: usize = 0;

    for row in &parsed.rows {
        let mut liver: Option<LiverData> = None;
        if let Some(id) = &row.creator_id {
            liver = persistence
                .get_liver_by_tiktok_user_id(id)
                .map_err(|e| translate_persistence_error(e, "Liver"))?;
        }
        if let (None, Some(handle)) = (&liver, &row.creator_handle) {
            liver = persistence
                .find_liver_by_handle(handle)
                .map_err(|e| translate_persistence_error(e, "Liver"))?;
        }

        if liver.is_none() {
            unmatched_rows += 1;
            warnings.push(format!(
                "Line {}: creator {} is not in the roster",
                row.line,
                row.creator_id
                    .as_deref()
                    .or(row.creator_handle.as_deref())
                    .unwrap_or_default()
            ));
        }

        let mut agency_id: Option<i64> = liver.as_ref().and_then(|l| l.agency_id);
        if let (None, Some(label)) = (agency_id, &row.agency) {
            agency_id = agencies.lookup(label);
            if agency_id.is_none() {
                warnings.push(format!("Line {}: unknown agency '{label}'", row.line));
            }
        }

        let commission_rate: CommissionRate = agencies.commission_rate(agency_id);
        let line: RewardLine = RewardLine::compute(row.reward_usd, exchange_rate, commission_rate)
            .map_err(translate_domain_error)?;

        rows.push(NewReportRow {
            agency_id,
            liver_id: liver.as_ref().map(|l| l.liver_id),
            creator_id: row.creator_id.clone(),
            creator_handle: row.creator_handle.clone(),
            creator_name: row.creator_name.clone(),
            diamonds: row.diamonds,
            reward_usd: row.reward_usd,
            reward_jpy: line.reward_jpy,
            commission_rate,
            commission_jpy: line.commission_jpy,
            raw: row.raw.clone(),
        });
    }

    Ok(ResolvedRows {
        rows,
        warnings,
        unmatched_rows,
    })
}

/// Reads the request's CSV, month and rate.
fn prepare(
    persistence: &mut Persistence,
    request: &ReportImportRequest,
) -> Result<(ParsedReport, DataMonth, ExchangeRate, ResolvedRows), ApiError> {
    let exchange_rate: ExchangeRate = request
        .exchange_rate
        .trim()
        .parse()
        .map_err(translate_domain_error)?;
    let parsed: ParsedReport = parse_report_csv(&request.csv)?;
    let data_month: DataMonth = resolve_data_month(request.data_month.as_deref(), &parsed)?;
    let resolved: ResolvedRows = resolve_rows(persistence, &parsed, exchange_rate)?;
    Ok((parsed, data_month, exchange_rate, resolved))
}

/// Previews a reward CSV import without writing anything.
///
/// # Arguments
///
/// * `persistence` - The persistence layer
/// * `request` - The upload
/// * `authenticated_actor` - The authenticated actor
///
/// # Returns
///
/// The rows as they would be stored, warnings, and the id of an existing
/// report for the same month, if any.
///
/// # Errors
///
/// Returns an error if the actor is not an admin or the file cannot be read.
pub fn preview_report_import(
    persistence: &mut Persistence,
    request: &ReportImportRequest,
    authenticated_actor: &AuthenticatedActor,
) -> Result<ImportPreviewResponse, ApiError> {
    AuthorizationService::require_admin(authenticated_actor, "preview_report_import")?;

    let (parsed, data_month, exchange_rate, resolved) = prepare(persistence, request)?;
    let existing: Option<ReportData> = persistence
        .find_report_by_month(data_month)
        .map_err(|e| translate_persistence_error(e, "Report"))?;

    let mut warnings: Vec<String> = parsed.warnings;
    warnings.extend(resolved.warnings);

    let rows: Vec<PreviewRow> = resolved
        .rows
        .iter()
        .map(|row| PreviewRow {
            creator_id: row.creator_id.clone(),
            creator_handle: row.creator_handle.clone(),
            creator_name: row.creator_name.clone(),
            diamonds: row.diamonds,
            reward_usd: row.reward_usd,
            reward_jpy: row.reward_jpy,
            commission_rate: row.commission_rate.percent(),
            commission_jpy: row.commission_jpy,
            liver_id: row.liver_id,
            agency_id: row.agency_id,
        })
        .collect();

    let total_reward_usd: Decimal =
        checked_total_decimal("total_reward_usd", resolved.rows.iter().map(|r| r.reward_usd))?;
    let total_reward_jpy: i64 =
        checked_total_jpy("total_reward_jpy", resolved.rows.iter().map(|r| r.reward_jpy))?;
    let total_commission_jpy: i64 = checked_total_jpy(
        "total_commission_jpy",
        resolved.rows.iter().map(|r| r.commission_jpy),
    )?;

    Ok(ImportPreviewResponse {
        data_month: data_month.to_string(),
        exchange_rate: exchange_rate.value(),
        month_collision: existing.map(|r| r.report_id),
        matched_columns: parsed
            .headers
            .labels()
            .iter()
            .map(|(column, label)| (column.as_str().to_string(), label.clone()))
            .collect(),
        total_reward_usd,
        total_reward_jpy,
        total_commission_jpy,
        unmatched_rows: resolved.unmatched_rows,
        rows,
        warnings,
    })
}

/// Imports a reward CSV as the report for its month.
///
/// If a report for the month exists the import is refused unless
/// `replace_existing` is set, in which case the old report is replaced in
/// the same transaction and its refunds move to the new one.
///
/// # Arguments
///
/// * `persistence` - The persistence layer
/// * `request` - The upload
/// * `authenticated_actor` - The authenticated actor
/// * `cause` - The cause recorded in the audit event
///
/// # Errors
///
/// Returns an error if:
/// - The actor is not an admin
/// - The file, month or rate is invalid, or the file has no rows
/// - A report exists for the month and `replace_existing` is false
/// - The existing report has invoices
pub fn import_report(
    persistence: &mut Persistence,
    request: &ReportImportRequest,
    authenticated_actor: &AuthenticatedActor,
    cause: Cause,
) -> Result<ImportReportResponse, ApiError> {
    AuthorizationService::require_admin(authenticated_actor, "import_report")?;

    let (parsed, data_month, exchange_rate, resolved) = prepare(persistence, request)?;
    if resolved.rows.is_empty() {
        return Err(CsvImportError::NoRows.into());
    }

    let existing: Option<ReportData> = persistence
        .find_report_by_month(data_month)
        .map_err(|e| translate_persistence_error(e, "Report"))?;
    let replace: Option<i64> = match existing {
        Some(report) if !request.replace_existing => {
            warn!(
                data_month = %data_month,
                report_id = report.report_id,
                "Import refused: month already imported"
            );
            return Err(ApiError::Conflict {
                resource_type: String::from("Report"),
                message: format!(
                    "A report for {data_month} already exists (report {}); set replace_existing to replace it",
                    report.report_id
                ),
            });
        }
        Some(report) => Some(report.report_id),
        None => None,
    };

    let new_report: NewReport = NewReport {
        data_month,
        exchange_rate,
        revenue_task: request
            .revenue_task
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(ToString::to_string),
        source_filename: request.source_filename.clone(),
        created_by: authenticated_actor.operator_id,
    };

    let action: &str = if replace.is_some() {
        "ReplaceReport"
    } else {
        "ImportReport"
    };
    let event: AuditEvent = authenticated_actor.audit_event(
        cause,
        action,
        Some(format!(
            "month={data_month} rate={exchange_rate} rows={}",
            resolved.rows.len()
        )),
        "report",
        None,
    );

    let outcome: ImportOutcome = persistence
        .import_report(&new_report, &resolved.rows, replace, &event)
        .map_err(|e| translate_persistence_error(e, "Report"))?;

    info!(
        report_id = outcome.report_id,
        data_month = %data_month,
        rows = outcome.rows_inserted,
        replaced = ?outcome.replaced_report_id,
        "Report imported"
    );

    let mut warnings: Vec<String> = parsed.warnings;
    warnings.extend(resolved.warnings);

    Ok(ImportReportResponse {
        report_id: outcome.report_id,
        data_month: data_month.to_string(),
        rows_inserted: outcome.rows_inserted,
        replaced_report_id: outcome.replaced_report_id,
        refunds_migrated: outcome.refunds_migrated,
        warnings,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn headers(labels: &[&str]) -> StringRecord {
        StringRecord::from(labels.to_vec())
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("\u{feff}Reward (USD)"), "rewardusd");
        assert_eq!(normalize_header("報酬（USD）"), "報酬usd");
        assert_eq!(normalize_header(" Creator_ID "), "creatorid");
        assert_eq!(normalize_header("data-month"), "datamonth");
    }

    #[test]
    fn test_exact_match_english() {
        let map = match_headers(&headers(&["Creator ID", "Handle", "Reward (USD)"])).unwrap();
        assert_eq!(map.position(Column::CreatorId), Some(0));
        assert_eq!(map.position(Column::Handle), Some(1));
        assert_eq!(map.position(Column::RewardUsd), Some(2));
        assert_eq!(map.position(Column::Diamonds), None);
    }

    #[test]
    fn test_exact_match_japanese() {
        let map = match_headers(&headers(&["ユーザー名", "ダイヤモンド", "報酬（USD）", "事務所"]))
            .unwrap();
        assert_eq!(map.position(Column::Handle), Some(0));
        assert_eq!(map.position(Column::Diamonds), Some(1));
        assert_eq!(map.position(Column::RewardUsd), Some(2));
        assert_eq!(map.position(Column::Agency), Some(3));
    }

    #[test]
    fn test_contained_alias_match() {
        let map = match_headers(&headers(&[
            "TikTok User ID (numeric)",
            "Estimated Reward USD (this month)",
        ]))
        .unwrap();
        assert_eq!(map.position(Column::CreatorId), Some(0));
        assert_eq!(map.position(Column::RewardUsd), Some(1));
    }

    #[test]
    fn test_short_alias_is_not_matched_inside_longer_header() {
        // "name" must not claim the username column.
        let map = match_headers(&headers(&["Creator Username", "Rewards"])).unwrap();
        assert_eq!(map.position(Column::Handle), Some(0));
        assert_eq!(map.position(Column::CreatorName), None);
    }

    #[test]
    fn test_yen_columns_never_match_usd_reward() {
        let map = match_headers(&headers(&[
            "Handle",
            "Estimated Reward (JPY)",
            "Estimated Reward USD",
        ]))
        .unwrap();
        assert_eq!(map.position(Column::RewardUsd), Some(2));

        for label in ["Reward (JPY)", "報酬(円)", "Rewards yen"] {
            let err = match_headers(&headers(&["Handle", label])).unwrap_err();
            assert_eq!(
                err,
                CsvImportError::MissingColumns {
                    columns: String::from("reward_usd")
                },
                "{label}"
            );
        }
    }

    #[test]
    fn test_fuzzy_match_typo() {
        let map = match_headers(&headers(&["Handle", "Diamonds", "Rewrds"])).unwrap();
        assert_eq!(map.position(Column::RewardUsd), Some(2));
    }

    #[test]
    fn test_missing_required_columns() {
        let err = match_headers(&headers(&["Nickname", "Diamonds"])).unwrap_err();
        assert_eq!(
            err,
            CsvImportError::MissingColumns {
                columns: String::from("creator_id or handle, reward_usd")
            }
        );
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_number(" $1,234.50 "), Some(Decimal::new(123_450, 2)));
        assert_eq!(parse_number(""), Some(Decimal::ZERO));
        assert_eq!(parse_number("abc"), None);
    }

    #[test]
    fn test_parse_rows_skips_and_merges() {
        let csv = "Creator ID,Handle,Diamonds,Reward (USD)\n\
                   111,@alpha,1000,$10.50\n\
                   ,,5,1.00\n\
                   111,alpha,500,\"1,000.25\"\n\
                   ,beta,20,2\n";
        let parsed = parse_report_csv(csv).unwrap();

        assert_eq!(parsed.rows.len(), 2);
        let alpha = &parsed.rows[0];
        assert_eq!(alpha.creator_id.as_deref(), Some("111"));
        assert_eq!(alpha.creator_handle.as_deref(), Some("alpha"));
        assert_eq!(alpha.diamonds, 1500);
        assert_eq!(alpha.reward_usd, Decimal::new(101_075, 2));
        assert_eq!(alpha.line, 2);
        assert_eq!(parsed.rows[1].creator_handle.as_deref(), Some("beta"));

        assert_eq!(parsed.warnings.len(), 2);
        assert!(parsed.warnings[0].contains("Line 3"));
        assert!(parsed.warnings[1].contains("merged into line 2"));
    }

    #[test]
    fn test_parse_rejects_bad_reward() {
        let csv = "Handle,Reward\nalpha,ten\n";
        let err = parse_report_csv(csv).unwrap_err();
        assert!(matches!(
            err,
            CsvImportError::InvalidNumber {
                line: 2,
                column: "reward_usd",
                ..
            }
        ));
    }

    #[test]
    fn test_parse_rejects_negative_reward() {
        let csv = "Handle,Reward\nalpha,-3\n";
        assert!(matches!(
            parse_report_csv(csv),
            Err(CsvImportError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_merging_oversized_duplicates_is_rejected() {
        let csv = "Handle,Reward\n\
                   alpha,50000000000000000000000000000\n\
                   alpha,50000000000000000000000000000\n";
        let err = parse_report_csv(csv).unwrap_err();
        assert!(matches!(
            err,
            CsvImportError::InvalidNumber {
                line: 3,
                column: "reward_usd",
                ..
            }
        ));
    }

    #[test]
    fn test_month_column_must_agree() {
        let csv = "Handle,Reward,Month\nalpha,1,2024-05\nbeta,2,2024-06\n";
        assert!(matches!(
            parse_report_csv(csv),
            Err(CsvImportError::ConflictingDataMonths { .. })
        ));
    }

    #[test]
    fn test_resolve_data_month() {
        let csv = "Handle,Reward,対象月\nalpha,1,2024年5月\n";
        let parsed = parse_report_csv(csv).unwrap();
        assert_eq!(
            resolve_data_month(None, &parsed).unwrap(),
            DataMonth::new(2024, 5).unwrap()
        );
        assert_eq!(
            resolve_data_month(Some("2024/07"), &parsed).unwrap(),
            DataMonth::new(2024, 7).unwrap()
        );

        let without = parse_report_csv("Handle,Reward\nalpha,1\n").unwrap();
        assert!(matches!(
            resolve_data_month(None, &without),
            Err(ApiError::InvalidCsvFormat { .. })
        ));
    }

    #[test]
    fn test_empty_file() {
        assert_eq!(parse_report_csv(""), Err(CsvImportError::Empty));
    }

    #[test]
    fn test_raw_keeps_original_cells() {
        let parsed = parse_report_csv("Handle,Reward,Extra\nalpha,1,kept\n").unwrap();
        assert_eq!(parsed.rows[0].raw["Extra"], "kept");
    }
}
