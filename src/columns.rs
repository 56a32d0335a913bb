//! Header-driven column role resolution.
//!
//! The sheet layout is not fixed: columns may be reordered and labels may repeat
//! (for example a `NAME` column on both sides of `URL`). Roles are resolved
//! relative to the `URL` anchor so a duplicate label picks the occurrence on the
//! expected side.
use std::collections::BTreeMap;
use thiserror::Error;

pub const URL_LABEL: &str = "URL";
pub const NAME_LABEL: &str = "NAME";
pub const NUM_EMPLOYEES_LABEL: &str = "NUM_EMPLOYEES";
pub const CONTACT_FORM_URL_LABEL: &str = "CONTACT_FORM_URL";
pub const ADDRESS_LABEL: &str = "ADDRESS";
pub const PREFECTURE_ID_LABEL: &str = "PREFECTURE_ID";
pub const REGISTERED_NAME_LABELS: [&str; 3] =
    ["REGISTERED_COMPANY_NAME", "REGISTERED_NAME", "登記業名"];
pub const SEARCH_RESULT_LABEL: &str = "検索結果";
pub const SALES_LETTER_LABEL: &str = "セールスレター";

/// Number of chained generation stages a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stages {
    /// Only the search result column is generated.
    Single,
    /// Search result, then a sales letter built from it.
    Chained,
}

/// A required header label was not found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("column '{label}' is missing from the header row; check the spreadsheet")]
pub struct MissingColumnError {
    pub label: String,
}

/// Zero-based column index for each semantic role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRoleMap {
    pub name: usize,
    pub url: usize,
    pub search_result: usize,
    /// Present exactly when resolved for [`Stages::Chained`].
    pub sales_letter: Option<usize>,
    pub num_employees: Option<usize>,
    pub contact_form_url: Option<usize>,
    pub address: Option<usize>,
    pub prefecture_id: Option<usize>,
    pub registered_company_name: Option<usize>,
}

/// Where a role's column must sit relative to a reference column.
#[derive(Debug, Clone, Copy)]
enum Position {
    Any,
    Before(usize),
    After(usize),
}

struct HeaderIndex {
    positions: BTreeMap<String, Vec<usize>>,
}

impl HeaderIndex {
    fn new(header: &[String]) -> Self {
        let mut positions: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (idx, label) in header.iter().enumerate() {
            let label = label.trim();
            if label.is_empty() {
                continue;
            }
            positions.entry(label.to_string()).or_default().push(idx);
        }
        Self { positions }
    }

    /// First occurrence of `label` satisfying `position`, else its first
    /// occurrence anywhere.
    fn pick(&self, label: &str, position: Position) -> Option<usize> {
        let candidates = self.positions.get(label)?;
        let filtered = candidates.iter().copied().find(|idx| match position {
            Position::Any => true,
            Position::Before(anchor) => *idx < anchor,
            Position::After(anchor) => *idx > anchor,
        });
        filtered.or_else(|| candidates.first().copied())
    }

    fn require(&self, label: &str, position: Position) -> Result<usize, MissingColumnError> {
        self.pick(label, position).ok_or_else(|| MissingColumnError {
            label: label.to_string(),
        })
    }
}

/// Map a header row to column roles.
///
/// `URL`, `NAME`, and `検索結果` are always required; `セールスレター` is
/// required only for [`Stages::Chained`].
pub fn resolve(header: &[String], stages: Stages) -> Result<ColumnRoleMap, MissingColumnError> {
    let index = HeaderIndex::new(header);

    let url = index.require(URL_LABEL, Position::Any)?;
    let name = index.require(NAME_LABEL, Position::Before(url))?;
    let search_result = index.require(SEARCH_RESULT_LABEL, Position::After(url))?;
    let sales_letter = match stages {
        Stages::Single => None,
        Stages::Chained => Some(index.require(SALES_LETTER_LABEL, Position::After(search_result))?),
    };

    let num_employees = index.pick(NUM_EMPLOYEES_LABEL, Position::Before(url));
    let contact_form_url = index.pick(CONTACT_FORM_URL_LABEL, Position::After(url));
    let address = index.pick(ADDRESS_LABEL, Position::After(url));
    let prefecture_id = index.pick(PREFECTURE_ID_LABEL, Position::After(url));
    let registered_company_name = REGISTERED_NAME_LABELS
        .iter()
        .find_map(|label| index.pick(label, Position::Before(url)));

    Ok(ColumnRoleMap {
        name,
        url,
        search_result,
        sales_letter,
        num_employees,
        contact_form_url,
        address,
        prefecture_id,
        registered_company_name,
    })
}

/// Spreadsheet column letters for a zero-based index (0 → `A`, 26 → `AA`).
pub fn column_letter(index: usize) -> String {
    let mut remaining = index + 1;
    let mut letters = Vec::new();
    while remaining > 0 {
        let digit = (remaining - 1) % 26;
        letters.push(char::from(b'A' + digit as u8));
        remaining = (remaining - 1) / 26;
    }
    letters.iter().rev().collect()
}
