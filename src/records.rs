//! Company records built from raw sheet rows.
use crate::columns::ColumnRoleMap;
use crate::prompt::{url_encode, Bindings};

/// One company row, read once at the start of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyRecord {
    /// 1-based sheet row used for write-back addressing.
    pub row_number: usize,
    pub name: String,
    pub url: String,
    pub search_result: String,
    pub sales_letter: String,
    pub num_employees: String,
    pub contact_form_url: String,
    pub address: String,
    pub prefecture_id: String,
    pub registered_company_name: String,
}

impl CompanyRecord {
    /// Template bindings for this company (without run-wide values).
    pub fn prompt_bindings(&self) -> Bindings {
        let mut bindings = Bindings::new();
        bindings.insert("company_name", self.name.clone());
        bindings.insert("company_name_encoded", url_encode(&self.name));
        bindings.insert("company_url", self.url.clone());
        bindings.insert("num_employees", self.num_employees.clone());
        bindings.insert("contact_form_url", self.contact_form_url.clone());
        bindings.insert("address", self.address.clone());
        bindings.insert("prefecture_id", self.prefecture_id.clone());
        bindings.insert(
            "registered_company_name",
            self.registered_company_name.clone(),
        );
        bindings.insert(
            "registered_company_name_encoded",
            url_encode(&self.registered_company_name),
        );
        bindings
    }

    /// Label used in progress and error lines.
    pub fn identifier(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        if !self.url.is_empty() {
            return self.url.clone();
        }
        format!("row {}", self.row_number)
    }
}

/// Trimmed cell value; short rows read as empty trailing cells.
fn cell(row: &[String], index: Option<usize>) -> String {
    index
        .and_then(|idx| row.get(idx))
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

/// Build records for data rows starting at sheet row `start_row`.
///
/// Rows with neither a name nor a URL are skipped; row numbers still advance
/// so write-back lands on the right line.
pub fn build_records(
    rows: &[Vec<String>],
    columns: &ColumnRoleMap,
    start_row: usize,
) -> Vec<CompanyRecord> {
    rows.iter()
        .enumerate()
        .filter_map(|(offset, row)| {
            let name = cell(row, Some(columns.name));
            let url = cell(row, Some(columns.url));
            if name.is_empty() && url.is_empty() {
                return None;
            }
            Some(CompanyRecord {
                row_number: start_row + offset,
                name,
                url,
                search_result: cell(row, Some(columns.search_result)),
                sales_letter: cell(row, columns.sales_letter),
                num_employees: cell(row, columns.num_employees),
                contact_form_url: cell(row, columns.contact_form_url),
                address: cell(row, columns.address),
                prefecture_id: cell(row, columns.prefecture_id),
                registered_company_name: cell(row, columns.registered_company_name),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::{resolve, Stages};

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|cell| cell.to_string()).collect()
    }

    fn columns() -> ColumnRoleMap {
        resolve(
            &row(&["NAME", "NUM_EMPLOYEES", "URL", "検索結果", "セールスレター", "ADDRESS"]),
            Stages::Chained,
        )
        .expect("resolve")
    }

    #[test]
    fn builds_records_with_row_numbers_and_short_rows() {
        let rows = vec![
            row(&["Acme", "120", "https://acme.example", "", "", "Tokyo"]),
            row(&["", "", ""]),
            row(&["Globex", "", "https://globex.example"]),
        ];
        let records = build_records(&rows, &columns(), 2);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].row_number, 2);
        assert_eq!(records[0].num_employees, "120");
        assert_eq!(records[0].address, "Tokyo");
        assert_eq!(records[1].row_number, 4);
        assert_eq!(records[1].name, "Globex");
        assert_eq!(records[1].search_result, "");
        assert_eq!(records[1].sales_letter, "");
        assert_eq!(records[1].address, "");
    }

    #[test]
    fn keeps_rows_with_only_one_identity_field() {
        let rows = vec![
            row(&["", "", "https://only-url.example"]),
            row(&["Only Name"]),
            row(&["  ", "5", "  ", "existing"]),
        ];
        let records = build_records(&rows, &columns(), 10);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].identifier(), "https://only-url.example");
        assert_eq!(records[1].identifier(), "Only Name");
    }

    #[test]
    fn bindings_encode_names() {
        let record = CompanyRecord {
            row_number: 2,
            name: "Acme Holdings".to_string(),
            registered_company_name: "株式会社 アクメ".to_string(),
            ..CompanyRecord::default()
        };
        let bindings = record.prompt_bindings();
        assert_eq!(bindings["company_name_encoded"], "Acme+Holdings");
        assert!(!bindings["registered_company_name_encoded"].contains(' '));
        assert_eq!(bindings["company_url"], "");
    }

    #[test]
    fn identifier_falls_back_to_row_number() {
        let record = CompanyRecord {
            row_number: 7,
            ..CompanyRecord::default()
        };
        assert_eq!(record.identifier(), "row 7");
    }
}
