//! Admin page: upload checks and the views around preview and import
//!
//! Spreadsheet parsing happens in the backend. This side only makes sure the
//! file looks like a spreadsheet before sending it, and renders what comes back.

use thiserror::Error;

use crate::date_utils::format_display;
use crate::model::{BoardStats, ImportPreview, ImportStats, User};
use crate::view::{Element, Node};

/// Largest upload the backend accepts
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Import errors listed before the remainder is summarised
pub const MAX_LISTED_ERRORS: usize = 10;

const ALLOWED_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

const EXCEL_CONTENT_TYPES: [&str; 2] = [
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
];

/// A file received from the admin upload form
#[derive(Clone, Debug, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        UploadFile {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("No file selected")]
    Missing,

    #[error("Only Excel files (.xlsx or .xls) are accepted")]
    NotSpreadsheet,

    #[error("File is too large. Maximum size is 16MB")]
    TooLarge,

    #[error("Could not read the upload: {0}")]
    Malformed(String),
}

/// Check that an upload is a plausible spreadsheet of acceptable size
pub fn validate_upload(file: &UploadFile) -> Result<(), UploadError> {
    if file.name.trim().is_empty() {
        return Err(UploadError::Missing);
    }

    let extension = file
        .name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let known_type = EXCEL_CONTENT_TYPES.contains(&file.content_type.as_str());
    if !known_type && !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(UploadError::NotSpreadsheet);
    }

    if file.size() > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge);
    }
    Ok(())
}

/// Human readable size: bytes below 1 KiB, otherwise KB/MB with two decimals
pub fn format_file_size(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.2} KB", bytes as f64 / KIB)
    } else {
        format!("{:.2} MB", bytes as f64 / (KIB * KIB))
    }
}

pub fn login_form(error: Option<&str>) -> Node {
    let mut form = Element::new("form")
        .id("login-form")
        .class("login-form")
        .attr("method", "post")
        .attr("action", "/admin/login")
        .child(Element::new("h2").text("Admin login"));

    if let Some(message) = error {
        form = form.child(
            Element::new("div")
                .id("login-error")
                .class("login-error")
                .text(message),
        );
    }

    form.child(labelled_input("Username", "username", "text"))
        .child(labelled_input("Password", "password", "password"))
        .child(
            Element::new("button")
                .class("btn")
                .class("btn-primary")
                .attr("type", "submit")
                .text("Log in"),
        )
        .into()
}

fn labelled_input(label: &str, name: &str, kind: &str) -> Element {
    Element::new("label")
        .class("form-field")
        .text(label)
        .child(
            Element::new("input")
                .id(name)
                .attr("name", name)
                .attr("type", kind)
                .attr("required", "required"),
        )
}

fn stat_box(label: &str, value: impl Into<String>) -> Element {
    Element::new("div")
        .class("stat-box")
        .child(Element::new("strong").text(format!("{}: ", label)))
        .child(Element::new("span").text(value))
}

fn date_or_dash(date: Option<chrono::NaiveDate>) -> String {
    match date {
        Some(_) => format_display(date),
        None => "-".to_string(),
    }
}

/// Header bar with the logged-in admin and the logout button
pub fn admin_bar(user: &User) -> Node {
    Element::new("div")
        .class("admin-bar")
        .child(Element::new("span").id("admin-name").text(user.username.as_str()))
        .child(
            Element::new("form")
                .attr("method", "post")
                .attr("action", "/admin/logout")
                .child(
                    Element::new("button")
                        .id("logout-btn")
                        .class("btn")
                        .attr("type", "submit")
                        .text("Log out"),
                ),
        )
        .into()
}

pub fn stats_panel(stats: Option<&BoardStats>) -> Node {
    let stats = stats.cloned().unwrap_or_default();
    Element::new("div")
        .class("stats-panel")
        .child(stat_box("Total tasks", stats.total_tasks.to_string()).id("stat-total-tasks"))
        .child(stat_box("Departments", stats.total_departments.to_string()).id("stat-departments"))
        .child(stat_box("Earliest", date_or_dash(stats.date_range.min_date)).id("stat-min-date"))
        .child(stat_box("Latest", date_or_dash(stats.date_range.max_date)).id("stat-max-date"))
        .into()
}

/// Name and size of the chosen file
///
/// Rendered empty in the upload form and filled in by the page script when a
/// file is picked or dropped. After an upload it names the file that was sent.
pub fn file_info(file: Option<&UploadFile>) -> Node {
    file_info_element(file).into()
}

fn file_info_element(file: Option<&UploadFile>) -> Element {
    let info = Element::new("div").class("file-info");
    match file {
        Some(file) => info
            .child(Element::new("span").class("file-name").text(file.name.as_str()))
            .child(
                Element::new("span")
                    .class("file-size")
                    .text(format_file_size(file.size())),
            ),
        None => info.attr("hidden", "hidden"),
    }
}

/// Upload form; both buttons post the same file to different endpoints
///
/// The form doubles as the drop zone for drag and drop.
pub fn upload_form() -> Node {
    Element::new("form")
        .id("upload-form")
        .class("upload-area")
        .attr("method", "post")
        .attr("enctype", "multipart/form-data")
        .attr("data-max-bytes", MAX_UPLOAD_BYTES.to_string())
        .child(Element::new("h3").text("Choose or drop an Excel file to import"))
        .child(
            Element::new("p")
                .class("file-hint")
                .text("Only .xlsx or .xls files, up to 16MB"),
        )
        .child(
            Element::new("input")
                .id("file-input")
                .attr("type", "file")
                .attr("name", "file")
                .attr("accept", ".xlsx,.xls")
                .attr("required", "required"),
        )
        .child(file_info_element(None).id("file-info"))
        .child(
            Element::new("div")
                .id("upload-actions")
                .class("upload-actions")
                .child(
                    Element::new("button")
                        .id("preview-btn")
                        .class("btn")
                        .attr("type", "submit")
                        .attr("formaction", "/admin/preview")
                        .text("Preview"),
                )
                .child(
                    Element::new("button")
                        .id("import-btn")
                        .class("btn")
                        .class("btn-primary")
                        .attr("type", "submit")
                        .attr("formaction", "/admin/import")
                        .attr(
                            "data-confirm",
                            "Import this data? New rows are merged; duplicates are skipped.",
                        )
                        .text("Import"),
                ),
        )
        .into()
}

fn error_list(title: &str, errors: &[String], limit: Option<usize>) -> Element {
    let shown = limit.unwrap_or(errors.len()).min(errors.len());
    let mut list = Element::new("ul").children(
        errors[..shown]
            .iter()
            .map(|e| Element::new("li").text(e.as_str())),
    );
    if errors.len() > shown {
        list = list.child(
            Element::new("li")
                .class("more-errors")
                .text(format!("... and {} more", errors.len() - shown)),
        );
    }
    Element::new("div")
        .class("import-errors")
        .child(Element::new("h4").text(title))
        .child(list)
}

/// Summary of a dry run, with up to five sample rows
pub fn preview_view(preview: &ImportPreview, errors: &[String]) -> Node {
    let mut stats = Element::new("div")
        .class("preview-stats")
        .child(stat_box("Total tasks", preview.total_tasks.to_string()))
        .child(stat_box("Departments", preview.total_departments.to_string()));
    if let (Some(min), Some(max)) = (preview.date_range.min, preview.date_range.max) {
        stats = stats.child(stat_box(
            "Date range",
            format!("{} - {}", format_display(Some(min)), format_display(Some(max))),
        ));
    }

    let mut section = Element::new("div")
        .id("preview-section")
        .class("preview-section")
        .child(stats);

    if !preview.sample_tasks.is_empty() {
        let header = Element::new("tr").children(
            ["No.", "Department", "Content", "Date"]
                .into_iter()
                .map(|h| Element::new("th").text(h)),
        );
        let rows = preview.sample_tasks.iter().map(|task| {
            let number = task.stt.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
            Element::new("tr")
                .child(Element::new("td").text(number))
                .child(Element::new("td").text(task.department.as_str()))
                .child(Element::new("td").text(task.content.as_str()))
                .child(Element::new("td").text(date_or_dash(task.warning_date)))
        });
        section = section
            .child(Element::new("h4").text("Sample rows"))
            .child(
                Element::new("table")
                    .class("preview-table")
                    .child(Element::new("thead").child(header))
                    .child(Element::new("tbody").children(rows)),
            );
    }

    if !errors.is_empty() {
        section = section.child(error_list("Warnings", errors, None));
    }
    section.into()
}

/// Outcome of an import, listing the first [`MAX_LISTED_ERRORS`] row errors
pub fn import_result_view(stats: &ImportStats, errors: &[String]) -> Node {
    let mut section = Element::new("div")
        .id("result-section")
        .class("result-section")
        .child(Element::new("h3").id("result-title").text("Import completed"))
        .child(
            Element::new("div")
                .class("result-stats")
                .child(stat_box("New records", stats.new_records.to_string()).class("success"))
                .child(stat_box("Duplicates skipped", stats.duplicates_skipped.to_string()))
                .child(stat_box("Rows processed", stats.valid_rows.to_string())),
        );

    if !errors.is_empty() {
        section = section.child(error_list(
            "Errors during import",
            errors,
            Some(MAX_LISTED_ERRORS),
        ));
    }
    section.into()
}

/// Transient message shown above the admin panel
pub fn notice(message: &str) -> Node {
    Element::new("div")
        .class("notice")
        .class("notice-error")
        .attr("role", "alert")
        .text(message)
        .into()
}

/// Who is looking at the admin page
#[derive(Clone, Debug, PartialEq)]
pub enum AdminSession {
    Anonymous,
    Admin(User),
}

#[cfg(feature = "web")]
impl AdminSession {
    /// Ask the backend whose session the client carries
    ///
    /// A client without a session cookie is anonymous without a round trip.
    /// Any backend failure is also treated as anonymous so the login form shows.
    pub async fn resolve(api: &crate::api::ApiClient) -> Self {
        if api.session().is_none() {
            return AdminSession::Anonymous;
        }
        match api.current_user().await {
            Ok(Some(user)) => AdminSession::Admin(user),
            Ok(None) => AdminSession::Anonymous,
            Err(err) => {
                log::warn!("could not resolve admin session: {}", err);
                AdminSession::Anonymous
            }
        }
    }
}

impl AdminSession {
    pub fn user(&self) -> Option<&User> {
        match self {
            AdminSession::Admin(user) => Some(user),
            AdminSession::Anonymous => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PreviewDateRange, Task};
    use chrono::NaiveDate;

    #[test]
    fn accepts_spreadsheets_by_extension_or_type() {
        let by_name = UploadFile::new("tasks.XLSX", "application/octet-stream", vec![1, 2, 3]);
        assert_eq!(validate_upload(&by_name), Ok(()));

        let by_type = UploadFile::new("export", EXCEL_CONTENT_TYPES[1], vec![1]);
        assert_eq!(validate_upload(&by_type), Ok(()));
    }

    #[test]
    fn rejects_other_files() {
        let csv = UploadFile::new("tasks.csv", "text/csv", vec![1]);
        assert_eq!(validate_upload(&csv), Err(UploadError::NotSpreadsheet));

        let unnamed = UploadFile::new("", EXCEL_CONTENT_TYPES[0], vec![1]);
        assert_eq!(validate_upload(&unnamed), Err(UploadError::Missing));

        let huge = UploadFile::new("big.xls", "", vec![0; MAX_UPLOAD_BYTES + 1]);
        assert_eq!(validate_upload(&huge), Err(UploadError::TooLarge));
    }

    #[test]
    fn file_sizes() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.50 KB");
        assert_eq!(format_file_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn import_result_truncates_errors() {
        let errors: Vec<String> = (1..=13).map(|i| format!("Row {}: bad date", i)).collect();
        let stats = ImportStats {
            new_records: 4,
            duplicates_skipped: 2,
            valid_rows: 6,
            ..Default::default()
        };
        let view = import_result_view(&stats, &errors);
        let items = view.find_by_class("import-errors").unwrap();
        let items = Node::Element(items.clone());

        let text = items.text_content();
        assert!(text.contains("Row 10"));
        assert!(!text.contains("Row 11"));
        assert!(text.contains("... and 3 more"));
        assert!(view.text_content().contains("New records: 4"));
    }

    #[test]
    fn preview_lists_sample_rows_and_range() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 5);
        let preview = ImportPreview {
            total_tasks: 2,
            departments: vec!["A".into()],
            total_departments: 1,
            date_range: PreviewDateRange { min: date, max: date },
            sample_tasks: vec![Task::new("A", "Check", date), Task::new("A", "Undated", None)],
        };
        let view = preview_view(&preview, &["Row 4: missing content".to_string()]);
        let html = view.to_html();

        assert!(html.contains("05/03/2026 - 05/03/2026"));
        assert_eq!(view.find_all_by_class("preview-table").len(), 1);
        assert!(html.contains("Row 4: missing content"));
    }

    #[test]
    fn login_form_shows_error_only_when_given() {
        assert!(login_form(None).find_by_class("login-error").is_none());
        let form = login_form(Some("Invalid credentials"));
        assert!(form.text_content().contains("Invalid credentials"));
    }

    #[test]
    fn file_info_names_the_file_and_its_size() {
        let empty = file_info(None).to_html();
        assert!(empty.contains("hidden=\"hidden\""));
        assert!(upload_form().to_html().contains("id=\"file-info\""));

        let file = UploadFile::new("march.xlsx", EXCEL_CONTENT_TYPES[0], vec![0; 1536]);
        let info = file_info(Some(&file));
        assert_eq!(info.text_content(), "march.xlsx1.50 KB");
        assert!(!info.to_html().contains("hidden"));
    }

    #[test]
    fn stats_panel_defaults_to_zero() {
        let panel = stats_panel(None);
        let text = panel.text_content();
        assert!(text.contains("Total tasks: 0"));
        assert!(text.contains("Earliest: -"));
    }
}
