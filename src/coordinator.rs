//! Action coordinator: one method per user-triggered operation, each a
//! single-shot request → validate → shape → render pipeline.
//!
//! No transport or validation failure escapes an entry point; every pipeline
//! terminates itself and reports through its own region, the notifier, or the
//! log. Methods take `&mut self`, so operations on one coordinator cannot
//! interleave on a shared region.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::config::Config;
use crate::error::Error;
use crate::logging::{log, obj, v_num, v_str, Level};
use crate::response::validate;
use crate::shape::{
    shape_dose_bundle, shape_name_list, shape_patient_listing, NameList, PatientForm,
    PatientPayload,
};
use crate::transport::{FilePart, RawResponse, Transport};
use crate::view::{
    render_dataset_dropdown, render_dose_views, render_name_list, render_patient_list,
    render_patient_list_error, ChartSurface, DropdownRegion, FormRegion, ListRegion, NoticeKind,
    Notifier,
};

const COMPUTE_DOSE: &str = "/plotly/compute_dose";
const UPLOAD_DICOM: &str = "/roi/upload_dicom";
const LIST_DATASETS: &str = "/load_data/datasets";
const CREATE_PATIENT: &str = "/patients/create";
const LOAD_PATIENTS: &str = "/patients/load";
const UPLOAD_FIELD: &str = "dicom_folder";

pub struct Coordinator {
    transport: Arc<dyn Transport>,
    cfg: Config,
    pub charts: ChartSurface,
    pub roi_list: ListRegion,
    pub dataset_list: ListRegion,
    pub dataset_dropdown: DropdownRegion,
    pub patient_list: ListRegion,
    pub patient_form: FormRegion,
    pub notifier: Notifier,
}

impl Coordinator {
    pub fn new(transport: Arc<dyn Transport>, cfg: Config) -> Self {
        Self {
            transport,
            cfg,
            charts: ChartSurface::default(),
            roi_list: ListRegion::default(),
            dataset_list: ListRegion::default(),
            dataset_dropdown: DropdownRegion::default(),
            patient_list: ListRegion::default(),
            patient_form: FormRegion::default(),
            notifier: Notifier::default(),
        }
    }

    fn log_failure(&self, op: &str, e: &Error) {
        log(
            Level::Error,
            "coordinator",
            op,
            obj(&[("kind", v_str(e.kind())), ("detail", v_str(&e.to_string()))]),
        );
    }

    async fn get_json(&self, path: &str) -> Result<Value, Error> {
        let raw = self.transport.get(path).await?;
        validate(&raw, self.cfg.body_preview_chars)
    }

    /// GET a name-list payload. Validation failures fall back to the server's
    /// own error text when the raw body carries one, since the server reports
    /// upload/load faults as `{"error": ...}` with a non-2xx status.
    async fn fetch_name_list(&self, op: &str, path: &str, field: &str) -> NameList {
        let raw = match self.transport.get(path).await {
            Ok(raw) => raw,
            Err(e) => {
                self.log_failure(op, &e);
                return NameList::Failed(e.to_string());
            }
        };
        match validate(&raw, self.cfg.body_preview_chars) {
            Ok(json) => shape_name_list(&json, field),
            Err(e) => {
                self.log_failure(op, &e);
                NameList::Failed(server_error_text(&raw).unwrap_or_else(|| e.to_string()))
            }
        }
    }

    /// GET the dose payload and rebuild the three chart panels.
    /// On any failure the panels keep their previous state; the error is
    /// logged and nothing else changes.
    pub async fn fetch_dose(&mut self) {
        let bundle = match self.get_json(COMPUTE_DOSE).await {
            Ok(json) => shape_dose_bundle(&json),
            Err(e) => Err(e),
        };
        match bundle {
            Ok(bundle) => {
                render_dose_views(&mut self.charts, &bundle);
                log(
                    Level::Info,
                    "coordinator",
                    "fetch_dose",
                    obj(&[("rows", v_num(bundle.ct.len() as f64))]),
                );
            }
            Err(e) => self.log_failure("fetch_dose", &e),
        }
    }

    /// POST every regular file in `dir` as one multipart form and render the
    /// returned ROI names. Failures of any kind become an inline error item.
    pub async fn upload_dicom_folder(&mut self, dir: &Path) {
        let files = match collect_files(dir) {
            Ok(files) if files.is_empty() => {
                let message = format!("no files found in {}", dir.display());
                render_name_list(&mut self.roi_list, &NameList::Failed(message));
                return;
            }
            Ok(files) => files,
            Err(e) => {
                let message = format!("cannot read {}: {}", dir.display(), e);
                render_name_list(&mut self.roi_list, &NameList::Failed(message));
                return;
            }
        };

        let raw = match self
            .transport
            .post_files(UPLOAD_DICOM, UPLOAD_FIELD, files)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                self.log_failure("upload_dicom_folder", &e);
                render_name_list(&mut self.roi_list, &NameList::Failed(e.to_string()));
                return;
            }
        };

        match validate(&raw, self.cfg.body_preview_chars) {
            Ok(json) => {
                let list = shape_name_list(&json, "roi_names");
                render_name_list(&mut self.roi_list, &list);
            }
            Err(e) => {
                self.log_failure("upload_dicom_folder", &e);
                // The server explains refusals in the body even on 5xx.
                let message = server_error_text(&raw).unwrap_or_else(|| e.to_string());
                render_name_list(&mut self.roi_list, &NameList::Failed(message));
            }
        }
    }

    /// GET the dataset listing and show it twice: as a plain list and as the
    /// selection dropdown, both built from the same payload.
    pub async fn load_datasets(&mut self) {
        match self
            .fetch_name_list("load_datasets", LIST_DATASETS, "datasets")
            .await
        {
            NameList::Names(names) => {
                render_dataset_dropdown(&mut self.dataset_dropdown, &names);
                render_name_list(&mut self.dataset_list, &NameList::Names(names));
            }
            failed => {
                // Dropdown keeps its old options; only the list shows the error.
                render_name_list(&mut self.dataset_list, &failed);
            }
        }
    }

    /// GET the ROI names of the dataset currently picked in the dropdown.
    /// Without a selection no request is issued and the user is notified.
    pub async fn load_selected_dataset(&mut self) {
        let name = match self.dataset_dropdown.selected() {
            Some(name) => name.to_string(),
            None => {
                let e = Error::NoSelection;
                self.log_failure("load_selected_dataset", &e);
                self.notifier
                    .notify(NoticeKind::Warning, "Please select a dataset first.".to_string());
                return;
            }
        };

        let path = format!("/load_data/{}", name);
        let list = self
            .fetch_name_list("load_selected_dataset", &path, "roi_names")
            .await;
        render_name_list(&mut self.roi_list, &list);
    }

    /// Validate the form client-side, POST the creation payload, and on
    /// success clear the form and refresh the patient list. On failure the
    /// form keeps the user's input for correction.
    pub async fn create_patient(&mut self) {
        let form = PatientForm {
            id: self.patient_form.id.clone(),
            first_name: self.patient_form.first_name.clone(),
            middle_name: self.patient_form.middle_name.clone(),
            last_name: self.patient_form.last_name.clone(),
            birth_date: self.patient_form.birth_date.clone(),
            sex: self.patient_form.sex.clone(),
        };
        let payload = match PatientPayload::from_form(&form) {
            Ok(p) => p,
            Err(e) => {
                self.log_failure("create_patient", &e);
                self.notifier.notify(NoticeKind::Error, e.to_string());
                return;
            }
        };

        let body = serde_json::to_value(&payload).unwrap_or_default();
        let raw = match self.transport.post_json(CREATE_PATIENT, body).await {
            Ok(raw) => raw,
            Err(e) => {
                self.log_failure("create_patient", &e);
                self.notifier.notify(NoticeKind::Error, e.to_string());
                return;
            }
        };

        match validate(&raw, self.cfg.body_preview_chars) {
            Ok(json) => {
                let message = json
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("Patient created.")
                    .to_string();
                self.notifier.notify(NoticeKind::Success, message);
                self.patient_form.clear_fields();
                self.load_patients().await;
            }
            Err(e) => {
                self.log_failure("create_patient", &e);
                // Prefer the server's own error text when it sent JSON.
                let message = server_error_text(&raw).unwrap_or_else(|| e.to_string());
                self.notifier.notify(NoticeKind::Error, message);
            }
        }
    }

    /// GET the patient listing. A failed load shows as an inline error item,
    /// consistent with the other list regions.
    pub async fn load_patients(&mut self) {
        let raw = match self.transport.get(LOAD_PATIENTS).await {
            Ok(raw) => raw,
            Err(e) => {
                self.log_failure("load_patients", &e);
                render_patient_list_error(&mut self.patient_list, e.to_string());
                return;
            }
        };
        let patients = validate(&raw, self.cfg.body_preview_chars)
            .and_then(|json| shape_patient_listing(&json));
        match patients {
            Ok(patients) => render_patient_list(&mut self.patient_list, &patients),
            Err(e) => {
                self.log_failure("load_patients", &e);
                let message = server_error_text(&raw).unwrap_or_else(|| e.to_string());
                render_patient_list_error(&mut self.patient_list, message);
            }
        }
    }

    pub fn toggle_patient_form(&mut self) {
        self.patient_form.toggle();
    }
}

fn server_error_text(raw: &RawResponse) -> Option<String> {
    let json: Value = serde_json::from_str(&raw.body).ok()?;
    json.get("error")
        .or_else(|| json.get("message"))
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

fn collect_files(dir: &Path) -> std::io::Result<Vec<FilePart>> {
    let mut entries = std::fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.path();
        if path.is_file() {
            files.push(FilePart {
                file_name: entry.file_name().to_string_lossy().into_owned(),
                bytes: std::fs::read(&path)?,
            });
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::StubTransport;
    use serde_json::json;

    fn coordinator(stub: Arc<StubTransport>) -> Coordinator {
        Coordinator::new(stub, Config::default())
    }

    #[tokio::test]
    async fn fetch_dose_failure_leaves_panels_untouched() {
        let stub = Arc::new(StubTransport::with(vec![StubTransport::json_reply(
            500,
            json!({"error": "boom"}),
        )]));
        let mut c = coordinator(stub);
        c.fetch_dose().await;
        assert_eq!(c.charts.panel_count(), 0);
        assert!(c.notifier.last().is_none());
    }

    #[tokio::test]
    async fn fetch_dose_keeps_previous_charts_on_later_failure() {
        let good = json!({
            "ct_slice": [[0.0]], "mask_slice": [[0.0]], "dose_slice": [[0.0]],
            "dvh": { "dose_values": [0], "volume_percentages": [100] }
        });
        let stub = Arc::new(StubTransport::with(vec![
            StubTransport::json_reply(200, good),
            StubTransport::json_reply(503, json!({"error": "down"})),
        ]));
        let mut c = coordinator(stub);
        c.fetch_dose().await;
        assert_eq!(c.charts.panel_count(), 3);
        c.fetch_dose().await;
        assert_eq!(c.charts.panel_count(), 3);
    }

    #[tokio::test]
    async fn load_datasets_failure_renders_error_item() {
        let stub = Arc::new(StubTransport::with(vec![StubTransport::json_reply(
            200,
            json!({"error": "datasets folder missing"}),
        )]));
        let mut c = coordinator(stub);
        c.load_datasets().await;
        assert_eq!(c.dataset_list.items().len(), 1);
        assert!(c.dataset_list.items()[0].is_error);
        assert_eq!(c.dataset_list.items()[0].text, "datasets folder missing");
        assert!(c.dataset_dropdown.options().is_empty());
    }

    #[tokio::test]
    async fn no_selection_issues_no_request_and_notifies() {
        let stub = Arc::new(StubTransport::with(vec![]));
        let mut c = coordinator(stub.clone());
        c.load_selected_dataset().await;
        assert!(stub.calls().is_empty());
        let notice = c.notifier.last().expect("missing-selection notice");
        assert_eq!(notice.kind, NoticeKind::Warning);
    }

    #[tokio::test]
    async fn selected_dataset_hits_named_endpoint() {
        let stub = Arc::new(StubTransport::with(vec![
            StubTransport::json_reply(200, json!({"datasets": ["P001"]})),
            StubTransport::json_reply(200, json!({"roi_names": ["Heart"]})),
        ]));
        let mut c = coordinator(stub.clone());
        c.load_datasets().await;
        c.dataset_dropdown.select("P001");
        c.load_selected_dataset().await;
        assert_eq!(
            stub.calls(),
            vec!["GET /load_data/datasets", "GET /load_data/P001"]
        );
        assert_eq!(c.roi_list.items().len(), 1);
        assert_eq!(c.roi_list.items()[0].text, "Heart");
    }

    #[tokio::test]
    async fn create_patient_blank_id_never_touches_network() {
        let stub = Arc::new(StubTransport::with(vec![]));
        let mut c = coordinator(stub.clone());
        c.patient_form.first_name = "Jane".to_string();
        c.patient_form.last_name = "Doe".to_string();
        c.create_patient().await;
        assert!(stub.calls().is_empty());
        let notice = c.notifier.last().expect("validation notice");
        assert_eq!(notice.kind, NoticeKind::Error);
        assert!(notice.text.contains("id"));
        // Form input preserved for correction.
        assert_eq!(c.patient_form.first_name, "Jane");
    }

    #[tokio::test]
    async fn create_patient_success_clears_form_and_refreshes() {
        let stub = Arc::new(StubTransport::with(vec![
            StubTransport::json_reply(201, json!({"success": true, "message": "Patient Jane Doe saved."})),
            StubTransport::json_reply(
                200,
                json!([{ "id": "p1", "name": "Jane Doe", "birthDate": "", "sex": "" }]),
            ),
        ]));
        let mut c = coordinator(stub.clone());
        c.patient_form.id = "p1".to_string();
        c.patient_form.first_name = "Jane".to_string();
        c.patient_form.last_name = "Doe".to_string();
        c.create_patient().await;

        assert_eq!(
            stub.calls(),
            vec!["POST /patients/create", "GET /patients/load"]
        );
        let notice = c.notifier.last().unwrap();
        assert_eq!(notice.kind, NoticeKind::Success);
        assert_eq!(notice.text, "Patient Jane Doe saved.");
        assert!(c.patient_form.id.is_empty());
        assert_eq!(c.patient_list.items().len(), 1);
    }

    #[tokio::test]
    async fn create_patient_server_rejection_surfaces_server_text() {
        let stub = Arc::new(StubTransport::with(vec![StubTransport::json_reply(
            400,
            json!({"error": "Patient with ID p1 already exists"}),
        )]));
        let mut c = coordinator(stub);
        c.patient_form.id = "p1".to_string();
        c.patient_form.first_name = "Jane".to_string();
        c.patient_form.last_name = "Doe".to_string();
        c.create_patient().await;

        let notice = c.notifier.last().unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.text, "Patient with ID p1 already exists");
        // Form retained on failure.
        assert_eq!(c.patient_form.id, "p1");
    }

    #[tokio::test]
    async fn load_patients_failure_renders_inline_error() {
        let stub = Arc::new(StubTransport::with(vec![Err(Error::Network(
            "connection refused".to_string(),
        ))]));
        let mut c = coordinator(stub);
        c.load_patients().await;
        assert_eq!(c.patient_list.items().len(), 1);
        assert!(c.patient_list.items()[0].is_error);
    }

    #[tokio::test]
    async fn upload_missing_folder_is_client_side_error() {
        let stub = Arc::new(StubTransport::with(vec![]));
        let mut c = coordinator(stub.clone());
        c.upload_dicom_folder(Path::new("/definitely/not/here")).await;
        assert!(stub.calls().is_empty());
        assert_eq!(c.roi_list.items().len(), 1);
        assert!(c.roi_list.items()[0].is_error);
    }

    #[tokio::test]
    async fn upload_posts_one_part_per_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.dcm"), b"bbbb").unwrap();
        std::fs::write(dir.path().join("a.dcm"), b"aaaa").unwrap();

        let stub = Arc::new(StubTransport::with(vec![StubTransport::json_reply(
            200,
            json!({"roi_names": ["TV", "Body"]}),
        )]));
        let mut c = coordinator(stub.clone());
        c.upload_dicom_folder(dir.path()).await;

        assert_eq!(stub.calls(), vec!["POST /roi/upload_dicom (dicom_folder x2)"]);
        assert_eq!(c.roi_list.items().len(), 2);
        assert_eq!(c.roi_list.items()[0].text, "TV");
    }

    #[tokio::test]
    async fn upload_non_2xx_surfaces_server_error_text() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.dcm"), b"aaaa").unwrap();

        let stub = Arc::new(StubTransport::with(vec![StubTransport::json_reply(
            503,
            json!({"error": "OpenTPS not available. Please install OpenTPS to use this feature."}),
        )]));
        let mut c = coordinator(stub);
        c.upload_dicom_folder(dir.path()).await;
        assert_eq!(c.roi_list.items().len(), 1);
        assert!(c.roi_list.items()[0].is_error);
        assert!(c.roi_list.items()[0].text.contains("OpenTPS not available"));
    }

    #[tokio::test]
    async fn dataset_load_non_2xx_surfaces_server_error_text() {
        let stub = Arc::new(StubTransport::with(vec![
            StubTransport::json_reply(200, json!({"datasets": ["P001"]})),
            StubTransport::json_reply(400, json!({"error": "Dataset missing RT Struct or CT"})),
        ]));
        let mut c = coordinator(stub);
        c.load_datasets().await;
        c.dataset_dropdown.select("P001");
        c.load_selected_dataset().await;
        assert_eq!(c.roi_list.items().len(), 1);
        assert!(c.roi_list.items()[0].is_error);
        assert_eq!(
            c.roi_list.items()[0].text,
            "Dataset missing RT Struct or CT"
        );
    }

    #[tokio::test]
    async fn patient_load_non_2xx_surfaces_server_error_text() {
        let stub = Arc::new(StubTransport::with(vec![StubTransport::json_reply(
            500,
            json!({"error": "Failed to load patients: db locked"}),
        )]));
        let mut c = coordinator(stub);
        c.load_patients().await;
        assert_eq!(c.patient_list.items().len(), 1);
        assert!(c.patient_list.items()[0].is_error);
        assert_eq!(
            c.patient_list.items()[0].text,
            "Failed to load patients: db locked"
        );
    }

    #[tokio::test]
    async fn upload_server_error_text_reaches_region() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.dcm"), b"aaaa").unwrap();

        let stub = Arc::new(StubTransport::with(vec![StubTransport::json_reply(
            200,
            json!({"error": "No RT Struct found"}),
        )]));
        let mut c = coordinator(stub);
        c.upload_dicom_folder(dir.path()).await;
        assert_eq!(c.roi_list.items().len(), 1);
        assert!(c.roi_list.items()[0].is_error);
        assert_eq!(c.roi_list.items()[0].text, "No RT Struct found");
    }
}
