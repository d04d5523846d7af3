//! Data shaping: validated JSON in, typed render inputs out.
//!
//! Nothing in this module touches the network or a view region; shaping
//! failures surface as typed errors the coordinator maps to its region.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

pub type Grid = Vec<Vec<f64>>;

/// One CT cross-section with its ROI mask, dose distribution, and DVH.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceBundle {
    pub ct: Grid,
    pub mask: Grid,
    pub dose: Grid,
    pub dvh: Dvh,
}

/// Dose-volume histogram series; both sequences always match in length.
#[derive(Debug, Clone, PartialEq)]
pub struct Dvh {
    pub dose_values: Vec<f64>,
    pub volume_percentages: Vec<f64>,
}

/// Name-list payloads resolve to one of two outcomes, decided here once.
/// Callers branch on the variant; shaping a name list never errors.
#[derive(Debug, Clone, PartialEq)]
pub enum NameList {
    Names(Vec<String>),
    Failed(String),
}

/// The server emits `null` for unset patient fields; both a missing key and
/// an explicit null read back as the empty string.
fn null_to_empty<'de, D>(de: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(de)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    #[serde(default, deserialize_with = "null_to_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "null_to_empty")]
    pub name: String,
    #[serde(default, rename = "birthDate", deserialize_with = "null_to_empty")]
    pub birth_date: String,
    #[serde(default, deserialize_with = "null_to_empty")]
    pub sex: String,
}

/// Raw form input, untrimmed, exactly as the user typed it.
#[derive(Debug, Clone, Default)]
pub struct PatientForm {
    pub id: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub birth_date: String,
    pub sex: String,
}

/// Creation payload as it goes over the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientPayload {
    pub id: String,
    pub name: String,
    #[serde(rename = "birthDate")]
    pub birth_date: String,
    pub sex: String,
}

impl PatientPayload {
    /// Client-side validation runs here, before any request is issued:
    /// id, first name, and last name must be non-blank after trimming.
    pub fn from_form(form: &PatientForm) -> Result<Self> {
        let id = form.id.trim();
        let first = form.first_name.trim();
        let last = form.last_name.trim();

        let mut missing_fields = Vec::new();
        if id.is_empty() {
            missing_fields.push("id");
        }
        if first.is_empty() {
            missing_fields.push("first name");
        }
        if last.is_empty() {
            missing_fields.push("last name");
        }
        if !missing_fields.is_empty() {
            return Err(Error::Validation { missing_fields });
        }

        // Join name parts, collapsing any repeated whitespace.
        let name = [first, form.middle_name.trim(), last]
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Self {
            id: id.to_string(),
            name,
            birth_date: form.birth_date.trim().to_string(),
            sex: form.sex.trim().to_string(),
        })
    }
}

fn grid_field(json: &Value, name: &str) -> Result<Grid> {
    let raw = json.get(name).ok_or_else(|| Error::MissingField {
        name: name.to_string(),
    })?;
    let grid: Grid =
        serde_json::from_value(raw.clone()).map_err(|e| Error::BadFieldShape {
            name: name.to_string(),
            detail: e.to_string(),
        })?;
    let width = grid.first().map(|r| r.len()).unwrap_or(0);
    if grid.iter().any(|r| r.len() != width) {
        return Err(Error::RaggedGrid {
            field: name.to_string(),
        });
    }
    Ok(grid)
}

fn series_field(dvh: &Value, name: &str) -> Result<Vec<f64>> {
    let raw = dvh.get(name).ok_or_else(|| Error::MissingField {
        name: format!("dvh.{}", name),
    })?;
    serde_json::from_value(raw.clone()).map_err(|e| Error::BadFieldShape {
        name: format!("dvh.{}", name),
        detail: e.to_string(),
    })
}

fn dims(grid: &Grid) -> (usize, usize) {
    (grid.len(), grid.first().map(|r| r.len()).unwrap_or(0))
}

/// Shape the `/plotly/compute_dose` payload into a `SliceBundle`.
pub fn shape_dose_bundle(json: &Value) -> Result<SliceBundle> {
    let ct = grid_field(json, "ct_slice")?;
    let mask = grid_field(json, "mask_slice")?;
    let dose = grid_field(json, "dose_slice")?;

    // The three grids describe the same slice, so their dimensions must agree.
    for (name, grid) in [("mask_slice", &mask), ("dose_slice", &dose)] {
        if dims(grid) != dims(&ct) {
            return Err(Error::BadFieldShape {
                name: name.to_string(),
                detail: format!(
                    "dimensions {:?} differ from ct_slice {:?}",
                    dims(grid),
                    dims(&ct)
                ),
            });
        }
    }

    let dvh_raw = json.get("dvh").ok_or_else(|| Error::MissingField {
        name: "dvh".to_string(),
    })?;
    let dose_values = series_field(dvh_raw, "dose_values")?;
    let volume_percentages = series_field(dvh_raw, "volume_percentages")?;
    if dose_values.len() != volume_percentages.len() {
        return Err(Error::DvhLengthMismatch);
    }

    Ok(SliceBundle {
        ct,
        mask,
        dose,
        dvh: Dvh {
            dose_values,
            volume_percentages,
        },
    })
}

/// Extract a string-array field, or fall back to the server's error text.
pub fn shape_name_list(json: &Value, field: &str) -> NameList {
    match json.get(field).and_then(Value::as_array) {
        Some(items) => NameList::Names(
            items
                .iter()
                .map(|v| match v.as_str() {
                    Some(s) => s.to_string(),
                    None => v.to_string(),
                })
                .collect(),
        ),
        None => {
            let message = json
                .get("error")
                .and_then(Value::as_str)
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("server response missing `{}`", field));
            NameList::Failed(message)
        }
    }
}

/// Shape the `/patients/load` payload (a top-level JSON array).
pub fn shape_patient_listing(json: &Value) -> Result<Vec<PatientRecord>> {
    serde_json::from_value(json.clone()).map_err(|e| Error::BadFieldShape {
        name: "patients".to_string(),
        detail: e.to_string(),
    })
}
