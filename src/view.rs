//! Explicit view state, one struct per page region.
//!
//! The original page kept all of this in the DOM; here each region is an
//! injectable value the coordinator owns, so pipelines can be exercised
//! without a browser. Rendering is idempotent: applying the same shaped data
//! twice leaves the region in the same state.

use std::collections::BTreeMap;

use crate::shape::{Grid, NameList, PatientRecord, SliceBundle};

pub const PANEL_CT_STRUCTURES: &str = "ct-structures";
pub const PANEL_DVH: &str = "dvh";
pub const PANEL_DOSE_OVERLAY: &str = "dose-overlay";

// Visual-parity constants. Changing any of these changes what the user sees.
pub const CT_OPACITY: f64 = 1.0;
pub const MASK_OPACITY: f64 = 0.5;
pub const DOSE_OPACITY: f64 = 0.4;
pub const MASK_COLOR: &str = "red";
pub const DROPDOWN_PLACEHOLDER: &str = "Select a dataset";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colorscale {
    /// Binary white-to-black, for CT grids.
    WhiteToBlack,
    /// Rainbow scale, for dose grids.
    Rainbow,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Trace {
    Heatmap {
        grid: Grid,
        colorscale: Colorscale,
        opacity: f64,
        showscale: bool,
    },
    Contour {
        grid: Grid,
        line_color: &'static str,
        opacity: f64,
    },
    Line {
        x: Vec<f64>,
        y: Vec<f64>,
        name: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub title: &'static str,
    /// Image panels flip the Y axis so row 0 sits at the top.
    pub y_reversed: bool,
    /// Image panels lock 1:1 aspect so pixels stay square.
    pub equal_aspect: bool,
    pub x_title: &'static str,
    pub y_title: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig {
    pub traces: Vec<Trace>,
    pub layout: Layout,
}

/// The charting surface: one config per panel id, last submission wins.
#[derive(Debug, Default)]
pub struct ChartSurface {
    panels: BTreeMap<String, ChartConfig>,
}

impl ChartSurface {
    pub fn submit(&mut self, panel_id: &str, config: ChartConfig) {
        self.panels.insert(panel_id.to_string(), config);
    }

    pub fn panel(&self, panel_id: &str) -> Option<&ChartConfig> {
        self.panels.get(panel_id)
    }

    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub text: String,
    pub is_error: bool,
}

/// A flat list region: either N data items or a single error item.
#[derive(Debug, Default)]
pub struct ListRegion {
    items: Vec<ListItem>,
}

impl ListRegion {
    pub fn items(&self) -> &[ListItem] {
        &self.items
    }

    fn clear(&mut self) {
        self.items.clear();
    }

    fn push(&mut self, text: String) {
        self.items.push(ListItem {
            text,
            is_error: false,
        });
    }

    fn push_error(&mut self, text: String) {
        self.items.push(ListItem {
            text,
            is_error: true,
        });
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropdownOption {
    pub label: String,
    pub disabled: bool,
    pub hidden: bool,
}

/// Dataset dropdown: a placeholder option plus one option per dataset.
#[derive(Debug, Default)]
pub struct DropdownRegion {
    options: Vec<DropdownOption>,
    selected: Option<usize>,
}

impl DropdownRegion {
    pub fn options(&self) -> &[DropdownOption] {
        &self.options
    }

    /// Currently selected dataset name; the placeholder never counts.
    pub fn selected(&self) -> Option<&str> {
        let idx = self.selected?;
        let opt = self.options.get(idx)?;
        if opt.disabled {
            return None;
        }
        Some(&opt.label)
    }

    /// User picks an option by label. Unknown labels leave selection alone.
    pub fn select(&mut self, label: &str) {
        if let Some(idx) = self
            .options
            .iter()
            .position(|o| !o.disabled && o.label == label)
        {
            self.selected = Some(idx);
        }
    }
}

/// Patient-creation form: field values plus visibility.
#[derive(Debug, Default)]
pub struct FormRegion {
    pub visible: bool,
    pub id: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub birth_date: String,
    pub sex: String,
}

impl FormRegion {
    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    pub fn clear_fields(&mut self) {
        self.id.clear();
        self.first_name.clear();
        self.middle_name.clear();
        self.last_name.clear();
        self.birth_date.clear();
        self.sex.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

/// Stand-in for the blocking alerts the original page raised.
#[derive(Debug, Default)]
pub struct Notifier {
    notices: Vec<Notice>,
}

impl Notifier {
    pub fn notify(&mut self, kind: NoticeKind, text: String) {
        self.notices.push(Notice { kind, text });
    }

    pub fn last(&self) -> Option<&Notice> {
        self.notices.last()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }
}

fn image_layout(title: &'static str) -> Layout {
    Layout {
        title,
        y_reversed: true,
        equal_aspect: true,
        x_title: "",
        y_title: "",
    }
}

/// Build the three dose panels from one bundle and submit them to the surface.
pub fn render_dose_views(surface: &mut ChartSurface, bundle: &SliceBundle) {
    surface.submit(
        PANEL_CT_STRUCTURES,
        ChartConfig {
            traces: vec![
                Trace::Heatmap {
                    grid: bundle.ct.clone(),
                    colorscale: Colorscale::WhiteToBlack,
                    opacity: CT_OPACITY,
                    showscale: false,
                },
                Trace::Contour {
                    grid: bundle.mask.clone(),
                    line_color: MASK_COLOR,
                    opacity: MASK_OPACITY,
                },
            ],
            layout: image_layout("CT with structures"),
        },
    );

    surface.submit(
        PANEL_DVH,
        ChartConfig {
            traces: vec![Trace::Line {
                x: bundle.dvh.dose_values.clone(),
                y: bundle.dvh.volume_percentages.clone(),
                name: "DVH",
            }],
            layout: Layout {
                title: "Dose-volume histogram",
                y_reversed: false,
                equal_aspect: false,
                x_title: "Dose (Gy)",
                y_title: "Volume (%)",
            },
        },
    );

    surface.submit(
        PANEL_DOSE_OVERLAY,
        ChartConfig {
            traces: vec![
                Trace::Heatmap {
                    grid: bundle.ct.clone(),
                    colorscale: Colorscale::WhiteToBlack,
                    opacity: CT_OPACITY,
                    showscale: false,
                },
                Trace::Heatmap {
                    grid: bundle.dose.clone(),
                    colorscale: Colorscale::Rainbow,
                    opacity: DOSE_OPACITY,
                    showscale: true,
                },
                Trace::Contour {
                    grid: bundle.mask.clone(),
                    line_color: MASK_COLOR,
                    opacity: MASK_OPACITY,
                },
            ],
            layout: image_layout("CT with dose overlay"),
        },
    );
}

/// Replace the region's contents with names, or with a single error item.
pub fn render_name_list(region: &mut ListRegion, list: &NameList) {
    region.clear();
    match list {
        NameList::Names(names) => {
            for name in names {
                region.push(name.clone());
            }
        }
        NameList::Failed(message) => region.push_error(message.clone()),
    }
}

/// Rebuild the dropdown: placeholder first, then one option per dataset.
/// Any prior user selection is discarded with the old options.
pub fn render_dataset_dropdown(dropdown: &mut DropdownRegion, names: &[String]) {
    dropdown.options.clear();
    dropdown.options.push(DropdownOption {
        label: DROPDOWN_PLACEHOLDER.to_string(),
        disabled: true,
        hidden: true,
    });
    // Placeholder starts selected; `selected()` reports it as no selection.
    dropdown.selected = Some(0);
    for name in names {
        dropdown.options.push(DropdownOption {
            label: name.clone(),
            disabled: false,
            hidden: false,
        });
    }
}

/// One line per patient, server order, fixed format.
pub fn render_patient_list(region: &mut ListRegion, patients: &[PatientRecord]) {
    region.clear();
    for p in patients {
        region.push(format!(
            "{} (ID: {}, DOB: {}, Sex: {})",
            p.name, p.id, p.birth_date, p.sex
        ));
    }
}

/// Render a failed patient load as an inline error item, like the other lists.
pub fn render_patient_list_error(region: &mut ListRegion, message: String) {
    region.clear();
    region.push_error(message);
}
