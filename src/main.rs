//! Command-line driver: runs one coordinator operation against the configured
//! server and prints the resulting view regions.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use doseview::config::Config;
use doseview::coordinator::Coordinator;
use doseview::logging::{json_log, obj, v_str};
use doseview::transport::HttpTransport;
use doseview::view::{
    ChartSurface, DropdownRegion, ListRegion, Notifier, Trace, PANEL_CT_STRUCTURES,
    PANEL_DOSE_OVERLAY, PANEL_DVH,
};

const USAGE: &str = "usage: doseview <command>
  dose                                     compute and render the dose panels
  upload <folder>                          upload a DICOM folder, list its ROIs
  datasets                                 list available datasets
  rois <dataset>                           list ROI names of one dataset
  patients                                 list patients
  create-patient <id> <first> <last> [middle] [birth-date] [sex]";

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    json_log("main", obj(&[("base_url", v_str(cfg.base_url.as_str()))]));
    let transport = Arc::new(HttpTransport::new(cfg.base_url.clone()));
    let mut coordinator = Coordinator::new(transport, cfg);

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("dose") => {
            coordinator.fetch_dose().await;
            print_charts(&coordinator.charts);
        }
        Some("upload") => {
            let dir = args.get(1).context(USAGE)?;
            coordinator.upload_dicom_folder(Path::new(dir)).await;
            print_list("ROI names", &coordinator.roi_list);
        }
        Some("datasets") => {
            coordinator.load_datasets().await;
            print_list("Datasets", &coordinator.dataset_list);
            print_dropdown(&coordinator.dataset_dropdown);
        }
        Some("rois") => {
            let name = args.get(1).context(USAGE)?.clone();
            coordinator.load_datasets().await;
            coordinator.dataset_dropdown.select(&name);
            coordinator.load_selected_dataset().await;
            print_list("ROI names", &coordinator.roi_list);
        }
        Some("patients") => {
            coordinator.load_patients().await;
            print_list("Patients", &coordinator.patient_list);
        }
        Some("create-patient") => {
            if args.len() < 4 {
                bail!(USAGE);
            }
            coordinator.toggle_patient_form();
            coordinator.patient_form.id = args[1].clone();
            coordinator.patient_form.first_name = args[2].clone();
            coordinator.patient_form.last_name = args[3].clone();
            coordinator.patient_form.middle_name = args.get(4).cloned().unwrap_or_default();
            coordinator.patient_form.birth_date = args.get(5).cloned().unwrap_or_default();
            coordinator.patient_form.sex = args.get(6).cloned().unwrap_or_default();
            coordinator.create_patient().await;
            print_list("Patients", &coordinator.patient_list);
        }
        _ => bail!(USAGE),
    }

    print_notices(&coordinator.notifier);
    Ok(())
}

fn trace_summary(trace: &Trace) -> String {
    match trace {
        Trace::Heatmap {
            grid,
            colorscale,
            opacity,
            ..
        } => format!(
            "heatmap {}x{} ({:?}, opacity {})",
            grid.len(),
            grid.first().map(|r| r.len()).unwrap_or(0),
            colorscale,
            opacity
        ),
        Trace::Contour {
            grid,
            line_color,
            opacity,
        } => format!(
            "contour {}x{} ({}, opacity {})",
            grid.len(),
            grid.first().map(|r| r.len()).unwrap_or(0),
            line_color,
            opacity
        ),
        Trace::Line { x, name, .. } => format!("line `{}` with {} points", name, x.len()),
    }
}

fn print_charts(charts: &ChartSurface) {
    for panel_id in [PANEL_CT_STRUCTURES, PANEL_DVH, PANEL_DOSE_OVERLAY] {
        match charts.panel(panel_id) {
            Some(panel) => {
                println!("[{}] {}", panel_id, panel.layout.title);
                for trace in &panel.traces {
                    println!("  - {}", trace_summary(trace));
                }
            }
            None => println!("[{}] (not rendered)", panel_id),
        }
    }
}

fn print_list(title: &str, region: &ListRegion) {
    println!("{}:", title);
    if region.items().is_empty() {
        println!("  (empty)");
    }
    for item in region.items() {
        if item.is_error {
            println!("  ! {}", item.text);
        } else {
            println!("  - {}", item.text);
        }
    }
}

fn print_dropdown(dropdown: &DropdownRegion) {
    println!("Dropdown:");
    for opt in dropdown.options() {
        let marker = if opt.disabled { "*" } else { "-" };
        println!("  {} {}", marker, opt.label);
    }
}

fn print_notices(notifier: &Notifier) {
    for notice in notifier.notices() {
        println!("[{:?}] {}", notice.kind, notice.text);
    }
}
