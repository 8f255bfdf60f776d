use kari_dashboard::config::Config;
use kari_dashboard::loader::{self, UploadedFile};
use kari_dashboard::router::DashboardState;
use kari_dashboard::tags::Region;
use kari_dashboard::views::{self, RollupLevel};
use std::env;
use std::path::PathBuf;

const USAGE: &str = "Usage: dashboard [--pretty] [--region MSK|SPB] <file-or-dir>...";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = Config::from_env()?;
    let rest = config.apply_args(env::args().skip(1))?;

    // --region is CLI-only, the rest are input paths
    let mut region: Option<Region> = None;
    let mut inputs = Vec::new();
    let mut rest = rest.into_iter();
    while let Some(arg) = rest.next() {
        if arg == "--region" {
            let value = rest.next().ok_or(USAGE)?;
            region = Some(value.parse()?);
        } else if arg == "--help" || arg == "-h" {
            println!("{USAGE}");
            return Ok(());
        } else {
            inputs.push(PathBuf::from(arg));
        }
    }
    if inputs.is_empty() {
        eprintln!("{USAGE}");
        std::process::exit(2);
    }

    let paths = loader::collect_paths(&inputs)?;
    let files = paths
        .iter()
        .map(|p| loader::read_file(p))
        .collect::<Result<Vec<UploadedFile>, _>>()?;
    log::info!("read {} workbook(s)", files.len());

    let mut state = DashboardState::new();
    let report = state.load_files(&files);

    let output = match region {
        Some(region) => {
            let summary: Vec<_> = state
                .summary_data()
                .into_iter()
                .filter(|r| r.tags.region.applies_to(region))
                .map(|r| &r.row)
                .collect();
            serde_json::json!({
                "region": region,
                "load": report,
                "shipmentByRegion": views::shipment_rollup(summary.iter().copied(), RollupLevel::Region),
                "shipmentBySubdivision": views::shipment_rollup(summary.iter().copied(), RollupLevel::Subdivision),
                "regionTotals": views::region_total_for(&state.region_totals(), region),
            })
        }
        None => serde_json::json!({
            "load": report,
            "state": state.overview(),
        }),
    };

    let text = if config.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{text}");
    Ok(())
}
