//! `geo` command handlers: print the live reference lists.

use clap::Subcommand;
use tuyendung_core::{AdminCode, AppConfig, GeographicUnit};
use tuyendung_geo::GeoClient;

/// Sub-commands available under `geo`.
#[derive(Debug, Subcommand)]
pub enum GeoCommands {
    /// List every province
    Provinces,
    /// List wards, optionally only those of one province
    Wards {
        /// Province code to filter by (e.g., 01)
        #[arg(long)]
        province: Option<String>,
    },
}

/// Fetch provinces and print one `code<TAB>name` line each.
///
/// # Errors
///
/// Returns an error if the client cannot be built or the fetch fails.
pub(crate) async fn run_geo_provinces(config: &AppConfig) -> anyhow::Result<()> {
    let client = GeoClient::from_config(config)?;
    let provinces = client.list_provinces().await?;
    print_units(&provinces);
    Ok(())
}

/// Fetch wards and print one `code<TAB>name` line each.
///
/// # Errors
///
/// Returns an error if `province` is blank, the client cannot be built, or
/// the fetch fails.
pub(crate) async fn run_geo_wards(
    config: &AppConfig,
    province: Option<&str>,
) -> anyhow::Result<()> {
    let filter = match province {
        Some(code) if code.trim().is_empty() => {
            anyhow::bail!("--province must not be blank");
        }
        Some(code) => Some(AdminCode::from(code)),
        None => None,
    };

    let client = GeoClient::from_config(config)?;
    let wards = client.list_wards().await?;
    let selected: Vec<GeographicUnit> = match filter {
        Some(code) => wards
            .into_iter()
            .filter(|ward| ward.belongs_to(&code))
            .collect(),
        None => wards,
    };

    if selected.is_empty() {
        println!(
            "no wards found{}",
            province.map(|p| format!(" for province {p}")).unwrap_or_default()
        );
        return Ok(());
    }
    print_units(&selected);
    Ok(())
}

fn print_units(units: &[GeographicUnit]) {
    for unit in units {
        println!("{}", unit_line(unit));
    }
}

fn unit_line(unit: &GeographicUnit) -> String {
    format!("{}\t{}", unit.code, unit.name.as_deref().unwrap_or(""))
}
