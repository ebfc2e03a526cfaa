//! Search commands

use super::Context;
use clap::Args;
use nearby_cli::output::{format_count, format_result_line, Status};
use nearby_core::config::ConfigSchema;
use nearby_core::{Error, ErrorCode, Result};
use nearby_directory::lookup::{first_place, IpLookupResponse, PlaceCandidate};
use nearby_directory::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Radius, distance window and ordering shared by the search commands.
#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// Search radius in kilometers (default from configuration)
    #[arg(short, long)]
    pub radius: Option<String>,

    /// Drop results closer than this many kilometers
    #[arg(long)]
    pub min: Option<String>,

    /// Drop results farther than this many kilometers
    #[arg(long)]
    pub max: Option<String>,

    /// Result order: distance-asc, distance-desc, name-asc, name-desc
    #[arg(short, long)]
    pub sort: Option<SortMode>,
}

impl FilterArgs {
    /// Resolves the arguments against the configured defaults.
    pub fn options(&self, schema: &ConfigSchema) -> Result<SearchOptions> {
        let radius_km = match &self.radius {
            Some(text) => parse_radius(text)?,
            None => schema.search.default_radius_km,
        };
        if radius_km > schema.search.max_radius_km {
            return Err(Error::invalid_radius(format!(
                "{radius_km} km exceeds the {} km limit",
                schema.search.max_radius_km
            )));
        }

        let sort = match self.sort {
            Some(sort) => sort,
            None => schema.search.default_sort.parse().map_err(|err| {
                Error::invalid_config(format!("search.default_sort: {err}"))
            })?,
        };

        Ok(SearchOptions::with_radius(radius_km)
            .bounds(DistanceBounds::parse(self.min.as_deref(), self.max.as_deref()))
            .sort(sort))
    }
}

/// Where a point search is centered. Exactly one is required.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct PointArgs {
    /// Origin as "LAT,LON"
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub at: Option<GeoPoint>,

    /// Saved IP geolocation response (JSON object)
    #[arg(long)]
    pub ip_response: Option<PathBuf>,

    /// Saved place search response (JSON array, first match is used)
    #[arg(long)]
    pub place_response: Option<PathBuf>,
}

impl PointArgs {
    fn resolve(&self) -> Result<GeoPoint> {
        if let Some(point) = self.at {
            return Ok(point);
        }
        if let Some(path) = &self.ip_response {
            let response: IpLookupResponse = read_lookup(path)?;
            return Ok(response.origin()?);
        }
        if let Some(path) = &self.place_response {
            let candidates: Vec<PlaceCandidate> = read_lookup(path)?;
            return Ok(first_place(&candidates)?);
        }
        Err(Error::new(ErrorCode::InvalidInput, "No search origin given"))
    }
}

/// Explicit `LAT,LON` origin. No swapping: the order is taken as written.
fn parse_point(text: &str) -> std::result::Result<GeoPoint, String> {
    let (lat, lon) = text
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got {text:?}"))?;
    let lat: f64 = lat.trim().parse().map_err(|_| format!("invalid latitude {lat:?}"))?;
    let lon: f64 = lon.trim().parse().map_err(|_| format!("invalid longitude {lon:?}"))?;
    GeoPoint::new(lat, lon).map_err(|err| err.to_string())
}

fn read_lookup<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|err| {
        Error::new(
            ErrorCode::LookupFailed,
            format!("Cannot read lookup response {}: {err}", path.display()),
        )
    })
}

/// Search around a stored user.
pub fn run_user(ctx: &Context, user: &str, filters: &FilterArgs) -> Result<()> {
    let options = filters.options(&ctx.config.schema)?;
    let engine = ProximityEngine::new(Arc::new(ctx.open_store()?));

    let results = engine.search(&SearchOrigin::User(UserId::new(user)), &options)?;
    render(ctx, &results, &options)
}

/// Search around an explicit point.
pub fn run_point(
    ctx: &Context,
    origin: &PointArgs,
    exclude: Option<&str>,
    filters: &FilterArgs,
) -> Result<()> {
    let options = filters.options(&ctx.config.schema)?;
    let point = origin.resolve()?;
    let engine = ProximityEngine::new(Arc::new(ctx.open_store()?));

    if !ctx.json() {
        Status::info(&format!("Searching around {point}"));
    }
    let origin = SearchOrigin::Point {
        point,
        exclude: exclude.map(UserId::new),
    };
    let results = engine.search(&origin, &options)?;
    render(ctx, &results, &options)
}

/// Prints results as text lines or a JSON array.
pub fn render(ctx: &Context, results: &[ProximityResult], options: &SearchOptions) -> Result<()> {
    if ctx.json() {
        return ctx.print_json(results);
    }

    if results.is_empty() {
        Status::info(&format!("No users found within {} km", options.radius_km));
        return Ok(());
    }

    Status::header(&format!(
        "{} within {} km ({})",
        format_count(results.len(), "user", "users"),
        options.radius_km,
        options.sort
    ));
    for result in results {
        let line = format_result_line(result.username(), result.distance_km);
        if ctx.verbose {
            println!("{line}  [{}]", result.id());
        } else {
            println!("{line}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(radius: Option<&str>) -> FilterArgs {
        FilterArgs {
            radius: radius.map(String::from),
            min: None,
            max: None,
            sort: None,
        }
    }

    #[test]
    fn test_options_use_configured_defaults() {
        let schema = ConfigSchema::default();
        let options = filters(None).options(&schema).unwrap();
        assert_eq!(options.radius_km, 5.0);
        assert_eq!(options.sort, SortMode::DistanceAsc);
    }

    #[test]
    fn test_options_reject_bad_radius() {
        let schema = ConfigSchema::default();
        let err = filters(Some("far")).options(&schema).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRadius);

        let err = filters(Some("500")).options(&schema).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRadius);
        assert!(err.message.contains("limit"));
    }

    #[test]
    fn test_parse_point() {
        let point = parse_point("23.81, 90.41").unwrap();
        assert_eq!(point.latitude(), 23.81);
        assert!(parse_point("90.41").is_err());
        assert!(parse_point("95,40").is_err());
    }
}
