// xspharm/src/plot.rs

use crate::labeled::LabeledField;
use ndarray::{Array1, Axis};
use plotly::color::NamedColor;
use plotly::common::{Line, Marker, Mode, Title};
use plotly::layout::{Axis as PlotAxis, Layout};
use plotly::{Plot, Scatter};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Field {field:?} has no {dim:?} dimension to plot against")]
    MissingDimension { field: String, dim: String },
    #[error("Field {0:?} has an empty longitude dimension")]
    EmptyLongitudes(String),
}

/// Zonal means of every batch slice of `field`, one line per slice, plotted
/// against latitude.
pub fn make_zonal_mean_plot(
    field: &LabeledField,
    lat_dim: &str,
    lon_dim: &str,
) -> Result<Plot, PlotError> {
    let missing = |dim: &str| PlotError::MissingDimension {
        field: field.name().to_string(),
        dim: dim.to_string(),
    };
    let lat_axis = field.axis_of(lat_dim).ok_or_else(|| missing(lat_dim))?;
    let lon_axis = field.axis_of(lon_dim).ok_or_else(|| missing(lon_dim))?;
    let zonal_mean = field
        .data()
        .mean_axis(Axis(lon_axis))
        .ok_or_else(|| PlotError::EmptyLongitudes(field.name().to_string()))?;
    // removing the longitude axis shifts later axes down by one
    let lat_axis = if lat_axis > lon_axis { lat_axis - 1 } else { lat_axis };
    let latitudes = field.coord(lat_dim).cloned().unwrap_or_else(|| {
        Array1::from_iter((0..zonal_mean.len_of(Axis(lat_axis))).map(|j| j as f64))
    });

    let mut plot = Plot::new();
    for profile in zonal_mean.lanes(Axis(lat_axis)) {
        let trace = Scatter::new(profile.to_vec(), latitudes.to_vec())
            .mode(Mode::LinesMarkers)
            .line(Line::new().color(NamedColor::Blue))
            .marker(Marker::new().color(NamedColor::Black));
        plot.add_trace(trace);
    }
    let units = field.attr("units").unwrap_or("");
    let layout = Layout::new()
        .title(Title::new(&format!("Zonal mean of {}", field.name())))
        .x_axis(PlotAxis::new().title(Title::new(&format!("{} [{}]", field.name(), units))))
        .y_axis(PlotAxis::new().title(Title::new(lat_dim)));
    plot.set_layout(layout);
    Ok(plot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};

    #[test]
    fn test_one_trace_per_batch_slice() {
        let data = Array::from_shape_fn(IxDyn(&[3, 4, 2]), |ix| (ix[0] * 10 + ix[1]) as f64);
        let field = LabeledField::new("t", ["lon", "lat", "time"], data)
            .unwrap()
            .with_coord("lat", Array1::from(vec![60.0, 20.0, -20.0, -60.0]))
            .unwrap();
        let plot = make_zonal_mean_plot(&field, "lat", "lon").unwrap();
        let json = plot.to_json();
        assert_eq!(json.matches("\"type\":\"scatter\"").count(), 2);
        assert!(json.contains("Zonal mean of t"));
    }

    #[test]
    fn test_missing_dimension() {
        let field = LabeledField::new("t", ["lat"], Array::zeros(IxDyn(&[4]))).unwrap();
        assert!(matches!(
            make_zonal_mean_plot(&field, "lat", "lon"),
            Err(PlotError::MissingDimension { .. })
        ));
    }
}
