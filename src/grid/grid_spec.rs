// xspharm/src/grid/grid_spec.rs

use super::errors::InvalidGridError;
use super::gaussian::{gaussian_latitudes, regular_latitudes};
use log::{debug, trace};
use ndarray::Array1;
use ndarray_stats::QuantileExt;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_COORD_TOLERANCE: f64 = 1e-3;
pub const MIN_NLAT: usize = 3;
pub const MIN_NLON: usize = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GridType {
    #[default]
    Regular,
    Gaussian,
}

impl FromStr for GridType {
    type Err = InvalidGridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "regular" => Ok(GridType::Regular),
            "gaussian" => Ok(GridType::Gaussian),
            _ => Err(InvalidGridError::UnknownGridType(s.to_string())),
        }
    }
}

impl fmt::Display for GridType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridType::Regular => write!(f, "regular"),
            GridType::Gaussian => write!(f, "gaussian"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LatitudeOrder {
    NorthToSouth,
    SouthToNorth,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LongitudeOrder {
    Ascending,
    Descending,
}

/// Largest total wavenumber resolvable on a grid of the given type and size.
///
/// Gaussian grids resolve `nlat - 1`. Regular grids resolve one less, because
/// odd zonal wavenumbers vanish at the poles and leave only `nlat - 2`
/// informative rows. Longitude caps the zonal wavenumber below Nyquist.
pub fn max_wavenumber(grid_type: GridType, nlat: usize, nlon: usize) -> usize {
    let meridional = match grid_type {
        GridType::Gaussian => nlat.saturating_sub(1),
        GridType::Regular => nlat.saturating_sub(2),
    };
    meridional.min(nlon.saturating_sub(1) / 2)
}

#[derive(Clone, Debug, PartialEq)]
pub struct GridSpec {
    latitudes: Array1<f64>,
    longitudes: Array1<f64>,
    grid_type: GridType,
    latitude_order: LatitudeOrder,
    longitude_order: LongitudeOrder,
}

impl GridSpec {
    pub fn nlat(&self) -> usize {
        self.latitudes.len()
    }

    pub fn nlon(&self) -> usize {
        self.longitudes.len()
    }

    pub fn latitudes(&self) -> &Array1<f64> {
        &self.latitudes
    }

    pub fn longitudes(&self) -> &Array1<f64> {
        &self.longitudes
    }

    pub fn grid_type(&self) -> GridType {
        self.grid_type
    }

    pub fn latitude_order(&self) -> LatitudeOrder {
        self.latitude_order
    }

    pub fn longitude_order(&self) -> LongitudeOrder {
        self.longitude_order
    }

    pub fn max_wavenumber(&self) -> usize {
        max_wavenumber(self.grid_type, self.nlat(), self.nlon())
    }

    /// Latitudes in the order used by the transform engine (north to south).
    pub fn engine_latitudes(&self) -> Array1<f64> {
        match self.latitude_order {
            LatitudeOrder::NorthToSouth => self.latitudes.clone(),
            LatitudeOrder::SouthToNorth => self.latitudes.iter().rev().cloned().collect(),
        }
    }
}

impl fmt::Display for GridSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} grid nlat={} nlon={} ({:?}, {:?})",
            self.grid_type,
            self.nlat(),
            self.nlon(),
            self.latitude_order,
            self.longitude_order
        )
    }
}

#[derive(Default)]
pub struct GridSpecBuilder<'a> {
    latitudes: Option<&'a Array1<f64>>,
    longitudes: Option<&'a Array1<f64>>,
    grid_type: Option<&'a GridType>,
    tolerance: Option<&'a f64>,
}

impl<'a> GridSpecBuilder<'a> {
    pub fn build(&self) -> Result<GridSpec, InvalidGridError> {
        let latitudes = self
            .latitudes
            .ok_or_else(|| InvalidGridError::UninitializedFieldError("latitudes".to_string()))?;
        let longitudes = self
            .longitudes
            .ok_or_else(|| InvalidGridError::UninitializedFieldError("longitudes".to_string()))?;
        let grid_type = self
            .grid_type
            .ok_or_else(|| InvalidGridError::UninitializedFieldError("grid_type".to_string()))?;
        let tolerance = *self.tolerance.unwrap_or(&DEFAULT_COORD_TOLERANCE);
        Self::validate_tolerance(&tolerance)?;

        Self::validate_extent("lat", latitudes, MIN_NLAT)?;
        Self::validate_extent("lon", longitudes, MIN_NLON)?;
        Self::validate_finite("lat", latitudes)?;
        Self::validate_finite("lon", longitudes)?;
        Self::validate_latitude_range(latitudes)?;

        let latitude_order = match Self::monotonic_direction("lat", latitudes)? {
            Direction::Decreasing => LatitudeOrder::NorthToSouth,
            Direction::Increasing => LatitudeOrder::SouthToNorth,
        };
        let longitude_order = match Self::monotonic_direction("lon", longitudes)? {
            Direction::Increasing => LongitudeOrder::Ascending,
            Direction::Decreasing => LongitudeOrder::Descending,
        };
        Self::validate_longitudes(longitudes, &tolerance)?;

        let north_to_south: Vec<f64> = match latitude_order {
            LatitudeOrder::NorthToSouth => latitudes.to_vec(),
            LatitudeOrder::SouthToNorth => latitudes.iter().rev().cloned().collect(),
        };
        Self::validate_latitudes(&north_to_south, grid_type, &tolerance)?;

        debug!(
            "Resolved {} grid with {} latitudes ({:?}) and {} longitudes ({:?})",
            grid_type,
            latitudes.len(),
            latitude_order,
            longitudes.len(),
            longitude_order
        );
        Ok(GridSpec {
            latitudes: latitudes.clone(),
            longitudes: longitudes.clone(),
            grid_type: *grid_type,
            latitude_order,
            longitude_order,
        })
    }

    fn validate_tolerance(tolerance: &f64) -> Result<(), InvalidGridError> {
        if !tolerance.is_finite() || *tolerance <= 0.0 {
            return Err(InvalidGridError::InvalidTolerance(*tolerance));
        }
        Ok(())
    }

    fn validate_extent(
        dim: &str,
        values: &Array1<f64>,
        minimum: usize,
    ) -> Result<(), InvalidGridError> {
        if values.len() < minimum {
            return Err(InvalidGridError::TooFewPoints(
                dim.to_string(),
                minimum,
                values.len(),
            ));
        }
        Ok(())
    }

    fn validate_finite(dim: &str, values: &Array1<f64>) -> Result<(), InvalidGridError> {
        if !values.iter().all(|value| value.is_finite()) {
            return Err(InvalidGridError::NonFiniteCoordinate(dim.to_string()));
        }
        Ok(())
    }

    fn validate_latitude_range(latitudes: &Array1<f64>) -> Result<(), InvalidGridError> {
        let min = *latitudes.min()?;
        let max = *latitudes.max()?;
        if min < -90.0 || max > 90.0 {
            return Err(InvalidGridError::LatitudeOutOfRange(min, max));
        }
        Ok(())
    }

    fn monotonic_direction(dim: &str, values: &Array1<f64>) -> Result<Direction, InvalidGridError> {
        let values = values.to_vec();
        if values.windows(2).all(|pair| pair[0] < pair[1]) {
            return Ok(Direction::Increasing);
        }
        if values.windows(2).all(|pair| pair[0] > pair[1]) {
            return Ok(Direction::Decreasing);
        }
        Err(InvalidGridError::NonMonotonic(dim.to_string()))
    }

    fn validate_longitudes(longitudes: &Array1<f64>, tolerance: &f64) -> Result<(), InvalidGridError> {
        let expected = 360.0 / longitudes.len() as f64;
        for (index, pair) in longitudes.to_vec().windows(2).enumerate() {
            let actual = (pair[1] - pair[0]).abs();
            if (actual - expected).abs() > *tolerance {
                return Err(InvalidGridError::IrregularLongitudes {
                    index,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }

    fn validate_latitudes(
        north_to_south: &[f64],
        grid_type: &GridType,
        tolerance: &f64,
    ) -> Result<(), InvalidGridError> {
        let expected = match grid_type {
            GridType::Regular => regular_latitudes(north_to_south.len()),
            GridType::Gaussian => gaussian_latitudes(north_to_south.len()),
        };
        for (index, (&actual, &expected)) in north_to_south.iter().zip(expected.iter()).enumerate() {
            trace!("lat[{}] = {} (expected {})", index, actual, expected);
            if (actual - expected).abs() > *tolerance {
                return Err(match grid_type {
                    GridType::Regular => InvalidGridError::RegularLatitudeMismatch {
                        index,
                        expected,
                        actual,
                    },
                    GridType::Gaussian => InvalidGridError::GaussianLatitudeMismatch {
                        index,
                        expected,
                        actual,
                    },
                });
            }
        }
        Ok(())
    }

    pub fn latitudes(&mut self, latitudes: &'a Array1<f64>) -> &mut Self {
        self.latitudes = Some(latitudes);
        self
    }

    pub fn longitudes(&mut self, longitudes: &'a Array1<f64>) -> &mut Self {
        self.longitudes = Some(longitudes);
        self
    }

    pub fn grid_type(&mut self, grid_type: &'a GridType) -> &mut Self {
        self.grid_type = Some(grid_type);
        self
    }

    pub fn tolerance(&mut self, tolerance: &'a f64) -> &mut Self {
        self.tolerance = Some(tolerance);
        self
    }
}

enum Direction {
    Increasing,
    Decreasing,
}
