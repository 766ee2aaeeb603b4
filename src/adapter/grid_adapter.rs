// xspharm/src/adapter/grid_adapter.rs

use super::errors::DimensionMismatchError;
use crate::grid::{
    GridSpec, GridSpecBuilder, GridType, InvalidGridError, LatitudeOrder, LongitudeOrder,
    DEFAULT_COORD_TOLERANCE,
};
use crate::labeled::{FieldOrDataset, LabeledField};
use log::{debug, info, trace};
use ndarray::{Array1, Array3, ArrayD, Axis, IxDyn};
use std::collections::BTreeMap;

pub const DEFAULT_LAT_DIM: &str = "lat";
pub const DEFAULT_LON_DIM: &str = "lon";

/// Everything needed to turn a flat `(batch, lat, lon)` engine array back
/// into the labeled field it came from.
#[derive(Clone, Debug)]
pub struct FlattenDescriptor {
    name: String,
    dims: Vec<String>,
    shape: Vec<usize>,
    coords: BTreeMap<String, Array1<f64>>,
    attrs: BTreeMap<String, String>,
    permutation: Vec<usize>,
    nbatch: usize,
}

impl FlattenDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn nbatch(&self) -> usize {
        self.nbatch
    }

    /// Original axis index of each axis of the `(batch..., lat, lon)` order.
    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }
}

/// Reconciles labeled fields with the fixed axis order of the engine.
#[derive(Clone, Debug)]
pub struct GridAdapter {
    spec: GridSpec,
    lat_dim: String,
    lon_dim: String,
    tolerance: f64,
}

impl GridAdapter {
    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    pub fn lat_dim(&self) -> &str {
        &self.lat_dim
    }

    pub fn lon_dim(&self) -> &str {
        &self.lon_dim
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// True when the field carries both spatial dimensions.
    pub fn is_gridded(&self, field: &LabeledField) -> bool {
        field.has_dims(&[self.lat_dim.as_str(), self.lon_dim.as_str()])
    }

    pub fn validate(&self, field: &LabeledField) -> Result<(), DimensionMismatchError> {
        let checks = [
            (&self.lat_dim, self.spec.latitudes()),
            (&self.lon_dim, self.spec.longitudes()),
        ];
        for (dim, grid_coord) in checks {
            let actual_len = field.len_of(dim).ok_or_else(|| {
                DimensionMismatchError::MissingSpatialDimension {
                    field: field.name().to_string(),
                    dim: dim.clone(),
                    dims: field.dims().to_vec(),
                }
            })?;
            if actual_len != grid_coord.len() {
                return Err(DimensionMismatchError::ExtentMismatch {
                    field: field.name().to_string(),
                    dim: dim.clone(),
                    expected: grid_coord.len(),
                    actual: actual_len,
                });
            }
            if let Some(coord) = field.coord(dim) {
                for (index, (&expected, &actual)) in grid_coord.iter().zip(coord.iter()).enumerate() {
                    if !((actual - expected).abs() <= self.tolerance) {
                        return Err(DimensionMismatchError::CoordinateMismatch {
                            field: field.name().to_string(),
                            dim: dim.clone(),
                            index,
                            expected,
                            actual,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Checks that two fields can be treated as components of one vector.
    pub fn validate_pair(
        &self,
        left: &LabeledField,
        right: &LabeledField,
    ) -> Result<(), DimensionMismatchError> {
        self.validate(left)?;
        self.validate(right)?;
        if left.dims() != right.dims() || left.shape() != right.shape() {
            return Err(DimensionMismatchError::ComponentMismatch {
                left: left.name().to_string(),
                right: right.name().to_string(),
                left_dims: left.dims().to_vec(),
                right_dims: right.dims().to_vec(),
                left_shape: left.shape().to_vec(),
                right_shape: right.shape().to_vec(),
            });
        }
        Ok(())
    }

    /// Moves the spatial axes last, collapses the batch axes in their original
    /// order and orients the grid north to south with ascending longitude.
    pub fn flatten(
        &self,
        field: &LabeledField,
    ) -> Result<(Array3<f64>, FlattenDescriptor), DimensionMismatchError> {
        self.validate(field)?;
        let (lat_axis, lon_axis) = self.spatial_axes(field)?;
        let mut permutation: Vec<usize> = (0..field.dims().len())
            .filter(|&axis| axis != lat_axis && axis != lon_axis)
            .collect();
        let nbatch: usize = permutation.iter().map(|&axis| field.shape()[axis]).product();
        permutation.push(lat_axis);
        permutation.push(lon_axis);

        let (nlat, nlon) = (self.spec.nlat(), self.spec.nlon());
        let permuted = field.data().view().permuted_axes(IxDyn(&permutation));
        let mut flat = permuted
            .as_standard_layout()
            .into_owned()
            .into_shape((nbatch, nlat, nlon))?;
        self.orient(&mut flat);
        let flat = flat.as_standard_layout().into_owned();
        trace!(
            "Flattened {} {:?} into ({}, {}, {})",
            field.name(),
            field.dims(),
            nbatch,
            nlat,
            nlon
        );
        let descriptor = FlattenDescriptor {
            name: field.name().to_string(),
            dims: field.dims().to_vec(),
            shape: field.shape().to_vec(),
            coords: field.coords().clone(),
            attrs: field.attrs().clone(),
            permutation,
            nbatch,
        };
        Ok((flat, descriptor))
    }

    /// Exact inverse of [`GridAdapter::flatten`].
    pub fn unflatten(
        &self,
        mut raw: Array3<f64>,
        descriptor: &FlattenDescriptor,
    ) -> Result<LabeledField, DimensionMismatchError> {
        let expected = [descriptor.nbatch, self.spec.nlat(), self.spec.nlon()];
        if raw.shape() != &expected[..] {
            return Err(DimensionMismatchError::RawShapeMismatch {
                field: descriptor.name.clone(),
                expected: expected.to_vec(),
                actual: raw.shape().to_vec(),
            });
        }
        self.orient(&mut raw);
        let permuted_shape: Vec<usize> = descriptor
            .permutation
            .iter()
            .map(|&axis| descriptor.shape[axis])
            .collect();
        let permuted: ArrayD<f64> = raw
            .as_standard_layout()
            .into_owned()
            .into_shape(IxDyn(&permuted_shape))?;
        let mut inverse = vec![0; descriptor.permutation.len()];
        for (position, &axis) in descriptor.permutation.iter().enumerate() {
            inverse[axis] = position;
        }
        let data = permuted
            .permuted_axes(IxDyn(&inverse))
            .as_standard_layout()
            .into_owned();
        Ok(LabeledField::from_parts(
            descriptor.name.clone(),
            descriptor.dims.clone(),
            data,
            descriptor.coords.clone(),
            descriptor.attrs.clone(),
        ))
    }

    fn spatial_axes(&self, field: &LabeledField) -> Result<(usize, usize), DimensionMismatchError> {
        let axis = |dim: &String| {
            field
                .axis_of(dim)
                .ok_or_else(|| DimensionMismatchError::MissingSpatialDimension {
                    field: field.name().to_string(),
                    dim: dim.clone(),
                    dims: field.dims().to_vec(),
                })
        };
        Ok((axis(&self.lat_dim)?, axis(&self.lon_dim)?))
    }

    /// Flips between the grid orientation and the engine orientation. The
    /// flip is its own inverse.
    fn orient(&self, flat: &mut Array3<f64>) {
        if self.spec.latitude_order() == LatitudeOrder::SouthToNorth {
            flat.invert_axis(Axis(1));
        }
        if self.spec.longitude_order() == LongitudeOrder::Descending {
            flat.invert_axis(Axis(2));
        }
    }
}

#[derive(Default)]
pub struct GridAdapterBuilder<'a> {
    reference: Option<FieldOrDataset<'a>>,
    grid_type: Option<&'a GridType>,
    lat_dim: Option<&'a str>,
    lon_dim: Option<&'a str>,
    tolerance: Option<&'a f64>,
}

impl<'a> GridAdapterBuilder<'a> {
    pub fn build(&self) -> Result<GridAdapter, InvalidGridError> {
        let reference = self
            .reference
            .ok_or_else(|| InvalidGridError::UninitializedFieldError("reference".to_string()))?;
        let grid_type = self.grid_type.copied().unwrap_or_default();
        let lat_dim = self.lat_dim.unwrap_or(DEFAULT_LAT_DIM);
        let lon_dim = self.lon_dim.unwrap_or(DEFAULT_LON_DIM);
        let tolerance = self.tolerance.copied().unwrap_or(DEFAULT_COORD_TOLERANCE);
        Self::validate_dims(lat_dim, lon_dim)?;
        let latitudes = Self::reference_coord(&reference, lat_dim)?;
        let longitudes = Self::reference_coord(&reference, lon_dim)?;
        let spec = GridSpecBuilder::default()
            .latitudes(latitudes)
            .longitudes(longitudes)
            .grid_type(&grid_type)
            .tolerance(&tolerance)
            .build()?;
        info!("Resolved reference grid: {}", spec);
        debug!("Spatial dims: lat={:?} lon={:?}, tolerance {}", lat_dim, lon_dim, tolerance);
        Ok(GridAdapter {
            spec,
            lat_dim: lat_dim.to_string(),
            lon_dim: lon_dim.to_string(),
            tolerance,
        })
    }

    fn validate_dims(lat_dim: &str, lon_dim: &str) -> Result<(), InvalidGridError> {
        if lat_dim == lon_dim {
            return Err(InvalidGridError::IdenticalSpatialDims(lat_dim.to_string()));
        }
        Ok(())
    }

    fn reference_coord(
        reference: &FieldOrDataset<'a>,
        dim: &str,
    ) -> Result<&'a Array1<f64>, InvalidGridError> {
        match reference.coord(dim) {
            Some(coord) => Ok(coord),
            None if reference.len_of(dim).is_some() => {
                Err(InvalidGridError::MissingCoordinate(dim.to_string()))
            }
            None => Err(InvalidGridError::MissingDimension(dim.to_string())),
        }
    }

    pub fn reference<T>(&mut self, reference: T) -> &mut Self
    where
        T: Into<FieldOrDataset<'a>>,
    {
        self.reference = Some(reference.into());
        self
    }

    pub fn grid_type(&mut self, grid_type: &'a GridType) -> &mut Self {
        self.grid_type = Some(grid_type);
        self
    }

    pub fn lat_dim(&mut self, lat_dim: &'a str) -> &mut Self {
        self.lat_dim = Some(lat_dim);
        self
    }

    pub fn lon_dim(&mut self, lon_dim: &'a str) -> &mut Self {
        self.lon_dim = Some(lon_dim);
        self
    }

    pub fn tolerance(&mut self, tolerance: &'a f64) -> &mut Self {
        self.tolerance = Some(tolerance);
        self
    }
}
