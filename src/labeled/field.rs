// xspharm/src/labeled/field.rs

use super::errors::LabeledFieldError;
use ndarray::{Array1, ArrayD};
use std::collections::BTreeMap;
use std::fmt;

/// An n-dimensional array with named dimensions, optional coordinates and
/// string attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledField {
    name: String,
    dims: Vec<String>,
    data: ArrayD<f64>,
    coords: BTreeMap<String, Array1<f64>>,
    attrs: BTreeMap<String, String>,
}

impl LabeledField {
    pub fn new<I, S>(name: &str, dims: I, data: ArrayD<f64>) -> Result<Self, LabeledFieldError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let dims: Vec<String> = dims.into_iter().map(Into::into).collect();
        if dims.len() != data.ndim() {
            return Err(LabeledFieldError::RankMismatch {
                name: name.to_string(),
                ndims: dims.len(),
                ndim: data.ndim(),
            });
        }
        for (i, dim) in dims.iter().enumerate() {
            if dims[..i].contains(dim) {
                return Err(LabeledFieldError::DuplicateDimension(dim.clone()));
            }
        }
        Ok(Self {
            name: name.to_string(),
            dims,
            data,
            coords: BTreeMap::new(),
            attrs: BTreeMap::new(),
        })
    }

    /// Assembles a field from parts that were taken from a valid field.
    pub(crate) fn from_parts(
        name: String,
        dims: Vec<String>,
        data: ArrayD<f64>,
        coords: BTreeMap<String, Array1<f64>>,
        attrs: BTreeMap<String, String>,
    ) -> Self {
        Self {
            name,
            dims,
            data,
            coords,
            attrs,
        }
    }

    pub fn with_coord(mut self, dim: &str, values: Array1<f64>) -> Result<Self, LabeledFieldError> {
        self.set_coord(dim, values)?;
        Ok(self)
    }

    pub fn set_coord(&mut self, dim: &str, values: Array1<f64>) -> Result<(), LabeledFieldError> {
        let expected = self
            .len_of(dim)
            .ok_or_else(|| LabeledFieldError::UnknownDimension(self.name.clone(), dim.to_string()))?;
        if values.len() != expected {
            return Err(LabeledFieldError::CoordinateLength {
                dim: dim.to_string(),
                expected,
                actual: values.len(),
            });
        }
        self.coords.insert(dim.to_string(), values);
        Ok(())
    }

    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn set_attr(&mut self, key: &str, value: &str) {
        self.attrs.insert(key.to_string(), value.to_string());
    }

    pub fn renamed(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn coords(&self) -> &BTreeMap<String, Array1<f64>> {
        &self.coords
    }

    pub fn coord(&self, dim: &str) -> Option<&Array1<f64>> {
        self.coords.get(dim)
    }

    pub fn attrs(&self) -> &BTreeMap<String, String> {
        &self.attrs
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    pub fn len_of(&self, dim: &str) -> Option<usize> {
        self.axis_of(dim).map(|axis| self.data.shape()[axis])
    }

    pub fn has_dims(&self, dims: &[&str]) -> bool {
        dims.iter().all(|dim| self.axis_of(dim).is_some())
    }
}

impl fmt::Display for LabeledField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self
            .dims
            .iter()
            .zip(self.data.shape())
            .map(|(dim, len)| format!("{}: {}", dim, len))
            .collect();
        write!(f, "{} ({})", self.name, dims.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};

    #[test]
    fn test_new_field_and_lookup() {
        let data = Array::zeros(IxDyn(&[2, 3, 4]));
        let field = LabeledField::new("t", ["time", "lat", "lon"], data)
            .unwrap()
            .with_coord("lat", Array1::from(vec![90.0, 0.0, -90.0]))
            .unwrap()
            .with_attr("units", "K");
        assert_eq!(field.axis_of("lat"), Some(1));
        assert_eq!(field.len_of("lon"), Some(4));
        assert_eq!(field.len_of("level"), None);
        assert_eq!(field.attr("units"), Some("K"));
        assert!(field.has_dims(&["lat", "lon"]));
        assert_eq!(field.to_string(), "t (time: 2, lat: 3, lon: 4)");
    }

    #[test]
    fn test_invalid_fields() {
        let data = Array::zeros(IxDyn(&[2, 3]));
        assert!(matches!(
            LabeledField::new("x", ["lat"], data.clone()),
            Err(LabeledFieldError::RankMismatch { ndims: 1, ndim: 2, .. })
        ));
        assert!(matches!(
            LabeledField::new("x", ["lat", "lat"], data.clone()),
            Err(LabeledFieldError::DuplicateDimension(_))
        ));
        let field = LabeledField::new("x", ["lat", "lon"], data).unwrap();
        assert!(matches!(
            field.clone().with_coord("lon", Array1::zeros(5)),
            Err(LabeledFieldError::CoordinateLength { expected: 3, actual: 5, .. })
        ));
        assert!(matches!(
            field.with_coord("time", Array1::zeros(2)),
            Err(LabeledFieldError::UnknownDimension(_, _))
        ));
    }
}
