// xspharm/src/labeled/dataset.rs

use super::field::LabeledField;
use ndarray::Array1;
use std::collections::BTreeMap;

/// Ordered collection of named fields sharing coordinates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    variables: Vec<LabeledField>,
    coords: BTreeMap<String, Array1<f64>>,
    attrs: BTreeMap<String, String>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dataset with the same coordinates and attributes but no variables.
    pub fn empty_like(&self) -> Self {
        Self {
            variables: Vec::new(),
            coords: self.coords.clone(),
            attrs: self.attrs.clone(),
        }
    }

    /// Adds a variable, replacing any variable of the same name in place.
    pub fn insert(&mut self, field: LabeledField) {
        match self.variables.iter_mut().find(|v| v.name() == field.name()) {
            Some(slot) => *slot = field,
            None => self.variables.push(field),
        }
    }

    pub fn with_variable(mut self, field: LabeledField) -> Self {
        self.insert(field);
        self
    }

    pub fn with_coord(mut self, dim: &str, values: Array1<f64>) -> Self {
        self.coords.insert(dim.to_string(), values);
        self
    }

    pub fn set_attr(&mut self, key: &str, value: &str) {
        self.attrs.insert(key.to_string(), value.to_string());
    }

    pub fn attrs(&self) -> &BTreeMap<String, String> {
        &self.attrs
    }

    pub fn get(&self, name: &str) -> Option<&LabeledField> {
        self.variables.iter().find(|v| v.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabeledField> {
        self.variables.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Coordinate of `dim`: the dataset's own, or the first variable's that
    /// carries one.
    pub fn coord(&self, dim: &str) -> Option<&Array1<f64>> {
        self.coords
            .get(dim)
            .or_else(|| self.variables.iter().find_map(|v| v.coord(dim)))
    }

    /// Length of `dim` from the first variable that has it.
    pub fn len_of(&self, dim: &str) -> Option<usize> {
        self.variables
            .iter()
            .find_map(|v| v.len_of(dim))
            .or_else(|| self.coords.get(dim).map(|c| c.len()))
    }
}

impl FromIterator<LabeledField> for Dataset {
    fn from_iter<T: IntoIterator<Item = LabeledField>>(iter: T) -> Self {
        let mut dataset = Dataset::new();
        for field in iter {
            dataset.insert(field);
        }
        dataset
    }
}

/// Borrowed input accepted by operations that work on fields and datasets.
#[derive(Clone, Copy, Debug)]
pub enum FieldOrDataset<'a> {
    Field(&'a LabeledField),
    Dataset(&'a Dataset),
}

impl<'a> From<&'a LabeledField> for FieldOrDataset<'a> {
    fn from(field: &'a LabeledField) -> Self {
        FieldOrDataset::Field(field)
    }
}

impl<'a> From<&'a Dataset> for FieldOrDataset<'a> {
    fn from(dataset: &'a Dataset) -> Self {
        FieldOrDataset::Dataset(dataset)
    }
}

impl<'a> FieldOrDataset<'a> {
    pub fn coord(&self, dim: &str) -> Option<&'a Array1<f64>> {
        match *self {
            FieldOrDataset::Field(field) => field.coord(dim),
            FieldOrDataset::Dataset(dataset) => dataset.coord(dim),
        }
    }

    pub fn len_of(&self, dim: &str) -> Option<usize> {
        match *self {
            FieldOrDataset::Field(field) => field.len_of(dim),
            FieldOrDataset::Dataset(dataset) => dataset.len_of(dim),
        }
    }
}

/// Owned result mirroring the kind of input it was computed from.
#[derive(Clone, Debug, PartialEq)]
pub enum Labeled {
    Field(LabeledField),
    Dataset(Dataset),
}

impl Labeled {
    pub fn into_field(self) -> Option<LabeledField> {
        match self {
            Labeled::Field(field) => Some(field),
            Labeled::Dataset(_) => None,
        }
    }

    pub fn into_dataset(self) -> Option<Dataset> {
        match self {
            Labeled::Field(_) => None,
            Labeled::Dataset(dataset) => Some(dataset),
        }
    }
}
