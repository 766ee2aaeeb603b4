// xspharm/src/io.rs

use crate::labeled::{Dataset, LabeledField, LabeledFieldError};
use log::debug;
use ndarray::{Array1, ArrayD, Dimension, IxDyn, ShapeError};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FieldIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("CSV table needs at least one dimension column and one value column, but the header has {0} columns")]
    TooFewColumns(usize),
    #[error("Row {row}: cannot parse column {column:?} value {value:?} as a number")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },
    #[error("Row {row} repeats a grid cell that was already given")]
    DuplicateCell { row: usize },
    #[error("Table is missing {missing} of {total} grid cells")]
    MissingCells { missing: usize, total: usize },
    #[error("Nothing to write: the dataset has no variables")]
    EmptyDataset,
    #[error("Variables {0:?} and {1:?} do not share dimensions and cannot be written to one table")]
    IncompatibleVariables(String, String),
    #[error(transparent)]
    LabeledField(#[from] LabeledFieldError),
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Reads a long-format table: one column per dimension followed by a value
/// column named after the field. Coordinates keep the order in which their
/// values first appear.
pub fn read_field<R: Read>(reader: R) -> Result<LabeledField, FieldIoError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let header: Vec<String> = rdr.headers()?.iter().map(String::from).collect();
    if header.len() < 2 {
        return Err(FieldIoError::TooFewColumns(header.len()));
    }
    let ndim = header.len() - 1;
    let mut coords: Vec<Vec<f64>> = vec![Vec::new(); ndim];
    let mut lookup: Vec<HashMap<u64, usize>> = vec![HashMap::new(); ndim];
    let mut cells: Vec<(Vec<usize>, f64)> = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let mut index = Vec::with_capacity(ndim);
        for (axis, raw) in record.iter().take(ndim).enumerate() {
            let value = parse_number(row, &header[axis], raw)?;
            let slot = *lookup[axis].entry(coord_key(value)).or_insert_with(|| {
                coords[axis].push(value);
                coords[axis].len() - 1
            });
            index.push(slot);
        }
        let value = parse_number(row, &header[ndim], record.get(ndim).unwrap_or(""))?;
        cells.push((index, value));
    }

    let shape: Vec<usize> = coords.iter().map(Vec::len).collect();
    let total: usize = shape.iter().product();
    let mut data = ArrayD::from_elem(IxDyn(&shape), f64::NAN);
    let mut filled = ArrayD::from_elem(IxDyn(&shape), false);
    for (row, (index, value)) in cells.iter().enumerate() {
        let cell = index.as_slice();
        if filled[cell] {
            return Err(FieldIoError::DuplicateCell { row });
        }
        filled[cell] = true;
        data[cell] = *value;
    }
    if cells.len() < total {
        return Err(FieldIoError::MissingCells {
            missing: total - cells.len(),
            total,
        });
    }
    let name = header[ndim].clone();
    debug!("Read {} with dims {:?} and shape {:?}", name, &header[..ndim], shape);
    let mut field = LabeledField::new(&name, header[..ndim].iter().cloned(), data)?;
    for (dim, values) in header.iter().zip(coords) {
        field.set_coord(dim, Array1::from(values))?;
    }
    Ok(field)
}

pub fn read_field_csv(path: &Path) -> Result<LabeledField, FieldIoError> {
    read_field(File::open(path)?)
}

/// Writes a field in the long format read by [`read_field`]. Dimensions
/// without coordinates are written as their integer positions.
pub fn write_field<W: Write>(field: &LabeledField, writer: W) -> Result<(), FieldIoError> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut header: Vec<&str> = field.dims().iter().map(String::as_str).collect();
    header.push(field.name());
    wtr.write_record(&header)?;
    let coords = axis_values(field);
    for (index, value) in field.data().indexed_iter() {
        let mut record: Vec<String> = coords
            .iter()
            .enumerate()
            .map(|(axis, values)| values[index[axis]].to_string())
            .collect();
        record.push(value.to_string());
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_field_csv(field: &LabeledField, path: &Path) -> Result<(), FieldIoError> {
    write_field(field, File::create(path)?)
}

/// Writes every variable of a dataset as one value column of a shared table.
pub fn write_dataset<W: Write>(dataset: &Dataset, writer: W) -> Result<(), FieldIoError> {
    let mut variables = dataset.iter();
    let first = variables.next().ok_or(FieldIoError::EmptyDataset)?;
    for other in variables {
        if other.dims() != first.dims() || other.shape() != first.shape() {
            return Err(FieldIoError::IncompatibleVariables(
                first.name().to_string(),
                other.name().to_string(),
            ));
        }
    }
    let mut wtr = csv::Writer::from_writer(writer);
    let mut header: Vec<&str> = first.dims().iter().map(String::as_str).collect();
    header.extend(dataset.iter().map(|v| v.name()));
    wtr.write_record(&header)?;
    let coords = axis_values(first);
    for (index, _) in first.data().indexed_iter() {
        let mut record: Vec<String> = coords
            .iter()
            .enumerate()
            .map(|(axis, values)| values[index[axis]].to_string())
            .collect();
        record.extend(dataset.iter().map(|v| v.data()[index.slice()].to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_dataset_csv(dataset: &Dataset, path: &Path) -> Result<(), FieldIoError> {
    write_dataset(dataset, File::create(path)?)
}

fn axis_values(field: &LabeledField) -> Vec<Array1<f64>> {
    field
        .dims()
        .iter()
        .zip(field.shape())
        .map(|(dim, &len)| {
            field
                .coord(dim)
                .cloned()
                .unwrap_or_else(|| Array1::from_iter((0..len).map(|i| i as f64)))
        })
        .collect()
}

fn parse_number(row: usize, column: &str, raw: &str) -> Result<f64, FieldIoError> {
    raw.parse::<f64>().map_err(|_| FieldIoError::InvalidNumber {
        row,
        column: column.to_string(),
        value: raw.to_string(),
    })
}

fn coord_key(value: f64) -> u64 {
    // fold -0.0 onto 0.0
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}
