// xspharm/src/xspharm/xspharm_builder.rs

use super::errors::XspharmError;
use super::xspharm::{Xspharm, DEFAULT_OMEGA};
use crate::adapter::GridAdapterBuilder;
use crate::engine::{LegendreFunctions, SpharmtBuilder, TransformEngine, DEFAULT_RSPHERE};
use crate::grid::GridType;
use crate::labeled::FieldOrDataset;
use humantime::format_duration;
use log::{debug, info, warn};
use std::time::Instant;

#[derive(Default)]
pub struct XspharmBuilder<'a> {
    grid: Option<FieldOrDataset<'a>>,
    gridtype: Option<&'a GridType>,
    rsphere: Option<&'a f64>,
    omega: Option<&'a f64>,
    legfunc: Option<&'a LegendreFunctions>,
    lat_dim: Option<&'a str>,
    lon_dim: Option<&'a str>,
    tolerance: Option<&'a f64>,
}

impl<'a> XspharmBuilder<'a> {
    pub fn build(&self) -> Result<Xspharm, XspharmError> {
        info!("Starting Xspharm build process");
        let build_start = Instant::now();
        let grid = self
            .grid
            .ok_or_else(|| XspharmError::UninitializedFieldError("grid".to_string()))?;
        let gridtype: &'a GridType = self.gridtype.unwrap_or(&GridType::Regular);
        let rsphere = self.rsphere.copied().unwrap_or(DEFAULT_RSPHERE);
        let omega = self.omega.copied().unwrap_or(DEFAULT_OMEGA);
        let legfunc = self.legfunc.copied().unwrap_or_default();
        Self::validate_earth_parameter("rsphere", &rsphere)?;
        Self::validate_earth_parameter("omega", &omega)?;

        let mut adapter_builder = GridAdapterBuilder::default();
        adapter_builder.reference(grid).grid_type(gridtype);
        if let Some(lat_dim) = self.lat_dim {
            adapter_builder.lat_dim(lat_dim);
        }
        if let Some(lon_dim) = self.lon_dim {
            adapter_builder.lon_dim(lon_dim);
        }
        if let Some(tolerance) = self.tolerance {
            adapter_builder.tolerance(tolerance);
        }
        let adapter = adapter_builder.build()?;
        let (nlat, nlon) = (adapter.spec().nlat(), adapter.spec().nlon());

        let engine_start = Instant::now();
        let engine = SpharmtBuilder::default()
            .nlat(&nlat)
            .nlon(&nlon)
            .gridtype(gridtype)
            .rsphere(&rsphere)
            .legfunc(&legfunc)
            .build()?;
        let engine_elapsed = engine_start.elapsed();
        debug!("Engine created in {}", format_duration(engine_elapsed));
        if engine_elapsed.as_secs() > 10 {
            warn!("Engine setup took longer than expected: {}", format_duration(engine_elapsed));
        }
        info!(
            "Xspharm ready: {} grid {}x{}, max wavenumber {}, built in {}",
            gridtype,
            nlat,
            nlon,
            engine.max_wavenumber(),
            format_duration(build_start.elapsed())
        );
        Xspharm::from_parts(adapter, Box::new(engine), omega)
    }

    fn validate_earth_parameter(name: &'static str, value: &f64) -> Result<(), XspharmError> {
        if !value.is_finite() {
            return Err(XspharmError::InvalidEarthParameter(name, *value));
        }
        Ok(())
    }

    pub fn grid<T>(&mut self, grid: T) -> &mut Self
    where
        T: Into<FieldOrDataset<'a>>,
    {
        self.grid = Some(grid.into());
        self
    }

    pub fn gridtype(&mut self, gridtype: &'a GridType) -> &mut Self {
        self.gridtype = Some(gridtype);
        self
    }

    pub fn rsphere(&mut self, rsphere: &'a f64) -> &mut Self {
        self.rsphere = Some(rsphere);
        self
    }

    pub fn omega(&mut self, omega: &'a f64) -> &mut Self {
        self.omega = Some(omega);
        self
    }

    pub fn legfunc(&mut self, legfunc: &'a LegendreFunctions) -> &mut Self {
        self.legfunc = Some(legfunc);
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
