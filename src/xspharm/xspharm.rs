// xspharm/src/xspharm/xspharm.rs

use super::errors::{TruncationRangeError, XspharmError};
use crate::adapter::{DimensionMismatchError, FlattenDescriptor, GridAdapter};
use crate::engine::{EngineFailureError, TransformEngine};
use crate::labeled::{Dataset, FieldOrDataset, Labeled, LabeledField};
use log::{debug, trace};
use ndarray::{Array2, Array3, ArrayView2, Axis};
use rayon::prelude::*;

pub const DEFAULT_OMEGA: f64 = 7.292e-5;

/// Labeled-array front end to a spherical harmonic transform engine.
pub struct Xspharm {
    adapter: GridAdapter,
    engine: Box<dyn TransformEngine>,
    omega: f64,
}

impl Xspharm {
    /// Pairs an adapter with any engine built for the same grid.
    pub fn from_parts(
        adapter: GridAdapter,
        engine: Box<dyn TransformEngine>,
        omega: f64,
    ) -> Result<Self, XspharmError> {
        let (nlat, nlon) = (adapter.spec().nlat(), adapter.spec().nlon());
        if engine.nlat() != nlat || engine.nlon() != nlon {
            return Err(XspharmError::EngineGridMismatch {
                engine_nlat: engine.nlat(),
                engine_nlon: engine.nlon(),
                nlat,
                nlon,
            });
        }
        if engine.grid_type() != adapter.spec().grid_type() {
            return Err(XspharmError::EngineGridTypeMismatch {
                engine: engine.grid_type(),
                grid: adapter.spec().grid_type(),
            });
        }
        if !omega.is_finite() {
            return Err(XspharmError::InvalidEarthParameter("omega", omega));
        }
        Ok(Self {
            adapter,
            engine,
            omega,
        })
    }

    pub fn adapter(&self) -> &GridAdapter {
        &self.adapter
    }

    pub fn engine(&self) -> &dyn TransformEngine {
        self.engine.as_ref()
    }

    pub fn omega(&self) -> f64 {
        self.omega
    }

    pub fn rsphere(&self) -> f64 {
        self.engine.rsphere()
    }

    pub fn max_wavenumber(&self) -> usize {
        self.adapter
            .spec()
            .max_wavenumber()
            .min(self.engine.max_wavenumber())
    }

    /// Triangular truncation at `ntrunc` of a field or of every gridded
    /// variable of a dataset.
    pub fn truncate<'a, T>(&self, x: T, ntrunc: usize) -> Result<Labeled, XspharmError>
    where
        T: Into<FieldOrDataset<'a>>,
    {
        let ntrunc = self.check_ntrunc(ntrunc, 0)?;
        debug!("truncate at T{}", ntrunc);
        self.apply_scalar(x.into(), |engine, slice| engine.truncate(slice, ntrunc))
    }

    /// Damps coefficients of total wavenumber `n` by
    /// `exp(-(n (n + 1) / (N (N + 1)))^r)` with `N = ntrunc`.
    ///
    /// The damping depends on `n` alone, so it commutes with rotations of the
    /// sphere. Filters keyed on `sqrt(n (n + 1) + m^2)` damp high zonal orders
    /// harder and give different output.
    pub fn exp_taper<'a, T>(&self, x: T, ntrunc: usize, r: f64) -> Result<Labeled, XspharmError>
    where
        T: Into<FieldOrDataset<'a>>,
    {
        let ntrunc = self.check_ntrunc(ntrunc, 1)?;
        if !r.is_finite() || r <= 0.0 {
            return Err(XspharmError::InvalidTaperOrder(r));
        }
        let factors = taper_factors(self.max_wavenumber(), ntrunc, r);
        debug!("exp_taper with N = {}, r = {}", ntrunc, r);
        self.apply_scalar(x.into(), |engine, slice| engine.specsmooth(slice, &factors))
    }

    /// Streamfunction and velocity potential.
    pub fn uv2sfvp(
        &self,
        u: &LabeledField,
        v: &LabeledField,
        ntrunc: Option<usize>,
    ) -> Result<Dataset, XspharmError> {
        let ntrunc = self.resolve_ntrunc(ntrunc)?;
        debug!("uv2sfvp for {} and {} at T{}", u.name(), v.name(), ntrunc);
        let (descriptor, inputs) = self.flatten_pair(u, v)?;
        let outputs = self.map_batches(&[&inputs.0, &inputs.1], |engine, slices| {
            let (psi, chi) = engine.getpsichi(slices[0], slices[1], ntrunc)?;
            Ok([psi, chi])
        })?;
        let [sf, vp] = self.outputs::<2>(outputs, &descriptor)?;
        Ok(Dataset::new()
            .with_variable(labeled(sf, "sf", "Streamfunction", "m**2/s"))
            .with_variable(labeled(vp, "vp", "velocity potential", "m**2/s")))
    }

    /// Relative vorticity and divergence.
    pub fn uv2vordiv(
        &self,
        u: &LabeledField,
        v: &LabeledField,
        ntrunc: Option<usize>,
    ) -> Result<Dataset, XspharmError> {
        let ntrunc = self.resolve_ntrunc(ntrunc)?;
        debug!("uv2vordiv for {} and {} at T{}", u.name(), v.name(), ntrunc);
        let (descriptor, inputs) = self.flatten_pair(u, v)?;
        let outputs = self.map_batches(&[&inputs.0, &inputs.1], |engine, slices| {
            let (vrt, div) = engine.getvrtdivspec(slices[0], slices[1], ntrunc)?;
            Ok([engine.spectogrd(&vrt)?, engine.spectogrd(&div)?])
        })?;
        let [vor, div] = self.outputs::<2>(outputs, &descriptor)?;
        Ok(Dataset::new()
            .with_variable(labeled(vor, "vor", "Vorticity", "1/s"))
            .with_variable(labeled(div, "div", "Divergence", "1/s")))
    }

    /// Relative vorticity plus the planetary vorticity `2 omega sin(lat)`.
    pub fn uv2absvor(
        &self,
        u: &LabeledField,
        v: &LabeledField,
        ntrunc: Option<usize>,
    ) -> Result<LabeledField, XspharmError> {
        let ntrunc = self.resolve_ntrunc(ntrunc)?;
        debug!("uv2absvor for {} and {} at T{}", u.name(), v.name(), ntrunc);
        let (descriptor, inputs) = self.flatten_pair(u, v)?;
        let coriolis: Vec<f64> = self
            .adapter
            .spec()
            .engine_latitudes()
            .iter()
            .map(|lat| 2.0 * self.omega * lat.to_radians().sin())
            .collect();
        let outputs = self.map_batches(&[&inputs.0, &inputs.1], |engine, slices| {
            let (vrt, _) = engine.getvrtdivspec(slices[0], slices[1], ntrunc)?;
            let mut absvor = engine.spectogrd(&vrt)?;
            for (mut row, f) in absvor.outer_iter_mut().zip(coriolis.iter()) {
                row += *f;
            }
            Ok([absvor])
        })?;
        let [absvor] = self.outputs::<1>(outputs, &descriptor)?;
        Ok(labeled(absvor, "absvor", "Absolute vorticity", "1/s"))
    }

    /// Rotational wind from streamfunction.
    pub fn sf2uv(&self, sf: &LabeledField, ntrunc: Option<usize>) -> Result<Dataset, XspharmError> {
        let ntrunc = self.resolve_ntrunc(ntrunc)?;
        debug!("sf2uv for {} at T{}", sf.name(), ntrunc);
        let (flat, descriptor) = self.adapter.flatten(sf)?;
        let outputs = self.map_batches(&[&flat], |engine, slices| {
            let (ug, vg) = engine.getgrad(&engine.grdtospec(slices[0], ntrunc)?)?;
            Ok([-vg, ug])
        })?;
        let [u, v] = self.outputs::<2>(outputs, &descriptor)?;
        Ok(Dataset::new()
            .with_variable(labeled(u, "u_rot", "rotational component of U wind", "m/s"))
            .with_variable(labeled(v, "v_rot", "rotational component of V wind", "m/s")))
    }

    /// Divergent wind from velocity potential.
    pub fn vp2uv(&self, vp: &LabeledField, ntrunc: Option<usize>) -> Result<Dataset, XspharmError> {
        let ntrunc = self.resolve_ntrunc(ntrunc)?;
        debug!("vp2uv for {} at T{}", vp.name(), ntrunc);
        let (flat, descriptor) = self.adapter.flatten(vp)?;
        let outputs = self.map_batches(&[&flat], |engine, slices| {
            let (ug, vg) = engine.getgrad(&engine.grdtospec(slices[0], ntrunc)?)?;
            Ok([ug, vg])
        })?;
        let [u, v] = self.outputs::<2>(outputs, &descriptor)?;
        Ok(Dataset::new()
            .with_variable(labeled(u, "u_div", "divergent component of U wind", "m/s"))
            .with_variable(labeled(v, "v_div", "divergent component of V wind", "m/s")))
    }

    /// Full wind as the sum of the rotational and divergent parts.
    pub fn sfvp2uv(
        &self,
        sf: &LabeledField,
        vp: &LabeledField,
        ntrunc: Option<usize>,
    ) -> Result<Dataset, XspharmError> {
        let ntrunc = self.resolve_ntrunc(ntrunc)?;
        debug!("sfvp2uv for {} and {} at T{}", sf.name(), vp.name(), ntrunc);
        let (descriptor, inputs) = self.flatten_pair(sf, vp)?;
        let outputs = self.map_batches(&[&inputs.0, &inputs.1], |engine, slices| {
            let (u_psi, v_psi) = engine.getgrad(&engine.grdtospec(slices[0], ntrunc)?)?;
            let (u_chi, v_chi) = engine.getgrad(&engine.grdtospec(slices[1], ntrunc)?)?;
            Ok([u_chi - v_psi, v_chi + u_psi])
        })?;
        let [u, v] = self.outputs::<2>(outputs, &descriptor)?;
        Ok(Dataset::new()
            .with_variable(labeled(u, "u", "U wind", "m/s"))
            .with_variable(labeled(v, "v", "V wind", "m/s")))
    }

    fn check_ntrunc(&self, ntrunc: usize, min: usize) -> Result<usize, TruncationRangeError> {
        let max = self.max_wavenumber();
        if ntrunc < min || ntrunc > max {
            return Err(TruncationRangeError { ntrunc, min, max });
        }
        Ok(ntrunc)
    }

    fn resolve_ntrunc(&self, ntrunc: Option<usize>) -> Result<usize, TruncationRangeError> {
        match ntrunc {
            Some(ntrunc) => self.check_ntrunc(ntrunc, 0),
            None => Ok(self.max_wavenumber()),
        }
    }

    fn flatten_pair(
        &self,
        left: &LabeledField,
        right: &LabeledField,
    ) -> Result<(FlattenDescriptor, (Array3<f64>, Array3<f64>)), XspharmError> {
        self.adapter.validate_pair(left, right)?;
        let (left_flat, descriptor) = self.adapter.flatten(left)?;
        let (right_flat, _) = self.adapter.flatten(right)?;
        Ok((descriptor, (left_flat, right_flat)))
    }

    /// Applies a single-input, single-output slice transform to a field or to
    /// every gridded variable of a dataset.
    fn apply_scalar<F>(&self, x: FieldOrDataset<'_>, f: F) -> Result<Labeled, XspharmError>
    where
        F: Fn(&dyn TransformEngine, ArrayView2<f64>) -> Result<Array2<f64>, EngineFailureError>
            + Sync,
    {
        let apply = |field: &LabeledField| -> Result<LabeledField, XspharmError> {
            let (flat, descriptor) = self.adapter.flatten(field)?;
            let outputs = self.map_batches(&[&flat], |engine, slices| Ok([f(engine, slices[0])?]))?;
            let [out] = self.outputs::<1>(outputs, &descriptor)?;
            Ok(out)
        };
        match x {
            FieldOrDataset::Field(field) => Ok(Labeled::Field(apply(field)?)),
            FieldOrDataset::Dataset(dataset) => {
                let mut out = dataset.empty_like();
                for variable in dataset.iter() {
                    if self.adapter.is_gridded(variable) {
                        out.insert(apply(variable)?);
                    } else {
                        debug!("Passing through non-gridded variable {}", variable.name());
                        out.insert(variable.clone());
                    }
                }
                Ok(Labeled::Dataset(out))
            }
        }
    }

    /// Runs `f` on every batch slice in parallel and stacks each of its
    /// outputs back into a `(batch, lat, lon)` array, in batch order.
    fn map_batches<const N: usize, F>(
        &self,
        inputs: &[&Array3<f64>],
        f: F,
    ) -> Result<Vec<Array3<f64>>, XspharmError>
    where
        F: Fn(&dyn TransformEngine, &[ArrayView2<f64>]) -> Result<[Array2<f64>; N], EngineFailureError>
            + Sync,
    {
        let nbatch = inputs.first().map(|a| a.len_of(Axis(0))).unwrap_or(0);
        let engine = self.engine.as_ref();
        let per_slice: Vec<[Array2<f64>; N]> = (0..nbatch)
            .into_par_iter()
            .map(|b| {
                trace!("Transforming batch slice {}", b);
                let slices: Vec<ArrayView2<f64>> =
                    inputs.iter().map(|a| a.index_axis(Axis(0), b)).collect();
                f(engine, &slices)
            })
            .collect::<Result<_, _>>()?;
        let (nlat, nlon) = (self.adapter.spec().nlat(), self.adapter.spec().nlon());
        let mut batches = Vec::with_capacity(N);
        for k in 0..N {
            if per_slice.is_empty() {
                batches.push(Array3::zeros((0, nlat, nlon)));
                continue;
            }
            let views: Vec<ArrayView2<f64>> = per_slice.iter().map(|outs| outs[k].view()).collect();
            let stacked = ndarray::stack(Axis(0), &views).map_err(DimensionMismatchError::from)?;
            batches.push(stacked);
        }
        Ok(batches)
    }

    fn outputs<const N: usize>(
        &self,
        outputs: Vec<Array3<f64>>,
        descriptor: &FlattenDescriptor,
    ) -> Result<[LabeledField; N], XspharmError> {
        let fields = outputs
            .into_iter()
            .map(|raw| self.adapter.unflatten(raw, descriptor))
            .collect::<Result<Vec<_>, _>>()?;
        let count = fields.len();
        fields.try_into().map_err(|_| {
            XspharmError::from(DimensionMismatchError::RawShapeMismatch {
                field: descriptor.name().to_string(),
                expected: vec![N],
                actual: vec![count],
            })
        })
    }
}

fn taper_factors(nmax: usize, ntrunc: usize, r: f64) -> Vec<f64> {
    let reference = (ntrunc * (ntrunc + 1)) as f64;
    (0..=nmax)
        .map(|n| (-((n * (n + 1)) as f64 / reference).powf(r)).exp())
        .collect()
}

fn labeled(field: LabeledField, name: &str, long_name: &str, units: &str) -> LabeledField {
    field
        .renamed(name)
        .with_attr("long_name", long_name)
        .with_attr("units", units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SpharmtBuilder;
    use crate::grid::{gaussian_latitudes, regular_latitudes, GridType};
    use crate::xspharm::XspharmBuilder;
    use ndarray::{Array, Array1, ArrayD, Ix2, IxDyn};

    const RSPHERE: f64 = 6.3712e6;

    fn lat_lon(grid_type: GridType, nlat: usize, nlon: usize) -> (Array1<f64>, Array1<f64>) {
        let lats = match grid_type {
            GridType::Regular => regular_latitudes(nlat),
            GridType::Gaussian => gaussian_latitudes(nlat),
        };
        let lons = Array1::linspace(0.0, 360.0 - 360.0 / nlon as f64, nlon);
        (Array1::from(lats), lons)
    }

    /// A `(lat, lon)` field from `f(lat, lon)` in radians.
    fn field<F: Fn(f64, f64) -> f64>(
        name: &str,
        lats: &Array1<f64>,
        lons: &Array1<f64>,
        f: F,
    ) -> LabeledField {
        let data = Array::from_shape_fn(IxDyn(&[lats.len(), lons.len()]), |ix| {
            f(lats[ix[0]].to_radians(), lons[ix[1]].to_radians())
        });
        LabeledField::new(name, ["lat", "lon"], data)
            .unwrap()
            .with_coord("lat", lats.clone())
            .unwrap()
            .with_coord("lon", lons.clone())
            .unwrap()
    }

    /// A `(time, lat, lon)` field from `f(time, lat, lon)`.
    fn timed_field<F: Fn(usize, f64, f64) -> f64>(
        name: &str,
        ntime: usize,
        lats: &Array1<f64>,
        lons: &Array1<f64>,
        f: F,
    ) -> LabeledField {
        let data = Array::from_shape_fn(IxDyn(&[ntime, lats.len(), lons.len()]), |ix| {
            f(ix[0], lats[ix[1]].to_radians(), lons[ix[2]].to_radians())
        });
        LabeledField::new(name, ["time", "lat", "lon"], data)
            .unwrap()
            .with_coord("lat", lats.clone())
            .unwrap()
            .with_coord("lon", lons.clone())
            .unwrap()
    }

    fn xsh(grid: &LabeledField, grid_type: GridType) -> Xspharm {
        XspharmBuilder::default()
            .grid(grid)
            .gridtype(&grid_type)
            .build()
            .unwrap()
    }

    fn max_abs_diff(a: &ArrayD<f64>, b: &ArrayD<f64>) -> f64 {
        assert_eq!(a.shape(), b.shape());
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f64::max)
    }

    fn grid2(field: &LabeledField) -> Array2<f64> {
        field.data().clone().into_dimensionality::<Ix2>().unwrap()
    }

    #[test]
    fn test_truncate_regular_2p5_degree_grid() {
        crate::_setup_pretty_env_logger_default();
        let (lats, lons) = lat_lon(GridType::Regular, 73, 144);
        // stored south to north
        let lats: Array1<f64> = lats.iter().rev().cloned().collect();
        let t = timed_field("t", 2, &lats, &lons, |time, lat, lon| {
            lat.sin().exp() * (1.0 + lat.cos() * lon.cos()) + (3.0 * lon).sin() * lat.cos().powi(5)
                + time as f64
        });
        let xsh = xsh(&t, GridType::Regular);
        assert_eq!(xsh.max_wavenumber(), 71);

        let truncated = xsh.truncate(&t, 21).unwrap().into_field().unwrap();
        assert_eq!(truncated.shape(), t.shape());
        assert_eq!(truncated.dims(), t.dims());
        assert_eq!(truncated.coord("lat"), t.coord("lat"));

        let (flat, _) = xsh.adapter().flatten(&truncated).unwrap();
        for slice in flat.outer_iter() {
            let spec = xsh.engine().grdtospec(slice, 71).unwrap();
            let largest = spec.as_slice().iter().map(|c| c.norm()).fold(0.0, f64::max);
            for (_, n, value) in spec.iter() {
                if n > 21 {
                    assert!(value.norm() < 1e-10 * largest, "n = {}: {}", n, value);
                }
            }
        }

        let again = xsh.truncate(&truncated, 21).unwrap().into_field().unwrap();
        assert!(max_abs_diff(again.data(), truncated.data()) < 1e-10);
    }

    #[test]
    fn test_truncate_at_max_wavenumber_keeps_resolvable_field() {
        let (lats, lons) = lat_lon(GridType::Gaussian, 8, 16);
        let f = field("f", &lats, &lons, |lat, lon| {
            2.0 + lat.sin() + lat.cos() * lat.sin() * lon.sin() + lat.cos().powi(3) * (3.0 * lon).cos()
        });
        let xsh = xsh(&f, GridType::Gaussian);
        let out = xsh.truncate(&f, xsh.max_wavenumber()).unwrap().into_field().unwrap();
        assert!(max_abs_diff(out.data(), f.data()) < 1e-12);
    }

    #[test]
    fn test_range_and_dimension_errors() {
        let (lats, lons) = lat_lon(GridType::Regular, 73, 144);
        let t = field("t", &lats, &lons, |lat, _| lat.sin());
        let xsh = xsh(&t, GridType::Regular);
        assert!(matches!(
            xsh.truncate(&t, 72),
            Err(XspharmError::TruncationRange(TruncationRangeError { ntrunc: 72, max: 71, .. }))
        ));
        assert!(matches!(
            xsh.uv2vordiv(&t, &t, Some(100)),
            Err(XspharmError::TruncationRange(_))
        ));

        let (coarse_lats, coarse_lons) = lat_lon(GridType::Regular, 37, 72);
        let coarse = field("coarse", &coarse_lats, &coarse_lons, |lat, _| lat.sin());
        assert!(matches!(
            xsh.truncate(&coarse, 10),
            Err(XspharmError::DimensionMismatch(DimensionMismatchError::ExtentMismatch { .. }))
        ));
        assert!(matches!(
            xsh.sf2uv(&coarse, None),
            Err(XspharmError::DimensionMismatch(_))
        ));

        let other = LabeledField::new("t", ["time", "lat", "lon"], Array::zeros(IxDyn(&[2, 73, 144]))).unwrap();
        assert!(matches!(
            xsh.uv2sfvp(&t, &other, None),
            Err(XspharmError::DimensionMismatch(DimensionMismatchError::ComponentMismatch { .. }))
        ));
    }

    #[test]
    fn test_every_operation_rejects_other_grid() {
        let (lats, lons) = lat_lon(GridType::Regular, 19, 36);
        let t = field("t", &lats, &lons, |lat, _| lat.sin());
        let xsh = xsh(&t, GridType::Regular);
        let (coarse_lats, coarse_lons) = lat_lon(GridType::Regular, 10, 36);
        let coarse = field("coarse", &coarse_lats, &coarse_lons, |lat, _| lat.sin());
        let is_mismatch = |result: Result<(), XspharmError>| {
            matches!(result, Err(XspharmError::DimensionMismatch(_)))
        };
        assert!(is_mismatch(xsh.exp_taper(&coarse, 4, 2.0).map(|_| ())));
        assert!(is_mismatch(xsh.uv2vordiv(&coarse, &coarse, None).map(|_| ())));
        assert!(is_mismatch(xsh.uv2absvor(&coarse, &coarse, None).map(|_| ())));
        assert!(is_mismatch(xsh.vp2uv(&coarse, None).map(|_| ())));
        assert!(is_mismatch(xsh.sfvp2uv(&coarse, &coarse, None).map(|_| ())));
        // one component on the reference grid is not enough
        assert!(is_mismatch(xsh.uv2vordiv(&t, &coarse, None).map(|_| ())));
        assert!(is_mismatch(xsh.sfvp2uv(&coarse, &t, None).map(|_| ())));
    }

    #[test]
    fn test_engine_failure_on_nan_input() {
        let (lats, lons) = lat_lon(GridType::Regular, 9, 16);
        let mut t = field("t", &lats, &lons, |lat, _| lat.sin());
        let xsh = xsh(&t, GridType::Regular);
        let data = t.data().mapv(|value| if value > 0.9 { f64::NAN } else { value });
        t = LabeledField::new("t", ["lat", "lon"], data).unwrap();
        assert!(matches!(
            xsh.truncate(&t, 3),
            Err(XspharmError::EngineFailure(EngineFailureError::NonFiniteInput(_)))
        ));
    }

    #[test]
    fn test_dataset_variables_without_grid_pass_through() {
        let (lats, lons) = lat_lon(GridType::Gaussian, 8, 16);
        let t = timed_field("t", 3, &lats, &lons, |time, lat, lon| {
            time as f64 + lat.sin().powi(6) + lat.cos() * lon.cos()
        });
        let station = LabeledField::new("station", ["time"], Array::from_vec(vec![1.0, 2.0, 3.0]).into_dyn())
            .unwrap()
            .with_attr("units", "K");
        let mut dataset = Dataset::new()
            .with_variable(t.clone())
            .with_variable(station.clone())
            .with_coord("time", Array1::from(vec![0.0, 6.0, 12.0]));
        dataset.set_attr("title", "test");
        let xsh = xsh(&t, GridType::Gaussian);

        let out = xsh.truncate(&dataset, 2).unwrap().into_dataset().unwrap();
        assert_eq!(out.names(), vec!["t", "station"]);
        assert_eq!(out.get("station"), Some(&station));
        assert_eq!(out.attrs().get("title").map(String::as_str), Some("test"));
        assert_eq!(out.coord("time").map(|c| c[2]), Some(12.0));
        let single = xsh.truncate(&t, 2).unwrap().into_field().unwrap();
        assert_eq!(out.get("t"), Some(&single));
    }

    #[test]
    fn test_exp_taper_damps_by_degree() {
        let (lats, lons) = lat_lon(GridType::Gaussian, 8, 16);
        // degree two zonal harmonic
        let f = field("f", &lats, &lons, |lat, _| 3.0 * lat.sin().powi(2) - 1.0);
        let xsh = xsh(&f, GridType::Gaussian);
        let tapered = xsh.exp_taper(&f, 2, 2.0).unwrap().into_field().unwrap();
        let expected = f.data().mapv(|value| value * (-1.0f64).exp());
        assert!(max_abs_diff(tapered.data(), &expected) < 1e-12);

        assert!(matches!(
            xsh.exp_taper(&f, 2, 0.0),
            Err(XspharmError::InvalidTaperOrder(_))
        ));
        assert!(matches!(
            xsh.exp_taper(&f, 0, 2.0),
            Err(XspharmError::TruncationRange(TruncationRangeError { min: 1, .. }))
        ));
        let factors = taper_factors(4, 2, 1.0);
        assert_eq!(factors[0], 1.0);
        assert!((factors[2] - (-1.0f64).exp()).abs() < 1e-15);
        assert!(factors.windows(2).all(|pair| pair[1] < pair[0]));
    }

    #[test]
    fn test_uv2vordiv_solid_body_rotation() {
        let (lats, lons) = lat_lon(GridType::Regular, 9, 16);
        let u0 = 20.0;
        let u = field("u", &lats, &lons, |lat, _| u0 * lat.cos()).with_attr("units", "m/s");
        let v = field("v", &lats, &lons, |_, _| 0.0);
        let xsh = xsh(&u, GridType::Regular);
        let out = xsh.uv2vordiv(&u, &v, None).unwrap();
        assert_eq!(out.names(), vec!["vor", "div"]);
        let vor = out.get("vor").unwrap();
        assert_eq!(vor.attr("long_name"), Some("Vorticity"));
        assert_eq!(vor.attr("units"), Some("1/s"));
        let expected = field("e", &lats, &lons, |lat, _| 2.0 * u0 * lat.sin() / RSPHERE);
        assert!(max_abs_diff(vor.data(), expected.data()) < 1e-18);
        let div = out.get("div").unwrap();
        assert!(div.data().iter().all(|value| value.abs() < 1e-18));
    }

    #[test]
    fn test_uv2absvor_adds_planetary_vorticity() {
        let (lats, lons) = lat_lon(GridType::Regular, 9, 16);
        let amp = 1.0e7;
        let u = field("u", &lats, &lons, |lat, lon| -amp / RSPHERE * (2.0 * lat).cos() * lon.cos());
        let v = field("v", &lats, &lons, |lat, lon| -amp / RSPHERE * lat.sin() * lon.sin());
        let xsh = xsh(&u, GridType::Regular);
        let absvor = xsh.uv2absvor(&u, &v, None).unwrap();
        assert_eq!(absvor.name(), "absvor");
        assert_eq!(absvor.attr("long_name"), Some("Absolute vorticity"));
        let vordiv = xsh.uv2vordiv(&u, &v, None).unwrap();
        let absvor = grid2(&absvor);
        let vor = grid2(vordiv.get("vor").unwrap());
        let omega = xsh.omega();
        for k in 0..16 {
            // equator
            assert!((absvor[[4, k]] - vor[[4, k]]).abs() < 1e-18);
            // poles
            assert!((absvor[[0, k]] - vor[[0, k]] - 2.0 * omega).abs() < 1e-15);
            assert!((absvor[[8, k]] - vor[[8, k]] + 2.0 * omega).abs() < 1e-15);
        }
    }

    #[test]
    fn test_sf2uv_and_vp2uv() {
        let (lats, lons) = lat_lon(GridType::Gaussian, 8, 16);
        let u0 = 15.0;
        let sf = field("sf", &lats, &lons, |lat, _| -u0 * RSPHERE * lat.sin());
        let vp = field("vp", &lats, &lons, |lat, _| RSPHERE * u0 * lat.sin());
        let xsh = xsh(&sf, GridType::Gaussian);

        let rot = xsh.sf2uv(&sf, None).unwrap();
        assert_eq!(rot.names(), vec!["u_rot", "v_rot"]);
        let u_rot = rot.get("u_rot").unwrap();
        assert_eq!(u_rot.attr("long_name"), Some("rotational component of U wind"));
        let expected = field("e", &lats, &lons, |lat, _| u0 * lat.cos());
        assert!(max_abs_diff(u_rot.data(), expected.data()) < 1e-10);
        assert!(rot.get("v_rot").unwrap().data().iter().all(|value| value.abs() < 1e-10));

        let div = xsh.vp2uv(&vp, None).unwrap();
        assert_eq!(div.names(), vec!["u_div", "v_div"]);
        assert!(div.get("u_div").unwrap().data().iter().all(|value| value.abs() < 1e-10));
        assert!(max_abs_diff(div.get("v_div").unwrap().data(), expected.data()) < 1e-10);
        assert_eq!(div.get("v_div").unwrap().attr("units"), Some("m/s"));
    }

    #[test]
    fn test_sfvp_roundtrip_up_to_global_mean() {
        let (lats, lons) = lat_lon(GridType::Gaussian, 8, 16);
        let amp = 1.0e7;
        let offset = 100.0;
        // stored as (lon, lat) to exercise the transpose
        let transpose = |f: LabeledField| {
            let data = f.data().clone().reversed_axes().as_standard_layout().into_owned();
            LabeledField::new(f.name(), ["lon", "lat"], data)
                .unwrap()
                .with_coord("lat", lats.clone())
                .unwrap()
                .with_coord("lon", lons.clone())
                .unwrap()
        };
        let sf0 = transpose(field("sf", &lats, &lons, |lat, lon| {
            amp * lat.cos() * lat.sin() * lon.cos() + offset
        }));
        let vp0 = transpose(field("vp", &lats, &lons, |lat, lon| {
            amp * (lat.sin() + lat.cos().powi(2) * (2.0 * lon).sin())
        }));
        let xsh = xsh(&sf0, GridType::Gaussian);

        let wind = xsh.sfvp2uv(&sf0, &vp0, None).unwrap();
        assert_eq!(wind.names(), vec!["u", "v"]);
        let u = wind.get("u").unwrap();
        let v = wind.get("v").unwrap();
        assert_eq!(u.dims(), sf0.dims());

        let rot = xsh.sf2uv(&sf0, None).unwrap();
        let div = xsh.vp2uv(&vp0, None).unwrap();
        let u_sum = rot.get("u_rot").unwrap().data() + div.get("u_div").unwrap().data();
        assert!(max_abs_diff(u.data(), &u_sum) < 1e-10);

        let sfvp = xsh.uv2sfvp(u, v, None).unwrap();
        let sf = sfvp.get("sf").unwrap();
        assert_eq!(sf.attr("long_name"), Some("Streamfunction"));
        assert_eq!(sf.dims(), sf0.dims());
        let sf_expected = sf0.data().mapv(|value| value - offset);
        assert!(max_abs_diff(sf.data(), &sf_expected) < 1e-6);
        assert!(max_abs_diff(sfvp.get("vp").unwrap().data(), vp0.data()) < 1e-6);
    }

    #[test]
    fn test_empty_batch_keeps_shape() {
        let (lats, lons) = lat_lon(GridType::Regular, 9, 16);
        let reference = field("ref", &lats, &lons, |_, _| 0.0);
        let xsh = xsh(&reference, GridType::Regular);
        let empty = LabeledField::new("t", ["time", "lat", "lon"], Array::zeros(IxDyn(&[0, 9, 16]))).unwrap();
        let out = xsh.truncate(&empty, 3).unwrap().into_field().unwrap();
        assert_eq!(out.shape(), &[0, 9, 16]);
    }

    #[test]
    fn test_from_parts_rejects_engine_for_other_grid() {
        let (lats, lons) = lat_lon(GridType::Regular, 9, 16);
        let reference = field("ref", &lats, &lons, |_, _| 0.0);
        let adapter = crate::adapter::GridAdapterBuilder::default()
            .reference(&reference)
            .build()
            .unwrap();
        let engine = SpharmtBuilder::default().nlat(&7).nlon(&16).build().unwrap();
        assert!(matches!(
            Xspharm::from_parts(adapter, Box::new(engine), DEFAULT_OMEGA),
            Err(XspharmError::EngineGridMismatch { engine_nlat: 7, .. })
        ));
    }

    #[test]
    fn test_from_parts_rejects_engine_with_other_quadrature() {
        let (lats, lons) = lat_lon(GridType::Regular, 19, 36);
        let reference = field("ref", &lats, &lons, |_, _| 0.0);
        let adapter = crate::adapter::GridAdapterBuilder::default()
            .reference(&reference)
            .build()
            .unwrap();
        let engine = SpharmtBuilder::default()
            .nlat(&19)
            .nlon(&36)
            .gridtype(&GridType::Gaussian)
            .build()
            .unwrap();
        assert!(matches!(
            Xspharm::from_parts(adapter, Box::new(engine), DEFAULT_OMEGA),
            Err(XspharmError::EngineGridTypeMismatch {
                engine: GridType::Gaussian,
                grid: GridType::Regular,
            })
        ));
    }
}
