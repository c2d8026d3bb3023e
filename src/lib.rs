use serde::Deserialize;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

pub mod consts;
pub mod error;
pub mod fieldmap;
pub mod lens;
pub mod prtls;
mod save;

use crate::consts::PhysConsts;
use crate::fieldmap::grid::{AxisConfig, Axis, BoundaryPolicy, FieldGridDescriptor, GridAxis};
use crate::fieldmap::{profile, FieldMap};
use crate::lens::ElectronLens;
use crate::prtls::Prtl;

// We use a type alias for f64/Float to easily support
// double and single precision.
#[cfg(feature = "dprec")]
pub type Float = f64;

#[cfg(not(feature = "dprec"))]
pub type Float = f32;

/// Smallest number of particles a rayon task handles.
pub const PRTL_CHUNK_SIZE: usize = 1024;

#[derive(Deserialize)]
pub struct Config {
    pub lens: LensParams,
    pub fieldmap: FieldMapParams,
    pub beam: BeamParams,
    pub output: Output,
    #[serde(default)]
    pub constants: PhysConsts,
}

#[derive(Deserialize)]
pub struct LensParams {
    pub length: Float,  // [m]
    pub current: Float, // [A]
    pub voltage: Float, // [V]
    #[serde(default)]
    pub boundary: BoundaryPolicy,
}

#[derive(Deserialize)]
pub struct FieldMapParams {
    pub x: AxisConfig,
    pub y: AxisConfig,
    /// Leave out for a purely transverse map.
    pub z: Option<AxisConfig>,
    #[serde(default)]
    pub mirror_x: bool,
    #[serde(default)]
    pub mirror_y: bool,
    pub inner_radius: Float,
    pub outer_radius: Float,
}

#[derive(Deserialize)]
pub struct BeamParams {
    pub n_prtls: usize,
    pub sigma_x: Float,
    pub sigma_y: Float,
    pub q0: Float,
    pub mass0: Float, // [eV]
    #[serde(default = "default_chi")]
    pub chi: Float,
    pub gamma0: Float,
    #[serde(default)]
    pub seed: u64,
}

fn default_chi() -> Float {
    1.0
}

#[derive(Deserialize)]
pub struct Output {
    pub write_output: bool,
    pub outdir: String,
    pub stride: usize,
}

impl Config {
    pub fn new() -> Result<Config> {
        Config::from_path("config.toml")
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Config> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Could not open the config file {}", path.display()))?;
        toml::from_str(&contents).with_context(|| "Could not parse Config file")
    }
}

/// Builds the field map described in the config by sampling the synthetic
/// hollow-lens profile on the configured grid.
pub fn build_fieldmap(cfg: &Config) -> Result<FieldMap> {
    let params = &cfg.fieldmap;
    let x = params.x.to_axis(Axis::X)?;
    let y = params.y.to_axis(Axis::Y)?;
    let z = match &params.z {
        Some(z) => z.to_axis(Axis::Z)?,
        None => GridAxis::degenerate(0.0),
    };
    let grid = FieldGridDescriptor::new(x, y, z)
        .with_mirror(Axis::X, params.mirror_x)
        .with_mirror(Axis::Y, params.mirror_y);
    let profile = profile::hollow_lens(params.inner_radius, params.outer_radius, &cfg.constants)
        .context("Could not set up the lens profile")?;
    Ok(FieldMap::from_fn(grid, profile))
}

pub fn build_lens(cfg: &Config) -> Result<ElectronLens> {
    let fieldmap = build_fieldmap(cfg).context("Could not build the field map")?;
    let lens = ElectronLens::new(cfg.lens.length, cfg.lens.current, cfg.lens.voltage, fieldmap)
        .context("Invalid electron lens parameters")?
        .with_boundary(cfg.lens.boundary)
        .with_consts(cfg.constants);
    Ok(lens)
}

pub fn run(cfg: Config) -> Result<()> {
    if cfg.output.stride == 0 {
        return Err(anyhow::Error::msg("Output stride must be at least 1"));
    }

    println!("building electron lens");
    let lens = build_lens(&cfg)?;
    let beam = lens.electron_beam()?;
    println!(
        "electron beam: etot = {:.6e} eV, p = {:.6e} eV/c, beta = {:.6}",
        beam.etot_e, beam.p_e, beam.beta_e
    );

    println!("initializing prtls");
    let mut prtls = Prtl::gaussian_bunch(&cfg.beam);

    println!("kicking {} prtls", prtls.len());
    let report = lens
        .track(&mut prtls)
        .context("Could not apply the electron lens kick")?;
    println!(
        "kicked: {}, lost on field map: {}, skipped: {}",
        report.kicked, report.lost, report.skipped
    );

    if cfg.output.write_output {
        println!("saving prtls");
        save::save_output(&cfg.output, &prtls)?;
    }
    Ok(())
}

#[cfg(all(test, feature = "dprec"))]
pub(crate) const E_TOL: Float = 1E-10;

#[cfg(all(test, not(feature = "dprec")))]
pub(crate) const E_TOL: Float = 1E-4;

/// x and y on [-1, 1] with 5 nodes each, single-node z at 0.
#[cfg(test)]
pub(crate) fn build_test_grid() -> FieldGridDescriptor {
    let x = GridAxis::from_range_n(Axis::X, -1.0, 1.0, 5).unwrap();
    let y = GridAxis::from_range_n(Axis::Y, -1.0, 1.0, 5).unwrap();
    FieldGridDescriptor::transverse(x, y)
}

#[cfg(test)]
pub(crate) fn build_test_beam() -> BeamParams {
    BeamParams {
        n_prtls: 2000,
        sigma_x: 1e-3,
        sigma_y: 2e-3,
        q0: 1.0,
        mass0: 938272000.0,
        chi: 1.0,
        gamma0: 70.0,
        seed: 1234,
    }
}
