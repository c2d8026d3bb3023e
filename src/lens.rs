//! The electron lens element: turns the interpolated potential gradient into
//! a transverse momentum kick.
//!
//! The electron beam quantities depend only on the element, so they are
//! computed once per call and shared by every particle. The kick itself is a
//! pure function of one particle's state; `compute_kicks` fans it out over
//! the bunch with rayon and `Prtl::apply_kicks` commits the result.

use crate::consts::PhysConsts;
use crate::error::KickError;
use crate::fieldmap::grid::{BoundaryPolicy, OutOfGrid};
use crate::fieldmap::FieldMap;
use crate::prtls::Prtl;
use crate::{Float, PRTL_CHUNK_SIZE};
use rayon::prelude::*;

/// What happens to one particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Kick {
    Apply { dpx: Float, dpy: Float },
    /// Could not be placed on the field map, under `FlagLost` or, for a NaN
    /// coordinate, under `Clamp`.
    Lost,
    /// Already stopped before the lens.
    Skip,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrackReport {
    pub kicked: usize,
    pub lost: usize,
    pub skipped: usize,
}

/// Electron beam derived from the accelerating voltage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElectronBeam {
    /// total energy [eV]
    pub etot_e: Float,
    /// momentum [eV/c]
    pub p_e: Float,
    /// relativistic beta, negative for a beam counter-rotating with
    /// respect to the tracked particles
    pub beta_e: Float,
}

impl ElectronBeam {
    pub fn new(voltage: Float, consts: &PhysConsts) -> Result<ElectronBeam, KickError> {
        if !(voltage > 0.0) || !voltage.is_finite() {
            return Err(KickError::DegenerateElement {
                quantity: "voltage",
                value: voltage,
            });
        }
        let emass = consts.emass;
        let etot_e = voltage + emass;
        let p_e = (etot_e * etot_e - emass * emass).sqrt();
        let beta_e = -p_e / etot_e;
        Ok(ElectronBeam {
            etot_e,
            p_e,
            beta_e,
        })
    }
}

pub struct ElectronLens {
    pub length: Float,
    pub current: Float,
    pub voltage: Float,
    fieldmap: FieldMap,
    boundary: BoundaryPolicy,
    consts: PhysConsts,
}

impl ElectronLens {
    pub fn new(
        length: Float,
        current: Float,
        voltage: Float,
        fieldmap: FieldMap,
    ) -> Result<ElectronLens, KickError> {
        for &(quantity, value) in [("length", length), ("current", current)].iter() {
            if !value.is_finite() {
                return Err(KickError::DegenerateElement { quantity, value });
            }
        }
        let lens = ElectronLens {
            length,
            current,
            voltage,
            fieldmap,
            boundary: BoundaryPolicy::default(),
            consts: PhysConsts::default(),
        };
        // fail on a bad voltage now rather than at the first kick
        lens.electron_beam()?;
        Ok(lens)
    }

    pub fn with_boundary(mut self, boundary: BoundaryPolicy) -> ElectronLens {
        self.boundary = boundary;
        self
    }

    pub fn with_consts(mut self, consts: PhysConsts) -> ElectronLens {
        self.consts = consts;
        self
    }

    pub fn fieldmap(&self) -> &FieldMap {
        &self.fieldmap
    }

    pub fn boundary(&self) -> BoundaryPolicy {
        self.boundary
    }

    pub fn consts(&self) -> &PhysConsts {
        &self.consts
    }

    pub fn electron_beam(&self) -> Result<ElectronBeam, KickError> {
        ElectronBeam::new(self.voltage, &self.consts)
    }

    /// Converts a potential gradient into a momentum kick for a particle
    /// with the given reference quantities. The sign assumes a
    /// counter-rotating electron beam.
    #[inline(always)]
    pub fn factor(
        &self,
        beam: &ElectronBeam,
        q0: Float,
        mass0: Float,
        beta0: Float,
        gamma0: Float,
    ) -> Float {
        let qelem = self.consts.qelem;
        let c_light = self.consts.c_light;
        -(self.current * self.length * qelem * q0) / (mass0 * qelem * beta0 * gamma0 * c_light)
            * (1. - beta0 * beam.beta_e)
            / beam.beta_e
    }

    /// Computes the kick of every particle without touching the bunch.
    pub fn compute_kicks(&self, prtls: &Prtl) -> Result<Vec<Kick>, KickError> {
        prtls.check_lengths()?;
        let beam = self.electron_beam()?;
        let grid = self.fieldmap.grid();
        let dphi_dx_map = self.fieldmap.dphi_dx();
        let dphi_dy_map = self.fieldmap.dphi_dy();
        let boundary = self.boundary;

        (
            &prtls.x,
            &prtls.y,
            &prtls.q0,
            &prtls.mass0,
            &prtls.beta0,
            &prtls.gamma0,
            &prtls.state,
        )
            .into_par_iter()
            .enumerate()
            .with_min_len(PRTL_CHUNK_SIZE)
            .map(|(index, (&x, &y, &q0, &mass0, &beta0, &gamma0, &state))| {
                if state <= 0 {
                    return Ok(Kick::Skip);
                }
                for &(quantity, value) in
                    [("mass0", mass0), ("beta0", beta0), ("gamma0", gamma0)].iter()
                {
                    if !(value > 0.0) || !value.is_finite() {
                        return Err(KickError::DegenerateParticle {
                            index,
                            quantity,
                            value,
                        });
                    }
                }

                let iw = match grid.locate(x, y, 0., boundary) {
                    Ok(iw) => iw,
                    Err(OutOfGrid { axis, coord }) if boundary == BoundaryPolicy::Error => {
                        return Err(KickError::OutOfGrid { index, axis, coord })
                    }
                    // off the grid, or NaN under Clamp
                    Err(_) => return Ok(Kick::Lost),
                };
                let dphi_dx = dphi_dx_map.sample_trilinear(&iw);
                let dphi_dy = dphi_dy_map.sample_trilinear(&iw);

                let factor = self.factor(&beam, q0, mass0, beta0, gamma0);
                Ok(Kick::Apply {
                    dpx: factor * dphi_dx,
                    dpy: factor * dphi_dy,
                })
            })
            .collect()
    }

    /// Kicks the whole bunch in place.
    pub fn track(&self, prtls: &mut Prtl) -> Result<TrackReport, KickError> {
        let kicks = self.compute_kicks(prtls)?;
        prtls.apply_kicks(&kicks)
    }
}
