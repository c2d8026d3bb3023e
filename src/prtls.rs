use crate::error::KickError;
use crate::lens::{Kick, TrackReport};
use crate::{BeamParams, Float};
use itertools::izip;
use rand::prelude::*;
use rand_distr::StandardNormal;

/// State written to a particle that left the field map.
pub const LOST_ON_FIELD_MAP: i64 = -11;

/// A bunch of particles, one entry per particle in every array.
/// `state > 0` means the particle is still tracked.
#[derive(Clone, Debug, Default)]
pub struct Prtl {
    pub x: Vec<Float>,
    pub y: Vec<Float>,
    pub px: Vec<Float>,
    pub py: Vec<Float>,
    pub q0: Vec<Float>,
    pub mass0: Vec<Float>, // [eV]
    pub chi: Vec<Float>,
    pub beta0: Vec<Float>,
    pub gamma0: Vec<Float>,
    pub state: Vec<i64>,
}

impl Prtl {
    /// `num` active particles at the origin with zero momentum, all with
    /// the same reference charge, mass and Lorentz factor.
    pub fn new(num: usize, q0: Float, mass0: Float, gamma0: Float) -> Prtl {
        let beta0 = Float::sqrt(1. - gamma0.powi(-2));
        Prtl {
            x: vec![0.0; num],
            y: vec![0.0; num],
            px: vec![0.0; num],
            py: vec![0.0; num],
            q0: vec![q0; num],
            mass0: vec![mass0; num],
            chi: vec![1.0; num],
            beta0: vec![beta0; num],
            gamma0: vec![gamma0; num],
            state: vec![1; num],
        }
    }

    /// A round-ish Gaussian bunch centred on the axis.
    pub fn gaussian_bunch(params: &BeamParams) -> Prtl {
        let mut prtl = Prtl::new(params.n_prtls, params.q0, params.mass0, params.gamma0);
        for chi in prtl.chi.iter_mut() {
            *chi = params.chi;
        }
        let mut rng = StdRng::seed_from_u64(params.seed);
        for (x, y) in izip!(&mut prtl.x, &mut prtl.y) {
            let r1: Float = rng.sample(StandardNormal);
            let r2: Float = rng.sample(StandardNormal);
            *x = params.sigma_x * r1;
            *y = params.sigma_y * r2;
        }
        prtl
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn is_active(&self, i: usize) -> bool {
        self.state[i] > 0
    }

    pub fn n_active(&self) -> usize {
        self.state.iter().filter(|&&s| s > 0).count()
    }

    /// All per-particle arrays must line up with `x`.
    pub fn check_lengths(&self) -> Result<(), KickError> {
        let expected = self.x.len();
        for &(what, len) in [
            ("y", self.y.len()),
            ("px", self.px.len()),
            ("py", self.py.len()),
            ("q0", self.q0.len()),
            ("mass0", self.mass0.len()),
            ("chi", self.chi.len()),
            ("beta0", self.beta0.len()),
            ("gamma0", self.gamma0.len()),
            ("state", self.state.len()),
        ]
        .iter()
        {
            if len != expected {
                return Err(KickError::LengthMismatch {
                    what,
                    expected,
                    found: len,
                });
            }
        }
        Ok(())
    }

    /// Commits kicks computed by `ElectronLens::compute_kicks`.
    pub fn apply_kicks(&mut self, kicks: &[Kick]) -> Result<TrackReport, KickError> {
        if kicks.len() != self.len() {
            return Err(KickError::LengthMismatch {
                what: "kicks",
                expected: self.len(),
                found: kicks.len(),
            });
        }
        let mut report = TrackReport::default();
        for (px, py, state, kick) in izip!(&mut self.px, &mut self.py, &mut self.state, kicks) {
            match *kick {
                Kick::Apply { dpx, dpy } => {
                    *px += dpx;
                    *py += dpy;
                    report.kicked += 1;
                }
                Kick::Lost => {
                    *state = LOST_ON_FIELD_MAP;
                    report.lost += 1;
                }
                Kick::Skip => report.skipped += 1,
            }
        }
        Ok(report)
    }
}
