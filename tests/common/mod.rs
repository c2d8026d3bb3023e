use elens_rs::fieldmap::grid::{Axis, FieldGridDescriptor, GridAxis};
use elens_rs::fieldmap::FieldMap;
use elens_rs::lens::ElectronLens;
use elens_rs::prtls::Prtl;
use elens_rs::Float;

pub const MASS0: Float = 938272000.0;
pub const BETA0: Float = 0.9999;
pub const GAMMA0: Float = 70.0;

pub fn scenario_grid() -> FieldGridDescriptor {
    // This sets up the small 3x3 map used across the integration tests:
    // x and y on [-1, 1] with a node every 1.0.
    let x = GridAxis::from_range_n(Axis::X, -1.0, 1.0, 3).unwrap();
    let y = GridAxis::from_range_n(Axis::Y, -1.0, 1.0, 3).unwrap();
    FieldGridDescriptor::transverse(x, y)
}

pub fn scenario_lens<F>(f: F) -> ElectronLens
where
    F: Fn(Float, Float, Float) -> (Float, Float),
{
    let map = FieldMap::from_fn(scenario_grid(), f);
    ElectronLens::new(1.0, 1.0, 1000.0, map).unwrap()
}

pub fn scenario_prtls(num: usize) -> Prtl {
    let mut prtls = Prtl::new(num, 1.0, MASS0, GAMMA0);
    // the reference beta is given, not derived from gamma0
    for beta0 in prtls.beta0.iter_mut() {
        *beta0 = BETA0;
    }
    prtls
}
