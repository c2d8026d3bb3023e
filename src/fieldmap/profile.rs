use crate::consts::PhysConsts;
use crate::error::KickError;
use crate::Float;
const PI: Float = std::f64::consts::PI as Float;

/// Potential gradient of a round electron beam of unit line charge spread
/// uniformly over the annulus `inner_radius < r < outer_radius`.
/// An `inner_radius` of zero gives a solid beam.
///
/// Only used to give the driver something to interpolate; real maps come
/// from a Poisson solver upstream.
pub fn hollow_lens(
    inner_radius: Float,
    outer_radius: Float,
    consts: &PhysConsts,
) -> Result<impl Fn(Float, Float, Float) -> (Float, Float), KickError> {
    if !(inner_radius >= 0.0) {
        return Err(KickError::DegenerateElement {
            quantity: "inner_radius",
            value: inner_radius,
        });
    }
    if !(outer_radius > inner_radius) {
        return Err(KickError::DegenerateElement {
            quantity: "outer_radius",
            value: outer_radius,
        });
    }
    let r1sq = inner_radius * inner_radius;
    let r2sq = outer_radius * outer_radius;
    let norm = 1. / (2. * PI * consts.epsilon_0);

    Ok(move |x: Float, y: Float, _z: Float| {
        let rsq = x * x + y * y;
        // fraction of the charge enclosed in radius r
        let enclosed = if rsq <= r1sq {
            0.0
        } else if rsq < r2sq {
            (rsq - r1sq) / (r2sq - r1sq)
        } else {
            1.0
        };
        if enclosed == 0.0 {
            return (0.0, 0.0);
        }
        let c1 = -norm * enclosed / rsq;
        (c1 * x, c1 * y)
    })
}
