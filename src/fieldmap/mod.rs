use crate::error::KickError;
use crate::{Float, PRTL_CHUNK_SIZE};
use rayon::prelude::*;

pub mod field;
pub mod grid;
pub mod profile;

use crate::fieldmap::field::{FieldBuffer, FieldDim, Pos};
use crate::fieldmap::grid::{BoundaryPolicy, FieldGridDescriptor, OutOfGrid};

/// The transverse gradient of the lens potential sampled on a grid.
/// Both components share the grid and the memory layout.
pub struct FieldMap {
    grid: FieldGridDescriptor,
    dim: FieldDim,
    dphi_dx: Vec<Float>,
    dphi_dy: Vec<Float>,
}

impl FieldMap {
    /// Wraps precomputed samples stored x fastest.
    pub fn new(
        grid: FieldGridDescriptor,
        dphi_dx: Vec<Float>,
        dphi_dy: Vec<Float>,
    ) -> Result<FieldMap, KickError> {
        let dim = FieldDim::new(grid.size());
        FieldMap::with_layout(grid, dim, dphi_dx, dphi_dy)
    }

    /// Wraps precomputed samples stored with an arbitrary layout.
    pub fn with_layout(
        grid: FieldGridDescriptor,
        dim: FieldDim,
        dphi_dx: Vec<Float>,
        dphi_dy: Vec<Float>,
    ) -> Result<FieldMap, KickError> {
        if dim.size != grid.size() {
            return Err(KickError::ShapeMismatch {
                expected: grid.size(),
                found: dim.size,
            });
        }
        // validate both buffers up front so the views below cannot fail
        FieldBuffer::new(&dphi_dx, dim)?;
        FieldBuffer::new(&dphi_dy, dim)?;
        Ok(FieldMap {
            grid,
            dim,
            dphi_dx,
            dphi_dy,
        })
    }

    /// Fills both buffers by evaluating `f(x, y, z) -> (dphi_dx, dphi_dy)`
    /// on every node of the grid.
    pub fn from_fn<F>(grid: FieldGridDescriptor, f: F) -> FieldMap
    where
        F: Fn(Float, Float, Float) -> (Float, Float),
    {
        let dim = FieldDim::new(grid.size());
        let [nx, ny, nz] = grid.size();
        let mut dphi_dx = vec![0.0; dim.span()];
        let mut dphi_dy = vec![0.0; dim.span()];
        for iz in 0..nz {
            for iy in 0..ny {
                for ix in 0..nx {
                    let (x, y, z) = grid.node(ix, iy, iz);
                    let ind = dim.get_index(Pos { ix, iy, iz });
                    let (gx, gy) = f(x, y, z);
                    dphi_dx[ind] = gx;
                    dphi_dy[ind] = gy;
                }
            }
        }
        FieldMap {
            grid,
            dim,
            dphi_dx,
            dphi_dy,
        }
    }

    pub fn grid(&self) -> &FieldGridDescriptor {
        &self.grid
    }

    pub fn dphi_dx(&self) -> FieldBuffer<'_> {
        FieldBuffer::from_validated(&self.dphi_dx, self.dim)
    }

    pub fn dphi_dy(&self) -> FieldBuffer<'_> {
        FieldBuffer::from_validated(&self.dphi_dy, self.dim)
    }

    /// Interpolated `(dphi_dx, dphi_dy)` at one point. `Ok(None)` when the
    /// point cannot be placed on the grid and the policy is not `Error`:
    /// off the grid under `FlagLost`, or a NaN coordinate under `Clamp`.
    pub fn gradients_at(
        &self,
        x: Float,
        y: Float,
        z: Float,
        policy: BoundaryPolicy,
    ) -> Result<Option<(Float, Float)>, OutOfGrid> {
        match self.grid.locate(x, y, z, policy) {
            Ok(iw) => Ok(Some((
                self.dphi_dx().sample_trilinear(&iw),
                self.dphi_dy().sample_trilinear(&iw),
            ))),
            Err(e) if policy == BoundaryPolicy::Error => Err(e),
            Err(_) => Ok(None),
        }
    }

    /// Interpolates both gradients at many points in parallel. Points off
    /// the grid give zeros unless the policy is `Error`.
    pub fn gradients_at_points(
        &self,
        xs: &[Float],
        ys: &[Float],
        zs: &[Float],
        policy: BoundaryPolicy,
    ) -> Result<(Vec<Float>, Vec<Float>), KickError> {
        for &(what, arr) in [("ys", ys), ("zs", zs)].iter() {
            if arr.len() != xs.len() {
                return Err(KickError::LengthMismatch {
                    what,
                    expected: xs.len(),
                    found: arr.len(),
                });
            }
        }
        let vals = (xs, ys, zs)
            .into_par_iter()
            .enumerate()
            .with_min_len(PRTL_CHUNK_SIZE)
            .map(|(index, (&x, &y, &z))| {
                self.gradients_at(x, y, z, policy)
                    .map(|g| g.unwrap_or((0.0, 0.0)))
                    .map_err(|OutOfGrid { axis, coord }| KickError::OutOfGrid {
                        index,
                        axis,
                        coord,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(vals.into_iter().unzip())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fieldmap::grid::{Axis, GridAxis};
    use crate::{build_test_grid, E_TOL};

    fn linear_map() -> FieldMap {
        FieldMap::from_fn(build_test_grid(), |x, y, _| {
            (3.0 * x - 2.0 * y + 1.0, 0.5 * x + 4.0 * y)
        })
    }

    #[test]
    fn from_fn_fills_nodes() {
        let map = linear_map();
        let (x, y, _) = map.grid().node(4, 1, 0);
        assert!((map.dphi_dx().get(4, 1, 0) - (3.0 * x - 2.0 * y + 1.0)).abs() < E_TOL);
        assert!((map.dphi_dy().get(4, 1, 0) - (0.5 * x + 4.0 * y)).abs() < E_TOL);
    }

    #[test]
    fn new_checks_buffer_length() {
        let grid = build_test_grid();
        let n = grid.n_nodes();
        assert!(FieldMap::new(grid.clone(), vec![0.0; n], vec![0.0; n]).is_ok());
        let err = FieldMap::new(grid, vec![0.0; n], vec![0.0; n - 1])
            .err()
            .unwrap();
        assert_eq!(
            err,
            KickError::BufferTooShort {
                expected: n,
                found: n - 1
            }
        );
    }

    #[test]
    fn gradients_follow_policy() {
        let map = linear_map();
        let g = map
            .gradients_at(0.3, -0.2, 0.0, BoundaryPolicy::Error)
            .unwrap()
            .unwrap();
        assert!((g.0 - (0.9 + 0.4 + 1.0)).abs() < E_TOL);
        assert!((g.1 - (0.15 - 0.8)).abs() < E_TOL);

        assert_eq!(
            map.gradients_at(2.0, 0.0, 0.0, BoundaryPolicy::FlagLost),
            Ok(None)
        );
        assert!(map
            .gradients_at(2.0, 0.0, 0.0, BoundaryPolicy::Error)
            .is_err());
        // clamp evaluates at the edge x = 1
        let g = map
            .gradients_at(2.0, 0.0, 0.0, BoundaryPolicy::Clamp)
            .unwrap()
            .unwrap();
        assert!((g.0 - 4.0).abs() < E_TOL);
    }

    #[test]
    fn nan_point_is_refused_not_clamped() {
        let map = linear_map();
        for &policy in &[BoundaryPolicy::Clamp, BoundaryPolicy::FlagLost] {
            assert_eq!(map.gradients_at(Float::NAN, 0.0, 0.0, policy), Ok(None));
        }
        assert!(map
            .gradients_at(0.0, Float::NAN, 0.0, BoundaryPolicy::Error)
            .is_err());
        let (gx, _) = map
            .gradients_at_points(&[0.0, Float::NAN], &[0.0; 2], &[0.0; 2], BoundaryPolicy::Clamp)
            .unwrap();
        assert!((gx[0] - 1.0).abs() < E_TOL);
        assert_eq!(gx[1], 0.0);
    }

    #[test]
    fn layout_shape_must_match_grid() {
        let x = GridAxis::from_range_n(Axis::X, 0.0, 1.0, 2).unwrap();
        let y = GridAxis::from_range_n(Axis::Y, 0.0, 1.0, 3).unwrap();
        let grid = FieldGridDescriptor::transverse(x, y);
        let err = FieldMap::with_layout(grid, FieldDim::new([3, 2, 1]), vec![0.0; 6], vec![0.0; 6])
            .err()
            .unwrap();
        assert_eq!(
            err,
            KickError::ShapeMismatch {
                expected: [2, 3, 1],
                found: [3, 2, 1]
            }
        );
        assert_eq!(
            err.to_string(),
            "field layout has shape [3, 2, 1], grid has shape [2, 3, 1]"
        );
    }

    #[test]
    fn gradients_at_points_zero_outside() {
        let map = linear_map();
        let xs = [0.0, 5.0, -0.5];
        let ys = [0.0, 0.0, 0.5];
        let zs = [0.0; 3];
        let (gx, gy) = map
            .gradients_at_points(&xs, &ys, &zs, BoundaryPolicy::FlagLost)
            .unwrap();
        assert!((gx[0] - 1.0).abs() < E_TOL);
        assert_eq!((gx[1], gy[1]), (0.0, 0.0));
        assert!((gx[2] - (-1.5 - 1.0 + 1.0)).abs() < E_TOL);
        assert!((gy[2] - (-0.25 + 2.0)).abs() < E_TOL);

        let err = map
            .gradients_at_points(&xs, &ys, &zs, BoundaryPolicy::Error)
            .unwrap_err();
        assert!(matches!(err, KickError::OutOfGrid { index: 1, axis: Axis::X, .. }));
    }

    #[test]
    fn gradients_at_points_checks_lengths() {
        let map = linear_map();
        let err = map
            .gradients_at_points(&[0.0, 0.1], &[0.0], &[0.0, 0.0], BoundaryPolicy::Clamp)
            .unwrap_err();
        assert_eq!(
            err,
            KickError::LengthMismatch {
                what: "ys",
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn full_3d_map() {
        let x = GridAxis::from_range_n(Axis::X, 0.0, 1.0, 3).unwrap();
        let y = GridAxis::from_range_n(Axis::Y, 0.0, 1.0, 3).unwrap();
        let z = GridAxis::from_range_n(Axis::Z, -1.0, 1.0, 11).unwrap();
        let grid = FieldGridDescriptor::new(x, y, z);
        let map = FieldMap::from_fn(grid, |x, y, z| (x + y + z, 2.0 * z));
        let g = map
            .gradients_at(0.2, 0.7, 0.33, BoundaryPolicy::Error)
            .unwrap()
            .unwrap();
        assert!((g.0 - 1.23).abs() < E_TOL);
        assert!((g.1 - 0.66).abs() < E_TOL);
    }
}
