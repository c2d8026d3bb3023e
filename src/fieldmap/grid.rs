use crate::error::KickError;
use crate::Float;
use serde::Deserialize;
use std::fmt;

// Coordinates within this many cells of the edge count as on the edge, so
// that rounding in `origin + i * step` cannot push the last node off the grid.
const EDGE_TOL: Float = 1e-9;

// A range has to be a whole number of steps up to this many cells.
const STEP_TOL: Float = 1e-6;

// Largest node count an axis built from a range may have.
const MAX_NODES: usize = 1 << 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        write!(f, "{}", name)
    }
}

/// What the locator does with a coordinate that falls outside the grid.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Refuse the lookup.
    Error,
    /// Pull the coordinate back onto the nearest edge of the grid. A NaN
    /// coordinate has no nearest edge and is refused like under `FlagLost`.
    Clamp,
    /// Refuse the lookup, and let the caller mark the particle as lost.
    FlagLost,
}

impl Default for BoundaryPolicy {
    fn default() -> BoundaryPolicy {
        BoundaryPolicy::FlagLost
    }
}

/// A coordinate that could not be placed on the grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutOfGrid {
    pub axis: Axis,
    pub coord: Float,
}

/// One regular axis: nodes at `origin + i * step` for `i` in `0..n`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridAxis {
    pub origin: Float,
    pub step: Float,
    pub n: usize,
}

impl GridAxis {
    pub fn new(axis: Axis, origin: Float, step: Float, n: usize) -> Result<GridAxis, KickError> {
        let invalid = |reason: String| KickError::InvalidAxis { axis, reason };
        if n == 0 {
            return Err(invalid("axis needs at least one node".into()));
        }
        if !origin.is_finite() {
            return Err(invalid(format!("origin {} is not finite", origin)));
        }
        if !(step > 0.0) || !step.is_finite() {
            return Err(invalid(format!("cell size {} must be positive", step)));
        }
        Ok(GridAxis { origin, step, n })
    }

    /// `n` equispaced nodes from `min` to `max`, both included.
    pub fn from_range_n(axis: Axis, min: Float, max: Float, n: usize) -> Result<GridAxis, KickError> {
        if n < 2 {
            return Err(KickError::InvalidAxis {
                axis,
                reason: format!("a range needs at least 2 nodes, got {}", n),
            });
        }
        GridAxis::new(axis, min, (max - min) / (n - 1) as Float, n)
    }

    /// Nodes from `min` to `max` spaced by `step`. The range has to hold a
    /// whole number of steps, so the last node lands on `max`.
    pub fn from_range_step(
        axis: Axis,
        min: Float,
        max: Float,
        step: Float,
    ) -> Result<GridAxis, KickError> {
        let invalid = |reason: String| KickError::InvalidAxis { axis, reason };
        if !(step > 0.0) || !(max > min) {
            return Err(invalid(format!(
                "cannot cover [{}, {}] with step {}",
                min, max, step
            )));
        }
        let cells = (max - min) / step;
        if !cells.is_finite() || cells >= MAX_NODES as Float {
            return Err(invalid(format!(
                "[{}, {}] with step {} needs more than {} nodes",
                min, max, step, MAX_NODES
            )));
        }
        let whole = cells.round();
        if (cells - whole).abs() > STEP_TOL {
            return Err(invalid(format!(
                "[{}, {}] is not a whole number of steps {}",
                min, max, step
            )));
        }
        let n = (whole as usize)
            .checked_add(1)
            .ok_or_else(|| invalid(format!("too many nodes in [{}, {}]", min, max)))?;
        GridAxis::new(axis, min, step, n)
    }

    /// Takes explicit node positions, which have to be equispaced.
    pub fn from_nodes(axis: Axis, nodes: &[Float]) -> Result<GridAxis, KickError> {
        if nodes.len() < 2 {
            return Err(KickError::InvalidAxis {
                axis,
                reason: format!("need at least 2 nodes, got {}", nodes.len()),
            });
        }
        if let Some(i) = nodes.iter().position(|v| !v.is_finite()) {
            return Err(KickError::InvalidAxis {
                axis,
                reason: format!("node {} is {}", i, nodes[i]),
            });
        }
        let step = nodes[1] - nodes[0];
        for (i, pair) in nodes.windows(2).enumerate() {
            let this_step = pair[1] - pair[0];
            if (this_step - step).abs() > 1e-6 * step.abs() {
                return Err(KickError::InvalidAxis {
                    axis,
                    reason: format!("nodes are not equispaced at node {}", i + 1),
                });
            }
        }
        GridAxis::new(axis, nodes[0], step, nodes.len())
    }

    /// A single-node axis. Every coordinate maps onto its node.
    pub fn degenerate(at: Float) -> GridAxis {
        GridAxis {
            origin: at,
            step: 1.0,
            n: 1,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.n == 1
    }

    pub fn max(&self) -> Float {
        self.origin + (self.n - 1) as Float * self.step
    }

    pub fn node(&self, i: usize) -> Float {
        self.origin + i as Float * self.step
    }
}

/// How a grid axis is written in a config file. Exactly one of the
/// combinations `range + n`, `range + step` or `nodes` is expected.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct AxisConfig {
    pub range: Option<[Float; 2]>,
    pub n: Option<usize>,
    pub step: Option<Float>,
    pub nodes: Option<Vec<Float>>,
}

impl AxisConfig {
    pub fn to_axis(&self, axis: Axis) -> Result<GridAxis, KickError> {
        match (&self.range, self.n, self.step, &self.nodes) {
            (Some([min, max]), Some(n), None, None) => GridAxis::from_range_n(axis, *min, *max, n),
            (Some([min, max]), None, Some(step), None) => {
                GridAxis::from_range_step(axis, *min, *max, step)
            }
            (None, None, None, Some(nodes)) => GridAxis::from_nodes(axis, nodes),
            _ => Err(KickError::InvalidAxis {
                axis,
                reason: "give either range and n, range and step, or nodes".into(),
            }),
        }
    }
}

/// Base node and fractional position inside the enclosing cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IndicesAndWeights {
    pub ix: usize,
    pub iy: usize,
    pub iz: usize,
    pub wx: Float,
    pub wy: Float,
    pub wz: Float,
}

/// Immutable description of a regular 3d sampling grid.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldGridDescriptor {
    axes: [GridAxis; 3],
    mirror: [bool; 3],
}

impl FieldGridDescriptor {
    pub fn new(x: GridAxis, y: GridAxis, z: GridAxis) -> FieldGridDescriptor {
        FieldGridDescriptor {
            axes: [x, y, z],
            mirror: [false; 3],
        }
    }

    /// A map of the transverse plane only: z is a single node at 0.
    pub fn transverse(x: GridAxis, y: GridAxis) -> FieldGridDescriptor {
        FieldGridDescriptor::new(x, y, GridAxis::degenerate(0.0))
    }

    /// Mirrored axes are looked up at `|coord|`, so a map stored for the
    /// non-negative half covers both halves.
    pub fn with_mirror(mut self, axis: Axis, mirror: bool) -> FieldGridDescriptor {
        self.mirror[axis as usize] = mirror;
        self
    }

    pub fn axis(&self, axis: Axis) -> &GridAxis {
        &self.axes[axis as usize]
    }

    pub fn is_mirrored(&self, axis: Axis) -> bool {
        self.mirror[axis as usize]
    }

    pub fn size(&self) -> [usize; 3] {
        [self.axes[0].n, self.axes[1].n, self.axes[2].n]
    }

    pub fn n_nodes(&self) -> usize {
        self.axes.iter().map(|a| a.n).product()
    }

    /// Position of node `(ix, iy, iz)`.
    pub fn node(&self, ix: usize, iy: usize, iz: usize) -> (Float, Float, Float) {
        (
            self.axes[0].node(ix),
            self.axes[1].node(iy),
            self.axes[2].node(iz),
        )
    }

    #[inline(always)]
    fn locate_axis(
        &self,
        axis: Axis,
        coord: Float,
        policy: BoundaryPolicy,
    ) -> Result<(usize, Float), OutOfGrid> {
        let a = &self.axes[axis as usize];
        if a.is_degenerate() {
            return Ok((0, 0.0));
        }
        let coord = if self.mirror[axis as usize] {
            coord.abs()
        } else {
            coord
        };
        let mut u = (coord - a.origin) / a.step;
        if u.is_nan() {
            return Err(OutOfGrid { axis, coord });
        }
        let last = (a.n - 1) as Float;
        if u < -EDGE_TOL || u > last + EDGE_TOL {
            match policy {
                BoundaryPolicy::Clamp => (),
                BoundaryPolicy::Error | BoundaryPolicy::FlagLost => {
                    return Err(OutOfGrid { axis, coord })
                }
            }
        }
        u = u.max(0.0).min(last);
        // A coordinate sitting on the last node belongs to the last cell,
        // with full weight on its upper corner.
        let i = (u.floor() as usize).min(a.n - 2);
        Ok((i, u - i as Float))
    }

    /// Finds the cell enclosing `(x, y, z)` and the position inside it.
    pub fn locate(
        &self,
        x: Float,
        y: Float,
        z: Float,
        policy: BoundaryPolicy,
    ) -> Result<IndicesAndWeights, OutOfGrid> {
        let (ix, wx) = self.locate_axis(Axis::X, x, policy)?;
        let (iy, wy) = self.locate_axis(Axis::Y, y, policy)?;
        let (iz, wz) = self.locate_axis(Axis::Z, z, policy)?;
        Ok(IndicesAndWeights {
            ix,
            iy,
            iz,
            wx,
            wy,
            wz,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_test_grid, E_TOL};

    #[test]
    fn axis_from_range_n() {
        let a = GridAxis::from_range_n(Axis::X, -1.0, 1.0, 5).unwrap();
        assert_eq!(a.n, 5);
        assert!((a.step - 0.5).abs() < E_TOL);
        assert!((a.max() - 1.0).abs() < E_TOL);
    }

    #[test]
    fn axis_from_range_step() {
        let a = GridAxis::from_range_step(Axis::Y, 0.0, 2.0, 0.25).unwrap();
        assert_eq!(a.n, 9);
        assert!((a.node(8) - 2.0).abs() < E_TOL);
    }

    #[test]
    fn axis_from_nodes() {
        let a = GridAxis::from_nodes(Axis::X, &[-0.5, 0.0, 0.5, 1.0]).unwrap();
        assert_eq!(a.n, 4);
        assert!((a.origin + 0.5).abs() < E_TOL);
        assert!((a.step - 0.5).abs() < E_TOL);

        let err = GridAxis::from_nodes(Axis::X, &[0.0, 1.0, 3.0]).unwrap_err();
        assert!(matches!(err, KickError::InvalidAxis { axis: Axis::X, .. }));
    }

    #[test]
    fn axis_from_nodes_rejects_non_finite() {
        for &bad in &[Float::NAN, Float::INFINITY] {
            let err = GridAxis::from_nodes(Axis::Y, &[0.0, 1.0, bad]).unwrap_err();
            assert!(matches!(err, KickError::InvalidAxis { axis: Axis::Y, .. }));
        }
        assert!(GridAxis::from_nodes(Axis::Y, &[Float::NAN, 1.0, 2.0]).is_err());
    }

    #[test]
    fn axis_from_range_step_needs_whole_steps() {
        // 2.5 steps would put the last node past the range
        let err = GridAxis::from_range_step(Axis::X, 0.0, 1.0, 0.4).unwrap_err();
        assert!(matches!(err, KickError::InvalidAxis { axis: Axis::X, .. }));
        // rounding noise in the quotient is fine
        let a = GridAxis::from_range_step(Axis::X, -5e-3, 5e-3, 1e-4).unwrap();
        assert_eq!(a.n, 101);
        assert!((a.max() - 5e-3).abs() < E_TOL);
    }

    #[test]
    fn axis_from_range_step_rejects_huge_counts() {
        for &(max, step) in &[(1e30, 1e-30), (1.0, 1e-12), (Float::INFINITY, 1.0)] {
            let err = GridAxis::from_range_step(Axis::Z, 0.0, max, step).unwrap_err();
            assert!(matches!(err, KickError::InvalidAxis { axis: Axis::Z, .. }));
        }
    }

    #[test]
    fn axis_rejects_bad_input() {
        assert!(GridAxis::new(Axis::X, 0.0, 0.0, 3).is_err());
        assert!(GridAxis::new(Axis::X, 0.0, -1.0, 3).is_err());
        assert!(GridAxis::new(Axis::X, 0.0, 1.0, 0).is_err());
        assert!(GridAxis::from_range_n(Axis::X, 0.0, 1.0, 1).is_err());
        assert!(GridAxis::from_range_n(Axis::X, 1.0, 0.0, 3).is_err());
        assert!(GridAxis::from_range_step(Axis::X, 0.0, 1.0, 0.0).is_err());
    }

    #[test]
    fn axis_config_combinations() {
        let cfg: AxisConfig = toml::from_str("range = [-1.0, 1.0]\nn = 3").unwrap();
        assert_eq!(cfg.to_axis(Axis::X).unwrap().n, 3);
        let cfg: AxisConfig = toml::from_str("range = [-1.0, 1.0]\nstep = 0.5").unwrap();
        assert_eq!(cfg.to_axis(Axis::X).unwrap().n, 5);
        let cfg: AxisConfig = toml::from_str("nodes = [0.0, 0.1, 0.2]").unwrap();
        assert_eq!(cfg.to_axis(Axis::X).unwrap().n, 3);
        let cfg: AxisConfig = toml::from_str("range = [-1.0, 1.0]\nn = 3\nstep = 0.5").unwrap();
        assert!(cfg.to_axis(Axis::X).is_err());
    }

    #[test]
    fn locate_inside() {
        // x, y in [-1, 1] with 5 nodes each: step 0.5
        let grid = build_test_grid();
        let iw = grid
            .locate(-0.25, 0.6, 0.0, BoundaryPolicy::Error)
            .unwrap();
        assert_eq!(iw.ix, 1);
        assert_eq!(iw.iy, 3);
        assert_eq!(iw.iz, 0);
        assert!((iw.wx - 0.5).abs() < E_TOL);
        assert!((iw.wy - 0.2).abs() < E_TOL);
        assert_eq!(iw.wz, 0.0);
    }

    #[test]
    fn locate_upper_edge_stays_in_last_cell() {
        let grid = build_test_grid();
        let iw = grid.locate(1.0, 1.0, 0.0, BoundaryPolicy::Error).unwrap();
        assert_eq!(iw.ix, 3);
        assert_eq!(iw.iy, 3);
        assert!((iw.wx - 1.0).abs() < E_TOL);
        assert!((iw.wy - 1.0).abs() < E_TOL);
    }

    #[test]
    fn locate_lower_edge() {
        let grid = build_test_grid();
        let iw = grid.locate(-1.0, -1.0, 0.0, BoundaryPolicy::Error).unwrap();
        assert_eq!((iw.ix, iw.iy), (0, 0));
        assert_eq!((iw.wx, iw.wy), (0.0, 0.0));
    }

    #[test]
    fn locate_outside() {
        let grid = build_test_grid();
        for &policy in &[BoundaryPolicy::Error, BoundaryPolicy::FlagLost] {
            let err = grid.locate(0.0, 1.5, 0.0, policy).unwrap_err();
            assert_eq!(err.axis, Axis::Y);
            assert_eq!(err.coord, 1.5);
        }
        // NaN cannot be clamped
        let err = grid
            .locate(Float::NAN, 0.0, 0.0, BoundaryPolicy::Clamp)
            .unwrap_err();
        assert_eq!(err.axis, Axis::X);
    }

    #[test]
    fn locate_clamped() {
        let grid = build_test_grid();
        let iw = grid.locate(-3.0, 7.0, 0.0, BoundaryPolicy::Clamp).unwrap();
        assert_eq!((iw.ix, iw.iy), (0, 3));
        assert_eq!(iw.wx, 0.0);
        assert!((iw.wy - 1.0).abs() < E_TOL);
    }

    #[test]
    fn degenerate_axis_ignores_coordinate() {
        let grid = build_test_grid();
        let iw = grid.locate(0.0, 0.0, 42.0, BoundaryPolicy::Error).unwrap();
        assert_eq!((iw.iz, iw.wz), (0, 0.0));
    }

    #[test]
    fn mirrored_axis() {
        let x = GridAxis::from_range_n(Axis::X, 0.0, 1.0, 3).unwrap();
        let y = GridAxis::from_range_n(Axis::Y, -1.0, 1.0, 3).unwrap();
        let grid = FieldGridDescriptor::transverse(x, y).with_mirror(Axis::X, true);
        let pos = grid.locate(0.75, 0.0, 0.0, BoundaryPolicy::Error).unwrap();
        let neg = grid.locate(-0.75, 0.0, 0.0, BoundaryPolicy::Error).unwrap();
        assert_eq!(pos, neg);
        assert!(grid.is_mirrored(Axis::X));
        assert!(!grid.is_mirrored(Axis::Y));
    }
}
