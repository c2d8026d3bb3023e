use crate::error::KickError;
use crate::fieldmap::grid::IndicesAndWeights;
use crate::Float;

pub struct Pos {
    pub ix: usize,
    pub iy: usize,
    pub iz: usize,
}

/// Shape and memory layout of a flattened 3d sample array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldDim {
    pub size: [usize; 3],
    pub strides: [usize; 3],
}

impl FieldDim {
    /// Default layout, x varies fastest.
    pub fn new(size: [usize; 3]) -> FieldDim {
        FieldDim {
            size,
            strides: [1, size[0], size[0] * size[1]],
        }
    }

    pub fn with_strides(size: [usize; 3], strides: [usize; 3]) -> FieldDim {
        FieldDim { size, strides }
    }

    #[inline(always)]
    pub fn get_index(&self, pos: Pos) -> usize {
        // Convenience method to get a position in the flat buffer.
        // With the default strides a 3x3 slab at iz = 0 looks like
        // this, with the 1D vec position in []
        // ----------------------------------
        // |   [0]    |   [1]    |   [2]    |
        // |  iy: 0   |  iy: 0   |  iy: 0   |
        // |  ix: 0   |  ix: 1   |  ix: 2   |
        // ----------------------------------
        // |   [3]    |   [4]    |   [5]    |
        // |  iy: 1   |  iy: 1   |  iy: 1   |
        // |  ix: 0   |  ix: 1   |  ix: 2   |
        // ----------------------------------
        // |   [6]    |   [7]    |   [8]    |
        // |  iy: 2   |  iy: 2   |  iy: 2   |
        // |  ix: 0   |  ix: 1   |  ix: 2   |
        // ----------------------------------
        // and the next iz slab starts at [9].

        if !cfg!(feature = "unchecked") {
            assert!(pos.ix < self.size[0]);
            assert!(pos.iy < self.size[1]);
            assert!(pos.iz < self.size[2]);
        }

        pos.ix * self.strides[0] + pos.iy * self.strides[1] + pos.iz * self.strides[2]
    }

    /// Smallest buffer length that holds every node of the layout.
    pub fn span(&self) -> usize {
        if self.size.iter().any(|&n| n == 0) {
            return 0;
        }
        self.get_index(Pos {
            ix: self.size[0] - 1,
            iy: self.size[1] - 1,
            iz: self.size[2] - 1,
        }) + 1
    }
}

/// Read-only view of one scalar quantity sampled on a grid.
#[derive(Clone, Copy, Debug)]
pub struct FieldBuffer<'a> {
    data: &'a [Float],
    dim: FieldDim,
}

impl<'a> FieldBuffer<'a> {
    pub fn new(data: &'a [Float], dim: FieldDim) -> Result<FieldBuffer<'a>, KickError> {
        let expected = dim.span();
        if data.len() < expected {
            return Err(KickError::BufferTooShort {
                expected,
                found: data.len(),
            });
        }
        Ok(FieldBuffer { data, dim })
    }

    /// For buffers whose length was already checked against `dim`.
    pub(crate) fn from_validated(data: &'a [Float], dim: FieldDim) -> FieldBuffer<'a> {
        debug_assert!(data.len() >= dim.span());
        FieldBuffer { data, dim }
    }

    pub fn dim(&self) -> &FieldDim {
        &self.dim
    }

    /// Sample at node `(ix, iy, iz)`. Panics when the node is outside the
    /// layout, with or without the `unchecked` feature.
    pub fn get(&self, ix: usize, iy: usize, iz: usize) -> Float {
        let size = &self.dim.size;
        assert!(
            ix < size[0] && iy < size[1] && iz < size[2],
            "node ({}, {}, {}) is outside a field of size {:?}",
            ix,
            iy,
            iz,
            size
        );
        self.data[self.dim.get_index(Pos { ix, iy, iz })]
    }

    #[inline(always)]
    fn corner(&self, ix: usize, iy: usize, iz: usize) -> Float {
        let ind = self.dim.get_index(Pos { ix, iy, iz });
        // get_index checks the position against the size unless the
        // unchecked feature is on, and the constructor checked the buffer
        // against the span.
        unsafe { *self.data.get_unchecked(ind) }
    }

    /// Trilinear interpolation inside the cell given by `iw`. With the
    /// `unchecked` feature, `iw` has to come from `locate` on the same grid.
    #[inline(always)]
    pub fn sample_trilinear(&self, iw: &IndicesAndWeights) -> Float {
        let size = &self.dim.size;
        // Upper corners fold back onto the base node on a single-node axis,
        // where the weight of the upper corner is zero anyway.
        let ix0 = iw.ix;
        let iy0 = iw.iy;
        let iz0 = iw.iz;
        let ix1 = (ix0 + 1).min(size[0] - 1);
        let iy1 = (iy0 + 1).min(size[1] - 1);
        let iz1 = (iz0 + 1).min(size[2] - 1);

        let (wx, wy, wz) = (iw.wx, iw.wy, iw.wz);
        // Corner weights, wABC with A, B, C the x, y, z offsets
        let w000 = (1. - wx) * (1. - wy) * (1. - wz);
        let w100 = wx * (1. - wy) * (1. - wz);
        let w010 = (1. - wx) * wy * (1. - wz);
        let w110 = wx * wy * (1. - wz);
        let w001 = (1. - wx) * (1. - wy) * wz;
        let w101 = wx * (1. - wy) * wz;
        let w011 = (1. - wx) * wy * wz;
        let w111 = wx * wy * wz;

        let mut val = w000 * self.corner(ix0, iy0, iz0);
        val += w100 * self.corner(ix1, iy0, iz0);
        val += w010 * self.corner(ix0, iy1, iz0);
        val += w110 * self.corner(ix1, iy1, iz0);
        val += w001 * self.corner(ix0, iy0, iz1);
        val += w101 * self.corner(ix1, iy0, iz1);
        val += w011 * self.corner(ix0, iy1, iz1);
        val += w111 * self.corner(ix1, iy1, iz1);
        val
    }
}
