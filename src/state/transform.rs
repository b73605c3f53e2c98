use std::cell::Cell;
use std::rc::Rc;

use glam::{Mat3, Mat4};

use super::{StateId, StateKind, impl_state_object};

/// A 4×4 matrix slot (model, view or projection).
#[derive(Debug)]
pub struct TransformState {
    id: StateId,
    matrix: Cell<Mat4>,
}

impl_state_object!(TransformState, StateKind::Transform);

impl TransformState {
    #[must_use]
    pub fn new(matrix: Mat4) -> Rc<Self> {
        Rc::new(Self {
            id: StateId::next(),
            matrix: Cell::new(matrix),
        })
    }

    #[must_use]
    pub fn identity() -> Rc<Self> {
        Self::new(Mat4::IDENTITY)
    }

    #[inline]
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        self.matrix.get()
    }

    #[inline]
    pub fn set_matrix(&self, matrix: Mat4) {
        self.matrix.set(matrix);
    }

    /// Inverse-transpose of the upper 3×3.
    #[must_use]
    pub fn normal_matrix(&self) -> Mat3 {
        Mat3::from_mat4(self.matrix.get()).inverse().transpose()
    }
}
