use std::rc::{Rc, Weak};

use ndarray::{ArrayView, IxDyn};

use crate::{
    ArrayElement, DataType,
    executor::allocation::AllocationStats,
};

pub fn size_for_shape(
    shape: &[usize],
    data_type: DataType,
) -> usize {
    shape.iter().product::<usize>() * data_type.size_in_bytes()
}

/// Host-visible tensor value. Storage is 8-byte aligned so every supported
/// element type can be viewed through a typed slice.
pub struct Array {
    shape: Box<[usize]>,
    data_type: DataType,
    storage: Vec<u64>,
    byte_length: usize,
    stats: Weak<AllocationStats>,
}

impl Array {
    pub fn zeros(
        shape: &[usize],
        data_type: DataType,
    ) -> Self {
        let byte_length = size_for_shape(shape, data_type);
        Self {
            shape: shape.into(),
            data_type,
            storage: vec![0u64; byte_length.div_ceil(8)],
            byte_length,
            stats: Weak::new(),
        }
    }

    /// Creates a zeroed array whose lifetime is reported to `stats`. Executors
    /// use this for everything they hand out so callers can audit that every
    /// allocation is eventually released.
    pub fn tracked(
        shape: &[usize],
        data_type: DataType,
        stats: &Rc<AllocationStats>,
    ) -> Self {
        let mut array = Self::zeros(shape, data_type);
        stats.record_allocation(array.byte_length);
        array.stats = Rc::downgrade(stats);
        array
    }

    pub fn from_slice<T: ArrayElement>(
        shape: &[usize],
        values: &[T],
    ) -> Self {
        let mut array = Self::zeros(shape, T::data_type());
        array.copy_from_slice(values);
        array
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn size(&self) -> usize {
        self.byte_length
    }

    fn validate_element_type<T: ArrayElement>(&self) {
        assert_eq!(
            T::data_type(),
            self.data_type,
            "Invalid data type, expected {:?}, actual {:?}",
            T::data_type(),
            self.data_type
        );
    }

    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.storage)[..self.byte_length]
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut(&mut self.storage)[..self.byte_length]
    }

    pub fn as_slice<T: ArrayElement>(&self) -> &[T] {
        self.validate_element_type::<T>();
        bytemuck::cast_slice(self.as_bytes())
    }

    pub fn as_slice_mut<T: ArrayElement>(&mut self) -> &mut [T] {
        self.validate_element_type::<T>();
        bytemuck::cast_slice_mut(self.as_bytes_mut())
    }

    pub fn as_view<T: ArrayElement>(&self) -> ArrayView<'_, T, IxDyn> {
        ArrayView::from_shape(IxDyn(self.shape()), self.as_slice::<T>())
            .expect("Failed to create array view")
    }

    pub fn copy_from_slice<T: ArrayElement>(
        &mut self,
        values: &[T],
    ) {
        assert_eq!(values.len(), self.num_elements());
        self.as_slice_mut::<T>().copy_from_slice(values);
    }

    pub fn item<T: ArrayElement>(&self) -> T {
        assert_eq!(self.num_elements(), 1);
        self.as_slice::<T>()[0]
    }
}

impl Drop for Array {
    fn drop(&mut self) {
        if let Some(stats) = self.stats.upgrade() {
            stats.record_release(self.byte_length);
        }
    }
}
