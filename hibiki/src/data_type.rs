use bytemuck::Pod;
use half::f16;
use num_traits::NumCast;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
pub enum DataType {
    F16,
    F32,
    I32,
    U32,
    I64,
    U64,
}

impl DataType {
    pub fn size_in_bits(&self) -> usize {
        match self {
            DataType::F16 => 16,
            DataType::F32 => 32,
            DataType::I32 => 32,
            DataType::U32 => 32,
            DataType::I64 => 64,
            DataType::U64 => 64,
        }
    }

    pub fn size_in_bytes(&self) -> usize {
        self.size_in_bits().div_ceil(8)
    }
}

pub trait ArrayElement: NumCast + Pod {
    fn data_type() -> DataType;
}

impl ArrayElement for f16 {
    fn data_type() -> DataType {
        DataType::F16
    }
}

impl ArrayElement for f32 {
    fn data_type() -> DataType {
        DataType::F32
    }
}

impl ArrayElement for i32 {
    fn data_type() -> DataType {
        DataType::I32
    }
}

impl ArrayElement for u32 {
    fn data_type() -> DataType {
        DataType::U32
    }
}

impl ArrayElement for i64 {
    fn data_type() -> DataType {
        DataType::I64
    }
}

impl ArrayElement for u64 {
    fn data_type() -> DataType {
        DataType::U64
    }
}
