/// Numeric element type of a `BoxSpace` (and of tensor placeholders).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DType {
    #[default]
    F32,
    F64,
    U8,
    U16,
    U32,
    I32,
    I64,
}

impl DType {
    pub fn is_integer(&self) -> bool {
        !matches!(self, DType::F32 | DType::F64)
    }

    pub fn bits(&self) -> u32 {
        match self {
            DType::U8 => 8,
            DType::U16 => 16,
            DType::F32 | DType::U32 | DType::I32 => 32,
            DType::F64 | DType::I64 => 64,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DType::F32 => "float32",
            DType::F64 => "float64",
            DType::U8 => "uint8",
            DType::U16 => "uint16",
            DType::U32 => "uint32",
            DType::I32 => "int32",
            DType::I64 => "int64",
        }
    }

    /// Smallest unsigned type able to hold `max`, or `None` if it needs more than 32 bits.
    pub fn smallest_unsigned_for(max: u64) -> Option<DType> {
        if max <= u8::MAX as u64 {
            Some(DType::U8)
        } else if max <= u16::MAX as u64 {
            Some(DType::U16)
        } else if max <= u32::MAX as u64 {
            Some(DType::U32)
        } else {
            None
        }
    }

    /// Representable range of the type, used to clamp infinite bounds of integer boxes.
    pub(crate) fn integer_range(&self) -> Option<(f64, f64)> {
        match self {
            DType::U8 => Some((0.0, u8::MAX as f64)),
            DType::U16 => Some((0.0, u16::MAX as f64)),
            DType::U32 => Some((0.0, u32::MAX as f64)),
            DType::I32 => Some((i32::MIN as f64, i32::MAX as f64)),
            DType::I64 => Some((i64::MIN as f64, i64::MAX as f64)),
            DType::F32 | DType::F64 => None,
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
