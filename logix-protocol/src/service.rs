//! CIP service codes used by the tag-access core

use std::fmt;

/// The CIP services issued against a Logix5000 controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipService {
    /// Plain read, used for template definition bytes.
    ReadData,
    /// Fragmented tag read.
    ReadDataFragmented,
    /// Single-request tag write.
    WriteData,
    /// Offset-tagged partial tag write.
    WriteDataFragmented,
    /// Paginated symbol listing.
    GetInstanceAttributeList,
    /// Template attribute read.
    GetAttributesList,
}

impl CipService {
    pub fn code(self) -> u8 {
        match self {
            CipService::ReadData => 0x4C,
            CipService::ReadDataFragmented => 0x52,
            CipService::WriteData => 0x4D,
            CipService::WriteDataFragmented => 0x53,
            CipService::GetInstanceAttributeList => 0x55,
            CipService::GetAttributesList => 0x03,
        }
    }
}

impl fmt::Display for CipService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}(0x{:02X})", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_codes() {
        assert_eq!(CipService::ReadDataFragmented.code(), 0x52);
        assert_eq!(CipService::WriteData.code(), 0x4D);
        assert_eq!(CipService::WriteDataFragmented.code(), 0x53);
        assert_eq!(CipService::GetInstanceAttributeList.code(), 0x55);
    }
}
