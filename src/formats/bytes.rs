//! Bounds-checked little-endian reads over byte slices.

/// Offset-based reads that return `None` instead of panicking
pub trait LeBytes {
    fn u8_at(&self, offset: usize) -> Option<u8>;
    fn u16_at(&self, offset: usize) -> Option<u16>;
    fn u32_at(&self, offset: usize) -> Option<u32>;
    fn u64_at(&self, offset: usize) -> Option<u64>;
    fn slice_at(&self, offset: usize, len: usize) -> Option<&[u8]>;
    /// NUL-terminated UTF-8 string of at most `max_len` bytes
    fn cstr_at(&self, offset: usize, max_len: usize) -> Option<&str>;
}

impl LeBytes for [u8] {
    #[inline]
    fn u8_at(&self, offset: usize) -> Option<u8> {
        self.get(offset).copied()
    }

    #[inline]
    fn u16_at(&self, offset: usize) -> Option<u16> {
        Some(u16::from_le_bytes(self.slice_at(offset, 2)?.try_into().ok()?))
    }

    #[inline]
    fn u32_at(&self, offset: usize) -> Option<u32> {
        Some(u32::from_le_bytes(self.slice_at(offset, 4)?.try_into().ok()?))
    }

    #[inline]
    fn u64_at(&self, offset: usize) -> Option<u64> {
        Some(u64::from_le_bytes(self.slice_at(offset, 8)?.try_into().ok()?))
    }

    #[inline]
    fn slice_at(&self, offset: usize, len: usize) -> Option<&[u8]> {
        self.get(offset..offset.checked_add(len)?)
    }

    fn cstr_at(&self, offset: usize, max_len: usize) -> Option<&str> {
        let window = self.get(offset..offset.saturating_add(max_len).min(self.len()))?;
        let end = window.iter().position(|&b| b == 0).unwrap_or(window.len());
        std::str::from_utf8(&window[..end]).ok()
    }
}
