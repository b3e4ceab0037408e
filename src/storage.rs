//! Storage views and the byte-copy bridge.
//!
//! A [`StorageView`] describes how a caller's field is laid out in
//! memory: total size, element width, and the position of every element
//! inside the view's backing bytes, in the field's canonical layout
//! order. The archive engine never assumes anything about internal
//! strides; it only relies on the element order being stable between a
//! write and a later read of the same logical field shape.
//!
//! [`pack`] and [`unpack`] are the bridge between a (possibly strided)
//! view and the contiguous buffer the archive hashes and stores.

/// A field's strided in-memory layout.
///
/// Element `i` occupies `bytes_per_element` bytes starting at
/// `element_offset(i)` within [`bytes`](StorageView::bytes). Elements
/// may be non-contiguous (padded or strided layouts) but must not
/// overlap, and `num_elements() * bytes_per_element()` must equal
/// `size_in_bytes()`.
pub trait StorageView {
    /// Total bytes of the field (excluding any padding in the backing
    /// storage).
    fn size_in_bytes(&self) -> usize;

    /// Bytes per element; constant across the view.
    fn bytes_per_element(&self) -> usize;

    /// Backing bytes of the view.
    fn bytes(&self) -> &[u8];

    /// Mutable backing bytes of the view.
    fn bytes_mut(&mut self) -> &mut [u8];

    /// Byte offset of element `index` within the backing bytes.
    ///
    /// `index` follows the view's canonical layout order.
    fn element_offset(&self, index: usize) -> usize;

    /// Number of elements in the view.
    fn num_elements(&self) -> usize {
        self.size_in_bytes() / self.bytes_per_element()
    }

    /// Iterate the byte offsets of all elements in canonical order.
    fn element_offsets(&self) -> ElementOffsets<'_>
    where
        Self: Sized,
    {
        ElementOffsets { view: self, range: 0..self.num_elements() }
    }
}

/// Iterator over a view's element byte offsets in canonical order.
pub struct ElementOffsets<'a> {
    view: &'a dyn StorageView,
    range: std::ops::Range<usize>,
}

impl Iterator for ElementOffsets<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        self.range.next().map(|index| self.view.element_offset(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.range.size_hint()
    }
}

impl ExactSizeIterator for ElementOffsets<'_> {}

/// Copy the view's elements into a contiguous buffer.
///
/// `buf` must be exactly `view.size_in_bytes()` long; the write cursor
/// advances by `bytes_per_element` per element.
pub fn pack(view: &dyn StorageView, buf: &mut [u8]) {
    let bpe = view.bytes_per_element();
    debug_assert_eq!(buf.len(), view.size_in_bytes());

    let src = view.bytes();
    for (index, chunk) in buf.chunks_exact_mut(bpe).enumerate() {
        let offset = view.element_offset(index);
        chunk.copy_from_slice(&src[offset..offset + bpe]);
    }
}

/// Copy a contiguous buffer back into the view's elements.
///
/// The inverse of [`pack`]: `buf` must be exactly `view.size_in_bytes()`
/// long.
pub fn unpack(view: &mut dyn StorageView, buf: &[u8]) {
    let bpe = view.bytes_per_element();
    debug_assert_eq!(buf.len(), view.size_in_bytes());

    for (index, chunk) in buf.chunks_exact(bpe).enumerate() {
        let offset = view.element_offset(index);
        view.bytes_mut()[offset..offset + bpe].copy_from_slice(chunk);
    }
}

/// Dense view over a caller's byte slice.
///
/// Elements are laid out back to back; element `i` starts at
/// `i * bytes_per_element`.
pub struct ContiguousView<'a> {
    data: &'a mut [u8],
    bytes_per_element: usize,
}

impl<'a> ContiguousView<'a> {
    /// Create a dense view over `data`.
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` is not a multiple of `bytes_per_element`.
    pub fn new(data: &'a mut [u8], bytes_per_element: usize) -> Self {
        assert!(
            bytes_per_element > 0 && data.len() % bytes_per_element == 0,
            "view length {} is not a multiple of element width {}",
            data.len(),
            bytes_per_element
        );
        Self { data, bytes_per_element }
    }
}

impl StorageView for ContiguousView<'_> {
    fn size_in_bytes(&self) -> usize {
        self.data.len()
    }

    fn bytes_per_element(&self) -> usize {
        self.bytes_per_element
    }

    fn bytes(&self) -> &[u8] {
        self.data
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self.data
    }

    fn element_offset(&self, index: usize) -> usize {
        index * self.bytes_per_element
    }
}

/// Multi-dimensional view with per-dimension element strides.
///
/// Canonical order is column-major: the first dimension varies fastest.
/// Strides are expressed in elements, which allows padded layouts where
/// the backing slice is larger than the field itself.
pub struct StridedView<'a> {
    data: &'a mut [u8],
    dims: Vec<usize>,
    strides: Vec<usize>,
    bytes_per_element: usize,
}

impl<'a> StridedView<'a> {
    /// Create a strided view over `data`.
    ///
    /// `dims` gives the extent of each dimension and `strides` the
    /// element distance between consecutive indices of that dimension.
    ///
    /// # Panics
    ///
    /// Panics if `dims` and `strides` differ in length or the layout
    /// reaches outside `data`.
    pub fn new(
        data: &'a mut [u8],
        dims: &[usize],
        strides: &[usize],
        bytes_per_element: usize,
    ) -> Self {
        assert_eq!(dims.len(), strides.len(), "dims and strides must pair up");
        assert!(bytes_per_element > 0, "element width must be positive");

        let last: usize = dims
            .iter()
            .zip(strides)
            .map(|(dim, stride)| dim.saturating_sub(1) * stride)
            .sum();
        assert!(
            (last + 1) * bytes_per_element <= data.len(),
            "strided layout reaches outside the backing slice"
        );

        Self {
            data,
            dims: dims.to_vec(),
            strides: strides.to_vec(),
            bytes_per_element,
        }
    }
}

impl StorageView for StridedView<'_> {
    fn size_in_bytes(&self) -> usize {
        self.num_elements() * self.bytes_per_element
    }

    fn bytes_per_element(&self) -> usize {
        self.bytes_per_element
    }

    fn bytes(&self) -> &[u8] {
        self.data
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self.data
    }

    fn element_offset(&self, index: usize) -> usize {
        let mut remainder = index;
        let mut element = 0;
        for (dim, stride) in self.dims.iter().zip(&self.strides) {
            element += (remainder % dim) * stride;
            remainder /= dim;
        }
        element * self.bytes_per_element
    }

    fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_pack_is_identity() {
        let mut data: Vec<u8> = (0..16).collect();
        let view = ContiguousView::new(&mut data, 4);

        let mut buf = vec![0u8; 16];
        pack(&view, &mut buf);
        assert_eq!(buf, (0..16).collect::<Vec<u8>>());
    }

    #[test]
    fn test_contiguous_unpack_is_identity() {
        let mut data = vec![0u8; 8];
        let mut view = ContiguousView::new(&mut data, 2);

        unpack(&mut view, &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(data, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_strided_skips_padding() {
        // 2x2 field of 1-byte elements stored in a 3x2 padded buffer:
        // columns are 3 elements apart, the third row is padding.
        let mut data = vec![10, 11, 99, 12, 13, 99];
        let view = StridedView::new(&mut data, &[2, 2], &[1, 3], 1);

        assert_eq!(view.size_in_bytes(), 4);
        let mut buf = vec![0u8; 4];
        pack(&view, &mut buf);
        assert_eq!(buf, vec![10, 11, 12, 13]);
    }

    #[test]
    fn test_strided_unpack_leaves_padding_untouched() {
        let mut data = vec![0, 0, 99, 0, 0, 99];
        let mut view = StridedView::new(&mut data, &[2, 2], &[1, 3], 1);

        unpack(&mut view, &[10, 11, 12, 13]);
        assert_eq!(data, vec![10, 11, 99, 12, 13, 99]);
    }

    #[test]
    fn test_strided_round_trip_multi_byte_elements() {
        let mut source: Vec<u8> = (0..24).collect();
        let view = StridedView::new(&mut source, &[3, 2], &[1, 3], 4);
        let mut buf = vec![0u8; view.size_in_bytes()];
        pack(&view, &mut buf);

        let mut restored = vec![0u8; 24];
        let mut out = StridedView::new(&mut restored, &[3, 2], &[1, 3], 4);
        unpack(&mut out, &buf);
        assert_eq!(restored, (0..24).collect::<Vec<u8>>());
    }

    #[test]
    fn test_element_offsets_order() {
        let mut data = vec![0u8; 6];
        let view = StridedView::new(&mut data, &[2, 2], &[1, 3], 1);
        let offsets: Vec<usize> = view.element_offsets().collect();
        assert_eq!(offsets, vec![0, 1, 3, 4]);
    }

    #[test]
    #[should_panic(expected = "not a multiple")]
    fn test_contiguous_rejects_ragged_length() {
        let mut data = vec![0u8; 7];
        ContiguousView::new(&mut data, 4);
    }

    #[test]
    #[should_panic(expected = "outside the backing slice")]
    fn test_strided_rejects_overrun() {
        let mut data = vec![0u8; 4];
        StridedView::new(&mut data, &[2, 2], &[1, 3], 1);
    }
}
