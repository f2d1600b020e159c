use smallvec::{SmallVec, smallvec};

use crate::format::{FourCc, MediaFormat};

/// Metadata associated with a frame.
///
/// # Example
/// ```rust
/// use burnin_core::prelude::{ColorSpace, FourCc, FrameMeta, MediaFormat, Resolution};
///
/// let res = Resolution::new(640, 480).unwrap();
/// let fmt = MediaFormat::new(FourCc::YU12, res, ColorSpace::Srgb);
/// let meta = FrameMeta::new(fmt);
/// assert_eq!(meta.format.resolution.width.get(), 640);
/// ```
#[derive(Debug, Clone)]
pub struct FrameMeta {
    /// Format describing layout and resolution.
    pub format: MediaFormat,
}

impl FrameMeta {
    pub fn new(format: MediaFormat) -> Self {
        Self { format }
    }
}

/// Plane layout inside the frame's backing buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
    /// Byte offset into the owning buffer.
    pub offset: usize,
    /// Length of the plane in bytes.
    pub len: usize,
    /// Stride in bytes.
    pub stride: usize,
}

impl PlaneLayout {
    fn range(&self) -> Option<std::ops::Range<usize>> {
        let end = self.offset.checked_add(self.len)?;
        Some(self.offset..end)
    }
}

/// Read-only plane view.
#[derive(Debug, Clone, Copy)]
pub struct Plane<'a> {
    data: &'a [u8],
    stride: usize,
}

impl<'a> Plane<'a> {
    /// Access the raw bytes.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Stride in bytes for this plane.
    pub fn stride(&self) -> usize {
        self.stride
    }
}

/// Mutable plane view.
///
/// The borrow is scoped to the owning [`FrameBuffer`]; it is released when the
/// view goes out of scope.
#[derive(Debug)]
pub struct PlaneMut<'a> {
    data: &'a mut [u8],
    stride: usize,
}

impl<'a> PlaneMut<'a> {
    /// Shared access to plane bytes.
    pub fn data(&self) -> &[u8] {
        self.data
    }

    /// Mutable access to plane bytes.
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.data
    }

    /// Stride in bytes for this plane.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Mutably borrow `width` bytes of row `y`, if the plane is long enough.
    pub fn row_mut(&mut self, y: usize, width: usize) -> Option<&mut [u8]> {
        let start = y.checked_mul(self.stride)?;
        self.data.get_mut(start..start.checked_add(width)?)
    }
}

/// Frame container: one contiguous backing buffer carved into planes.
///
/// Mirrors how camera pipelines hand out a single mapped buffer per stream
/// with per-plane offsets.
///
/// # Example
/// ```rust
/// use burnin_core::prelude::*;
///
/// let res = Resolution::new(4, 4).unwrap();
/// let fmt = MediaFormat::new(FourCc::YU12, res, ColorSpace::Bt709);
/// let frame = FrameBuffer::yuv420(FrameMeta::new(fmt), 8).unwrap();
/// assert_eq!(frame.planes().len(), 3);
/// assert_eq!(frame.planes()[0].stride(), 8);
/// assert_eq!(frame.planes()[0].data().len(), 32);
/// ```
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    meta: FrameMeta,
    data: Vec<u8>,
    layouts: SmallVec<[PlaneLayout; 3]>,
}

impl FrameBuffer {
    /// Wrap an existing buffer with explicit plane layouts.
    pub fn from_parts(
        meta: FrameMeta,
        data: Vec<u8>,
        layouts: SmallVec<[PlaneLayout; 3]>,
    ) -> Self {
        Self {
            meta,
            data,
            layouts,
        }
    }

    /// Allocate a zeroed 4:2:0 frame whose luma rows are `luma_stride` bytes apart.
    ///
    /// Returns `None` when the format is not YUV420-class or the stride is
    /// narrower than the frame.
    pub fn yuv420(meta: FrameMeta, luma_stride: usize) -> Option<Self> {
        let layouts = yuv420_layouts(meta.format, luma_stride)?;
        let total = layouts
            .iter()
            .map(|l| l.offset + l.len)
            .max()
            .unwrap_or(0);
        Some(Self {
            meta,
            data: vec![0; total],
            layouts,
        })
    }

    /// Metadata describing this frame.
    pub fn meta(&self) -> &FrameMeta {
        &self.meta
    }

    /// Plane views as borrowed slices.
    pub fn planes(&self) -> SmallVec<[Plane<'_>; 3]> {
        self.layouts
            .iter()
            .map(|layout| Plane {
                data: layout
                    .range()
                    .and_then(|r| self.data.get(r))
                    .unwrap_or(&[]),
                stride: layout.stride,
            })
            .collect()
    }

    /// Mutable view of a single plane; `None` when the index is out of range.
    ///
    /// A layout pointing past the end of the buffer yields an empty view so
    /// callers can report the geometry mismatch themselves.
    pub fn plane_mut(&mut self, index: usize) -> Option<PlaneMut<'_>> {
        let layout = *self.layouts.get(index)?;
        let data: &mut [u8] = match layout.range() {
            Some(range) if range.end <= self.data.len() => &mut self.data[range],
            _ => &mut [],
        };
        Some(PlaneMut {
            data,
            stride: layout.stride,
        })
    }
}

/// Plane layouts for a 4:2:0 frame stored back to back in one buffer.
///
/// Chroma strides are half the luma stride (rounded up), matching what
/// libcamera reports for `YUV420`.
///
/// # Example
/// ```rust
/// use burnin_core::prelude::*;
///
/// let res = Resolution::new(6, 4).unwrap();
/// let fmt = MediaFormat::new(FourCc::NV12, res, ColorSpace::Bt709);
/// let layouts = yuv420_layouts(fmt, 8).unwrap();
/// assert_eq!(layouts.len(), 2);
/// assert_eq!(layouts[1].offset, 32);
/// assert_eq!(layouts[1].len, 16);
/// ```
pub fn yuv420_layouts(format: MediaFormat, luma_stride: usize) -> Option<SmallVec<[PlaneLayout; 3]>> {
    let width = format.resolution.width.get() as usize;
    let height = format.resolution.height.get() as usize;
    if luma_stride < width {
        return None;
    }
    let luma_len = luma_stride.checked_mul(height)?;
    let (_, chroma_h) = format.resolution.chroma420();
    let luma = PlaneLayout {
        offset: 0,
        len: luma_len,
        stride: luma_stride,
    };
    match format.code {
        FourCc::YU12 | FourCc::I420 | FourCc::YV12 => {
            let c_stride = luma_stride.div_ceil(2);
            let c_len = c_stride.checked_mul(chroma_h)?;
            Some(smallvec![
                luma,
                PlaneLayout {
                    offset: luma_len,
                    len: c_len,
                    stride: c_stride,
                },
                PlaneLayout {
                    offset: luma_len + c_len,
                    len: c_len,
                    stride: c_stride,
                },
            ])
        }
        FourCc::NV12 | FourCc::NV21 => {
            let c_len = luma_stride.checked_mul(chroma_h)?;
            Some(smallvec![
                luma,
                PlaneLayout {
                    offset: luma_len,
                    len: c_len,
                    stride: luma_stride,
                },
            ])
        }
        _ => None,
    }
}
