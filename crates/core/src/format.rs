use std::{fmt, num::NonZeroU32, str::FromStr};

/// Four-character code describing a pixel/stream format.
///
/// # Example
/// ```rust
/// use burnin_core::prelude::FourCc;
///
/// let fcc = FourCc::new(*b"YU12");
/// assert_eq!(fcc.to_string(), "YU12");
/// assert!(fcc.is_yuv420_class());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc([u8; 4]);

impl FourCc {
    /// Planar Y, U, V (libcamera `YUV420`).
    pub const YU12: FourCc = FourCc(*b"YU12");
    /// Planar Y, U, V under its V4L2/ffmpeg name.
    pub const I420: FourCc = FourCc(*b"I420");
    /// Planar Y, V, U.
    pub const YV12: FourCc = FourCc(*b"YV12");
    /// Y plane followed by interleaved UV.
    pub const NV12: FourCc = FourCc(*b"NV12");
    /// Y plane followed by interleaved VU.
    pub const NV21: FourCc = FourCc(*b"NV21");
    /// Single 8-bit luma plane.
    pub const GREY: FourCc = FourCc(*b"GREY");
    /// Packed 24-bit RGB.
    pub const RGB24: FourCc = FourCc(*b"RG24");

    /// Construct from raw bytes.
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Little-endian u32 encoding.
    pub fn to_u32(self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    /// Try to convert to a printable string.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// True for 4:2:0 layouts whose first plane is a full-resolution 8-bit luma image.
    pub fn is_yuv420_class(self) -> bool {
        matches!(
            self,
            FourCc::YU12 | FourCc::I420 | FourCc::YV12 | FourCc::NV12 | FourCc::NV21
        )
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(s) = self.as_str() {
            write!(f, "{s}")
        } else {
            write!(f, "0x{:08x}", self.to_u32())
        }
    }
}

impl FromStr for FourCc {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 4 {
            return Err("fourcc must be four ASCII bytes".into());
        }
        let mut arr = [0u8; 4];
        arr.copy_from_slice(bytes);
        Ok(FourCc(arr))
    }
}

/// Resolution of a frame.
///
/// # Example
/// ```rust
/// use burnin_core::prelude::Resolution;
///
/// let res = Resolution::new(1920, 1080).unwrap();
/// assert_eq!(res.width.get(), 1920);
/// assert!(Resolution::new(0, 1080).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Resolution {
    /// Width in pixels (non-zero).
    pub width: NonZeroU32,
    /// Height in pixels (non-zero).
    pub height: NonZeroU32,
}

impl Resolution {
    /// Create a resolution, returning `None` if width or height are zero.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        Some(Self {
            width: NonZeroU32::new(width)?,
            height: NonZeroU32::new(height)?,
        })
    }

    /// Chroma plane size for 4:2:0 subsampling (rounded up).
    pub fn chroma420(&self) -> (usize, usize) {
        (
            (self.width.get() as usize).div_ceil(2),
            (self.height.get() as usize).div_ceil(2),
        )
    }
}

/// Basic color space hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColorSpace {
    /// Standard sRGB / sYCC (full range).
    Srgb,
    /// Rec. 709.
    Bt709,
    /// Rec. 2020.
    Bt2020,
    /// Unspecified/unknown.
    #[default]
    Unknown,
}

/// Media format including code and geometry.
///
/// # Example
/// ```rust
/// use burnin_core::prelude::{ColorSpace, FourCc, MediaFormat, Resolution};
///
/// let res = Resolution::new(1920, 1080).unwrap();
/// let fmt = MediaFormat::new(FourCc::YU12, res, ColorSpace::Bt709);
/// assert_eq!(fmt.code.to_string(), "YU12");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaFormat {
    /// FourCc code describing pixel layout.
    pub code: FourCc,
    /// Resolution of the frame.
    pub resolution: Resolution,
    /// Color space hint.
    pub color: ColorSpace,
}

impl MediaFormat {
    /// Build a new format.
    pub fn new(code: FourCc, resolution: Resolution, color: ColorSpace) -> Self {
        Self {
            code,
            resolution,
            color,
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for FourCc {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let encoded = self.as_str().unwrap_or("FFFF");
        serializer.serialize_str(encoded)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for FourCc {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        FourCc::from_str(&raw).map_err(serde::de::Error::custom)
    }
}
