// src/pixel_format.rs

//! Pixel format descriptor: how color channels pack into a pixel, plus the
//! optional palette of indexed formats.
//!
//! Formats are validated when built and are immutable afterwards. A surface
//! holds its format behind an `Arc`, so changing a surface's format means
//! producing a new surface.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Bit depths a format may have.
pub const SUPPORTED_DEPTHS: [u8; 8] = [1, 2, 4, 8, 15, 16, 24, 32];

/// An RGB palette entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    fn distance(&self, other: &Color) -> u32 {
        let dr = i32::from(self.r) - i32::from(other.r);
        let dg = i32::from(self.g) - i32::from(other.g);
        let db = i32::from(self.b) - i32::from(other.b);
        (dr * dr + dg * dg + db * db) as u32
    }
}

/// Palette owned by an indexed format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    pub fn new(colors: Vec<Color>) -> Result<Self> {
        if colors.is_empty() || colors.len() > 256 {
            return Err(Error::InvalidFormat(format!(
                "palette must hold 1..=256 colors, got {}",
                colors.len()
            )));
        }
        Ok(Palette { colors })
    }

    /// Evenly spaced grey ramp for `1 << bits` entries.
    pub fn grayscale(bits: u8) -> Self {
        let entries = 1usize << bits.min(8);
        let step = if entries > 1 { 255 / (entries - 1) } else { 0 };
        let colors = (0..entries)
            .map(|i| {
                let v = (i * step) as u8;
                Color::new(v, v, v)
            })
            .collect();
        Palette { colors }
    }

    /// The 3-3-2 RGB cube used as the default 8-bit palette.
    pub fn rgb332() -> Self {
        let colors = (0..=255u8)
            .map(|i| {
                let r = i & 0xE0;
                let g = (i << 3) & 0xE0;
                let b = (i << 6) & 0xC0;
                Color::new(r | (r >> 3) | (r >> 6), g | (g >> 3) | (g >> 6), b | (b >> 2) | (b >> 4) | (b >> 6))
            })
            .collect();
        Palette { colors }
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Index of the entry closest to `color`.
    pub fn nearest(&self, color: Color) -> u8 {
        let mut best = 0usize;
        let mut best_distance = u32::MAX;
        for (index, entry) in self.colors.iter().enumerate() {
            let distance = entry.distance(&color);
            if distance < best_distance {
                best = index;
                best_distance = distance;
                if distance == 0 {
                    break;
                }
            }
        }
        best as u8
    }
}

/// Color channels of a direct-color pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
    Alpha,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Red, Channel::Green, Channel::Blue, Channel::Alpha];

    fn index(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
            Channel::Alpha => 3,
        }
    }
}

/// Mask, shift and loss of one channel.
///
/// `loss` is how many bits the channel drops relative to 8-bit precision,
/// `shift` is the position of its lowest bit. For a channel of `w` bits the
/// mask is always `((1 << w) - 1) << shift` with `loss = 8 - min(w, 8)`.
/// An unused channel has mask 0, shift 0 and loss 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelLayout {
    pub mask: u32,
    pub shift: u8,
    pub loss: u8,
}

impl Default for ChannelLayout {
    fn default() -> Self {
        ChannelLayout::UNUSED
    }
}

impl ChannelLayout {
    pub const UNUSED: ChannelLayout = ChannelLayout {
        mask: 0,
        shift: 0,
        loss: 8,
    };

    /// Derives shift and loss from a contiguous mask.
    pub fn from_mask(mask: u32) -> Result<Self> {
        if mask == 0 {
            return Ok(ChannelLayout::UNUSED);
        }
        let shift = mask.trailing_zeros();
        let width = (mask >> shift).trailing_ones();
        if contiguous_mask(width, shift) != Some(mask) {
            return Err(Error::InvalidFormat(format!(
                "channel mask {:#010x} is not contiguous",
                mask
            )));
        }
        Ok(ChannelLayout {
            mask,
            shift: shift as u8,
            loss: 8u32.saturating_sub(width) as u8,
        })
    }

    /// Number of bits the channel occupies.
    pub fn width(&self) -> u32 {
        self.mask.count_ones()
    }

    pub fn is_used(&self) -> bool {
        self.mask != 0
    }

    fn check_consistent(&self, channel: Channel) -> Result<()> {
        if self.mask == 0 {
            if self.shift != 0 || self.loss != 8 {
                return Err(Error::InvalidFormat(format!(
                    "unused {:?} channel must have shift 0 and loss 8 (got shift {}, loss {})",
                    channel, self.shift, self.loss
                )));
            }
            return Ok(());
        }
        let width = self.width();
        let expected_mask = contiguous_mask(width, u32::from(self.shift));
        let expected_loss = 8u32.saturating_sub(width) as u8;
        if expected_mask != Some(self.mask) || expected_loss != self.loss {
            return Err(Error::InvalidFormat(format!(
                "{:?} channel mask {:#010x} disagrees with shift {} / loss {}",
                channel, self.mask, self.shift, self.loss
            )));
        }
        Ok(())
    }

    /// Extracts the channel from `pixel`, expanded to 8 bits.
    fn expand(&self, pixel: u32) -> u8 {
        if self.mask == 0 {
            return 0;
        }
        let width = self.width();
        let value = (pixel & self.mask) >> self.shift;
        if width >= 8 {
            return (value >> (width - 8)) as u8;
        }
        let max = (1u32 << width) - 1;
        ((value * 255 + max / 2) / max) as u8
    }

    /// Packs an 8-bit channel value into position.
    fn pack(&self, value: u8) -> u32 {
        if self.mask == 0 {
            return 0;
        }
        let width = self.width();
        let bits = if width >= 8 {
            u32::from(value) << (width - 8)
        } else {
            u32::from(value) >> self.loss
        };
        (bits << self.shift) & self.mask
    }
}

fn contiguous_mask(width: u32, shift: u32) -> Option<u32> {
    if width == 0 || width + shift > 32 {
        return None;
    }
    let ones = ((1u64 << width) - 1) as u32;
    Some(ones << shift)
}

/// Describes how a pixel's bits map to color channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelFormat {
    bits_per_pixel: u8,
    bytes_per_pixel: u8,
    channels: [ChannelLayout; 4],
    color_key: Option<u32>,
    alpha: u8,
    palette: Option<Palette>,
}

impl PixelFormat {
    /// Builds a format from channel masks, deriving shifts and losses.
    ///
    /// Indexed formats (every mask zero, depth <= 8) get a default palette.
    pub fn from_masks(bits_per_pixel: u8, rmask: u32, gmask: u32, bmask: u32, amask: u32) -> Result<Self> {
        let channels = [
            ChannelLayout::from_mask(rmask)?,
            ChannelLayout::from_mask(gmask)?,
            ChannelLayout::from_mask(bmask)?,
            ChannelLayout::from_mask(amask)?,
        ];
        Self::from_parts(bits_per_pixel, channels, None)
    }

    /// Builds a format from fully specified channel triplets, checking that
    /// every triplet is self-consistent.
    pub fn from_parts(
        bits_per_pixel: u8,
        channels: [ChannelLayout; 4],
        palette: Option<Palette>,
    ) -> Result<Self> {
        if !SUPPORTED_DEPTHS.contains(&bits_per_pixel) {
            return Err(Error::InvalidFormat(format!(
                "unsupported depth {} (expected one of {:?})",
                bits_per_pixel, SUPPORTED_DEPTHS
            )));
        }
        for channel in Channel::ALL {
            channels[channel.index()].check_consistent(channel)?;
        }

        let mut union = 0u32;
        for (i, layout) in channels.iter().enumerate() {
            if union & layout.mask != 0 {
                return Err(Error::InvalidFormat(format!(
                    "{:?} channel mask {:#010x} overlaps another channel",
                    Channel::ALL[i],
                    layout.mask
                )));
            }
            union |= layout.mask;
        }
        if bits_per_pixel < 32 && union >> bits_per_pixel != 0 {
            return Err(Error::InvalidFormat(format!(
                "channel masks {:#010x} do not fit in {} bits",
                union, bits_per_pixel
            )));
        }

        let indexed = union == 0;
        if indexed && bits_per_pixel > 8 {
            return Err(Error::InvalidFormat(format!(
                "{}-bit formats need channel masks",
                bits_per_pixel
            )));
        }
        if !indexed && bits_per_pixel < 8 {
            return Err(Error::InvalidFormat(format!(
                "{}-bit formats must be indexed",
                bits_per_pixel
            )));
        }

        let palette = match (indexed, palette) {
            (false, Some(_)) => {
                return Err(Error::InvalidFormat(
                    "palettes are only valid on indexed formats".to_string(),
                ))
            }
            (false, None) => None,
            (true, Some(palette)) => {
                check_palette_fits(&palette, bits_per_pixel)?;
                Some(palette)
            }
            (true, None) => Some(default_palette(bits_per_pixel)),
        };

        Ok(PixelFormat {
            bits_per_pixel,
            bytes_per_pixel: bits_per_pixel.div_ceil(8),
            channels,
            color_key: None,
            alpha: u8::MAX,
            palette,
        })
    }

    /// Standard format for a display depth.
    pub fn for_depth(bits_per_pixel: u8) -> Result<Self> {
        match bits_per_pixel {
            1 | 2 | 4 | 8 => Self::from_masks(bits_per_pixel, 0, 0, 0, 0),
            15 => Self::from_masks(15, 0x7C00, 0x03E0, 0x001F, 0),
            16 => Self::from_masks(16, 0xF800, 0x07E0, 0x001F, 0),
            24 | 32 => Self::from_masks(bits_per_pixel, 0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0),
            other => Err(Error::InvalidFormat(format!("unsupported depth {}", other))),
        }
    }

    /// 32-bit format with an 8-bit alpha channel in the top byte.
    pub fn argb8888() -> Self {
        Self {
            bits_per_pixel: 32,
            bytes_per_pixel: 4,
            channels: [
                ChannelLayout { mask: 0x00FF_0000, shift: 16, loss: 0 },
                ChannelLayout { mask: 0x0000_FF00, shift: 8, loss: 0 },
                ChannelLayout { mask: 0x0000_00FF, shift: 0, loss: 0 },
                ChannelLayout { mask: 0xFF00_0000, shift: 24, loss: 0 },
            ],
            color_key: None,
            alpha: u8::MAX,
            palette: None,
        }
    }

    /// Returns a copy with a transparent color key.
    pub fn with_color_key(mut self, key: u32) -> Result<Self> {
        if self.bits_per_pixel < 32 && key >> self.bits_per_pixel != 0 {
            return Err(Error::InvalidFormat(format!(
                "color key {:#x} does not fit in {} bits",
                key, self.bits_per_pixel
            )));
        }
        self.color_key = Some(key);
        Ok(self)
    }

    /// Returns a copy with a per-surface alpha value.
    pub fn with_alpha(mut self, alpha: u8) -> Self {
        self.alpha = alpha;
        self
    }

    /// Returns a copy with `palette` replacing the current one.
    pub fn with_palette(mut self, palette: Palette) -> Result<Self> {
        if !self.is_indexed() {
            return Err(Error::InvalidFormat(
                "palettes are only valid on indexed formats".to_string(),
            ));
        }
        check_palette_fits(&palette, self.bits_per_pixel)?;
        self.palette = Some(palette);
        Ok(self)
    }

    pub fn bits_per_pixel(&self) -> u8 {
        self.bits_per_pixel
    }

    pub fn bytes_per_pixel(&self) -> u8 {
        self.bytes_per_pixel
    }

    pub fn channel(&self, channel: Channel) -> ChannelLayout {
        self.channels[channel.index()]
    }

    pub fn mask(&self, channel: Channel) -> u32 {
        self.channel(channel).mask
    }

    pub fn shift(&self, channel: Channel) -> u8 {
        self.channel(channel).shift
    }

    pub fn loss(&self, channel: Channel) -> u8 {
        self.channel(channel).loss
    }

    pub fn color_key(&self) -> Option<u32> {
        self.color_key
    }

    pub fn alpha(&self) -> u8 {
        self.alpha
    }

    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }

    pub fn is_indexed(&self) -> bool {
        self.channels.iter().all(|layout| !layout.is_used())
    }

    pub fn has_alpha(&self) -> bool {
        self.channel(Channel::Alpha).is_used()
    }

    /// Packs an opaque color into a pixel value.
    pub fn map_rgb(&self, r: u8, g: u8, b: u8) -> u32 {
        self.map_rgba(r, g, b, u8::MAX)
    }

    /// Packs a color into a pixel value. Indexed formats return the nearest
    /// palette index and ignore alpha.
    pub fn map_rgba(&self, r: u8, g: u8, b: u8, a: u8) -> u32 {
        if let Some(palette) = &self.palette {
            return u32::from(palette.nearest(Color::new(r, g, b)));
        }
        self.channel(Channel::Red).pack(r)
            | self.channel(Channel::Green).pack(g)
            | self.channel(Channel::Blue).pack(b)
            | self.channel(Channel::Alpha).pack(a)
    }

    /// Unpacks a pixel value into 8-bit RGBA. Formats without alpha report
    /// fully opaque pixels.
    pub fn get_rgba(&self, pixel: u32) -> (u8, u8, u8, u8) {
        if let Some(palette) = &self.palette {
            let color = palette
                .colors()
                .get(pixel as usize)
                .copied()
                .unwrap_or_default();
            return (color.r, color.g, color.b, u8::MAX);
        }
        let alpha = self.channel(Channel::Alpha);
        (
            self.channel(Channel::Red).expand(pixel),
            self.channel(Channel::Green).expand(pixel),
            self.channel(Channel::Blue).expand(pixel),
            if alpha.is_used() { alpha.expand(pixel) } else { u8::MAX },
        )
    }
}

fn default_palette(bits_per_pixel: u8) -> Palette {
    if bits_per_pixel == 8 {
        Palette::rgb332()
    } else {
        Palette::grayscale(bits_per_pixel)
    }
}

fn check_palette_fits(palette: &Palette, bits_per_pixel: u8) -> Result<()> {
    let capacity = 1usize << bits_per_pixel.min(8);
    if palette.len() > capacity {
        return Err(Error::InvalidFormat(format!(
            "palette of {} colors exceeds {}-bit index range",
            palette.len(),
            bits_per_pixel
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests;
