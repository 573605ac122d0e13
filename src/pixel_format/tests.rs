// src/pixel_format/tests.rs

use super::*;
use test_log::test;

fn masks_of(format: &PixelFormat) -> [u32; 4] {
    [
        format.mask(Channel::Red),
        format.mask(Channel::Green),
        format.mask(Channel::Blue),
        format.mask(Channel::Alpha),
    ]
}

const SWEEP_DEPTHS: [u8; 5] = [8, 15, 16, 24, 32];
const SWEEP_WIDTHS: [u32; 6] = [0, 1, 3, 5, 8, 10];

/// Every `(bpp, [r, g, b, a])` mask set built from the sweep widths, packed
/// from `start` upwards. With `overlap`, green starts on red's top bit.
fn sweep_candidates() -> Vec<(u8, [u32; 4])> {
    let mut candidates = Vec::new();
    for bpp in SWEEP_DEPTHS {
        for start in [0u32, 2] {
            for overlap in [false, true] {
                for r in SWEEP_WIDTHS {
                    for g in SWEEP_WIDTHS {
                        for b in SWEEP_WIDTHS {
                            for a in SWEEP_WIDTHS {
                                if let Some(masks) = pack_masks(start, [r, g, b, a], overlap) {
                                    candidates.push((bpp, masks));
                                }
                            }
                        }
                    }
                }
            }
        }
    }
    candidates
}

fn pack_masks(start: u32, widths: [u32; 4], overlap: bool) -> Option<[u32; 4]> {
    let mut masks = [0u32; 4];
    let mut shift = start;
    for (i, width) in widths.into_iter().enumerate() {
        if width == 0 {
            continue;
        }
        if overlap && i == 1 && shift > 0 {
            shift -= 1;
        }
        if shift + width > 32 {
            return None;
        }
        masks[i] = (((1u64 << width) - 1) << shift) as u32;
        shift += width;
    }
    Some(masks)
}

#[test]
fn it_should_keep_validated_masks_disjoint_and_within_depth() {
    let mut accepted = 0;
    let mut rejected = 0;
    for (bpp, [r, g, b, a]) in sweep_candidates() {
        let Ok(format) = PixelFormat::from_masks(bpp, r, g, b, a) else {
            rejected += 1;
            continue;
        };
        accepted += 1;
        let masks = masks_of(&format);
        for i in 0..masks.len() {
            for j in (i + 1)..masks.len() {
                assert_eq!(masks[i] & masks[j], 0, "masks overlap for {:?}", format);
            }
        }
        let union = masks.iter().fold(0u32, |acc, m| acc | m);
        let width: u32 = masks.iter().map(|m| m.count_ones()).sum();
        assert!(width <= u32::from(bpp), "{:?}", format);
        if bpp < 32 {
            assert_eq!(union >> bpp, 0, "{:?}", format);
        }
    }
    assert!(accepted > 0 && rejected > 0);
}

#[test]
fn it_should_round_trip_pixels_on_every_accepted_format() {
    let samples = [(0u8, 0u8, 0u8, 0u8), (255, 255, 255, 255), (0x12, 0x80, 0xFE, 0x40), (1, 127, 200, 254)];
    for (bpp, [r, g, b, a]) in sweep_candidates() {
        let Ok(format) = PixelFormat::from_masks(bpp, r, g, b, a) else {
            continue;
        };
        if format.is_indexed() {
            continue;
        }
        for (sr, sg, sb, sa) in samples {
            let pixel = format.map_rgba(sr, sg, sb, sa);
            let (ur, ug, ub, ua) = format.get_rgba(pixel);
            assert_eq!(
                format.map_rgba(ur, ug, ub, ua),
                pixel,
                "pixel {:#x} not stable on {:?}",
                pixel,
                format
            );
        }
    }
}

#[test]
fn it_should_unpack_unused_color_channels_as_zero() -> Result<()> {
    let format = PixelFormat::from_masks(16, 0xF800, 0x07E0, 0, 0)?;
    let pixel = format.map_rgb(255, 255, 255);
    assert_eq!(pixel, 0xFFE0);
    assert_eq!(format.get_rgba(pixel), (255, 255, 0, 255));

    let blue_only = PixelFormat::from_masks(8, 0, 0, 0x07, 0)?;
    assert_eq!(blue_only.get_rgba(0xFF), (0, 0, 255, 255));
    Ok(())
}

#[test]
fn it_should_derive_shift_and_loss_from_masks() -> Result<()> {
    let format = PixelFormat::from_masks(16, 0xF800, 0x07E0, 0x001F, 0)?;
    assert_eq!(format.bytes_per_pixel(), 2);
    assert_eq!((format.shift(Channel::Red), format.loss(Channel::Red)), (11, 3));
    assert_eq!((format.shift(Channel::Green), format.loss(Channel::Green)), (5, 2));
    assert_eq!((format.shift(Channel::Blue), format.loss(Channel::Blue)), (0, 3));
    assert_eq!(format.channel(Channel::Alpha), ChannelLayout::UNUSED);
    assert!(!format.has_alpha());
    Ok(())
}

#[test]
fn it_should_reject_overlapping_masks() {
    let err = PixelFormat::from_masks(16, 0xF800, 0x0FE0, 0x001F, 0).unwrap_err();
    assert!(matches!(err, Error::InvalidFormat(_)));
}

#[test]
fn it_should_reject_non_contiguous_masks() {
    let err = PixelFormat::from_masks(16, 0xF00F, 0x07E0, 0, 0).unwrap_err();
    assert!(matches!(err, Error::InvalidFormat(_)));
}

#[test]
fn it_should_reject_unsupported_depths() {
    for bpp in [0u8, 3, 12, 31, 64] {
        assert!(
            matches!(PixelFormat::from_masks(bpp, 0, 0, 0, 0), Err(Error::InvalidFormat(_))),
            "depth {} accepted",
            bpp
        );
    }
}

#[test]
fn it_should_reject_inconsistent_triplets() {
    let good = ChannelLayout::from_mask(0x00FF_0000).unwrap();
    assert_eq!(good, ChannelLayout { mask: 0x00FF_0000, shift: 16, loss: 0 });

    let wrong_shift = ChannelLayout { mask: 0x00FF_0000, shift: 8, loss: 0 };
    let result = PixelFormat::from_parts(
        32,
        [wrong_shift, ChannelLayout::UNUSED, ChannelLayout::UNUSED, ChannelLayout::UNUSED],
        None,
    );
    assert!(matches!(result, Err(Error::InvalidFormat(_))));

    let wrong_loss = ChannelLayout { mask: 0x1F, shift: 0, loss: 2 };
    let result = PixelFormat::from_parts(
        16,
        [ChannelLayout::UNUSED, ChannelLayout::UNUSED, wrong_loss, ChannelLayout::UNUSED],
        None,
    );
    assert!(matches!(result, Err(Error::InvalidFormat(_))));

    let unused_with_shift = ChannelLayout { mask: 0, shift: 3, loss: 8 };
    let result = PixelFormat::from_parts(
        16,
        [good_565_red(), ChannelLayout::UNUSED, ChannelLayout::UNUSED, unused_with_shift],
        None,
    );
    assert!(matches!(result, Err(Error::InvalidFormat(_))));
}

fn good_565_red() -> ChannelLayout {
    ChannelLayout { mask: 0xF800, shift: 11, loss: 3 }
}

#[test]
fn it_should_give_indexed_formats_a_palette() -> Result<()> {
    let format = PixelFormat::for_depth(8)?;
    assert!(format.is_indexed());
    assert_eq!(format.palette().map(Palette::len), Some(256));

    let mono = PixelFormat::for_depth(1)?;
    assert_eq!(
        mono.palette().map(|p| p.colors().to_vec()),
        Some(vec![Color::new(0, 0, 0), Color::new(255, 255, 255)])
    );
    Ok(())
}

#[test]
fn it_should_reject_palettes_on_direct_color_formats() -> Result<()> {
    let palette = Palette::grayscale(4);
    let result = PixelFormat::from_parts(
        16,
        [good_565_red(), ChannelLayout::UNUSED, ChannelLayout::UNUSED, ChannelLayout::UNUSED],
        Some(palette.clone()),
    );
    assert!(matches!(result, Err(Error::InvalidFormat(_))));

    let direct = PixelFormat::for_depth(16)?;
    assert!(matches!(direct.with_palette(palette), Err(Error::InvalidFormat(_))));
    Ok(())
}

#[test]
fn it_should_reject_a_palette_larger_than_the_index_range() -> Result<()> {
    let format = PixelFormat::for_depth(2)?;
    let result = format.with_palette(Palette::grayscale(3));
    assert!(matches!(result, Err(Error::InvalidFormat(_))));
    Ok(())
}

#[test]
fn it_should_require_sub_byte_formats_to_be_indexed() {
    let result = PixelFormat::from_masks(4, 0x8, 0x4, 0x2, 0);
    assert!(matches!(result, Err(Error::InvalidFormat(_))));
}

#[test]
fn it_should_map_and_unpack_colors() -> Result<()> {
    let format = PixelFormat::for_depth(16)?;
    let pixel = format.map_rgb(255, 0, 255);
    assert_eq!(pixel, 0xF81F);
    assert_eq!(format.get_rgba(pixel), (255, 0, 255, 255));

    let argb = PixelFormat::argb8888();
    let pixel = argb.map_rgba(0x12, 0x34, 0x56, 0x78);
    assert_eq!(pixel, 0x7812_3456);
    assert_eq!(argb.get_rgba(pixel), (0x12, 0x34, 0x56, 0x78));

    let indexed = PixelFormat::for_depth(1)?;
    assert_eq!(indexed.map_rgb(250, 250, 250), 1);
    assert_eq!(indexed.get_rgba(0), (0, 0, 0, 255));
    Ok(())
}

#[test]
fn it_should_reject_a_color_key_wider_than_the_pixel() -> Result<()> {
    let format = PixelFormat::for_depth(16)?;
    assert!(matches!(
        format.clone().with_color_key(0x1_0000),
        Err(Error::InvalidFormat(_))
    ));
    let keyed = format.with_color_key(0xF81F)?.with_alpha(128);
    assert_eq!(keyed.color_key(), Some(0xF81F));
    assert_eq!(keyed.alpha(), 128);
    Ok(())
}
