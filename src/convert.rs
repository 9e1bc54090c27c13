// SPDX-License-Identifier: GPL-3.0-only

//! CPU NV12 to BGR conversion and presentation resize
//!
//! The conversion uses the ITU-R BT.601 video-range transform in 7-bit fixed
//! point with nearest-neighbour chroma upsampling. Chroma upsampling and the
//! matrix are fixed; changing either would change pixel values and break
//! consumers that compare against reference output.

use crate::frame::BgrFrame;

// BT.601 video-range coefficients scaled by 128:
//   B = 1.164 (Y - 16) + 2.018 (U - 128)
//   G = 1.164 (Y - 16) - 0.391 (U - 128) - 0.813 (V - 128)
//   R = 1.164 (Y - 16) + 1.596 (V - 128)
const Y_COEFF: i32 = 149;
const V_R: i32 = 204;
const U_G: i32 = 50;
const V_G: i32 = 104;
const U_B: i32 = 258;

/// Convert NV12 planes to a tightly packed interleaved BGR buffer.
///
/// `y_plane` holds `height` rows of `y_stride` bytes; `uv_plane` holds
/// `height.div_ceil(2)` rows of `uv_stride` bytes with interleaved U/V pairs.
/// Callers validate plane lengths before calling; rows are never read past
/// `width` (or `width` rounded up to a pair for UV) so stride padding is
/// ignored.
pub fn nv12_to_bgr(
    y_plane: &[u8],
    uv_plane: &[u8],
    width: usize,
    height: usize,
    y_stride: usize,
    uv_stride: usize,
) -> Vec<u8> {
    let mut bgr = vec![0u8; width * height * 3];

    // Two luma rows share one chroma row
    for row in (0..height).step_by(2) {
        let uv_row = row / 2;
        convert_row(y_plane, uv_plane, &mut bgr, row, uv_row, width, y_stride, uv_stride);
        if row + 1 < height {
            convert_row(
                y_plane,
                uv_plane,
                &mut bgr,
                row + 1,
                uv_row,
                width,
                y_stride,
                uv_stride,
            );
        }
    }

    bgr
}

#[inline]
#[allow(clippy::too_many_arguments)]
fn convert_row(
    y_plane: &[u8],
    uv_plane: &[u8],
    bgr: &mut [u8],
    row: usize,
    uv_row: usize,
    width: usize,
    y_stride: usize,
    uv_stride: usize,
) {
    let y_row_start = row * y_stride;
    let uv_row_start = uv_row * uv_stride;
    let bgr_row_start = row * width * 3;

    for x in (0..width).step_by(2) {
        let uv_offset = uv_row_start + (x / 2) * 2;
        let u = uv_plane[uv_offset] as i32 - 128;
        let v = uv_plane[uv_offset + 1] as i32 - 128;

        // Chroma contributions are shared by the pixel pair
        let b_u = U_B * u;
        let g_uv = U_G * u + V_G * v;
        let r_v = V_R * v;

        let y1 = (y_plane[y_row_start + x] as i32 - 16) * Y_COEFF;
        let out = bgr_row_start + x * 3;
        bgr[out] = clamp8((y1 + b_u + 64) >> 7);
        bgr[out + 1] = clamp8((y1 - g_uv + 64) >> 7);
        bgr[out + 2] = clamp8((y1 + r_v + 64) >> 7);

        if x + 1 < width {
            let y2 = (y_plane[y_row_start + x + 1] as i32 - 16) * Y_COEFF;
            let out = bgr_row_start + (x + 1) * 3;
            bgr[out] = clamp8((y2 + b_u + 64) >> 7);
            bgr[out + 1] = clamp8((y2 - g_uv + 64) >> 7);
            bgr[out + 2] = clamp8((y2 + r_v + 64) >> 7);
        }
    }
}

#[inline]
fn clamp8(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

/// Bilinear resize of an interleaved BGR frame.
///
/// Sample positions use pixel-center alignment; weights are 8-bit fixed
/// point. Returns the source unchanged when the size already matches.
pub fn resize_bgr(src: &BgrFrame, dst_width: u32, dst_height: u32) -> BgrFrame {
    if (src.width, src.height) == (dst_width, dst_height) || src.width == 0 || src.height == 0 {
        return src.clone();
    }

    let sw = src.width as usize;
    let sh = src.height as usize;
    let dw = dst_width as usize;
    let dh = dst_height as usize;
    let mut data = vec![0u8; dw * dh * 3];

    for dy in 0..dh {
        let (y0, y1, wy) = sample_coord(dy, dh, sh);
        for dx in 0..dw {
            let (x0, x1, wx) = sample_coord(dx, dw, sw);

            let p00 = (y0 * sw + x0) * 3;
            let p10 = (y0 * sw + x1) * 3;
            let p01 = (y1 * sw + x0) * 3;
            let p11 = (y1 * sw + x1) * 3;
            let out = (dy * dw + dx) * 3;

            for c in 0..3 {
                let top = src.data[p00 + c] as u32 * (256 - wx) + src.data[p10 + c] as u32 * wx;
                let bottom = src.data[p01 + c] as u32 * (256 - wx) + src.data[p11 + c] as u32 * wx;
                data[out + c] = ((top * (256 - wy) + bottom * wy + 32_768) >> 16) as u8;
            }
        }
    }

    BgrFrame {
        width: dst_width,
        height: dst_height,
        data,
    }
}

/// Map a destination index to the two source indices it falls between and
/// the 8-bit weight of the second one.
#[inline]
fn sample_coord(dst: usize, dst_len: usize, src_len: usize) -> (usize, usize, u32) {
    // Pixel-center mapping in 16.16 fixed point: (d + 0.5) * s/len - 0.5
    let pos = ((2 * dst as i64 + 1) * (src_len as i64) << 15) / dst_len as i64 - (1 << 15);
    let pos = pos.max(0);
    let idx = (pos >> 16) as usize;
    let frac = ((pos & 0xFFFF) >> 8) as u32;
    let next = (idx + 1).min(src_len - 1);
    (idx.min(src_len - 1), next, frac)
}
