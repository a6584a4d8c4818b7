//! Minimal WebP RIFF muxer for attaching EXIF.
//!
//! libwebp's encoder produces either the simple format (a lone `VP8 ` or
//! `VP8L` chunk) or, with alpha, the extended format (`VP8X` + `ALPH` +
//! `VP8 `). Metadata needs the extended format:
//!
//! ```text
//! RIFF <size> WEBP
//!   VP8X  flags(1) reserved(3) canvas_w-1(3) canvas_h-1(3)
//!   ICCP / ANIM / ALPH ...
//!   VP8  | VP8L                     image data
//!   EXIF                            raw TIFF bytes
//!   XMP
//! ```
//!
//! [`embed_exif`] promotes a simple file to the extended format when needed,
//! sets the EXIF flag, replaces any existing `EXIF` chunk, and recomputes the
//! RIFF size. Chunk payloads are copied through untouched.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MuxError {
    #[error("not a RIFF/WEBP file")]
    NotWebp,
    #[error("chunk {0} runs past the end of the file")]
    Truncated(String),
    #[error("no VP8/VP8L image chunk to size the canvas")]
    NoImageData,
    #[error("EXIF payload too large")]
    TooLarge,
}

const FLAG_ALPHA: u8 = 0x10;
const FLAG_EXIF: u8 = 0x08;

struct Chunk<'a> {
    fourcc: [u8; 4],
    payload: &'a [u8],
}

fn fourcc_name(fourcc: &[u8]) -> String {
    String::from_utf8_lossy(fourcc).trim_end().to_string()
}

fn read_u32_le(data: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

fn parse_chunks(data: &[u8]) -> Result<Vec<Chunk<'_>>, MuxError> {
    if data.len() < 12 || &data[0..4] != b"RIFF" || &data[8..12] != b"WEBP" {
        return Err(MuxError::NotWebp);
    }
    let riff_end = (8 + read_u32_le(data, 4) as usize).min(data.len());

    let mut chunks = Vec::new();
    let mut pos = 12;
    while pos + 8 <= riff_end {
        let fourcc = [data[pos], data[pos + 1], data[pos + 2], data[pos + 3]];
        let size = read_u32_le(data, pos + 4) as usize;
        let start = pos + 8;
        let end = start
            .checked_add(size)
            .filter(|&e| e <= riff_end)
            .ok_or_else(|| MuxError::Truncated(fourcc_name(&fourcc)))?;
        chunks.push(Chunk {
            fourcc,
            payload: &data[start..end],
        });
        // Odd-sized payloads carry one byte of padding.
        pos = end + (size & 1);
    }
    Ok(chunks)
}

/// Canvas size from the first image chunk.
fn canvas_size(chunks: &[Chunk<'_>]) -> Option<(u32, u32)> {
    chunks.iter().find_map(|c| match &c.fourcc {
        b"VP8 " if c.payload.len() >= 10 && c.payload[3..6] == [0x9d, 0x01, 0x2a] => {
            let w = u16::from_le_bytes([c.payload[6], c.payload[7]]) & 0x3fff;
            let h = u16::from_le_bytes([c.payload[8], c.payload[9]]) & 0x3fff;
            Some((w as u32, h as u32))
        }
        b"VP8L" if c.payload.len() >= 5 && c.payload[0] == 0x2f => {
            let bits = read_u32_le(c.payload, 1);
            Some(((bits & 0x3fff) + 1, ((bits >> 14) & 0x3fff) + 1))
        }
        _ => None,
    })
}

fn has_alpha(chunks: &[Chunk<'_>]) -> bool {
    chunks.iter().any(|c| match &c.fourcc {
        b"ALPH" => true,
        b"VP8L" if c.payload.len() >= 5 => (read_u32_le(c.payload, 1) >> 28) & 1 == 1,
        _ => false,
    })
}

fn vp8x_payload(flags: u8, width: u32, height: u32) -> Vec<u8> {
    let mut payload = vec![flags, 0, 0, 0];
    payload.extend_from_slice(&(width - 1).to_le_bytes()[..3]);
    payload.extend_from_slice(&(height - 1).to_le_bytes()[..3]);
    payload
}

fn write_chunk(out: &mut Vec<u8>, fourcc: &[u8], payload: &[u8]) {
    out.extend_from_slice(fourcc);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    if payload.len() % 2 == 1 {
        out.push(0);
    }
}

/// Return a copy of `webp` carrying `exif` (raw TIFF bytes) in an `EXIF` chunk.
pub fn embed_exif(webp: &[u8], exif: &[u8]) -> Result<Vec<u8>, MuxError> {
    if exif.len() > (u32::MAX as usize) / 2 {
        return Err(MuxError::TooLarge);
    }
    let chunks = parse_chunks(webp)?;

    let header = match chunks.first() {
        Some(first) if &first.fourcc == b"VP8X" && first.payload.len() >= 10 => {
            let mut payload = first.payload.to_vec();
            payload[0] |= FLAG_EXIF;
            payload
        }
        _ => {
            let (w, h) = canvas_size(&chunks).ok_or(MuxError::NoImageData)?;
            if w == 0 || h == 0 {
                return Err(MuxError::NoImageData);
            }
            let alpha = if has_alpha(&chunks) { FLAG_ALPHA } else { 0 };
            vp8x_payload(FLAG_EXIF | alpha, w, h)
        }
    };

    let mut out = Vec::with_capacity(webp.len() + exif.len() + 32);
    out.extend_from_slice(b"RIFF\0\0\0\0WEBP");
    write_chunk(&mut out, b"VP8X", &header);

    let mut exif_written = false;
    for chunk in chunks
        .iter()
        .filter(|c| &c.fourcc != b"VP8X" && &c.fourcc != b"EXIF")
    {
        if &chunk.fourcc == b"XMP " && !exif_written {
            write_chunk(&mut out, b"EXIF", exif);
            exif_written = true;
        }
        write_chunk(&mut out, &chunk.fourcc, chunk.payload);
    }
    if !exif_written {
        write_chunk(&mut out, b"EXIF", exif);
    }

    let riff_size = (out.len() - 8) as u32;
    out[4..8].copy_from_slice(&riff_size.to_le_bytes());
    Ok(out)
}

/// Payload of the `EXIF` chunk, if any.
pub fn read_exif(webp: &[u8]) -> Option<Vec<u8>> {
    parse_chunks(webp)
        .ok()?
        .into_iter()
        .find(|c| &c.fourcc == b"EXIF")
        .map(|c| c.payload.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn riff(chunks: &[(&[u8; 4], Vec<u8>)]) -> Vec<u8> {
        let mut out = b"RIFF\0\0\0\0WEBP".to_vec();
        for (fourcc, payload) in chunks {
            write_chunk(&mut out, *fourcc, payload);
        }
        let size = (out.len() - 8) as u32;
        out[4..8].copy_from_slice(&size.to_le_bytes());
        out
    }

    /// A lossy keyframe header followed by filler; enough for the muxer.
    fn fake_vp8(width: u16, height: u16) -> Vec<u8> {
        let mut p = vec![0x10, 0x02, 0x00, 0x9d, 0x01, 0x2a];
        p.extend_from_slice(&width.to_le_bytes());
        p.extend_from_slice(&height.to_le_bytes());
        p.extend_from_slice(&[0xAA; 7]);
        p
    }

    fn fourccs(data: &[u8]) -> Vec<String> {
        parse_chunks(data)
            .unwrap()
            .iter()
            .map(|c| fourcc_name(&c.fourcc))
            .collect()
    }

    #[test]
    fn simple_file_is_promoted_to_extended() {
        let src = riff(&[(b"VP8 ", fake_vp8(640, 480))]);
        let out = embed_exif(&src, b"II*\0exif").unwrap();

        assert_eq!(fourccs(&out), vec!["VP8X", "VP8", "EXIF"]);
        let chunks = parse_chunks(&out).unwrap();
        let vp8x = chunks[0].payload;
        assert_eq!(vp8x[0], FLAG_EXIF);
        assert_eq!(&vp8x[4..7], &639u32.to_le_bytes()[..3]);
        assert_eq!(&vp8x[7..10], &479u32.to_le_bytes()[..3]);
    }

    #[test]
    fn riff_size_matches_file_length() {
        let src = riff(&[(b"VP8 ", fake_vp8(10, 10))]);
        let out = embed_exif(&src, b"abc").unwrap();
        assert_eq!(read_u32_le(&out, 4) as usize, out.len() - 8);
        assert_eq!(out.len() % 2, 0);
    }

    #[test]
    fn odd_exif_is_padded_and_read_back_verbatim() {
        let exif = b"MM\0*odd".to_vec();
        let src = riff(&[(b"VP8 ", fake_vp8(3, 5))]);
        let out = embed_exif(&src, &exif).unwrap();
        assert_eq!(read_exif(&out), Some(exif));
    }

    #[test]
    fn image_payload_is_untouched() {
        let vp8 = fake_vp8(32, 16);
        let src = riff(&[(b"VP8 ", vp8.clone())]);
        let out = embed_exif(&src, b"exif").unwrap();
        let chunks = parse_chunks(&out).unwrap();
        assert_eq!(chunks[1].payload, vp8.as_slice());
    }

    #[test]
    fn existing_vp8x_keeps_flags() {
        let header = vp8x_payload(FLAG_ALPHA, 20, 30);
        let src = riff(&[
            (b"VP8X", header),
            (b"ALPH", vec![1, 2, 3]),
            (b"VP8 ", fake_vp8(20, 30)),
        ]);
        let out = embed_exif(&src, b"exif").unwrap();

        assert_eq!(fourccs(&out), vec!["VP8X", "ALPH", "VP8", "EXIF"]);
        let chunks = parse_chunks(&out).unwrap();
        assert_eq!(chunks[0].payload[0], FLAG_ALPHA | FLAG_EXIF);
    }

    #[test]
    fn existing_exif_is_replaced() {
        let src = riff(&[
            (b"VP8X", vp8x_payload(FLAG_EXIF, 4, 4)),
            (b"VP8 ", fake_vp8(4, 4)),
            (b"EXIF", b"old".to_vec()),
        ]);
        let out = embed_exif(&src, b"new!").unwrap();
        assert_eq!(fourccs(&out), vec!["VP8X", "VP8", "EXIF"]);
        assert_eq!(read_exif(&out), Some(b"new!".to_vec()));
    }

    #[test]
    fn exif_goes_before_xmp() {
        let src = riff(&[
            (b"VP8X", vp8x_payload(0x04, 4, 4)),
            (b"VP8 ", fake_vp8(4, 4)),
            (b"XMP ", b"<x/>".to_vec()),
        ]);
        let out = embed_exif(&src, b"exif").unwrap();
        assert_eq!(fourccs(&out), vec!["VP8X", "VP8", "EXIF", "XMP"]);
    }

    #[test]
    fn lossless_alpha_bit_sets_alpha_flag() {
        // 8x8, alpha_is_used = 1
        let bits: u32 = 7 | (7 << 14) | (1 << 28);
        let mut vp8l = vec![0x2f];
        vp8l.extend_from_slice(&bits.to_le_bytes());
        let src = riff(&[(b"VP8L", vp8l)]);

        let out = embed_exif(&src, b"e").unwrap();
        let chunks = parse_chunks(&out).unwrap();
        assert_eq!(chunks[0].payload[0], FLAG_EXIF | FLAG_ALPHA);
        assert_eq!(&chunks[0].payload[4..7], &[7, 0, 0]);
    }

    #[test]
    fn rejects_non_webp() {
        assert_eq!(embed_exif(b"GIF89a", b"x"), Err(MuxError::NotWebp));
        assert_eq!(read_exif(b"nope"), None);
    }

    #[test]
    fn rejects_truncated_chunk() {
        let mut src = riff(&[(b"VP8 ", fake_vp8(4, 4))]);
        // Claim a longer payload than exists.
        src[16..20].copy_from_slice(&1000u32.to_le_bytes());
        assert_eq!(
            embed_exif(&src, b"x"),
            Err(MuxError::Truncated("VP8".into()))
        );
    }

    #[test]
    fn no_image_chunk_is_an_error() {
        let src = riff(&[(b"ICCP", vec![0; 4])]);
        assert_eq!(embed_exif(&src, b"x"), Err(MuxError::NoImageData));
    }

    #[test]
    fn read_exif_absent() {
        let src = riff(&[(b"VP8 ", fake_vp8(4, 4))]);
        assert_eq!(read_exif(&src), None);
    }
}
