//! GeoTIFF reading and 8-bit writing on top of the `tiff` crate.
//!
//! Only strip/tile layouts the `tiff` decoder exposes as chunky (pixel
//! interleaved) data are supported. Palette images are rejected: the decoder
//! has no colormap support.

use ndarray::Array3;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tiff::ColorType;

use crate::features::SpatialReference;
use crate::prelude::{ToolError, ToolResult};
use crate::raster::grid::{GeoTransform, Raster, SampleKind};

const PHOTOMETRIC_PALETTE: u16 = 3;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;
const USER_DEFINED: u16 = 32767;

fn raster_err(context: &str, err: impl std::fmt::Display) -> ToolError {
    ToolError::Raster(format!("{}: {}", context, err))
}

pub fn read_geotiff<P: AsRef<Path>>(path: P) -> ToolResult<Raster> {
    let file = File::open(path.as_ref())?;
    decode_geotiff(BufReader::new(file))
}

pub fn read_geotiff_from_buffer(data: &[u8]) -> ToolResult<Raster> {
    decode_geotiff(Cursor::new(data))
}

fn samples_per_pixel(color: ColorType) -> ToolResult<usize> {
    match color {
        ColorType::Gray(_) => Ok(1),
        ColorType::GrayA(_) => Ok(2),
        ColorType::RGB(_) => Ok(3),
        ColorType::RGBA(_) => Ok(4),
        other => Err(ToolError::Raster(format!(
            "unsupported color type {:?}",
            other
        ))),
    }
}

macro_rules! to_f32 {
    ($buf:expr) => {
        $buf.iter().map(|&v| v as f32).collect::<Vec<f32>>()
    };
}

fn decode_geotiff<R: Read + Seek>(reader: R) -> ToolResult<Raster> {
    let mut decoder = Decoder::new(reader).map_err(|e| raster_err("TIFF decode error", e))?;
    let photometric = decoder
        .find_tag_unsigned::<u16>(Tag::PhotometricInterpretation)
        .map_err(|e| raster_err("cannot read photometric interpretation", e))?;
    if photometric == Some(PHOTOMETRIC_PALETTE) {
        return Err(ToolError::Raster(
            "palette (colormap) images are not supported; expand them to RGB first".into(),
        ));
    }
    let (width, height) = decoder
        .dimensions()
        .map_err(|e| raster_err("cannot read dimensions", e))?;
    let color = decoder
        .colortype()
        .map_err(|e| raster_err("cannot read color type", e))?;
    let bands = samples_per_pixel(color)?;
    let rows = height as usize;
    let cols = width as usize;

    let transform = read_geotransform(&mut decoder)?;
    let nodata = read_nodata(&mut decoder);
    let spatial_reference = read_spatial_reference(&mut decoder);

    let result = decoder
        .read_image()
        .map_err(|e| raster_err("cannot read image data", e))?;
    let (interleaved, sample_kind) = match result {
        DecodingResult::U8(buf) => (to_f32!(buf), SampleKind::U8),
        DecodingResult::U16(buf) => (to_f32!(buf), SampleKind::Wide),
        DecodingResult::U32(buf) => (to_f32!(buf), SampleKind::Wide),
        DecodingResult::I8(buf) => (to_f32!(buf), SampleKind::Wide),
        DecodingResult::I16(buf) => (to_f32!(buf), SampleKind::Wide),
        DecodingResult::I32(buf) => (to_f32!(buf), SampleKind::Wide),
        DecodingResult::F32(buf) => (buf, SampleKind::Wide),
        DecodingResult::F64(buf) => (to_f32!(buf), SampleKind::Wide),
        _ => return Err(ToolError::Raster("unsupported TIFF sample format".into())),
    };

    if interleaved.len() != rows * cols * bands {
        return Err(ToolError::Raster(format!(
            "expected {} samples for {}x{}x{}, decoded {}",
            rows * cols * bands,
            bands,
            rows,
            cols,
            interleaved.len()
        )));
    }

    let data = Array3::from_shape_fn((bands, rows, cols), |(b, r, c)| {
        interleaved[(r * cols + c) * bands + b]
    });

    let mut raster = Raster::new(data, transform, sample_kind);
    raster.nodata = nodata;
    raster.spatial_reference = spatial_reference;
    Ok(raster)
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> ToolResult<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok();
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok();

    if let (Some(scale), Some(tiepoint)) = (scale, tiepoint) {
        if scale.len() >= 2 && tiepoint.len() >= 6 {
            // tiepoint: [I, J, K, X, Y, Z]
            let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
            let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
            return Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
        }
    }

    if let Ok(matrix) = decoder.get_tag_f64_vec(Tag::ModelTransformationTag) {
        if matrix.len() >= 8 {
            if matrix[1] != 0.0 || matrix[4] != 0.0 {
                return Err(ToolError::Raster("rotated rasters are not supported".into()));
            }
            return Ok(GeoTransform::new(matrix[3], matrix[7], matrix[0], matrix[5]));
        }
    }

    Err(ToolError::Raster("image is not georeferenced".into()))
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f32> {
    decoder
        .get_tag_ascii_string(Tag::GdalNodata)
        .ok()
        .and_then(|raw| raw.trim_matches(|c: char| c == '\0' || c.is_whitespace()).parse().ok())
}

fn read_spatial_reference<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<SpatialReference> {
    let keys = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag).ok()?;
    let count = *keys.get(3)? as usize;
    let mut geographic = None;
    let mut projected = None;
    for entry in keys.get(4..)?.chunks_exact(4).take(count) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        if location != 0 || value == USER_DEFINED {
            continue;
        }
        match key {
            PROJECTED_CS_TYPE_KEY => projected = Some(SpatialReference::new(value as u32)),
            GEOGRAPHIC_TYPE_KEY => geographic = Some(SpatialReference::new(value as u32)),
            _ => {}
        }
    }
    projected.or(geographic)
}

fn geo_keys(spatial_reference: Option<SpatialReference>) -> Vec<u16> {
    let mut entries: Vec<[u16; 4]> = vec![[GT_RASTER_TYPE_KEY, 0, 1, 1]];
    if let Some(sr) = spatial_reference.filter(|sr| sr.wkid <= u16::MAX as u32) {
        if sr.is_geographic() {
            entries.insert(0, [GT_MODEL_TYPE_KEY, 0, 1, 2]);
            entries.push([GEOGRAPHIC_TYPE_KEY, 0, 1, sr.wkid as u16]);
        } else {
            entries.insert(0, [GT_MODEL_TYPE_KEY, 0, 1, 1]);
            entries.push([PROJECTED_CS_TYPE_KEY, 0, 1, sr.wkid as u16]);
        }
    }
    let mut keys = vec![1, 1, 0, entries.len() as u16];
    keys.extend(entries.into_iter().flatten());
    keys
}

macro_rules! write_tagged_image {
    ($encoder:expr, $color:ty, $raster:expr, $data:expr) => {{
        let mut image = $encoder
            .new_image::<$color>($raster.cols() as u32, $raster.rows() as u32)
            .map_err(|e| raster_err("cannot create TIFF image", e))?;
        let gt = $raster.transform;
        let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
        let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
        let keys = geo_keys($raster.spatial_reference);
        image
            .encoder()
            .write_tag(Tag::ModelPixelScaleTag, &scale[..])
            .map_err(|e| raster_err("cannot write scale tag", e))?;
        image
            .encoder()
            .write_tag(Tag::ModelTiepointTag, &tiepoint[..])
            .map_err(|e| raster_err("cannot write tiepoint tag", e))?;
        image
            .encoder()
            .write_tag(Tag::GeoKeyDirectoryTag, keys.as_slice())
            .map_err(|e| raster_err("cannot write geokey tag", e))?;
        if let Some(nodata) = $raster.nodata {
            let text = nodata.to_string();
            image
                .encoder()
                .write_tag(Tag::GdalNodata, text.as_str())
                .map_err(|e| raster_err("cannot write nodata tag", e))?;
        }
        image
            .write_data($data)
            .map_err(|e| raster_err("cannot write image data", e))?;
    }};
}

/// Writes a one- or three-band raster as an 8-bit GeoTIFF. Values are
/// rounded and clamped to 0..=255.
pub fn write_geotiff_u8<P: AsRef<Path>>(raster: &Raster, path: P) -> ToolResult<()> {
    let bytes = encode_geotiff_u8(raster)?;
    let mut file = File::create(path.as_ref())?;
    file.write_all(&bytes)?;
    Ok(())
}

pub fn encode_geotiff_u8(raster: &Raster) -> ToolResult<Vec<u8>> {
    let (rows, cols, bands) = (raster.rows(), raster.cols(), raster.bands());
    let mut data = Vec::with_capacity(rows * cols * bands);
    for r in 0..rows {
        for c in 0..cols {
            for b in 0..bands {
                data.push(raster.data[[b, r, c]].round().clamp(0.0, 255.0) as u8);
            }
        }
    }

    let mut buf = Vec::new();
    {
        let mut encoder = TiffEncoder::new(Cursor::new(&mut buf))
            .map_err(|e| raster_err("TIFF encoder error", e))?;
        match bands {
            1 => write_tagged_image!(encoder, colortype::Gray8, raster, &data),
            3 => write_tagged_image!(encoder, colortype::RGB8, raster, &data),
            n => {
                return Err(ToolError::Raster(format!(
                    "cannot write {} bands as an 8-bit image",
                    n
                )))
            }
        }
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Envelope;

    fn rgb_raster() -> Raster {
        let data = Array3::from_shape_fn((3, 4, 5), |(b, r, c)| (b * 100 + r * 10 + c) as f32);
        let mut raster = Raster::new(
            data,
            GeoTransform::new(-10.0, 50.0, 0.5, -0.5),
            SampleKind::U8,
        );
        raster.spatial_reference = Some(SpatialReference::WGS84);
        raster
    }

    #[test]
    fn written_geotiff_keeps_georeferencing() {
        let bytes = encode_geotiff_u8(&rgb_raster()).unwrap();
        let back = read_geotiff_from_buffer(&bytes).unwrap();

        assert_eq!((back.bands(), back.rows(), back.cols()), (3, 4, 5));
        assert_eq!(back.sample_kind, SampleKind::U8);
        assert_eq!(back.spatial_reference, Some(SpatialReference::WGS84));
        assert_eq!(back.extent(), Envelope::new(-10.0, 48.0, -7.5, 50.0));
        assert_eq!(back.data[[2, 3, 4]], 234.0);
        assert_eq!(back.data[[0, 1, 2]], 12.0);
    }

    #[test]
    fn gray_geotiff_uses_projected_key() {
        let mut raster = Raster::new(
            Array3::from_elem((1, 2, 2), 7.0),
            GeoTransform::new(1000.0, 2000.0, 10.0, -10.0),
            SampleKind::U8,
        );
        raster.spatial_reference = Some(SpatialReference::WEB_MERCATOR);
        let back = read_geotiff_from_buffer(&encode_geotiff_u8(&raster).unwrap()).unwrap();
        assert_eq!(back.spatial_reference, Some(SpatialReference::WEB_MERCATOR));
        assert_eq!(back.bands(), 1);
    }

    #[test]
    fn two_band_rasters_cannot_be_written() {
        let raster = Raster::new(
            Array3::zeros((2, 2, 2)),
            GeoTransform::new(0.0, 0.0, 1.0, -1.0),
            SampleKind::U8,
        );
        assert!(matches!(
            encode_geotiff_u8(&raster),
            Err(ToolError::Raster(_))
        ));
    }

    fn encode_gray16(raster: &Raster) -> ToolResult<Vec<u8>> {
        let data: Vec<u16> = raster.data.iter().map(|&v| v as u16).collect();
        let mut buf = Vec::new();
        {
            let mut encoder = TiffEncoder::new(Cursor::new(&mut buf))
                .map_err(|e| raster_err("TIFF encoder error", e))?;
            write_tagged_image!(encoder, colortype::Gray16, raster, &data);
        }
        Ok(buf)
    }

    fn encode_gray32f(raster: &Raster) -> ToolResult<Vec<u8>> {
        let data: Vec<f32> = raster.data.iter().copied().collect();
        let mut buf = Vec::new();
        {
            let mut encoder = TiffEncoder::new(Cursor::new(&mut buf))
                .map_err(|e| raster_err("TIFF encoder error", e))?;
            write_tagged_image!(encoder, colortype::Gray32Float, raster, &data);
        }
        Ok(buf)
    }

    fn wide_raster(values: [f32; 6], nodata: f32) -> Raster {
        let data = Array3::from_shape_vec((1, 2, 3), values.to_vec()).unwrap();
        let mut raster = Raster::new(
            data,
            GeoTransform::new(500.0, 900.0, 30.0, -30.0),
            SampleKind::Wide,
        );
        raster.nodata = Some(nodata);
        raster.spatial_reference = Some(SpatialReference::new(32633));
        raster
    }

    #[test]
    fn sixteen_bit_geotiff_reads_as_wide_with_nodata() {
        let raster = wide_raster([0.0, 1000.0, 65535.0, 20000.0, 40000.0, 5.0], 65535.0);
        let back = read_geotiff_from_buffer(&encode_gray16(&raster).unwrap()).unwrap();

        assert_eq!(back.sample_kind, SampleKind::Wide);
        assert_eq!(back.nodata, Some(65535.0));
        assert_eq!(back.spatial_reference, Some(SpatialReference::new(32633)));
        assert_eq!(back.extent(), Envelope::new(500.0, 840.0, 590.0, 900.0));
        assert_eq!(back.data[[0, 0, 1]], 1000.0);
        assert!(!back.is_valid(back.data[[0, 0, 2]]));
        let stats = back.band_stats(0).unwrap();
        assert_eq!((stats.min, stats.max), (0.0, 40000.0));
    }

    #[test]
    fn float_geotiff_keeps_negative_nodata() {
        let raster = wide_raster([-9999.0, 0.25, 1.5, 2.75, -9999.0, 4.0], -9999.0);
        let back = read_geotiff_from_buffer(&encode_gray32f(&raster).unwrap()).unwrap();

        assert_eq!(back.sample_kind, SampleKind::Wide);
        assert_eq!(back.nodata, Some(-9999.0));
        assert_eq!(back.data[[0, 0, 1]], 0.25);
        let stats = back.band_stats(0).unwrap();
        assert_eq!((stats.min, stats.max), (0.25, 4.0));
    }

    /// Minimal little-endian 2x1 palette TIFF without a colormap.
    fn palette_tiff() -> Vec<u8> {
        let entries: [(u16, u16, u32); 9] = [
            (256, 3, 2),
            (257, 3, 1),
            (258, 3, 8),
            (259, 3, 1),
            (262, 3, PHOTOMETRIC_PALETTE as u32),
            (273, 4, 122),
            (277, 3, 1),
            (278, 3, 1),
            (279, 4, 2),
        ];
        let mut bytes = vec![b'I', b'I', 42, 0, 8, 0, 0, 0];
        bytes.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for (tag, kind, value) in entries {
            bytes.extend_from_slice(&tag.to_le_bytes());
            bytes.extend_from_slice(&kind.to_le_bytes());
            bytes.extend_from_slice(&1u32.to_le_bytes());
            if kind == 3 {
                bytes.extend_from_slice(&(value as u16).to_le_bytes());
                bytes.extend_from_slice(&[0, 0]);
            } else {
                bytes.extend_from_slice(&value.to_le_bytes());
            }
        }
        bytes.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(bytes.len(), 122);
        bytes.extend_from_slice(&[0, 1]);
        bytes
    }

    #[test]
    fn palette_images_are_rejected_with_a_clear_message() {
        match read_geotiff_from_buffer(&palette_tiff()) {
            Err(ToolError::Raster(message)) => assert!(message.contains("palette")),
            other => panic!("unexpected result {:?}", other.map(|r| r.bands())),
        }
    }

    #[test]
    fn garbage_is_a_raster_error() {
        assert!(matches!(
            read_geotiff_from_buffer(b"not a tiff"),
            Err(ToolError::Raster(_))
        ));
    }
}
