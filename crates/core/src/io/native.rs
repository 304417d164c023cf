//! Native GeoTIFF access (no GDAL dependency)
//!
//! Uses the `tiff` crate. Georeferencing comes from ModelPixelScaleTag +
//! ModelTiepointTag (or ModelTransformationTag), nodata from GDAL_NODATA and
//! band units from GDAL_METADATA. Only north-up rasters are supported.

use crate::error::{Error, Result};
use crate::raster::{GridRaster, PixelWindow, RasterExtent, RasterSource, RasterWindow};
use ndarray::Array2;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tracing::debug;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_METADATA: u16 = 42112;
const GDAL_NODATA: u16 = 42113;

const SAMPLE_FORMAT_IEEEFP: u16 = 3;

/// Resolve a numeric tag code to the variant the decoder files it under.
/// GeoTIFF codes decode as named variants, so `Tag::Unknown(code)` never matches.
fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// An opened GeoTIFF raster layer.
///
/// Holds the decoder and the parsed georeferencing. Windows are decoded chunk
/// by chunk (strips or tiles), so reading a small window of a large file only
/// touches the chunks that intersect it. For multi-band files only the first
/// band is returned. The underlying file is closed when the handle is dropped.
pub struct RasterHandle<R: Read + Seek = BufReader<File>> {
    path: PathBuf,
    decoder: Decoder<R>,
    extent: RasterExtent,
    nodata: Option<f64>,
    units: Option<String>,
    chunk_width: u32,
    chunk_height: u32,
    chunks_across: u32,
}

impl RasterHandle {
    /// Open a GeoTIFF file.
    ///
    /// Fails with [`Error::RasterNotFound`] when the path does not resolve and
    /// [`Error::RasterFormat`] when the file is not a georeferenced TIFF.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::RasterNotFound { path: path.to_path_buf() },
            _ => Error::Io(e),
        })?;
        Self::from_reader_at(BufReader::new(file), path.to_path_buf())
    }
}

impl<R: Read + Seek> RasterHandle<R> {
    /// Open a GeoTIFF from any seekable reader (e.g. an in-memory buffer)
    pub fn from_reader(reader: R) -> Result<Self> {
        Self::from_reader_at(reader, PathBuf::from("<memory>"))
    }

    fn from_reader_at(reader: R, path: PathBuf) -> Result<Self> {
        let format_error = |reason: String| Error::RasterFormat {
            path: path.clone(),
            reason,
        };

        let mut decoder =
            Decoder::new(reader).map_err(|e| format_error(format!("TIFF decode error: {}", e)))?;

        let (width, height) = decoder
            .dimensions()
            .map_err(|e| format_error(format!("cannot read dimensions: {}", e)))?;

        let extent = read_extent(&mut decoder, width as usize, height as usize)
            .map_err(|e| format_error(e.to_string()))?;
        let f32_samples = stores_f32(&mut decoder);
        let nodata = read_nodata(&mut decoder)
            .map(|nd| if f32_samples { nd as f32 as f64 } else { nd });
        let units = read_units(&mut decoder);

        let (chunk_width, chunk_height) = decoder.chunk_dimensions();
        if chunk_width == 0 || chunk_height == 0 {
            return Err(format_error("zero-sized strips or tiles".into()));
        }
        let chunks_across = width.div_ceil(chunk_width);

        debug!(
            path = %path.display(),
            width,
            height,
            chunk_width,
            chunk_height,
            ?nodata,
            "opened raster"
        );

        Ok(Self {
            path,
            decoder,
            extent,
            nodata,
            units,
            chunk_width,
            chunk_height,
            chunks_across,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode one chunk into f64 samples (all bands interleaved)
    fn read_chunk_samples(&mut self, index: u32) -> Result<Vec<f64>> {
        let chunk = self.decoder.read_chunk(index).map_err(|e| Error::RasterFormat {
            path: self.path.clone(),
            reason: format!("cannot read chunk {}: {}", index, e),
        })?;
        decoding_result_to_f64(chunk)
    }
}

impl<R: Read + Seek> RasterSource for RasterHandle<R> {
    fn extent(&self) -> &RasterExtent {
        &self.extent
    }

    fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    fn read_window(&mut self, window: PixelWindow) -> Result<RasterWindow> {
        let w = window.clamp_non_empty(self.extent.width, self.extent.height)?;
        let mut data = Array2::from_elem((w.height(), w.width()), f64::NAN);

        let cw = self.chunk_width as i64;
        let ch = self.chunk_height as i64;
        let mut chunks_read = 0usize;

        for cy in (w.row_min / ch)..=(w.row_max / ch) {
            for cx in (w.col_min / cw)..=(w.col_max / cw) {
                let index = (cy * self.chunks_across as i64 + cx) as u32;
                let (data_w, data_h) = self.decoder.chunk_data_dimensions(index);
                let samples = self.read_chunk_samples(index)?;
                chunks_read += 1;

                let pixels = data_w as usize * data_h as usize;
                if pixels == 0 {
                    continue;
                }
                let bands = (samples.len() / pixels).max(1);

                let x0 = cx * cw;
                let y0 = cy * ch;
                let r_lo = y0.max(w.row_min);
                let r_hi = (y0 + data_h as i64 - 1).min(w.row_max);
                let c_lo = x0.max(w.col_min);
                let c_hi = (x0 + data_w as i64 - 1).min(w.col_max);

                for r in r_lo..=r_hi {
                    for c in c_lo..=c_hi {
                        let offset = (r - y0) as usize * data_w as usize + (c - x0) as usize;
                        let idx = offset * bands;
                        if let Some(&v) = samples.get(idx) {
                            data[((r - w.row_min) as usize, (c - w.col_min) as usize)] = v;
                        }
                    }
                }
            }
        }

        debug!(
            path = %self.path.display(),
            cols = w.width(),
            rows = w.height(),
            chunks_read,
            "read window"
        );

        RasterWindow::new(w, data)
    }
}

fn decoding_result_to_f64(result: DecodingResult) -> Result<Vec<f64>> {
    macro_rules! cast_all {
        ($buf:expr) => {
            $buf.iter()
                .map(|&v| num_traits::cast::<_, f64>(v).unwrap_or(f64::NAN))
                .collect()
        };
    }

    let data: Vec<f64> = match result {
        DecodingResult::F32(buf) => cast_all!(buf),
        DecodingResult::F64(buf) => buf,
        DecodingResult::U8(buf) => cast_all!(buf),
        DecodingResult::U16(buf) => cast_all!(buf),
        DecodingResult::U32(buf) => cast_all!(buf),
        DecodingResult::U64(buf) => cast_all!(buf),
        DecodingResult::I8(buf) => cast_all!(buf),
        DecodingResult::I16(buf) => cast_all!(buf),
        DecodingResult::I32(buf) => cast_all!(buf),
        DecodingResult::I64(buf) => cast_all!(buf),
        #[allow(unreachable_patterns)]
        _ => {
            return Err(Error::UnsupportedDataType(
                "unsupported TIFF sample format".to_string(),
            ))
        }
    };
    Ok(data)
}

/// Read the raster extent from ModelPixelScale + ModelTiepoint, or from a
/// rotation-free ModelTransformation matrix.
fn read_extent<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    width: usize,
    height: usize,
) -> Result<RasterExtent> {
    let scale = decoder.get_tag_f64_vec(tag(MODEL_PIXEL_SCALE)).ok();
    let tiepoint = decoder.get_tag_f64_vec(tag(MODEL_TIEPOINT)).ok();

    if let (Some(scale), Some(tiepoint)) = (&scale, &tiepoint) {
        if scale.len() >= 2 && tiepoint.len() >= 6 {
            // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
            let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
            let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
            return RasterExtent::from_origin(
                origin_x, origin_y, scale[0], scale[1], width, height,
            );
        }
    }

    if let Ok(t) = decoder.get_tag_f64_vec(tag(MODEL_TRANSFORMATION)) {
        if t.len() >= 16 {
            if t[1].abs() > 1e-12 || t[4].abs() > 1e-12 {
                return Err(Error::UnsupportedDataType(
                    "rotated rasters are not supported".into(),
                ));
            }
            return RasterExtent::from_origin(t[3], t[7], t[0], t[5], width, height);
        }
    }

    Err(Error::UnsupportedDataType("no georeferencing tags".into()))
}

/// True for 32-bit IEEE float samples. The GDAL_NODATA text is parsed as
/// f64, so it has to be rounded the same way the stored samples were.
fn stores_f32<R: Read + Seek>(decoder: &mut Decoder<R>) -> bool {
    let first = |values: Option<Vec<u16>>| values.and_then(|v| v.first().copied());
    let format = decoder
        .find_tag_unsigned_vec::<u16>(Tag::SampleFormat)
        .ok()
        .and_then(first);
    let bits = decoder
        .find_tag_unsigned_vec::<u16>(Tag::BitsPerSample)
        .ok()
        .and_then(first);
    format == Some(SAMPLE_FORMAT_IEEEFP) && bits == Some(32)
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    decoder
        .get_tag_ascii_string(tag(GDAL_NODATA))
        .ok()
        .and_then(|s| s.trim_matches(|c: char| c == '\0' || c.is_whitespace()).parse().ok())
}

fn read_units<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<String> {
    decoder
        .get_tag_ascii_string(tag(GDAL_METADATA))
        .ok()
        .and_then(|xml| units_from_gdal_metadata(&xml))
}

/// Pull the band unit out of a GDAL_METADATA XML block
fn units_from_gdal_metadata(xml: &str) -> Option<String> {
    xml.split("<Item").skip(1).find_map(|item| {
        let (attrs, rest) = item.split_once('>')?;
        let attrs = attrs.to_ascii_lowercase();
        if !attrs.contains("role=\"unittype\"") && !attrs.contains("name=\"units\"") {
            return None;
        }
        let (value, _) = rest.split_once("</Item>")?;
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    /// Rows per strip (encoder default when `None`)
    pub rows_per_strip: Option<u32>,
}

/// Write a grid to a Float32 GeoTIFF file
pub fn write_geotiff<P: AsRef<Path>>(
    grid: &GridRaster,
    path: P,
    options: Option<GeoTiffOptions>,
) -> Result<()> {
    let file = File::create(path.as_ref())?;
    encode_geotiff(grid, file, options.unwrap_or_default())
}

/// Write a grid to an in-memory Float32 GeoTIFF buffer
pub fn write_geotiff_to_buffer(
    grid: &GridRaster,
    options: Option<GeoTiffOptions>,
) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_geotiff(grid, Cursor::new(&mut buf), options.unwrap_or_default())?;
    Ok(buf)
}

fn encode_geotiff<W: Write + Seek>(
    grid: &GridRaster,
    writer: W,
    options: GeoTiffOptions,
) -> Result<()> {
    let encode_error = |what: &str, e: tiff::TiffError| Error::RasterFormat {
        path: PathBuf::from("<output>"),
        reason: format!("{}: {}", what, e),
    };

    let mut encoder = TiffEncoder::new(writer).map_err(|e| encode_error("encoder", e))?;

    let extent = *grid.extent();
    let (px, py) = extent.pixel_size();
    let data: Vec<f32> = grid.data().iter().map(|&v| v as f32).collect();

    let mut image = encoder
        .new_image::<Gray32Float>(extent.width as u32, extent.height as u32)
        .map_err(|e| encode_error("new image", e))?;

    if let Some(rows) = options.rows_per_strip {
        image
            .rows_per_strip(rows)
            .map_err(|e| encode_error("rows per strip", e))?;
    }

    let scale = vec![px, py, 0.0];
    image
        .encoder()
        .write_tag(tag(MODEL_PIXEL_SCALE), scale.as_slice())
        .map_err(|e| encode_error("pixel scale tag", e))?;

    let tiepoint = vec![0.0, 0.0, 0.0, extent.min_x, extent.max_y, 0.0];
    image
        .encoder()
        .write_tag(tag(MODEL_TIEPOINT), tiepoint.as_slice())
        .map_err(|e| encode_error("tiepoint tag", e))?;

    let geokeys: Vec<u16> = vec![
        1, 1, 0, 3, // version 1.1.0, 3 keys
        1024, 0, 1, 2, // GTModelTypeGeoKey = Geographic
        1025, 0, 1, 1, // GTRasterTypeGeoKey = PixelIsArea
        2048, 0, 1, 4326, // GeographicTypeGeoKey = WGS 84
    ];
    image
        .encoder()
        .write_tag(tag(GEO_KEY_DIRECTORY), geokeys.as_slice())
        .map_err(|e| encode_error("geokey tag", e))?;

    if let Some(nodata) = grid.nodata() {
        let text = nodata.to_string();
        image
            .encoder()
            .write_tag(tag(GDAL_NODATA), text.as_str())
            .map_err(|e| encode_error("nodata tag", e))?;
    }

    if let Some(units) = grid.units() {
        let xml = format!(
            concat!(
                "<GDALMetadata>",
                "<Item name=\"UNITTYPE\" sample=\"0\" role=\"unittype\">{}</Item>",
                "</GDALMetadata>"
            ),
            units
        );
        image
            .encoder()
            .write_tag(tag(GDAL_METADATA), xml.as_str())
            .map_err(|e| encode_error("metadata tag", e))?;
    }

    image
        .write_data(&data)
        .map_err(|e| encode_error("image data", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::BoundingBox;
    use approx::assert_relative_eq;

    fn sample_grid() -> GridRaster {
        let extent = RasterExtent::new(BoundingBox::new(-10.0, 30.0, 10.0, 50.0), 40, 20).unwrap();
        GridRaster::from_fn(extent, |col, row| (row * 100 + col) as f64)
            .with_nodata(Some(-9999.0))
            .with_units("kWh/m2/day")
    }

    fn open_buffer(
        grid: &GridRaster,
        rows_per_strip: Option<u32>,
    ) -> RasterHandle<Cursor<Vec<u8>>> {
        let buf = write_geotiff_to_buffer(grid, Some(GeoTiffOptions { rows_per_strip })).unwrap();
        RasterHandle::from_reader(Cursor::new(buf)).unwrap()
    }

    #[test]
    fn test_metadata_roundtrip() {
        let handle = open_buffer(&sample_grid(), None);
        let e = handle.extent();
        assert_eq!((e.width, e.height), (40, 20));
        assert_relative_eq!(e.min_x, -10.0, epsilon = 1e-9);
        assert_relative_eq!(e.max_x, 10.0, epsilon = 1e-9);
        assert_relative_eq!(e.min_y, 30.0, epsilon = 1e-9);
        assert_relative_eq!(e.max_y, 50.0, epsilon = 1e-9);
        assert_eq!(handle.nodata(), Some(-9999.0));
        assert_eq!(handle.units(), Some("kWh/m2/day"));
    }

    #[test]
    fn test_window_spanning_several_strips() {
        let grid = sample_grid();
        let mut handle = open_buffer(&grid, Some(3));
        let w = handle.read_window(PixelWindow::new(5, 8, 2, 10)).unwrap();
        for row in 2..=10 {
            for col in 5..=8 {
                assert_eq!(w.get(col, row), Some((row * 100 + col) as f64));
            }
        }
    }

    #[test]
    fn test_window_is_clamped() {
        let mut handle = open_buffer(&sample_grid(), Some(4));
        let w = handle.read_window(PixelWindow::new(35, 60, -5, 1)).unwrap();
        assert_eq!(w.window(), PixelWindow::new(35, 39, 0, 1));
        assert_eq!(w.get(39, 1), Some(139.0));
    }

    #[test]
    fn test_empty_window_fails() {
        let mut handle = open_buffer(&sample_grid(), None);
        assert!(matches!(
            handle.read_window(PixelWindow::new(50, 60, 0, 1)),
            Err(Error::InvalidWindow { .. })
        ));
    }

    #[test]
    fn test_open_missing_file() {
        let err = RasterHandle::open("/definitely/not/here.tif").err().unwrap();
        assert!(matches!(err, Error::RasterNotFound { .. }));
    }

    #[test]
    fn test_open_non_tiff_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"this is not a tiff").unwrap();
        let err = RasterHandle::open(tmp.path()).err().unwrap();
        assert!(matches!(err, Error::RasterFormat { .. }));
    }

    #[test]
    fn test_file_roundtrip() {
        let tmp = tempfile::NamedTempFile::with_suffix(".tif").unwrap();
        write_geotiff(&sample_grid(), tmp.path(), None).unwrap();
        let mut handle = RasterHandle::open(tmp.path()).unwrap();
        let w = handle.read_window(handle.extent().full_window()).unwrap();
        assert_eq!(w.get(17, 13), Some(1317.0));
    }

    #[test]
    fn test_fractional_nodata_matches_float32_samples() {
        let extent = RasterExtent::new(BoundingBox::new(0.0, 0.0, 4.0, 2.0), 4, 2).unwrap();
        let grid = GridRaster::filled(extent, -99.9).with_nodata(Some(-99.9));
        let mut handle = open_buffer(&grid, None);

        let nodata = handle.nodata().unwrap();
        assert_eq!(nodata, -99.9f32 as f64);
        let w = handle.read_window(extent.full_window()).unwrap();
        assert_eq!(w.get(2, 1), Some(nodata));
    }

    /// Little-endian tiled Float32 GeoTIFF. The encoder only writes strips.
    fn tiled_geotiff(grid: &GridRaster, tile: u32) -> Vec<u8> {
        let extent = *grid.extent();
        let (width, height) = (extent.width as u32, extent.height as u32);
        let (px, py) = extent.pixel_size();
        let le32 = |v: &[u32]| v.iter().flat_map(|x| x.to_le_bytes()).collect::<Vec<u8>>();
        let le64 = |v: &[f64]| v.iter().flat_map(|x| x.to_le_bytes()).collect::<Vec<u8>>();
        let short = |v: u16| v.to_le_bytes().to_vec();

        let mut out = vec![b'I', b'I', 42, 0, 0, 0, 0, 0];
        let mut offsets = Vec::new();
        for ty in 0..height.div_ceil(tile) {
            for tx in 0..width.div_ceil(tile) {
                offsets.push(out.len() as u32);
                for r in 0..tile {
                    for c in 0..tile {
                        let col = (tx * tile + c) as usize;
                        let row = (ty * tile + r) as usize;
                        let v = grid.get(col, row).unwrap_or(0.0) as f32;
                        out.extend_from_slice(&v.to_le_bytes());
                    }
                }
            }
        }
        let counts = vec![tile * tile * 4; offsets.len()];
        let n = offsets.len() as u32;

        // (tag, field type, count, value bytes)
        let mut entries: Vec<(u16, u16, u32, Vec<u8>)> = vec![
            (256, 4, 1, le32(&[width])),
            (257, 4, 1, le32(&[height])),
            (258, 3, 1, short(32)),
            (259, 3, 1, short(1)),
            (262, 3, 1, short(1)),
            (277, 3, 1, short(1)),
            (322, 4, 1, le32(&[tile])),
            (323, 4, 1, le32(&[tile])),
            (324, 4, n, le32(&offsets)),
            (325, 4, n, le32(&counts)),
            (339, 3, 1, short(SAMPLE_FORMAT_IEEEFP)),
            (MODEL_PIXEL_SCALE, 12, 3, le64(&[px, py, 0.0])),
            (MODEL_TIEPOINT, 12, 6, le64(&[0.0, 0.0, 0.0, extent.min_x, extent.max_y, 0.0])),
        ];
        for entry in entries.iter_mut() {
            if entry.3.len() > 4 {
                let offset = out.len() as u32;
                out.extend_from_slice(&entry.3);
                entry.3 = offset.to_le_bytes().to_vec();
            } else {
                entry.3.resize(4, 0);
            }
        }

        let ifd = out.len() as u32;
        out[4..8].copy_from_slice(&ifd.to_le_bytes());
        out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for (tag, kind, count, value) in &entries {
            out.extend_from_slice(&tag.to_le_bytes());
            out.extend_from_slice(&kind.to_le_bytes());
            out.extend_from_slice(&count.to_le_bytes());
            out.extend_from_slice(value);
        }
        out.extend_from_slice(&0u32.to_le_bytes());
        out
    }

    #[test]
    fn test_window_spanning_several_tiles() {
        let grid = sample_grid();
        let mut handle = RasterHandle::from_reader(Cursor::new(tiled_geotiff(&grid, 16))).unwrap();
        assert_relative_eq!(handle.extent().min_x, -10.0, epsilon = 1e-9);
        assert_relative_eq!(handle.extent().max_y, 50.0, epsilon = 1e-9);

        // 40 x 20 in 16 x 16 tiles: the window touches all six, padded edges included
        let w = handle.read_window(PixelWindow::new(10, 39, 5, 19)).unwrap();
        for row in 5..=19 {
            for col in 10..=39 {
                assert_eq!(w.get(col, row), Some((row * 100 + col) as f64));
            }
        }
    }

    #[test]
    fn test_multiband_returns_first_band() {
        use tiff::encoder::colortype::RGB32Float;

        let extent = RasterExtent::new(BoundingBox::new(0.0, 0.0, 6.0, 4.0), 6, 4).unwrap();
        let data: Vec<f32> = (0..24).flat_map(|i| [i as f32, -1.0, -2.0]).collect();

        let mut buf = Vec::new();
        {
            let mut encoder = TiffEncoder::new(Cursor::new(&mut buf)).unwrap();
            let mut image = encoder.new_image::<RGB32Float>(6, 4).unwrap();
            image.rows_per_strip(3).unwrap();
            let scale = [1.0f64, 1.0, 0.0];
            let tiepoint = [0.0f64, 0.0, 0.0, 0.0, 4.0, 0.0];
            image.encoder().write_tag(tag(MODEL_PIXEL_SCALE), &scale[..]).unwrap();
            image.encoder().write_tag(tag(MODEL_TIEPOINT), &tiepoint[..]).unwrap();
            image.write_data(&data).unwrap();
        }

        let mut handle = RasterHandle::from_reader(Cursor::new(buf)).unwrap();
        assert_eq!(*handle.extent(), extent);
        let w = handle.read_window(PixelWindow::new(1, 4, 1, 3)).unwrap();
        for row in 1..=3 {
            for col in 1..=4 {
                assert_eq!(w.get(col, row), Some((row * 6 + col) as f64));
            }
        }
    }

    #[test]
    fn test_units_parsing() {
        let xml = r#"<GDALMetadata><Item name="STATISTICS_MEAN" sample="0">5</Item><Item name="UNITTYPE" sample="0" role="unittype">W/m2</Item></GDALMetadata>"#;
        assert_eq!(units_from_gdal_metadata(xml), Some("W/m2".to_string()));
        assert_eq!(units_from_gdal_metadata("<GDALMetadata></GDALMetadata>"), None);
    }
}
