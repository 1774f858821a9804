//! Image loading for texture data

use std::path::Path;

use crate::assets::AssetError;

/// Decoded RGBA8 pixels ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Row-major RGBA pixels
    pub pixels: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl ImageData {
    /// Decode an image file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path = path.as_ref();
        log::debug!("Loading image from: {:?}", path);

        let image = image::open(path)
            .map_err(|e| AssetError::LoadFailed(format!("{}: {}", path.display(), e)))?;
        let data = Self::from_rgba(image.to_rgba8());

        log::info!("Loaded image {}x{} from {:?}", data.width, data.height, path);
        Ok(data)
    }

    /// Decode an in-memory image file
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| AssetError::LoadFailed(format!("image from memory: {e}")))?;
        Ok(Self::from_rgba(image.to_rgba8()))
    }

    /// Single-color image
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = width as usize * height as usize;
        Self {
            pixels: color.repeat(pixel_count),
            width,
            height,
        }
    }

    /// Size of the pixel data in bytes
    pub fn size_bytes(&self) -> usize {
        self.pixels.len()
    }

    /// Number of levels in a full mip chain: floor(log2(max(w, h))) + 1
    pub fn full_mip_levels(&self) -> u32 {
        let largest = self.width.max(self.height).max(1);
        u32::BITS - largest.leading_zeros()
    }

    fn from_rgba(image: image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            pixels: image.into_raw(),
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_color_image() {
        let img = ImageData::solid_color(4, 4, [255, 0, 0, 255]);
        assert_eq!(img.size_bytes(), 4 * 4 * 4);
        assert_eq!(&img.pixels[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_full_mip_levels() {
        assert_eq!(ImageData::solid_color(1, 1, [0; 4]).full_mip_levels(), 1);
        assert_eq!(ImageData::solid_color(256, 256, [0; 4]).full_mip_levels(), 9);
        assert_eq!(ImageData::solid_color(512, 100, [0; 4]).full_mip_levels(), 10);
        assert_eq!(ImageData::solid_color(300, 17, [0; 4]).full_mip_levels(), 9);
    }

    #[test]
    fn test_png_bytes_decode_to_rgba() {
        let source = image::RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]));
        let mut encoded = std::io::Cursor::new(Vec::new());
        source
            .write_to(&mut encoded, image::ImageFormat::Png)
            .expect("encode png");

        let img = ImageData::from_bytes(encoded.get_ref()).expect("decode png");
        assert_eq!((img.width, img.height), (3, 2));
        assert_eq!(&img.pixels[0..4], &[10, 20, 30, 255]);
    }
}
