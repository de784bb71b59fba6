use crate::shared::raster::Raster;

/// Decodes JPEG/PNG/... bytes into an RGB raster.
pub fn decode_rgb(bytes: &[u8]) -> Result<Raster, image::ImageError> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(Raster::new(rgb.into_raw(), width, height, 3))
}

#[cfg(test)]
pub(crate) fn encode_png(raster: &Raster) -> Vec<u8> {
    let img = image::RgbImage::from_raw(raster.width(), raster.height(), raster.data().to_vec())
        .unwrap();
    let mut bytes = std::io::Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
    bytes.into_inner()
}
