use ndarray::ArrayView3;

/// A decoded image: contiguous RGB bytes in row-major order.
///
/// Decoding and encoding happen at the I/O boundary only; detection,
/// cropping and thumbnailing work on this buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl Raster {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (
                self.height as usize,
                self.width as usize,
                self.channels as usize,
            ),
            &self.data,
        )
        .expect("Raster data length must match dimensions")
    }

    /// Copies the pixels in `[x1, x2) × [y1, y2)`.
    ///
    /// Callers clamp first; the rectangle must lie inside the image.
    pub fn crop(&self, x1: u32, y1: u32, x2: u32, y2: u32) -> Raster {
        debug_assert!(x1 <= x2 && x2 <= self.width, "crop x-range out of bounds");
        debug_assert!(y1 <= y2 && y2 <= self.height, "crop y-range out of bounds");

        let channels = self.channels as usize;
        let row_bytes = self.width as usize * channels;
        let span = (x2 - x1) as usize * channels;
        let mut data = Vec::with_capacity(span * (y2 - y1) as usize);
        for row in y1 as usize..y2 as usize {
            let start = row * row_bytes + x1 as usize * channels;
            data.extend_from_slice(&self.data[start..start + span]);
        }
        Raster::new(data, x2 - x1, y2 - y1, self.channels)
    }
}
