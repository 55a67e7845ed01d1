pub type TextureId = u32;

/// Pixel layout of a texture's raw data. The discriminant is the value
/// written into device texture records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum TextureFormat {
    Rgba8 = 0,
    Rgba16 = 1,
    Rgba32 = 2,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Rgba8 => 4,
            TextureFormat::Rgba16 => 8,
            TextureFormat::Rgba32 => 16,
        }
    }
}

/// Raw pixel buffer with dimensions and format.
#[derive(Debug, Clone)]
pub struct Texture {
    width: u32,
    height: u32,
    format: TextureFormat,
    data: Vec<u8>,
    dirty: bool,
}

impl Texture {
    pub fn new(width: u32, height: u32, format: TextureFormat, data: Vec<u8>) -> Texture {
        debug_assert_eq!(
            data.len(),
            width as usize * height as usize * format.bytes_per_pixel(),
            "texture data length must match dimensions and format"
        );
        Texture {
            width,
            height,
            format,
            data,
            dirty: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size_in_bytes(&self) -> usize {
        self.data.len()
    }

    pub fn set_data(&mut self, data: Vec<u8>) {
        debug_assert_eq!(
            data.len(),
            self.width as usize * self.height as usize * self.format.bytes_per_pixel(),
            "texture data length must match dimensions and format"
        );
        self.data = data;
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }
}
