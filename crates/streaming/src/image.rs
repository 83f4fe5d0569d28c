use bytes::Bytes;

/// Raster tile payload format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileFormat {
    Png,
    Jpeg,
    Webp,
    Unknown,
}

impl TileFormat {
    pub fn from_content_type(content_type: &str) -> Self {
        // Providers append charset or other parameters; match the media type only.
        let media = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim();
        match media {
            "image/png" => Self::Png,
            "image/jpeg" | "image/jpg" => Self::Jpeg,
            "image/webp" => Self::Webp,
            _ => Self::Unknown,
        }
    }

    pub fn from_url(url: &str) -> Self {
        let path = url.split('?').next().unwrap_or(url);
        match path.rsplit('.').next().map(|e| e.to_ascii_lowercase()) {
            Some(ext) if ext == "png" => Self::Png,
            Some(ext) if ext == "jpg" || ext == "jpeg" => Self::Jpeg,
            Some(ext) if ext == "webp" => Self::Webp,
            _ => Self::Unknown,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Unknown => "application/octet-stream",
        }
    }
}

/// A fetched tile texture, ready for the rendering adapter to upload.
///
/// Owned by exactly one `TileQuad` once placed.
#[derive(Debug, Clone, PartialEq)]
pub struct TileImage {
    pub data: Bytes,
    pub format: TileFormat,
}

impl TileImage {
    pub fn new(data: Bytes, format: TileFormat) -> Self {
        Self { data, format }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
