use crate::surface::PixelLayout;

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    #[error("unsupported pixel format: {0:?}")]
    UnsupportedPixelFormat(PixelLayout),

    #[error("texture creation failed: {0}")]
    TextureCreationFailed(String),

    /// Main-frame load failure reported by the browser engine. Fatal to the loop.
    #[error("load error {code} for '{url}'")]
    LoadError { code: i32, url: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BridgeError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn texture_creation(msg: impl Into<String>) -> Self {
        Self::TextureCreationFailed(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    pub fn load(code: i32, url: impl Into<String>) -> Self {
        Self::LoadError {
            code,
            url: url.into(),
        }
    }

    /// Errors that only cost the current frame; the render loop keeps going.
    pub fn is_frame_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedPixelFormat(_) | Self::TextureCreationFailed(_) | Self::Validation(_)
        )
    }
}
