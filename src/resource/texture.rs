use std::fmt;
use std::rc::Rc;

use failure::Fail;
use log::debug;
use serde_derive::{Deserialize, Serialize};

use crate::driver::{DropObject, Driver, DriverError, ObjectId};
use crate::fixed_buffer::SizeMismatch;
use crate::resource::{Resource, ResourceKind};

/// The format of the texels of a [Texture], with 8 bits per channel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PixelFormat {
    R8,
    Rg8,
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    /// Returns the format that stores `channels` 8-bit channels per texel.
    ///
    /// # Example
    ///
    /// ```
    /// use retained_gl::resource::{PixelFormat, UnsupportedChannelCount};
    ///
    /// assert_eq!(PixelFormat::from_channel_count(3), Ok(PixelFormat::Rgb8));
    /// assert_eq!(PixelFormat::from_channel_count(5), Err(UnsupportedChannelCount(5)));
    /// ```
    pub fn from_channel_count(channels: usize) -> Result<Self, UnsupportedChannelCount> {
        match channels {
            1 => Ok(PixelFormat::R8),
            2 => Ok(PixelFormat::Rg8),
            3 => Ok(PixelFormat::Rgb8),
            4 => Ok(PixelFormat::Rgba8),
            n => Err(UnsupportedChannelCount(n)),
        }
    }

    pub fn channel_count(&self) -> usize {
        match self {
            PixelFormat::R8 => 1,
            PixelFormat::Rg8 => 2,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }

    pub(crate) fn gl_format(&self) -> u32 {
        match self {
            PixelFormat::R8 => glow::RED,
            PixelFormat::Rg8 => glow::RG,
            PixelFormat::Rgb8 => glow::RGB,
            PixelFormat::Rgba8 => glow::RGBA,
        }
    }

    pub(crate) fn gl_internal_format(&self) -> u32 {
        match self {
            PixelFormat::R8 => glow::R8,
            PixelFormat::Rg8 => glow::RG8,
            PixelFormat::Rgb8 => glow::RGB8,
            PixelFormat::Rgba8 => glow::RGBA8,
        }
    }
}

/// Error returned by [PixelFormat::from_channel_count] for a channel count other than `1` to `4`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
#[fail(display = "images with {} channels are not supported", _0)]
pub struct UnsupportedChannelCount(pub usize);

/// A 2D texture.
///
/// A new texture has no image storage and reports a size of 0 by 0 texels.
pub struct Texture {
    id: ObjectId,
    width: u32,
    height: u32,
    format: PixelFormat,
    driver: Rc<dyn Driver>,
}

impl Texture {
    pub fn new(driver: &Rc<dyn Driver>) -> Result<Self, DriverError> {
        let id = driver.create_texture()?;

        debug!("Created texture {}", id);

        Ok(Texture {
            id,
            width: 0,
            height: 0,
            format: PixelFormat::Rgba8,
            driver: driver.clone(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Replaces the image of the texture with `data`, which holds `height` tightly packed rows of
    /// `width` texels in the `format`.
    ///
    /// Returns [DriverError::SizeMismatch] without touching the texture if the length of `data`
    /// does not match the dimensions.
    pub fn upload(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        data: &[u8],
    ) -> Result<(), DriverError> {
        let expected = width as usize * height as usize * format.channel_count();

        if data.len() != expected {
            return Err(SizeMismatch {
                expected,
                actual: data.len(),
            }
            .into());
        }

        self.image(width, height, format, Some(data))
    }

    /// Replaces the image of the texture with uninitialized storage of the given dimensions.
    pub fn allocate(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<(), DriverError> {
        self.image(width, height, format, None)
    }

    fn image(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Option<&[u8]>,
    ) -> Result<(), DriverError> {
        self.driver
            .texture_image(self.id, width, height, format, data)?;

        self.width = width;
        self.height = height;
        self.format = format;

        Ok(())
    }
}

impl Resource for Texture {
    const KIND: ResourceKind = ResourceKind::Texture;

    fn id(&self) -> ObjectId {
        self.id
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .finish()
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.driver.drop_object(DropObject::Texture(self.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::driver::RecordingDriver;

    #[test]
    fn test_from_channel_count() {
        for channels in 1..=4 {
            assert_eq!(
                PixelFormat::from_channel_count(channels)
                    .unwrap()
                    .channel_count(),
                channels
            );
        }

        assert_eq!(
            PixelFormat::from_channel_count(0),
            Err(UnsupportedChannelCount(0))
        );
        assert_eq!(
            UnsupportedChannelCount(7).to_string(),
            "images with 7 channels are not supported"
        );
    }

    #[test]
    fn test_new_texture_is_empty() {
        let driver: Rc<dyn Driver> = Rc::new(RecordingDriver::new());
        let texture = Texture::new(&driver).unwrap();

        assert_eq!((texture.width(), texture.height()), (0, 0));
    }

    #[test]
    fn test_upload() {
        let driver: Rc<dyn Driver> = Rc::new(RecordingDriver::new());
        let mut texture = Texture::new(&driver).unwrap();

        texture.upload(2, 3, PixelFormat::Rgb8, &[0; 18]).unwrap();

        assert_eq!(
            (texture.width(), texture.height(), texture.format()),
            (2, 3, PixelFormat::Rgb8)
        );

        let result = texture.upload(4, 4, PixelFormat::Rg8, &[0; 31]);

        assert_eq!(
            result,
            Err(DriverError::SizeMismatch(SizeMismatch {
                expected: 32,
                actual: 31
            }))
        );
        assert_eq!(texture.width(), 2);
    }
}
