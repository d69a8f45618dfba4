//! Texture loading utilities

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

/// Load a texture from a file path
pub fn load_texture(path: impl AsRef<Path>) -> Result<TextureData> {
    let path = path.as_ref();
    log::info!("Loading texture: {:?}", path);

    let img = image::open(path).with_context(|| format!("Failed to load texture: {:?}", path))?;

    Ok(TextureData::from_image(img))
}

/// Raw texture data ready for GPU upload
#[derive(Debug)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub format: wgpu::TextureFormat,
}

impl TextureData {
    pub fn from_image(img: DynamicImage) -> Self {
        let (width, height) = img.dimensions();
        let rgba = img.to_rgba8();

        Self {
            width,
            height,
            data: rgba.into_raw(),
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
        }
    }

    /// Single-texel texture of one color
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            data: rgba.to_vec(),
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
        }
    }

    /// Create GPU texture from this data
    pub fn create_texture(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
    ) -> wgpu::Texture {
        let size = wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &self.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.width),
                rows_per_image: Some(self.height),
            },
            size,
        );

        texture
    }
}

/// Outcome of a background texture load as seen by the scene
#[derive(Debug, Clone)]
pub enum TextureStatus {
    Pending,
    Ready(Arc<TextureData>),
    /// Load failed; the flat fallback stays for the rest of the session
    Failed,
}

/// Decodes an image on a background thread and hands it over once, polled
/// from the frame loop without blocking.
pub struct TextureLoader {
    path: PathBuf,
    receiver: Option<Receiver<Result<TextureData>>>,
    status: TextureStatus,
}

impl TextureLoader {
    pub fn spawn(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (sender, receiver) = mpsc::channel();
        let thread_path = path.clone();
        thread::spawn(move || {
            let _ = sender.send(load_texture(&thread_path));
        });

        Self {
            path,
            receiver: Some(receiver),
            status: TextureStatus::Pending,
        }
    }

    /// Check for a finished load. Returns true the one time the status
    /// changes.
    pub fn poll(&mut self) -> bool {
        let Some(receiver) = &self.receiver else {
            return false;
        };

        let result = match receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => Err(anyhow::anyhow!("Texture loader thread exited")),
        };
        self.receiver = None;

        self.status = match result {
            Ok(texture) => {
                log::info!(
                    "Earth texture ready ({}x{}) from {:?}",
                    texture.width,
                    texture.height,
                    self.path
                );
                TextureStatus::Ready(Arc::new(texture))
            }
            Err(e) => {
                log::warn!("Earth texture unavailable, keeping flat color: {:#}", e);
                TextureStatus::Failed
            }
        };
        true
    }

    pub fn status(&self) -> &TextureStatus {
        &self.status
    }
}

/// Create a sampler for textures
pub fn create_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}
