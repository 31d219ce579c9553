//! Turns an asset reference into a [`LoadedEnvironment`].
//!
//! Loads run off the frame loop and report back through a [`LoadTicket`]
//! that the caller polls once per frame. Progress arrives as byte counts
//! before the single terminal result. Dropping a ticket is how a caller stops
//! listening: the worker finishes (or notices the closed channel and stops
//! reading) and its result goes nowhere.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;

use image::RgbaImage;
use thiserror::Error;

const READ_CHUNK_BYTES: usize = 64 * 1024;
const MAX_REFLECTION_LEVELS: usize = 8;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("reading {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("decoding {asset}: {source}")]
    Decode {
        asset: String,
        #[source]
        source: image::ImageError,
    },
    #[error("{asset} decoded to an empty image")]
    EmptyImage { asset: String },
    #[error("starting loader worker for {asset}: {source}")]
    Worker {
        asset: String,
        #[source]
        source: io::Error,
    },
    #[error("loader for {asset} stopped before reporting a result")]
    Disconnected { asset: String },
    #[error("{asset} rejected: {reason}")]
    Rejected { asset: String, reason: String },
}

/// Equirectangular RGBA8 image, row 0 at the top (+Y).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquirectTexture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl EquirectTexture {
    pub fn from_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: image.into_raw(),
        }
    }

    /// Single-colour texture, handy as a stand-in before anything loads.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            pixels: rgba.repeat(count),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectionLevel {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Successively blurred copies of the panorama (each level half the size of
/// the previous one), plus the mean colour used as ambient light.
///
/// Level sizes follow the GPU mip chain rule `max(1, size >> level)`, so the
/// levels can be uploaded as mips 1.. of the base texture.
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectionData {
    levels: Vec<ReflectionLevel>,
    ambient: [f32; 3],
}

impl ReflectionData {
    pub fn prefilter(texture: &EquirectTexture, max_levels: usize) -> Self {
        let mut levels: Vec<ReflectionLevel> = Vec::new();
        let mut width = texture.width;
        let mut height = texture.height;
        while levels.len() < max_levels && (width > 1 || height > 1) {
            let source = levels.last().map_or(texture.pixels.as_slice(), |level| {
                level.pixels.as_slice()
            });
            let next = downsample_wrapped(source, width, height);
            width = next.width;
            height = next.height;
            levels.push(next);
        }

        let ambient = match levels.last() {
            Some(level) => mean_color(&level.pixels),
            None => mean_color(&texture.pixels),
        };

        Self { levels, ambient }
    }

    pub fn levels(&self) -> &[ReflectionLevel] {
        &self.levels
    }

    /// Mean colour in [0, 1] per channel.
    pub fn ambient_color(&self) -> [f32; 3] {
        self.ambient
    }
}

/// 2x2 box filter. Columns wrap around (the panorama is continuous in
/// longitude); rows clamp at the poles.
fn downsample_wrapped(source: &[u8], width: u32, height: u32) -> ReflectionLevel {
    let dst_width = (width / 2).max(1);
    let dst_height = (height / 2).max(1);
    let (src_w, src_h) = (width as usize, height as usize);
    let mut pixels = vec![0u8; dst_width as usize * dst_height as usize * 4];

    for dy in 0..dst_height as usize {
        let y0 = (dy * 2).min(src_h - 1);
        let y1 = (dy * 2 + 1).min(src_h - 1);
        for dx in 0..dst_width as usize {
            let x0 = (dx * 2) % src_w;
            let x1 = (dx * 2 + 1) % src_w;
            let dst_idx = (dy * dst_width as usize + dx) * 4;
            for channel in 0..4 {
                let sum: u32 = [(x0, y0), (x1, y0), (x0, y1), (x1, y1)]
                    .iter()
                    .map(|&(x, y)| source[(y * src_w + x) * 4 + channel] as u32)
                    .sum();
                pixels[dst_idx + channel] = ((sum + 2) / 4) as u8;
            }
        }
    }

    ReflectionLevel {
        width: dst_width,
        height: dst_height,
        pixels,
    }
}

fn mean_color(pixels: &[u8]) -> [f32; 3] {
    let count = pixels.len() / 4;
    if count == 0 {
        return [0.0; 3];
    }
    let mut sums = [0u64; 3];
    for pixel in pixels.chunks_exact(4) {
        for (sum, value) in sums.iter_mut().zip(pixel) {
            *sum += *value as u64;
        }
    }
    sums.map(|sum| sum as f32 / (count as f32 * 255.0))
}

/// A decoded panorama ready for the renderer.
#[derive(Debug, Clone)]
pub struct LoadedEnvironment {
    pub asset_ref: String,
    pub texture: Arc<EquirectTexture>,
    pub reflection: Arc<ReflectionData>,
    pub width: u32,
    pub height: u32,
    /// Bytes actually transferred for this asset.
    pub byte_size: u64,
}

impl LoadedEnvironment {
    pub fn from_texture(asset_ref: &str, texture: EquirectTexture, byte_size: u64) -> Self {
        let reflection = ReflectionData::prefilter(&texture, MAX_REFLECTION_LEVELS);
        Self {
            asset_ref: asset_ref.to_string(),
            width: texture.width,
            height: texture.height,
            texture: Arc::new(texture),
            reflection: Arc::new(reflection),
            byte_size,
        }
    }

    pub fn decode(asset_ref: &str, bytes: &[u8]) -> Result<Self, LoadError> {
        let image = image::load_from_memory(bytes)
            .map_err(|source| LoadError::Decode {
                asset: asset_ref.to_string(),
                source,
            })?
            .to_rgba8();
        if image.width() == 0 || image.height() == 0 {
            return Err(LoadError::EmptyImage {
                asset: asset_ref.to_string(),
            });
        }
        Ok(Self::from_texture(
            asset_ref,
            EquirectTexture::from_image(image),
            bytes.len() as u64,
        ))
    }
}

#[derive(Debug)]
pub enum LoadEvent {
    /// `transferred` bytes so far; `total` when the source knows its length.
    Progress { transferred: u64, total: Option<u64> },
    Finished(Result<LoadedEnvironment, LoadError>),
}

pub enum LoadPoll {
    Pending,
    Ready(Result<LoadedEnvironment, LoadError>),
}

/// Producer half of a load. Send failures mean nobody is listening anymore.
pub struct LoadSender {
    asset_ref: String,
    sender: Sender<LoadEvent>,
}

impl LoadSender {
    pub fn asset_ref(&self) -> &str {
        &self.asset_ref
    }

    pub fn progress(&self, transferred: u64, total: Option<u64>) -> bool {
        self.sender
            .send(LoadEvent::Progress { transferred, total })
            .is_ok()
    }

    pub fn finish(self, result: Result<LoadedEnvironment, LoadError>) -> bool {
        self.sender.send(LoadEvent::Finished(result)).is_ok()
    }
}

/// Consumer half of a load, polled once per frame.
pub struct LoadTicket {
    asset_ref: String,
    receiver: Receiver<LoadEvent>,
    resolved: bool,
}

pub fn load_channel(asset_ref: &str) -> (LoadSender, LoadTicket) {
    let (sender, receiver) = mpsc::channel();
    (
        LoadSender {
            asset_ref: asset_ref.to_string(),
            sender,
        },
        LoadTicket {
            asset_ref: asset_ref.to_string(),
            receiver,
            resolved: false,
        },
    )
}

impl LoadTicket {
    /// A ticket that resolves with `error` on its first poll.
    pub fn failed(asset_ref: &str, error: LoadError) -> Self {
        let (sender, ticket) = load_channel(asset_ref);
        sender.finish(Err(error));
        ticket
    }

    pub fn asset_ref(&self) -> &str {
        &self.asset_ref
    }

    /// Drains queued events, forwarding progress to `on_progress`. Resolves
    /// at most once; later polls stay `Pending`.
    pub fn poll<F>(&mut self, mut on_progress: F) -> LoadPoll
    where
        F: FnMut(u64, Option<u64>),
    {
        if self.resolved {
            return LoadPoll::Pending;
        }
        loop {
            match self.receiver.try_recv() {
                Ok(LoadEvent::Progress { transferred, total }) => on_progress(transferred, total),
                Ok(LoadEvent::Finished(result)) => {
                    self.resolved = true;
                    return LoadPoll::Ready(result);
                }
                Err(TryRecvError::Empty) => return LoadPoll::Pending,
                Err(TryRecvError::Disconnected) => {
                    self.resolved = true;
                    return LoadPoll::Ready(Err(LoadError::Disconnected {
                        asset: self.asset_ref.clone(),
                    }));
                }
            }
        }
    }
}

pub trait AssetLoader {
    fn load(&mut self, asset_ref: &str) -> LoadTicket;
}

/// Reads assets from disk on a worker thread per load and decodes them with
/// the `image` crate.
#[derive(Debug, Clone)]
pub struct FileAssetLoader {
    root: PathBuf,
}

impl FileAssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, asset_ref: &str) -> PathBuf {
        let path = Path::new(asset_ref);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl AssetLoader for FileAssetLoader {
    fn load(&mut self, asset_ref: &str) -> LoadTicket {
        let (sender, ticket) = load_channel(asset_ref);
        let path = self.resolve(asset_ref);
        log::debug!("loading {} from {}", asset_ref, path.display());

        let spawned = thread::Builder::new()
            .name(format!("pano_loader:{asset_ref}"))
            .spawn(move || {
                let result = read_and_decode(&path, &sender);
                if !sender.finish(result) {
                    log::trace!("nobody waiting for {}", path.display());
                }
            });

        match spawned {
            Ok(_) => ticket,
            Err(source) => LoadTicket::failed(
                asset_ref,
                LoadError::Worker {
                    asset: asset_ref.to_string(),
                    source,
                },
            ),
        }
    }
}

fn read_and_decode(path: &Path, sender: &LoadSender) -> Result<LoadedEnvironment, LoadError> {
    let io_error = |source: io::Error| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(io_error)?;
    let total = file.metadata().ok().map(|metadata| metadata.len());
    let mut bytes = Vec::with_capacity(total.unwrap_or(0) as usize);
    let mut chunk = vec![0u8; READ_CHUNK_BYTES];

    loop {
        let read = match file.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(io_error(err)),
        };
        bytes.extend_from_slice(&chunk[..read]);
        if !sender.progress(bytes.len() as u64, total) {
            // Superseded; skip the decode.
            return Err(LoadError::Disconnected {
                asset: sender.asset_ref().to_string(),
            });
        }
    }

    LoadedEnvironment::decode(sender.asset_ref(), &bytes)
}

/// Loader whose requests are completed by the host application: each call to
/// `load` queues a [`LoadSender`] that the host resolves whenever (and in
/// whatever order) its own fetch finishes.
#[derive(Default)]
pub struct HostLoader {
    requests: VecDeque<LoadSender>,
    history: Vec<String>,
}

impl HostLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oldest unclaimed request.
    pub fn next_request(&mut self) -> Option<LoadSender> {
        self.requests.pop_front()
    }

    /// Claims the oldest unclaimed request for `asset_ref`.
    pub fn take_request(&mut self, asset_ref: &str) -> Option<LoadSender> {
        let idx = self
            .requests
            .iter()
            .position(|request| request.asset_ref() == asset_ref)?;
        self.requests.remove(idx)
    }

    pub fn pending(&self) -> usize {
        self.requests.len()
    }

    /// Every asset reference ever requested, in request order.
    pub fn history(&self) -> &[String] {
        &self.history
    }
}

impl AssetLoader for HostLoader {
    fn load(&mut self, asset_ref: &str) -> LoadTicket {
        let (sender, ticket) = load_channel(asset_ref);
        self.history.push(asset_ref.to_string());
        self.requests.push_back(sender);
        ticket
    }
}
