//! Render surfaces the scene presents frames to

use super::scene::{SceneError, SceneFrame};

/// Host-side target for finished frames.
///
/// The scene manager binds one surface at mount, presents a snapshot every
/// tick and releases it on dispose.
pub trait RenderSurface {
    fn present(&mut self, frame: &SceneFrame) -> Result<(), SceneError>;

    /// Free host resources; no frames are presented afterwards
    fn release(&mut self);
}

#[cfg(test)]
pub use headless::{HeadlessSurface, SurfaceLog};

#[cfg(test)]
mod headless {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    /// What a headless surface has seen, shared with the test
    #[derive(Default)]
    pub struct SurfaceLog {
        pub frames_presented: usize,
        pub last_frame: Option<SceneFrame>,
        pub released: bool,
    }

    /// Records frames instead of drawing them
    pub struct HeadlessSurface {
        log: Arc<Mutex<SurfaceLog>>,
    }

    impl HeadlessSurface {
        pub fn new() -> (Self, Arc<Mutex<SurfaceLog>>) {
            let log = Arc::new(Mutex::new(SurfaceLog::default()));
            (Self { log: Arc::clone(&log) }, log)
        }
    }

    impl RenderSurface for HeadlessSurface {
        fn present(&mut self, frame: &SceneFrame) -> Result<(), SceneError> {
            let mut log = self.log.lock();
            if log.released {
                return Err(SceneError::Surface("present after release".into()));
            }
            log.frames_presented += 1;
            log.last_frame = Some(frame.clone());
            Ok(())
        }

        fn release(&mut self) {
            self.log.lock().released = true;
        }
    }
}
