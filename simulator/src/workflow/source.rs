use crate::generator::scene::{build_height_packet, build_scan_frame, SceneConfig};
use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;

/// One complete raw input, as handed to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Scan(String),
    Height(Vec<u8>),
}

/// Recorded inputs, one raw frame or packet per file.
pub struct FileSource {
    pending: VecDeque<Recorded>,
}

enum Recorded {
    Scan(PathBuf),
    Height(PathBuf),
}

impl FileSource {
    pub fn new(scans: Vec<PathBuf>, heights: Vec<PathBuf>) -> Self {
        let pending = scans
            .into_iter()
            .map(Recorded::Scan)
            .chain(heights.into_iter().map(Recorded::Height))
            .collect();
        Self { pending }
    }
}

impl Iterator for FileSource {
    type Item = anyhow::Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = match self.pending.pop_front()? {
            Recorded::Scan(path) => fs::read_to_string(&path)
                .map(Frame::Scan)
                .with_context(|| format!("reading scan frame {}", path.display())),
            Recorded::Height(path) => fs::read(&path)
                .map(Frame::Height)
                .with_context(|| format!("reading height packet {}", path.display())),
        };
        Some(frame)
    }
}

/// Generated inputs: each cycle yields a scan frame followed by a height packet.
pub struct SyntheticSource {
    scene: SceneConfig,
    config: WorkflowConfig,
    cycles: u64,
    next: u64,
    pending_height: bool,
}

impl SyntheticSource {
    pub fn new(scene: SceneConfig, config: WorkflowConfig, cycles: u64) -> Self {
        Self {
            scene,
            config,
            cycles,
            next: 0,
            pending_height: false,
        }
    }
}

impl Iterator for SyntheticSource {
    type Item = anyhow::Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pending_height {
            self.pending_height = false;
            let cycle = self.next;
            self.next += 1;
            return Some(
                build_height_packet(&self.scene, &self.config.height, cycle).map(Frame::Height),
            );
        }
        if self.next >= self.cycles {
            return None;
        }
        self.pending_height = true;
        Some(build_scan_frame(&self.scene, &self.config.scan, self.next).map(Frame::Scan))
    }
}
