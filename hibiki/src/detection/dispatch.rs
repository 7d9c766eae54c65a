pub const THREADS_PER_GROUP: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u64);

/// Bytes transferred back from a device buffer. `has_error` flags a failed
/// transfer; the bytes are meaningless in that case.
pub struct ReadBack {
    pub bytes: Vec<u8>,
    pub has_error: bool,
}

pub type ReadBackHandler = Box<dyn FnOnce(ReadBack)>;

/// A readback whose transfer has finished. The dispatch hands these back
/// from `drain_ready` instead of invoking the handlers itself, so callers
/// can run them without holding any dispatch borrow.
pub struct CompletedReadBack {
    pub result: ReadBack,
    pub handler: ReadBackHandler,
}

/// Named parameters of the compaction kernel.
pub struct NmsKernelArguments {
    pub boxes: BufferId,
    pub scores: BufferId,
    pub class_ids: BufferId,
    pub out_detections: BufferId,
    pub out_count: BufferId,
    pub candidate_count: u32,
    pub iou_threshold: f32,
    pub min_confidence: f32,
    pub max_keep: u32,
    pub scale_x: f32,
    pub scale_y: f32,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown buffer {0:?}")]
    UnknownBuffer(BufferId),
    #[error("buffer {0:?} is smaller than the written range")]
    BufferTooSmall(BufferId),
    #[error("kernel dispatch failed: {0}")]
    DispatchFailed(String),
}

/// Compute capability the compaction engine runs on. A single kernel is
/// assumed; real device backends encode it however they like, while the CPU
/// reference executes the kernel contract directly.
///
/// Readbacks complete asynchronously: `read_back` only registers the
/// transfer, and completions surface later through `drain_ready`.
pub trait ComputeDispatch {
    fn create_buffer(
        &mut self,
        byte_length: usize,
    ) -> BufferId;

    fn write_buffer(
        &mut self,
        buffer: BufferId,
        bytes: &[u8],
    ) -> Result<(), DispatchError>;

    fn release_buffer(
        &mut self,
        buffer: BufferId,
    );

    fn dispatch(
        &mut self,
        arguments: &NmsKernelArguments,
        thread_groups: usize,
    ) -> Result<(), DispatchError>;

    fn read_back(
        &mut self,
        buffer: BufferId,
        byte_length: usize,
        handler: ReadBackHandler,
    );

    fn drain_ready(&mut self) -> Vec<CompletedReadBack>;
}
