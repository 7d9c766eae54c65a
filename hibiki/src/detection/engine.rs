use std::{
    cell::{RefCell, RefMut},
    mem::size_of,
    rc::Rc,
};

use super::{
    dispatch::{
        BufferId, ComputeDispatch, DispatchError, NmsKernelArguments,
        ReadBack, THREADS_PER_GROUP,
    },
    params::NmsParams,
    types::{BoundingBox, Detection},
};

#[derive(Debug, thiserror::Error)]
pub enum NmsError {
    #[error("boxes, scores, and class ids must have equal lengths")]
    LengthMismatch,
    #[error("a compaction pass is already in flight")]
    AlreadyInFlight,
}

/// Candidate set for one compaction pass: parallel arrays of equal length.
pub struct NmsInput {
    boxes: Vec<BoundingBox>,
    scores: Vec<f32>,
    class_ids: Vec<i32>,
}

impl NmsInput {
    pub fn new(
        boxes: Vec<BoundingBox>,
        scores: Vec<f32>,
        class_ids: Vec<i32>,
    ) -> Result<Self, NmsError> {
        if boxes.len() != scores.len() || boxes.len() != class_ids.len() {
            return Err(NmsError::LengthMismatch);
        }
        Ok(Self {
            boxes,
            scores,
            class_ids,
        })
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

pub type NmsCompletion = Box<dyn FnOnce(Vec<Detection>)>;

struct InFlightPass {
    boxes: BufferId,
    scores: BufferId,
    class_ids: BufferId,
    out_detections: BufferId,
    out_count: BufferId,
    max_keep: usize,
    completion: Option<NmsCompletion>,
}

impl InFlightPass {
    fn buffers(&self) -> [BufferId; 5] {
        [
            self.boxes,
            self.scores,
            self.class_ids,
            self.out_detections,
            self.out_count,
        ]
    }
}

struct EngineState {
    dispatch: Box<dyn ComputeDispatch>,
    in_flight: Option<InFlightPass>,
}

/// Reduces a candidate detection set to a small non-overlapping one with a
/// single kernel pass and a two-stage asynchronous readback: the 4-byte
/// survivor count first, then exactly that many detection records. At most
/// one pass per engine may be in flight; a second `submit` is rejected with
/// `NmsError::AlreadyInFlight`.
///
/// Device failures never surface as errors: every failure path releases the
/// pass's buffers and resolves the completion with an empty list (a warning
/// is logged, since callers cannot tell that apart from zero detections).
/// Kept detections arrive in compaction order, not sorted by score.
pub struct NmsEngine {
    state: Rc<RefCell<EngineState>>,
}

impl NmsEngine {
    pub fn new(dispatch: Box<dyn ComputeDispatch>) -> Self {
        Self {
            state: Rc::new(RefCell::new(EngineState {
                dispatch,
                in_flight: None,
            })),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.state.borrow().in_flight.is_some()
    }

    pub fn submit(
        &self,
        input: &NmsInput,
        params: &NmsParams,
        completion: impl FnOnce(Vec<Detection>) + 'static,
    ) -> Result<(), NmsError> {
        let mut state = self.state.borrow_mut();
        if state.in_flight.is_some() {
            return Err(NmsError::AlreadyInFlight);
        }

        let count = input.len();
        let max_keep = params.max_keep.max(1);

        let dispatch = &mut state.dispatch;
        let boxes = dispatch.create_buffer(count * size_of::<BoundingBox>());
        let scores = dispatch.create_buffer(count * size_of::<f32>());
        let class_ids = dispatch.create_buffer(count * size_of::<i32>());
        let out_detections =
            dispatch.create_buffer(max_keep * size_of::<Detection>());
        let out_count = dispatch.create_buffer(size_of::<u32>());

        let pass = InFlightPass {
            boxes,
            scores,
            class_ids,
            out_detections,
            out_count,
            max_keep,
            completion: Some(Box::new(completion)),
        };

        let staged = (|| -> Result<(), DispatchError> {
            dispatch.write_buffer(boxes, bytemuck::cast_slice(&input.boxes))?;
            dispatch
                .write_buffer(scores, bytemuck::cast_slice(&input.scores))?;
            dispatch.write_buffer(
                class_ids,
                bytemuck::cast_slice(&input.class_ids),
            )?;

            let arguments = NmsKernelArguments {
                boxes,
                scores,
                class_ids,
                out_detections,
                out_count,
                candidate_count: count as u32,
                iou_threshold: params.iou_threshold,
                min_confidence: params.min_confidence,
                max_keep: max_keep as u32,
                scale_x: params.scale_x,
                scale_y: params.scale_y,
            };
            let thread_groups = count.div_ceil(THREADS_PER_GROUP).max(1);
            dispatch.dispatch(&arguments, thread_groups)
        })();

        state.in_flight = Some(pass);

        if let Err(error) = staged {
            log::warn!("Detection compaction dispatch failed: {error}");
            Self::finish(state, Vec::new());
            return Ok(());
        }

        let shared = Rc::clone(&self.state);
        state.dispatch.read_back(
            out_count,
            size_of::<u32>(),
            Box::new(move |result| Self::on_count_ready(shared, result)),
        );

        Ok(())
    }

    /// Runs handlers for any readbacks the dispatch has completed. A
    /// frame-aligned host calls this once per frame.
    pub fn poll(&self) {
        let ready = self.state.borrow_mut().dispatch.drain_ready();
        for completed in ready {
            (completed.handler)(completed.result);
        }
    }

    /// Submits and polls until the result materializes. Only suitable for
    /// dispatches that complete on their own polling, like `CpuDispatch`.
    pub fn run_blocking(
        &self,
        input: &NmsInput,
        params: &NmsParams,
    ) -> Result<Vec<Detection>, NmsError> {
        let slot: Rc<RefCell<Option<Vec<Detection>>>> =
            Rc::new(RefCell::new(None));
        let completion_slot = Rc::clone(&slot);
        self.submit(input, params, move |detections| {
            *completion_slot.borrow_mut() = Some(detections);
        })?;

        while slot.borrow().is_none() {
            self.poll();
        }
        let detections = slot.borrow_mut().take().unwrap_or_default();
        Ok(detections)
    }

    fn on_count_ready(
        state: Rc<RefCell<EngineState>>,
        result: ReadBack,
    ) {
        let mut guard = state.borrow_mut();
        let Some(pass) = guard.in_flight.as_ref() else {
            return;
        };

        if result.has_error || result.bytes.len() < size_of::<u32>() {
            log::warn!(
                "Detection count readback failed; reporting zero detections"
            );
            Self::finish(guard, Vec::new());
            return;
        }

        let count_bytes = [
            result.bytes[0],
            result.bytes[1],
            result.bytes[2],
            result.bytes[3],
        ];
        let survivor_count = u32::from_ne_bytes(count_bytes) as usize;
        let kept = survivor_count.min(pass.max_keep);
        if kept == 0 {
            Self::finish(guard, Vec::new());
            return;
        }

        let out_detections = pass.out_detections;
        let shared = Rc::clone(&state);
        guard.dispatch.read_back(
            out_detections,
            kept * size_of::<Detection>(),
            Box::new(move |result| Self::on_payload_ready(shared, result)),
        );
    }

    fn on_payload_ready(
        state: Rc<RefCell<EngineState>>,
        result: ReadBack,
    ) {
        let guard = state.borrow_mut();
        let detections = if result.has_error {
            log::warn!(
                "Detection payload readback failed; reporting zero detections"
            );
            Vec::new()
        } else {
            result
                .bytes
                .chunks_exact(size_of::<Detection>())
                .map(bytemuck::pod_read_unaligned::<Detection>)
                .collect()
        };
        Self::finish(guard, detections);
    }

    fn finish(
        mut guard: RefMut<'_, EngineState>,
        detections: Vec<Detection>,
    ) {
        let Some(mut pass) = guard.in_flight.take() else {
            return;
        };
        for buffer in pass.buffers() {
            guard.dispatch.release_buffer(buffer);
        }
        let completion = pass.completion.take();
        drop(guard);
        if let Some(completion) = completion {
            completion(detections);
        }
    }
}
