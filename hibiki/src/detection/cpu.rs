use std::collections::{HashMap, VecDeque};

use super::{
    dispatch::{
        BufferId, CompletedReadBack, ComputeDispatch, DispatchError,
        NmsKernelArguments, ReadBack, ReadBackHandler, THREADS_PER_GROUP,
    },
    types::{BoundingBox, Detection},
};

/// Reference implementation of the compaction kernel contract. Results are
/// computed at dispatch time, but readbacks still resolve asynchronously
/// through `drain_ready`, so the engine's two-stage staging behaves as it
/// would against a real device queue.
pub struct CpuDispatch {
    buffers: HashMap<BufferId, Vec<u8>>,
    next_buffer_id: u64,
    pending: VecDeque<(BufferId, usize, ReadBackHandler)>,
}

impl CpuDispatch {
    pub fn new() -> Self {
        Self {
            buffers: HashMap::new(),
            next_buffer_id: 0,
            pending: VecDeque::new(),
        }
    }

    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    fn read_candidates(
        &self,
        arguments: &NmsKernelArguments,
        count: usize,
    ) -> Result<(Vec<BoundingBox>, Vec<f32>, Vec<i32>), DispatchError> {
        let boxes_bytes = self
            .buffers
            .get(&arguments.boxes)
            .ok_or(DispatchError::UnknownBuffer(arguments.boxes))?;
        let scores_bytes = self
            .buffers
            .get(&arguments.scores)
            .ok_or(DispatchError::UnknownBuffer(arguments.scores))?;
        let class_ids_bytes = self
            .buffers
            .get(&arguments.class_ids)
            .ok_or(DispatchError::UnknownBuffer(arguments.class_ids))?;

        let boxes_len = count * std::mem::size_of::<BoundingBox>();
        let scalars_len = count * std::mem::size_of::<f32>();
        if boxes_bytes.len() < boxes_len
            || scores_bytes.len() < scalars_len
            || class_ids_bytes.len() < scalars_len
        {
            return Err(DispatchError::DispatchFailed(
                "candidate buffers are shorter than candidate_count".into(),
            ));
        }

        let boxes: Vec<BoundingBox> =
            bytemuck::pod_collect_to_vec(&boxes_bytes[..boxes_len]);
        let scores: Vec<f32> =
            bytemuck::pod_collect_to_vec(&scores_bytes[..scalars_len]);
        let class_ids: Vec<i32> =
            bytemuck::pod_collect_to_vec(&class_ids_bytes[..scalars_len]);
        Ok((boxes, scores, class_ids))
    }

    /// Per-candidate survival test with the parallel-kernel dominance rule:
    /// a candidate is suppressed when any same-class candidate with a
    /// strictly higher score (or equal score and lower index) overlaps it at
    /// or above the threshold. Survivors compact in candidate-index order.
    fn execute_kernel(
        &mut self,
        arguments: &NmsKernelArguments,
        thread_groups: usize,
    ) -> Result<(), DispatchError> {
        let candidate_limit = thread_groups * THREADS_PER_GROUP;
        let count = (arguments.candidate_count as usize).min(candidate_limit);

        let (boxes, scores, class_ids) =
            self.read_candidates(arguments, count)?;

        let max_keep = arguments.max_keep as usize;
        let mut kept: Vec<Detection> = Vec::with_capacity(max_keep);
        for i in 0..count {
            if scores[i] < arguments.min_confidence {
                continue;
            }

            let mut suppressed = false;
            for j in 0..count {
                if j == i || class_ids[j] != class_ids[i] {
                    continue;
                }
                if scores[j] < arguments.min_confidence {
                    continue;
                }
                let dominates = scores[j] > scores[i]
                    || (scores[j] == scores[i] && j < i);
                if dominates
                    && boxes[i].iou(&boxes[j]) >= arguments.iou_threshold
                {
                    suppressed = true;
                    break;
                }
            }
            if suppressed {
                continue;
            }

            if kept.len() < max_keep {
                kept.push(Detection {
                    rect: boxes[i]
                        .scaled(arguments.scale_x, arguments.scale_y),
                    score: scores[i],
                    class_id: class_ids[i],
                });
            }
        }

        let kept_bytes: &[u8] = bytemuck::cast_slice(&kept);
        let out_detections = self
            .buffers
            .get_mut(&arguments.out_detections)
            .ok_or(DispatchError::UnknownBuffer(arguments.out_detections))?;
        if out_detections.len() < kept_bytes.len() {
            return Err(DispatchError::BufferTooSmall(
                arguments.out_detections,
            ));
        }
        out_detections[..kept_bytes.len()].copy_from_slice(kept_bytes);

        let count_bytes = (kept.len() as u32).to_ne_bytes();
        let out_count = self
            .buffers
            .get_mut(&arguments.out_count)
            .ok_or(DispatchError::UnknownBuffer(arguments.out_count))?;
        if out_count.len() < count_bytes.len() {
            return Err(DispatchError::BufferTooSmall(arguments.out_count));
        }
        out_count[..count_bytes.len()].copy_from_slice(&count_bytes);

        Ok(())
    }
}

impl Default for CpuDispatch {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeDispatch for CpuDispatch {
    fn create_buffer(
        &mut self,
        byte_length: usize,
    ) -> BufferId {
        let id = BufferId(self.next_buffer_id);
        self.next_buffer_id += 1;
        self.buffers.insert(id, vec![0; byte_length]);
        id
    }

    fn write_buffer(
        &mut self,
        buffer: BufferId,
        bytes: &[u8],
    ) -> Result<(), DispatchError> {
        let storage = self
            .buffers
            .get_mut(&buffer)
            .ok_or(DispatchError::UnknownBuffer(buffer))?;
        if storage.len() < bytes.len() {
            return Err(DispatchError::BufferTooSmall(buffer));
        }
        storage[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn release_buffer(
        &mut self,
        buffer: BufferId,
    ) {
        self.buffers.remove(&buffer);
    }

    fn dispatch(
        &mut self,
        arguments: &NmsKernelArguments,
        thread_groups: usize,
    ) -> Result<(), DispatchError> {
        self.execute_kernel(arguments, thread_groups)
    }

    fn read_back(
        &mut self,
        buffer: BufferId,
        byte_length: usize,
        handler: ReadBackHandler,
    ) {
        self.pending.push_back((buffer, byte_length, handler));
    }

    fn drain_ready(&mut self) -> Vec<CompletedReadBack> {
        let pending = std::mem::take(&mut self.pending);
        pending
            .into_iter()
            .map(|(buffer, byte_length, handler)| {
                let result = match self.buffers.get(&buffer) {
                    Some(storage) if storage.len() >= byte_length => {
                        ReadBack {
                            bytes: storage[..byte_length].to_vec(),
                            has_error: false,
                        }
                    },
                    _ => ReadBack {
                        bytes: Vec::new(),
                        has_error: true,
                    },
                };
                CompletedReadBack {
                    result,
                    handler,
                }
            })
            .collect()
    }
}
