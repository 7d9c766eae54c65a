use std::fs::File;

use console::Style;
use hibiki::detection::{
    cpu::CpuDispatch,
    engine::{NmsEngine, NmsInput},
    params::NmsParams,
    types::BoundingBox,
};
use serde::Deserialize;

#[derive(Deserialize)]
struct CandidateFile {
    boxes: Vec<[f32; 4]>,
    scores: Vec<f32>,
    class_ids: Vec<i32>,
}

pub fn handle_nms(
    candidates_path: String,
    iou_threshold: f32,
    min_confidence: f32,
    max_keep: usize,
    scale_x: f32,
    scale_y: f32,
) {
    let file = match File::open(&candidates_path) {
        Ok(file) => file,
        Err(error) => {
            eprintln!("Failed to open {candidates_path}: {error}");
            return;
        },
    };
    let candidates: CandidateFile = match serde_json::from_reader(file) {
        Ok(candidates) => candidates,
        Err(error) => {
            eprintln!("Failed to parse {candidates_path}: {error}");
            return;
        },
    };

    let boxes: Vec<BoundingBox> = candidates
        .boxes
        .iter()
        .map(|&[x, y, width, height]| BoundingBox::new(x, y, width, height))
        .collect();
    let candidate_count = boxes.len();
    let input =
        match NmsInput::new(boxes, candidates.scores, candidates.class_ids) {
            Ok(input) => input,
            Err(error) => {
                eprintln!("Invalid candidate file: {error}");
                return;
            },
        };

    let params = NmsParams::new(iou_threshold, min_confidence, max_keep)
        .with_scale(scale_x, scale_y);
    let engine = NmsEngine::new(Box::new(CpuDispatch::new()));
    let kept = match engine.run_blocking(&input, &params) {
        Ok(kept) => kept,
        Err(error) => {
            eprintln!("Compaction failed: {error}");
            return;
        },
    };

    let header_style = Style::new().bold();
    println!(
        "{}",
        header_style
            .apply_to(format!("{} of {candidate_count} kept", kept.len()))
    );
    for detection in kept {
        println!(
            "class {:>3}  score {:.3}  [{:.1}, {:.1}, {:.1}, {:.1}]",
            detection.class_id,
            detection.score,
            detection.rect.x,
            detection.rect.y,
            detection.rect.width,
            detection.rect.height,
        );
    }
}
