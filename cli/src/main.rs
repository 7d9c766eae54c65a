use clap::{CommandFactory, Parser, Subcommand};
use cli::handlers::{handle_chat, handle_nms};

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter a JSON candidate file through the compaction engine
    Nms {
        /// JSON file with boxes, scores, and class_ids arrays
        candidates_path: String,
        #[arg(long, default_value_t = 0.5)]
        iou_threshold: f32,
        #[arg(long, default_value_t = 0.25)]
        min_confidence: f32,
        #[arg(long, default_value_t = 64)]
        max_keep: usize,
        #[arg(long, default_value_t = 1.0)]
        scale_x: f32,
        #[arg(long, default_value_t = 1.0)]
        scale_y: f32,
    },
    /// Chat against the generation engine (requires an inference backend)
    Chat {
        /// Path to a tokenizer.json file
        tokenizer_path: String,
        /// End-of-sequence token string
        #[arg(long, default_value = "<|im_end|>")]
        eos_token: String,
        #[arg(long, default_value_t = 256)]
        max_new_tokens: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Nms {
            candidates_path,
            iou_threshold,
            min_confidence,
            max_keep,
            scale_x,
            scale_y,
        }) => {
            handle_nms(
                candidates_path,
                iou_threshold,
                min_confidence,
                max_keep,
                scale_x,
                scale_y,
            );
        },
        Some(Commands::Chat {
            tokenizer_path,
            eos_token,
            max_new_tokens,
        }) => {
            handle_chat(tokenizer_path, eos_token, max_new_tokens);
        },
        None => {
            let mut cmd = Cli::command();
            cmd.print_help().unwrap();
        },
    }
}
