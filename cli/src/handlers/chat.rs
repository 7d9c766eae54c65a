use std::{
    io::{BufRead, Write},
    path::Path,
    sync::{Arc, Mutex},
};

use console::Style;
use hibiki::{
    CancellationToken,
    codec::hf::HfTokenCodec,
    executor::not_available::NotAvailableExecutor,
    generator::config::GeneratorConfig,
    session::{
        input::Input,
        output::Output,
        session::{ChatSession, SessionConfig},
    },
};

fn format_stats(output: &Output) -> String {
    let tokens_per_second = output
        .stats
        .generate_stats
        .as_ref()
        .or(output.stats.prefill_stats.as_ref())
        .map(|stats| stats.tokens_per_second)
        .unwrap_or(0.0);
    format!(
        "{:.3}s, {:.3}t/s",
        output.stats.total_stats.duration, tokens_per_second
    )
}

pub fn handle_chat(
    tokenizer_path: String,
    eos_token: String,
    max_new_tokens: usize,
) {
    let codec =
        match HfTokenCodec::from_file(Path::new(&tokenizer_path), &eos_token) {
            Ok(codec) => codec,
            Err(error) => {
                eprintln!("Failed to load tokenizer: {error}");
                return;
            },
        };

    // No inference backend ships with the CLI; generation degrades to an
    // empty output until an executor is wired in.
    let mut session = ChatSession::new(
        Box::new(NotAvailableExecutor::new()),
        Box::new(codec),
        GeneratorConfig {
            max_new_tokens,
            ..GeneratorConfig::default()
        },
        SessionConfig::default(),
    );

    let current_token: Arc<Mutex<CancellationToken>> =
        Arc::new(Mutex::new(CancellationToken::new()));
    let handler_token = current_token.clone();
    ctrlc::set_handler(move || {
        handler_token.lock().unwrap().cancel();
    })
    .ok();

    let stats_style = Style::new().bold();
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {},
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let cancellation = CancellationToken::new();
        *current_token.lock().unwrap() = cancellation.clone();

        let printed = std::cell::Cell::new(0usize);
        let output = session.run(
            Input::Text(line.to_string()),
            cancellation,
            Some(move |interim: Output| {
                let already_printed = printed.get();
                if interim.text.len() > already_printed {
                    print!("{}", &interim.text[already_printed..]);
                    std::io::stdout().flush().ok();
                    printed.set(interim.text.len());
                }
                true
            }),
        );

        match output.finish_reason {
            Some(reason) => println!(
                "\n[{:?}] {}",
                reason,
                stats_style.apply_to(format_stats(&output))
            ),
            None => println!(),
        }
    }
}
