use std::{cell::Cell, time::Instant};

use super::{
    error::Error,
    input::{Input, Message, Role},
    input_processor::{InputProcessor, InputProcessorDefault},
    output::{FinishReason, Output, Stats, StepStats, TotalStats},
};
use crate::{
    CancellationToken,
    codec::codec::TokenCodec,
    executor::executor::TensorExecutor,
    generator::{
        config::GeneratorConfig,
        generator::TextGenerator,
        stream::{StreamEvent, TextStream},
    },
};

pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful assistant.";

pub struct SessionConfig {
    /// Prepended as a system message when the input does not carry one.
    pub system_message: Option<String>,
    /// Overrides the built-in chat template.
    pub chat_template: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            system_message: Some(DEFAULT_SYSTEM_MESSAGE.to_string()),
            chat_template: None,
        }
    }
}

/// Request-level wrapper over the generation engine: applies the chat
/// template, tokenizes, streams decoded text, and assembles run statistics.
/// A missing backend or tokenizer degrades every call to an empty output
/// with a warning logged once; it never panics or errors outward.
pub struct ChatSession {
    config: SessionConfig,
    codec: Box<dyn TokenCodec>,
    input_processor: Box<dyn InputProcessor>,
    generator: TextGenerator,
    config_error_reported: Cell<bool>,
}

impl ChatSession {
    pub fn new(
        executor: Box<dyn TensorExecutor>,
        codec: Box<dyn TokenCodec>,
        generator_config: GeneratorConfig,
        config: SessionConfig,
    ) -> Self {
        let input_processor =
            InputProcessorDefault::new(config.chat_template.clone());

        Self {
            config,
            codec,
            input_processor: Box::new(input_processor),
            generator: TextGenerator::new(executor, generator_config),
            config_error_reported: Cell::new(false),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.generator.is_ready()
    }

    pub fn generator(&self) -> &TextGenerator {
        &self.generator
    }

    /// Lazy per-token text chunks for one request. The iterator is
    /// single-pass; dropping it early cancels the session and releases its
    /// resources.
    pub fn stream(
        &mut self,
        input: Input,
        cancellation: CancellationToken,
    ) -> TextChunks<'_> {
        if !self.generator.is_ready() {
            Self::report_config_error(
                &self.config_error_reported,
                &Error::GeneratorNotReady,
            );
            return TextChunks {
                stream: None,
                codec: None,
            };
        }

        let tokens = match self.prompt_tokens(&input) {
            Ok(tokens) => tokens,
            Err(error) => {
                Self::report_config_error(&self.config_error_reported, &error);
                return TextChunks {
                    stream: None,
                    codec: None,
                };
            },
        };
        let eos_token_id = self.codec.eos_token_id();

        match self.generator.stream(tokens, eos_token_id, cancellation) {
            Ok(stream) => TextChunks {
                stream: Some(stream),
                codec: Some(self.codec.as_ref()),
            },
            Err(error) => {
                Self::report_config_error(
                    &self.config_error_reported,
                    &Error::from(error),
                );
                TextChunks {
                    stream: None,
                    codec: None,
                }
            },
        }
    }

    /// Drives one request to completion. The progress callback receives the
    /// output accumulated so far after each token; returning `false` cancels
    /// the rest of the run.
    pub fn run<F>(
        &mut self,
        input: Input,
        cancellation: CancellationToken,
        progress: Option<F>,
    ) -> Output
    where
        F: Fn(Output) -> bool,
    {
        let run_start = Instant::now();

        if !self.generator.is_ready() {
            Self::report_config_error(
                &self.config_error_reported,
                &Error::GeneratorNotReady,
            );
            return Output::empty(Some(FinishReason::Failed));
        }

        let tokens = match self.prompt_tokens(&input) {
            Ok(tokens) => tokens,
            Err(error) => {
                Self::report_config_error(&self.config_error_reported, &error);
                return Output::empty(Some(FinishReason::Failed));
            },
        };
        let eos_token_id = self.codec.eos_token_id();

        let Self {
            generator,
            codec,
            config_error_reported,
            ..
        } = self;
        let mut stream =
            match generator.stream(tokens, eos_token_id, cancellation) {
                Ok(stream) => stream,
                Err(error) => {
                    Self::report_config_error(
                        config_error_reported,
                        &Error::from(error),
                    );
                    return Output::empty(Some(FinishReason::Failed));
                },
            };

        let tokens_count_input = stream.prompt_length() as u64;
        let prefill_start = Instant::now();
        let mut prefill_duration: Option<f64> = None;
        let mut decode_duration = 0.0f64;
        let mut step_start = Instant::now();
        let mut streamed_text = String::new();
        let mut tokens_count_output = 0u64;

        let finish_reason = loop {
            match stream.step() {
                StreamEvent::Pending => {},
                StreamEvent::Token(token) => {
                    let now = Instant::now();
                    if prefill_duration.is_none() {
                        prefill_duration = Some(
                            now.duration_since(prefill_start).as_secs_f64(),
                        );
                    } else {
                        decode_duration +=
                            now.duration_since(step_start).as_secs_f64();
                    }
                    step_start = now;
                    tokens_count_output += 1;

                    match codec.decode(&[token]) {
                        Ok(chunk) => streamed_text.push_str(&chunk),
                        Err(error) => log::warn!(
                            "Unable to decode streamed token {token}: {error}"
                        ),
                    }

                    if let Some(progress_fn) = &progress {
                        let interim = Output {
                            text: streamed_text.clone(),
                            stats: Self::build_stats(
                                prefill_duration,
                                decode_duration,
                                tokens_count_input,
                                tokens_count_output,
                                run_start.elapsed().as_secs_f64(),
                            ),
                            finish_reason: None,
                        };
                        if !progress_fn(interim) {
                            stream.cancel();
                        }
                    }
                },
                StreamEvent::Finished(reason) => break reason,
            }
        };

        let generated_tokens = stream.generated_tokens().to_vec();
        drop(stream);

        let text = match codec.decode(&generated_tokens) {
            Ok(text) => text,
            Err(_) => streamed_text,
        };

        Output {
            text,
            stats: Self::build_stats(
                prefill_duration,
                decode_duration,
                tokens_count_input,
                generated_tokens.len() as u64,
                run_start.elapsed().as_secs_f64(),
            ),
            finish_reason: Some(finish_reason),
        }
    }

    fn prompt_tokens(
        &self,
        input: &Input,
    ) -> Result<Vec<u32>, Error> {
        let messages = self.messages_for(input);
        let text = self.input_processor.process(&messages)?;
        Ok(self.codec.encode(&text)?)
    }

    fn messages_for(
        &self,
        input: &Input,
    ) -> Vec<Message> {
        let mut messages = input.get_messages();
        if let Some(system_message) = &self.config.system_message {
            let has_system =
                messages.iter().any(|message| message.role == Role::System);
            if !has_system {
                messages.insert(0, Message::system(system_message.clone()));
            }
        }
        messages
    }

    fn report_config_error(
        reported: &Cell<bool>,
        error: &Error,
    ) {
        if !reported.get() {
            log::warn!("Text generation degraded to empty output: {error}");
            reported.set(true);
        }
    }

    fn build_stats(
        prefill_duration: Option<f64>,
        decode_duration: f64,
        tokens_count_input: u64,
        tokens_count_output: u64,
        total_duration: f64,
    ) -> Stats {
        let prefill_stats = prefill_duration.map(|duration| StepStats {
            duration,
            tokens_count: 1,
            tokens_per_second: if duration > 0.0 {
                1.0 / duration
            } else {
                0.0
            },
        });

        let decode_tokens = tokens_count_output.saturating_sub(1);
        let generate_stats = if decode_tokens > 0 {
            Some(StepStats {
                duration: decode_duration,
                tokens_count: decode_tokens,
                tokens_per_second: if decode_duration > 0.0 {
                    decode_tokens as f64 / decode_duration
                } else {
                    0.0
                },
            })
        } else {
            None
        };

        Stats {
            prefill_stats,
            generate_stats,
            total_stats: TotalStats {
                duration: total_duration,
                tokens_count_input,
                tokens_count_output,
            },
        }
    }
}

/// Lazy decoded-text view over a generation session.
pub struct TextChunks<'a> {
    stream: Option<TextStream<'a>>,
    codec: Option<&'a dyn TokenCodec>,
}

impl TextChunks<'_> {
    pub fn finish_reason(&self) -> Option<FinishReason> {
        match &self.stream {
            Some(stream) => stream.finish_reason(),
            None => Some(FinishReason::Failed),
        }
    }

    pub fn generated_tokens(&self) -> &[u32] {
        match &self.stream {
            Some(stream) => stream.generated_tokens(),
            None => &[],
        }
    }
}

impl Iterator for TextChunks<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let stream = self.stream.as_mut()?;
        let token = stream.next()?;
        let codec = self.codec?;
        match codec.decode(&[token]) {
            Ok(chunk) => Some(chunk),
            Err(error) => {
                log::warn!("Unable to decode streamed token {token}: {error}");
                Some(String::new())
            },
        }
    }
}
