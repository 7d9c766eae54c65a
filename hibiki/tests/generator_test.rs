mod common;

use common::{EOS_TOKEN_ID, MockExecutor};
use hibiki::{
    CancellationToken,
    executor::not_available::NotAvailableExecutor,
    generator::{
        config::GeneratorConfig,
        error::GeneratorError,
        generator::TextGenerator,
        stream::{FinishReason, StreamEvent},
    },
};

fn test_config(
    max_prompt_length: usize,
    max_new_tokens: usize,
) -> GeneratorConfig {
    GeneratorConfig {
        max_prompt_length,
        max_new_tokens,
        prefill_step_budget: 4,
        decode_step_budget: 12,
    }
}

#[test]
fn long_prompts_keep_trailing_tokens() {
    let executor = MockExecutor::new(vec![EOS_TOKEN_ID]);
    let captured = executor.captured.clone();
    let mut generator =
        TextGenerator::new(Box::new(executor), test_config(512, 8));

    let prompt: Vec<u32> = (0..600).collect();
    let mut stream = generator
        .stream(prompt, EOS_TOKEN_ID, CancellationToken::new())
        .unwrap();
    assert_eq!(stream.prompt_length(), 512);
    assert!(stream.by_ref().next().is_none());

    let captured = captured.borrow();
    let prefill = &captured[0];
    let expected_ids: Vec<i64> = (88..600).collect();
    assert_eq!(prefill.input_ids, expected_ids);
    assert_eq!(prefill.position_ids, (0..512).collect::<Vec<i64>>());
    assert_eq!(prefill.attention_mask, vec![1i64; 512]);
    assert_eq!(prefill.past_sequence_length, 0);
}

#[test]
fn generation_stops_at_token_limit_without_eos() {
    let executor = MockExecutor::new(vec![7]);
    let captured = executor.captured.clone();
    let mut generator =
        TextGenerator::new(Box::new(executor), test_config(16, 5));

    let mut stream = generator
        .stream(vec![1, 3, 4], EOS_TOKEN_ID, CancellationToken::new())
        .unwrap();
    let tokens: Vec<u32> = stream.by_ref().collect();

    assert_eq!(tokens, vec![7, 7, 7, 7, 7]);
    assert_eq!(stream.finish_reason(), Some(FinishReason::Length));
    // Prefill plus four decode passes; the limit stops the fifth schedule.
    assert_eq!(captured.borrow().len(), 5);
}

#[test]
fn eos_from_prefill_emits_nothing() {
    let executor = MockExecutor::new(vec![EOS_TOKEN_ID]);
    let mut generator =
        TextGenerator::new(Box::new(executor), test_config(16, 8));

    let mut stream = generator
        .stream(vec![1, 3], EOS_TOKEN_ID, CancellationToken::new())
        .unwrap();
    let tokens: Vec<u32> = stream.by_ref().collect();

    assert!(tokens.is_empty());
    assert_eq!(stream.finish_reason(), Some(FinishReason::Stop));
}

#[test]
fn eos_on_first_decode_step_keeps_prefill_token() {
    let executor = MockExecutor::new(vec![5, EOS_TOKEN_ID]);
    let mut generator =
        TextGenerator::new(Box::new(executor), test_config(16, 8));

    let mut stream = generator
        .stream(vec![1, 3], EOS_TOKEN_ID, CancellationToken::new())
        .unwrap();
    let tokens: Vec<u32> = stream.by_ref().collect();

    assert_eq!(tokens, vec![5]);
    assert_eq!(stream.finish_reason(), Some(FinishReason::Stop));
}

#[test]
fn kv_cache_grows_by_one_position_per_decode_step() {
    let executor = MockExecutor::new(vec![7]);
    let captured = executor.captured.clone();
    let mut generator =
        TextGenerator::new(Box::new(executor), test_config(16, 4));

    let mut stream = generator
        .stream(vec![1, 3, 4], EOS_TOKEN_ID, CancellationToken::new())
        .unwrap();
    let _tokens: Vec<u32> = stream.by_ref().collect();
    drop(stream);

    let captured = captured.borrow();
    let past_lengths: Vec<usize> =
        captured.iter().map(|pass| pass.past_sequence_length).collect();
    assert_eq!(past_lengths, vec![0, 3, 4, 5]);

    for (step, pass) in captured.iter().enumerate().skip(1) {
        assert_eq!(pass.input_ids, vec![7]);
        assert_eq!(pass.position_ids, vec![(2 + step) as i64]);
        assert_eq!(pass.attention_mask, vec![1i64; 3 + step]);
    }
}

#[test]
fn step_budget_suspends_long_passes() {
    let executor =
        MockExecutor::new(vec![7]).with_steps_per_pass(10);
    let mut generator = TextGenerator::new(
        Box::new(executor),
        GeneratorConfig {
            max_prompt_length: 16,
            max_new_tokens: 2,
            prefill_step_budget: 4,
            decode_step_budget: 12,
        },
    );

    let mut stream = generator
        .stream(vec![1, 3], EOS_TOKEN_ID, CancellationToken::new())
        .unwrap();

    // Prefill needs 10 executor steps at a budget of 4 per call.
    assert_eq!(stream.step(), StreamEvent::Pending);
    assert_eq!(stream.step(), StreamEvent::Pending);
    assert_eq!(stream.step(), StreamEvent::Token(7));

    // Decode fits in a single budget of 12.
    assert_eq!(stream.step(), StreamEvent::Token(7));
    assert_eq!(
        stream.step(),
        StreamEvent::Finished(FinishReason::Length)
    );
}

#[test]
fn cancellation_before_first_step_emits_nothing() {
    let executor = MockExecutor::new(vec![7]);
    let stats = executor.stats();
    let mut generator =
        TextGenerator::new(Box::new(executor), test_config(16, 8));

    let cancellation = CancellationToken::new();
    let mut stream = generator
        .stream(vec![1, 3], EOS_TOKEN_ID, cancellation.clone())
        .unwrap();

    cancellation.cancel();
    assert_eq!(
        stream.step(),
        StreamEvent::Finished(FinishReason::Cancelled)
    );
    assert!(stream.generated_tokens().is_empty());
    drop(stream);
    assert_eq!(stats.live_count(), 0);
}

#[test]
fn cancellation_mid_generation_keeps_partial_output() {
    let executor = MockExecutor::new(vec![7]);
    let stats = executor.stats();
    let mut generator =
        TextGenerator::new(Box::new(executor), test_config(16, 8));

    let cancellation = CancellationToken::new();
    let mut stream = generator
        .stream(vec![1, 3], EOS_TOKEN_ID, cancellation.clone())
        .unwrap();

    assert_eq!(stream.step(), StreamEvent::Token(7));
    cancellation.cancel();
    assert_eq!(
        stream.step(),
        StreamEvent::Finished(FinishReason::Cancelled)
    );
    assert_eq!(stream.generated_tokens(), &[7]);
    drop(stream);
    assert_eq!(stats.live_count(), 0);
}

#[test]
fn completed_run_releases_every_tensor() {
    let executor = MockExecutor::new(vec![7]);
    let stats = executor.stats();
    let mut generator =
        TextGenerator::new(Box::new(executor), test_config(16, 4));

    {
        let stream = generator
            .stream(vec![1, 3], EOS_TOKEN_ID, CancellationToken::new())
            .unwrap();
        let _tokens: Vec<u32> = stream.collect();
    }

    assert!(stats.allocated_count() > 0);
    assert_eq!(stats.live_count(), 0);
    assert_eq!(stats.live_bytes(), 0);
}

#[test]
fn abandoned_stream_releases_every_tensor() {
    let executor = MockExecutor::new(vec![7]).with_steps_per_pass(10);
    let stats = executor.stats();
    let mut generator =
        TextGenerator::new(Box::new(executor), test_config(16, 8));

    {
        let mut stream = generator
            .stream(vec![1, 3], EOS_TOKEN_ID, CancellationToken::new())
            .unwrap();
        // Abandon mid-prefill with a pass still scheduled.
        assert_eq!(stream.step(), StreamEvent::Pending);
    }

    assert_eq!(stats.live_count(), 0);
}

#[test]
fn early_consumer_stop_releases_every_tensor() {
    let executor = MockExecutor::new(vec![7]);
    let stats = executor.stats();
    let mut generator =
        TextGenerator::new(Box::new(executor), test_config(16, 8));

    {
        let mut stream = generator
            .stream(vec![1, 3], EOS_TOKEN_ID, CancellationToken::new())
            .unwrap();
        let first = stream.next();
        assert_eq!(first, Some(7));
        // Consumer walks away after one token.
    }

    assert_eq!(stats.live_count(), 0);
}

#[test]
fn executor_failure_mid_decode_reports_failed() {
    let executor = MockExecutor::new(vec![7]).with_fail_begin_after(1);
    let stats = executor.stats();
    let mut generator =
        TextGenerator::new(Box::new(executor), test_config(16, 8));

    let mut stream = generator
        .stream(vec![1, 3], EOS_TOKEN_ID, CancellationToken::new())
        .unwrap();
    let tokens: Vec<u32> = stream.by_ref().collect();

    assert_eq!(tokens, vec![7]);
    assert_eq!(stream.finish_reason(), Some(FinishReason::Failed));
    assert!(stream.error().is_some());
    drop(stream);
    assert_eq!(stats.live_count(), 0);
}

#[test]
fn missing_backend_fails_fast() {
    let mut generator = TextGenerator::new(
        Box::new(NotAvailableExecutor::new()),
        test_config(16, 8),
    );

    let result =
        generator.stream(vec![1, 3], EOS_TOKEN_ID, CancellationToken::new());
    assert!(matches!(result, Err(GeneratorError::ExecutorNotAvailable)));
}

#[test]
fn empty_prompt_is_rejected() {
    let executor = MockExecutor::new(vec![7]);
    let mut generator =
        TextGenerator::new(Box::new(executor), test_config(16, 8));

    let result =
        generator.stream(Vec::new(), EOS_TOKEN_ID, CancellationToken::new());
    assert!(matches!(result, Err(GeneratorError::EmptyPrompt)));
}
