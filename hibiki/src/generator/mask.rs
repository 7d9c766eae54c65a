/// Reusable attention-flag buffer for one generation session. The arena is
/// sized once for the whole session and mutated in place: position `i` flips
/// to 1 when token `i` is consumed, and each forward pass receives a prefix
/// view covering the current sequence length. Not safe to share between
/// concurrent sessions.
pub struct AttentionMaskArena {
    flags: Vec<i64>,
    consumed: usize,
}

impl AttentionMaskArena {
    pub fn new(capacity: usize) -> Self {
        Self {
            flags: vec![0; capacity],
            consumed: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.flags.len()
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn mark_consumed(
        &mut self,
        count: usize,
    ) {
        let end = self.consumed + count;
        assert!(
            end <= self.flags.len(),
            "Attention arena overflow: {} tokens into capacity {}",
            end,
            self.flags.len()
        );
        for flag in &mut self.flags[self.consumed..end] {
            *flag = 1;
        }
        self.consumed = end;
    }

    pub fn prefix(&self) -> &[i64] {
        &self.flags[..self.consumed]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_grows_in_place() {
        let mut arena = AttentionMaskArena::new(8);
        arena.mark_consumed(3);
        assert_eq!(arena.prefix(), &[1, 1, 1]);

        arena.mark_consumed(1);
        assert_eq!(arena.consumed(), 4);
        assert_eq!(arena.prefix(), &[1, 1, 1, 1]);
        assert_eq!(arena.capacity(), 8);
    }

    #[test]
    #[should_panic(expected = "Attention arena overflow")]
    fn overflow_is_rejected() {
        let mut arena = AttentionMaskArena::new(2);
        arena.mark_consumed(3);
    }
}
