use serde::Serialize;
use std::fmt;

use crate::config::ConfigError;
use crate::game::PieceKind;

/// Queue both colors start with unless configured otherwise
pub const DEFAULT_QUEUE: &str = "PRPNPBPQPBPNPR";

/// Circular sequence of piece kinds handed out to newly born pieces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BirthQueue {
    kinds: Vec<PieceKind>,
    cursor: usize,
}

impl BirthQueue {
    pub fn new(kinds: Vec<PieceKind>) -> Result<Self, ConfigError> {
        if kinds.is_empty() {
            return Err(ConfigError::Queue("birth queue is empty".to_string()));
        }
        if kinds.contains(&PieceKind::King) {
            return Err(ConfigError::Queue("kings cannot be born".to_string()));
        }
        Ok(BirthQueue { kinds, cursor: 0 })
    }

    /// Parses piece letters such as `PRPN`, ignoring case and whitespace
    pub fn parse(letters: &str) -> Result<Self, ConfigError> {
        let kinds = letters
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| {
                PieceKind::from_letter(c)
                    .ok_or_else(|| ConfigError::Queue(format!("unknown piece letter '{}'", c)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(kinds)
    }

    pub fn standard() -> Self {
        BirthQueue {
            kinds: DEFAULT_QUEUE
                .chars()
                .filter_map(PieceKind::from_letter)
                .collect(),
            cursor: 0,
        }
    }

    /// Hands out the next kind and advances the cursor, wrapping at the end
    pub fn dispense(&mut self) -> PieceKind {
        let kind = self.kinds[self.cursor];
        self.cursor = (self.cursor + 1) % self.kinds.len();
        kind
    }

    pub fn peek(&self) -> PieceKind {
        self.kinds[self.cursor]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Moves the cursor back or forward, as undo and redo do
    pub fn set_cursor(&mut self, cursor: usize) {
        assert!(
            cursor < self.kinds.len(),
            "cursor {} outside queue of length {}",
            cursor,
            self.kinds.len()
        );
        self.cursor = cursor;
    }

    pub fn kinds(&self) -> &[PieceKind] {
        &self.kinds
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// The next `n` kinds in dispense order, without advancing
    pub fn upcoming(&self, n: usize) -> Vec<PieceKind> {
        self.kinds
            .iter()
            .cycle()
            .skip(self.cursor)
            .take(n)
            .copied()
            .collect()
    }
}

impl fmt::Display for BirthQueue {
    /// Letters in queue order with the next one bracketed: `P[R]PN`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, kind) in self.kinds.iter().enumerate() {
            if i == self.cursor {
                write!(f, "[{}]", kind.letter())?;
            } else {
                write!(f, "{}", kind.letter())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_queue() {
        let queue = BirthQueue::standard();
        assert_eq!(queue.len(), 14);
        assert_eq!(queue.peek(), PieceKind::Pawn);
        assert_eq!(queue, BirthQueue::parse(DEFAULT_QUEUE).unwrap());
    }

    #[test]
    fn test_dispense_wraps_around() {
        let mut queue = BirthQueue::parse("PRN").unwrap();
        let dispensed: Vec<PieceKind> = (0..5).map(|_| queue.dispense()).collect();
        assert_eq!(
            dispensed,
            vec![
                PieceKind::Pawn,
                PieceKind::Rook,
                PieceKind::Knight,
                PieceKind::Pawn,
                PieceKind::Rook,
            ]
        );
        assert_eq!(queue.cursor(), 2);
    }

    #[test]
    fn test_dispense_is_periodic_in_queue_length() {
        let mut first = BirthQueue::standard();
        let mut second = BirthQueue::standard();
        for _ in 0..second.len() {
            second.dispense();
        }
        for _ in 0..30 {
            assert_eq!(first.dispense(), second.dispense());
        }
    }

    #[test]
    fn test_set_cursor_rolls_back() {
        let mut queue = BirthQueue::parse("qbn").unwrap();
        queue.dispense();
        queue.dispense();
        queue.set_cursor(0);
        assert_eq!(queue.dispense(), PieceKind::Queen);
    }

    #[test]
    #[should_panic(expected = "outside queue")]
    fn test_set_cursor_out_of_range_panics() {
        BirthQueue::parse("P").unwrap().set_cursor(1);
    }

    #[test]
    fn test_invalid_queues_rejected() {
        assert!(matches!(BirthQueue::parse(""), Err(ConfigError::Queue(_))));
        assert!(matches!(BirthQueue::parse("PK"), Err(ConfigError::Queue(_))));
        assert!(matches!(BirthQueue::parse("PX"), Err(ConfigError::Queue(_))));
    }

    #[test]
    fn test_upcoming_and_display() {
        let mut queue = BirthQueue::parse("P R N").unwrap();
        queue.dispense();
        queue.dispense();
        assert_eq!(
            queue.upcoming(4),
            vec![
                PieceKind::Knight,
                PieceKind::Pawn,
                PieceKind::Rook,
                PieceKind::Knight,
            ]
        );
        assert_eq!(queue.to_string(), "PR[N]");
    }
}
