use std::time::Duration;

use super::TrackerError;

/// One user-marked checkpoint. Delta and cumulative total are frozen at creation, only
/// the description can be edited afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    /// 1-based, assigned in creation order.
    pub number: usize,
    /// Elapsed time since the previous split (or since zero for the first one).
    pub delta: Duration,
    /// Cumulative stopwatch total at the moment the split was taken.
    pub total: Duration,
    pub description: String,
}

/// Ordered record of the splits taken during the current session.
#[derive(Debug, Default)]
pub struct SplitLog {
    splits: Vec<Split>,
}

impl SplitLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, delta: Duration, total: Duration, description: String) -> &Split {
        let number = self.splits.len() + 1;
        self.splits.push(Split {
            number,
            delta,
            total,
            description,
        });
        &self.splits[number - 1]
    }

    pub fn edit_description(
        &mut self,
        number: usize,
        description: impl Into<String>,
    ) -> Result<(), TrackerError> {
        let split = number
            .checked_sub(1)
            .and_then(|i| self.splits.get_mut(i))
            .ok_or(TrackerError::SplitOutOfRange(number))?;
        split.description = description.into();
        Ok(())
    }

    pub fn all(&self) -> &[Split] {
        &self.splits
    }

    pub fn len(&self) -> usize {
        self.splits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.splits.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::tracker::{splits::SplitLog, TrackerError};

    #[test]
    fn test_split_numbering_and_order() {
        let mut log = SplitLog::new();
        log.append(Duration::from_millis(100), Duration::from_millis(100), "a".into());
        log.append(Duration::from_millis(50), Duration::from_millis(150), "b".into());

        let all = log.all();
        assert_eq!(all.len(), 2);
        assert_eq!((all[0].number, all[1].number), (1, 2));
        assert_eq!(all[1].delta, Duration::from_millis(50));
        assert_eq!(all[1].total, Duration::from_millis(150));
    }

    #[test]
    fn test_edit_description() {
        let mut log = SplitLog::new();
        log.append(Duration::from_millis(10), Duration::from_millis(10), "first".into());

        log.edit_description(1, "renamed").unwrap();
        assert_eq!(log.all()[0].description, "renamed");
        // timings are untouched by the edit
        assert_eq!(log.all()[0].delta, Duration::from_millis(10));
    }

    #[test]
    fn test_edit_unknown_number() {
        let mut log = SplitLog::new();
        assert_eq!(
            log.edit_description(1, "nope"),
            Err(TrackerError::SplitOutOfRange(1))
        );
        log.append(Duration::ZERO, Duration::ZERO, String::new());
        assert_eq!(
            log.edit_description(0, "nope"),
            Err(TrackerError::SplitOutOfRange(0))
        );
        assert_eq!(
            log.edit_description(2, "nope"),
            Err(TrackerError::SplitOutOfRange(2))
        );
    }
}
