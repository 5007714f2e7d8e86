use crate::error::{BindingError, Result};
use sdds_core::Dataset;

/// State held for one open handle
#[derive(Debug)]
pub struct Session {
    pub dataset: Dataset,
    pub terminate_mode: u32,
    /// Rows between automatic page updates; 0 disables them
    pub update_interval: usize,
    pub(crate) rows_since_update: usize,
}

impl Session {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset,
            terminate_mode: 0,
            update_interval: 0,
            rows_since_update: 0,
        }
    }
}

/// Fixed number of slots addressed by caller-chosen indices
#[derive(Debug)]
pub struct HandleTable {
    slots: Vec<Option<Session>>,
}

impl HandleTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_open(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(Some(_)))
    }

    /// Bind `session` to `index`. A session already there is dropped.
    pub fn install(&mut self, index: usize, session: Session) -> Result<Option<Session>> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(BindingError::UnknownHandle(index))?;
        Ok(slot.replace(session))
    }

    pub fn get(&self, index: usize) -> Result<&Session> {
        self.slots
            .get(index)
            .and_then(Option::as_ref)
            .ok_or(BindingError::UnknownHandle(index))
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut Session> {
        self.slots
            .get_mut(index)
            .and_then(Option::as_mut)
            .ok_or(BindingError::UnknownHandle(index))
    }

    /// A writable target and a readable source at two distinct indices
    pub fn pair_mut(&mut self, target: usize, source: usize) -> Result<(&mut Session, &Session)> {
        for index in [target, source] {
            if !self.is_open(index) {
                return Err(BindingError::UnknownHandle(index));
            }
        }
        if target == source {
            return Err(BindingError::invalid_arguments(format!(
                "source and target are both handle {}",
                target
            )));
        }
        let (t, s) = if target < source {
            let (low, high) = self.slots.split_at_mut(source);
            (&mut low[target], &high[0])
        } else {
            let (low, high) = self.slots.split_at_mut(target);
            (&mut high[0], &low[source])
        };
        match (t.as_mut(), s.as_ref()) {
            (Some(t), Some(s)) => Ok((t, s)),
            _ => Err(BindingError::UnknownHandle(target)),
        }
    }

    /// Empty the slot and hand back its session
    pub fn release(&mut self, index: usize) -> Result<Session> {
        self.slots
            .get_mut(index)
            .and_then(Option::take)
            .ok_or(BindingError::UnknownHandle(index))
    }

    /// Indices with an open session
    pub fn open_indices(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|_| i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdds_core::OutputOptions;

    fn session() -> Session {
        Session::new(Dataset::open_memory(OutputOptions::new()).unwrap())
    }

    #[test]
    fn test_install_get_release() {
        let mut table = HandleTable::new(3);
        assert!(matches!(table.get(0), Err(BindingError::UnknownHandle(0))));
        table.install(1, session()).unwrap();
        assert!(table.is_open(1));
        assert!(table.get(1).is_ok());
        assert_eq!(table.open_indices(), vec![1]);
        table.release(1).unwrap();
        assert!(matches!(table.get(1), Err(BindingError::UnknownHandle(1))));
        assert!(table.release(1).is_err());
    }

    #[test]
    fn test_out_of_range() {
        let mut table = HandleTable::new(2);
        assert!(matches!(
            table.install(2, session()),
            Err(BindingError::UnknownHandle(2))
        ));
        assert!(table.get_mut(7).is_err());
    }

    #[test]
    fn test_pair_mut() {
        let mut table = HandleTable::new(4);
        table.install(0, session()).unwrap();
        table.install(3, session()).unwrap();
        assert!(table.pair_mut(3, 0).is_ok());
        assert!(table.pair_mut(0, 3).is_ok());
        assert!(matches!(
            table.pair_mut(0, 0),
            Err(BindingError::InvalidArguments(_))
        ));
        assert!(matches!(
            table.pair_mut(0, 2),
            Err(BindingError::UnknownHandle(2))
        ));
    }
}
