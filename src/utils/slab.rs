/// A slot arena handing out small, reusable indices.
///
/// The reactor keys in-flight poll registrations by slab index so a kernel
/// event can carry the index as user data. Indices are reused after removal;
/// removal is keyed, not positional, so racing removers get at most one
/// value between them.
pub(crate) struct Slab<T> {
    /// Storage; vacant slots are `None`.
    slots: Vec<Option<T>>,

    /// Stack of vacant indices available for reuse.
    free: Vec<usize>,
}

impl<T> Slab<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    /// Stores a value and returns its index.
    pub(crate) fn insert(&mut self, value: T) -> usize {
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(value);
                index
            }
            None => {
                self.slots.push(Some(value));
                self.slots.len() - 1
            }
        }
    }

    /// Removes and returns the value at `index`, if the slot is occupied.
    pub(crate) fn try_remove(&mut self, index: usize) -> Option<T> {
        let value = self.slots.get_mut(index)?.take()?;
        self.free.push(index);
        Some(value)
    }
}
