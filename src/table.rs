use std::ops::Index;

/// Append-only arena of values addressed by dense indices.
///
/// The 0th cell is a sentry and is never handed out, so index 0 can never refer to a live
/// value. Values are never removed or deduplicated: every [`add`][Table::add] produces a
/// fresh index.
pub struct Table<T> {
    data: Vec<T>,
}

impl<T> Table<T>
where
    T: Default,
{
    /// Create a new table with room for `2^bits` values.
    ///
    /// The table grows past this capacity on demand.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Storage bits should be in the range 0..=31");

        let capacity = 1 << bits;
        let mut data = Vec::with_capacity(capacity);
        data.push(T::default()); // 0th cell is the sentry.

        Self { data }
    }
}

impl<T> Table<T> {
    /// Get the number of cells the table can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }
    /// Get the index of the last occupied cell.
    pub fn size(&self) -> usize {
        self.data.len() - 1
    }

    /// Check whether the given index refers to an occupied cell.
    pub fn contains(&self, index: usize) -> bool {
        index != 0 && index < self.data.len()
    }

    /// Get the reference to the value at the given index.
    pub fn value(&self, index: usize) -> &T {
        assert_ne!(index, 0, "Index is 0");
        assert!(index < self.data.len(), "Index {} is not occupied", index);
        &self.data[index]
    }

    /// Add a new value to the table and return its index.
    pub fn add(&mut self, value: T) -> usize {
        let index = self.data.len();
        assert!(index <= u32::MAX as usize, "Storage is full");
        self.data.push(value);
        index
    }
}

impl<T> Index<usize> for Table<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.value(index)
    }
}
