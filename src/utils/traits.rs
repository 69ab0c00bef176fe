pub(crate) trait GrowBuffer {
    fn grow_to_fit(&mut self, required: usize);
    fn grow_to_fit_within(&mut self, required: usize, ceiling: usize);
}

impl<T> GrowBuffer for Vec<T> {
    /// Makes sure the vector can hold at least `required` elements without reallocating.
    ///
    /// Capacity doubles when doubling is enough, otherwise it grows to exactly `required`.
    ///
    /// # Arguments
    ///
    /// * `required` - The total number of elements the vector must be able to hold.
    fn grow_to_fit(&mut self, required: usize) {
        self.grow_to_fit_within(required, usize::MAX);
    }

    /// Same policy as `grow_to_fit`, but a doubled capacity is clamped to `ceiling`.
    /// `required` always wins over `ceiling`.
    fn grow_to_fit_within(&mut self, required: usize, ceiling: usize) {
        let capacity = self.capacity();
        if required <= capacity {
            return;
        }

        let doubled = capacity.saturating_mul(2).min(ceiling);
        let target = doubled.max(required);

        self.reserve_exact(target - self.len());
    }
}
