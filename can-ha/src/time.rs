/// Source of the shared timestamp, in Unix seconds.
pub trait Clock {
    fn now(&self) -> u32;
}

impl<F: Fn() -> u32> Clock for F {
    #[inline]
    fn now(&self) -> u32 {
        self()
    }
}
