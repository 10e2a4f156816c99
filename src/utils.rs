pub(crate) const fn bit(n: usize) -> usize {
    1 << n
}
