use crate::error::CollectorError;

/// A multi-producer collection that accepts values until it is sealed.
///
/// # Contract
///
/// - `add` succeeds until `seal` takes effect and fails forever after.
/// - An `add` racing a `seal` is linearized on one side of it: it is either
///   part of the sealed contents or it returns `false`.
/// - `contents` is only available once sealed and always yields the same
///   values in the same order.
///
pub trait AppendOnlyCollection<T> {
    /// Iterator over the sealed contents.
    type Contents<'a>: Iterator<Item = &'a T>
    where
        Self: 'a,
        T: 'a;

    /// Append a value. Returns `false` (dropping `value`) if already sealed.
    fn add(&self, value: T) -> bool;

    /// Block further additions. Idempotent.
    fn seal(&self);

    fn is_sealed(&self) -> bool;

    /// Read the sealed contents.
    ///
    /// Fails with [`CollectorError::NotSealed`] if `seal` has not been called.
    fn contents(&self) -> Result<Self::Contents<'_>, CollectorError>;
}
