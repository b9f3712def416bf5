/// Async counterpart to the standard library's `TryFrom<T>` trait.
///
/// Used for values that can only be built after some I/O, such as a
/// version hash computed from a file on disk.
pub trait AsyncTryFrom<T>: Sized {
    /// The error type that can occur during conversion.
    type Error;

    /// Performs the fallible asynchronous conversion from `T` to `Self`.
    async fn async_try_from(value: T) -> Result<Self, Self::Error>;
}
