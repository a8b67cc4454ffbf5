/// Unwraps a `Result` inside a function returning `Option<Result<T, E>>`.
///
/// `Ok(t)` evaluates to `t`; `Err(e)` makes the enclosing function return
/// `Some(Err(e))`. Meant for `Iterator::next()` implementations over fallible
/// record sources, where `?` cannot be used directly.
#[macro_export]
macro_rules! try_or_ret_some_err {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(err) => {
                return Some(Err(err.into()));
            }
        }
    };
}
