#![allow(unused_macros)]

/// Helper macro for locking items, turning a poisoned lock into [`crate::Error::LockError`]
///
/// ```rust, ignore
///  let mut data = lock!(my_mutex);
///  data.some_field = 42;
/// ```
macro_rules! lock {
    ($lock:expr) => {
        $lock.lock().map_err(|_| crate::Error::LockError)?
    };
}

/// Helper macro for bailing out with a [`crate::Error::Malformed`]
///
/// ```rust, ignore
///  ensure_malformed!(!value.contains('\t'), "tab in value {}", value);
/// ```
macro_rules! ensure_malformed {
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(malformed_error!($($arg)*));
        }
    };
}
