use std::fmt::Display;

/// Log-and-forget for results nobody can act on
pub trait ErrorUtils {
    fn print_error(&self, msg: &str);
}

impl<T, E: Display> ErrorUtils for Result<T, E> {
    fn print_error(&self, msg: &str) {
        if let Err(e) = self {
            log::error!("{}: {}", msg, e);
        }
    }
}
